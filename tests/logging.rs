use std::{fs, thread::sleep, time::Duration};

use tempfile::tempdir;

// The subscriber is process-global, so everything that depends on which
// `init` call wins lives in this one test.
#[test]
fn writes_log_file_and_ignores_later_init() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pinch.log");

    pinch_control::logging::init(true, Some(path.clone()));
    tracing::info!("gesture logging test");

    sleep(Duration::from_millis(200));

    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("gesture logging test"));

    let other = dir.path().join("other.log");
    pinch_control::logging::init(false, Some(other.clone()));
    pinch_control::logging::init(false, None);
    tracing::info!("after second init");

    sleep(Duration::from_millis(200));

    assert!(!other.exists(), "second init should not open a new log");
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("after second init"));
}
