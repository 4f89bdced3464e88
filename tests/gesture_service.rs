mod common;

use common::Hand;
use pinch_control::gestures::dispatch::{
    Backends, InputCall, MockClipboard, MockInputBackend, MockRecordingSink, MouseButton,
};
use pinch_control::gestures::landmarks::Handedness;
use pinch_control::gestures::mapping::{
    MotionCode, MotionMapping, MotionMappingConfig, Pinch, SharedMotionMapping,
};
use pinch_control::gestures::service::{
    GestureService, GestureServiceConfig, LineLandmarkSource, MockLandmarkSource, TrackerInput,
};
use pinch_control::gestures::telemetry::{MemorySink, TelemetryMessage};
use std::io::Cursor;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

struct Mocks {
    input: Arc<MockInputBackend>,
    clipboard: Arc<MockClipboard>,
    recording: Arc<MockRecordingSink>,
    telemetry: MemorySink,
}

impl Mocks {
    fn new() -> Self {
        Self {
            input: Arc::new(MockInputBackend::default()),
            clipboard: Arc::new(MockClipboard::default()),
            recording: Arc::new(MockRecordingSink::default()),
            telemetry: MemorySink::default(),
        }
    }

    fn backends(&self) -> Backends {
        Backends {
            input: self.input.clone(),
            clipboard: self.clipboard.clone(),
            recording: self.recording.clone(),
            telemetry: Arc::new(self.telemetry.clone()),
        }
    }

    fn statuses(&self) -> Vec<String> {
        self.telemetry
            .messages()
            .into_iter()
            .filter_map(|m| match m {
                TelemetryMessage::Status { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

fn config() -> GestureServiceConfig {
    GestureServiceConfig {
        frame_interval_ms: 5,
        ..GestureServiceConfig::default()
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        sleep(Duration::from_millis(5));
    }
}

fn hand(hand: Hand) -> TrackerInput {
    TrackerInput::Hand(hand.frame())
}

#[test]
fn start_stop_idempotent() {
    let mocks = Mocks::new();
    let (source, handle) = MockLandmarkSource::new();
    let mut service = GestureService::new(
        config(),
        SharedMotionMapping::default(),
        Box::new(source),
        mocks.backends(),
    );

    service.start().unwrap();
    service.start().unwrap();
    assert!(service.is_running());
    assert_eq!(handle.install_count(), 1);

    service.stop();
    service.stop();
    assert!(!service.is_running());
    assert_eq!(handle.uninstall_count(), 1);
    assert_eq!(
        mocks.statuses(),
        vec!["gesture tracking started", "gesture tracking stopped"]
    );
}

#[test]
fn invalid_classifier_config_refuses_to_start() {
    let mocks = Mocks::new();
    let (source, handle) = MockLandmarkSource::new();
    let mut config = config();
    config.classifier.pinch_threshold = 0.5;
    let mut service = GestureService::new(
        config,
        SharedMotionMapping::default(),
        Box::new(source),
        mocks.backends(),
    );
    assert!(service.start().is_err());
    assert!(!service.is_running());
    assert_eq!(handle.install_count(), 0);
}

#[test]
fn frames_drive_click_and_stop_message_ends_worker() {
    let mocks = Mocks::new();
    let (source, handle) = MockLandmarkSource::new();
    let mut service = GestureService::new(
        config(),
        SharedMotionMapping::default(),
        Box::new(source),
        mocks.backends(),
    );
    service.start().unwrap();

    assert!(handle.emit(hand(Hand::open().pinch(Pinch::ThumbIndex))));
    assert!(handle.emit(hand(Hand::open().pinch(Pinch::ThumbIndex))));
    assert!(handle.emit(hand(Hand::open())));
    assert!(handle.emit(TrackerInput::Stop));
    service.wait();

    assert!(!service.is_running());
    assert_eq!(
        mocks.input.button_calls(),
        vec![
            InputCall::Down(MouseButton::Left),
            InputCall::Up(MouseButton::Left)
        ]
    );
    assert_eq!(
        mocks.telemetry.gesture_labels(),
        vec!["left_click_start", "left_click_hold", "left_click_end"]
    );
}

#[test]
fn stopping_mid_gesture_releases_everything() {
    let mocks = Mocks::new();
    let (source, handle) = MockLandmarkSource::new();
    let mut service = GestureService::new(
        config(),
        SharedMotionMapping::default(),
        Box::new(source),
        mocks.backends(),
    );
    service.start().unwrap();

    handle.emit(hand(Hand::open().pinch(Pinch::ThumbRing)));
    let recording = mocks.recording.clone();
    wait_until(|| recording.start_count() == 1);

    service.stop();
    assert_eq!(mocks.recording.stop_count(), 1);
    assert!(mocks
        .telemetry
        .gesture_labels()
        .contains(&"recording_stop".to_string()));
}

#[test]
fn source_disconnect_ends_worker_and_releases_button() {
    let mocks = Mocks::new();
    let (source, handle) = MockLandmarkSource::new();
    let mut service = GestureService::new(
        config(),
        SharedMotionMapping::default(),
        Box::new(source),
        mocks.backends(),
    );
    service.start().unwrap();

    handle.emit(hand(Hand::open().pinch(Pinch::ThumbMiddle)));
    handle.disconnect();
    service.wait();

    assert_eq!(
        mocks.input.button_calls(),
        vec![
            InputCall::Down(MouseButton::Right),
            InputCall::Up(MouseButton::Right)
        ]
    );
}

#[test]
fn malformed_frame_and_no_hand_close_gestures() {
    let mocks = Mocks::new();
    let (source, handle) = MockLandmarkSource::new();
    let mut service = GestureService::new(
        config(),
        SharedMotionMapping::default(),
        Box::new(source),
        mocks.backends(),
    );
    service.start().unwrap();

    handle.emit(hand(Hand::open().pinch(Pinch::ThumbIndex)));
    let mut truncated = Hand::open().pinch(Pinch::ThumbIndex).frame();
    truncated.landmarks.truncate(12);
    handle.emit(TrackerInput::Hand(truncated));
    handle.emit(hand(Hand::open().pinch(Pinch::ThumbMiddle)));
    handle.emit(TrackerInput::NoHand);
    handle.emit(TrackerInput::Stop);
    service.wait();

    assert_eq!(
        mocks.input.button_calls(),
        vec![
            InputCall::Down(MouseButton::Left),
            InputCall::Up(MouseButton::Left),
            InputCall::Down(MouseButton::Right),
            InputCall::Up(MouseButton::Right),
        ]
    );
}

#[test]
fn other_hand_counts_as_no_hand() {
    let mocks = Mocks::new();
    let (source, handle) = MockLandmarkSource::new();
    let config = GestureServiceConfig {
        preferred_hand: Some(Handedness::Right),
        ..config()
    };
    let mut service = GestureService::new(
        config,
        SharedMotionMapping::default(),
        Box::new(source),
        mocks.backends(),
    );
    service.start().unwrap();

    let pinch = Hand::open().pinch(Pinch::ThumbIndex);
    handle.emit(TrackerInput::Hand(
        pinch.frame().with_handedness(Handedness::Right),
    ));
    handle.emit(TrackerInput::Hand(
        pinch.frame().with_handedness(Handedness::Left),
    ));
    handle.emit(TrackerInput::Hand(
        pinch.frame().with_handedness(Handedness::Left),
    ));
    handle.emit(TrackerInput::Stop);
    service.wait();

    assert_eq!(
        mocks.telemetry.gesture_labels(),
        vec!["left_click_start", "left_click_end"]
    );
    assert_eq!(mocks.input.button_calls().len(), 2);
}

#[test]
fn mapping_message_remaps_next_frame() {
    let mocks = Mocks::new();
    let (source, handle) = MockLandmarkSource::new();
    let mapping = SharedMotionMapping::default();
    let mut service = GestureService::new(
        config(),
        mapping.clone(),
        Box::new(source),
        mocks.backends(),
    );
    service.start().unwrap();

    handle.emit(TrackerInput::Mapping(MotionMappingConfig {
        left_click: Some(MotionCode::M2),
        right_click: Some(MotionCode::M1),
        paste: None,
    }));
    handle.emit(hand(Hand::open().pinch(Pinch::ThumbMiddle)));
    handle.emit(TrackerInput::Stop);
    service.wait();

    assert_eq!(mapping.current().left_click, MotionCode::M2);
    assert_eq!(mocks.telemetry.gesture_labels(), vec!["left_click_start", "left_click_end"]);
    assert!(mocks
        .statuses()
        .contains(&"motion mapping updated".to_string()));
}

#[test]
fn update_mapping_reaches_running_worker() {
    let mocks = Mocks::new();
    let (source, handle) = MockLandmarkSource::new();
    let mut service = GestureService::new(
        config(),
        SharedMotionMapping::default(),
        Box::new(source),
        mocks.backends(),
    );
    service.start().unwrap();
    service.update_mapping(MotionMapping {
        left_click: MotionCode::M3,
        right_click: MotionCode::M2,
        paste: MotionCode::M1,
    });

    handle.emit(hand(Hand::open().pinch(Pinch::ThumbPinky)));
    handle.emit(TrackerInput::Stop);
    service.wait();

    assert_eq!(
        mocks.telemetry.gesture_labels().first().map(String::as_str),
        Some("left_click_start")
    );
}

#[test]
fn clipboard_message_copies_text() {
    let mocks = Mocks::new();
    let (source, handle) = MockLandmarkSource::new();
    let mut service = GestureService::new(
        config(),
        SharedMotionMapping::default(),
        Box::new(source),
        mocks.backends(),
    );
    service.start().unwrap();
    handle.emit(TrackerInput::Clipboard {
        text: "hello world".into(),
    });
    handle.emit(TrackerInput::Stop);
    service.wait();
    assert_eq!(mocks.clipboard.text(), "hello world");
}

#[test]
fn line_source_reads_host_protocol() {
    let mocks = Mocks::new();
    let pinch = serde_json::to_string(&hand(Hand::open().pinch(Pinch::ThumbIndex))).unwrap();
    let open = serde_json::to_string(&hand(Hand::open())).unwrap();
    let input = format!("{pinch}\nnot json\n\n{pinch}\n{open}\n{{\"type\":\"no_hand\"}}\n");

    let source = LineLandmarkSource::new(Box::new(Cursor::new(input.into_bytes())));
    let mut service = GestureService::new(
        config(),
        SharedMotionMapping::default(),
        Box::new(source),
        mocks.backends(),
    );
    service.start().unwrap();
    service.wait();

    assert_eq!(
        mocks.telemetry.gesture_labels(),
        vec!["left_click_start", "left_click_hold", "left_click_end"]
    );
    assert_eq!(mocks.input.button_calls().len(), 2);
}
