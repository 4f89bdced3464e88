use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Runs a callback whenever the watched file is modified, created or
/// removed. Watching stops when this is dropped.
pub struct JsonWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl JsonWatcher {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A file that does not exist yet is watched through its parent directory;
/// its creation counts as a change.
pub fn watch_json<F, P>(path: P, mut callback: F) -> notify::Result<JsonWatcher>
where
    F: FnMut() + Send + 'static,
    P: AsRef<Path>,
{
    let path = path.as_ref().to_path_buf();
    let name = path.file_name().map(OsString::from);
    let display_path = path.display().to_string();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(ev) => {
                if matches!(
                    ev.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) && touches(&ev, name.as_deref())
                {
                    tracing::debug!(path = %display_path, kind = ?ev.kind, "watched file changed");
                    callback();
                }
            }
            Err(e) => tracing::error!("watch error: {:?}", e),
        },
        Config::default(),
    )?;
    watcher
        .watch(&path, RecursiveMode::NonRecursive)
        .or_else(|_| watcher.watch(parent_dir(&path), RecursiveMode::NonRecursive))?;

    Ok(JsonWatcher {
        path,
        _watcher: watcher,
    })
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

// Directory watches report sibling files too.
fn touches(ev: &Event, name: Option<&std::ffi::OsStr>) -> bool {
    let Some(name) = name else {
        return true;
    };
    ev.paths.is_empty() || ev.paths.iter().any(|p| p.file_name() == Some(name))
}
