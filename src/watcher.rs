//! File watcher for the shared session snapshot.
//!
//! Uses the `notify` crate to watch the store directory and tells the
//! dashboard when the snapshot file changed, so it can re-read sessions
//! without polling the disk on every tick.

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, TryRecvError};

use crate::config;

/// Watches the snapshot file for writes from other processes.
pub struct StoreWatcher {
    /// The watcher instance (kept alive to maintain the watch)
    _watcher: RecommendedWatcher,
    /// Receiver for file system events
    receiver: Receiver<Result<Event, notify::Error>>,
    /// File name of the snapshot inside the watched directory
    store_name: OsString,
}

impl StoreWatcher {
    /// Create a new watcher for the store file at `store_path`.
    ///
    /// The containing directory is watched rather than the file itself
    /// because snapshot writes land via rename, which replaces the inode
    /// a file-level watch would be pinned to. The directory is created
    /// if it does not exist yet.
    pub fn new(store_path: &Path) -> Result<Self> {
        let dir = store_path.parent().unwrap_or_else(|| Path::new("."));
        config::ensure_private_dir(dir)?;

        let store_name = store_path
            .file_name()
            .context("Store path has no file name")?
            .to_os_string();

        // Create a channel for receiving events
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                // Send events to the channel, ignoring send errors
                // (receiver may be dropped)
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch store directory: {:?}", dir))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            store_name,
        })
    }

    /// Check whether the snapshot file changed since the last poll.
    ///
    /// Non-blocking; drains all pending events and reports whether any
    /// of them touched the snapshot file.
    pub fn poll_changes(&mut self) -> bool {
        let mut has_changes = false;

        loop {
            match self.receiver.try_recv() {
                Ok(Ok(event)) => {
                    if is_relevant_event(&event, &self.store_name) {
                        has_changes = true;
                    }
                }
                Ok(Err(e)) => {
                    // Log watcher errors but continue
                    eprintln!("File watcher error: {}", e);
                }
                Err(TryRecvError::Empty) => {
                    break;
                }
                Err(TryRecvError::Disconnected) => {
                    eprintln!("File watcher channel disconnected");
                    break;
                }
            }
        }

        has_changes
    }
}

/// Check if an event should trigger a reload: a create, modify, or remove
/// that names the snapshot file. Writes to other files in the directory
/// (the config, temp files mid-rename) are ignored.
fn is_relevant_event(event: &Event, store_name: &std::ffi::OsStr) -> bool {
    use notify::EventKind;

    let kind_matches = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    kind_matches
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(store_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    fn event_with_path(kind: notify::EventKind, path: &str) -> Event {
        Event {
            kind,
            paths: vec![path.into()],
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_is_relevant_event() {
        use notify::event::{CreateKind, ModifyKind, RemoveKind};
        use notify::EventKind;

        let name = OsString::from("sessions.json");

        // Create, modify, and remove events on the snapshot are relevant
        let create_event = event_with_path(
            EventKind::Create(CreateKind::File),
            "/home/x/.ccmon/sessions.json",
        );
        assert!(is_relevant_event(&create_event, &name));

        let modify_event = event_with_path(
            EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
            "/home/x/.ccmon/sessions.json",
        );
        assert!(is_relevant_event(&modify_event, &name));

        let remove_event = event_with_path(
            EventKind::Remove(RemoveKind::File),
            "/home/x/.ccmon/sessions.json",
        );
        assert!(is_relevant_event(&remove_event, &name));

        // Access events should not trigger a reload
        let access_event = event_with_path(
            EventKind::Access(notify::event::AccessKind::Read),
            "/home/x/.ccmon/sessions.json",
        );
        assert!(!is_relevant_event(&access_event, &name));

        // Neither should writes to other files in the directory
        let config_event = event_with_path(
            EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
            "/home/x/.ccmon/config.json",
        );
        assert!(!is_relevant_event(&config_event, &name));
    }

    #[test]
    fn test_watcher_detects_snapshot_write() {
        let temp_dir = tempdir().unwrap();
        let store_path = temp_dir.path().join("sessions.json");

        let mut watcher = StoreWatcher::new(&store_path).unwrap();
        assert!(!watcher.poll_changes());

        fs::write(&store_path, "{}").unwrap();

        // Give the watcher time to deliver the event
        thread::sleep(Duration::from_millis(300));
        assert!(watcher.poll_changes());
    }

    #[test]
    fn test_watcher_ignores_sibling_files() {
        let temp_dir = tempdir().unwrap();
        let store_path = temp_dir.path().join("sessions.json");

        let mut watcher = StoreWatcher::new(&store_path).unwrap();
        fs::write(temp_dir.path().join("config.json"), "{}").unwrap();

        thread::sleep(Duration::from_millis(300));
        assert!(!watcher.poll_changes());
    }
}
