//! Directory change notifications using the notify crate.
//!
//! Notifications only shorten the time until a new log file is noticed. The
//! periodic directory scan stays in charge of every decision.

use crate::error::Result;
use crate::selection::LogFileKey;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Watches the log directory for files appearing or disappearing.
pub(crate) struct DirWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
    dir: PathBuf,
}

impl DirWatcher {
    /// Starts watching `dir` non-recursively.
    pub(crate) fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            dir,
        })
    }

    /// Returns the next file system event.
    pub(crate) async fn next_event(&mut self) -> Option<notify::Result<Event>> {
        self.receiver.recv().await
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Check if a notify event may change which log file is the newest.
pub(crate) fn is_log_file_event(event: &Event) -> bool {
    let kind_matters = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(_) | EventKind::Any
    );
    kind_matters
        && event
            .paths
            .iter()
            .any(|path| LogFileKey::from_path(path).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};
    use std::time::Duration;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        Event {
            kind,
            paths: paths.iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_create_of_log_file_is_relevant() {
        let event = event(
            EventKind::Create(CreateKind::File),
            &["/logs/ChatLog20130519_00.txt"],
        );
        assert!(is_log_file_event(&event));
    }

    #[test]
    fn test_remove_and_modify_are_relevant() {
        assert!(is_log_file_event(&event(
            EventKind::Remove(RemoveKind::File),
            &["/logs/ChatLog20130519_00.txt"],
        )));
        assert!(is_log_file_event(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/logs/ChatLog20130519_00.txt"],
        )));
    }

    #[test]
    fn test_other_files_are_ignored() {
        let event = event(
            EventKind::Create(CreateKind::File),
            &["/logs/notes.txt", "/logs/ChatLog.txt"],
        );
        assert!(!is_log_file_event(&event));
    }

    #[test]
    fn test_any_matching_path_is_enough() {
        let event = event(
            EventKind::Create(CreateKind::File),
            &["/logs/notes.txt", "/logs/ChatLog20130520_00.txt"],
        );
        assert!(is_log_file_event(&event));
    }

    #[test]
    fn test_access_events_are_ignored() {
        let event = event(
            EventKind::Access(AccessKind::Read),
            &["/logs/ChatLog20130519_00.txt"],
        );
        assert!(!is_log_file_event(&event));
    }

    #[test]
    fn test_empty_paths() {
        let event = event(EventKind::Create(CreateKind::File), &[]);
        assert!(!is_log_file_event(&event));
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = DirWatcher::new(dir.path().join("missing"));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reports_file_creation() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = DirWatcher::new(dir.path()).unwrap();
        assert_eq!(watcher.dir(), dir.path());

        std::fs::write(dir.path().join("ChatLog20130519_00.txt"), "").unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        let mut seen = false;
        while !seen {
            let next = tokio::time::timeout_at(deadline, watcher.next_event())
                .await
                .expect("no notification for new log file");
            if let Some(Ok(event)) = next {
                seen = is_log_file_event(&event);
            }
        }
        assert!(seen);
    }

    #[tokio::test]
    async fn test_next_event_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = DirWatcher::new(dir.path()).unwrap();

        let result =
            tokio::time::timeout(Duration::from_millis(10), watcher.next_event()).await;

        assert!(result.is_err());
    }
}
