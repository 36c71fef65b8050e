//! Log file naming, ordering and rotation decisions.
//!
//! Chat logs are named `ChatLog<YYYYMMDD>_<NN>.txt`. The newest file by
//! `(date, sequence)` is the one being written. A newer file is adopted only
//! after it has been seen twice with the same identity, so a file that is
//! created and removed again straight away is never followed.

use crate::error::Result;
use regex::Regex;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

static LOG_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ChatLog(\d{8})_(\d+)\.txt$").expect("log file name pattern is valid")
});

/// Ordering key of a chat log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogFileKey {
    pub date: u32,
    pub sequence: u32,
}

impl LogFileKey {
    /// Parses a file name such as `ChatLog20130519_00.txt`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let captures = LOG_FILE_NAME.captures(name)?;
        Some(Self {
            date: captures[1].parse().ok()?,
            sequence: captures[2].parse().ok()?,
        })
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::from_file_name)
    }
}

/// Distinguishes a file from a later file created under the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    #[cfg(unix)]
    device: u64,
    #[cfg(unix)]
    inode: u64,
    #[cfg(not(unix))]
    created: Option<std::time::SystemTime>,
}

impl FileIdentity {
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            device: metadata.dev(),
            inode: metadata.ino(),
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            created: metadata.created().ok(),
        }
    }
}

/// A matching file found in the log directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileEntry {
    pub path: PathBuf,
    pub key: LogFileKey,
    pub identity: FileIdentity,
}

/// The log file currently being followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    pub path: PathBuf,
    pub key: LogFileKey,
    pub identity: FileIdentity,
    /// Whether the file already existed when watching started.
    pub preexisting: bool,
}

/// Lists the chat log files in `dir`.
///
/// Entries that vanish while being listed are skipped.
pub async fn list_log_files(dir: &Path) -> Result<Vec<LogFileEntry>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        let Some(key) = LogFileKey::from_path(&path) else {
            continue;
        };
        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        entries.push(LogFileEntry {
            path,
            key,
            identity: FileIdentity::from_metadata(&metadata),
        });
    }

    Ok(entries)
}

/// Picks the newest entry by key.
pub fn latest(entries: Vec<LogFileEntry>) -> Option<LogFileEntry> {
    entries.into_iter().max_by_key(|entry| entry.key)
}

#[derive(Debug, Clone)]
struct Candidate {
    entry: LogFileEntry,
    first_seen: Instant,
}

/// Decides when the watcher should move to a different file.
#[derive(Debug)]
pub struct RotationTracker {
    settle_delay: Duration,
    candidate: Option<Candidate>,
}

impl RotationTracker {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            settle_delay,
            candidate: None,
        }
    }

    /// Feeds the newest file of a directory scan.
    ///
    /// Returns the entry to switch to once a newer file (or the active file
    /// re-created under the same name) has stayed unchanged for the settle
    /// delay.
    pub fn observe(
        &mut self,
        newest: Option<LogFileEntry>,
        active: Option<&WatchedFile>,
        now: Instant,
    ) -> Option<LogFileEntry> {
        let newest = match newest {
            Some(entry) if supersedes(&entry, active) => entry,
            _ => {
                self.candidate = None;
                return None;
            }
        };

        match &self.candidate {
            Some(candidate)
                if candidate.entry == newest
                    && now.saturating_duration_since(candidate.first_seen) >= self.settle_delay =>
            {
                self.candidate = None;
                Some(newest)
            }
            Some(candidate) if candidate.entry == newest => None,
            _ if self.settle_delay.is_zero() => Some(newest),
            _ => {
                self.candidate = Some(Candidate {
                    entry: newest,
                    first_seen: now,
                });
                None
            }
        }
    }

    #[cfg(test)]
    pub fn has_candidate(&self) -> bool {
        self.candidate.is_some()
    }
}

fn supersedes(entry: &LogFileEntry, active: Option<&WatchedFile>) -> bool {
    match active {
        None => true,
        Some(active) => {
            entry.key > active.key || (entry.key == active.key && entry.identity != active.identity)
        }
    }
}
