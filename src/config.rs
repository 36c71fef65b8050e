//! Tunables for a [`LogWatcher`](crate::LogWatcher).

use crate::follow::DEFAULT_POLL_INTERVAL;
use std::path::PathBuf;
use std::time::Duration;

/// Shortest directory scan interval a watcher runs with.
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_millis(1);

/// Timing and buffering settings of a log watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Sleep between read attempts on the active file once it is caught up.
    pub poll_interval: Duration,
    /// Interval between directory listings.
    pub scan_interval: Duration,
    /// How long a new file must stay unchanged before it is followed.
    pub settle_delay: Duration,
    /// Re-scan immediately on filesystem notifications in addition to polling.
    pub use_fs_events: bool,
    pub read_buffer_size: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            scan_interval: Duration::from_millis(250),
            settle_delay: Duration::from_millis(200),
            use_fs_events: true,
            read_buffer_size: 8 * 1024,
        }
    }
}

impl WatcherConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval.max(MIN_SCAN_INTERVAL);
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_fs_events(mut self, enabled: bool) -> Self {
        self.use_fs_events = enabled;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Applies the builder bounds to values assigned through the public
    /// fields.
    pub(crate) fn clamped(self) -> Self {
        let scan_interval = self.scan_interval;
        let read_buffer_size = self.read_buffer_size;
        self.with_scan_interval(scan_interval)
            .with_read_buffer_size(read_buffer_size)
    }
}

/// The directory the game writes its chat logs to:
/// `<documents>/SEGA/PHANTASYSTARONLINE2/log`.
///
/// Falls back to the home directory when the platform has no documents
/// directory. Returns `None` when neither can be determined.
pub fn default_log_dir() -> Option<PathBuf> {
    let dirs = directories::UserDirs::new()?;
    let documents = dirs
        .document_dir()
        .map(PathBuf::from)
        .unwrap_or_else(|| dirs.home_dir().to_path_buf());
    Some(documents.join("SEGA").join("PHANTASYSTARONLINE2").join("log"))
}
