//! Directory-level watcher that follows the newest chat log across rotations.

use crate::config::{WatcherConfig, default_log_dir};
use crate::decoder::{LineDecoder, TextEncoding};
use crate::error::{Error, Result};
use crate::event::{LogEvent, Subscriber, Subscribers};
use crate::follow::FollowStream;
use crate::selection::{
    FileIdentity, LogFileEntry, RotationTracker, WatchedFile, latest, list_log_files,
};
use crate::stream::EventStream;
use crate::watcher::{DirWatcher, is_log_file_event};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const RESOURCE: &str = "LogWatcher";

/// Lifecycle of a [`LogWatcher`]. A watcher runs at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Created,
    Running,
    Stopped,
}

struct RunningTask {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

/// Follows the newest `ChatLog<date>_<seq>.txt` in a directory and hands each
/// new line to the registered subscribers as a [`LogEvent`].
///
/// Lines already present when [`start`](Self::start) is called are never
/// delivered. Files that appear later are delivered from their first line.
///
/// ```rust,no_run
/// use chatlog_tail::LogWatcher;
///
/// # async fn run() -> chatlog_tail::Result<()> {
/// let mut watcher = LogWatcher::new();
/// watcher.subscribe(|event| println!("{}: {}", event.sender_name, event.message));
/// watcher.start("logs").await?;
/// // ...
/// watcher.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct LogWatcher {
    config: WatcherConfig,
    state: WatcherState,
    subscribers: Subscribers,
    task: Option<RunningTask>,
}

impl LogWatcher {
    pub fn new() -> Self {
        Self::with_config(WatcherConfig::default())
    }

    /// Out-of-range values set through the public fields of `config` are
    /// raised to their minimum.
    pub fn with_config(config: WatcherConfig) -> Self {
        Self {
            config: config.clamped(),
            state: WatcherState::Created,
            subscribers: Subscribers::default(),
            task: None,
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Whether the watch task has ended on its own, which only happens on a
    /// fault. [`stop`](Self::stop) returns the fault.
    pub fn is_finished(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| task.handle.is_finished())
    }

    /// Registers a callback. Callbacks run on the watch task, in registration
    /// order, and must not call back into the watcher.
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&LogEvent) + Send + 'static,
    {
        self.subscribers.add(Box::new(subscriber));
    }

    pub(crate) fn add_subscriber(&mut self, subscriber: Subscriber) {
        self.subscribers.add(subscriber);
    }

    /// Registers a subscriber that forwards every event into a stream.
    pub fn events(&mut self) -> EventStream {
        let (subscriber, stream) = EventStream::channel();
        self.subscribers.add(subscriber);
        stream
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Starts watching `dir`.
    ///
    /// Fails with [`Error::AlreadyRunning`] while running and with
    /// [`Error::Disposed`] once stopped. Directory and file errors are
    /// returned directly.
    pub async fn start<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        match self.state {
            WatcherState::Running => return Err(Error::AlreadyRunning),
            WatcherState::Stopped => return Err(Error::Disposed { resource: RESOURCE }),
            WatcherState::Created => {}
        }

        let dir = dir.as_ref().to_path_buf();
        if !tokio::fs::metadata(&dir).await?.is_dir() {
            return Err(Error::InvalidPath {
                message: format!("{} is not a directory", dir.display()),
            });
        }

        let active = match latest(list_log_files(&dir).await?) {
            Some(entry) => ActiveLog::open_if_present(entry, true, &self.config).await?,
            None => None,
        };
        info!(
            dir = %dir.display(),
            file = ?active.as_ref().map(|active| active.file.path.display().to_string()),
            "chat log watcher started"
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = WatchTask {
            tracker: RotationTracker::new(self.config.settle_delay),
            dir,
            config: self.config.clone(),
            active,
            subscribers: self.subscribers.clone(),
        };
        let handle = tokio::spawn(task.run(shutdown_rx));

        self.task = Some(RunningTask {
            shutdown_tx,
            handle,
        });
        self.state = WatcherState::Running;
        Ok(())
    }

    /// Starts watching the game's default log directory.
    pub async fn start_default(&mut self) -> Result<()> {
        let dir = default_log_dir().ok_or_else(|| Error::InvalidPath {
            message: "no documents or home directory for the default log directory".to_string(),
        })?;
        self.start(dir).await
    }

    /// Stops watching and waits for the watch task to exit.
    ///
    /// No subscriber is called after this returns. A no-op unless running.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        self.state = WatcherState::Stopped;

        // The task may already have ended with a fault.
        let _ = task.shutdown_tx.send(());
        let result = match task.handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::WorkerPanicked {
                message: e.to_string(),
            }),
        };
        info!("chat log watcher stopped");
        result
    }
}

impl Default for LogWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LogWatcher {
    fn drop(&mut self) {
        // Send shutdown signal - the task closes its file on the way out
        if let Some(task) = &self.task {
            let _ = task.shutdown_tx.send(());
        }
    }
}

/// The file currently followed by the watch task.
struct ActiveLog {
    file: WatchedFile,
    stream: FollowStream,
    decoder: LineDecoder,
}

impl ActiveLog {
    /// Opens `entry`; a preexisting file is followed from its end.
    async fn open(entry: LogFileEntry, preexisting: bool, config: &WatcherConfig) -> Result<Self> {
        let mut file = File::open(&entry.path).await?;
        let identity = FileIdentity::from_metadata(&file.metadata().await?);

        // Following from the end never sees the byte order mark, so the
        // encoding is taken from the head of the file up front.
        let decoder = if preexisting {
            let mut head = Vec::with_capacity(4);
            (&mut file).take(4).read_to_end(&mut head).await?;
            match TextEncoding::sniff(&head) {
                Some((encoding, _)) => LineDecoder::with_encoding(encoding),
                None => LineDecoder::new(),
            }
        } else {
            LineDecoder::new()
        };

        let stream =
            FollowStream::with_poll_interval(file, preexisting, config.poll_interval).await?;
        debug!(
            file = %entry.path.display(),
            preexisting,
            encoding = ?decoder.encoding(),
            "opened chat log"
        );

        Ok(Self {
            file: WatchedFile {
                path: entry.path,
                key: entry.key,
                identity,
                preexisting,
            },
            stream,
            decoder,
        })
    }

    /// Like [`open`](Self::open), but a file removed since it was listed
    /// gives `None`.
    async fn open_if_present(
        entry: LogFileEntry,
        preexisting: bool,
        config: &WatcherConfig,
    ) -> Result<Option<Self>> {
        let path = entry.path.clone();
        match Self::open(entry, preexisting, config).await {
            Ok(active) => Ok(Some(active)),
            Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => {
                debug!(file = %path.display(), "chat log vanished before it was opened");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Decodes `bytes` and dispatches every completed line.
    fn feed(&mut self, bytes: &[u8], subscribers: &Subscribers) -> Result<()> {
        for line in self.decoder.push(bytes)? {
            dispatch_line(subscribers, &self.file.path, &line);
        }
        Ok(())
    }
}

fn dispatch_line(subscribers: &Subscribers, file: &Path, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    match LogEvent::parse_line(line) {
        Ok(event) => subscribers.dispatch(&event),
        Err(e) => warn!(file = %file.display(), error = %e, "skipping malformed chat log line"),
    }
}

/// Background task: reads the active file and switches to newer files.
struct WatchTask {
    dir: PathBuf,
    config: WatcherConfig,
    active: Option<ActiveLog>,
    tracker: RotationTracker,
    subscribers: Subscribers,
}

impl WatchTask {
    async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let result = self.watch(&mut shutdown_rx).await;

        if let Some(mut active) = self.active.take() {
            active.stream.close();
        }
        match &result {
            Ok(()) => debug!(dir = %self.dir.display(), "watch task finished"),
            Err(e) => error!(dir = %self.dir.display(), error = %e, "watch task failed"),
        }
        result
    }

    async fn watch(&mut self, shutdown_rx: &mut broadcast::Receiver<()>) -> Result<()> {
        let mut dir_watcher = if self.config.use_fs_events {
            match DirWatcher::new(&self.dir) {
                Ok(watcher) => {
                    debug!(dir = %watcher.dir().display(), "directory notifications enabled");
                    Some(watcher)
                }
                Err(e) => {
                    warn!(error = %e, "directory notifications unavailable, polling only");
                    None
                }
            }
        } else {
            None
        };

        let mut scan = tokio::time::interval(self.config.scan_interval);
        scan.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut buf = vec![0u8; self.config.read_buffer_size];

        loop {
            tokio::select! {
                biased;

                // Shutdown requested or the watcher was dropped
                _ = shutdown_rx.recv() => return Ok(()),

                _ = scan.tick() => self.rescan().await?,

                event = next_dir_event(&mut dir_watcher) => match event {
                    Some(Ok(event)) => {
                        if is_log_file_event(&event) {
                            self.rescan().await?;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "directory notifications failed, polling only");
                        dir_watcher = None;
                    }
                    None => dir_watcher = None,
                },

                read = read_active(&mut self.active, &mut buf) => {
                    let read = read?;
                    if read == 0 {
                        // Only a closed stream reports end-of-file.
                        self.active = None;
                        continue;
                    }
                    if let Some(active) = self.active.as_mut() {
                        active.feed(&buf[..read], &self.subscribers)?;
                    }
                }
            }
        }
    }

    async fn rescan(&mut self) -> Result<()> {
        let entries = match list_log_files(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "listing log directory failed");
                return Ok(());
            }
        };

        let active = self.active.as_ref().map(|active| &active.file);
        match self.tracker.observe(latest(entries), active, Instant::now()) {
            Some(next) => self.rotate(next).await,
            None => Ok(()),
        }
    }

    /// Moves to `next`, after handing out whatever the old file still holds.
    async fn rotate(&mut self, next: LogFileEntry) -> Result<()> {
        let path = next.path.clone();
        let Some(incoming) = ActiveLog::open_if_present(next, false, &self.config).await? else {
            return Ok(());
        };

        if let Some(mut outgoing) = self.active.take() {
            self.drain(&mut outgoing).await?;
            outgoing.stream.close();
            info!(
                from = %outgoing.file.path.display(),
                from_preexisting = outgoing.file.preexisting,
                to = %path.display(),
                "switched to newer chat log"
            );
        } else {
            info!(file = %path.display(), "following new chat log");
        }

        self.active = Some(incoming);
        Ok(())
    }

    /// Dispatches the bytes currently available in `outgoing` without
    /// waiting for it to grow.
    async fn drain(&self, outgoing: &mut ActiveLog) -> Result<()> {
        let mut buf = vec![0u8; self.config.read_buffer_size];
        loop {
            let read = outgoing.stream.read_available(&mut buf).await?;
            if read == 0 {
                break;
            }
            outgoing.feed(&buf[..read], &self.subscribers)?;
        }

        let unterminated = outgoing.decoder.pending_len();
        if unterminated > 0 {
            debug!(
                file = %outgoing.file.path.display(),
                bytes = unterminated,
                "dropping unterminated line of previous chat log"
            );
        }
        Ok(())
    }
}

async fn read_active(active: &mut Option<ActiveLog>, buf: &mut [u8]) -> Result<usize> {
    match active {
        Some(active) => active.stream.read(buf).await,
        None => std::future::pending().await,
    }
}

async fn next_dir_event(
    watcher: &mut Option<DirWatcher>,
) -> Option<notify::Result<notify::Event>> {
    match watcher {
        Some(watcher) => watcher.next_event().await,
        None => std::future::pending().await,
    }
}
