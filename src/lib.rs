//! Live tailing of rotating PSO2 chat logs.
//!
//! The game appends chat to `ChatLog<YYYYMMDD>_<NN>.txt` files and starts a new
//! file every day. [`LogWatcher`] follows the newest one across rotations and
//! hands every new line to its subscribers as a [`LogEvent`]. Lines written
//! before the watcher started are never delivered.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatlog_tail::LogWatcher;
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut watcher = LogWatcher::new();
//!     let mut events = watcher.events();
//!     watcher.start("logs").await?;
//!
//!     while let Some(event) = events.next().await {
//!         println!("[{}] {}: {}", event.channel, event.sender_name, event.message);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Internal modules - not part of public API
mod config;
mod decoder;
mod error;
mod event;
mod factory;
mod follow;
mod log_watcher;
mod relay;
mod selection;
mod stream;
mod watcher;

#[cfg(test)]
mod test_helpers;

// Public API exports
pub use config::{MIN_SCAN_INTERVAL, WatcherConfig, default_log_dir};
pub use decoder::{LineDecoder, TextEncoding};
pub use error::{Error, Result};
pub use event::{FIELD_COUNT, FIELD_DELIMITER, LogEvent, Subscriber};
pub use factory::{ChatLogWatcher, LogWatcherFactory, WatcherFactory};
pub use follow::{CloseHandle, DEFAULT_POLL_INTERVAL, FollowStream};
pub use log_watcher::{LogWatcher, WatcherState};
pub use relay::{Comment, DEFAULT_CHANNEL, RelayConfig, relay};
pub use selection::LogFileKey;
pub use stream::EventStream;

use std::path::Path;

/// Starts a watcher on `dir` and returns it with a stream of its events.
///
/// Keep the watcher alive for as long as events are wanted; dropping it ends
/// the stream.
///
/// ```rust,no_run
/// use chatlog_tail::watch_chat_log;
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (_watcher, mut events) = watch_chat_log("logs").await?;
///
///     while let Some(event) = events.next().await {
///         println!("{}: {}", event.sender_name, event.message);
///     }
///
///     Ok(())
/// }
/// ```
pub async fn watch_chat_log<P: AsRef<Path>>(dir: P) -> Result<(LogWatcher, EventStream)> {
    let mut watcher = LogWatcher::new();
    let events = watcher.events();
    watcher.start(dir).await?;
    Ok((watcher, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{TempLogDir, next_event};
    use std::time::Duration;

    #[tokio::test]
    async fn test_watch_chat_log_delivers_new_lines() {
        let dir = TempLogDir::new().unwrap();
        let (mut watcher, mut events) = watch_chat_log(dir.path()).await.unwrap();
        assert_eq!(watcher.state(), WatcherState::Running);

        let mut log = dir.create_log("ChatLog20130519_00.txt").unwrap();
        log.write_line("2013-05-17T20:07:48\t9\tGUILD\t12133620\t名\tテスト")
            .unwrap();

        let event = next_event(&mut events, Duration::from_secs(5)).await.unwrap();
        assert_eq!(event.sender_name, "名");
        watcher.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_watch_chat_log_on_missing_directory() {
        let dir = TempLogDir::new().unwrap();
        let result = watch_chat_log(dir.path().join("missing")).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
