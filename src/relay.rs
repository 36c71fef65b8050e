//! Relays chat lines from one channel as stream comments.
//!
//! Posting itself is left to the caller; this module only decides which
//! events become comments and under which name.

use crate::error::Result;
use crate::event::LogEvent;
use crate::factory::WatcherFactory;
use std::future::Future;
use std::path::Path;
use tracing::debug;

/// Channel relayed when nothing else is configured.
pub const DEFAULT_CHANNEL: &str = "GUILD";

/// Which events are relayed and how their senders are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub channel: String,
    /// In-game name to replace with [`stream_user`](Self::stream_user).
    pub game_user: Option<String>,
    pub stream_user: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            game_user: None,
            stream_user: None,
        }
    }
}

/// A comment ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    pub text: String,
}

impl RelayConfig {
    /// The comment for `event`, or `None` if its channel is not relayed.
    pub fn comment_for(&self, event: &LogEvent) -> Option<Comment> {
        if event.channel != self.channel {
            return None;
        }

        let author = match (&self.game_user, &self.stream_user) {
            (Some(game_user), Some(stream_user)) if *game_user == event.sender_name => {
                stream_user.clone()
            }
            _ => event.sender_name.clone(),
        };
        Some(Comment {
            author,
            text: event.message.clone(),
        })
    }
}

/// Watches `dir` and posts every relayed line until `wait` completes.
///
/// Returns the result of stopping the watcher, so a fault of the watch task
/// is reported here.
pub async fn relay<F, P, W>(
    factory: &F,
    dir: &Path,
    config: RelayConfig,
    mut post: P,
    wait: W,
) -> Result<()>
where
    F: WatcherFactory + ?Sized,
    P: FnMut(Comment) + Send + 'static,
    W: Future<Output = ()>,
{
    let mut watcher = factory.create_watcher();
    watcher.subscribe(Box::new(move |event| {
        if let Some(comment) = config.comment_for(event) {
            debug!(author = %comment.author, channel = %event.channel, "relaying chat line");
            post(comment);
        }
    }));

    watcher.start(dir).await?;
    wait.await;
    watcher.stop().await
}
