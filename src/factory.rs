//! Creation seam for watchers, so consumers can be tested against fakes.

use crate::config::WatcherConfig;
use crate::error::Result;
use crate::event::Subscriber;
use crate::log_watcher::LogWatcher;
use async_trait::async_trait;
use std::path::Path;

/// The watcher operations a consumer relies on.
#[async_trait]
pub trait ChatLogWatcher: Send {
    fn subscribe(&mut self, subscriber: Subscriber);

    async fn start(&mut self, dir: &Path) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;
}

#[async_trait]
impl ChatLogWatcher for LogWatcher {
    fn subscribe(&mut self, subscriber: Subscriber) {
        self.add_subscriber(subscriber);
    }

    async fn start(&mut self, dir: &Path) -> Result<()> {
        LogWatcher::start(self, dir).await
    }

    async fn stop(&mut self) -> Result<()> {
        LogWatcher::stop(self).await
    }
}

/// Produces fresh watchers.
pub trait WatcherFactory: Send + Sync {
    fn create_watcher(&self) -> Box<dyn ChatLogWatcher>;
}

/// Builds [`LogWatcher`]s sharing one configuration.
#[derive(Debug, Clone, Default)]
pub struct LogWatcherFactory {
    config: WatcherConfig,
}

impl LogWatcherFactory {
    pub fn new(config: WatcherConfig) -> Self {
        Self { config }
    }
}

impl WatcherFactory for LogWatcherFactory {
    fn create_watcher(&self) -> Box<dyn ChatLogWatcher> {
        Box::new(LogWatcher::with_config(self.config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_helpers::{TempLogDir, fast_config};

    #[tokio::test]
    async fn test_factory_watchers_are_independent() {
        let dir = TempLogDir::new().unwrap();
        let factory = LogWatcherFactory::new(fast_config());

        let mut first = factory.create_watcher();
        let mut second = factory.create_watcher();

        first.start(dir.path()).await.unwrap();
        second.start(dir.path()).await.unwrap();
        first.stop().await.unwrap();

        assert!(matches!(
            first.start(dir.path()).await,
            Err(Error::Disposed { .. })
        ));
        assert!(matches!(
            second.start(dir.path()).await,
            Err(Error::AlreadyRunning)
        ));
        second.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_through_trait_object() {
        let dir = TempLogDir::new().unwrap();
        let factory = LogWatcherFactory::new(fast_config());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let mut watcher = factory.create_watcher();
        watcher.subscribe(Box::new(move |event| {
            let _ = tx.send(event.sender_name.clone());
        }));
        watcher.start(dir.path()).await.unwrap();

        let mut log = dir.create_log("ChatLog20130519_00.txt").unwrap();
        log.write_line("2013-05-17T20:07:48\t9\tGUILD\t12133620\t白 菜\tテスト")
            .unwrap();

        let name = tokio::time::timeout(std::time::Duration::from_secs(3), rx.recv())
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("白 菜"));
        watcher.stop().await.unwrap();
    }
}
