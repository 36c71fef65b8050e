//! Stream adapter over a watcher's subscriber list.

use crate::event::{LogEvent, Subscriber};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A stream of events from a [`LogWatcher`](crate::LogWatcher).
///
/// Created by [`LogWatcher::events`](crate::LogWatcher::events). The stream
/// ends once the watcher and its watch task are gone.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<LogEvent>,
}

impl EventStream {
    /// Creates the stream together with the subscriber feeding it.
    pub(crate) fn channel() -> (Subscriber, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber: Subscriber = Box::new(move |event: &LogEvent| {
            // The receiving side may have been dropped; events are then discarded.
            let _ = tx.send(event.clone());
        });
        (subscriber, Self { receiver: rx })
    }

    /// Check if every sender has been dropped
    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl Stream for EventStream {
    type Item = LogEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}
