//! Parsed chat log records and the subscribers they are dispatched to.

use crate::error::{Error, Result};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

/// Column separator in a chat log line.
pub const FIELD_DELIMITER: char = '\t';

/// Number of columns in a chat log line.
pub const FIELD_COUNT: usize = 6;

/// One chat log line split into its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub time: String,
    pub message_id: String,
    /// Chat channel such as `GUILD`, `PARTY` or `PUBLIC`.
    pub channel: String,
    pub sender_id: String,
    pub sender_name: String,
    pub message: String,
}

impl LogEvent {
    /// Splits `line` into the six columns.
    ///
    /// The message is the last column and keeps any further tabs it contains.
    /// Columns are not validated.
    pub fn parse_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.splitn(FIELD_COUNT, FIELD_DELIMITER).collect();
        let [time, message_id, channel, sender_id, sender_name, message] = fields[..] else {
            return Err(Error::MalformedLine {
                fields: fields.len(),
                line: line.to_string(),
            });
        };

        Ok(Self {
            time: time.to_string(),
            message_id: message_id.to_string(),
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            message: message.to_string(),
        })
    }
}

impl FromStr for LogEvent {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        Self::parse_line(line)
    }
}

/// Callback invoked for every dispatched event.
pub type Subscriber = Box<dyn FnMut(&LogEvent) + Send>;

/// Ordered subscriber list shared between a watcher and its watch task.
#[derive(Clone, Default)]
pub(crate) struct Subscribers {
    inner: Arc<Mutex<Vec<Subscriber>>>,
}

impl Subscribers {
    pub(crate) fn add(&self, subscriber: Subscriber) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }

    /// Calls every subscriber in registration order.
    pub(crate) fn dispatch(&self, event: &LogEvent) {
        let mut subscribers = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for subscriber in subscribers.iter_mut() {
            subscriber(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "2013-05-17T20:07:48\t9\tGUILD\t12133620\t名\tテスト";

    #[test]
    fn test_parse_line_fields_in_order() {
        let event = LogEvent::parse_line(LINE).unwrap();

        assert_eq!(event.time, "2013-05-17T20:07:48");
        assert_eq!(event.message_id, "9");
        assert_eq!(event.channel, "GUILD");
        assert_eq!(event.sender_id, "12133620");
        assert_eq!(event.sender_name, "名");
        assert_eq!(event.message, "テスト");
    }

    #[test]
    fn test_message_keeps_extra_tabs() {
        let event: LogEvent = "t\t1\tPARTY\t2\tname\thello\tworld".parse().unwrap();
        assert_eq!(event.message, "hello\tworld");
    }

    #[test]
    fn test_empty_columns_are_accepted() {
        let event = LogEvent::parse_line("\t\t\t\t\t").unwrap();
        assert_eq!(event.time, "");
        assert_eq!(event.message, "");
    }

    #[test]
    fn test_too_few_fields() {
        let result = LogEvent::parse_line("2013-05-17T20:07:48\t9\tGUILD");
        match result {
            Err(Error::MalformedLine { fields, line }) => {
                assert_eq!(fields, 3);
                assert_eq!(line, "2013-05-17T20:07:48\t9\tGUILD");
            }
            other => panic!("Expected MalformedLine, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let subscribers = Subscribers::default();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let calls = Arc::clone(&calls);
            subscribers.add(Box::new(move |event: &LogEvent| {
                calls.lock().unwrap().push((id, event.message_id.clone()));
            }));
        }

        let event = LogEvent::parse_line(LINE).unwrap();
        subscribers.dispatch(&event);

        assert_eq!(subscribers.len(), 3);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![(0, "9".to_string()), (1, "9".to_string()), (2, "9".to_string())]
        );
    }
}
