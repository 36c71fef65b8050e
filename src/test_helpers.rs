//! Test utilities for creating temporary chat log directories and collecting events.

#[cfg(test)]
use crate::config::WatcherConfig;
#[cfg(test)]
use crate::event::LogEvent;
#[cfg(test)]
use crate::stream::EventStream;
#[cfg(test)]
use std::fs::{File, OpenOptions};
#[cfg(test)]
use std::io::Write;
#[cfg(test)]
use std::path::Path;
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
pub struct TempLogDir {
    _temp_dir: tempfile::TempDir,
}

#[cfg(test)]
impl TempLogDir {
    /// Create a new empty log directory
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            _temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Create a log file the way the game does: UTF-16LE with a byte order mark
    pub fn create_log(&self, name: &str) -> std::io::Result<ChatLogWriter> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path().join(name))?;
        file.write_all(&[0xFF, 0xFE])?;
        file.flush()?;
        Ok(ChatLogWriter { file })
    }

    /// Create an empty file, as an editor does before saving
    pub fn touch(&self, name: &str) -> std::io::Result<()> {
        File::create(self.path().join(name))?;
        Ok(())
    }

    pub fn remove(&self, name: &str) -> std::io::Result<()> {
        std::fs::remove_file(self.path().join(name))
    }
}

#[cfg(test)]
pub struct ChatLogWriter {
    file: File,
}

#[cfg(test)]
impl ChatLogWriter {
    /// Append one CRLF-terminated UTF-16LE line
    pub fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let bytes: Vec<u8> = format!("{line}\r\n")
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        self.file.write_all(&bytes)?;
        self.file.flush()
    }
}

/// Short intervals so tests do not wait on production timings
#[cfg(test)]
pub fn fast_config() -> WatcherConfig {
    WatcherConfig::default()
        .with_poll_interval(Duration::from_millis(20))
        .with_scan_interval(Duration::from_millis(30))
        .with_settle_delay(Duration::from_millis(50))
}

/// Wait for the next event, or `None` if nothing arrives in time
#[cfg(test)]
pub async fn next_event(stream: &mut EventStream, timeout: Duration) -> Option<LogEvent> {
    use tokio_stream::StreamExt;

    tokio::time::timeout(timeout, stream.next())
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_log_writes_bom() {
        let dir = TempLogDir::new().unwrap();
        let mut log = dir.create_log("ChatLog20130519_00.txt").unwrap();
        log.write_line("a").unwrap();

        let content = std::fs::read(dir.path().join("ChatLog20130519_00.txt")).unwrap();
        assert_eq!(content, vec![0xFF, 0xFE, b'a', 0, b'\r', 0, b'\n', 0]);
    }

    #[test]
    fn test_create_log_refuses_existing_file() {
        let dir = TempLogDir::new().unwrap();
        dir.touch("ChatLog20130519_00.txt").unwrap();
        assert!(dir.create_log("ChatLog20130519_00.txt").is_err());
    }

    #[test]
    fn test_touch_and_remove() {
        let dir = TempLogDir::new().unwrap();
        dir.touch("ChatLog20130520_00.txt").unwrap();
        assert!(dir.path().join("ChatLog20130520_00.txt").exists());

        dir.remove("ChatLog20130520_00.txt").unwrap();
        assert!(!dir.path().join("ChatLog20130520_00.txt").exists());
    }
}
