//! Error types for the chat log tailer.

use thiserror::Error;

/// The main error type for chat log tailing operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors when reading files or listing the log directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors from the notify crate.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// UTF-8 decoding errors when reading file content.
    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// UTF-16 decoding errors when reading file content.
    #[error("UTF-16 decoding error: {0}")]
    Utf16(#[from] std::string::FromUtf16Error),

    /// File path errors.
    #[error("Invalid file path: {message}")]
    InvalidPath { message: String },

    /// The source handed to a follow stream cannot be read from.
    #[error("Source is not readable: {source}")]
    NotReadable {
        #[source]
        source: std::io::Error,
    },

    /// Operation a follow stream deliberately does not offer.
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    /// The resource has been closed and can no longer be used.
    #[error("Cannot access a disposed object: {resource}")]
    Disposed { resource: &'static str },

    /// `start` was called on a watcher that is already running.
    #[error("Watcher is already running")]
    AlreadyRunning,

    /// A log line did not split into the expected number of fields.
    #[error("Malformed log line ({fields} fields): {line}")]
    MalformedLine { fields: usize, line: String },

    /// The background watch task panicked or was aborted.
    #[error("Watch task failed: {message}")]
    WorkerPanicked { message: String },
}

/// A convenient Result type for chat log tailing operations.
pub type Result<T> = std::result::Result<T, Error>;
