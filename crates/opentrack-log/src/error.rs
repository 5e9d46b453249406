//! Error types for the event log.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while recording or reading open events.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error on the log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Event encoding error.
    #[error("event error: {0}")]
    Event(#[from] opentrack_core::Error),

    /// The writer thread has shut down and no longer accepts events.
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// The writer thread panicked.
    #[error("event writer thread panicked")]
    WriterPanicked,
}
