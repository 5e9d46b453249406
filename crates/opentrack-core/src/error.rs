//! Error types for the opentrack core crate.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or decoding open events.
#[derive(Error, Debug)]
pub enum Error {
    /// An identifier was rejected by the active identifier policy.
    #[error("invalid email identifier '{id}': {reason}")]
    InvalidIdentifier {
        /// The rejected identifier.
        id: String,
        /// Description of what's wrong.
        reason: &'static str,
    },

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
