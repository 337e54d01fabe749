//! Error types for readaloud

use std::io;
use thiserror::Error;

/// Main error type for readaloud
///
/// Only the fallible edges of the crate return this: engine backends,
/// configuration and the command-line host. The session controller
/// swallows engine failures and reports them through callbacks.
#[derive(Error, Debug)]
pub enum ReadAloudError {
    #[error("Speech engine error: {0}")]
    Speech(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for readaloud operations
pub type Result<T> = std::result::Result<T, ReadAloudError>;

impl From<String> for ReadAloudError {
    fn from(s: String) -> Self {
        ReadAloudError::Other(s)
    }
}

impl From<&str> for ReadAloudError {
    fn from(s: &str) -> Self {
        ReadAloudError::Other(s.to_string())
    }
}
