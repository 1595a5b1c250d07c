//! Error types for the Mattock library.
//!
//! All fallible operations in the crate return [`Result`], whose error type is
//! the [`MattockError`] enum below.

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Mattock operations.
///
/// Uses the `thiserror` crate for automatic `Error` trait implementation and
/// provides convenient constructor methods for the common variants.
#[derive(Error, Debug)]
pub enum MattockError {
    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Corpus loading and encoding errors
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Text analysis errors (tokenization, decoding)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Errors raised while a mining pass is running
    #[error("Mining error: {0}")]
    Mining(String),

    /// Errors in the on-disk seed/corpus storage layer
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with MattockError.
pub type Result<T> = std::result::Result<T, MattockError>;

impl MattockError {
    /// Create a new corpus error.
    pub fn corpus<S: Into<String>>(msg: S) -> Self {
        MattockError::Corpus(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        MattockError::Analysis(msg.into())
    }

    /// Create a new mining error.
    pub fn mining<S: Into<String>>(msg: S) -> Self {
        MattockError::Mining(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        MattockError::Storage(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        MattockError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        MattockError::Other(msg.into())
    }
}
