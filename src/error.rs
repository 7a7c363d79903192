//! Error types for filekv
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using FileKvError
pub type Result<T> = std::result::Result<T, FileKvError>;

/// Unified error type for filekv operations
#[derive(Debug, Error)]
pub enum FileKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Store is open for reading only")]
    ReadOnlyViolation,

    // -------------------------------------------------------------------------
    // Record Format Errors
    // -------------------------------------------------------------------------
    #[error("Truncated record: expected {expected} bytes, found {actual}")]
    TruncatedRecord { expected: u64, actual: u64 },

    #[error("Length {length} does not fit in a {width}-byte field")]
    EncodingOverflow { length: u64, width: u8 },

    #[error("Stored key is not valid UTF-8: {0}")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // Reader Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported seek mode: {0}")]
    UnsupportedSeekMode(i32),

    // -------------------------------------------------------------------------
    // Argument / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<FileKvError> for std::io::Error {
    fn from(err: FileKvError) -> Self {
        match err {
            FileKvError::Io(e) => e,
            e @ FileKvError::TruncatedRecord { .. } => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e)
            }
            e @ (FileKvError::UnsupportedSeekMode(_) | FileKvError::InvalidArgument(_)) => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
            }
            e => std::io::Error::new(std::io::ErrorKind::Other, e),
        }
    }
}

impl FileKvError {
    /// Whether this is a filesystem "no such file" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, FileKvError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
