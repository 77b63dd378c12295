//! Error types for scrollkv
//!
//! Provides a unified error type for all operations.
//!
//! Absence is never an error: a missing key reads as `Ok(None)` and deleting
//! it is `Ok(())`.

use thiserror::Error;

/// Result type alias using ScrollError
pub type Result<T> = std::result::Result<T, ScrollError>;

/// Unified error type for scrollkv operations
#[derive(Debug, Error)]
pub enum ScrollError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("Log corruption detected: {0}")]
    CorruptLog(String),

    // -------------------------------------------------------------------------
    // Search Errors
    // -------------------------------------------------------------------------
    #[error("Search is disabled for this store")]
    SearchDisabled,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for ScrollError {
    fn from(e: bincode::Error) -> Self {
        ScrollError::Serialization(e.to_string())
    }
}
