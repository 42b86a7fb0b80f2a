//! Error types for flatkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using FlatError
pub type Result<T> = std::result::Result<T, FlatError>;

/// Unified error type for flatkv operations
#[derive(Debug, Error)]
pub enum FlatError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Short write: expected {expected} bytes, wrote {written}")]
    ShortWrite { expected: usize, written: usize },

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Format error: {0}")]
    Format(String),

    #[error("Reserved byte 0x{byte:02x} in {field}")]
    ReservedByte { byte: u8, field: &'static str },

    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    #[error("Database handle is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
