//! Entry Codec
//!
//! Sentinel-delimited key/value framing. No length prefixes: every field is
//! terminated by a reserved byte.
//!
//! ## Record Format
//! ```text
//! ┌───────────┬─────────┬─────────────┬──────────┐
//! │ Key bytes │ SEP (^) │ Value bytes │ VEND (0) │
//! └───────────┴─────────┴─────────────┴──────────┘
//! ```
//!
//! A block is a run of records followed by a single `BLOCK_END` (`\n`).
//! The three sentinels may never appear inside a key or value; the writer
//! rejects them instead of escaping.

mod reader;
mod writer;

use std::borrow::Cow;

use crate::error::{FlatError, Result};

pub use reader::EntryReader;
pub use writer::EntryWriter;

// =============================================================================
// Shared Constants (used by reader and writer)
// =============================================================================

/// Terminates the key
pub const SEPARATOR: u8 = b'^';

/// Terminates the value
pub const VALUE_END: u8 = 0x00;

/// Terminates a block of records
pub const BLOCK_END: u8 = b'\n';

/// Key buffer size (K); stored keys hold at most K - 1 bytes
pub const MAX_KEY_LEN: usize = 128;

/// Value buffer size (V); stored values hold at most V - 1 bytes
pub const MAX_VALUE_LEN: usize = 1024;

/// Formatted value text meaning "absent upstream, skip this record"
pub const NULL_MARKER: &str = "(null)";

// =============================================================================
// Record Types
// =============================================================================

/// One key/value pair inside a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    pub fn value_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// Outcome of reading one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete record
    Entry(Record),
    /// End-of-block sentinel between records
    BlockEnd,
    /// Physical end of stream
    Eof,
}

/// Outcome of writing one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Value was absent; nothing was written
    NoValue,
}

/// Returns true for the three framing bytes
pub fn is_reserved(byte: u8) -> bool {
    matches!(byte, SEPARATOR | VALUE_END | BLOCK_END)
}

/// Reject fields that would break framing
pub(crate) fn check_reserved(bytes: &[u8], field: &'static str) -> Result<()> {
    match bytes.iter().copied().find(|b| is_reserved(*b)) {
        Some(byte) => Err(FlatError::ReservedByte { byte, field }),
        None => Ok(()),
    }
}
