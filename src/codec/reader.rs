//! Entry Reader
//!
//! Decodes records one byte at a time from any `Read` stream.

use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::error::Result;

use super::{Decoded, Record, BLOCK_END, MAX_KEY_LEN, MAX_VALUE_LEN, SEPARATOR, VALUE_END};

/// Sequential record decoder
///
/// Wrap the stream in a `BufReader` first: every byte is a separate `read`.
pub struct EntryReader<R> {
    inner: R,
    /// Key buffer size (K)
    max_key_len: usize,
    /// Value buffer size (V)
    max_value_len: usize,
    /// Block end consumed while finishing the previous record
    pending_block_end: bool,
}

impl<R: Read> EntryReader<R> {
    /// Reader with the standard K/V limits
    pub fn new(inner: R) -> Self {
        Self::with_limits(inner, MAX_KEY_LEN, MAX_VALUE_LEN)
    }

    /// Reader with custom buffer sizes (each clamped to at least 2)
    pub fn with_limits(inner: R, max_key_len: usize, max_value_len: usize) -> Self {
        Self {
            inner,
            max_key_len: max_key_len.max(2),
            max_value_len: max_value_len.max(2),
            pending_block_end: false,
        }
    }

    /// Decode the next entry
    ///
    /// Returns:
    /// - `Ok(Decoded::Entry(_))` — a record, possibly truncated
    /// - `Ok(Decoded::BlockEnd)` — end-of-block between records
    /// - `Ok(Decoded::Eof)` — end of stream; an unterminated tail is dropped
    /// - `Err(FlatError::Io)` — the stream faulted
    pub fn read_entry(&mut self) -> Result<Decoded> {
        if std::mem::take(&mut self.pending_block_end) {
            return Ok(Decoded::BlockEnd);
        }

        let mut key = Vec::new();
        let mut value = Vec::new();
        let mut in_value = false;
        // Set when key overflow moved us into the value early
        let mut key_overflowed = false;
        let mut consumed = 0usize;

        loop {
            let byte = match self.read_byte()? {
                Some(b) => b,
                None => {
                    if consumed > 0 {
                        debug!("Discarding {} bytes of unterminated record at end of stream", consumed);
                    }
                    return Ok(Decoded::Eof);
                }
            };
            consumed += 1;

            match byte {
                BLOCK_END if !in_value => return Ok(Decoded::BlockEnd),
                BLOCK_END => {
                    // Value closed by the block terminator: report the block next call
                    self.pending_block_end = true;
                    return Ok(Decoded::Entry(Record { key, value }));
                }
                VALUE_END => return Ok(Decoded::Entry(Record { key, value })),
                // The real separator after a key overflow is skipped; any other
                // separator starts the value over
                SEPARATOR if key_overflowed => key_overflowed = false,
                SEPARATOR => {
                    in_value = true;
                    value.clear();
                }
                _ if !in_value => {
                    if key.len() == self.max_key_len - 1 {
                        // Key full: the overflow spills into the value
                        in_value = true;
                        key_overflowed = true;
                        value.push(byte);
                    } else {
                        key.push(byte);
                    }
                }
                _ => {
                    if value.len() == self.max_value_len - 1 {
                        self.skip_record()?;
                        return Ok(Decoded::Entry(Record { key, value }));
                    }
                    value.push(byte);
                }
            }
        }
    }

    /// Collect records up to the next block end; `None` at end of stream
    pub fn read_block(&mut self) -> Result<Option<Vec<Record>>> {
        let mut records = Vec::new();
        loop {
            match self.read_entry()? {
                Decoded::Entry(record) => records.push(record),
                Decoded::BlockEnd => return Ok(Some(records)),
                Decoded::Eof if records.is_empty() => return Ok(None),
                Decoded::Eof => {
                    debug!("Block of {} records ended without terminator", records.len());
                    return Ok(Some(records));
                }
            }
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Drop the rest of an over-long record up to its terminator
    fn skip_record(&mut self) -> Result<()> {
        let mut skipped = 1usize;
        while let Some(byte) = self.read_byte()? {
            match byte {
                VALUE_END => break,
                BLOCK_END => {
                    self.pending_block_end = true;
                    break;
                }
                _ => skipped += 1,
            }
        }
        debug!("Value truncated, skipped {} bytes", skipped);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
