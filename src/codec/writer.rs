//! Entry Writer
//!
//! Encodes records and block terminators onto any `Write` stream.

use std::fmt;
use std::io::Write;

use crate::error::{FlatError, Result};

use super::{check_reserved, WriteOutcome, BLOCK_END, MAX_VALUE_LEN, NULL_MARKER, SEPARATOR, VALUE_END};

/// Sequential record encoder
///
/// Each record goes out in one `write` call. A short write is an error; the
/// caller owns recovery of the file it was writing.
pub struct EntryWriter<W> {
    inner: W,
    /// Value buffer size (V)
    max_value_len: usize,
}

impl<W: Write> EntryWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_value_limit(inner, MAX_VALUE_LEN)
    }

    /// Writer with a custom value buffer size (clamped to at least 2)
    pub fn with_value_limit(inner: W, max_value_len: usize) -> Self {
        Self {
            inner,
            max_value_len: max_value_len.max(2),
        }
    }

    /// Format and write one entry
    ///
    /// `None`, or a value that formats to `"(null)"`, writes nothing and
    /// returns `NoValue`. Longer values are cut to V - 1 bytes.
    pub fn write_entry<V: fmt::Display>(
        &mut self,
        key: impl AsRef<[u8]>,
        value: Option<V>,
    ) -> Result<WriteOutcome> {
        let Some(value) = value else {
            return Ok(WriteOutcome::NoValue);
        };

        let mut text = value.to_string();
        if text.eq_ignore_ascii_case(NULL_MARKER) {
            return Ok(WriteOutcome::NoValue);
        }
        truncate_at_char_boundary(&mut text, self.max_value_len - 1);

        self.write_record(key.as_ref(), text.as_bytes())?;
        Ok(WriteOutcome::Written)
    }

    /// Write one raw record: key, separator, value, end-of-value
    pub fn write_record(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        check_reserved(key, "key")?;
        check_reserved(value, "value")?;

        let value = &value[..value.len().min(self.max_value_len - 1)];

        let mut buf = Vec::with_capacity(key.len() + value.len() + 2);
        buf.extend_from_slice(key);
        buf.push(SEPARATOR);
        buf.extend_from_slice(value);
        buf.push(VALUE_END);

        self.write_once(&buf)
    }

    /// Write the end-of-block sentinel
    pub fn write_block_end(&mut self) -> Result<()> {
        self.write_once(&[BLOCK_END])
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_once(&mut self, buf: &[u8]) -> Result<()> {
        let written = self.inner.write(buf)?;
        if written < buf.len() {
            return Err(FlatError::ShortWrite {
                expected: buf.len(),
                written,
            });
        }
        Ok(())
    }
}

/// Cut `text` to at most `max` bytes without splitting a character
fn truncate_at_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}
