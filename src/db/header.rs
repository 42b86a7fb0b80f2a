//! Version header
//!
//! Four bytes, most significant first, each moved with its own read or
//! write call.

use std::io::{ErrorKind, Read, Write};

use crate::error::{FlatError, Result};

/// Header size in bytes
pub const HEADER_LEN: usize = 4;

/// Write `version` as four single-byte writes
pub fn write_version<W: Write>(writer: &mut W, version: u32) -> Result<()> {
    for shift in [24u32, 16, 8, 0] {
        let byte = ((version >> shift) & 0xFF) as u8;
        let written = writer.write(&[byte])?;
        if written != 1 {
            return Err(FlatError::ShortWrite {
                expected: 1,
                written,
            });
        }
    }
    Ok(())
}

/// Read a version written by [`write_version`]
///
/// End of stream before the fourth byte is a format error.
pub fn read_version<R: Read>(reader: &mut R) -> Result<u32> {
    let mut version = 0u32;
    for index in 0..HEADER_LEN {
        let mut byte = [0u8; 1];
        let read = loop {
            match reader.read(&mut byte) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if read == 0 {
            return Err(FlatError::Format(format!(
                "end of file after {} of {} version bytes",
                index, HEADER_LEN
            )));
        }
        version = (version << 8) | u32::from(byte[0]);
    }
    Ok(version)
}
