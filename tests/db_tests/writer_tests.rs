//! Tests for DbWriter

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use flatkv::db::{self, DbPaths};
use flatkv::{DbHandle, DbWriter, FlatError, Record, WriteOutcome};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_db() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("server.db");
    (temp_dir, path)
}

/// Writes the previous generation through the public API
fn write_generation(path: &PathBuf, version: u32, records: &[Record]) {
    let mut writer = DbWriter::create(path, version).unwrap();
    writer.write_block(records).unwrap();
    writer.close().unwrap();
}

/// Stream that accepts `budget` bytes, then reports zero-length writes
struct LimitedStream {
    budget: usize,
    data: Vec<u8>,
}

impl Write for LimitedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.budget);
        self.budget -= n;
        self.data.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Stream whose writes succeed but whose flush fails
struct UnflushableStream;

impl Write for UnflushableStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "device gone"))
    }
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_header_bytes_for_version_five() {
    let (_temp, path) = setup_temp_db();

    let writer = DbWriter::create(&path, 5).unwrap();
    writer.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), vec![0x00, 0x00, 0x00, 0x05]);
}

#[test]
fn test_header_bytes_high_version() {
    let (_temp, path) = setup_temp_db();

    let writer = DbWriter::create(&path, 0xDEAD_BEEF).unwrap();
    assert_eq!(writer.header().core_format_version, 0xDEAD_BEEF);
    writer.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
}

// =============================================================================
// Generation Tests
// =============================================================================

#[test]
fn test_previous_generation_kept_until_close() {
    let (_temp, path) = setup_temp_db();
    write_generation(&path, 1, &[Record::new("gen", "1")]);
    let old = fs::read(&path).unwrap();
    let paths = DbPaths::for_primary(path.clone());

    let writer = DbWriter::create(&path, 1).unwrap();
    assert_eq!(fs::read(&paths.backup).unwrap(), old);

    writer.close().unwrap();
    assert!(!paths.backup.exists());
}

#[test]
fn test_write_entry_none_is_no_value() {
    let (_temp, path) = setup_temp_db();

    let mut writer = DbWriter::create(&path, 1).unwrap();
    assert_eq!(writer.write_entry("gone", None::<u32>).unwrap(), WriteOutcome::NoValue);
    assert_eq!(writer.write_entry("count", Some(7u32)).unwrap(), WriteOutcome::Written);
    writer.write_block_end().unwrap();
    writer.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"\0\0\0\x01count^7\0\n".to_vec());
}

#[test]
fn test_reserved_byte_does_not_roll_back() {
    let (_temp, path) = setup_temp_db();

    let mut writer = DbWriter::create(&path, 1).unwrap();
    assert!(matches!(
        writer.write_entry("a^b", Some("v")),
        Err(FlatError::ReservedByte { .. })
    ));
    assert!(writer.is_open());
    writer.write_entry("ok", Some("v")).unwrap();
    writer.close().unwrap();
}

// =============================================================================
// Creation Rollback Tests
// =============================================================================

#[test]
fn test_failed_header_write_restores_previous_file() {
    let (_temp, path) = setup_temp_db();
    write_generation(&path, 2, &[Record::new("keep", "me")]);
    let before = fs::read(&path).unwrap();

    let result = DbWriter::create_with(&path, 9, "", |_| {
        Ok(LimitedStream {
            budget: 2,
            data: Vec::new(),
        })
    });

    assert!(matches!(result, Err(FlatError::ShortWrite { .. })));
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(!DbPaths::for_primary(path.clone()).backup.exists());
}

#[test]
fn test_failed_open_restores_previous_file() {
    let (_temp, path) = setup_temp_db();
    write_generation(&path, 2, &[Record::new("keep", "me")]);
    let before = fs::read(&path).unwrap();

    let result = DbWriter::<LimitedStream>::create_with(&path, 9, "", |_| {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    });

    assert!(matches!(result, Err(FlatError::Io(_))));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_failed_creation_without_previous_file() {
    let (_temp, path) = setup_temp_db();

    let result = DbWriter::create_with(&path, 1, "", |_| {
        Ok(LimitedStream {
            budget: 0,
            data: Vec::new(),
        })
    });

    assert!(result.is_err());
    assert!(!path.exists());
}

#[test]
fn test_failed_backup_rename_keeps_previous_file() {
    let (_temp, path) = setup_temp_db();
    write_generation(&path, 2, &[Record::new("keep", "me")]);
    let before = fs::read(&path).unwrap();

    // A non-empty directory squatting on the .temp path blocks the rename
    let backup = DbPaths::for_primary(path.clone()).backup;
    fs::create_dir(&backup).unwrap();
    fs::write(backup.join("stray"), b"x").unwrap();

    let result = DbWriter::create_with(&path, 9, "", |p| {
        fs::File::create(p)?;
        Ok(LimitedStream {
            budget: 2,
            data: Vec::new(),
        })
    });

    assert!(matches!(result, Err(FlatError::Io(_))));
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(backup.join("stray").exists());
}

// =============================================================================
// Write Failure Recovery Tests
// =============================================================================

#[test]
fn test_short_entry_write_restores_previous_generation() {
    let (_temp, path) = setup_temp_db();
    write_generation(&path, 1, &[Record::new("old", "data")]);
    let before = fs::read(&path).unwrap();

    // Header fits, the first record does not
    let mut writer = DbWriter::create_with(&path, 1, "", |_| {
        Ok(LimitedStream {
            budget: 6,
            data: Vec::new(),
        })
    })
    .unwrap();

    assert!(matches!(
        writer.write_entry("new", Some("data")),
        Err(FlatError::ShortWrite { .. })
    ));
    assert!(!writer.is_open());
    assert_eq!(fs::read(&path).unwrap(), before);

    assert!(matches!(writer.write_entry("more", Some("x")), Err(FlatError::Closed)));
    assert!(matches!(writer.write_block_end(), Err(FlatError::Closed)));
    writer.close().unwrap();
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_short_block_end_restores_previous_generation() {
    let (_temp, path) = setup_temp_db();
    write_generation(&path, 1, &[Record::new("old", "data")]);
    let before = fs::read(&path).unwrap();

    let mut writer = DbWriter::create_with(&path, 1, "", |_| {
        Ok(LimitedStream {
            budget: 4 + "k^v\0".len(),
            data: Vec::new(),
        })
    })
    .unwrap();

    writer.write_entry("k", Some("v")).unwrap();
    assert!(writer.write_block_end().is_err());
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_failed_flush_on_close_restores_previous_generation() {
    let (_temp, path) = setup_temp_db();
    write_generation(&path, 1, &[Record::new("old", "data")]);
    let before = fs::read(&path).unwrap();

    let mut writer = DbWriter::create_with(&path, 1, "", |_| Ok(UnflushableStream)).unwrap();
    writer.write_entry("k", Some("v")).unwrap();

    assert!(matches!(writer.close(), Err(FlatError::Io(_))));
    assert_eq!(fs::read(&path).unwrap(), before);
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_optional_writer() {
    let (_temp, path) = setup_temp_db();

    let writer = Some(DbWriter::create(&path, 1).unwrap());
    db::close(writer).unwrap();
    db::close::<DbWriter>(None).unwrap();

    assert!(path.exists());
}

#[test]
fn test_sync_then_close() {
    let (_temp, path) = setup_temp_db();

    let mut writer = DbWriter::create_as(&path, 4, "ChanServ").unwrap();
    assert_eq!(writer.header().owner_tag, "ChanServ");
    writer.write_entry("k", Some("v")).unwrap();
    writer.sync().unwrap();
    writer.close().unwrap();

    assert_eq!(fs::read(&path).unwrap().len(), 4 + "k^v\0".len());
}
