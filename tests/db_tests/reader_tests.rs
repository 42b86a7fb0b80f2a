//! Tests for DbReader

use std::fs;
use std::path::PathBuf;

use flatkv::db::{self, DbPaths};
use flatkv::{DbHandle, DbReader, DbWriter, Decoded, FlatError, Record};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_db() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("chan.db");
    (temp_dir, path)
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_missing_file_returns_none() {
    let (_temp, path) = setup_temp_db();
    assert!(DbReader::open(&path).unwrap().is_none());
}

#[test]
fn test_open_reads_version_five() {
    let (_temp, path) = setup_temp_db();
    fs::write(&path, [0x00u8, 0x00, 0x00, 0x05, b'\n']).unwrap();

    let reader = DbReader::open(&path).unwrap().unwrap();

    assert_eq!(reader.format_version(), 5);
    assert_eq!(reader.header().format_version, 5);
    reader.close().unwrap();
}

#[test]
fn test_open_rejects_version_zero() {
    let (_temp, path) = setup_temp_db();
    fs::write(&path, [0u8, 0, 0, 0]).unwrap();

    assert!(matches!(DbReader::open(&path), Err(FlatError::Format(_))));
}

#[test]
fn test_open_rejects_truncated_header() {
    let (_temp, path) = setup_temp_db();
    fs::write(&path, [0u8, 0, 1]).unwrap();

    assert!(matches!(DbReader::open(&path), Err(FlatError::Format(_))));
}

#[test]
fn test_open_empty_file_is_format_error() {
    let (_temp, path) = setup_temp_db();
    fs::write(&path, b"").unwrap();

    assert!(matches!(DbReader::open(&path), Err(FlatError::Format(_))));
}

#[test]
fn test_open_as_records_owner() {
    let (_temp, path) = setup_temp_db();
    fs::write(&path, [0u8, 0, 0, 1]).unwrap();

    let reader = DbReader::open_as(&path, "StatServ").unwrap().unwrap();
    assert_eq!(reader.header().owner_tag, "StatServ");
    assert_eq!(reader.paths().primary, path);
}

#[test]
fn test_reader_core_version_is_file_version() {
    let (_temp, path) = setup_temp_db();
    fs::write(&path, [0u8, 0, 0, 7]).unwrap();

    let reader = DbReader::open(&path).unwrap().unwrap();
    assert_eq!(reader.header().core_format_version, 7);
    assert_eq!(reader.header().core_format_version, reader.format_version());
    reader.close().unwrap();
}

// =============================================================================
// Reading Tests
// =============================================================================

#[test]
fn test_read_back_written_blocks() {
    let (_temp, path) = setup_temp_db();

    let channels = vec![Record::new("name", "#rust"), Record::new("topic", "welcome")];
    let servers = vec![Record::new("name", "irc.example.net")];

    let mut writer = DbWriter::create(&path, 3).unwrap();
    writer.write_block(&channels).unwrap();
    writer.write_block(&servers).unwrap();
    writer.close().unwrap();

    let mut reader = DbReader::open(&path).unwrap().unwrap();
    assert_eq!(reader.format_version(), 3);
    assert_eq!(reader.read_all().unwrap(), vec![channels, servers]);
    assert_eq!(reader.read_entry().unwrap(), Decoded::Eof);
    reader.close().unwrap();
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_reader_close_removes_leftover_temp() {
    let (_temp, path) = setup_temp_db();
    fs::write(&path, [0u8, 0, 0, 1]).unwrap();
    let paths = DbPaths::for_primary(path.clone());
    fs::write(&paths.backup, b"stale").unwrap();

    let reader = DbReader::open(&path).unwrap().unwrap();
    reader.close().unwrap();

    assert!(path.exists());
    assert!(!paths.backup.exists());
}

#[test]
fn test_close_none_is_noop() {
    assert!(db::close::<DbReader>(None).is_ok());
}
