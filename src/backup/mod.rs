//! Backup Rotation Module
//!
//! Day-boundary maintenance of dated database copies.
//!
//! ## Responsibilities
//! - Notice when the local calendar day changes between ticks
//! - Move each tracked database to `backups/<name>.<YYYYMMDD>`
//! - Delete the copy that just fell out of the retention window
//! - Report failures without stopping the service
//!
//! Works on paths only; file contents are never opened here.

mod rotator;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::warn;

pub use rotator::{BackupRotator, RotationReport};

/// Date suffix format for backup names
pub const DATE_FORMAT: &str = "%Y%m%d";

// =============================================================================
// Collaborator Seams
// =============================================================================

/// Source of "today"
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Operator channel for backup failures
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Sends operator notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!(target: "flatkv::operator", "{}", message);
    }
}

// =============================================================================
// Naming
// =============================================================================

/// `<backup_dir>/<basename>.<YYYYMMDD>` for `database` on `date`
pub fn backup_path(backup_dir: &Path, database: &Path, date: NaiveDate) -> Option<PathBuf> {
    let mut name: OsString = database.file_name()?.to_os_string();
    name.push(".");
    name.push(date.format(DATE_FORMAT).to_string());
    Some(backup_dir.join(name))
}
