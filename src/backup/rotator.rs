//! Backup Rotator
//!
//! Holds the last processed day and performs rotate + prune when it changes.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use tracing::{debug, info, info_span, warn};

use crate::config::Config;

use super::{backup_path, Clock, LocalClock, LogNotifier, Notifier};

/// What one rotation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    /// Day the backups are stamped with
    pub date: NaiveDate,
    /// Backups created
    pub rotated: Vec<PathBuf>,
    /// Databases that could not be moved
    pub failed: Vec<PathBuf>,
    /// Expired backups deleted
    pub pruned: Vec<PathBuf>,
}

/// Day-boundary rotation over a set of database files
///
/// The first tick only records the current day. Later ticks rotate once per
/// day change.
pub struct BackupRotator {
    enabled: bool,
    retention_days: u32,
    backup_dir: PathBuf,
    databases: Vec<PathBuf>,
    /// `None` until the first tick
    last_day: Option<NaiveDate>,
    clock: Box<dyn Clock>,
    notifier: Box<dyn Notifier>,
}

impl BackupRotator {
    /// Rotator over every database tracked by `config`
    pub fn new(config: &Config) -> Self {
        Self::with_databases(config, config.database_paths())
    }

    /// Rotator over a single auxiliary database owned by one component
    pub fn for_database(config: &Config, path: impl Into<PathBuf>) -> Self {
        Self::with_databases(config, vec![path.into()])
    }

    fn with_databases(config: &Config, databases: Vec<PathBuf>) -> Self {
        Self {
            enabled: config.keep_backups,
            retention_days: config.keep_backups_for,
            backup_dir: config.backup_path(),
            databases,
            last_day: None,
            clock: Box::new(LocalClock),
            notifier: Box::new(LogNotifier),
        }
    }

    /// Replace the date source
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the operator channel
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn databases(&self) -> &[PathBuf] {
        &self.databases
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Day of the last rotation (or of arming)
    pub fn last_day(&self) -> Option<NaiveDate> {
        self.last_day
    }

    /// Run day-boundary maintenance
    ///
    /// Returns a report only when a rotation actually ran.
    pub fn on_tick(&mut self) -> Option<RotationReport> {
        if !self.enabled {
            return None;
        }

        let today = self.clock.today();
        let Some(last_day) = self.last_day else {
            debug!("Backup rotation armed on {}", today);
            self.last_day = Some(today);
            return None;
        };
        if last_day == today {
            return None;
        }

        let span = info_span!("db_backup", date = %today);
        let _guard = span.enter();
        info!("Backing up databases");

        let mut report = RotationReport {
            date: today,
            rotated: Vec::new(),
            failed: Vec::new(),
            pruned: Vec::new(),
        };
        self.rotate(today, &mut report);
        self.prune(today, &mut report);
        self.last_day = Some(today);

        info!(
            rotated = report.rotated.len(),
            failed = report.failed.len(),
            pruned = report.pruned.len(),
            "Backup finished"
        );
        Some(report)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn rotate(&self, today: NaiveDate, report: &mut RotationReport) {
        if let Err(e) = fs::create_dir_all(&self.backup_dir) {
            debug!("Unable to create {}: {}", self.backup_dir.display(), e);
        }

        for database in &self.databases {
            let Some(dest) = backup_path(&self.backup_dir, database, today) else {
                self.report_failure(database, "no file name");
                report.failed.push(database.clone());
                continue;
            };

            match fs::rename(database, &dest) {
                Ok(()) => {
                    debug!("{} -> {}", database.display(), dest.display());
                    report.rotated.push(dest);
                }
                Err(e) => {
                    self.report_failure(database, &e.to_string());
                    report.failed.push(database.clone());
                }
            }
        }
    }

    fn prune(&self, today: NaiveDate, report: &mut RotationReport) {
        if self.retention_days == 0 {
            debug!("Retention window is zero, skipping prune");
            return;
        }
        let Some(cutoff) = today.checked_sub_days(Days::new(u64::from(self.retention_days))) else {
            return;
        };

        for database in &self.databases {
            let Some(expired) = backup_path(&self.backup_dir, database, cutoff) else {
                continue;
            };
            match fs::remove_file(&expired) {
                Ok(()) => {
                    debug!("Removed expired backup {}", expired.display());
                    report.pruned.push(expired);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => debug!("Unable to remove {}: {}", expired.display(), e),
            }
        }
    }

    fn report_failure(&self, database: &Path, reason: &str) {
        warn!("Backup of {} failed: {}", database.display(), reason);
        self.notifier
            .notify(&format!("WARNING! Backup of {} failed.", database.display()));
    }
}
