//! Configuration for flatkv
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

use crate::error::{FlatError, Result};

/// Main configuration for a flatkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all database files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── chan.db        (tracked databases)
    ///     ├── chan.db.temp   (previous generation while a write is open)
    ///     └── backups/       (dated copies, see `backup_dir`)
    pub data_dir: PathBuf,

    /// Databases rotated by the backup rotator, relative to `data_dir`
    pub databases: Vec<PathBuf>,

    /// Tag recorded on every handle opened by this instance
    pub owner_tag: String,

    /// Format version written into the header of new generations
    pub core_version: u32,

    // -------------------------------------------------------------------------
    // Backup Configuration
    // -------------------------------------------------------------------------
    /// Whether day-boundary backups are taken at all
    pub keep_backups: bool,

    /// Retention window in days
    pub keep_backups_for: u32,

    /// Directory receiving dated backups, relative to `data_dir`
    pub backup_dir: PathBuf,

    /// Seconds between rotator ticks when driven by the binary
    pub tick_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            databases: vec![
                PathBuf::from("chan.db"),
                PathBuf::from("server.db"),
                PathBuf::from("ChannelStats.db"),
            ],
            owner_tag: "StatServ".to_string(),
            core_version: 1,
            keep_backups: true,
            keep_backups_for: 7,
            backup_dir: PathBuf::from("backups"),
            tick_interval_secs: 60,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject combinations the rotator cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.keep_backups && self.keep_backups_for == 0 {
            return Err(FlatError::Config(
                "keep_backups_for must be at least 1 day when backups are enabled".to_string(),
            ));
        }
        if self.core_version == 0 {
            return Err(FlatError::Config(
                "core_version must be at least 1".to_string(),
            ));
        }
        if self.tick_interval_secs == 0 {
            return Err(FlatError::Config(
                "tick_interval_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute-or-relative location of the backup directory
    pub fn backup_path(&self) -> PathBuf {
        self.data_dir.join(&self.backup_dir)
    }

    /// Resolve a database name against `data_dir`
    pub fn database_path(&self, name: &Path) -> PathBuf {
        self.data_dir.join(name)
    }

    /// All tracked databases resolved against `data_dir`
    pub fn database_paths(&self) -> Vec<PathBuf> {
        self.databases.iter().map(|d| self.database_path(d)).collect()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all databases)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Replace the tracked database set
    pub fn databases<I, P>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.databases = names.into_iter().map(Into::into).collect();
        self
    }

    /// Add one database to the tracked set
    pub fn database(mut self, name: impl Into<PathBuf>) -> Self {
        self.config.databases.push(name.into());
        self
    }

    /// Set the owner tag
    pub fn owner_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.owner_tag = tag.into();
        self
    }

    /// Set the header version for new generations
    pub fn core_version(mut self, version: u32) -> Self {
        self.config.core_version = version;
        self
    }

    /// Enable or disable backups
    pub fn keep_backups(mut self, enabled: bool) -> Self {
        self.config.keep_backups = enabled;
        self
    }

    /// Set the retention window (in days)
    pub fn keep_backups_for(mut self, days: u32) -> Self {
        self.config.keep_backups_for = days;
        self
    }

    /// Set the backup directory
    pub fn backup_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backup_dir = path.into();
        self
    }

    /// Set the rotator tick interval (in seconds)
    pub fn tick_interval_secs(mut self, secs: u64) -> Self {
        self.config.tick_interval_secs = secs;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
