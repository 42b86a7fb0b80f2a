//! File Session Module
//!
//! Database handles over a single flat file.
//!
//! ## Responsibilities
//! - Resolve the primary path and its `.temp` companion
//! - Read and write the 4-byte big-endian version header
//! - Keep the previous generation as `.temp` while a new one is written
//! - Roll back to the previous generation when creation or a write fails
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Version (4, big-endian, byte by byte)    │
//! ├──────────────────────────────────────────┤
//! │ key ^ value \0                           │
//! │ key ^ value \0                           │
//! │ ...                                      │
//! │ \n                  (end of block)       │
//! │ ... further blocks ...                   │
//! └──────────────────────────────────────────┘
//! ```
//!
//! Exactly one handle per path at a time. Nothing here locks.

mod header;
mod reader;
mod writer;

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

pub use header::{read_version, write_version, HEADER_LEN};
pub use reader::DbReader;
pub use writer::DbWriter;

/// Suffix of the previous-generation copy
pub const BACKUP_SUFFIX: &str = ".temp";

// =============================================================================
// Handle Metadata
// =============================================================================

/// Version and ownership carried by every handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbHeader {
    /// Version found in (reader) or written to (writer) the file
    pub format_version: u32,
    /// Version of the code that produced the file
    pub core_format_version: u32,
    /// Component that owns this handle
    pub owner_tag: String,
}

/// Primary file and its previous-generation companion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbPaths {
    pub primary: PathBuf,
    pub backup: PathBuf,
}

impl DbPaths {
    /// Resolve `path` against the working directory when it is relative
    ///
    /// Falls back to the path as given if the working directory is
    /// unavailable.
    pub fn resolve(path: &Path) -> Self {
        let primary = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(e) => {
                    debug!("Unable to resolve current working directory: {}", e);
                    path.to_path_buf()
                }
            }
        };
        Self::for_primary(primary)
    }

    /// Paths for an already-resolved primary file
    pub fn for_primary(primary: PathBuf) -> Self {
        let mut backup = primary.clone().into_os_string();
        backup.push(BACKUP_SUFFIX);
        Self {
            primary,
            backup: PathBuf::from(backup),
        }
    }
}

// =============================================================================
// Handle Lifecycle
// =============================================================================

/// Behavior shared by reader and writer handles
pub trait DbHandle: Sized {
    fn header(&self) -> &DbHeader;

    fn paths(&self) -> &DbPaths;

    /// Release the stream and delete a leftover `.temp` file
    fn close(self) -> Result<()>;
}

/// Close a handle that may not exist
pub fn close<H: DbHandle>(handle: Option<H>) -> Result<()> {
    match handle {
        Some(handle) => handle.close(),
        None => Ok(()),
    }
}

/// Delete the `.temp` companion if it is still there
pub(crate) fn remove_leftover_backup(paths: &DbPaths) -> Result<()> {
    match fs::remove_file(&paths.backup) {
        Ok(()) => {
            debug!("Removed previous generation {}", paths.backup.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
