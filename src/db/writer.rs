//! Database Writer
//!
//! Creates a new generation of a database file.
//!
//! ## Creation Phases
//! ```text
//!   primary ──rename──▶ primary.temp        (backed up)
//!   open primary, write version header      (opened)
//!   ...records...
//!   close: delete primary.temp              (committed)
//!
//!   any failure before close: drop stream, delete partial primary,
//!   rename primary.temp back               (rolled back)
//! ```
//!
//! The phases are not atomic on disk: a crash after the first rename leaves
//! only `primary.temp` behind.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::codec::{EntryWriter, Record, WriteOutcome};
use crate::error::{FlatError, Result};

use super::{remove_leftover_backup, write_version, DbHandle, DbHeader, DbPaths};

/// Write handle over a new database generation
pub struct DbWriter<W: Write = File> {
    header: DbHeader,
    paths: DbPaths,
    /// `None` after a failed write rolled the file back
    entries: Option<EntryWriter<W>>,
}

impl DbWriter<File> {
    /// Start a new generation at `path` with `core_version` in its header
    pub fn create(path: impl AsRef<Path>, core_version: u32) -> Result<Self> {
        Self::create_as(path, core_version, "")
    }

    /// Start a new generation on behalf of `owner_tag`
    pub fn create_as(path: impl AsRef<Path>, core_version: u32, owner_tag: &str) -> Result<Self> {
        Self::create_with(path, core_version, owner_tag, |p: &Path| File::create(p))
    }

    /// Flush and fsync the file written so far
    pub fn sync(&mut self) -> Result<()> {
        let entries = self.entries.as_mut().ok_or(FlatError::Closed)?;
        entries.flush()?;
        entries.get_ref().sync_all()?;
        Ok(())
    }
}

impl<W: Write> DbWriter<W> {
    /// Start a new generation using `open` to create the stream
    ///
    /// On failure the file that was at `path` before the call is put back.
    pub fn create_with<F>(
        path: impl AsRef<Path>,
        core_version: u32,
        owner_tag: &str,
        open: F,
    ) -> Result<Self>
    where
        F: FnOnce(&Path) -> io::Result<W>,
    {
        let paths = DbPaths::resolve(path.as_ref());
        let mut pending = PendingGeneration::begin(&paths)?;

        let mut stream = match open(&paths.primary) {
            Ok(stream) => stream,
            Err(e) => {
                debug!("Unable to create {}: {}", paths.primary.display(), e);
                pending.rollback();
                return Err(e.into());
            }
        };
        pending.opened = true;

        if let Err(e) = write_version(&mut stream, core_version) {
            debug!("Error writing version number on {}: {}", paths.primary.display(), e);
            drop(stream);
            pending.rollback();
            return Err(e);
        }
        pending.commit();

        Ok(Self {
            header: DbHeader {
                format_version: core_version,
                core_format_version: core_version,
                owner_tag: owner_tag.to_string(),
            },
            paths,
            entries: Some(EntryWriter::new(stream)),
        })
    }

    /// True until a failed write rolls the file back
    pub fn is_open(&self) -> bool {
        self.entries.is_some()
    }

    /// Format and write one entry; see [`EntryWriter::write_entry`]
    pub fn write_entry<V: fmt::Display>(
        &mut self,
        key: impl AsRef<[u8]>,
        value: Option<V>,
    ) -> Result<WriteOutcome> {
        let entries = self.entries.as_mut().ok_or(FlatError::Closed)?;
        let result = entries.write_entry(key, value);
        self.recover_on_fault(result)
    }

    /// Write one raw record
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let entries = self.entries.as_mut().ok_or(FlatError::Closed)?;
        let result = entries.write_record(&record.key, &record.value);
        self.recover_on_fault(result)
    }

    /// Write the end-of-block sentinel
    pub fn write_block_end(&mut self) -> Result<()> {
        let entries = self.entries.as_mut().ok_or(FlatError::Closed)?;
        let result = entries.write_block_end();
        self.recover_on_fault(result)
    }

    /// Write `records` followed by an end-of-block
    pub fn write_block<'a, I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        for record in records {
            self.write_record(record)?;
        }
        self.write_block_end()
    }

    /// Put the previous generation back after a stream fault
    fn recover_on_fault<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if is_stream_fault(e) {
                debug!("Error writing to {}: {}", self.paths.primary.display(), e);
                self.entries = None;
                restore_previous(&self.paths);
            }
        }
        result
    }
}

impl<W: Write> DbHandle for DbWriter<W> {
    fn header(&self) -> &DbHeader {
        &self.header
    }

    fn paths(&self) -> &DbPaths {
        &self.paths
    }

    fn close(mut self) -> Result<()> {
        if let Some(mut entries) = self.entries.take() {
            if let Err(e) = entries.flush() {
                debug!("Error flushing {}: {}", self.paths.primary.display(), e);
                drop(entries);
                restore_previous(&self.paths);
                return Err(e);
            }
        }
        remove_leftover_backup(&self.paths)
    }
}

// =============================================================================
// Staged Creation
// =============================================================================

/// Tracks how far creation got so rollback undoes exactly that much
struct PendingGeneration<'a> {
    paths: &'a DbPaths,
    /// Previous file now lives at the `.temp` path
    backed_up: bool,
    /// A new file may exist at the primary path
    opened: bool,
}

impl<'a> PendingGeneration<'a> {
    /// Move any existing file aside; a missing file is the common case
    ///
    /// Any other rename failure stops creation before the primary is touched.
    fn begin(paths: &'a DbPaths) -> Result<Self> {
        let backed_up = match fs::rename(&paths.primary, &paths.backup) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                debug!("Unable to back up {}: {}", paths.primary.display(), e);
                return Err(e.into());
            }
        };
        Ok(Self {
            paths,
            backed_up,
            opened: false,
        })
    }

    /// Header is on disk; the `.temp` copy stays until close
    fn commit(self) {}

    fn rollback(self) {
        if self.opened {
            remove_quietly(&self.paths.primary);
        }
        if self.backed_up {
            if let Err(e) = fs::rename(&self.paths.backup, &self.paths.primary) {
                warn!(
                    "Unable to restore {} from {}: {}",
                    self.paths.primary.display(),
                    self.paths.backup.display(),
                    e
                );
            }
        }
    }
}

fn is_stream_fault(e: &FlatError) -> bool {
    matches!(e, FlatError::Io(_) | FlatError::ShortWrite { .. })
}

/// Drop the partial primary and put the `.temp` copy back, if one exists
fn restore_previous(paths: &DbPaths) {
    remove_quietly(&paths.primary);
    if !paths.backup.exists() {
        return;
    }
    if let Err(e) = fs::rename(&paths.backup, &paths.primary) {
        warn!(
            "Unable to restore {} from {}: {}",
            paths.primary.display(),
            paths.backup.display(),
            e
        );
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => debug!("Unable to remove {}: {}", path.display(), e),
    }
}
