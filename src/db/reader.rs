//! Database Reader
//!
//! Opens an existing database file and walks its records in order.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{debug, info};

use crate::codec::{Decoded, EntryReader, Record};
use crate::error::{FlatError, Result};

use super::{read_version, remove_leftover_backup, DbHandle, DbHeader, DbPaths};

/// Read handle over one database file
pub struct DbReader {
    header: DbHeader,
    paths: DbPaths,
    entries: EntryReader<BufReader<File>>,
}

impl DbReader {
    /// Open a database for reading
    ///
    /// Returns:
    /// - `Ok(Some(reader))` — header read and valid
    /// - `Ok(None)` — no file at `path`
    /// - `Err(FlatError::Io)` — open or header read failed
    /// - `Err(FlatError::Format)` — header truncated or version < 1
    pub fn open(path: impl AsRef<Path>) -> Result<Option<Self>> {
        Self::open_as(path, "")
    }

    /// Open a database for reading on behalf of `owner_tag`
    ///
    /// A reader has no expected version of its own, so both header fields
    /// carry the version found in the file.
    pub fn open_as(path: impl AsRef<Path>, owner_tag: &str) -> Result<Option<Self>> {
        let paths = DbPaths::resolve(path.as_ref());
        info!("Loading {}", paths.primary.display());

        if !paths.primary.exists() {
            debug!("{} does not exist", paths.primary.display());
            return Ok(None);
        }

        let file = File::open(&paths.primary)?;
        let mut stream = BufReader::new(file);

        let version = read_version(&mut stream).map_err(|e| {
            debug!("Error reading version number on {}: {}", paths.primary.display(), e);
            e
        })?;

        if version < 1 {
            debug!("Invalid version number ({}) on {}", version, paths.primary.display());
            return Err(FlatError::Format(format!(
                "invalid version number {} on {}",
                version,
                paths.primary.display()
            )));
        }

        Ok(Some(Self {
            header: DbHeader {
                format_version: version,
                core_format_version: version,
                owner_tag: owner_tag.to_string(),
            },
            paths,
            entries: EntryReader::new(stream),
        }))
    }

    /// Version stored in the file header
    pub fn format_version(&self) -> u32 {
        self.header.format_version
    }

    /// Decode the next entry
    pub fn read_entry(&mut self) -> Result<Decoded> {
        self.entries.read_entry()
    }

    /// Collect the next block; `None` once the file is exhausted
    pub fn read_block(&mut self) -> Result<Option<Vec<Record>>> {
        self.entries.read_block()
    }

    /// Read every remaining block
    pub fn read_all(&mut self) -> Result<Vec<Vec<Record>>> {
        let mut blocks = Vec::new();
        while let Some(block) = self.read_block()? {
            blocks.push(block);
        }
        Ok(blocks)
    }
}

impl DbHandle for DbReader {
    fn header(&self) -> &DbHeader {
        &self.header
    }

    fn paths(&self) -> &DbPaths {
        &self.paths
    }

    fn close(self) -> Result<()> {
        let Self { paths, entries, .. } = self;
        drop(entries);
        remove_leftover_backup(&paths)
    }
}
