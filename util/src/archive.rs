//! Struct archiving functionality
//!
//! Archives are CSV files written into the session's archive directory, one
//! row per control cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::fs::File;
use std::path::{Path, PathBuf};
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Writes serialisable records as rows of a CSV file.
///
/// The header row is taken from the field names of the first record.
pub struct Archiver {
    writer: Writer<File>,
    num_rows: usize
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot open the archive file {0:?}: {1}")]
    CannotOpen(PathBuf, std::io::Error),

    #[error("Cannot write the archive record: {0}")]
    CsvError(csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(std::io::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create an archive at `path` relative to the session's archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        Self::create(session.arch_root.join(path))
    }

    /// Create an archive at the given file path, replacing any existing file.
    pub fn create<P: AsRef<Path>>(file_path: P) -> Result<Self, ArchiveError> {
        let file_path = file_path.as_ref();

        let file = File::create(file_path)
            .map_err(|e| ArchiveError::CannotOpen(file_path.to_path_buf(), e))?;

        Ok(Self {
            writer: WriterBuilder::new().has_headers(true).from_writer(file),
            num_rows: 0
        })
    }

    /// Write one record and flush it to disk.
    ///
    /// The record must be a flat struct, csv cannot write nested containers.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer.serialize(record).map_err(ArchiveError::CsvError)?;
        self.writer.flush().map_err(ArchiveError::FlushError)?;
        self.num_rows += 1;

        Ok(())
    }

    /// Number of records written so far.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }
}
