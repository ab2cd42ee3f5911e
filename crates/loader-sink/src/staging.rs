//! Firmware staging file.
//!
//! `commit` renames the staging file onto the final path on the same
//! filesystem - the only atomicity boundary this sink needs, since a
//! rename either lands entirely or not at all. `discard` is the only
//! cleanup an aborted session requires.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use loader_tftp::FirmwareWriter;
use tracing::{info, warn};

use crate::errors::{Result, SinkError};

/// Owns the staging and final paths for one firmware partition.
pub struct FirmwareSink {
    staging_path: PathBuf,
    final_path: PathBuf,
    file: Option<fs::File>,
}

impl FirmwareSink {
    /// Build a sink rooted at `staging_path`/`final_path`. Does not touch
    /// the filesystem until [`Self::open_staging`] is called.
    #[must_use]
    pub fn new(staging_path: impl Into<PathBuf>, final_path: impl Into<PathBuf>) -> Self {
        Self { staging_path: staging_path.into(), final_path: final_path.into(), file: None }
    }

    /// (Re)create the staging file for write, replacing any previous
    /// partial attempt.
    ///
    /// # Errors
    ///
    /// [`SinkError::Open`] if the file cannot be created.
    pub fn open_staging(&mut self) -> Result<()> {
        let file = fs::File::create(&self.staging_path).map_err(|source| SinkError::Open {
            path: self.staging_path.display().to_string(),
            source,
        })?;
        self.file = Some(file);
        Ok(())
    }

    /// Append `data` to the open staging file.
    ///
    /// # Errors
    ///
    /// [`SinkError::NotOpen`] if called before [`Self::open_staging`];
    /// [`SinkError::Write`] if the write is short or fails.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or(SinkError::NotOpen)?;
        file.write_all(data).map_err(|source| SinkError::Write {
            path: self.staging_path.display().to_string(),
            source,
        })
    }

    /// Remove any existing final file (a missing file is not an error),
    /// then rename the staging file onto the final path.
    ///
    /// # Errors
    ///
    /// [`SinkError::Remove`] if the existing final file cannot be removed
    /// for a reason other than it being absent; [`SinkError::Commit`] if
    /// the rename fails.
    pub fn commit(&mut self) -> Result<()> {
        self.file = None;
        remove_if_present(&self.final_path)?;
        fs::rename(&self.staging_path, &self.final_path).map_err(|source| SinkError::Commit {
            staging: self.staging_path.display().to_string(),
            target: self.final_path.display().to_string(),
            source,
        })?;
        info!(target = %self.final_path.display(), "firmware image committed");
        Ok(())
    }

    /// Remove the staging file if present. The only cleanup an aborted
    /// session needs.
    ///
    /// # Errors
    ///
    /// [`SinkError::Remove`] if removal fails for a reason other than the
    /// file being absent.
    pub fn discard(&mut self) -> Result<()> {
        self.file = None;
        remove_if_present(&self.staging_path)
    }
}

impl FirmwareWriter for FirmwareSink {
    fn append(&mut self, data: &[u8]) -> std::io::Result<()> {
        FirmwareSink::append(self, data).map_err(|err| std::io::Error::other(err.to_string()))
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => {
            warn!(path = %path.display(), %source, "failed to remove file");
            Err(SinkError::Remove { path: path.display().to_string(), source })
        },
    }
}
