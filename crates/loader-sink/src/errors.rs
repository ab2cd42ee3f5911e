//! Errors raised by the firmware sink.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors raised opening, writing, or committing the staged firmware file.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The staging file could not be (re)created for write.
    #[error("failed to open staging file {path}: {source}")]
    Open {
        /// Path of the staging file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A write to the staging file did not complete.
    #[error("failed to write to staging file {path}: {source}")]
    Write {
        /// Path of the staging file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// [`crate::staging::FirmwareSink::append`] was called before
    /// [`crate::staging::FirmwareSink::open_staging`].
    #[error("append called before open_staging")]
    NotOpen,

    /// Renaming the staging file onto the final path failed. Fatal: commit
    /// is the atomicity boundary and has no fallback.
    #[error("failed to commit staging file {staging} to {target}: {source}")]
    Commit {
        /// Staging path.
        staging: String,
        /// Final path.
        target: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Removing the staged or final file failed for a reason other than
    /// the file already being absent.
    #[error("failed to remove {path}: {source}")]
    Remove {
        /// Path that could not be removed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
