//! Error types for key storage and the PSK handshake.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors raised while loading keys or running the handshake.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Caller-supplied argument violates a precondition (e.g. a key slice
    /// that isn't exactly 32 bytes).
    #[error("bad argument: {0}")]
    InvalidArgument(String),

    /// A key file could not be opened for read or write.
    #[error("failed to open key file {path}: {source}")]
    FileOpen {
        /// Path of the offending key file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A key file did not contain exactly 32 bytes.
    #[error("short read on key file {path}: expected 32 bytes, got {actual}")]
    ShortRead {
        /// Path of the offending key file.
        path: String,
        /// Number of bytes actually read.
        actual: usize,
    },

    /// Handshake timed out waiting for a frame. Recoverable: the caller may
    /// re-enter the handshake loop.
    #[error("handshake timed out")]
    Timeout,

    /// Peer's key did not match the expected value. Fatal.
    #[error("peer key mismatch")]
    KeyMismatch,

    /// Failed to send a handshake frame. Fatal.
    #[error("handshake send failed: {0}")]
    SendError(String),

    /// Failed to receive a handshake frame. Fatal.
    #[error("handshake receive failed: {0}")]
    RecvError(String),

    /// A received frame did not have the shape the handshake expects
    /// (wrong opcode, wrong payload length, wrong block number). Fatal.
    #[error("bad handshake frame: {0}")]
    BadFrame(String),
}

impl CryptoError {
    /// Returns true if this error is transient and the handshake loop may
    /// simply re-enter on its next iteration.
    ///
    /// Only a receive timeout is transient; every other handshake failure
    /// is fatal to the session per the authenticator's failure taxonomy.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
