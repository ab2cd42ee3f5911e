//! Error taxonomy for the session layer.
//!
//! Mirrors the error kinds named in the component design: each variant
//! carries enough context to log a useful message, and [`LoaderError::is_fatal`]
//! tells the FSM whether the current session must escalate to `ERROR` or may
//! continue (soft faults that only bump the failure counter, or a PN-HW
//! mismatch that aborts just the current transfer).

use thiserror::Error;

/// Errors that can surface from the session state machine or the
/// components it drives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// Programming/precondition violation (bad pointer-equivalent, wrong
    /// buffer length). Always fatal.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Invalid TFTP/ARINC frame. Soft if it is a stray or unknown opcode
    /// encountered while serving a transfer; fatal if it corrupts an
    /// expected in-band record (LUR parse failure, handshake framing).
    #[error("malformed frame: {0}")]
    Malformed {
        /// Description of what failed to parse.
        detail: String,
        /// Whether this malformed frame is fatal to the session rather
        /// than a countable soft fault.
        fatal: bool,
    },

    /// PSK mismatch during the handshake. Always fatal.
    #[error("peer key mismatch during handshake")]
    KeyMismatch,

    /// The LUR's software part number is not in the compile-time allow-list.
    /// Always fatal.
    #[error("unsupported software part number: {0}")]
    PartNumberUnsupported(String),

    /// The hardware part number embedded in the first firmware packet does
    /// not match this target. Soft: increments the failure counter and
    /// aborts only the current RRQ.
    #[error("hardware part number mismatch: expected {expected}, got {actual}")]
    HardwarePartNumberMismatch {
        /// Part number this target expects.
        expected: String,
        /// Part number found in the firmware packet.
        actual: String,
    },

    /// Firmware partition free space fell below the configured threshold.
    /// Always fatal.
    #[error("insufficient space: {free} bytes free, need at least {required}")]
    InsufficientSpace {
        /// Bytes actually free.
        free: u64,
        /// Minimum required bytes.
        required: u64,
    },

    /// Filesystem I/O failure. Always fatal, except removing an
    /// already-missing final file, which callers treat as a warning rather
    /// than constructing this variant at all.
    #[error("I/O error: {0}")]
    Io(String),
}

impl LoaderError {
    /// Returns true if this error forces the FSM to escalate to `ERROR`
    /// immediately, independent of the global failure-count policy.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Malformed { fatal, .. } => *fatal,
            Self::HardwarePartNumberMismatch { .. } => false,
            Self::BadArgument(_)
            | Self::KeyMismatch
            | Self::PartNumberUnsupported(_)
            | Self::InsufficientSpace { .. }
            | Self::Io(_) => true,
        }
    }

    /// Returns true if this error qualifies as a soft fault that should
    /// increment `upload_failure_count` rather than escalating on its own.
    #[must_use]
    pub fn is_soft_fault(&self) -> bool {
        !self.is_fatal()
    }
}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<loader_proto::CodecError> for LoaderError {
    fn from(err: loader_proto::CodecError) -> Self {
        use loader_proto::CodecError as C;
        match err {
            C::UnknownOpcode(_) => Self::Malformed { detail: err.to_string(), fatal: false },
            C::BadArgument(_) | C::Malformed(_) | C::Truncated { .. } | C::PayloadTooLarge { .. } => {
                Self::Malformed { detail: err.to_string(), fatal: true }
            },
        }
    }
}

impl From<loader_crypto::CryptoError> for LoaderError {
    fn from(err: loader_crypto::CryptoError) -> Self {
        match err {
            loader_crypto::CryptoError::KeyMismatch => Self::KeyMismatch,
            other => Self::BadArgument(other.to_string()),
        }
    }
}
