//! Errors raised by the TFTP engine.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors a transfer can fail with.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A receive timed out and the retry budget for this block is spent.
    #[error("receive timed out after exhausting retries")]
    Timeout,

    /// Underlying socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// A received frame had an opcode or block number the protocol step
    /// did not expect (and it was not a case this step tolerates by
    /// dropping the frame and continuing).
    #[error("unexpected frame: {0}")]
    UnexpectedFrame(String),

    /// The requested filename did not carry the suffix this handler
    /// serves (`.LUI` for `handle_rrq`, `.LUR` for `handle_wrq`).
    #[error("unsupported filename: {0}")]
    UnsupportedFile(String),

    /// The hardware part number in the first firmware DATA payload did not
    /// match this target's compiled-in part number. Soft fault: aborts
    /// only the current RRQ.
    #[error("hardware part number mismatch: expected {expected}, got {actual}")]
    HardwarePartNumberMismatch {
        /// Part number this target expects.
        expected: String,
        /// Part number found in the firmware packet.
        actual: String,
    },

    /// Firmware partition free space fell below the configured threshold.
    #[error("insufficient space: {free} bytes free, need at least {required}")]
    InsufficientSpace {
        /// Bytes actually free.
        free: u64,
        /// Minimum required bytes.
        required: u64,
    },

    /// Wire codec failure (malformed frame or ARINC record).
    #[error(transparent)]
    Codec(#[from] loader_proto::CodecError),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<EngineError> for loader_core::LoaderError {
    fn from(err: EngineError) -> Self {
        let rendered = err.to_string();
        match err {
            EngineError::HardwarePartNumberMismatch { expected, actual } => {
                Self::HardwarePartNumberMismatch { expected, actual }
            },
            EngineError::InsufficientSpace { free, required } => {
                Self::InsufficientSpace { free, required }
            },
            EngineError::Codec(codec_err) => codec_err.into(),
            EngineError::Timeout | EngineError::UnexpectedFrame(_) => {
                Self::Malformed { detail: rendered, fatal: true }
            },
            EngineError::Io(message) => Self::Io(message),
            EngineError::UnsupportedFile(message) => Self::BadArgument(message),
        }
    }
}
