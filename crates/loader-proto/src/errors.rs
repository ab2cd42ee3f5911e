//! Error types shared by the TFTP frame codec and the ARINC record codec.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised while encoding or decoding wire data.
///
/// Matches the two error kinds named in the component design: `BadArgument`
/// for caller-supplied values that violate a precondition, and `Malformed`
/// for bytes that do not describe a valid frame or record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Caller passed an invalid argument (e.g. a ratio that isn't 3 ASCII
    /// digits, or a filename containing an embedded NUL).
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Bytes do not describe a valid frame or record.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Buffer shorter than the declared or minimum frame size.
    #[error("frame truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum number of bytes required.
        expected: usize,
        /// Number of bytes actually present.
        actual: usize,
    },

    /// Opcode field did not match any known TFTP opcode.
    #[error("unknown opcode {0:#06x}")]
    UnknownOpcode(u16),

    /// DATA payload exceeds the 512-byte TFTP block size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Size of the offending payload.
        size: usize,
        /// Maximum payload size (`TftpFrame::BLOCK_SIZE`).
        max: usize,
    },
}
