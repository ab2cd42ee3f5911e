//! RFC 1350 TFTP frame codec.
//!
//! Implements the five-opcode subset of TFTP the loader dialog needs:
//! RRQ, WRQ, DATA, ACK and ERROR. All multi-byte integers are big-endian
//! ("network byte order"); filenames and modes are NUL-terminated ASCII.
//!
//! This module is a pure codec - it holds no socket, no state, and performs
//! no I/O. The engine crate (`loader-tftp`) drives sockets and calls into
//! here to turn bytes into [`TftpFrame`] values and back.

use crate::errors::{CodecError, Result};

/// TFTP opcode (RFC 1350 §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Read request.
    Rrq = 1,
    /// Write request.
    Wrq = 2,
    /// Data block.
    Data = 3,
    /// Acknowledgment.
    Ack = 4,
    /// Error.
    Error = 5,
}

impl Opcode {
    /// Numeric wire value of this opcode.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Parse a wire opcode value. `None` if unrecognized.
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Rrq),
            2 => Some(Self::Wrq),
            3 => Some(Self::Data),
            4 => Some(Self::Ack),
            5 => Some(Self::Error),
            _ => None,
        }
    }
}

/// A decoded TFTP frame.
///
/// # Invariants
///
/// - `Data::payload.len() <= TftpFrame::BLOCK_SIZE`. A shorter-than-512
///   payload (including zero bytes) is the terminal block of a transfer;
///   this codec does not itself track transfer state, only frame shape.
/// - `Rrq`/`Wrq` filenames and modes never contain an embedded NUL; the wire
///   NUL terminators are consumed during decode and re-added during encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TftpFrame {
    /// Read request: loader or target asks to receive `filename`.
    Rrq {
        /// Requested filename.
        filename: String,
        /// Transfer mode, expected to be "octet" (case-insensitivity is left
        /// for the caller to enforce).
        mode: String,
    },
    /// Write request: loader or target announces it will send `filename`.
    Wrq {
        /// Announced filename.
        filename: String,
        /// Transfer mode.
        mode: String,
    },
    /// One block of file data.
    Data {
        /// Block number, starting at 1.
        block: u16,
        /// 0-512 bytes of payload.
        payload: Vec<u8>,
    },
    /// Acknowledgment of a block.
    Ack {
        /// Block number being acknowledged (0 acknowledges a request).
        block: u16,
    },
    /// Error notification, terminal for the transfer.
    Error {
        /// TFTP error code (RFC 1350 §5; this dialog does not assign its own
        /// meanings beyond what the peer expects).
        code: u16,
        /// Human-readable message.
        message: String,
    },
}

impl TftpFrame {
    /// Maximum DATA payload size; also the size below which a DATA block is
    /// terminal for its transfer.
    pub const BLOCK_SIZE: usize = 512;

    /// Opcode of this frame.
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Rrq { .. } => Opcode::Rrq,
            Self::Wrq { .. } => Opcode::Wrq,
            Self::Data { .. } => Opcode::Data,
            Self::Ack { .. } => Opcode::Ack,
            Self::Error { .. } => Opcode::Error,
        }
    }

    /// Encode this frame to its wire representation.
    ///
    /// # Errors
    ///
    /// - [`CodecError::BadArgument`] if a filename or mode contains an
    ///   embedded NUL byte (cannot be represented on the wire).
    /// - [`CodecError::PayloadTooLarge`] if a DATA payload exceeds
    ///   [`Self::BLOCK_SIZE`].
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Self::Rrq { filename, mode } | Self::Wrq { filename, mode } => {
                out.extend_from_slice(&self.opcode().to_u16().to_be_bytes());
                push_cstr(&mut out, filename)?;
                push_cstr(&mut out, mode)?;
            },
            Self::Data { block, payload } => {
                if payload.len() > Self::BLOCK_SIZE {
                    return Err(CodecError::PayloadTooLarge {
                        size: payload.len(),
                        max: Self::BLOCK_SIZE,
                    });
                }
                out.extend_from_slice(&Opcode::Data.to_u16().to_be_bytes());
                out.extend_from_slice(&block.to_be_bytes());
                out.extend_from_slice(payload);
            },
            Self::Ack { block } => {
                out.extend_from_slice(&Opcode::Ack.to_u16().to_be_bytes());
                out.extend_from_slice(&block.to_be_bytes());
            },
            Self::Error { code, message } => {
                out.extend_from_slice(&Opcode::Error.to_u16().to_be_bytes());
                out.extend_from_slice(&code.to_be_bytes());
                push_cstr(&mut out, message)?;
            },
        }
        Ok(out)
    }

    /// Decode a frame from wire bytes.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Truncated`] if fewer than 2 bytes are present, or a
    ///   fixed-size field runs past the end of the buffer.
    /// - [`CodecError::UnknownOpcode`] if the opcode does not match RRQ,
    ///   WRQ, DATA, ACK, or ERROR.
    /// - [`CodecError::Malformed`] if an RRQ/WRQ/ERROR string is not
    ///   NUL-terminated within the buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(CodecError::Truncated { expected: 2, actual: bytes.len() });
        }
        let opcode_val = u16::from_be_bytes([bytes[0], bytes[1]]);
        let opcode = Opcode::from_u16(opcode_val).ok_or(CodecError::UnknownOpcode(opcode_val))?;
        let rest = &bytes[2..];

        match opcode {
            Opcode::Rrq | Opcode::Wrq => {
                let (filename, rest) = pop_cstr(rest)?;
                let (mode, _rest) = pop_cstr(rest)?;
                if opcode == Opcode::Rrq {
                    Ok(Self::Rrq { filename, mode })
                } else {
                    Ok(Self::Wrq { filename, mode })
                }
            },
            Opcode::Data => {
                if rest.len() < 2 {
                    return Err(CodecError::Truncated { expected: 2, actual: rest.len() });
                }
                let block = u16::from_be_bytes([rest[0], rest[1]]);
                let payload = rest[2..].to_vec();
                if payload.len() > Self::BLOCK_SIZE {
                    return Err(CodecError::PayloadTooLarge {
                        size: payload.len(),
                        max: Self::BLOCK_SIZE,
                    });
                }
                Ok(Self::Data { block, payload })
            },
            Opcode::Ack => {
                if rest.len() < 2 {
                    return Err(CodecError::Truncated { expected: 2, actual: rest.len() });
                }
                let block = u16::from_be_bytes([rest[0], rest[1]]);
                Ok(Self::Ack { block })
            },
            Opcode::Error => {
                if rest.len() < 2 {
                    return Err(CodecError::Truncated { expected: 2, actual: rest.len() });
                }
                let code = u16::from_be_bytes([rest[0], rest[1]]);
                let (message, _rest) = pop_cstr(&rest[2..])?;
                Ok(Self::Error { code, message })
            },
        }
    }
}

/// Append `s` to `out` followed by a NUL terminator.
fn push_cstr(out: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        return Err(CodecError::BadArgument(format!("string contains embedded NUL: {s:?}")));
    }
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    Ok(())
}

/// Read a NUL-terminated string from the front of `bytes`, returning the
/// string and the remainder of the buffer after the terminator.
fn pop_cstr(bytes: &[u8]) -> Result<(String, &[u8])> {
    let nul_pos = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| CodecError::Malformed("missing NUL terminator".to_string()))?;
    let s = String::from_utf8_lossy(&bytes[..nul_pos]).into_owned();
    Ok((s, &bytes[nul_pos + 1..]))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn rrq_round_trip() {
        let frame = TftpFrame::Rrq { filename: "image.LUI".to_string(), mode: "octet".to_string() };
        let wire = frame.encode().expect("should encode");
        let decoded = TftpFrame::decode(&wire).expect("should decode");
        assert_eq!(frame, decoded);
    }

    #[test]
    fn data_terminal_block_is_short() {
        let frame = TftpFrame::Data { block: 3, payload: vec![1, 2, 3] };
        assert!(matches!(&frame, TftpFrame::Data { payload, .. } if payload.len() < TftpFrame::BLOCK_SIZE));
    }

    #[test]
    fn data_full_block_is_not_terminal() {
        let payload = vec![0u8; TftpFrame::BLOCK_SIZE];
        let frame = TftpFrame::Data { block: 1, payload };
        let wire = frame.encode().expect("should encode");
        let decoded = TftpFrame::decode(&wire).expect("should decode");
        assert_eq!(frame, decoded);
    }

    #[test]
    fn oversized_data_payload_rejected() {
        let frame = TftpFrame::Data { block: 1, payload: vec![0u8; TftpFrame::BLOCK_SIZE + 1] };
        assert!(matches!(frame.encode(), Err(CodecError::PayloadTooLarge { .. })));
    }

    #[test]
    fn unknown_opcode_rejected() {
        let wire = [0u8, 99];
        assert!(matches!(TftpFrame::decode(&wire), Err(CodecError::UnknownOpcode(99))));
    }

    #[test]
    fn truncated_ack_rejected() {
        let wire = Opcode::Ack.to_u16().to_be_bytes().to_vec();
        assert!(matches!(TftpFrame::decode(&wire), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn missing_nul_terminator_rejected() {
        let mut wire = Opcode::Rrq.to_u16().to_be_bytes().to_vec();
        wire.extend_from_slice(b"no_terminator_here");
        assert!(matches!(TftpFrame::decode(&wire), Err(CodecError::Malformed(_))));
    }

    proptest! {
        #[test]
        fn ack_round_trip(block in any::<u16>()) {
            let frame = TftpFrame::Ack { block };
            let wire = frame.encode().expect("should encode");
            let decoded = TftpFrame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame, decoded);
        }

        #[test]
        fn data_round_trip(block in any::<u16>(), payload in prop::collection::vec(any::<u8>(), 0..=512)) {
            let frame = TftpFrame::Data { block, payload };
            let wire = frame.encode().expect("should encode");
            let decoded = TftpFrame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame, decoded);
        }

        #[test]
        fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..=600)) {
            let _ = TftpFrame::decode(&bytes);
        }
    }
}
