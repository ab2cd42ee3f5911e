//! Wire codecs for the ARINC 615A-over-TFTP firmware loader dialog.
//!
//! This crate is pure codec: it holds no socket, no file handle, and no
//! session state. [`tftp`] implements the RFC 1350 frame shapes the dialog
//! needs; [`arinc`] implements the LUI/LUS/LUR record layouts carried inside
//! TFTP DATA payloads.

pub mod arinc;
pub mod errors;
pub mod tftp;

pub use arinc::{encode_lui, encode_lus, encode_lur, parse_lur, LuiRecord, LurRecord, LusRecord, StatusCode};
pub use errors::{CodecError, Result};
pub use tftp::{Opcode, TftpFrame};
