//! Fuzz target for TftpFrame::decode
//!
//! This fuzzer tests RFC 1350 frame decoding with arbitrary byte sequences
//! to find:
//! - Parser crashes or panics
//! - Integer overflows in block-number or opcode handling
//! - Buffer over-reads past the declared payload length
//! - Malformed RRQ/WRQ filename or mode fields that bypass NUL-termination
//!   checks
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use loader_proto::TftpFrame;

fuzz_target!(|data: &[u8]| {
    let _ = TftpFrame::decode(data);
});
