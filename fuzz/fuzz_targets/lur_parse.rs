//! Fuzz target for parse_lur
//!
//! This fuzzer tests Load Upload Request parsing with arbitrary byte
//! sequences to find:
//! - Parser crashes or panics
//! - Integer overflows in the declared file-length or header-count fields
//! - Buffer over-reads when a length-prefixed name/part-number field
//!   claims more bytes than are actually present
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use loader_proto::parse_lur;

fuzz_target!(|data: &[u8]| {
    let _ = parse_lur(data);
});
