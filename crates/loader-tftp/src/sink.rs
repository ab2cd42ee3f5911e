//! Narrow write target `make_rrq` streams firmware bytes into.
//!
//! Kept separate from `loader-sink`'s concrete staging file so this crate
//! never depends on it; `loader-app` wires the two together.

/// Accepts firmware bytes as they arrive, in order.
pub trait FirmwareWriter {
    /// Append `data` to the staged image. Any error is treated as fatal by
    /// the caller.
    fn append(&mut self, data: &[u8]) -> std::io::Result<()>;
}
