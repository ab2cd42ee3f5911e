//! Constants shared across the TFTP engine.

use std::time::Duration;

/// Well-known TFTP server port.
pub const PORT: u16 = 69;

/// Per-packet receive timeout. Applies uniformly to every wait in this
/// engine: handshake frames, ACKs, and DATA blocks alike.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(2);

/// Number of retransmissions attempted after the first timeout on a
/// self-initiated send (one retransmission, so two attempts total).
pub const RETRY_LIMIT: u32 = 1;

/// Maximum accumulated payload accepted for an inbound LUR (`handle_wrq`).
pub const LUR_CAP: usize = 256;

/// Byte offset of the 20-byte hardware part-number field within the first
/// firmware DATA payload.
pub const HW_PN_OFFSET: usize = 20;

/// Length in bytes of the hardware part-number field.
pub const HW_PN_LEN: usize = 20;
