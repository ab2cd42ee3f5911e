//! Compile-time and deployment configuration.
//!
//! Four items are fixed at compile time: the supported software
//! part-number allow-list, the compiled-in hardware part number, the
//! maximum upload failure count, and the firmware partition's minimum
//! free-space floor. The last two are genuinely fixed constants and live in
//! [`loader_core`] (`MAX_UPLOAD_FAILURES`, `MIN_AVAILABLE_SPACE`); the
//! allow-list and the hardware part number are still compiled in by
//! default here but made overridable via CLI arguments, along with the
//! filesystem paths and bind address.

use std::{collections::HashSet, net::SocketAddr, path::PathBuf};

use loader_tftp::constants::HW_PN_LEN;

/// Software part numbers this target accepts in a LUR's first header.
/// Compiled in; there is no mechanism for updating this list in the field.
pub const DEFAULT_SUPPORTED_SW_PNS: &[&str] = &["EMB-SW-007-137-045", "EMB-SW-007-137-046"];

/// This target's hardware part number, compared against bytes `[20..40)`
/// of the first firmware DATA payload. Right-padded with spaces to fill
/// the 20-byte field.
pub const DEFAULT_HARDWARE_PN: &[u8; HW_PN_LEN] = b"EMB-HW-042-001-000  ";

/// Default mount point for the firmware partition (staging + final path
/// live underneath it).
pub const DEFAULT_FIRMWARE_MOUNT_POINT: &str = "/firmware";

/// Runtime configuration for one [`crate::driver::LoaderDriver`] instance.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Address the main TFTP socket binds to (normally `0.0.0.0:69`).
    pub bind_addr: SocketAddr,
    /// Key partition mount point, holding the two 32-byte PSK files.
    pub keys_mount: PathBuf,
    /// Path the firmware sink stages the incoming image at before commit.
    pub staging_path: PathBuf,
    /// Path the firmware sink renames the staged image onto after a
    /// successful verify.
    pub final_path: PathBuf,
    /// Firmware partition mount point, used for the free-space query.
    pub firmware_mount: PathBuf,
    /// Allow-listed software part numbers.
    pub supported_sw_pns: HashSet<String>,
    /// This target's compiled-in hardware part number.
    pub hardware_pn: [u8; HW_PN_LEN],
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let firmware_mount = PathBuf::from(DEFAULT_FIRMWARE_MOUNT_POINT);
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], loader_tftp::constants::PORT)),
            keys_mount: PathBuf::from(loader_crypto::DEFAULT_KEYS_MOUNT_POINT),
            staging_path: firmware_mount.join("staging.bin"),
            final_path: firmware_mount.join("final.bin"),
            firmware_mount,
            supported_sw_pns: DEFAULT_SUPPORTED_SW_PNS.iter().map(|s| (*s).to_string()).collect(),
            hardware_pn: *DEFAULT_HARDWARE_PN,
        }
    }
}
