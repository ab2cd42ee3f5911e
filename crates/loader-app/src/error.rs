//! Top-level errors for the driver binary.
//!
//! Every component crate has its own typed error enum; this one exists
//! only for the handful of failures that belong to the binary itself
//! (bad CLI-supplied paths, binding the main socket, mounting the
//! partitions) plus the single variant the run loop returns when the FSM
//! reaches `ERROR` and halts.

use thiserror::Error;

/// Errors surfaced by `loader-app` itself, outside the session FSM's own
/// error taxonomy.
#[derive(Error, Debug)]
pub enum AppError {
    /// Failed to bind the main UDP socket on the configured address.
    #[error("failed to bind main socket on {addr}: {source}")]
    BindMainSocket {
        /// Address the binary attempted to bind.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to mount (probe free space on) the firmware partition.
    #[error("failed to mount firmware partition at {path}: {source}")]
    MountFirmwarePartition {
        /// Configured mount point.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to provision the static keys on first boot.
    #[error("failed to initialize key store: {0}")]
    KeyStoreInit(#[from] loader_crypto::CryptoError),

    /// The session FSM reached the terminal `ERROR` state. The staged
    /// firmware image has been discarded; the process must now halt and
    /// rely on a power cycle to restart cleanly from `INIT`.
    #[error("session state machine reached the terminal ERROR state")]
    SessionFailed,
}
