//! Session state machine for the ARINC 615A firmware-upload dialog.
//!
//! This crate holds no socket and performs no I/O: [`fsm`] is a pure state
//! machine that the `loader-app` driver steps forward as it executes each
//! state's work via `loader-tftp`, `loader-crypto`, and `loader-sink`.

pub mod error;
pub mod fsm;
pub mod traits;

pub use error::LoaderError;
pub use fsm::{
    SessionContext, SessionFsm, SessionState, StepOutcome, MAX_UPLOAD_FAILURES,
    MIN_AVAILABLE_SPACE,
};
pub use traits::{MaintenanceTrigger, PartitionInfo};
