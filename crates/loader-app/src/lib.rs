//! ARINC 615A firmware-upload target: driver binary support library.
//!
//! This crate wires the pure session state machine in [`loader_core`] to
//! real I/O: a bound UDP socket, the key partition, the firmware partition,
//! and the maintenance-trigger input. [`driver::LoaderDriver`] is the
//! dispatch loop; [`config::LoaderConfig`] holds its compile/runtime
//! configuration; [`maintenance_trigger::GpioMaintenanceTrigger`] is the
//! production implementation of the one external collaborator trait this
//! binary must supply itself.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod driver;
pub mod error;
pub mod maintenance_trigger;

pub use config::LoaderConfig;
pub use driver::LoaderDriver;
pub use error::AppError;
pub use maintenance_trigger::GpioMaintenanceTrigger;
