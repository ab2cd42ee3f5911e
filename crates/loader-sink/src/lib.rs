//! Firmware staging file and partition free-space query.
//!
//! [`staging::FirmwareSink`] is the atomic-commit file sink firmware
//! bytes are streamed into during upload; [`partition::FilesystemPartition`]
//! answers the free-space questions the upload guard needs before and
//! during that stream.

pub mod errors;
pub mod partition;
pub mod staging;

pub use errors::{Result, SinkError};
pub use partition::FilesystemPartition;
pub use staging::FirmwareSink;
