//! TFTP engine driving the ARINC 615A upload dialog.
//!
//! Four operations: [`server::handle_rrq`] and
//! [`server::handle_wrq`] serve requests the loader initiates;
//! [`client::make_wrq`] and [`client::make_rrq`] initiate transfers this
//! target drives. [`handshake`] adapts a socket to the PSK handshake
//! `loader-crypto` defines.

pub mod client;
pub mod constants;
pub mod errors;
pub mod handshake;
pub mod retry;
pub mod server;
pub mod sink;
pub mod socket;

pub use client::{make_rrq, make_wrq, RrqOutcome};
pub use errors::{EngineError, Result};
pub use handshake::UdpHandshakeTransport;
pub use server::{handle_rrq, handle_wrq, WrqOutcome};
pub use sink::FirmwareWriter;
