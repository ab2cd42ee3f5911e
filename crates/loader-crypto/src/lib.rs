//! Key storage, PSK handshake, and streaming digest for the firmware loader.
//!
//! This crate holds no socket and drives no engine: [`auth`] describes the
//! handshake in terms of the [`auth::HandshakeTransport`] trait, and the
//! engine crate supplies a socket-backed implementation.

pub mod auth;
pub mod errors;
pub mod hash;
pub mod keys;

pub use auth::{perform_handshake, HandshakeTransport, RecvOutcome};
pub use errors::{CryptoError, Result};
pub use hash::{digests_match, FirmwareDigest, DIGEST_SIZE};
pub use keys::{AuthKeys, KeyStore, DEFAULT_KEYS_MOUNT_POINT, KEY_SIZE};
