//! Mutual PSK handshake.
//!
//! The handshake rides the same DATA/ACK envelope TFTP uses for file
//! transfer, but it is not a file transfer: the target waits for the
//! loader's key inside a DATA payload, acknowledges it, then pushes its own
//! key the same way and waits for a single ACK. [`HandshakeTransport`]
//! abstracts the send/receive calls so this crate never depends on a socket
//! or an async runtime directly; the engine crate supplies an
//! implementation backed by a real UDP socket.

use loader_proto::TftpFrame;
use subtle::ConstantTimeEq;

use crate::{
    errors::{CryptoError, Result},
    keys::{AuthKeys, KEY_SIZE},
};

/// Outcome of a single receive attempt.
#[derive(Debug)]
pub enum RecvOutcome {
    /// A frame arrived before the timeout elapsed.
    Frame(TftpFrame),
    /// No frame arrived before the timeout elapsed.
    Timeout,
}

/// Send/receive primitive the handshake drives.
///
/// Implementations decide their own receive timeout; the handshake only
/// distinguishes "a frame arrived" from "nothing arrived in time" via
/// [`RecvOutcome`].
pub trait HandshakeTransport {
    /// Send a frame to the peer. `Err` is fatal to the handshake.
    async fn send_frame(&mut self, frame: &TftpFrame) -> std::result::Result<(), String>;

    /// Receive the next frame from the peer, or report a timeout.
    ///
    /// `Err` is reserved for receive errors other than a timeout (e.g. a
    /// socket error); timeouts are reported as `Ok(RecvOutcome::Timeout)`.
    async fn recv_frame(&mut self) -> std::result::Result<RecvOutcome, String>;
}

/// Drives the mutual handshake to completion over `transport`.
///
/// On success, both sides consider `keys` authenticated. On
/// [`CryptoError::Timeout`] the caller may re-enter this function; every
/// other error is fatal to the session.
pub async fn perform_handshake<T: HandshakeTransport>(
    transport: &mut T,
    keys: &AuthKeys,
) -> Result<()> {
    let accepted_block = loop {
        match transport.recv_frame().await.map_err(CryptoError::RecvError)? {
            RecvOutcome::Timeout => return Err(CryptoError::Timeout),
            RecvOutcome::Frame(TftpFrame::Data { block, payload }) => {
                if payload.len() != KEY_SIZE {
                    continue;
                }
                if !keys_match(&payload, &keys.peer_expected_key) {
                    return Err(CryptoError::KeyMismatch);
                }
                break block;
            },
            RecvOutcome::Frame(_) => continue,
        }
    };

    transport
        .send_frame(&TftpFrame::Ack { block: accepted_block })
        .await
        .map_err(CryptoError::SendError)?;

    transport
        .send_frame(&TftpFrame::Data { block: 1, payload: keys.local_key.to_vec() })
        .await
        .map_err(CryptoError::SendError)?;

    match transport.recv_frame().await.map_err(CryptoError::RecvError)? {
        RecvOutcome::Timeout => Err(CryptoError::Timeout),
        RecvOutcome::Frame(TftpFrame::Ack { block: 1 }) => Ok(()),
        RecvOutcome::Frame(other) => {
            Err(CryptoError::BadFrame(format!("expected ACK(1), got {other:?}")))
        },
    }
}

/// Constant-time comparison of a received key payload against the expected
/// key, so a mismatching prefix does not leak timing information.
fn keys_match(received: &[u8], expected: &[u8; KEY_SIZE]) -> bool {
    received.len() == KEY_SIZE && bool::from(received.ct_eq(expected))
}
