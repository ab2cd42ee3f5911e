//! Thin receive-with-timeout wrapper around `tokio::net::UdpSocket`.
//!
//! Every wait in this engine goes through [`recv_frame`] so the 2-second
//! receive timeout is applied in exactly one place. A `None` return means
//! the timeout elapsed with nothing received; it is not an error.

use std::net::SocketAddr;

use loader_proto::TftpFrame;
use tokio::net::UdpSocket;

use crate::{constants::RECEIVE_TIMEOUT, errors::Result};

/// Bind a fresh ephemeral UDP endpoint (OS-assigned port), used for every
/// per-transfer local TID per RFC 1350.
pub async fn bind_ephemeral() -> std::io::Result<UdpSocket> {
    UdpSocket::bind("0.0.0.0:0").await
}

/// Bind the well-known main socket on [`crate::constants::PORT`].
pub async fn bind_main() -> std::io::Result<UdpSocket> {
    UdpSocket::bind(("0.0.0.0", crate::constants::PORT)).await
}

/// Wait for a single raw datagram, or `None` if [`RECEIVE_TIMEOUT`] elapses
/// first, without decoding it.
///
/// Used by receive loops that must drop and count an undecodable datagram
/// as a soft fault rather than letting the decode error abort the transfer,
/// as [`recv_frame`] would.
pub async fn recv_raw(socket: &UdpSocket) -> Result<Option<(Vec<u8>, SocketAddr)>> {
    let mut buf = vec![0u8; TftpFrame::BLOCK_SIZE + 32];
    match tokio::time::timeout(RECEIVE_TIMEOUT, socket.recv_from(&mut buf)).await {
        Err(_elapsed) => Ok(None),
        Ok(Err(io_err)) => Err(io_err.into()),
        Ok(Ok((n, from))) => Ok(Some((buf[..n].to_vec(), from))),
    }
}

/// Wait for a single frame, or `None` if [`RECEIVE_TIMEOUT`] elapses first.
///
/// An undecodable datagram is a hard [`crate::errors::EngineError::Codec`]
/// here; callers that must instead drop and count such datagrams as soft
/// faults (`handle_wrq`, `make_rrq`) use [`recv_raw`] and decode themselves.
pub async fn recv_frame(socket: &UdpSocket) -> Result<Option<(TftpFrame, SocketAddr)>> {
    let Some((bytes, from)) = recv_raw(socket).await? else {
        return Ok(None);
    };
    let frame = TftpFrame::decode(&bytes)?;
    Ok(Some((frame, from)))
}

/// Encode `frame` and send it to `dest`.
pub async fn send_frame(socket: &UdpSocket, frame: &TftpFrame, dest: SocketAddr) -> Result<()> {
    let wire = frame.encode()?;
    socket.send_to(&wire, dest).await?;
    Ok(())
}
