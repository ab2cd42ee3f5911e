//! Lock-step stop-and-wait retransmission.
//!
//! Never send block N+1 before ACK(N) is seen. On a receive timeout
//! waiting for an ACK, retransmit the outstanding block once; a second
//! timeout aborts the transfer. A received frame that is not the expected
//! ACK is a hard failure, not a retry - only timeouts are retried.

use std::net::SocketAddr;

use loader_proto::TftpFrame;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::{
    constants::RETRY_LIMIT,
    errors::{EngineError, Result},
    socket::{recv_frame, send_frame},
};

/// Send `frame` to `dest` and wait for `ACK(expected_block)`, retransmitting
/// on timeout up to [`RETRY_LIMIT`] times.
pub async fn send_and_await_ack(
    socket: &UdpSocket,
    frame: &TftpFrame,
    dest: SocketAddr,
    expected_block: u16,
) -> Result<()> {
    let mut timeouts = 0;
    loop {
        send_frame(socket, frame, dest).await?;
        match recv_frame(socket).await? {
            None => {
                timeouts += 1;
                if timeouts > RETRY_LIMIT {
                    return Err(EngineError::Timeout);
                }
                debug!(expected_block, timeouts, "timed out awaiting ACK, retransmitting block");
                continue;
            },
            Some((TftpFrame::Ack { block }, _)) if block == expected_block => return Ok(()),
            Some((other, _)) => {
                warn!(expected_block, ?other, "unexpected frame while awaiting ACK");
                return Err(EngineError::UnexpectedFrame(format!(
                    "expected ACK({expected_block}), got {other:?}"
                )));
            },
        }
    }
}

/// Wait for `ACK(expected_block)` without sending anything first,
/// retransmitting `resend` on timeout up to [`RETRY_LIMIT`] times.
///
/// Used by `make_wrq`, which must resend the WRQ itself (not a DATA block)
/// if the initial `ACK(0)` is slow to arrive.
pub async fn await_ack_with_resend(
    socket: &UdpSocket,
    resend: &TftpFrame,
    dest: SocketAddr,
    expected_block: u16,
) -> Result<SocketAddr> {
    let mut timeouts = 0;
    loop {
        match recv_frame(socket).await? {
            None => {
                timeouts += 1;
                if timeouts > RETRY_LIMIT {
                    return Err(EngineError::Timeout);
                }
                debug!(expected_block, timeouts, "timed out awaiting ACK, resending request");
                send_frame(socket, resend, dest).await?;
                continue;
            },
            Some((TftpFrame::Ack { block }, from)) if block == expected_block => return Ok(from),
            Some((other, _)) => {
                warn!(expected_block, ?other, "unexpected frame while awaiting ACK");
                return Err(EngineError::UnexpectedFrame(format!(
                    "expected ACK({expected_block}), got {other:?}"
                )));
            },
        }
    }
}
