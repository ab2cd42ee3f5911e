//! Serving role: responding to requests the loader initiates.

use std::net::SocketAddr;

use loader_proto::{encode_lui, parse_lur, LurRecord, StatusCode, TftpFrame};
use tracing::warn;

use crate::{
    constants::LUR_CAP,
    errors::{EngineError, Result},
    retry::send_and_await_ack,
    socket::{bind_ephemeral, recv_raw, send_frame},
};

/// Serve an RRQ for a `*.LUI` file: send the LUI record as the sole,
/// terminal DATA block on a fresh ephemeral endpoint.
///
/// # Errors
///
/// [`EngineError::UnsupportedFile`] if `filename` does not contain
/// `.LUI`; [`EngineError::Timeout`] or [`EngineError::UnexpectedFrame`] if
/// the ACK never arrives correctly.
pub async fn handle_rrq(filename: &str, requester: SocketAddr) -> Result<()> {
    if !filename.contains(".LUI") {
        return Err(EngineError::UnsupportedFile(filename.to_string()));
    }

    let ephemeral = bind_ephemeral().await?;
    let payload = encode_lui(StatusCode::AcceptedNotStarted, "Operation Accepted");
    let frame = TftpFrame::Data { block: 1, payload };
    send_and_await_ack(&ephemeral, &frame, requester, 1).await
}

/// Outcome of serving a WRQ for `*.LUR`.
pub struct WrqOutcome {
    /// The parsed load upload request record.
    pub record: LurRecord,
    /// Number of stray/misordered frames dropped while serving this
    /// transfer, for the caller to fold into `upload_failure_count`.
    pub soft_faults: u32,
}

/// Serve a WRQ for a `*.LUR` file: ACK the request, then receive DATA
/// blocks in order until a short block terminates the transfer, then parse
/// the accumulated bytes as a [`LurRecord`].
///
/// # Errors
///
/// [`EngineError::UnsupportedFile`] if `filename` does not contain
/// `.LUR`; [`EngineError::Timeout`] on a receive timeout (this role never
/// retransmits: a receive timeout in the server role aborts the transfer);
/// [`EngineError::Codec`] if the accumulated bytes do not parse as a valid
/// LUR.
///
/// A datagram that fails to decode, is not a DATA frame, or carries the
/// wrong block number is a soft fault: it is dropped, counted in the
/// returned [`WrqOutcome`], and the transfer continues.
pub async fn handle_wrq(filename: &str, requester: SocketAddr) -> Result<WrqOutcome> {
    if !filename.contains(".LUR") {
        return Err(EngineError::UnsupportedFile(filename.to_string()));
    }

    let ephemeral = bind_ephemeral().await?;
    send_frame(&ephemeral, &TftpFrame::Ack { block: 0 }, requester).await?;

    let mut buf = Vec::with_capacity(LUR_CAP);
    let mut expected_block: u16 = 1;
    let mut soft_faults = 0;

    loop {
        let Some((bytes, from)) = recv_raw(&ephemeral).await? else {
            return Err(EngineError::Timeout);
        };

        let frame = match TftpFrame::decode(&bytes) {
            Ok(frame) => frame,
            Err(err) => {
                soft_faults += 1;
                warn!(%err, soft_faults, "dropped undecodable datagram while serving WRQ");
                continue;
            },
        };

        let TftpFrame::Data { block, payload } = frame else {
            soft_faults += 1;
            warn!(soft_faults, "dropped non-DATA frame while serving WRQ");
            continue;
        };
        if block != expected_block {
            soft_faults += 1;
            warn!(block, expected_block, soft_faults, "dropped out-of-order DATA block");
            continue;
        }

        let terminal = payload.len() < TftpFrame::BLOCK_SIZE;
        if buf.len() + payload.len() <= LUR_CAP {
            buf.extend_from_slice(&payload);
        }

        send_frame(&ephemeral, &TftpFrame::Ack { block }, from).await?;
        expected_block = expected_block.wrapping_add(1);

        if terminal {
            break;
        }
    }

    let record = parse_lur(&buf)?;
    Ok(WrqOutcome { record, soft_faults })
}

#[cfg(test)]
mod tests {
    use loader_proto::{LurRecord, StatusCode};
    use tokio::net::UdpSocket;

    use super::*;

    #[tokio::test]
    async fn handle_rrq_rejects_non_lui_filename() {
        let err = handle_rrq("image.BIN", "127.0.0.1:1".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFile(_)));
    }

    #[tokio::test]
    async fn handle_wrq_rejects_non_lur_filename() {
        let err = handle_wrq("image.BIN", "127.0.0.1:1".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFile(_)));
    }

    #[tokio::test]
    async fn handle_rrq_delivers_lui_and_completes_on_ack() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer.local_addr().unwrap();

        let serve = tokio::spawn(async move { handle_rrq("TARGET.LUI", peer_addr).await });

        let mut buf = vec![0u8; 600];
        let (n, from) = peer.recv_from(&mut buf).await.unwrap();
        let frame = TftpFrame::decode(&buf[..n]).unwrap();
        let TftpFrame::Data { block, payload } = frame else { panic!("expected DATA") };
        assert_eq!(block, 1);

        let lui = loader_proto::LuiRecord::decode(&payload).unwrap();
        assert_eq!(lui.status_code, StatusCode::AcceptedNotStarted);

        let ack = TftpFrame::Ack { block: 1 }.encode().unwrap();
        peer.send_to(&ack, from).await.unwrap();

        serve.await.unwrap().expect("handle_rrq should succeed");
    }

    #[tokio::test]
    async fn handle_wrq_receives_single_block_lur() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer.local_addr().unwrap();

        let serve = tokio::spawn(async move { handle_wrq("GSE.LUR", peer_addr).await });

        let mut buf = vec![0u8; 600];
        let (n, from) = peer.recv_from(&mut buf).await.unwrap();
        let ack0 = TftpFrame::decode(&buf[..n]).unwrap();
        assert_eq!(ack0, TftpFrame::Ack { block: 0 });

        let lur_bytes = loader_proto::encode_lur(&LurRecord {
            file_length: 42,
            protocol_version: *b"A4",
            num_header_files: 1,
            name: "FIRMWARE.BIN".to_string(),
            part_number: "PN-1".to_string(),
        });
        let data = TftpFrame::Data { block: 1, payload: lur_bytes }.encode().unwrap();
        peer.send_to(&data, from).await.unwrap();

        let (n, _) = peer.recv_from(&mut buf).await.unwrap();
        let ack1 = TftpFrame::decode(&buf[..n]).unwrap();
        assert_eq!(ack1, TftpFrame::Ack { block: 1 });

        let outcome = serve.await.unwrap().expect("handle_wrq should succeed");
        assert_eq!(outcome.record.name, "FIRMWARE.BIN");
        assert_eq!(outcome.soft_faults, 0);
    }
}
