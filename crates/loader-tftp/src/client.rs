//! Initiating role: pushing status records and pulling firmware.

use std::net::SocketAddr;

use loader_core::PartitionInfo;
use loader_crypto::FirmwareDigest;
use loader_proto::TftpFrame;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::{
    constants::{HW_PN_LEN, HW_PN_OFFSET, RETRY_LIMIT},
    errors::{EngineError, Result},
    retry::{await_ack_with_resend, send_and_await_ack},
    sink::FirmwareWriter,
    socket::{recv_raw, send_frame},
};

/// Outcome of a completed [`make_rrq`] firmware pull.
#[derive(Debug)]
pub struct RrqOutcome {
    /// The SHA-256 digest of the streamed firmware, or `None` if zero
    /// bytes were received at all (a soft failure).
    pub digest: Option<[u8; 32]>,
    /// Number of stray or undecodable datagrams dropped during the pull.
    pub soft_faults: u32,
}

/// Push `record_bytes` (an encoded LUS record) to `peer` as `filename` via
/// WRQ.
///
/// Returns the loader's ephemeral TID that answered `ACK(0)`, so the
/// caller can address subsequent DATA/ACK of this transfer correctly. Each
/// transfer gets its own ephemeral TID; the caller is responsible for
/// using the main socket's original peer address again for the *next* LUS
/// push.
///
/// # Errors
///
/// [`EngineError::Timeout`] if the WRQ's `ACK(0)` or the record's
/// `ACK(1)` never arrive within the retry budget.
pub async fn make_wrq(
    socket: &UdpSocket,
    filename: &str,
    record_bytes: Vec<u8>,
    peer: SocketAddr,
) -> Result<SocketAddr> {
    let wrq = TftpFrame::Wrq { filename: filename.to_string(), mode: "octet".to_string() };
    send_frame(socket, &wrq, peer).await?;
    let peer_tid = await_ack_with_resend(socket, &wrq, peer, 0).await?;

    let data = TftpFrame::Data { block: 1, payload: record_bytes };
    send_and_await_ack(socket, &data, peer_tid, 1).await?;

    Ok(peer_tid)
}

/// Pull the firmware file named `filename` via RRQ, streaming payload
/// bytes into `sink` and folding them into a running SHA-256 digest.
///
/// An undecodable datagram or one that is not a DATA frame is a soft
/// fault: it is dropped and counted in the returned [`RrqOutcome`], and
/// the pull continues. [`RrqOutcome::digest`] is `None` if zero bytes
/// were received at all (a soft failure: the caller closes the staged
/// file and does not set a hash).
/// Returns `Err(EngineError::HardwarePartNumberMismatch)` if the first
/// firmware packet's embedded hardware part number does not match
/// `expected_hw_pn` - this aborts only the current RRQ, not the session.
///
/// # Errors
///
/// [`EngineError::Timeout`] on a receive timeout;
/// [`EngineError::InsufficientSpace`] if the partition's free space drops
/// below `min_free_bytes`; [`EngineError::Io`] if `sink` fails to accept a
/// payload.
pub async fn make_rrq(
    socket: &UdpSocket,
    filename: &str,
    peer: SocketAddr,
    expected_hw_pn: &[u8; HW_PN_LEN],
    partition: &dyn PartitionInfo,
    min_free_bytes: u64,
    sink: &mut dyn FirmwareWriter,
) -> Result<RrqOutcome> {
    let rrq = TftpFrame::Rrq { filename: filename.to_string(), mode: "octet".to_string() };
    send_frame(socket, &rrq, peer).await?;

    let mut digest = FirmwareDigest::new();
    let mut server_tid: Option<SocketAddr> = None;
    let mut total_bytes: usize = 0;
    let mut first_packet = true;
    let mut timeouts = 0;
    let mut soft_faults = 0;

    loop {
        let Some((bytes, from)) = recv_raw(socket).await? else {
            timeouts += 1;
            if timeouts > RETRY_LIMIT {
                return Err(EngineError::Timeout);
            }
            debug!(timeouts, "timed out waiting for a firmware DATA packet, retrying");
            continue;
        };
        timeouts = 0;

        let frame = match TftpFrame::decode(&bytes) {
            Ok(frame) => frame,
            Err(err) => {
                soft_faults += 1;
                warn!(%err, soft_faults, "dropped undecodable datagram during firmware pull");
                continue;
            },
        };

        let TftpFrame::Data { block, payload } = frame else {
            soft_faults += 1;
            warn!(soft_faults, "dropped non-DATA frame during firmware pull");
            continue;
        };
        let tid = *server_tid.get_or_insert(from);

        let free = partition.free_bytes();
        if free < min_free_bytes {
            return Err(EngineError::InsufficientSpace { free, required: min_free_bytes });
        }

        if first_packet {
            first_packet = false;
            if payload.len() < HW_PN_OFFSET + HW_PN_LEN {
                return Err(EngineError::UnexpectedFrame(
                    "first firmware packet too short to carry a hardware part number".to_string(),
                ));
            }
            let actual = &payload[HW_PN_OFFSET..HW_PN_OFFSET + HW_PN_LEN];
            if actual != expected_hw_pn {
                return Err(EngineError::HardwarePartNumberMismatch {
                    expected: String::from_utf8_lossy(expected_hw_pn).trim_end().to_string(),
                    actual: String::from_utf8_lossy(actual).trim_end().to_string(),
                });
            }
        }

        let terminal = payload.len() < TftpFrame::BLOCK_SIZE;
        sink.append(&payload)?;
        digest.update(&payload);
        total_bytes += payload.len();

        send_frame(socket, &TftpFrame::Ack { block }, tid).await?;

        if terminal {
            break;
        }
    }

    let digest = if total_bytes == 0 { None } else { Some(digest.finalize()) };
    Ok(RrqOutcome { digest, soft_faults })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct FixedPartition(u64);
    impl PartitionInfo for FixedPartition {
        fn total_bytes(&self) -> u64 {
            self.0
        }

        fn used_bytes(&self) -> u64 {
            0
        }
    }

    struct VecSink(Arc<Mutex<Vec<u8>>>);
    impl FirmwareWriter for VecSink {
        fn append(&mut self, data: &[u8]) -> std::io::Result<()> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(())
        }
    }

    fn hw_pn() -> [u8; HW_PN_LEN] {
        let mut pn = [b' '; HW_PN_LEN];
        pn[..4].copy_from_slice(b"PNHW");
        pn
    }

    #[tokio::test]
    async fn make_wrq_round_trip() {
        let target = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target_addr = target.local_addr().unwrap();
        let loader = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let loader_addr = loader.local_addr().unwrap();

        let push =
            tokio::spawn(
                async move { make_wrq(&target, "INIT_LOAD.LUS", vec![1, 2, 3], loader_addr).await },
            );

        let mut buf = vec![0u8; 600];
        let (n, from) = loader.recv_from(&mut buf).await.unwrap();
        assert_eq!(TftpFrame::decode(&buf[..n]).unwrap().opcode(), loader_proto::Opcode::Wrq);
        loader
            .send_to(&TftpFrame::Ack { block: 0 }.encode().unwrap(), from)
            .await
            .unwrap();

        let (n, from) = loader.recv_from(&mut buf).await.unwrap();
        let TftpFrame::Data { block, payload } = TftpFrame::decode(&buf[..n]).unwrap() else {
            panic!("expected DATA")
        };
        assert_eq!(block, 1);
        assert_eq!(payload, vec![1, 2, 3]);
        loader
            .send_to(&TftpFrame::Ack { block: 1 }.encode().unwrap(), from)
            .await
            .unwrap();

        let peer_tid = push.await.unwrap().expect("make_wrq should succeed");
        assert_eq!(peer_tid, loader_addr);
        let _ = target_addr;
    }

    #[tokio::test]
    async fn make_rrq_streams_firmware_and_returns_digest() {
        let target = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let loader = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let loader_addr = loader.local_addr().unwrap();

        let partition = FixedPartition(10_000_000);
        let staged = Arc::new(Mutex::new(Vec::new()));
        let mut sink = VecSink(Arc::clone(&staged));
        let pn = hw_pn();

        let pull = tokio::spawn(async move {
            make_rrq(&target, "FIRMWARE.BIN", loader_addr, &pn, &partition, 500_000, &mut sink)
                .await
        });

        let mut buf = vec![0u8; 600];
        let (n, from) = loader.recv_from(&mut buf).await.unwrap();
        assert_eq!(TftpFrame::decode(&buf[..n]).unwrap().opcode(), loader_proto::Opcode::Rrq);

        let mut payload = vec![0u8; HW_PN_OFFSET];
        payload.extend_from_slice(&hw_pn());
        payload.extend_from_slice(b"rest of firmware bytes padding to be short block");
        let data = TftpFrame::Data { block: 1, payload };
        loader.send_to(&data.encode().unwrap(), from).await.unwrap();

        let (n, _) = loader.recv_from(&mut buf).await.unwrap();
        assert_eq!(TftpFrame::decode(&buf[..n]).unwrap(), TftpFrame::Ack { block: 1 });

        let outcome = pull.await.unwrap().expect("make_rrq should succeed");
        assert!(outcome.digest.is_some());
        assert_eq!(outcome.soft_faults, 0);
        assert!(!staged.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn make_rrq_rejects_wrong_hardware_part_number() {
        let target = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let loader = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let loader_addr = loader.local_addr().unwrap();

        let partition = FixedPartition(10_000_000);
        let staged = Arc::new(Mutex::new(Vec::new()));
        let mut sink = VecSink(Arc::clone(&staged));
        let pn = hw_pn();

        let pull = tokio::spawn(async move {
            make_rrq(&target, "FIRMWARE.BIN", loader_addr, &pn, &partition, 500_000, &mut sink)
                .await
        });

        let mut buf = vec![0u8; 600];
        let (_, from) = loader.recv_from(&mut buf).await.unwrap();

        let mut payload = vec![0u8; HW_PN_OFFSET];
        payload.extend_from_slice(&[b'X'; HW_PN_LEN]);
        payload.extend_from_slice(b"short block");
        let data = TftpFrame::Data { block: 1, payload };
        loader.send_to(&data.encode().unwrap(), from).await.unwrap();

        let err = pull.await.unwrap().unwrap_err();
        assert!(matches!(err, EngineError::HardwarePartNumberMismatch { .. }));
    }
}
