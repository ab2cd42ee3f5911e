//! Socket-backed [`HandshakeTransport`] for the mutual PSK handshake.
//!
//! The handshake reuses the DATA/ACK envelope but not RRQ/WRQ framing, so
//! it gets its own thin adapter rather than sharing `server.rs`/`client.rs`.

use std::net::SocketAddr;

use loader_crypto::{HandshakeTransport, RecvOutcome};
use loader_proto::TftpFrame;
use tokio::net::UdpSocket;

/// Binds the handshake to a specific socket and peer address.
///
/// `peer` is updated to whichever address the first DATA frame actually
/// arrived from, since the loader's handshake TID is not known in advance.
pub struct UdpHandshakeTransport<'a> {
    socket: &'a UdpSocket,
    peer: SocketAddr,
}

impl<'a> UdpHandshakeTransport<'a> {
    /// Build a transport over `socket`, initially addressing `peer`.
    #[must_use]
    pub fn new(socket: &'a UdpSocket, peer: SocketAddr) -> Self {
        Self { socket, peer }
    }

    /// The address the last received frame came from.
    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl HandshakeTransport for UdpHandshakeTransport<'_> {
    async fn send_frame(&mut self, frame: &TftpFrame) -> Result<(), String> {
        let wire = frame.encode().map_err(|err| err.to_string())?;
        self.socket.send_to(&wire, self.peer).await.map_err(|err| err.to_string())?;
        Ok(())
    }

    async fn recv_frame(&mut self) -> Result<RecvOutcome, String> {
        match crate::socket::recv_frame(self.socket).await {
            Ok(Some((frame, from))) => {
                self.peer = from;
                Ok(RecvOutcome::Frame(frame))
            },
            Ok(None) => Ok(RecvOutcome::Timeout),
            Err(err) => Err(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use loader_crypto::{perform_handshake, AuthKeys, CryptoError, KEY_SIZE};

    use super::*;

    #[tokio::test]
    async fn handshake_completes_over_real_sockets() {
        let target = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let loader = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target_addr = target.local_addr().unwrap();
        let loader_addr = loader.local_addr().unwrap();

        let keys = AuthKeys { local_key: [9u8; KEY_SIZE], peer_expected_key: [5u8; KEY_SIZE] };

        let run_target = tokio::spawn(async move {
            let mut transport = UdpHandshakeTransport::new(&target, loader_addr);
            let outcome = perform_handshake(&mut transport, &keys).await;
            (outcome, transport.peer())
        });

        loader
            .send_to(
                &TftpFrame::Data { block: 1, payload: vec![5u8; KEY_SIZE] }.encode().unwrap(),
                target_addr,
            )
            .await
            .unwrap();

        let mut buf = vec![0u8; 64];
        let (n, from) = loader.recv_from(&mut buf).await.unwrap();
        assert_eq!(TftpFrame::decode(&buf[..n]).unwrap(), TftpFrame::Ack { block: 1 });

        let (n, _) = loader.recv_from(&mut buf).await.unwrap();
        let TftpFrame::Data { block, payload } = TftpFrame::decode(&buf[..n]).unwrap() else {
            panic!("expected DATA carrying the target's key")
        };
        assert_eq!(block, 1);
        assert_eq!(payload, vec![9u8; KEY_SIZE]);

        loader
            .send_to(&TftpFrame::Ack { block: 1 }.encode().unwrap(), from)
            .await
            .unwrap();

        let (result, _peer) = run_target.await.unwrap();
        result.expect("handshake should succeed");
    }

    #[tokio::test]
    async fn handshake_times_out_with_no_peer() {
        let target = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let nowhere: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let keys = AuthKeys { local_key: [0u8; KEY_SIZE], peer_expected_key: [0u8; KEY_SIZE] };
        let mut transport = UdpHandshakeTransport::new(&target, nowhere);
        let err = perform_handshake(&mut transport, &keys).await.unwrap_err();
        assert!(matches!(err, CryptoError::Timeout));
    }
}
