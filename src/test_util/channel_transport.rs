use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::TransferError;
use crate::transport::DatagramTransport;

/// A datagram as observed by [ChannelTransport], in the order of sending
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LoggedDatagram {
    pub from: SocketAddr,
    pub to: SocketAddr,
    pub buf: Bytes,
}

/// Shared, ordered record of all datagrams sent through a pair of [ChannelTransport]s.
#[derive(Debug, Clone, Default)]
pub struct SendLog {
    datagrams: Arc<Mutex<Vec<LoggedDatagram>>>,
}
impl SendLog {
    fn push(&self, datagram: LoggedDatagram) {
        self.datagrams.lock()
            .expect("send log lock is poisoned")
            .push(datagram);
    }

    pub fn snapshot(&self) -> Vec<LoggedDatagram> {
        self.datagrams.lock()
            .expect("send log lock is poisoned")
            .clone()
    }
}

/// One end of a lossless, in-order, in-memory datagram channel between two fixed addresses.
///
/// Datagrams sent to any address other than the peer's are silently discarded, like UDP
///  packets sent to a port nobody listens on.
pub struct ChannelTransport {
    self_addr: SocketAddr,
    peer_addr: SocketAddr,
    to_peer: mpsc::UnboundedSender<(Bytes, SocketAddr)>,
    from_peer: tokio::sync::Mutex<mpsc::UnboundedReceiver<(Bytes, SocketAddr)>>,
    log: SendLog,
}

impl ChannelTransport {
    pub fn pair(addr_a: SocketAddr, addr_b: SocketAddr) -> (ChannelTransport, ChannelTransport, SendLog) {
        let (send_a, recv_a) = mpsc::unbounded_channel();
        let (send_b, recv_b) = mpsc::unbounded_channel();
        let log = SendLog::default();

        let a = ChannelTransport {
            self_addr: addr_a,
            peer_addr: addr_b,
            to_peer: send_b,
            from_peer: tokio::sync::Mutex::new(recv_a),
            log: log.clone(),
        };
        let b = ChannelTransport {
            self_addr: addr_b,
            peer_addr: addr_a,
            to_peer: send_a,
            from_peer: tokio::sync::Mutex::new(recv_b),
            log: log.clone(),
        };
        (a, b, log)
    }

    pub fn localhost_pair() -> (ChannelTransport, ChannelTransport, SendLog) {
        Self::pair(
            SocketAddr::from(([127, 0, 0, 1], 8888)),
            SocketAddr::from(([127, 0, 0, 1], 40000)),
        )
    }
}

#[async_trait]
impl DatagramTransport for ChannelTransport {
    async fn send_to(&self, buf: &[u8], to: SocketAddr) -> Result<(), TransferError> {
        self.log.push(LoggedDatagram {
            from: self.self_addr,
            to,
            buf: Bytes::copy_from_slice(buf),
        });

        if to != self.peer_addr {
            trace!("discarding datagram for unknown address {:?}", to);
            return Ok(());
        }

        // a closed channel means the peer is gone, which looks like packet loss from here
        let _ = self.to_peer.send((Bytes::copy_from_slice(buf), self.self_addr));
        Ok(())
    }

    async fn recv_from(&self, max_size: usize, timeout: Option<Duration>) -> Result<(Bytes, SocketAddr), TransferError> {
        let mut from_peer = self.from_peer.lock().await;

        let received = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, from_peer.recv())
                .await
                .map_err(|_| TransferError::Timeout { waiting_for: "datagram", after: timeout })?,
            None => from_peer.recv().await,
        };

        match received {
            Some((mut buf, from)) => {
                buf.truncate(max_size);
                Ok((buf, from))
            }
            None => Err(TransferError::Transport(std::io::Error::new(std::io::ErrorKind::ConnectionAborted, "peer transport was dropped"))),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, TransferError> {
        Ok(self.self_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_delivers_in_order_and_logs() {
        let (a, b, log) = ChannelTransport::localhost_pair();
        let addr_a = a.local_addr().unwrap();
        let addr_b = b.local_addr().unwrap();

        a.send_to(b"one", addr_b).await.unwrap();
        a.send_to(b"two", addr_b).await.unwrap();
        b.send_to(b"back", addr_a).await.unwrap();

        assert_eq!(b.recv_from(100, None).await.unwrap(), (Bytes::from_static(b"one"), addr_a));
        assert_eq!(b.recv_from(100, None).await.unwrap(), (Bytes::from_static(b"two"), addr_a));
        assert_eq!(a.recv_from(100, None).await.unwrap(), (Bytes::from_static(b"back"), addr_b));

        let logged = log.snapshot();
        assert_eq!(logged.len(), 3);
        assert_eq!(logged[2], LoggedDatagram { from: addr_b, to: addr_a, buf: Bytes::from_static(b"back") });
    }

    #[tokio::test]
    async fn test_unknown_address_is_discarded() {
        let (a, b, log) = ChannelTransport::localhost_pair();

        a.send_to(b"lost", "10.0.0.1:1".parse().unwrap()).await.unwrap();
        assert!(b.recv_from(100, Some(Duration::from_millis(10))).await.unwrap_err().is_timeout());
        assert_eq!(log.snapshot().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_timeout() {
        let (a, _b, _log) = ChannelTransport::localhost_pair();
        let err = a.recv_from(100, Some(Duration::from_secs(3))).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
