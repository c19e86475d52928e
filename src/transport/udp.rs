use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::config::MAX_UDP_PAYLOAD;
use crate::error::TransferError;
use crate::transport::DatagramTransport;

/// [DatagramTransport] over a tokio [UdpSocket]. The socket is closed when this is dropped.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> Result<UdpTransport, TransferError> {
        let socket = UdpSocket::bind(addr).await?;
        debug!("bound UDP socket to {:?}", socket.local_addr()?);
        Ok(UdpTransport { socket })
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send_to(&self, buf: &[u8], to: SocketAddr) -> Result<(), TransferError> {
        trace!("sending {} bytes to {:?}", buf.len(), to);
        self.socket.send_to(buf, to).await?;
        Ok(())
    }

    async fn recv_from(&self, max_size: usize, timeout: Option<Duration>) -> Result<(Bytes, SocketAddr), TransferError> {
        // received into spare capacity, so the buffer is never zeroed
        let max_size = max_size.min(MAX_UDP_PAYLOAD);
        let mut buf = BytesMut::with_capacity(max_size);

        let (num_read, from) = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.socket.recv_buf_from(&mut buf))
                .await
                .map_err(|_| TransferError::Timeout { waiting_for: "datagram", after: timeout })??,
            None => self.socket.recv_buf_from(&mut buf).await?,
        };

        buf.truncate(max_size);

        trace!("received {} bytes from {:?}", num_read, from);
        Ok((buf.freeze(), from))
    }

    fn local_addr(&self) -> Result<SocketAddr, TransferError> {
        Ok(self.socket.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[tokio::test]
    async fn test_send_and_receive() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        a.send_to(b"abc", b.local_addr().unwrap()).await.unwrap();
        let (buf, from) = b.recv_from(1024, Some(Duration::from_secs(5))).await.unwrap();
        assert_eq!(buf.as_ref(), b"abc");
        assert_eq!(from, a.local_addr().unwrap());
    }

    #[rstest]
    #[case::small_buffer(10, 10)]
    #[case::exact_buffer(100, 100)]
    #[case::huge_buffer(2 * 1024 * 1024, 100)]
    #[tokio::test]
    async fn test_receive_buffer_size(#[case] max_size: usize, #[case] expected_len: usize) {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        let datagram = (0..100u8).collect::<Vec<_>>();
        a.send_to(&datagram, b.local_addr().unwrap()).await.unwrap();
        let (buf, _) = b.recv_from(max_size, Some(Duration::from_secs(5))).await.unwrap();
        assert_eq!(buf.as_ref(), &datagram[..expected_len]);
    }

    #[tokio::test]
    async fn test_recv_timeout() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        let result = a.recv_from(1024, Some(Duration::from_millis(50))).await;
        match result {
            Err(TransferError::Timeout { after, .. }) => assert_eq!(after, Duration::from_millis(50)),
            other => panic!("expected timeout, was {:?}", other),
        }
    }
}
