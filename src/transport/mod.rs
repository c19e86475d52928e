//! The datagram channel underneath the protocol: unreliable, unordered and message oriented.
//!
//! The protocol core only talks to [DatagramTransport], so tests can swap the UDP socket for an
//!  in-memory channel or a mock.

mod udp;

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)] use mockall::automock;

use crate::error::TransferError;

pub use udp::UdpTransport;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    async fn send_to(&self, buf: &[u8], to: SocketAddr) -> Result<(), TransferError>;

    /// Waits for the next datagram of up to `max_size` bytes. With a `timeout`, an elapsed wait
    ///  is a [TransferError::Timeout]; without, this waits indefinitely.
    async fn recv_from(&self, max_size: usize, timeout: Option<Duration>) -> Result<(Bytes, SocketAddr), TransferError>;

    fn local_addr(&self) -> Result<SocketAddr, TransferError>;
}
