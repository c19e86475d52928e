use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::time::Duration;

use anyhow::bail;

use crate::error::TransferError;

pub const DEFAULT_PORT: u16 = 8888;

/// The largest payload a single UDP datagram can carry over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65_507;

const ONE_MB: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// the address the server binds to, and the client sends its hello to
    pub server_addr: SocketAddr,

    /// Bound for every receive during the transfer: the server waiting for the client's request
    ///  and for each ack, the client waiting for each data packet. There is no retry - an elapsed
    ///  timeout ends the session.
    pub recv_timeout: Duration,
    /// bound for the client waiting for the server's hello
    pub handshake_timeout: Duration,
    /// bound for the server waiting for a client's hello, `None` for waiting indefinitely
    pub accept_timeout: Option<Duration>,

    /// chunk size (i.e. payload bytes per frame) is chosen per stream, uniformly from this range
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,

    /// the server generates a random payload per stream with a length uniformly from this range
    pub min_stream_len: usize,
    pub max_stream_len: usize,

    /// size of the receive buffer, i.e. the maximum datagram size that is received unabridged
    pub max_datagram_size: usize,

    /// Streams that are exhausted before the longest stream still get an empty frame (flagged
    ///  as finished) in every subsequent packet. Turning this off omits those frames.
    pub pad_exhausted_streams: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
    }
}

impl TransferConfig {
    pub fn new(server_addr: SocketAddr) -> TransferConfig {
        TransferConfig {
            server_addr,
            recv_timeout: Duration::from_secs(3),
            handshake_timeout: Duration::from_secs(3),
            accept_timeout: None,
            min_chunk_size: 1000,
            max_chunk_size: 2000,
            min_stream_len: ONE_MB,
            max_stream_len: 5 * ONE_MB,
            max_datagram_size: 2 * ONE_MB,
            pad_exhausted_streams: true,
        }
    }

    pub fn chunk_size_range(&self) -> RangeInclusive<usize> {
        self.min_chunk_size..=self.max_chunk_size
    }

    pub fn stream_len_range(&self) -> RangeInclusive<usize> {
        self.min_stream_len..=self.max_stream_len
    }

    /// The maximum number of streams whose full-size frames still fit into a single datagram.
    ///
    /// `max_datagram_size` only sizes the receive buffer, so this is bounded by what UDP can
    ///  carry as well.
    pub fn max_streams(&self) -> usize {
        // fixed overhead: kind + flags + cid + packet number + frame count, per frame: 18 bytes
        let packet_overhead = 1 + 1 + 9 + 8 + 4;
        let frame_len = 18 + self.max_chunk_size;
        self.max_datagram_size.min(MAX_UDP_PAYLOAD).saturating_sub(packet_overhead) / frame_len
    }

    /// `true` if data packets for `num_streams` streams may be too big to be sent
    pub fn exceeds_datagram_size(&self, num_streams: usize) -> bool {
        num_streams > self.max_streams()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_chunk_size == 0 {
            bail!("chunk size must be positive");
        }
        if self.min_chunk_size > self.max_chunk_size {
            bail!("minimum chunk size {} exceeds maximum chunk size {}", self.min_chunk_size, self.max_chunk_size);
        }
        if self.min_stream_len > self.max_stream_len {
            bail!("minimum stream length {} exceeds maximum stream length {}", self.min_stream_len, self.max_stream_len);
        }
        if self.max_chunk_size > u32::MAX as usize {
            bail!("chunk size must fit into 32 bits");
        }
        if self.recv_timeout.is_zero() || self.handshake_timeout.is_zero() {
            bail!("timeouts must be positive");
        }
        if self.accept_timeout.is_some_and(|t| t.is_zero()) {
            bail!("accept timeout must be positive if present");
        }
        if self.max_streams() == 0 {
            bail!("datagram size {} cannot hold a single frame of {} bytes", self.max_datagram_size, self.max_chunk_size);
        }
        Ok(())
    }

    /// [TransferConfig::validate] for code that reports [TransferError]s
    pub fn validated(&self) -> Result<(), TransferError> {
        self.validate()
            .map_err(|e| TransferError::InvalidConfig(e.to_string()))
    }
}
