use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::config::TransferConfig;
use crate::connection::{connect, Connection};
use crate::error::TransferError;
use crate::packet::{Packet, StreamFrame, WireMessage, SHORT_HEADER_FLAG};
use crate::stats::TransferStats;
use crate::stream::Reassembly;
use crate::transfer::receive_all;
use crate::transport::{DatagramTransport, UdpTransport};
use crate::util::random::RngRandom;

/// Packet number of the client's stream request, which is the only packet the client sends
pub const REQUEST_PACKET_NUMBER: u64 = 1;

/// A client with an established connection, ready to request a single transfer.
pub struct QuicClient<T: DatagramTransport = UdpTransport> {
    transport: T,
    connection: Connection,
    config: TransferConfig,
}

impl QuicClient<UdpTransport> {
    /// Binds an ephemeral UDP socket and performs the handshake with the configured server.
    pub async fn connect(config: TransferConfig) -> Result<QuicClient<UdpTransport>, TransferError> {
        config.validated()?;
        let local_addr = match config.server_addr {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let transport = UdpTransport::bind(local_addr).await?;
        QuicClient::with_transport(transport, config).await
    }
}

impl<T: DatagramTransport> QuicClient<T> {
    /// Performs the handshake with the configured server over the given transport.
    pub async fn with_transport(transport: T, config: TransferConfig) -> Result<QuicClient<T>, TransferError> {
        config.validated()?;
        let connection = connect::<RngRandom>(&transport, config.server_addr, &config).await?;
        Ok(QuicClient {
            transport,
            connection,
            config,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Requests `num_streams` streams and receives them. The client is consumed: there is one
    ///  transfer per connection.
    pub async fn request_streams(self, num_streams: u32) -> Result<TransferStats, TransferError> {
        if self.config.exceeds_datagram_size(num_streams as usize) {
            warn!("requesting {} streams, data packets will exceed the maximum datagram size of {} bytes", num_streams, self.config.max_datagram_size);
        }

        let request = Packet {
            flags: SHORT_HEADER_FLAG,
            dest_cid: self.connection.peer_cid,
            packet_number: REQUEST_PACKET_NUMBER,
            frames: (0..num_streams)
                .map(StreamFrame::stream_request)
                .collect(),
        };
        self.transport.send_to(&request.encode(), self.connection.peer_addr).await?;
        info!("sent request for {} streams to {:?}", num_streams, self.connection.peer_addr);

        let mut reassembly = Reassembly::new();
        let summary = receive_all(&self.transport, &self.connection, &mut reassembly, &self.config).await?;
        info!("transfer complete after {:?}", summary.elapsed);

        Ok(TransferStats::from(&reassembly))
    }
}

#[cfg(test)]
mod tests {
    use crate::packet::{ConnectionId, LongHeader};
    use crate::test_util::channel_transport::ChannelTransport;
    use super::*;

    #[tokio::test]
    async fn test_request_packet() {
        let (server_transport, client_transport, log) = ChannelTransport::localhost_pair();
        let server_addr = server_transport.local_addr().unwrap();
        let config = TransferConfig::new(server_addr);

        let server = async {
            let (buf, client_addr) = server_transport.recv_from(1000, None).await.unwrap();
            let client_hello = LongHeader::decode(&buf).unwrap();
            server_transport.send_to(&LongHeader::server_hello(ConnectionId(0x55), &client_hello).encode(), client_addr).await.unwrap();
            client_hello.dest_cid
        };
        let (client_cid, client) = tokio::join!(server, QuicClient::with_transport(client_transport, config));
        let client = client.unwrap();
        assert_eq!(client.connection().local_cid, client_cid);
        assert_eq!(client.connection().peer_cid, ConnectionId(0x55));

        // the server goes away after the handshake, so receiving data fails
        drop(server_transport);
        let result = client.request_streams(3).await;
        assert!(matches!(result, Err(TransferError::Transport(_))));

        let datagrams = log.snapshot();
        assert_eq!(datagrams.len(), 3);
        let request = Packet::decode(&datagrams[2].buf).unwrap();
        assert_eq!(request, Packet {
            flags: SHORT_HEADER_FLAG,
            dest_cid: ConnectionId(0x55),
            packet_number: 1,
            frames: vec![
                StreamFrame::stream_request(0),
                StreamFrame::stream_request(1),
                StreamFrame::stream_request(2),
            ],
        });
        assert_eq!(request.frames[2].data.as_ref(), b"Request2");
        assert_eq!(request.frames[2].offset, 8);
    }
}
