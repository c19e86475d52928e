use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::connection::{accept, Connection};
use crate::error::TransferError;
use crate::packet::{Packet, WireMessage};
use crate::stream::Multiplexer;
use crate::transfer::{send_all, SendSummary};
use crate::transport::{DatagramTransport, UdpTransport};
use crate::util::random::{Random, RngRandom};

/// Serves a single client: handshake, stream request, then the lockstep transfer of randomly
///  generated stream payloads.
pub struct QuicServer<T: DatagramTransport = UdpTransport> {
    transport: T,
    config: TransferConfig,
}

impl QuicServer<UdpTransport> {
    pub async fn bind(config: TransferConfig) -> Result<QuicServer<UdpTransport>, TransferError> {
        config.validated()?;
        let transport = UdpTransport::bind(config.server_addr).await?;
        QuicServer::with_transport(transport, config)
    }
}

impl<T: DatagramTransport> QuicServer<T> {
    pub fn with_transport(transport: T, config: TransferConfig) -> Result<QuicServer<T>, TransferError> {
        config.validated()?;
        Ok(QuicServer { transport, config })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr, TransferError> {
        self.transport.local_addr()
    }

    /// Runs one complete session. The server is consumed, i.e. its socket is closed when the
    ///  session ends, successfully or not.
    pub async fn serve_one(self) -> Result<SendSummary, TransferError> {
        self.serve_one_with::<RngRandom>().await
    }

    async fn serve_one_with<R: Random>(self) -> Result<SendSummary, TransferError> {
        let connection = accept::<R>(&self.transport, &self.config).await?;
        let num_streams = self.receive_request(&connection).await?;

        let payloads = (0..num_streams)
            .map(|_| Self::random_payload::<R>(&self.config))
            .collect::<Vec<_>>();
        let packets = Multiplexer::with_random_chunk_sizes::<R>(connection.peer_cid, payloads, &self.config);
        info!("sending {} streams in {} packets", num_streams, packets.max_packets());

        send_all(&self.transport, &connection, packets, &self.config).await
    }

    /// returns the number of requested streams
    async fn receive_request(&self, connection: &Connection) -> Result<usize, TransferError> {
        let (buf, from) = self.transport.recv_from(self.config.max_datagram_size, Some(self.config.recv_timeout))
            .await
            .map_err(|e| e.waiting_for("stream request"))?;
        let request = Packet::decode(&buf)?;

        if from != connection.peer_addr {
            warn!("stream request came from {:?} rather than the peer's address {:?}", from, connection.peer_addr);
        }
        if request.dest_cid != connection.local_cid {
            warn!("stream request is addressed to {} rather than the local id {}", request.dest_cid, connection.local_cid);
        }
        for (i, frame) in request.frames.iter().enumerate() {
            if frame.stream_id as usize != i {
                warn!("request frame #{} asks for stream {} - streams are numbered by position", i, frame.stream_id);
            }
        }

        let num_streams = request.frames.len();
        if self.config.exceeds_datagram_size(num_streams) {
            warn!("{} streams requested, data packets will exceed the maximum datagram size of {} bytes", num_streams, self.config.max_datagram_size);
        }
        info!("received request for {} streams", num_streams);
        Ok(num_streams)
    }

    fn random_payload<R: Random>(config: &TransferConfig) -> Bytes {
        let len = R::gen_usize_range(config.stream_len_range());
        let mut data = vec![0u8; len];
        R::fill_bytes(&mut data);
        debug!("generated {} bytes of stream data", len);
        data.into()
    }
}
