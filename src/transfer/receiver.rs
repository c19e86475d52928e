use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, trace, warn};

use crate::config::TransferConfig;
use crate::connection::Connection;
use crate::error::TransferError;
use crate::packet::{Ack, Packet, WireMessage};
use crate::stream::Reassembly;
use crate::transport::DatagramTransport;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReceiveSummary {
    pub packets_received: u64,
    pub acks_sent: u64,
    pub elapsed: Duration,
}

/// Receives data packets from the connection's peer, feeding their frames into `reassembly` and
///  acking each packet immediately. Returns after the first packet in which every frame is
///  marked as finished (and after acking it).
///
/// Elapsed times passed to `reassembly` are measured from this function's start.
pub async fn receive_all(
    transport: &dyn DatagramTransport,
    connection: &Connection,
    reassembly: &mut Reassembly,
    config: &TransferConfig,
) -> Result<ReceiveSummary, TransferError> {
    let start = Instant::now();
    let mut packets_received = 0u64;
    let mut last_packet_number: Option<u64> = None;

    loop {
        let (buf, from) = transport.recv_from(config.max_datagram_size, Some(config.recv_timeout))
            .await
            .map_err(|e| e.waiting_for("data packet"))?;
        let received_at = Instant::now();
        let packet = Packet::decode(&buf)?;
        packets_received += 1;

        if from != connection.peer_addr {
            warn!("packet {} came from {:?} rather than the peer's address {:?}", packet.packet_number, from, connection.peer_addr);
        }
        if packet.dest_cid != connection.local_cid {
            warn!(packet_number = packet.packet_number, "packet is addressed to {} rather than the local id {}", packet.dest_cid, connection.local_cid);
        }
        if let Some(prev) = last_packet_number {
            if packet.packet_number <= prev {
                warn!(packet_number = packet.packet_number, prev, "packet numbers are not increasing");
            }
        }
        last_packet_number = Some(packet.packet_number);

        trace!(packet_number = packet.packet_number, num_frames = packet.frames.len(), "received packet");
        let all_finished = reassembly.on_packet(&packet, received_at.duration_since(start));

        let ack = Ack {
            ack_number: packet.packet_number,
            ack_delay: received_at.elapsed().as_micros().try_into().unwrap_or(u32::MAX),
        };
        transport.send_to(&ack.encode(), connection.peer_addr).await?;
        trace!(ack_number = ack.ack_number, "sent ack");

        if all_finished {
            break;
        }
    }

    let summary = ReceiveSummary {
        packets_received,
        acks_sent: packets_received,
        elapsed: start.elapsed(),
    };
    info!("received {} bytes on {} streams in {} packets", reassembly.total_bytes(), reassembly.len(), packets_received);
    Ok(summary)
}
