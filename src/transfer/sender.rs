use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::TransferConfig;
use crate::connection::Connection;
use crate::error::TransferError;
use crate::packet::{Ack, Packet, WireMessage};
use crate::transfer::LockstepSender;
use crate::transport::DatagramTransport;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SendSummary {
    pub packets_sent: u64,
    /// stream payload bytes, excluding headers
    pub bytes_sent: u64,
    pub elapsed: Duration,
}

/// Sends `packets` to the connection's peer one at a time, waiting for each packet's ack before
///  sending the next one.
pub async fn send_all(
    transport: &dyn DatagramTransport,
    connection: &Connection,
    packets: impl IntoIterator<Item = Packet> + Send,
    config: &TransferConfig,
) -> Result<SendSummary, TransferError> {
    let start = Instant::now();
    let mut lockstep = LockstepSender::new();
    let mut bytes_sent = 0u64;

    for packet in packets {
        if packet.dest_cid != connection.peer_cid {
            warn!(packet_number = packet.packet_number, "packet is stamped with {} rather than the peer's id {}", packet.dest_cid, connection.peer_cid);
        }

        let buf = packet.encode();
        transport.send_to(&buf, connection.peer_addr).await?;
        lockstep.on_send(packet.packet_number, Instant::now())?;
        bytes_sent += packet.payload_len() as u64;
        trace!(packet_number = packet.packet_number, datagram_len = buf.len(), "waiting for ack");

        let (buf, from) = transport.recv_from(config.max_datagram_size, Some(config.recv_timeout))
            .await
            .map_err(|e| e.waiting_for("ack"))?;
        if from != connection.peer_addr {
            warn!("ack came from {:?} rather than the peer's address {:?}", from, connection.peer_addr);
        }
        let ack = Ack::decode(&buf)?;
        lockstep.on_ack(&ack, Instant::now())?;
    }

    let summary = SendSummary {
        packets_sent: lockstep.packets_acked(),
        bytes_sent,
        elapsed: start.elapsed(),
    };
    debug!(?summary, "all packets acknowledged");
    info!("sent {} bytes in {} packets", summary.bytes_sent, summary.packets_sent);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use bytes::Bytes;
    use mockall::Sequence;

    use crate::connection::ConnectionState;
    use crate::error::DecodeError;
    use crate::packet::{ConnectionId, StreamFrame, SHORT_HEADER_FLAG};
    use crate::transport::MockDatagramTransport;
    use super::*;

    fn client_addr() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    fn connection() -> Connection {
        Connection {
            local_cid: ConnectionId(1),
            peer_cid: ConnectionId(2),
            peer_addr: client_addr(),
            state: ConnectionState::Established,
        }
    }

    fn packet(packet_number: u64) -> Packet {
        Packet {
            flags: SHORT_HEADER_FLAG,
            dest_cid: ConnectionId(2),
            packet_number,
            frames: vec![StreamFrame {
                stream_id: 0,
                offset: 100 * (packet_number + 1),
                finished: false,
                data: Bytes::from(vec![0u8; 100]),
            }],
        }
    }

    fn ack_bytes(ack_number: u64) -> Bytes {
        Ack { ack_number, ack_delay: 17 }.encode()
    }

    #[tokio::test]
    async fn test_send_waits_for_each_ack() {
        let mut transport = MockDatagramTransport::new();
        let mut seq = Sequence::new();

        for pn in 0..3u64 {
            transport.expect_send_to()
                .withf(move |buf, to| *to == client_addr() && Packet::decode(buf).unwrap().packet_number == pn)
                .once()
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
            transport.expect_recv_from()
                .withf(|_, timeout| *timeout == Some(Duration::from_secs(3)))
                .once()
                .in_sequence(&mut seq)
                .returning(move |_, _| Ok((ack_bytes(pn), client_addr())));
        }

        let summary = send_all(&transport, &connection(), (0..3).map(packet), &TransferConfig::default()).await.unwrap();
        assert_eq!(summary.packets_sent, 3);
        assert_eq!(summary.bytes_sent, 300);
    }

    #[tokio::test]
    async fn test_wrong_ack_aborts() {
        let mut transport = MockDatagramTransport::new();
        transport.expect_send_to()
            .once()
            .returning(|_, _| Ok(()));
        transport.expect_recv_from()
            .once()
            .returning(|_, _| Ok((ack_bytes(7), client_addr())));

        let result = send_all(&transport, &connection(), (0..3).map(packet), &TransferConfig::default()).await;
        assert!(matches!(result, Err(TransferError::UnexpectedAck { expected: 0, actual: 7 })));
    }

    #[tokio::test]
    async fn test_malformed_ack_aborts() {
        let mut transport = MockDatagramTransport::new();
        transport.expect_send_to()
            .once()
            .returning(|_, _| Ok(()));
        transport.expect_recv_from()
            .once()
            .returning(|_, _| Ok((packet(0).encode(), client_addr())));

        let result = send_all(&transport, &connection(), (0..3).map(packet), &TransferConfig::default()).await;
        match result {
            Err(TransferError::Decode(DecodeError::UnexpectedKind { expected, actual })) => {
                assert_eq!(expected, "ack");
                assert_eq!(actual, "data");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ack_timeout_aborts_without_retransmission() {
        let mut transport = MockDatagramTransport::new();
        transport.expect_send_to()
            .once()
            .returning(|_, _| Ok(()));
        transport.expect_recv_from()
            .once()
            .returning(|_, timeout| Err(TransferError::Timeout { waiting_for: "datagram", after: timeout.unwrap() }));

        let result = send_all(&transport, &connection(), (0..3).map(packet), &TransferConfig::default()).await;
        match result {
            Err(TransferError::Timeout { waiting_for, after }) => {
                assert_eq!(waiting_for, "ack");
                assert_eq!(after, Duration::from_secs(3));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_packets() {
        let transport = MockDatagramTransport::new();
        let summary = send_all(&transport, &connection(), Vec::new(), &TransferConfig::default()).await.unwrap();
        assert_eq!(summary.packets_sent, 0);
        assert_eq!(summary.bytes_sent, 0);
    }
}
