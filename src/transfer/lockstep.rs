use std::time::Duration;

use tokio::time::Instant;
use tracing::{trace, warn};

use crate::error::TransferError;
use crate::packet::Ack;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SenderState {
    Idle,
    AwaitingAck {
        packet_number: u64,
        sent_at: Instant,
    },
}

impl SenderState {
    fn name(&self) -> &'static str {
        match self {
            SenderState::Idle => "idle",
            SenderState::AwaitingAck { .. } => "awaiting ack",
        }
    }
}

/// Bookkeeping for the sending side of the lockstep protocol: `Idle -> AwaitingAck -> Idle`.
///
/// This does no I/O, it only enforces the window of a single packet. Sending while a packet is
///  unacknowledged, or an ack that does not match the packet in flight, is an error.
#[derive(Debug)]
pub struct LockstepSender {
    state: SenderState,
    last_sent: Option<u64>,
    packets_acked: u64,
}

impl Default for LockstepSender {
    fn default() -> Self {
        LockstepSender::new()
    }
}

impl LockstepSender {
    pub fn new() -> LockstepSender {
        LockstepSender {
            state: SenderState::Idle,
            last_sent: None,
            packets_acked: 0,
        }
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn packets_acked(&self) -> u64 {
        self.packets_acked
    }

    pub fn on_send(&mut self, packet_number: u64, now: Instant) -> Result<(), TransferError> {
        if self.state != SenderState::Idle {
            return Err(TransferError::InvalidState {
                expected: SenderState::Idle.name(),
                actual: self.state.name(),
            });
        }

        if let Some(prev) = self.last_sent {
            if packet_number <= prev {
                warn!(packet_number, prev, "packet numbers are not increasing");
            }
        }

        trace!(packet_number, "sent packet");
        self.last_sent = Some(packet_number);
        self.state = SenderState::AwaitingAck { packet_number, sent_at: now };
        Ok(())
    }

    /// Returns the round trip time of the acknowledged packet.
    pub fn on_ack(&mut self, ack: &Ack, now: Instant) -> Result<Duration, TransferError> {
        match self.state {
            SenderState::Idle => Err(TransferError::InvalidState {
                expected: "awaiting ack",
                actual: self.state.name(),
            }),
            SenderState::AwaitingAck { packet_number, .. } if packet_number != ack.ack_number => {
                Err(TransferError::UnexpectedAck {
                    expected: packet_number,
                    actual: ack.ack_number,
                })
            }
            SenderState::AwaitingAck { packet_number, sent_at } => {
                let rtt = now.saturating_duration_since(sent_at);
                trace!(packet_number, ?rtt, ack_delay_micros = ack.ack_delay, "received ack");
                self.packets_acked += 1;
                self.state = SenderState::Idle;
                Ok(rtt)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ack(ack_number: u64) -> Ack {
        Ack { ack_number, ack_delay: 0 }
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_ack_cycle() {
        let mut sender = LockstepSender::new();
        assert_eq!(sender.state(), SenderState::Idle);

        let t0 = Instant::now();
        sender.on_send(0, t0).unwrap();
        assert_eq!(sender.state(), SenderState::AwaitingAck { packet_number: 0, sent_at: t0 });

        let rtt = sender.on_ack(&ack(0), t0 + Duration::from_millis(5)).unwrap();
        assert_eq!(rtt, Duration::from_millis(5));
        assert_eq!(sender.state(), SenderState::Idle);

        sender.on_send(1, t0).unwrap();
        sender.on_ack(&ack(1), t0).unwrap();
        assert_eq!(sender.packets_acked(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_send_while_awaiting_ack() {
        let mut sender = LockstepSender::new();
        sender.on_send(0, Instant::now()).unwrap();

        match sender.on_send(1, Instant::now()) {
            Err(TransferError::InvalidState { expected, actual }) => {
                assert_eq!(expected, "idle");
                assert_eq!(actual, "awaiting ack");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_while_idle() {
        let mut sender = LockstepSender::new();
        assert!(matches!(sender.on_ack(&ack(0), Instant::now()), Err(TransferError::InvalidState { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_for_wrong_packet() {
        let mut sender = LockstepSender::new();
        sender.on_send(3, Instant::now()).unwrap();

        match sender.on_ack(&ack(2), Instant::now()) {
            Err(TransferError::UnexpectedAck { expected: 3, actual: 2 }) => {}
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(sender.packets_acked(), 0);
    }
}
