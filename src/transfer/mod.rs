//! The stop-and-wait exchange of data packets and acks after the handshake.
//!
//! The sender transmits one packet and then blocks until that packet's ack arrives, so there is
//!  never more than one unacknowledged packet. The receiver acks every packet as soon as it is
//!  processed. A timeout or a malformed / unexpected datagram on either side ends the transfer;
//!  nothing is retransmitted.

mod lockstep;
mod receiver;
mod sender;

pub use lockstep::{LockstepSender, SenderState};
pub use receiver::{receive_all, ReceiveSummary};
pub use sender::{send_all, SendSummary};
