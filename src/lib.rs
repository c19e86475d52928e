//! A QUIC-inspired stop-and-wait transport simulation.
//!
//! A client asks a server for `N` logical streams over one datagram channel. The server cuts each
//!  stream into chunks of a per-stream random size and multiplexes them into packets, one frame
//!  per stream and packet. Both peers then move in lockstep: the server sends one packet and
//!  blocks until it is acknowledged before sending the next. The client reassembles per-stream
//!  counters from the frames and derives throughput statistics once every frame of a packet is
//!  marked as finished.
//!
//! ```ascii
//!  client                                  server
//!    |---- hello (client cid) ------------>|
//!    |<--- hello (server cid, echo) -------|
//!    |---- request (one frame per stream) >|
//!    |<--- packet 0 (one frame per stream)-|
//!    |---- ack 0 ------------------------->|
//!    |<--- packet 1 -----------------------|
//!    |                 ...                 |
//! ```
//!
//! There is no retransmission, congestion control or flow control: any timeout or malformed
//!  datagram ends the session.

pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod packet;
pub mod stats;
pub mod stream;
pub mod test_util;
pub mod transfer;
pub mod transport;
pub mod util;
