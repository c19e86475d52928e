//! Connection establishment: a single round of connection-id exchange.
//!
//! ```ascii
//!  client: Init --send hello--> HelloSent --recv hello--> Established
//!  server: Listen --recv hello--> HelloReceived --send hello--> Established
//! ```
//!
//! There is no retry, no protection against duplicate or spoofed hellos, and no cryptography.
//!  The server trusts the address the first hello came from for the rest of the session.

mod handshake;

use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

use crate::packet::ConnectionId;

pub use handshake::{accept, connect};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConnectionState {
    /// client: local id generated, nothing sent yet
    Init,
    /// client: hello sent, waiting for the server's hello
    HelloSent,
    /// server: waiting for a client's hello
    Listen,
    /// server: client hello received, own hello not sent yet
    HelloReceived,
    Established,
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One side's view of an established association with its peer.
///
/// `local_cid` is the id this side generated and advertised; `peer_cid` is the id learned from
///  the peer's hello. Packets to the peer are stamped with `peer_cid`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Connection {
    pub local_cid: ConnectionId,
    pub peer_cid: ConnectionId,
    pub peer_addr: SocketAddr,
    pub state: ConnectionState,
}

impl Connection {
    pub fn is_established(&self) -> bool {
        self.state == ConnectionState::Established
    }
}
