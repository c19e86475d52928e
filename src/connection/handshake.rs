use std::net::SocketAddr;

use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::connection::{Connection, ConnectionState};
use crate::error::TransferError;
use crate::packet::{ConnectionId, LongHeader, WireMessage};
use crate::transport::DatagramTransport;
use crate::util::random::Random;

/// Client side of the handshake: sends a hello with a fresh local id to `server_addr` and
///  adopts the `dest_cid` of the server's answer as the peer id.
pub async fn connect<R: Random>(
    transport: &dyn DatagramTransport,
    server_addr: SocketAddr,
    config: &TransferConfig,
) -> Result<Connection, TransferError> {
    let local_cid = ConnectionId::random::<R>();
    let mut state = ConnectionState::Init;
    debug!(%local_cid, ?state, "connecting to {:?}", server_addr);

    transport.send_to(&LongHeader::client_hello(local_cid).encode(), server_addr).await?;
    state = ConnectionState::HelloSent;
    info!(%local_cid, ?state, "sent client hello to {:?}", server_addr);

    let (buf, from) = transport.recv_from(config.max_datagram_size, Some(config.handshake_timeout))
        .await
        .map_err(|e| e.waiting_for("server hello"))?;
    let server_hello = LongHeader::decode(&buf)?;

    if from != server_addr {
        warn!("server hello came from {:?} rather than {:?} - continuing with the configured address", from, server_addr);
    }
    if server_hello.src_cid != Some(local_cid) {
        warn!(%local_cid, "server hello echoes {:?} rather than the client's id", server_hello.src_cid);
    }

    state = ConnectionState::Established;
    info!(%local_cid, peer_cid = %server_hello.dest_cid, ?state, "received server hello");

    Ok(Connection {
        local_cid,
        peer_cid: server_hello.dest_cid,
        peer_addr: server_addr,
        state,
    })
}

/// Server side of the handshake: waits for the first hello, learns the client's id and address,
///  and answers with a hello carrying a fresh local id and echoing the client's id and packet
///  number.
pub async fn accept<R: Random>(
    transport: &dyn DatagramTransport,
    config: &TransferConfig,
) -> Result<Connection, TransferError> {
    let mut state = ConnectionState::Listen;
    debug!(?state, "waiting for client hello on {:?}", transport.local_addr()?);

    let (buf, peer_addr) = transport.recv_from(config.max_datagram_size, config.accept_timeout)
        .await
        .map_err(|e| e.waiting_for("client hello"))?;
    let client_hello = LongHeader::decode(&buf)?;
    state = ConnectionState::HelloReceived;
    info!(peer_cid = %client_hello.dest_cid, ?state, "received client hello from {:?}", peer_addr);

    let local_cid = ConnectionId::random::<R>();
    transport.send_to(&LongHeader::server_hello(local_cid, &client_hello).encode(), peer_addr).await?;
    state = ConnectionState::Established;
    info!(%local_cid, ?state, "sent server hello to {:?}", peer_addr);

    Ok(Connection {
        local_cid,
        peer_cid: client_hello.dest_cid,
        peer_addr,
        state,
    })
}
