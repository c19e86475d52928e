//! The two peers of a transfer session. Each owns its transport; dropping an endpoint closes it.

mod client;
mod server;

pub use client::QuicClient;
pub use server::QuicServer;
