use clap::Parser;
use clap_derive::Parser;
use lockstep_quic::config::{TransferConfig, DEFAULT_PORT};
use lockstep_quic::endpoint::QuicServer;
use std::net::{Ipv4Addr, SocketAddr};
use tracing::{error, info, Level};

#[derive(Parser)]
struct Args {
    #[clap(long, default_value_t = SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)))]
    addr: SocketAddr,

    #[clap(short, long, default_value_t = false)]
    verbose: bool,

    #[clap(long, default_value_t = false)]
    very_verbose: bool,
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match (args.verbose, args.very_verbose) {
        (_, true) => Level::TRACE,
        (true, _) => Level::DEBUG,
        (false, false) => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init()
        .ok();

    let config = TransferConfig::new(args.addr);
    config.validate()?;

    let server = QuicServer::bind(config).await?;
    info!("server listening on {}", server.local_addr()?);

    match server.serve_one().await {
        Ok(summary) => {
            info!("sent {} bytes in {} packets in {:?}", summary.bytes_sent, summary.packets_sent, summary.elapsed);
            Ok(())
        }
        Err(e) => {
            error!("transfer failed: {}", e);
            Err(e.into())
        }
    }
}
