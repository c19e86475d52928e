use std::io::{stdin, stdout, Write};
use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{anyhow, Context};
use clap::Parser;
use clap_derive::Parser;
use lockstep_quic::config::{TransferConfig, DEFAULT_PORT};
use lockstep_quic::endpoint::QuicClient;
use tracing::{error, info, Level};

#[derive(Parser)]
struct Args {
    #[clap(long, default_value_t = SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)))]
    addr: SocketAddr,

    /// number of streams to request, prompted for if missing
    #[clap(long)]
    streams: Option<u32>,

    #[clap(short, long, default_value_t = false)]
    verbose: bool,

    #[clap(long, default_value_t = false)]
    very_verbose: bool,
}

fn prompt_for_streams() -> anyhow::Result<u32> {
    print!("Enter the number of streams you want to simulate: ");
    stdout().flush()?;

    let mut line = String::new();
    if stdin().read_line(&mut line)? == 0 {
        return Err(anyhow!("no stream count entered"));
    }
    line.trim().parse()
        .with_context(|| format!("invalid stream count {:?}", line.trim()))
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

    let num_streams = match args.streams {
        Some(n) => n,
        None => prompt_for_streams()?,
    };

    let result = async {
        let client = QuicClient::connect(config).await?;
        info!("connected to {} as {}", args.addr, client.connection().local_cid);
        client.request_streams(num_streams).await
    }.await;

    match result {
        Ok(stats) => {
            println!("{}", stats);
            Ok(())
        }
        Err(e) => {
            error!("transfer failed: {}", e);
            Err(e.into())
        }
    }
}
