#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::unimplemented,
    clippy::todo
)]

use anyhow::Error;
use clap::Parser;
use miner::builder::{NodeBuilder, NodeHandle};
use node_config::{Config, NodeRole};
use tokio::{
    select,
    signal::unix::{signal, SignalKind},
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The oracle network miner.
#[derive(Parser)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let Cli {} = Cli::parse();
    let _ = std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", "miner=info"));
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    for warning in config.validate(NodeRole::Miner)? {
        warn!("{warning}");
    }
    info!(netuid = config.bt_netuid, network = %config.bt_network, port = config.api_port, "Miner starting");

    let handle = NodeBuilder::new(config).launch().await?;
    if let Err(e) = run_until_signal(handle).await {
        error!("Failed to run miner: {e}");
        return Err(e);
    }
    Ok(())
}

async fn run_until_signal(handle: NodeHandle) -> Result<(), Error> {
    let mut term_signal = signal(SignalKind::terminate())?;
    let mut interrupt_signal = signal(SignalKind::interrupt())?;
    let mut hangup_signal = signal(SignalKind::hangup())?;

    select! {
        _ = term_signal.recv() => info!("Signal TERM received"),
        _ = interrupt_signal.recv() => info!("Signal INT received"),
        _ = hangup_signal.recv() => info!("Signal HANG received"),
    };

    info!("Stopping the miner gracefully");
    handle.shutdown().await;
    Ok(())
}
