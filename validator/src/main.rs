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
use node_config::{Config, NodeRole};
use std::path::PathBuf;
use tokio::{
    select,
    signal::unix::{signal, SignalKind},
};
use tracing::{error, info, warn};
use validator::{
    builder::{NodeBuilder, NodeHandle},
    observability::tracing::TracingConsumer,
};

/// The oracle network validator.
#[derive(Parser)]
struct Cli {
    /// Mirror logs into a JSON file.
    #[clap(long, env = "LOG_JSON_PATH")]
    log_json_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    let _ = std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", "validator=info"));
    let _tracing_consumer = match cli.log_json_path {
        Some(path) => TracingConsumer::new(path)?,
        None => TracingConsumer::default(),
    };

    let config = Config::load()?;
    for warning in config.validate(NodeRole::Validator)? {
        warn!("{warning}");
    }
    info!(netuid = config.bt_netuid, network = %config.bt_network, port = config.api_port, "Validator starting");

    let handle = NodeBuilder::new(config).launch().await?;
    if let Err(e) = run_until_signal(handle).await {
        error!("Failed to run validator: {e}");
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

    info!("Stopping the validator gracefully");
    handle.shutdown().await;
    Ok(())
}
