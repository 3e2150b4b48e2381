//! Node assembly.

use crate::{
    channels::{HttpValidatorChannels, MinerChannels, OfflineNeuron},
    controllers::{self, AppState},
    observability::metrics::ValidatorMetrics,
    services::{
        outcomes::OutcomeAttestor, purchase::PurchaseOrchestrator, scoring::MinerScorer, shares::ShareStore,
    },
    stateful::epoch::{EpochLoop, DEFAULT_EPOCH_INTERVAL},
};
use anyhow::{Context, Error};
use async_trait::async_trait;
use node_config::Config;
use prometheus::Registry;
use protocols::sessions::SessionTable;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Instant,
};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Builds and launches a validator node.
pub struct NodeBuilder {
    config: Config,
}

/// Miner channels for a node without a synced metagraph.
///
/// Every miner is unreachable until chain glue wires real endpoints in.
#[derive(Default)]
struct OfflineMinerChannels;

#[async_trait]
impl MinerChannels for OfflineMinerChannels {
    async fn ping_health(&self, _uid: u16) -> Result<bool, crate::channels::ChannelError> {
        Ok(false)
    }

    async fn check_lines(
        &self,
        uid: u16,
        _lines: &[crate::services::challenges::ChallengeLine],
    ) -> Result<Vec<u32>, crate::channels::ChannelError> {
        Err(crate::channels::ChannelError::Unavailable(format!("no endpoint known for miner {uid}")))
    }
}

impl NodeBuilder {
    /// Constructs a builder over the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Wires the services together and launches the API server and epoch loop.
    pub async fn launch(self) -> Result<NodeHandle, Error> {
        let config = self.config;
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(ValidatorMetrics::new(&registry).context("registering metrics")?);

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("building http client")?;

        let store = Arc::new(ShareStore::new());
        let sessions = Arc::new(Mutex::new(SessionTable::default()));
        let scorer = Arc::new(MinerScorer::new());
        let attestor = Arc::new(OutcomeAttestor::new(config.sports_api_key.clone(), config.http_timeout()));
        // Peer and miner endpoints come from the metagraph; until that glue
        // is wired in the node runs with empty channel sets.
        let channels = Arc::new(HttpValidatorChannels::new(client.clone(), Vec::new()));
        let neuron = Arc::new(OfflineNeuron);
        let orchestrator =
            Arc::new(PurchaseOrchestrator::new(store.clone(), channels, sessions.clone(), config.mpc_peer_timeout()));

        let state = AppState {
            store: store.clone(),
            orchestrator,
            sessions,
            attestor,
            hotkey: basic_types::ValidatorId::from(config.bt_wallet_hotkey.clone()),
            neuron: neuron.clone(),
            metrics: metrics.clone(),
            registry,
            started_at: Instant::now(),
            rate_limiter: AppState::build_rate_limiter(config.rate_limit_capacity, config.rate_limit_rate),
        };

        let token = CancellationToken::new();
        let mut handles = Vec::new();

        let epoch_loop = EpochLoop::new(
            neuron,
            Arc::new(OfflineMinerChannels),
            scorer,
            store,
            metrics,
            client,
            config.odds_api_key.clone(),
            DEFAULT_EPOCH_INTERVAL,
        );
        handles.push(tokio::spawn(epoch_loop.run(token.child_token())));

        let address = format!("{}:{}", config.api_host, config.api_port);
        let listener = TcpListener::bind(&address).await.with_context(|| format!("binding to {address}"))?;
        info!(%address, "Validator API listening");
        let router = controllers::router(state).into_make_service_with_connect_info::<SocketAddr>();
        let server_token = token.child_token();
        handles.push(tokio::spawn(async move {
            let server = axum::serve(listener, router)
                .with_graceful_shutdown(async move { server_token.cancelled().await });
            if let Err(e) = server.await {
                error!("API server failed: {e}");
            }
        }));

        Ok(NodeHandle { token, handles })
    }
}

/// A handle over a running node.
pub struct NodeHandle {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl NodeHandle {
    /// Stops the background loops and the API server, waiting for them.
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Task failed during shutdown: {e}");
            }
        }
    }
}
