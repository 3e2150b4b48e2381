//! Node assembly.

use crate::{
    controllers::{self, AppState},
    observability::metrics::MinerMetrics,
    services::{
        health::HealthTracker,
        lines::{CachingOddsProvider, LineChecker, OddsApiProvider},
        proof::{ProofGenerator, SessionCapture},
    },
};
use anyhow::{Context, Error};
use node_config::Config;
use prometheus::Registry;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Builds and launches a miner node.
pub struct NodeBuilder {
    config: Config,
}

impl NodeBuilder {
    /// Constructs a builder over the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Wires the services together and launches the API server.
    pub async fn launch(self) -> Result<NodeHandle, Error> {
        let config = self.config;
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(MinerMetrics::new(&registry).context("registering metrics")?);

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("building http client")?;

        let health = Arc::new(HealthTracker::new());
        health.set_odds_api_connected(!config.odds_api_key.is_empty());
        let provider = Arc::new(OddsApiProvider::new(client, config.odds_api_key.clone()));
        let provider =
            Arc::new(CachingOddsProvider::new(provider, std::time::Duration::from_secs(config.odds_cache_ttl)));
        let checker = Arc::new(LineChecker::new(provider, config.line_tolerance));

        let state = AppState {
            health,
            checker,
            proofs: Arc::new(ProofGenerator::new()),
            captures: Arc::new(Mutex::new(SessionCapture::default())),
            metrics,
            registry,
            rate_limiter: AppState::build_rate_limiter(config.rate_limit_capacity, config.rate_limit_rate),
        };

        let token = CancellationToken::new();
        let mut handles = Vec::new();

        let address = format!("{}:{}", config.api_host, config.api_port);
        let listener = TcpListener::bind(&address).await.with_context(|| format!("binding to {address}"))?;
        info!(%address, "Miner API listening");
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
    /// Stops the API server, waiting for it.
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Task failed during shutdown: {e}");
            }
        }
    }
}
