//! The validator epoch loop.
//!
//! Once per epoch the validator syncs the metagraph, health-checks miners,
//! occasionally challenges them with ground truth lines, and emits a weight
//! vector. Sync failures back off exponentially; the loop exits cleanly on
//! cancellation.

use crate::{
    channels::{ChainNeuron, MinerChannels},
    observability::metrics::ValidatorMetrics,
    services::{
        challenges::{build_challenge_lines, challenge_miners, fetch_odds_events},
        scoring::MinerScorer,
        shares::ShareStore,
    },
};
use std::{sync::Arc, time::Duration};
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// One chain block is ~12 seconds; epochs are paced on it.
pub const DEFAULT_EPOCH_INTERVAL: Duration = Duration::from_secs(12);

/// Every how many epochs a challenge round runs.
const CHALLENGE_EPOCH_STRIDE: u64 = 5;

const BACKOFF_BASE_SECS: u64 = 60;
const BACKOFF_CAP_SECS: u64 = 600;

/// The sport challenge lines are built from.
const CHALLENGE_SPORT: &str = "basketball_nba";

/// The validator's per-epoch driver.
pub struct EpochLoop {
    neuron: Arc<dyn ChainNeuron>,
    miners: Arc<dyn MinerChannels>,
    scorer: Arc<MinerScorer>,
    store: Arc<ShareStore>,
    metrics: Arc<ValidatorMetrics>,
    odds_client: reqwest::Client,
    odds_api_key: String,
    interval: Duration,
}

impl EpochLoop {
    /// Constructs the loop over the given collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        neuron: Arc<dyn ChainNeuron>,
        miners: Arc<dyn MinerChannels>,
        scorer: Arc<MinerScorer>,
        store: Arc<ShareStore>,
        metrics: Arc<ValidatorMetrics>,
        odds_client: reqwest::Client,
        odds_api_key: String,
        interval: Duration,
    ) -> Self {
        Self { neuron, miners, scorer, store, metrics, odds_client, odds_api_key, interval }
    }

    /// Runs until the token is cancelled.
    pub async fn run(self, token: CancellationToken) {
        info!("Epoch loop started");
        let mut consecutive_sync_errors = 0u32;
        let mut epoch = 0u64;
        loop {
            select! {
                _ = token.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
            if let Err(e) = self.neuron.sync_metagraph().await {
                consecutive_sync_errors = consecutive_sync_errors.saturating_add(1);
                let backoff = sync_backoff(consecutive_sync_errors);
                error!(
                    consecutive = consecutive_sync_errors,
                    "Metagraph sync failed: {e}; backing off for {backoff:?}"
                );
                select! {
                    _ = token.cancelled() => break,
                    _ = sleep(backoff) => {}
                }
                continue;
            }
            consecutive_sync_errors = 0;
            epoch = epoch.saturating_add(1);
            self.run_epoch(epoch).await;
        }
        info!("Epoch loop stopped");
    }

    async fn run_epoch(&self, epoch: u64) {
        let uids = self.neuron.get_miner_uids();
        for uid in &uids {
            let responded = self.miners.ping_health(*uid).await.unwrap_or(false);
            self.scorer.record_health_check(*uid, responded);
        }

        if epoch % CHALLENGE_EPOCH_STRIDE == 0 && !uids.is_empty() {
            self.run_challenge_round(&uids).await;
        }

        // Epochs with signals in flight weigh accuracy; idle epochs fall
        // back to the liveness baseline.
        let is_active = self.store.count() > 0;
        if self.neuron.is_registered() {
            let weights = self.scorer.compute_weights(is_active);
            if !weights.is_empty() {
                match self.neuron.set_weights(&weights).await {
                    Ok(()) => info!(miners = weights.len(), active = is_active, "Weights updated"),
                    Err(e) => error!("Setting weights failed: {e}"),
                }
            }
        }

        self.scorer.reset_epoch();
        self.scorer.bump_consecutive_epochs(&uids);
        self.metrics.epochs.inc();
        self.metrics.active_signals.set(self.store.count() as i64);
        self.metrics.tracked_miners.set(self.scorer.tracked_miners() as i64);
    }

    async fn run_challenge_round(&self, uids: &[u16]) {
        let events = match fetch_odds_events(&self.odds_client, &self.odds_api_key, CHALLENGE_SPORT).await {
            Ok(events) => events,
            Err(e) => {
                error!("Odds snapshot fetch failed: {e}");
                return;
            }
        };
        let lines = build_challenge_lines(&events, CHALLENGE_SPORT);
        if lines.is_empty() {
            return;
        }
        challenge_miners(&self.scorer, self.miners.as_ref(), uids, &lines).await;
    }
}

fn sync_backoff(consecutive_errors: u32) -> Duration {
    let exponent = consecutive_errors.saturating_sub(1).min(10);
    let seconds = BACKOFF_BASE_SECS.saturating_mul(1u64 << exponent).min(BACKOFF_CAP_SECS);
    Duration::from_secs(seconds)
}
