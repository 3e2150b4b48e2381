//! Prometheus metrics.
//!
//! The registry is owned by the node builder and handed into whatever needs
//! to instrument; nothing registers against a process global.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// The metric bundle exposed by the validator.
pub struct ValidatorMetrics {
    /// Shares stored through the API.
    pub shares_stored: IntCounter,

    /// Key share releases, local and peer triggered.
    pub shares_released: IntCounter,

    /// Purchases by business result.
    pub purchases: IntCounterVec,

    /// Contributions accepted into set membership sessions.
    pub mpc_contributions: IntCounter,

    /// Outcome attestations recorded.
    pub attestations: IntCounter,

    /// Epoch loop iterations.
    pub epochs: IntCounter,

    /// Signals we currently hold shares for.
    pub active_signals: IntGauge,

    /// Miners currently tracked by the scorer.
    pub tracked_miners: IntGauge,
}

impl ValidatorMetrics {
    /// Builds and registers the bundle on the given registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let shares_stored = IntCounter::new("validator_shares_stored_total", "Shares stored through the API")?;
        let shares_released = IntCounter::new("validator_shares_released_total", "Key share releases")?;
        let purchases = IntCounterVec::new(
            Opts::new("validator_purchases_total", "Purchases by business result"),
            &["result"],
        )?;
        let mpc_contributions =
            IntCounter::new("validator_mpc_contributions_total", "Contributions accepted into sessions")?;
        let attestations = IntCounter::new("validator_attestations_total", "Outcome attestations recorded")?;
        let epochs = IntCounter::new("validator_epochs_total", "Epoch loop iterations")?;
        let active_signals = IntGauge::new("validator_active_signals", "Signals with held shares")?;
        let tracked_miners = IntGauge::new("validator_tracked_miners", "Miners tracked by the scorer")?;

        registry.register(Box::new(shares_stored.clone()))?;
        registry.register(Box::new(shares_released.clone()))?;
        registry.register(Box::new(purchases.clone()))?;
        registry.register(Box::new(mpc_contributions.clone()))?;
        registry.register(Box::new(attestations.clone()))?;
        registry.register(Box::new(epochs.clone()))?;
        registry.register(Box::new(active_signals.clone()))?;
        registry.register(Box::new(tracked_miners.clone()))?;

        Ok(Self {
            shares_stored,
            shares_released,
            purchases,
            mpc_contributions,
            attestations,
            epochs,
            active_signals,
            tracked_miners,
        })
    }
}

/// Encodes a registry into the exposition format.
pub fn encode_metrics(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
