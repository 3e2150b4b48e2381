//! Prometheus metrics.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

/// The metric bundle exposed by the miner.
pub struct MinerMetrics {
    /// Line check requests served.
    pub checks: IntCounter,

    /// Candidate lines examined.
    pub lines_checked: IntCounter,

    /// Proofs generated.
    pub proofs: IntCounter,

    /// Health pings answered.
    pub health_pings: IntCounter,

    /// Line check latency in seconds.
    pub check_duration: Histogram,
}

impl MinerMetrics {
    /// Builds and registers the bundle on the given registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let checks = IntCounter::new("miner_checks_total", "Line check requests served")?;
        let lines_checked = IntCounter::new("miner_lines_checked_total", "Candidate lines examined")?;
        let proofs = IntCounter::new("miner_proofs_total", "Proofs generated")?;
        let health_pings = IntCounter::new("miner_health_pings_total", "Health pings answered")?;
        let check_duration = Histogram::with_opts(
            HistogramOpts::new("miner_check_duration_seconds", "Line check latency")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;

        registry.register(Box::new(checks.clone()))?;
        registry.register(Box::new(lines_checked.clone()))?;
        registry.register(Box::new(proofs.clone()))?;
        registry.register(Box::new(health_pings.clone()))?;
        registry.register(Box::new(check_duration.clone()))?;

        Ok(Self { checks, lines_checked, proofs, health_pings, check_duration })
    }
}

/// Encodes a registry into the exposition format.
pub fn encode_metrics(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_and_encode() {
        let registry = Registry::new();
        let metrics = MinerMetrics::new(&registry).unwrap();
        metrics.checks.inc();
        metrics.check_duration.observe(0.2);

        let exposition = encode_metrics(&registry).unwrap();
        assert!(exposition.contains("miner_checks_total 1"));
        assert!(exposition.contains("miner_check_duration_seconds_bucket"));
    }
}
