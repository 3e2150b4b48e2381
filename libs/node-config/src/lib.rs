//! The configuration for a node.
//!
//! Parsed from the environment exactly once at startup; the resulting value
//! is immutable and handed into constructors.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::unimplemented, clippy::todo)]

use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The top level configuration.
///
/// Every property maps to an environment variable with the same name in
/// upper case: `bt_netuid` is set through `BT_NETUID` and so on. Missing
/// variables fall back to defaults suitable for a local development network.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// The subnet this node participates in.
    #[serde(default = "default_bt_netuid")]
    pub bt_netuid: u16,

    /// The chain network name.
    #[serde(default = "default_bt_network")]
    pub bt_network: String,

    /// The wallet the node signs with.
    #[serde(default = "default_wallet")]
    pub bt_wallet_name: String,

    /// The hotkey within the wallet.
    #[serde(default = "default_wallet")]
    pub bt_wallet_hotkey: String,

    /// The address the HTTP API binds to.
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// The port the HTTP API binds to.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// API key for the odds quote feed.
    #[serde(default)]
    pub odds_api_key: String,

    /// API key for the event scores feed used during outcome attestation.
    #[serde(default)]
    pub sports_api_key: String,

    /// How long fetched odds snapshots stay fresh, in seconds.
    #[serde(default = "default_odds_cache_ttl")]
    pub odds_cache_ttl: u64,

    /// Maximum distance between a quoted point and a candidate line's point
    /// for the line to count as available.
    #[serde(default = "default_line_tolerance")]
    pub line_tolerance: f64,

    /// Outbound HTTP timeout, in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    /// How long a set membership session waits for peer contributions, in seconds.
    #[serde(default = "default_mpc_peer_timeout")]
    pub mpc_peer_timeout: f64,

    /// Token bucket capacity for per-source rate limiting.
    #[serde(default = "default_rate_limit_capacity")]
    pub rate_limit_capacity: u32,

    /// Token bucket refill rate, in tokens per second.
    #[serde(default = "default_rate_limit_rate")]
    pub rate_limit_rate: u32,
}

fn default_bt_netuid() -> u16 {
    103
}

fn default_bt_network() -> String {
    "finney".to_string()
}

fn default_wallet() -> String {
    "default".to_string()
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8421
}

fn default_odds_cache_ttl() -> u64 {
    60
}

fn default_line_tolerance() -> f64 {
    0.5
}

fn default_http_timeout() -> u64 {
    30
}

fn default_mpc_peer_timeout() -> f64 {
    10.0
}

fn default_rate_limit_capacity() -> u32 {
    60
}

fn default_rate_limit_rate() -> u32 {
    10
}

const KNOWN_NETWORKS: &[&str] = &["finney", "mainnet", "test", "local", "mock"];

/// Which node the configuration is being validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// A validator: attests outcomes, so it needs the scores feed.
    Validator,

    /// A miner: checks lines, so it needs the odds feed.
    Miner,
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(source: config::Environment) -> Result<Self, ConfigError> {
        let config = config::Config::builder().add_source(source).build()?;
        config.try_deserialize()
    }

    /// Whether this node runs against a production network.
    pub fn is_production(&self) -> bool {
        matches!(self.bt_network.as_str(), "finney" | "mainnet")
    }

    /// The outbound HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    /// How long a set membership session waits for peer contributions.
    pub fn mpc_peer_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.mpc_peer_timeout)
    }

    /// Validates the configuration at startup.
    ///
    /// Hard failures abort the node; the returned list contains soft
    /// warnings worth logging but not dying over.
    pub fn validate(&self, role: NodeRole) -> Result<Vec<String>, InvalidConfig> {
        let mut warnings = Vec::new();
        if self.bt_netuid == 0 {
            return Err(InvalidConfig("BT_NETUID must be in [1, 65535]".to_string()));
        }
        if self.api_port == 0 {
            return Err(InvalidConfig("API_PORT must be in [1, 65535]".to_string()));
        }
        if self.http_timeout < 1 {
            return Err(InvalidConfig(format!("HTTP_TIMEOUT must be >= 1, got {}", self.http_timeout)));
        }
        if self.mpc_peer_timeout < 1.0 {
            return Err(InvalidConfig(format!("MPC_PEER_TIMEOUT must be >= 1.0, got {}", self.mpc_peer_timeout)));
        }
        if self.rate_limit_capacity < 1 {
            return Err(InvalidConfig(format!(
                "RATE_LIMIT_CAPACITY must be >= 1, got {}",
                self.rate_limit_capacity
            )));
        }
        if self.rate_limit_rate < 1 {
            return Err(InvalidConfig(format!("RATE_LIMIT_RATE must be >= 1, got {}", self.rate_limit_rate)));
        }
        if self.line_tolerance < 0.0 {
            return Err(InvalidConfig(format!("LINE_TOLERANCE must be >= 0, got {}", self.line_tolerance)));
        }
        match role {
            NodeRole::Validator => {
                if self.sports_api_key.is_empty() {
                    if self.is_production() {
                        return Err(InvalidConfig(
                            "SPORTS_API_KEY must be set in production, outcome resolution requires it".to_string(),
                        ));
                    }
                    warnings.push("SPORTS_API_KEY not set, outcome resolution will fail".to_string());
                }
            }
            NodeRole::Miner => {
                if self.odds_api_key.is_empty() {
                    if self.is_production() {
                        return Err(InvalidConfig(
                            "ODDS_API_KEY must be set in production, line checking requires it".to_string(),
                        ));
                    }
                    warnings.push("ODDS_API_KEY not set, every line will report unavailable".to_string());
                }
            }
        }
        if !KNOWN_NETWORKS.contains(&self.bt_network.as_str()) {
            warnings.push(format!(
                "BT_NETWORK={:?} is not a recognized network ({})",
                self.bt_network,
                KNOWN_NETWORKS.join(", ")
            ));
        }
        Ok(warnings)
    }
}

/// The configuration failed startup validation.
#[derive(Debug, thiserror::Error)]
#[error("invalid configuration: {0}")]
pub struct InvalidConfig(String);
