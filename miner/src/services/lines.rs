//! Line availability checking.
//!
//! A validator submits up to ten candidate lines; the miner answers which of
//! them some sportsbook currently quotes. The odds snapshot itself comes
//! from a provider behind a trait, so the availability predicate stays
//! testable without a live feed.

use async_trait::async_trait;
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};
use tracing::warn;

const ODDS_API_BASE: &str = "https://api.the-odds-api.com/v4";

/// A candidate line submitted by a validator.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateLine {
    /// The decoy index the line is presented under.
    pub index: u32,

    /// The sport key.
    pub sport: String,

    /// The feed event id.
    pub event_id: String,

    /// The market key: `spreads`, `totals` or `h2h`.
    pub market: String,

    /// The selection within the market.
    pub selection: String,

    /// The line point, absent for moneyline markets.
    #[serde(default)]
    pub point: Option<f64>,
}

/// One line's availability verdict.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LineResult {
    /// The candidate's index.
    pub index: u32,

    /// Whether a sportsbook quotes the line right now.
    pub available: bool,
}

/// A currently quoted line, flattened from the odds snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotedLine {
    /// The feed event id.
    pub event_id: String,

    /// The market key.
    pub market: String,

    /// The selection name.
    pub selection: String,

    /// The quoted point, when the market has one.
    pub point: Option<f64>,
}

/// An error fetching the odds snapshot.
#[derive(Debug, thiserror::Error)]
#[error("odds snapshot unavailable: {0}")]
pub struct ProviderError(pub String);

/// Source of currently quoted lines for a sport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OddsProvider: Send + Sync + 'static {
    /// Every line currently quoted for the sport.
    async fn quoted_lines(&self, sport: &str) -> Result<Vec<QuotedLine>, ProviderError>;
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(default)]
    bookmakers: Vec<RawBookmaker>,
}

#[derive(Deserialize)]
struct RawBookmaker {
    #[serde(default)]
    markets: Vec<RawMarket>,
}

#[derive(Deserialize)]
struct RawMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<RawOutcome>,
}

#[derive(Deserialize)]
struct RawOutcome {
    name: String,
    #[serde(default)]
    point: Option<f64>,
}

/// Provider backed by the odds snapshot API.
pub struct OddsApiProvider {
    client: reqwest::Client,
    api_key: String,
}

impl OddsApiProvider {
    /// Constructs a provider with the given key.
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl OddsProvider for OddsApiProvider {
    async fn quoted_lines(&self, sport: &str) -> Result<Vec<QuotedLine>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError("no odds api key configured".to_string()));
        }
        let url = format!("{ODDS_API_BASE}/sports/{sport}/odds");
        let events: Vec<RawEvent> = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str()), ("regions", "us"), ("markets", "h2h,spreads,totals")])
            .send()
            .await
            .map_err(|e| ProviderError(e.to_string()))?
            .error_for_status()
            .map_err(|e| ProviderError(e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError(e.to_string()))?;

        let mut quoted = Vec::new();
        for event in events {
            for bookmaker in event.bookmakers {
                for market in bookmaker.markets {
                    for outcome in market.outcomes {
                        quoted.push(QuotedLine {
                            event_id: event.id.clone(),
                            market: market.key.clone(),
                            selection: outcome.name,
                            point: outcome.point,
                        });
                    }
                }
            }
        }
        Ok(quoted)
    }
}

/// A provider that caches snapshots for a configurable freshness window.
///
/// Validators probe in bursts; one upstream fetch per sport per window keeps
/// the miner inside the odds feed's quota.
pub struct CachingOddsProvider {
    inner: Arc<dyn OddsProvider>,
    ttl: Duration,
    snapshots: Mutex<HashMap<String, (Instant, Vec<QuotedLine>)>>,
}

impl CachingOddsProvider {
    /// Wraps a provider with the given freshness window.
    pub fn new(inner: Arc<dyn OddsProvider>, ttl: Duration) -> Self {
        Self { inner, ttl, snapshots: Mutex::default() }
    }
}

#[async_trait]
impl OddsProvider for CachingOddsProvider {
    async fn quoted_lines(&self, sport: &str) -> Result<Vec<QuotedLine>, ProviderError> {
        {
            let snapshots = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((fetched_at, quoted)) = snapshots.get(sport) {
                if fetched_at.elapsed() < self.ttl {
                    return Ok(quoted.clone());
                }
            }
        }
        let quoted = self.inner.quoted_lines(sport).await?;
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sport.to_string(), (Instant::now(), quoted.clone()));
        Ok(quoted)
    }
}

/// Checks candidate lines against the current odds snapshot.
pub struct LineChecker {
    provider: Arc<dyn OddsProvider>,
    tolerance: f64,
}

impl LineChecker {
    /// Constructs a checker with the given point tolerance.
    pub fn new(provider: Arc<dyn OddsProvider>, tolerance: f64) -> Self {
        Self { provider, tolerance }
    }

    /// Decides availability for each candidate.
    ///
    /// A candidate is available when some quoted line matches its event,
    /// market and selection, with the quoted point within tolerance. A
    /// failed snapshot fetch marks every line unavailable; lying about
    /// availability is what challenge lines catch, refusing to answer is
    /// merely slow.
    pub async fn check(&self, lines: &[CandidateLine]) -> Vec<LineResult> {
        let sport = match lines.first() {
            Some(line) => line.sport.clone(),
            None => return Vec::new(),
        };
        let quoted = match self.provider.quoted_lines(&sport).await {
            Ok(quoted) => quoted,
            Err(e) => {
                warn!("Odds snapshot fetch failed: {e}");
                return lines.iter().map(|line| LineResult { index: line.index, available: false }).collect();
            }
        };
        lines
            .iter()
            .map(|line| LineResult { index: line.index, available: self.is_quoted(line, &quoted) })
            .collect()
    }

    fn is_quoted(&self, candidate: &CandidateLine, quoted: &[QuotedLine]) -> bool {
        quoted.iter().any(|line| {
            line.event_id == candidate.event_id
                && line.market == candidate.market
                && line.selection == candidate.selection
                && match (candidate.point, line.point) {
                    (None, None) => true,
                    (Some(want), Some(have)) => (want - have).abs() <= self.tolerance,
                    _ => false,
                }
        })
    }
}
