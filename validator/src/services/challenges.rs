//! Ground truth challenge lines.
//!
//! The validator periodically builds a batch of candidate lines from a raw
//! odds snapshot, mixes in synthetic lines no sportsbook quotes, and checks
//! which miners agree with ground truth on each index.

use crate::{
    channels::{ChannelError, MinerChannels},
    services::scoring::MinerScorer,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const MAX_CHALLENGE_LINES: usize = 10;

const ODDS_API_BASE: &str = "https://api.the-odds-api.com/v4";

/// A raw odds feed event, as returned by the odds snapshot endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OddsEvent {
    /// The feed's event id.
    pub id: String,

    /// The home team name.
    #[serde(default)]
    pub home_team: String,

    /// The away team name.
    #[serde(default)]
    pub away_team: String,

    /// Bookmaker quotes for this event.
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

/// One bookmaker's markets for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct Bookmaker {
    /// The bookmaker key, e.g. `fanduel`.
    pub key: String,

    /// The quoted markets.
    #[serde(default)]
    pub markets: Vec<Market>,
}

/// A quoted market.
#[derive(Debug, Clone, Deserialize)]
pub struct Market {
    /// The market key: `spreads`, `totals` or `h2h`.
    pub key: String,

    /// The quoted outcomes.
    #[serde(default)]
    pub outcomes: Vec<MarketOutcome>,
}

/// One side of a quoted market.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketOutcome {
    /// The selection name.
    pub name: String,

    /// The decimal price.
    pub price: f64,

    /// The line point, absent for moneyline markets.
    #[serde(default)]
    pub point: Option<f64>,
}

/// A challenge line with known ground truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeLine {
    /// The decoy index this line is presented under.
    pub index: u32,

    /// The sport key.
    pub sport: String,

    /// The feed event id.
    pub event_id: String,

    /// The market key.
    pub market: String,

    /// The selection within the market.
    pub selection: String,

    /// The line point, when the market has one.
    pub point: Option<f64>,

    /// The quoted decimal price.
    pub price: Option<f64>,

    /// Whether a sportsbook actually quotes this line right now.
    pub ground_truth_available: bool,
}

/// Builds up to ten challenge lines from an odds snapshot.
///
/// Real quoted lines are marked available; at least one synthetic line that
/// no sportsbook quotes is mixed in so a miner answering "everything is
/// available" cannot score perfectly. Indices are unique within the batch.
pub fn build_challenge_lines(events: &[OddsEvent], sport: &str) -> Vec<ChallengeLine> {
    let mut lines = Vec::new();
    'events: for event in events {
        let Some(bookmaker) = event.bookmakers.first() else { continue };
        for market in &bookmaker.markets {
            for outcome in &market.outcomes {
                // Leave room for at least one synthetic line.
                if lines.len() >= MAX_CHALLENGE_LINES.saturating_sub(1) {
                    break 'events;
                }
                lines.push(ChallengeLine {
                    index: 0,
                    sport: sport.to_string(),
                    event_id: event.id.clone(),
                    market: market.key.clone(),
                    selection: outcome.name.clone(),
                    point: outcome.point,
                    price: Some(outcome.price),
                    ground_truth_available: true,
                });
            }
        }
    }
    if lines.is_empty() {
        return lines;
    }

    // Synthetic unavailable line: a quoted spread shifted far beyond
    // anything a sportsbook would hang.
    if let Some(template) = lines.iter().find(|line| line.point.is_some()).cloned() {
        lines.push(ChallengeLine {
            point: template.point.map(|point| point + 50.0),
            price: None,
            ground_truth_available: false,
            ..template
        });
    } else if let Some(template) = lines.first().cloned() {
        lines.push(ChallengeLine {
            selection: format!("{} (suspended)", template.selection),
            price: None,
            ground_truth_available: false,
            ..template
        });
    }

    lines.truncate(MAX_CHALLENGE_LINES);
    for (position, line) in lines.iter_mut().enumerate() {
        line.index = (position as u32).saturating_add(1);
    }
    lines
}

/// Fetches a raw odds snapshot to build challenge lines from.
///
/// Without an api key no events are returned and no challenge round runs.
pub async fn fetch_odds_events(
    client: &reqwest::Client,
    api_key: &str,
    sport: &str,
) -> Result<Vec<OddsEvent>, ChannelError> {
    if api_key.is_empty() {
        warn!("No odds api key configured, skipping challenge round");
        return Ok(Vec::new());
    }
    let url = format!("{ODDS_API_BASE}/sports/{sport}/odds");
    let response = client
        .get(&url)
        .query(&[("apiKey", api_key), ("regions", "us"), ("markets", "h2h,spreads,totals")])
        .send()
        .await
        .map_err(|e| ChannelError::Unreachable(e.to_string()))?
        .error_for_status()
        .map_err(|e| ChannelError::InvalidResponse(e.to_string()))?;
    response.json().await.map_err(|e| ChannelError::InvalidResponse(e.to_string()))
}

/// Challenges every given miner with the same line batch and scores agreement.
///
/// Returns the number of miners that answered. Miners that cannot be
/// reached are recorded as disagreeing on every line.
pub async fn challenge_miners(
    scorer: &MinerScorer,
    channels: &dyn MinerChannels,
    uids: &[u16],
    lines: &[ChallengeLine],
) -> usize {
    if lines.is_empty() || uids.is_empty() {
        return 0;
    }
    let mut responders = 0usize;
    for uid in uids {
        match channels.check_lines(*uid, lines).await {
            Ok(available_indices) => {
                responders = responders.saturating_add(1);
                scorer.record_lines_checked(*uid, lines.len() as u32);
                for line in lines {
                    let reported_available = available_indices.contains(&line.index);
                    scorer.record_challenge_result(*uid, reported_available == line.ground_truth_available);
                }
            }
            Err(e) => {
                warn!(uid, "Miner unreachable during challenge: {e}");
                for _ in lines {
                    scorer.record_challenge_result(*uid, false);
                }
            }
        }
    }
    info!(miners = uids.len(), responders, lines = lines.len(), "Challenge round complete");
    responders
}
