//! Outcome attestation.
//!
//! Each validator independently queries the scores feed for completed
//! events, records its attestation, and outcomes only finalize once a 2/3+
//! quorum of validators concurs.

use basic_types::ValidatorId;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::Duration,
};
use tracing::{error, info, warn};

const SCORES_API_BASE: &str = "https://api.the-odds-api.com/v4";

/// The number of concordant votes required, out of `total_validators`.
pub fn quorum_threshold(total_validators: usize) -> usize {
    // floor(total * 2/3) + 1; a strict majority beyond two thirds.
    total_validators.saturating_mul(2).checked_div(3).unwrap_or(0).saturating_add(1)
}

/// A signal outcome, matching the on-chain enum encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Outcome {
    /// The event has not resolved yet.
    Pending = 0,

    /// The signal's line hit.
    Favorable = 1,

    /// The signal's line missed.
    Unfavorable = 2,

    /// The event was cancelled or the signal otherwise voided.
    Void = 3,
}

impl Outcome {
    /// The on-chain integer code for this outcome.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for Outcome {
    type Error = OutcomeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Outcome::Pending),
            1 => Ok(Outcome::Favorable),
            2 => Ok(Outcome::Unfavorable),
            3 => Ok(Outcome::Void),
            _ => Err(OutcomeError::NoData),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Outcome::Pending => "PENDING",
            Outcome::Favorable => "FAVORABLE",
            Outcome::Unfavorable => "UNFAVORABLE",
            Outcome::Void => "VOID",
        };
        write!(f, "{name}")
    }
}

/// The resolution status of a sporting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// Not completed yet.
    Pending,

    /// Completed with final scores.
    Final,

    /// Postponed by the league.
    Postponed,

    /// Cancelled outright.
    Cancelled,

    /// The scores feed could not be reached; retry next epoch.
    Error,
}

/// Result of a sporting event relevant to a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct EventResult {
    /// The feed's event id.
    pub event_id: String,

    /// Home team score, present iff the event is final.
    pub home_score: Option<u32>,

    /// Away team score, present iff the event is final.
    pub away_score: Option<u32>,

    /// The resolution status.
    pub status: EventStatus,

    /// The raw feed payload, kept for auditing.
    pub raw_data: serde_json::Value,
}

impl EventResult {
    fn pending(event_id: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            home_score: None,
            away_score: None,
            status: EventStatus::Pending,
            raw_data: serde_json::Value::Null,
        }
    }

    fn transport_error(event_id: &str) -> Self {
        Self { status: EventStatus::Error, ..Self::pending(event_id) }
    }
}

/// A validator's attestation of a signal's outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeAttestation {
    /// The signal being attested.
    pub signal_id: String,

    /// The attesting validator.
    pub validator_hotkey: ValidatorId,

    /// The attested outcome.
    pub outcome: Outcome,

    /// The event result backing the attestation.
    pub event_result: EventResult,

    /// When the attestation was recorded.
    pub timestamp: DateTime<Utc>,
}

/// An error while resolving an outcome.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum OutcomeError {
    /// The scores feed could not be reached; transient, retry next epoch.
    #[error("scores feed unreachable")]
    TransportFailure,

    /// The feed has no data for the event.
    #[error("no data for event")]
    NoData,

    /// All validators voted but no outcome reached quorum.
    #[error("attestations are ambiguous")]
    Ambiguous,
}

#[derive(Deserialize)]
struct ScoredEvent {
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    home_team: Option<String>,
    #[serde(default)]
    away_team: Option<String>,
    #[serde(default)]
    scores: Option<Vec<ScoreEntry>>,
}

#[derive(Deserialize)]
struct ScoreEntry {
    name: String,
    score: String,
}

/// Manages outcome attestation and consensus building.
pub struct OutcomeAttestor {
    api_key: String,
    client: reqwest::Client,
    attestations: Mutex<HashMap<String, Vec<OutcomeAttestation>>>,
}

impl OutcomeAttestor {
    /// Constructs an attestor using the given scores feed key.
    pub fn new(sports_api_key: String, http_timeout: Duration) -> Self {
        let client = reqwest::Client::builder().timeout(http_timeout).build().unwrap_or_default();
        Self { api_key: sports_api_key, client, attestations: Mutex::default() }
    }

    /// Fetches an event result from the scores feed.
    ///
    /// Transport failures surface as `status = Error` and are retried at the
    /// next epoch rather than bubbling up.
    pub async fn fetch_event_result(&self, event_id: &str, sport: &str) -> EventResult {
        if self.api_key.is_empty() {
            warn!(event_id, "No sports api key configured");
            return EventResult::pending(event_id);
        }
        match self.request_scores(event_id, sport).await {
            Ok(Some(event)) => Self::build_event_result(event_id, event),
            Ok(None) => EventResult::pending(event_id),
            Err(e) => {
                error!(event_id, "Scores feed error: {e}");
                EventResult::transport_error(event_id)
            }
        }
    }

    async fn request_scores(&self, event_id: &str, sport: &str) -> Result<Option<serde_json::Value>, OutcomeError> {
        let url = format!("{SCORES_API_BASE}/sports/{sport}/scores");
        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str()), ("eventIds", event_id)])
            .send()
            .await
            .map_err(|_| OutcomeError::TransportFailure)?
            .error_for_status()
            .map_err(|_| OutcomeError::TransportFailure)?;
        let mut events: Vec<serde_json::Value> =
            response.json().await.map_err(|_| OutcomeError::TransportFailure)?;
        if events.is_empty() {
            return Ok(None);
        }
        Ok(Some(events.swap_remove(0)))
    }

    fn build_event_result(event_id: &str, raw: serde_json::Value) -> EventResult {
        let event: ScoredEvent = match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(e) => {
                error!(event_id, "Malformed scores payload: {e}");
                return EventResult::transport_error(event_id);
            }
        };
        if !event.completed {
            return EventResult { raw_data: raw, ..EventResult::pending(event_id) };
        }

        let mut home_score = None;
        let mut away_score = None;
        for entry in event.scores.unwrap_or_default() {
            let score = entry.score.parse::<u32>().ok();
            if Some(&entry.name) == event.home_team.as_ref() {
                home_score = score;
            } else if Some(&entry.name) == event.away_team.as_ref() {
                away_score = score;
            }
        }
        EventResult { event_id: event_id.to_string(), home_score, away_score, status: EventStatus::Final, raw_data: raw }
    }

    /// Records this validator's outcome attestation.
    ///
    /// First write wins per `(signal_id, validator_hotkey)`: a validator
    /// cannot stuff votes by attesting twice.
    pub fn attest(
        &self,
        signal_id: &str,
        validator_hotkey: ValidatorId,
        outcome: Outcome,
        event_result: EventResult,
    ) -> OutcomeAttestation {
        let mut attestations = self.attestations.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = attestations.entry(signal_id.to_string()).or_default();
        if let Some(existing) = entries.iter().find(|a| a.validator_hotkey == validator_hotkey) {
            warn!(signal_id, hotkey = %validator_hotkey, "Ignoring repeat attestation");
            return existing.clone();
        }
        let attestation = OutcomeAttestation {
            signal_id: signal_id.to_string(),
            validator_hotkey,
            outcome,
            event_result,
            timestamp: Utc::now(),
        };
        entries.push(attestation.clone());
        info!(signal_id, outcome = %outcome, "Outcome attested");
        attestation
    }

    /// The recorded attestations for a signal.
    pub fn attestations(&self, signal_id: &str) -> Vec<OutcomeAttestation> {
        self.attestations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(signal_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Checks whether 2/3+ consensus has been reached for a signal.
    ///
    /// Returns the consensus outcome, or `None` if no outcome has reached
    /// the threshold yet. Once some outcome reaches it, additional
    /// attestations cannot flip the decision while the validator set does
    /// not shrink: each validator votes at most once, so no other outcome
    /// can also clear a strict 2/3 majority.
    pub fn check_consensus(&self, signal_id: &str, total_validators: usize) -> Option<Outcome> {
        let attestations = self.attestations.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = attestations.get(signal_id)?;
        if entries.is_empty() {
            return None;
        }
        let threshold = quorum_threshold(total_validators);

        let mut votes: HashMap<Outcome, usize> = HashMap::new();
        for attestation in entries {
            let count = votes.entry(attestation.outcome).or_insert(0);
            *count = count.saturating_add(1);
        }
        for (outcome, count) in votes {
            if count >= threshold {
                info!(signal_id, outcome = %outcome, votes = count, threshold, "Consensus reached");
                return Some(outcome);
            }
        }
        None
    }

    /// Finalizes a signal's outcome once every validator has voted.
    ///
    /// Returns `Ambiguous` when the full validator set voted without any
    /// outcome reaching quorum; the signal then stays pending.
    pub fn try_finalize(&self, signal_id: &str, total_validators: usize) -> Result<Outcome, OutcomeError> {
        if let Some(outcome) = self.check_consensus(signal_id, total_validators) {
            return Ok(outcome);
        }
        let recorded = self
            .attestations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(signal_id)
            .map(Vec::len)
            .unwrap_or(0);
        if recorded >= total_validators {
            return Err(OutcomeError::Ambiguous);
        }
        Err(OutcomeError::NoData)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn make_attestor() -> OutcomeAttestor {
        OutcomeAttestor::new(String::new(), Duration::from_secs(5))
    }

    fn final_result(event_id: &str) -> EventResult {
        EventResult {
            event_id: event_id.to_string(),
            home_score: Some(101),
            away_score: Some(99),
            status: EventStatus::Final,
            raw_data: serde_json::Value::Null,
        }
    }

    fn attest_many(attestor: &OutcomeAttestor, signal_id: &str, outcome: Outcome, range: std::ops::Range<u32>) {
        for i in range {
            attestor.attest(signal_id, ValidatorId::from(format!("5Key{i:02}")), outcome, final_result("evt"));
        }
    }

    #[rstest]
    #[case(10, 7)]
    #[case(9, 7)]
    #[case(3, 3)]
    #[case(0, 1)]
    fn quorum_thresholds(#[case] total: usize, #[case] expected: usize) {
        assert_eq!(quorum_threshold(total), expected);
    }

    #[test]
    fn outcome_codes_are_stable() {
        assert_eq!(Outcome::Pending.code(), 0);
        assert_eq!(Outcome::Favorable.code(), 1);
        assert_eq!(Outcome::Unfavorable.code(), 2);
        assert_eq!(Outcome::Void.code(), 3);
        assert_eq!(Outcome::try_from(1).unwrap(), Outcome::Favorable);
        assert!(Outcome::try_from(4).is_err());
    }

    #[test]
    fn consensus_at_seven_of_ten() {
        let attestor = make_attestor();
        attest_many(&attestor, "sig", Outcome::Favorable, 0..7);
        attest_many(&attestor, "sig", Outcome::Unfavorable, 7..10);
        assert_eq!(attestor.check_consensus("sig", 10), Some(Outcome::Favorable));
    }

    #[test]
    fn no_consensus_at_six_of_ten() {
        let attestor = make_attestor();
        attest_many(&attestor, "sig", Outcome::Favorable, 0..6);
        attest_many(&attestor, "sig", Outcome::Unfavorable, 6..10);
        assert_eq!(attestor.check_consensus("sig", 10), None);
    }

    #[test]
    fn no_attestations_no_consensus() {
        let attestor = make_attestor();
        assert_eq!(attestor.check_consensus("sig", 10), None);
    }

    #[test]
    fn repeat_attestations_ignored() {
        let attestor = make_attestor();
        let hotkey = ValidatorId::from("5Stuffer");
        let first = attestor.attest("sig", hotkey.clone(), Outcome::Favorable, final_result("evt"));
        let second = attestor.attest("sig", hotkey, Outcome::Unfavorable, final_result("evt"));
        assert_eq!(second.outcome, first.outcome);
        assert_eq!(attestor.attestations("sig").len(), 1);
    }

    #[test]
    fn vote_stuffing_cannot_reach_quorum() {
        let attestor = make_attestor();
        let hotkey = ValidatorId::from("5Stuffer");
        for _ in 0..10 {
            attestor.attest("sig", hotkey.clone(), Outcome::Favorable, final_result("evt"));
        }
        assert_eq!(attestor.check_consensus("sig", 10), None);
    }

    #[test]
    fn consensus_is_monotone_under_more_votes() {
        let attestor = make_attestor();
        attest_many(&attestor, "sig", Outcome::Favorable, 0..7);
        assert_eq!(attestor.check_consensus("sig", 10), Some(Outcome::Favorable));
        attest_many(&attestor, "sig", Outcome::Unfavorable, 7..10);
        assert_eq!(attestor.check_consensus("sig", 10), Some(Outcome::Favorable));
    }

    #[test]
    fn finalize_reports_ambiguity() {
        let attestor = make_attestor();
        attest_many(&attestor, "sig", Outcome::Favorable, 0..5);
        attest_many(&attestor, "sig", Outcome::Unfavorable, 5..10);
        assert_eq!(attestor.try_finalize("sig", 10), Err(OutcomeError::Ambiguous));
    }

    #[test]
    fn finalize_waits_for_missing_votes() {
        let attestor = make_attestor();
        attest_many(&attestor, "sig", Outcome::Favorable, 0..5);
        assert_eq!(attestor.try_finalize("sig", 10), Err(OutcomeError::NoData));
    }

    #[test]
    fn finalize_returns_consensus() {
        let attestor = make_attestor();
        attest_many(&attestor, "sig", Outcome::Void, 0..8);
        assert_eq!(attestor.try_finalize("sig", 10), Ok(Outcome::Void));
    }

    #[test]
    fn completed_event_parses_scores() {
        let raw = serde_json::json!({
            "id": "evt",
            "completed": true,
            "home_team": "Lakers",
            "away_team": "Celtics",
            "scores": [
                {"name": "Lakers", "score": "110"},
                {"name": "Celtics", "score": "104"}
            ]
        });
        let result = OutcomeAttestor::build_event_result("evt", raw);
        assert_eq!(result.status, EventStatus::Final);
        assert_eq!(result.home_score, Some(110));
        assert_eq!(result.away_score, Some(104));
    }

    #[test]
    fn incomplete_event_stays_pending() {
        let raw = serde_json::json!({"id": "evt", "completed": false});
        let result = OutcomeAttestor::build_event_result("evt", raw);
        assert_eq!(result.status, EventStatus::Pending);
        assert_eq!(result.home_score, None);
    }

    #[tokio::test]
    async fn missing_api_key_yields_pending() {
        let attestor = make_attestor();
        let result = attestor.fetch_event_result("evt", "basketball_nba").await;
        assert_eq!(result.status, EventStatus::Pending);
    }
}
