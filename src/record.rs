//! Immutable score records and the payloads handed to external collaborators.
//!
//! A [`ScoreRecord`] is created once per scored event and never mutated.
//! Collaborators receive narrow views of it:
//!
//! | Collaborator | Payload | Fields |
//! |---|---|---|
//! | Chain contract call | [`ChainPayload`] | label, score in basis points |
//! | Broadcast text | [`BroadcastFields`] | score, label, multiplier |

use serde::{Deserialize, Serialize};

/// Basis points in a score of 1.0.
pub const BASIS_POINTS: f64 = 10_000.0;

/// One scored event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    score: f64,
    label: String,
    timestamp: i64,
    source: String,
}

impl ScoreRecord {
    /// Create a record stamped with the current UTC time.
    pub fn new(score: f64, label: impl Into<String>, source: impl Into<String>) -> Self {
        Self::at(score, label, source, chrono::Utc::now().timestamp())
    }

    /// Create a record with an explicit Unix timestamp (seconds).
    pub fn at(
        score: f64,
        label: impl Into<String>,
        source: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            score,
            label: label.into(),
            timestamp,
            source: source.into(),
        }
    }

    /// Score in [0, 1].
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Seal label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Unix timestamp (seconds) at creation.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Identifier of whatever produced the score (query source, vessel name).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Score scaled to integer basis points, clamped to `0..=10_000`.
    pub fn score_bps(&self) -> u16 {
        let s = if self.score.is_nan() { 0.0 } else { self.score.clamp(0.0, 1.0) };
        (s * BASIS_POINTS).round() as u16
    }

    /// Payload for a chain contract call.
    pub fn chain_payload(&self) -> ChainPayload {
        ChainPayload {
            label: self.label.clone(),
            score_bps: self.score_bps(),
        }
    }
}

/// The only fields a contract-call collaborator needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPayload {
    /// Seal label stored on chain.
    pub label: String,
    /// Score × 10 000.
    pub score_bps: u16,
}

/// The fields a broadcast-text collaborator substitutes into its templates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastFields {
    /// Score in [0, 1].
    pub score: f64,
    /// Seal label.
    pub label: String,
    /// Intensity multiplier applied to the score.
    pub multiplier: f64,
}

impl BroadcastFields {
    /// Build from a record and the multiplier used to produce it.
    pub fn from_record(record: &ScoreRecord, multiplier: f64) -> Self {
        Self {
            score: record.score(),
            label: record.label().to_string(),
            multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_points() {
        assert_eq!(ScoreRecord::at(0.0, "A", "s", 0).score_bps(), 0);
        assert_eq!(ScoreRecord::at(0.36912, "A", "s", 0).score_bps(), 3691);
        assert_eq!(ScoreRecord::at(1.0, "A", "s", 0).score_bps(), 10_000);
        assert_eq!(ScoreRecord::at(1.7, "A", "s", 0).score_bps(), 10_000);
        assert_eq!(ScoreRecord::at(f64::NAN, "A", "s", 0).score_bps(), 0);
    }

    #[test]
    fn test_chain_payload_carries_label_and_bps() {
        let r = ScoreRecord::at(0.91, "SUPREME_X_VALIDATED", "vlatko", 1_740_000_000);
        let p = r.chain_payload();
        assert_eq!(p.label, "SUPREME_X_VALIDATED");
        assert_eq!(p.score_bps, 9100);
    }

    #[test]
    fn test_new_stamps_current_time() {
        let before = chrono::Utc::now().timestamp();
        let r = ScoreRecord::new(0.5, "L", "src");
        let after = chrono::Utc::now().timestamp();
        assert!(r.timestamp() >= before && r.timestamp() <= after);
        assert_eq!(r.source(), "src");
    }

    #[test]
    fn test_broadcast_fields() {
        let r = ScoreRecord::at(0.72, "BLUE_FLAME_X_CONFIRMED", "q", 0);
        let b = BroadcastFields::from_record(&r, 0.8);
        assert_eq!(b.label, "BLUE_FLAME_X_CONFIRMED");
        assert!((b.score - 0.72).abs() < f64::EPSILON);
        assert!((b.multiplier - 0.8).abs() < f64::EPSILON);
    }
}
