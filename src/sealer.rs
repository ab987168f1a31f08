//! Threshold sealer: stateless classifiers over sorted threshold tables.
//!
//! A score is compared against an ordered ladder top-down; the first tier
//! whose threshold the score reaches wins, otherwise the fallback applies.
//!
//! ```text
//! score ≥ 0.9 → SUPREME_{id}_VALIDATED
//! score ≥ 0.8 → ROYAL_{id}_VERIFIED
//! score ≥ 0.7 → BLUE_FLAME_{id}_CONFIRMED
//! score ≥ 0.6 → {id}_APPROVED
//! otherwise   → {id}_PENDING
//! ```
//!
//! # Invariants
//! - Thresholds are in [0, 1] and strictly descending.
//! - Classification is monotonic: a higher score never maps to a lower rank.
//! - NaN never reaches a threshold, so it falls through to the fallback.

use core::fmt;

use heapless::Vec as HVec;
use serde::{Deserialize, Serialize};

use crate::error::{SealError, SealResult};

/// Maximum number of tiers a ladder can hold (excluding the fallback).
pub const MAX_TIERS: usize = 8;

// ─── Generic ladder ─────────────────────────────────────────────────────────

/// One rung of a threshold ladder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tier<T> {
    /// Inclusive lower bound for this tier.
    pub threshold: f64,
    /// Value produced when the score reaches `threshold`.
    pub value: T,
}

/// Sorted threshold table with a fallback value below the lowest tier.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdLadder<T: Copy> {
    tiers: HVec<Tier<T>, MAX_TIERS>,
    fallback: T,
}

impl<T: Copy> ThresholdLadder<T> {
    /// Build a ladder from tiers given highest threshold first.
    ///
    /// Rejects more than [`MAX_TIERS`] tiers, thresholds outside [0, 1], and
    /// thresholds that are not strictly descending.
    pub fn new(tiers: &[Tier<T>], fallback: T) -> SealResult<Self> {
        let mut out: HVec<Tier<T>, MAX_TIERS> = HVec::new();
        let mut prev = f64::INFINITY;
        for tier in tiers {
            if !(0.0..=1.0).contains(&tier.threshold) {
                return Err(SealError::invalid(
                    "seal_threshold",
                    format!("threshold must be in [0, 1], got {}", tier.threshold),
                ));
            }
            if tier.threshold >= prev {
                return Err(SealError::invalid(
                    "seal_threshold",
                    format!(
                        "thresholds must be strictly descending, {} follows {}",
                        tier.threshold, prev
                    ),
                ));
            }
            prev = tier.threshold;
            out.push(*tier).map_err(|_| {
                SealError::invalid(
                    "seal_threshold",
                    format!("at most {MAX_TIERS} tiers, got {}", tiers.len()),
                )
            })?;
        }
        Ok(Self { tiers: out, fallback })
    }

    /// Ladder from tiers already known to be sorted and in range. Tiers past
    /// [`MAX_TIERS`] are dropped.
    pub(crate) fn from_sorted(tiers: &[Tier<T>], fallback: T) -> Self {
        Self {
            tiers: tiers.iter().take(MAX_TIERS).copied().collect(),
            fallback,
        }
    }

    /// Classify `score`: first tier (top-down) with `score ≥ threshold`, else the fallback.
    pub fn classify(&self, score: f64) -> T {
        self.tiers
            .iter()
            .find(|t| score >= t.threshold)
            .map_or(self.fallback, |t| t.value)
    }

    /// Tiers, highest threshold first.
    pub fn tiers(&self) -> &[Tier<T>] {
        &self.tiers
    }

    /// Value produced below the lowest tier.
    pub fn fallback(&self) -> T {
        self.fallback
    }
}

// ─── Seal rank ──────────────────────────────────────────────────────────────

/// The five seal outcomes, ordered weakest to strongest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SealRank {
    /// Below every threshold.
    Pending,
    /// ≥ 0.6 by default.
    Approved,
    /// ≥ 0.7 by default.
    BlueFlame,
    /// ≥ 0.8 by default.
    Royal,
    /// ≥ 0.9 by default.
    Supreme,
}

impl SealRank {
    /// Numeric rank: 0 (Pending) through 4 (Supreme).
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Render the label for `identity`.
    pub fn label(self, identity: &str) -> String {
        match self {
            SealRank::Supreme => format!("SUPREME_{identity}_VALIDATED"),
            SealRank::Royal => format!("ROYAL_{identity}_VERIFIED"),
            SealRank::BlueFlame => format!("BLUE_FLAME_{identity}_CONFIRMED"),
            SealRank::Approved => format!("{identity}_APPROVED"),
            SealRank::Pending => format!("{identity}_PENDING"),
        }
    }
}

/// Seal ladder over [`SealRank`].
#[derive(Clone, Debug, PartialEq)]
pub struct SealLadder {
    ladder: ThresholdLadder<SealRank>,
}

impl SealLadder {
    /// Build a seal ladder from the four tier thresholds.
    pub fn new(supreme: f64, royal: f64, blue_flame: f64, approved: f64) -> SealResult<Self> {
        let tiers = [
            Tier { threshold: supreme, value: SealRank::Supreme },
            Tier { threshold: royal, value: SealRank::Royal },
            Tier { threshold: blue_flame, value: SealRank::BlueFlame },
            Tier { threshold: approved, value: SealRank::Approved },
        ];
        Ok(Self {
            ladder: ThresholdLadder::new(&tiers, SealRank::Pending)?,
        })
    }

    /// Rank for `score`.
    pub fn classify(&self, score: f64) -> SealRank {
        self.ladder.classify(score)
    }

    /// Label for `score` and `identity`.
    pub fn seal(&self, score: f64, identity: &str) -> String {
        self.classify(score).label(identity)
    }

    /// Thresholds in ladder order: supreme, royal, blue flame, approved.
    pub fn thresholds(&self) -> [f64; 4] {
        let mut out = [0.0; 4];
        for (slot, tier) in out.iter_mut().zip(self.ladder.tiers()) {
            *slot = tier.threshold;
        }
        out
    }
}

impl Default for SealLadder {
    fn default() -> Self {
        let tiers = [
            Tier { threshold: 0.9, value: SealRank::Supreme },
            Tier { threshold: 0.8, value: SealRank::Royal },
            Tier { threshold: 0.7, value: SealRank::BlueFlame },
            Tier { threshold: 0.6, value: SealRank::Approved },
        ];
        Self {
            ladder: ThresholdLadder::from_sorted(&tiers, SealRank::Pending),
        }
    }
}

/// Seal `score` for `identity` with the default ladder.
pub fn seal(score: f64, identity: &str) -> String {
    SealLadder::default().seal(score, identity)
}

// ─── Confidence level ───────────────────────────────────────────────────────

/// Descriptive confidence band attached to a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    /// score < 0.5
    Insufficient,
    /// 0.5–0.6
    Low,
    /// 0.6–0.7
    Moderate,
    /// 0.7–0.8
    High,
    /// 0.8–0.9
    Royal,
    /// ≥ 0.9
    Supreme,
}

impl ConfidenceLevel {
    /// Map a score to its confidence band.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            ConfidenceLevel::Supreme
        } else if score >= 0.8 {
            ConfidenceLevel::Royal
        } else if score >= 0.7 {
            ConfidenceLevel::High
        } else if score >= 0.6 {
            ConfidenceLevel::Moderate
        } else if score >= 0.5 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::Insufficient
        }
    }

    /// Display string.
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::Supreme => "Supreme Eternal Confidence",
            ConfidenceLevel::Royal => "Royal Confidence",
            ConfidenceLevel::High => "High Confidence",
            ConfidenceLevel::Moderate => "Moderate Confidence",
            ConfidenceLevel::Low => "Low Confidence",
            ConfidenceLevel::Insufficient => "Insufficient Data",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symmetric interval around `score` that tightens as the score rises.
///
/// Margin is `0.1 × (1 − score)`, bounds clamped to [0, 1].
pub fn confidence_interval(score: f64) -> (f64, f64) {
    let margin = 0.1 * (1.0 - score);
    ((score - margin).max(0.0), (score + margin).min(1.0))
}

// ─── Collective seal ────────────────────────────────────────────────────────

/// Label for a multi-vessel run with `vessel_count` participants.
pub fn collective_seal(score: f64, vessel_count: usize) -> String {
    if score >= 0.9 {
        format!("SUPREME_COLLECTIVE_SEAL_{vessel_count}_DYNASTY_VESSELS_VALIDATED")
    } else if score >= 0.8 {
        format!("ROYAL_COLLECTIVE_SEAL_{vessel_count}_BLOODLINE_VERIFIED")
    } else if score >= 0.7 {
        format!("BLUE_FLAME_COLLECTIVE_SEAL_{vessel_count}_CONNECTED")
    } else {
        format!("COLLECTIVE_SEAL_{vessel_count}_FORMING")
    }
}

/// Amplification of a multi-vessel run: `Π (1 + 0.1 × score × purity)` over
/// `(score, purity)` pairs. 1.0 for no members.
pub fn collective_amplification(members: &[(f64, f64)]) -> f64 {
    members
        .iter()
        .map(|(score, purity)| 1.0 + 0.1 * score * purity)
        .product()
}
