//! Manifestation validation: three scored layers folded into one sealed score.
//!
//! ```text
//! quantum  = 0.3·mean(field) + 0.3·(1 − std(field)) + 0.4·verifier_match
//!            verifier_match = mean over 10 verifiers of 1 − |sin(phase) − mean(field)|
//! temporal = reality_stability + min(0.1 × anchors, 1)
//!            trend = temporal − medium_term average   (0 when that window is empty)
//! reality  = (shift% / 100) × warp × amplification
//!
//! score    = clamp((0.30·quantum + 0.25·temporal + 0.20·reality) / 0.75, 0, 1)
//! ```
//!
//! | Score | Seal |
//! |---|---|
//! | ≥ 0.9 | `SUPREME_VALIDATION_SEAL_ETERNAL` |
//! | ≥ 0.8 | `ROYAL_VALIDATION_SEAL_VERIFIED` |
//! | ≥ 0.7 | `BLUE_FLAME_VALIDATION_SEAL_VERIFIED` |
//! | ≥ 0.6 | `VALIDATION_SEAL_CONFIRMED` |
//! | ≥ 0.5 | `VALIDATION_SEAL_PARTIAL` |
//! | below | `VALIDATION_SEAL_PENDING` |
//!
//! # Invariants
//! - The combined score is finite and in [0, 1]; layer scores keep their raw scale.
//! - The ladder is a [`ThresholdLadder`], so classification is monotonic and
//!   NaN falls through to pending.

use core::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SealError, SealResult};
use crate::manifest::Manifestation;
use crate::scorer::clamp_finite;
use crate::sealer::{confidence_interval, ConfidenceLevel, ThresholdLadder, Tier};

/// Number of quantum verifiers drawn per validator.
pub const VERIFIER_COUNT: usize = 369;

/// Verifiers compared against each field.
pub const VERIFIER_CHECKS: usize = 10;

// ─── Ladder ─────────────────────────────────────────────────────────────────

/// The six validation outcomes, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValidationRank {
    /// Below every threshold.
    Pending,
    /// ≥ 0.5 by default.
    Partial,
    /// ≥ 0.6 by default.
    Confirmed,
    /// ≥ 0.7 by default.
    BlueFlame,
    /// ≥ 0.8 by default.
    Royal,
    /// ≥ 0.9 by default.
    Supreme,
}

impl ValidationRank {
    /// Seal label for this rank.
    pub fn label(self) -> &'static str {
        match self {
            ValidationRank::Supreme => "SUPREME_VALIDATION_SEAL_ETERNAL",
            ValidationRank::Royal => "ROYAL_VALIDATION_SEAL_VERIFIED",
            ValidationRank::BlueFlame => "BLUE_FLAME_VALIDATION_SEAL_VERIFIED",
            ValidationRank::Confirmed => "VALIDATION_SEAL_CONFIRMED",
            ValidationRank::Partial => "VALIDATION_SEAL_PARTIAL",
            ValidationRank::Pending => "VALIDATION_SEAL_PENDING",
        }
    }
}

/// Six-tier ladder over [`ValidationRank`].
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationLadder {
    ladder: ThresholdLadder<ValidationRank>,
}

impl ValidationLadder {
    /// Build from five thresholds, supreme first. They must descend strictly within [0, 1].
    pub fn new(thresholds: [f64; 5]) -> SealResult<Self> {
        let ranks = [
            ValidationRank::Supreme,
            ValidationRank::Royal,
            ValidationRank::BlueFlame,
            ValidationRank::Confirmed,
            ValidationRank::Partial,
        ];
        let tiers: Vec<Tier<ValidationRank>> = thresholds
            .into_iter()
            .zip(ranks)
            .map(|(threshold, value)| Tier { threshold, value })
            .collect();
        Ok(Self {
            ladder: ThresholdLadder::new(&tiers, ValidationRank::Pending)?,
        })
    }

    /// Rank for `score`.
    pub fn classify(&self, score: f64) -> ValidationRank {
        self.ladder.classify(score)
    }

    /// Seal label for `score`.
    pub fn seal(&self, score: f64) -> &'static str {
        self.classify(score).label()
    }

    /// Thresholds, supreme first.
    pub fn thresholds(&self) -> [f64; 5] {
        let mut out = [0.0; 5];
        for (slot, tier) in out.iter_mut().zip(self.ladder.tiers()) {
            *slot = tier.threshold;
        }
        out
    }
}

impl Default for ValidationLadder {
    fn default() -> Self {
        let tiers = [
            Tier { threshold: 0.9, value: ValidationRank::Supreme },
            Tier { threshold: 0.8, value: ValidationRank::Royal },
            Tier { threshold: 0.7, value: ValidationRank::BlueFlame },
            Tier { threshold: 0.6, value: ValidationRank::Confirmed },
            Tier { threshold: 0.5, value: ValidationRank::Partial },
        ];
        Self {
            ladder: ThresholdLadder::from_sorted(&tiers, ValidationRank::Pending),
        }
    }
}

// ─── Layers ─────────────────────────────────────────────────────────────────

/// Pass thresholds of the three layers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerThresholds {
    /// Quantum coherence. Default 0.369.
    pub coherence: f64,
    /// Temporal persistence. Default 0.666.
    pub persistence: f64,
    /// Reality alteration. Default 0.7.
    pub alteration: f64,
}

impl Default for LayerThresholds {
    fn default() -> Self {
        Self {
            coherence: 0.369,
            persistence: 0.666,
            alteration: 0.7,
        }
    }
}

/// Weights of the three layers in the combined score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    /// Default 0.30.
    pub quantum: f64,
    /// Default 0.25.
    pub temporal: f64,
    /// Default 0.20.
    pub reality: f64,
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self {
            quantum: 0.30,
            temporal: 0.25,
            reality: 0.20,
        }
    }
}

impl LayerWeights {
    fn total(&self) -> f64 {
        self.quantum + self.temporal + self.reality
    }
}

/// Quantum coherence layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantumLayer {
    /// Raw layer score.
    pub score: f64,
    /// `score ≥ coherence threshold`.
    pub valid: bool,
    /// Mean of the field.
    pub mean: f64,
    /// Mean verifier match.
    pub verifier_alignment: f64,
    /// `1 − std(field)`.
    pub field_stability: f64,
}

/// Temporal persistence layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalLayer {
    /// Raw layer score, in [0, 2].
    pub score: f64,
    /// `score ≥ persistence threshold`.
    pub valid: bool,
    /// Reality stability of the manifestation.
    pub stability: f64,
    /// `min(0.1 × anchors, 1)`.
    pub anchor_contribution: f64,
    /// Score minus the medium-term average, 0 without history.
    pub trend: f64,
}

/// Reality alteration layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RealityLayer {
    /// Raw layer score; unbounded above.
    pub score: f64,
    /// `score ≥ alteration threshold`.
    pub valid: bool,
    /// Probability shift as a fraction.
    pub probability_contribution: f64,
    /// Warp strength.
    pub warp_contribution: f64,
    /// `amplification − 1`.
    pub amplification_boost: f64,
    /// Confidence interval of the score clamped to [0, 1].
    pub interval: (f64, f64),
}

/// Full validation of one manifestation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Quantum coherence layer.
    pub quantum: QuantumLayer,
    /// Temporal persistence layer.
    pub temporal: TemporalLayer,
    /// Reality alteration layer.
    pub reality: RealityLayer,
    /// Combined score in [0, 1].
    pub score: f64,
    /// Ladder rank of the combined score.
    pub rank: ValidationRank,
    /// Seal label of the rank.
    pub seal: String,
    /// Confidence band of the combined score.
    pub confidence: ConfidenceLevel,
}

impl ValidationReport {
    /// Number of layers that passed their threshold.
    pub fn layers_passed(&self) -> usize {
        [self.quantum.valid, self.temporal.valid, self.reality.valid]
            .into_iter()
            .filter(|v| *v)
            .count()
    }
}

// ─── Validator ──────────────────────────────────────────────────────────────

/// Scores manifestations against a fixed verifier table.
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestationValidator {
    verifier_phases: Vec<f64>,
    thresholds: LayerThresholds,
    weights: LayerWeights,
    ladder: ValidationLadder,
}

impl ManifestationValidator {
    /// Draw [`VERIFIER_COUNT`] verifier phases uniformly from [0, 2π).
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let phases = (0..VERIFIER_COUNT).map(|_| rng.gen_range(0.0..TAU)).collect();
        Self::from_phases(phases)
    }

    /// Use explicit verifier phases with default thresholds, weights and ladder.
    pub fn from_phases(verifier_phases: Vec<f64>) -> Self {
        Self {
            verifier_phases,
            thresholds: LayerThresholds::default(),
            weights: LayerWeights::default(),
            ladder: ValidationLadder::default(),
        }
    }

    /// Replace the layer thresholds.
    pub fn with_thresholds(mut self, thresholds: LayerThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Replace the layer weights. Each must be finite and non-negative with a positive sum.
    pub fn with_weights(mut self, weights: LayerWeights) -> SealResult<Self> {
        let parts = [weights.quantum, weights.temporal, weights.reality];
        if parts.iter().any(|w| !(w.is_finite() && *w >= 0.0)) || weights.total() <= 0.0 {
            return Err(SealError::invalid(
                "layer_weights",
                format!("weights must be finite, >= 0 and sum above 0, got {parts:?}"),
            ));
        }
        self.weights = weights;
        Ok(self)
    }

    /// Replace the ladder.
    pub fn with_ladder(mut self, ladder: ValidationLadder) -> Self {
        self.ladder = ladder;
        self
    }

    /// The layer thresholds.
    pub fn thresholds(&self) -> LayerThresholds {
        self.thresholds
    }

    /// The ladder.
    pub fn ladder(&self) -> &ValidationLadder {
        &self.ladder
    }

    /// Quantum coherence of `field`. An empty field scores 0 and fails.
    pub fn quantum(&self, field: &[f64]) -> QuantumLayer {
        if field.is_empty() {
            return QuantumLayer::default();
        }
        let n = field.len() as f64;
        let mean = field.iter().sum::<f64>() / n;
        let std = (field.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt();
        let checks: Vec<f64> = self
            .verifier_phases
            .iter()
            .take(VERIFIER_CHECKS)
            .map(|phase| 1.0 - (phase.sin() - mean).abs())
            .collect();
        let verifier_alignment = if checks.is_empty() {
            0.0
        } else {
            checks.iter().sum::<f64>() / checks.len() as f64
        };
        let field_stability = 1.0 - std;
        let score = 0.3 * mean + 0.3 * field_stability + 0.4 * verifier_alignment;
        QuantumLayer {
            score,
            valid: score >= self.thresholds.coherence,
            mean,
            verifier_alignment,
            field_stability,
        }
    }

    /// Temporal persistence, trended against `medium_term_average`.
    pub fn temporal(&self, m: &Manifestation, medium_term_average: Option<f64>) -> TemporalLayer {
        let anchor_contribution = (m.anchors_placed() as f64 * 0.1).min(1.0);
        let score = m.reality_stability + anchor_contribution;
        TemporalLayer {
            score,
            valid: score >= self.thresholds.persistence,
            stability: m.reality_stability,
            anchor_contribution,
            trend: medium_term_average.map_or(0.0, |avg| score - avg),
        }
    }

    /// Reality alteration from shift, warp and amplification.
    pub fn reality(&self, m: &Manifestation) -> RealityLayer {
        let probability_contribution = m.probability_shift / 100.0;
        let amplification_boost = m.amplification - 1.0;
        let score = probability_contribution * m.warp_strength * (1.0 + amplification_boost);
        RealityLayer {
            score,
            valid: score >= self.thresholds.alteration,
            probability_contribution,
            warp_contribution: m.warp_strength,
            amplification_boost,
            interval: confidence_interval(clamp_finite(score, 0.0, 1.0)),
        }
    }

    /// Run every layer and seal the combined score.
    pub fn validate(&self, m: &Manifestation, medium_term_average: Option<f64>) -> ValidationReport {
        let quantum = self.quantum(&m.field);
        let temporal = self.temporal(m, medium_term_average);
        let reality = self.reality(m);
        let w = self.weights;
        let weighted =
            w.quantum * quantum.score + w.temporal * temporal.score + w.reality * reality.score;
        let score = clamp_finite(weighted / w.total(), 0.0, 1.0);
        let rank = self.ladder.classify(score);
        ValidationReport {
            quantum,
            temporal,
            reality,
            score,
            rank,
            seal: rank.label().to_string(),
            confidence: ConfidenceLevel::from_score(score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Collapse, CollectiveMode, TemporalAnchor};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn manifestation(
        field: Vec<f64>,
        anchors: usize,
        stability: f64,
        shift: f64,
        warp: f64,
        amp: f64,
    ) -> Manifestation {
        Manifestation {
            field,
            collapse: Collapse {
                strength: 0.6,
                field_energy: 1.0,
                probability: 0.6,
                success: anchors > 0,
                shift: 0.06,
            },
            anchors: (0..anchors)
                .map(|position| TemporalAnchor {
                    position,
                    strength: 0.6,
                    resonance: 0.5,
                    stability,
                })
                .collect(),
            anchor_stability: stability,
            mode: CollectiveMode::Individual,
            amplification: amp,
            talisman_boost: 0.0,
            conversion_efficiency: 0.369,
            matter_density: warp / 100.0,
            probability_shift: shift,
            warp_strength: warp,
            reality_stability: stability,
        }
    }

    #[test]
    fn test_ladder_labels() {
        let l = ValidationLadder::default();
        assert_eq!(l.seal(0.95), "SUPREME_VALIDATION_SEAL_ETERNAL");
        assert_eq!(l.seal(0.8), "ROYAL_VALIDATION_SEAL_VERIFIED");
        assert_eq!(l.seal(0.75), "BLUE_FLAME_VALIDATION_SEAL_VERIFIED");
        assert_eq!(l.seal(0.6), "VALIDATION_SEAL_CONFIRMED");
        assert_eq!(l.seal(0.5), "VALIDATION_SEAL_PARTIAL");
        assert_eq!(l.seal(0.49), "VALIDATION_SEAL_PENDING");
        assert_eq!(l.seal(f64::NAN), "VALIDATION_SEAL_PENDING");
    }

    #[test]
    fn test_ladder_is_monotonic() {
        let l = ValidationLadder::default();
        let mut prev = ValidationRank::Pending;
        for i in 0..=100 {
            let r = l.classify(i as f64 / 100.0);
            assert!(r >= prev);
            prev = r;
        }
        assert_eq!(prev, ValidationRank::Supreme);
    }

    #[test]
    fn test_ladder_constructor() {
        assert_eq!(
            ValidationLadder::new([0.9, 0.8, 0.7, 0.6, 0.5]).unwrap(),
            ValidationLadder::default()
        );
        assert_eq!(ValidationLadder::default().thresholds(), [0.9, 0.8, 0.7, 0.6, 0.5]);
        assert!(ValidationLadder::new([0.9, 0.8, 0.8, 0.6, 0.5]).is_err());
        assert!(ValidationLadder::new([1.2, 0.8, 0.7, 0.6, 0.5]).is_err());
    }

    #[test]
    fn test_quantum_layer_with_zero_phases() {
        // sin(0) = 0 → match = 1 − |mean|.
        let v = ManifestationValidator::from_phases(vec![0.0; 20]);
        let q = v.quantum(&[0.5, 0.5, 0.5, 0.5]);
        assert!((q.mean - 0.5).abs() < 1e-12);
        assert!((q.field_stability - 1.0).abs() < 1e-12);
        assert!((q.verifier_alignment - 0.5).abs() < 1e-12);
        assert!((q.score - (0.15 + 0.3 + 0.2)).abs() < 1e-12);
        assert!(q.valid);

        let empty = v.quantum(&[]);
        assert_eq!(empty.score, 0.0);
        assert!(!empty.valid);
    }

    #[test]
    fn test_temporal_layer_trend() {
        let v = ManifestationValidator::from_phases(vec![]);
        let m = manifestation(vec![0.1], 3, 0.6, 0.0, 0.0, 1.0);
        let t = v.temporal(&m, None);
        assert!((t.score - 0.9).abs() < 1e-12);
        assert!(t.valid);
        assert_eq!(t.trend, 0.0);
        let t = v.temporal(&m, Some(0.5));
        assert!((t.trend - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_reality_layer() {
        let v = ManifestationValidator::from_phases(vec![]);
        // 10% × 50 × 1.4
        let r = v.reality(&manifestation(vec![0.1], 1, 0.5, 10.0, 50.0, 1.4));
        assert!((r.score - 7.0).abs() < 1e-9);
        assert!(r.valid);
        assert!((r.amplification_boost - 0.4).abs() < 1e-12);
        assert_eq!(r.interval, (1.0, 1.0));

        let none = v.reality(&manifestation(vec![0.1], 0, 0.0, 0.0, 36.9, 1.0));
        assert_eq!(none.score, 0.0);
        assert!(!none.valid);
    }

    #[test]
    fn test_combined_score_clamped_and_sealed() {
        let v = ManifestationValidator::from_phases(vec![0.0; 10]);
        let strong = v.validate(&manifestation(vec![0.5; 8], 5, 0.9, 15.0, 80.0, 1.45), None);
        assert_eq!(strong.score, 1.0);
        assert_eq!(strong.rank, ValidationRank::Supreme);
        assert_eq!(strong.seal, "SUPREME_VALIDATION_SEAL_ETERNAL");
        assert_eq!(strong.layers_passed(), 3);

        let weak = v.validate(&manifestation(vec![0.0; 8], 0, 0.0, 0.0, 36.9, 1.0), None);
        // quantum = 0.3 + 0.4 = 0.7; others 0 → 0.21 / 0.75.
        assert!((weak.score - 0.28).abs() < 1e-12, "score={}", weak.score);
        assert_eq!(weak.seal, "VALIDATION_SEAL_PENDING");
        assert_eq!(weak.confidence, ConfidenceLevel::Insufficient);
    }

    #[test]
    fn test_custom_weights() {
        let v = ManifestationValidator::from_phases(vec![0.0; 10]);
        let quantum_only = LayerWeights { quantum: 1.0, temporal: 0.0, reality: 0.0 };
        let v = v.with_weights(quantum_only).unwrap();
        let r = v.validate(&manifestation(vec![0.5; 4], 9, 1.0, 20.0, 90.0, 2.0), None);
        assert!((r.score - r.quantum.score).abs() < 1e-12);

        let zero = LayerWeights { quantum: 0.0, temporal: 0.0, reality: 0.0 };
        assert!(v.clone().with_weights(zero).is_err());
        let negative = LayerWeights { quantum: -0.1, ..LayerWeights::default() };
        assert!(v.with_weights(negative).is_err());
    }

    #[test]
    fn test_generated_phases_reproducible() {
        let a = ManifestationValidator::generate(&mut StdRng::seed_from_u64(3));
        let b = ManifestationValidator::generate(&mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
        assert_eq!(a.verifier_phases.len(), VERIFIER_COUNT);
        assert!(a.verifier_phases.iter().all(|p| (0.0..TAU).contains(p)));
    }
}
