//! Weighted scorer: folds [`FieldStatistics`] and an intensity multiplier
//! into a bounded score.
//!
//! ```text
//! coherence = clamp(0.5·mean + 0.3·stddev + 0.2·max_abs, 0, 1)
//! insight   = clamp(mean / (entropy + ε), 0, insight_max)
//! raw       = 0.5·mean + 0.3·stddev + 0.2·max_abs + 0.1·(insight / insight_max)
//! score     = clamp(raw × multiplier, 0, 1)
//! ```
//!
//! Out-of-range intermediates are clamped, never rejected. A non-finite raw
//! value collapses to 0.0.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SealError, SealResult};
use crate::field::FieldStatistics;

/// Guard added to the entropy before dividing.
pub const INSIGHT_EPSILON: f64 = 0.001;

/// Default upper bound for the insight-strength term.
pub const DEFAULT_INSIGHT_MAX: f64 = 10.0;

// ─── Intensity ──────────────────────────────────────────────────────────────

/// Enumerated multiplier applied to every raw score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    /// 0.3
    Subtle,
    /// 0.6
    #[default]
    Focused,
    /// 0.8
    Temporal,
    /// 0.9
    Collective,
    /// 1.0
    Absolute,
}

impl Intensity {
    /// All variants, weakest first.
    pub const ALL: [Intensity; 5] = [
        Intensity::Subtle,
        Intensity::Focused,
        Intensity::Temporal,
        Intensity::Collective,
        Intensity::Absolute,
    ];

    /// The float multiplier for this intensity.
    pub fn multiplier(self) -> f64 {
        match self {
            Intensity::Subtle => 0.3,
            Intensity::Focused => 0.6,
            Intensity::Temporal => 0.8,
            Intensity::Collective => 0.9,
            Intensity::Absolute => 1.0,
        }
    }

    /// Lower-case name as used on the configuration and FFI surfaces.
    pub fn as_str(self) -> &'static str {
        match self {
            Intensity::Subtle => "subtle",
            Intensity::Focused => "focused",
            Intensity::Temporal => "temporal",
            Intensity::Collective => "collective",
            Intensity::Absolute => "absolute",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intensity {
    type Err = SealError;

    fn from_str(s: &str) -> SealResult<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Intensity::ALL
            .into_iter()
            .find(|i| i.as_str() == lowered)
            .ok_or_else(|| {
                SealError::invalid(
                    "intensity",
                    format!("unknown intensity {s:?}; expected one of subtle, focused, temporal, collective, absolute"),
                )
            })
    }
}

// ─── Weights ────────────────────────────────────────────────────────────────

/// Linear weights over the field statistics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight on the projection mean.
    pub mean: f64,
    /// Weight on the projection standard deviation.
    pub stddev: f64,
    /// Weight on the largest absolute projected value.
    pub max_abs: f64,
    /// Weight on the normalised insight-strength term.
    pub insight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            mean: 0.5,
            stddev: 0.3,
            max_abs: 0.2,
            insight: 0.1,
        }
    }
}

/// Every intermediate a scoring call produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Weighted mean/stddev/max combination, clamped to [0, 1].
    pub coherence: f64,
    /// `mean / (entropy + ε)`, clamped to [0, insight_max].
    pub insight_strength: f64,
    /// `mean × multiplier`, clamped to [0, 1].
    pub potential: f64,
    /// The multiplier that was applied.
    pub multiplier: f64,
    /// Final score in [0, 1].
    pub score: f64,
}

// ─── Scorer ─────────────────────────────────────────────────────────────────

/// Stateless scorer parameterised by its weights and insight ceiling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedScorer {
    weights: ScoreWeights,
    insight_max: f64,
}

impl WeightedScorer {
    /// Scorer with the default weights and an insight ceiling of 10.
    pub fn new() -> Self {
        Self {
            weights: ScoreWeights::default(),
            insight_max: DEFAULT_INSIGHT_MAX,
        }
    }

    /// Scorer with explicit weights and insight ceiling.
    ///
    /// `insight_max` must be finite and positive; weights must be finite.
    pub fn with_weights(weights: ScoreWeights, insight_max: f64) -> SealResult<Self> {
        if !(insight_max.is_finite() && insight_max > 0.0) {
            return Err(SealError::invalid(
                "insight_strength_max",
                format!("must be finite and > 0, got {insight_max}"),
            ));
        }
        let all = [weights.mean, weights.stddev, weights.max_abs, weights.insight];
        if all.iter().any(|w| !w.is_finite()) {
            return Err(SealError::invalid("weights", "all weights must be finite"));
        }
        Ok(Self {
            weights,
            insight_max,
        })
    }

    /// The weights in use.
    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// Insight-strength term: `mean / (entropy + ε)` clamped to `[0, insight_max]`.
    pub fn insight_strength(&self, stats: &FieldStatistics) -> f64 {
        let raw = stats.mean / (stats.entropy.max(0.0) + INSIGHT_EPSILON);
        clamp_finite(raw, 0.0, self.insight_max)
    }

    /// Compute the full breakdown for `stats` under `multiplier`.
    pub fn breakdown(&self, stats: &FieldStatistics, multiplier: f64) -> ScoreBreakdown {
        let w = &self.weights;
        let linear = w.mean * stats.mean + w.stddev * stats.stddev + w.max_abs * stats.max_abs;
        let insight = self.insight_strength(stats);
        let raw = linear + w.insight * (insight / self.insight_max);

        ScoreBreakdown {
            coherence: clamp_finite(linear, 0.0, 1.0),
            insight_strength: insight,
            potential: clamp_finite(stats.mean * multiplier, 0.0, 1.0),
            multiplier,
            score: clamp_finite(raw * multiplier, 0.0, 1.0),
        }
    }

    /// Score in [0, 1] for `stats` under `multiplier`.
    pub fn score(&self, stats: &FieldStatistics, multiplier: f64) -> f64 {
        self.breakdown(stats, multiplier).score
    }
}

impl Default for WeightedScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Score `stats` with the default weights.
pub fn score(stats: &FieldStatistics, multiplier: f64) -> f64 {
    WeightedScorer::new().score(stats, multiplier)
}

/// Clamp into `[lo, hi]`, mapping NaN to `lo`.
pub(crate) fn clamp_finite(x: f64, lo: f64, hi: f64) -> f64 {
    if x.is_nan() {
        lo
    } else {
        x.clamp(lo, hi)
    }
}
