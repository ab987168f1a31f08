//! Field transform: projects an [`InputVector`] through a fixed coefficient
//! array and summarises the projection as four scalars.
//!
//! ```text
//! projection[i] = vector[i] × coefficients[i]      (common prefix only)
//!
//! mean     = Σ projection / n
//! stddev   = √(Σ (p − mean)² / n)                  (population)
//! max_abs  = max |p|
//! entropy  = −Σ pₖ log₂ pₖ over 10 equal bins on [min, max], empty bins skipped
//! ```
//!
//! # Invariants
//! - All four statistics are finite for every input.
//! - `entropy ≥ 0`; constant projections (including all-zero) give exactly 0.
//! - Coefficients are produced by an injected generator so a fixed seed pins
//!   every downstream number.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::encoder::InputVector;
use crate::error::{SealError, SealResult};

/// Number of histogram bins used by the entropy estimate.
pub const ENTROPY_BINS: usize = 10;

// ─── Coefficients ───────────────────────────────────────────────────────────

/// Fixed-size array of projection coefficients.
///
/// Drawn once per session from a standard normal distribution. Immutable
/// after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldCoefficients {
    values: Vec<f64>,
}

impl FieldCoefficients {
    /// Draw `size` coefficients from N(0, 1) using the supplied generator.
    pub fn generate<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let values = (0..size).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
        Self { values }
    }

    /// Draw `size` coefficients from a generator seeded with `seed`.
    ///
    /// Same seed and size always produce the same coefficients.
    pub fn seeded(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::generate(size, &mut rng)
    }

    /// Use an explicit coefficient array. Rejects non-finite values.
    pub fn from_values(values: Vec<f64>) -> SealResult<Self> {
        if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(SealError::invalid(
                "coefficients",
                format!("element {i} is not finite: {v}"),
            ));
        }
        Ok(Self { values })
    }

    /// All-ones array of length `size`. Projection then equals the input vector.
    pub fn ones(size: usize) -> Self {
        Self {
            values: vec![1.0; size],
        }
    }

    /// Number of coefficients.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` when there are no coefficients.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the coefficients.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

// ─── Statistics ─────────────────────────────────────────────────────────────

/// Scalar summary of a projected vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    /// Arithmetic mean of the projection.
    pub mean: f64,
    /// Population standard deviation of the projection.
    pub stddev: f64,
    /// Largest absolute projected value.
    pub max_abs: f64,
    /// Shannon entropy (bits) of the 10-bin histogram. Always ≥ 0.
    pub entropy: f64,
}

/// Project `vector` through `coefficients` and compute [`FieldStatistics`].
///
/// Only the common prefix of the two arrays participates. Non-finite
/// products are treated as zero. An empty projection yields all-zero
/// statistics.
pub fn transform(vector: &InputVector, coefficients: &FieldCoefficients) -> FieldStatistics {
    let projection: Vec<f64> = vector
        .as_slice()
        .iter()
        .zip(coefficients.as_slice())
        .map(|(v, c)| {
            let p = v * c;
            if p.is_finite() { p } else { 0.0 }
        })
        .collect();

    if projection.is_empty() {
        return FieldStatistics::default();
    }

    let n = projection.len() as f64;
    let mean = projection.iter().sum::<f64>() / n;
    let variance = projection.iter().map(|p| (p - mean) * (p - mean)).sum::<f64>() / n;
    let max_abs = projection.iter().fold(0.0_f64, |m, p| m.max(p.abs()));

    FieldStatistics {
        mean,
        stddev: variance.max(0.0).sqrt(),
        max_abs,
        entropy: histogram_entropy(&projection),
    }
}

/// Shannon entropy of a [`ENTROPY_BINS`]-bin histogram spanning `[min, max]`.
///
/// Bin probabilities are `count / n`; empty bins contribute nothing. The top
/// edge is inclusive, so `max` lands in the last bin.
fn histogram_entropy(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if !(span > 0.0) || !span.is_finite() {
        return 0.0;
    }

    let mut bins = [0usize; ENTROPY_BINS];
    for &v in values {
        let idx = (((v - min) / span) * ENTROPY_BINS as f64) as usize;
        bins[idx.min(ENTROPY_BINS - 1)] += 1;
    }

    let n = values.len() as f64;
    let h: f64 = bins
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.log2()
        })
        .sum();
    h.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;

    #[test]
    fn test_all_zero_vector_has_zero_entropy() {
        let stats = transform(&InputVector::zeros(32), &FieldCoefficients::seeded(32, 7));
        assert_eq!(stats.entropy, 0.0);
        assert!(!stats.entropy.is_nan());
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.stddev, 0.0);
        assert_eq!(stats.max_abs, 0.0);
    }

    #[test]
    fn test_empty_projection_is_default() {
        let stats = transform(&InputVector::zeros(0), &FieldCoefficients::ones(4));
        assert_eq!(stats, FieldStatistics::default());
        let stats = transform(&encode("abc", 4), &FieldCoefficients::ones(0));
        assert_eq!(stats, FieldStatistics::default());
    }

    #[test]
    fn test_constant_projection_has_zero_entropy() {
        let v = InputVector::from_values(vec![0.5; 8]);
        let stats = transform(&v, &FieldCoefficients::ones(8));
        assert_eq!(stats.entropy, 0.0);
        assert!((stats.mean - 0.5).abs() < 1e-12);
        assert!(stats.stddev.abs() < 1e-12);
    }

    #[test]
    fn test_ones_projection_matches_hand_computation() {
        let v = encode("abc", 16);
        let stats = transform(&v, &FieldCoefficients::ones(16));

        let a = 97.0 / 99.0;
        let b = 98.0 / 99.0;
        let mean = (a + b + 1.0) / 16.0;
        let var = (a * a + b * b + 1.0) / 16.0 - mean * mean;
        assert!((stats.mean - mean).abs() < 1e-12);
        assert!((stats.stddev - var.sqrt()).abs() < 1e-12);
        assert!((stats.max_abs - 1.0).abs() < 1e-12);

        // 13 zeros in the first bin, 3 values in the last bin.
        let p0: f64 = 13.0 / 16.0;
        let p9: f64 = 3.0 / 16.0;
        let h = -(p0 * p0.log2() + p9 * p9.log2());
        assert!((stats.entropy - h).abs() < 1e-12, "entropy={}", stats.entropy);
    }

    #[test]
    fn test_uniform_spread_reaches_max_entropy() {
        // One value per bin → log2(10).
        let values: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        let stats = transform(&InputVector::from_values(values), &FieldCoefficients::ones(10));
        assert!((stats.entropy - (10.0_f64).log2()).abs() < 1e-9, "entropy={}", stats.entropy);
    }

    #[test]
    fn test_common_prefix_only() {
        let v = encode("abcdef", 6);
        let short = transform(&v, &FieldCoefficients::ones(3));
        let manual = transform(
            &InputVector::from_values(v.as_slice()[..3].to_vec()),
            &FieldCoefficients::ones(3),
        );
        assert_eq!(short, manual);
    }

    #[test]
    fn test_non_finite_products_are_guarded() {
        let v = InputVector::from_values(vec![f64::NAN, 1.0, f64::INFINITY]);
        let stats = transform(&v, &FieldCoefficients::ones(3));
        assert!(stats.mean.is_finite());
        assert!(stats.stddev.is_finite());
        assert!(stats.entropy.is_finite() && stats.entropy >= 0.0);
    }

    #[test]
    fn test_seeded_coefficients_reproducible() {
        let a = FieldCoefficients::seeded(369, 66);
        let b = FieldCoefficients::seeded(369, 66);
        let c = FieldCoefficients::seeded(369, 67);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 369);
        assert!(a.as_slice().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_from_values_rejects_non_finite() {
        assert!(FieldCoefficients::from_values(vec![1.0, f64::NAN]).is_err());
        assert!(FieldCoefficients::from_values(vec![1.0, -2.5]).is_ok());
    }

    #[test]
    fn test_entropy_never_negative_on_random_fields() {
        for seed in 0..20 {
            let coeffs = FieldCoefficients::seeded(64, seed);
            let stats = transform(&encode("the quick brown fox", 64), &coeffs);
            assert!(stats.entropy >= 0.0, "seed={} entropy={}", seed, stats.entropy);
            assert!(stats.entropy <= (ENTROPY_BINS as f64).log2() + 1e-9);
        }
    }
}
