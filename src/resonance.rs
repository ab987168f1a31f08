//! Temporal resonance: a per-band scalar derived from the shape of the text.
//!
//! `resonance(band) = clamp(base × (1 + sin(chars × words × 0.01)), 0, 1)`

use serde::{Deserialize, Serialize};

use crate::scorer::clamp_finite;

/// Base values for the four resonance bands.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResonanceBases {
    /// Primary band.
    pub alpha: f64,
    /// Secondary band.
    pub beta: f64,
    /// Tertiary band.
    pub gamma: f64,
    /// Fixed fourth band.
    pub delta: f64,
}

impl Default for ResonanceBases {
    fn default() -> Self {
        Self {
            alpha: 0.369,
            beta: 0.666,
            gamma: 0.999,
            delta: 0.111,
        }
    }
}

/// Resonance per band for one piece of text, each in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalResonance {
    /// Alpha band.
    pub alpha: f64,
    /// Beta band.
    pub beta: f64,
    /// Gamma band.
    pub gamma: f64,
    /// Delta band.
    pub delta: f64,
}

impl TemporalResonance {
    /// Compute resonance for `text` against `bases`.
    pub fn compute(text: &str, bases: &ResonanceBases) -> Self {
        let chars = text.chars().count() as f64;
        let words = text.split_whitespace().count() as f64;
        let wave = 1.0 + (chars * words * 0.01).sin();
        let band = |base: f64| clamp_finite(base * wave, 0.0, 1.0);
        Self {
            alpha: band(bases.alpha),
            beta: band(bases.beta),
            gamma: band(bases.gamma),
            delta: band(bases.delta),
        }
    }

    /// Mean of the four bands.
    pub fn mean(&self) -> f64 {
        (self.alpha + self.beta + self.gamma + self.delta) / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_returns_bases() {
        // sin(0) = 0 → each band equals its base.
        let r = TemporalResonance::compute("", &ResonanceBases::default());
        assert!((r.alpha - 0.369).abs() < 1e-12);
        assert!((r.beta - 0.666).abs() < 1e-12);
        assert!((r.gamma - 0.999).abs() < 1e-12);
        assert!((r.delta - 0.111).abs() < 1e-12);
    }

    #[test]
    fn test_bands_bounded() {
        let bases = ResonanceBases::default();
        for text in ["a", "two words", "manifest the eternal flame now", "∞ En Eeke Mai Ea ∞"] {
            let r = TemporalResonance::compute(text, &bases);
            for v in [r.alpha, r.beta, r.gamma, r.delta] {
                assert!((0.0..=1.0).contains(&v), "text={:?} v={}", text, v);
            }
        }
    }

    #[test]
    fn test_matches_formula() {
        let text = "hello quantum world";
        let wave = 1.0 + (19.0_f64 * 3.0 * 0.01).sin();
        let r = TemporalResonance::compute(text, &ResonanceBases::default());
        assert!((r.alpha - (0.369 * wave).min(1.0)).abs() < 1e-12);
        assert!((r.delta - (0.111 * wave).min(1.0)).abs() < 1e-12);
    }
}
