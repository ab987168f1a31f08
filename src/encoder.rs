//! Deterministic vector encoder: the entry point of the scoring pipeline.
//!
//! Text is mapped to a fixed-length float vector built from character
//! ordinals:
//!
//! ```text
//! "abc", len 6  →  [97, 98, 99, 0, 0, 0]  →  / 99  →  [0.98, 0.99, 1.0, 0, 0, 0]
//! ```
//!
//! # Invariants
//! - Output length always equals the requested length.
//! - All values lie in [0.0, 1.0]; an all-zero vector stays unscaled.
//! - Same text and length produce the same vector across runs and platforms.

/// Fixed-length normalised vector derived from a piece of text.
///
/// Created per scoring call and owned solely by that call.
#[derive(Clone, Debug, PartialEq)]
pub struct InputVector {
    values: Vec<f64>,
}

impl InputVector {
    /// Wrap an already-encoded vector. No normalisation is applied.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// All-zero vector of the given length.
    pub fn zeros(length: usize) -> Self {
        Self {
            values: vec![0.0; length],
        }
    }

    /// Vector length.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` when the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the underlying values.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// `true` when every element is exactly zero (including the empty vector).
    pub fn is_all_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    /// Deterministic FNV-1a hash of the vector contents.
    ///
    /// Values are quantised to u16 before hashing so tiny float noise does not
    /// change the fingerprint. Used as a fallback source identifier.
    pub fn fingerprint(&self) -> u32 {
        let mut h: u32 = 2_166_136_261;
        for &v in &self.values {
            let bits: u16 = (v.clamp(0.0, 1.0) * 65535.0) as u16;
            h ^= bits as u32;
            h = h.wrapping_mul(16_777_619);
        }
        h
    }
}

/// Encode `text` as a normalised vector of exactly `length` elements.
///
/// The text is lower-cased, each character becomes its Unicode scalar value,
/// and the sequence is truncated or zero-padded to `length`. The result is
/// divided by its maximum element unless that maximum is zero.
///
/// Never fails: the empty string yields an all-zero vector.
pub fn encode(text: &str, length: usize) -> InputVector {
    let mut values: Vec<f64> = text
        .chars()
        .flat_map(char::to_lowercase)
        .take(length)
        .map(|c| c as u32 as f64)
        .collect();
    values.resize(length, 0.0);

    let max = values.iter().copied().fold(0.0_f64, f64::max);
    if max > 0.0 {
        for v in values.iter_mut() {
            *v /= max;
        }
    }
    InputVector { values }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_is_all_zero() {
        let v = encode("", 16);
        assert_eq!(v.len(), 16);
        assert!(v.is_all_zero());
    }

    #[test]
    fn test_zero_length_request() {
        let v = encode("anything", 0);
        assert!(v.is_empty());
        assert!(v.is_all_zero());
    }

    #[test]
    fn test_padding_and_normalisation() {
        let v = encode("abc", 6);
        let s = v.as_slice();
        assert_eq!(s.len(), 6);
        assert!((s[0] - 97.0 / 99.0).abs() < 1e-12);
        assert!((s[1] - 98.0 / 99.0).abs() < 1e-12);
        assert!((s[2] - 1.0).abs() < 1e-12);
        assert_eq!(&s[3..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_truncation_keeps_prefix() {
        let v = encode("zab", 1);
        assert_eq!(v.as_slice(), &[1.0]);
    }

    #[test]
    fn test_lowercases_before_encoding() {
        assert_eq!(encode("ABC", 8), encode("abc", 8));
    }

    #[test]
    fn test_deterministic() {
        let a = encode("En Eeke Mai Ea", 369);
        let b = encode("En Eeke Mai Ea", 369);
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_values_bounded() {
        let v = encode("∞ resonance ∞ 369", 32);
        for &x in v.as_slice() {
            assert!((0.0..=1.0).contains(&x), "x={}", x);
        }
    }

    #[test]
    fn test_fingerprint_distinguishes_inputs() {
        assert_ne!(encode("alpha", 16).fingerprint(), encode("omega", 16).fingerprint());
    }
}
