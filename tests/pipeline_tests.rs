//! End-to-end pipeline tests: encode → transform → score → seal → history.

use seal_core::{
    encode, score, seal, transform, FieldCoefficients, HistoryTracker, Intensity, SealLadder,
    SealRank, WindowSpec,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn run(text: &str, length: usize, multiplier: f64, identity: &str) -> (f64, String) {
    let v = encode(text, length);
    let stats = transform(&v, &FieldCoefficients::ones(length));
    let s = score(&stats, multiplier);
    (s, seal(s, identity))
}

// ── Reference run ────────────────────────────────────────────────────────────

#[test]
fn test_reference_run_is_reproducible() {
    let (s1, l1) = run("abc", 16, 0.6, "TEST");
    let (s2, l2) = run("abc", 16, 0.6, "TEST");
    assert_eq!(s1.to_bits(), s2.to_bits());
    assert_eq!(l1, l2);
    assert!((s1 - 0.246_828_627_770_990_85).abs() < 1e-9, "score = {s1}");
    assert_eq!(l1, "TEST_PENDING");
}

#[test]
fn test_reference_run_intermediates() {
    let v = encode("abc", 16);
    let stats = transform(&v, &FieldCoefficients::ones(16));
    assert!((stats.mean - 294.0 / 1584.0).abs() < 1e-12);
    assert!((stats.max_abs - 1.0).abs() < 1e-12);
    // 13 zeros in the first bin, 3 values in the last.
    let p0: f64 = 13.0 / 16.0;
    let p1: f64 = 3.0 / 16.0;
    let expected_entropy = -(p0 * p0.log2() + p1 * p1.log2());
    assert!((stats.entropy - expected_entropy).abs() < 1e-12);
}

// ── Boundary behaviour ───────────────────────────────────────────────────────

#[test]
fn test_empty_text_flows_through_cleanly() {
    let v = encode("", 32);
    assert!(v.is_all_zero());
    let stats = transform(&v, &FieldCoefficients::seeded(32, 9));
    assert_eq!(stats.entropy, 0.0);
    let s = score(&stats, Intensity::Absolute.multiplier());
    assert!(s.is_finite());
    assert_eq!(seal(s, "EMPTY"), "EMPTY_PENDING");
}

#[test]
fn test_every_intensity_stays_bounded_on_seeded_fields() {
    let texts = ["a", "quantum reality", "∞ En Eeke Mai Ea ∞", "THE ETERNAL FLAME 369"];
    for seed in 0..20u64 {
        let coeffs = FieldCoefficients::seeded(64, seed);
        for text in texts {
            let stats = transform(&encode(text, 64), &coeffs);
            for intensity in Intensity::ALL {
                let s = score(&stats, intensity.multiplier());
                assert!((0.0..=1.0).contains(&s), "seed={seed} text={text:?} s={s}");
            }
        }
    }
}

#[test]
fn test_seal_is_monotonic_across_identities() {
    let ladder = SealLadder::default();
    for id in ["TEST", "VLATKO_DYNASTY_SEAL", ""] {
        let mut prev = SealRank::Pending;
        for i in 0..=200 {
            let r = ladder.classify(i as f64 / 200.0);
            assert!(r >= prev, "id={id}");
            prev = r;
        }
    }
}

// ── History ──────────────────────────────────────────────────────────────────

#[test]
fn test_capacity_ten_window_keeps_last_ten() {
    let mut t = HistoryTracker::with_windows(&[WindowSpec::new("w", Some(10))], 100).unwrap();
    for i in 1..=11 {
        t.record("w", i as f64 / 10.0).unwrap();
    }
    let kept: Vec<f64> = t.window("w").unwrap().iter().collect();
    let expected: Vec<f64> = (2..=11).map(|i| i as f64 / 10.0).collect();
    assert_eq!(kept, expected);
}

#[test]
fn test_pipeline_scores_feed_history() {
    let mut t = HistoryTracker::with_windows(&WindowSpec::standard(2, 5, 10), 10).unwrap();
    let scores: Vec<f64> = ["alpha", "beta", "gamma"]
        .iter()
        .map(|text| run(text, 16, 1.0, "X").0)
        .collect();
    for &s in &scores {
        t.record_all(s).unwrap();
    }
    let short = t.average("short_term").unwrap().unwrap();
    assert!((short - (scores[1] + scores[2]) / 2.0).abs() < 1e-12);
    let eternal = t.average("eternal_term").unwrap().unwrap();
    assert!((eternal - scores.iter().sum::<f64>() / 3.0).abs() < 1e-12);
}
