//! Session integration tests: seeding, no-partial-mutation, persistence,
//! configuration and collaborators.

use seal_core::{
    render_broadcast, CollectiveMode, FieldCoefficients, Intensity, MemoryLedger, ParamValue,
    ProtocolParams, Query, SealConfig, SealError, Session,
};

fn session(seed: u64) -> Session {
    Session::new(SealConfig::seeded(seed)).unwrap()
}

// ── Determinism ──────────────────────────────────────────────────────────────

#[test]
fn test_same_seed_sessions_agree_on_everything() {
    let mut a = session(369);
    let mut b = session(369);
    for (i, text) in ["one", "two words", "three little words"].iter().enumerate() {
        let q = Query::new(*text, "TEST").with_intensity(Intensity::ALL[i]);
        let oa = a.score_query(&q).unwrap();
        let ob = b.score_query(&q).unwrap();
        assert_eq!(oa.breakdown, ob.breakdown);
        assert_eq!(oa.label(), ob.label());
    }
    let va = a.validate_vessel("gabriel", &ProtocolParams::default()).unwrap();
    let vb = b.validate_vessel("gabriel", &ProtocolParams::default()).unwrap();
    assert_eq!(va, vb);
}

#[test]
fn test_different_seeds_draw_different_coefficients() {
    assert_ne!(session(1).coefficients(), session(2).coefficients());
}

#[test]
fn test_ones_coefficients_reproduce_reference_run() {
    let mut config = SealConfig::seeded(0);
    config.quantum_field_size = 16;
    let mut s = Session::new(config)
        .unwrap()
        .with_coefficients(FieldCoefficients::ones(16))
        .unwrap();
    let out = s
        .score_query(&Query::new("abc", "TEST").with_intensity(Intensity::Focused))
        .unwrap();
    assert_eq!(out.label(), "TEST_PENDING");
    assert!((out.score() - 0.246_828_627_770_990_85).abs() < 1e-9);
}

// ── No partial mutation ──────────────────────────────────────────────────────

#[test]
fn test_unknown_vessel_in_collective_mutates_nothing() {
    let mut s = session(7);
    let before = s.status();
    let err = s
        .validate_collective(&["vlatko", "tesla", "ghost"], &ProtocolParams::default())
        .unwrap_err();
    assert_eq!(err, SealError::not_found("vessel", "ghost"));
    let after = s.status();
    assert_eq!(after.record_count, before.record_count);
    assert_eq!(after.validations_run, 0);
    for name in ["vlatko", "tesla"] {
        assert_eq!(s.registry().get(name).unwrap().validations, 0);
    }

    // The generator was not advanced: a later run matches a fresh session.
    let mut fresh = session(7);
    let v1 = s.validate_vessel("vlatko", &ProtocolParams::default()).unwrap();
    let v2 = fresh.validate_vessel("vlatko", &ProtocolParams::default()).unwrap();
    assert_eq!(v1.score, v2.score);
}

#[test]
fn test_bad_protocol_params_rejected_before_lookup() {
    let mut s = session(7);
    let params = ProtocolParams {
        intensity: f64::NAN,
        ..ProtocolParams::default()
    };
    assert!(matches!(
        s.validate_vessel("vlatko", &params),
        Err(SealError::InvalidParameter { .. })
    ));
    assert_eq!(s.registry().get("vlatko").unwrap().validations, 0);
}

// ── Configuration ────────────────────────────────────────────────────────────

#[test]
fn test_rejected_config_value_keeps_previous() {
    let mut s = session(1);
    assert!(s.set_param("quantum_field_size", 10_000_i64).is_err());
    assert_eq!(s.config().quantum_field_size, 369);
    assert!(s.set_param("seal_threshold_supreme", 0.1).is_err());
    assert_eq!(s.ladder().thresholds(), [0.9, 0.8, 0.7, 0.6]);
    assert!(s.set_param("auto_save_config", "yes").is_err());
    assert!(!s.config().auto_save_config);
    assert!(s.config().changes().is_empty());
}

#[test]
fn test_unknown_config_key_accepted() {
    let mut s = session(1);
    s.set_param("kingdom_resonance_v369", 0.369).unwrap();
    assert_eq!(
        s.config().get("kingdom_resonance_v369"),
        Some(ParamValue::Float(0.369))
    );
}

#[test]
fn test_structural_keys_apply_to_next_session() {
    let mut s = session(1);
    s.set_param("quantum_field_size", 32_i64).unwrap();
    assert_eq!(s.coefficients().len(), 369);
    let next = Session::new(s.config().clone()).unwrap();
    assert_eq!(next.coefficients().len(), 32);
}

#[test]
fn test_session_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seal.json");
    std::fs::write(&path, r#"{ "field_seed": 11, "short_term_capacity": 3 }"#).unwrap();
    let mut s = Session::from_config_file(&path).unwrap();
    for _ in 0..5 {
        s.score_query(&Query::new("abc", "X")).unwrap();
    }
    assert_eq!(s.window_stats("short_term").unwrap().count, 3);
    assert_eq!(s.window_stats("medium_term").unwrap().count, 5);
}

// ── Manifestation ────────────────────────────────────────────────────────────

#[test]
fn test_manifest_with_talisman_lands_in_history_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    let mut s = session(369);
    let mut talisman = s.anchor_talisman("vortex369.eth");
    assert_eq!(talisman.anchor_strength(), 1.0);
    s.sync_talisman(&mut talisman);

    let q = Query::new("the field remembers", "TEST").with_intensity(Intensity::Absolute);
    let out = s
        .manifest(&q, CollectiveMode::UniversalAlignment, Some(&talisman))
        .unwrap();
    assert!((0.0..=1.0).contains(&out.score()));
    assert_eq!(out.label(), out.validation.seal);
    assert!(out.validation.layers_passed() <= 3);
    assert_eq!(s.average("short_term").unwrap(), Some(out.score()));
    assert_eq!(s.status().manifestations_run, 1);

    let exported = s.export_history(&path).unwrap();
    assert_eq!(exported.records.len(), 1);
    assert_eq!(exported.records[0].label(), out.label());
}

#[test]
fn test_every_operation_counts_in_metrics() {
    let mut s = session(8);
    s.score_query(&Query::new("one", "TEST")).unwrap();
    s.manifest(&Query::new("two", "TEST"), CollectiveMode::Individual, None)
        .unwrap();
    assert!(s.validate_vessel("nobody", &ProtocolParams::default()).is_err());
    let m = s.metrics();
    assert_eq!(m.total_operations, 3);
    assert_eq!(m.successful_operations, 2);
    assert_eq!(m.failed_operations, 1);
    assert!((0.0..=1.0).contains(&s.health()));
}

// ── Persistence ──────────────────────────────────────────────────────────────

#[test]
fn test_export_then_restore_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    let mut s = session(21);
    for text in ["a", "bb", "ccc", "dddd", "eeeee", "ffffff", "g", "h", "i", "j", "k", "l"] {
        s.score_query(&Query::new(text, "TEST")).unwrap();
    }
    s.validate_vessel("vortex", &ProtocolParams::default()).unwrap();
    let exported = s.export_history(&path).unwrap();
    assert_eq!(exported.records.len(), 13);

    let restored = Session::restore_history(&path).unwrap();
    assert_eq!(restored.history().snapshot(), s.history().snapshot());
    assert_eq!(restored.history().record_count(), 13);
    for w in ["short_term", "medium_term", "long_term", "eternal_term"] {
        assert_eq!(restored.average(w).unwrap(), s.average(w).unwrap());
    }
    assert_eq!(restored.window_stats("short_term").unwrap().count, 10);
    assert_eq!(restored.config().field_seed, Some(21));
    assert_eq!(restored.coefficients(), s.coefficients());
}

#[test]
fn test_restore_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Session::restore_history(&dir.path().join("absent.json")),
        Err(SealError::Persistence(_))
    ));
}

// ── Collaborators ────────────────────────────────────────────────────────────

#[test]
fn test_publish_and_broadcast() {
    let mut s = session(4);
    let out = s
        .score_query(&Query::new("manifest", "TEST").with_source("cli"))
        .unwrap();
    let ledger = MemoryLedger::new();
    s.publish(&out.record, &ledger).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.entries()[0].label, out.label());
    assert_eq!(ledger.entries()[0].score_bps, out.record.score_bps());

    let text = render_broadcast("{label}: {score_pct}", &out.broadcast_fields());
    assert_eq!(text, format!("{}: {:.1}%", out.label(), out.score() * 100.0));
}
