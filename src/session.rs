//! Session: the owned context that runs the pipeline and keeps its state.
//!
//! ```text
//! Query ──▶ encode ──▶ transform ──▶ score ──▶ seal ──▶ record ──▶ ScoreOutcome
//!              │            │           │         │         │
//!        field size   coefficients   scorer    ladder    history
//! ```
//!
//! [`Session::manifest`] runs the same front half, then feeds the scorer
//! terms through the [`ManifestationEngine`] and seals the
//! [`ValidationReport`] score instead.
//!
//! A session owns its config, coefficients, random generator, history,
//! vessel registry and operation metrics. Nothing is global: two sessions never share state, and
//! two sessions with the same `field_seed` produce identical outcomes for
//! identical calls.
//!
//! # Invariants
//!
//! - **Seeded determinism**: every random draw (coefficients, probability
//!   field, anchors, verifiers, protocol noise, collapse) comes from the
//!   session's one `StdRng`.
//! - **No partial mutation**: an operation that fails leaves history,
//!   registry counters and the generator untouched. Only the failure count
//!   in [`OperationMetrics`] moves.
//! - **Finite history**: only finite scores reach the windows.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::collab::LedgerSink;
use crate::config::{ParamValue, SealConfig};
use crate::encoder::encode;
use crate::error::{SealError, SealResult};
use crate::field::{transform, FieldCoefficients, FieldStatistics};
use crate::history::{HistoryTracker, WindowStats};
use crate::manifest::{
    CollectiveMode, Manifestation, ManifestationEngine, PatternInputs, Talisman, TalismanSync,
};
use crate::metrics::OperationMetrics;
use crate::persist::HistorySnapshot;
use crate::record::{BroadcastFields, ScoreRecord};
use crate::registry::{ProtocolParams, VesselRegistry, VesselValidation};
use crate::resonance::{ResonanceBases, TemporalResonance};
use crate::scorer::{Intensity, ScoreBreakdown, WeightedScorer};
use crate::sealer::{
    collective_amplification, collective_seal, confidence_interval, ConfidenceLevel, SealLadder,
};
use crate::validation::{LayerThresholds, ManifestationValidator, ValidationReport};

/// Window whose average trends the temporal validation layer.
const TREND_WINDOW: &str = "medium_term";

// ─── Query / outcome types ──────────────────────────────────────────────────

/// One scoring request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Free text to score.
    pub text: String,
    /// Intensity level selecting the score multiplier.
    pub intensity: Intensity,
    /// Identity embedded in the seal label.
    pub identity: String,
    /// Source recorded with the score. Defaults to a fingerprint of the input.
    pub source: Option<String>,
}

impl Query {
    /// Query at the default intensity with no explicit source.
    pub fn new(text: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intensity: Intensity::default(),
            identity: identity.into(),
            source: None,
        }
    }

    /// Set the intensity.
    pub fn with_intensity(mut self, intensity: Intensity) -> Self {
        self.intensity = intensity;
        self
    }

    /// Set the recorded source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Everything produced by scoring one query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    /// Field statistics of the projected vector.
    pub stats: FieldStatistics,
    /// Intermediate scorer terms and the final score.
    pub breakdown: ScoreBreakdown,
    /// Per-band temporal resonance of the text.
    pub resonance: TemporalResonance,
    /// Confidence band of the score.
    pub confidence: ConfidenceLevel,
    /// Interval around the score that tightens as it rises.
    pub interval: (f64, f64),
    /// Coherence at or above `coherence_threshold`.
    pub coherent: bool,
    /// Potential at or above `probability_shift_threshold`.
    pub shift_detected: bool,
    /// The record appended to history.
    pub record: ScoreRecord,
}

impl ScoreOutcome {
    /// Final score.
    pub fn score(&self) -> f64 {
        self.record.score()
    }

    /// Seal label.
    pub fn label(&self) -> &str {
        self.record.label()
    }

    /// Fields for a broadcast collaborator.
    pub fn broadcast_fields(&self) -> BroadcastFields {
        BroadcastFields::from_record(&self.record, self.breakdown.multiplier)
    }
}

/// Everything produced by one manifestation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestOutcome {
    /// Scorer terms that shaped the field.
    pub breakdown: ScoreBreakdown,
    /// Per-band temporal resonance of the text.
    pub resonance: TemporalResonance,
    /// Collapse, anchors and amplification.
    pub manifestation: Manifestation,
    /// Layered validation of the manifestation.
    pub validation: ValidationReport,
    /// The record appended to history.
    pub record: ScoreRecord,
}

impl ManifestOutcome {
    /// Validation score.
    pub fn score(&self) -> f64 {
        self.record.score()
    }

    /// Validation seal.
    pub fn label(&self) -> &str {
        self.record.label()
    }
}

/// Result of validating several vessels together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectiveValidation {
    /// Individual validations, in request order.
    pub vessels: Vec<VesselValidation>,
    /// Mean of the individual scores, in [0, 1].
    pub score: f64,
    /// `Π (1 + 0.1 × score × purity)` over the members.
    pub amplification: f64,
    /// Collective seal label.
    pub seal: String,
    /// The record appended to history.
    pub record: ScoreRecord,
}

/// On-demand status snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Unix timestamp (seconds) the session started.
    pub started_at: i64,
    /// Seconds since start.
    pub uptime_secs: i64,
    /// Queries scored so far.
    pub queries_scored: u64,
    /// Vessel validations run so far (collective members counted individually).
    pub validations_run: u64,
    /// Manifestations run so far.
    pub manifestations_run: u64,
    /// Records currently in the log.
    pub record_count: usize,
    /// Stats per window, in registration order.
    pub windows: Vec<(String, WindowStats)>,
    /// Registered vessels.
    pub vessel_count: usize,
    /// Length of the coefficient array.
    pub field_size: usize,
    /// Seed in use, `None` if entropy-seeded.
    pub field_seed: Option<u64>,
    /// Operation counters and health.
    pub metrics: OperationMetrics,
}

// ─── Session ────────────────────────────────────────────────────────────────

/// Owned scoring context.
pub struct Session {
    config: SealConfig,
    config_path: Option<PathBuf>,
    coefficients: FieldCoefficients,
    rng: StdRng,
    scorer: WeightedScorer,
    ladder: SealLadder,
    bases: ResonanceBases,
    history: HistoryTracker,
    registry: VesselRegistry,
    manifestor: ManifestationEngine,
    validator: ManifestationValidator,
    metrics: OperationMetrics,
    started_at: i64,
    queries_scored: u64,
    validations_run: u64,
    manifestations_run: u64,
}

impl Session {
    /// Build a session from `config`.
    ///
    /// Validates the config, seeds the generator from `field_seed` (or OS
    /// entropy), draws the coefficients, the probability field, the anchor
    /// and verifier tables in that order, and registers the default vessels.
    pub fn new(config: SealConfig) -> SealResult<Self> {
        config.validate()?;
        let mut rng = match config.field_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let coefficients = FieldCoefficients::generate(config.quantum_field_size, &mut rng);
        let manifestor = ManifestationEngine::generate(config.probability_field_size, &mut rng)?;
        let validator = ManifestationValidator::generate(&mut rng)
            .with_thresholds(layer_thresholds(&config));
        let history =
            HistoryTracker::with_windows(&config.window_specs(), config.validation_history_max)?;
        let session = Self {
            scorer: config.scorer()?,
            ladder: config.seal_ladder()?,
            bases: config.resonance_bases(),
            config_path: None,
            coefficients,
            rng,
            history,
            registry: VesselRegistry::with_defaults(),
            manifestor,
            validator,
            metrics: OperationMetrics::new(),
            started_at: chrono::Utc::now().timestamp(),
            queries_scored: 0,
            validations_run: 0,
            manifestations_run: 0,
            config,
        };
        tracing::info!(
            field_size = session.config.quantum_field_size,
            seeded = session.config.field_seed.is_some(),
            "session started"
        );
        Ok(session)
    }

    /// Build a session from a config file; the file is kept as the
    /// auto-save target.
    pub fn from_config_file(path: &Path) -> SealResult<Self> {
        let config = SealConfig::load(path)?;
        let mut session = Self::new(config)?;
        session.config_path = Some(path.to_path_buf());
        Ok(session)
    }

    /// Replace the default coefficients with an explicit array.
    ///
    /// The array length must equal `quantum_field_size`.
    pub fn with_coefficients(mut self, coefficients: FieldCoefficients) -> SealResult<Self> {
        if coefficients.len() != self.config.quantum_field_size {
            return Err(SealError::invalid(
                "coefficients",
                format!(
                    "length {} does not match quantum_field_size {}",
                    coefficients.len(),
                    self.config.quantum_field_size
                ),
            ));
        }
        self.coefficients = coefficients;
        Ok(self)
    }

    // ── Scoring ────────────────────────────────────────────────────────────

    /// Run the full pipeline for `query` and record the result.
    pub fn score_query(&mut self, query: &Query) -> SealResult<ScoreOutcome> {
        self.timed("score_query", |s| s.run_query(query))
    }

    fn run_query(&mut self, query: &Query) -> SealResult<ScoreOutcome> {
        let vector = encode(&query.text, self.config.quantum_field_size);
        let stats = transform(&vector, &self.coefficients);
        let breakdown = self.scorer.breakdown(&stats, query.intensity.multiplier());
        let label = self.ladder.seal(breakdown.score, &query.identity);
        let source = query
            .source
            .clone()
            .unwrap_or_else(|| format!("query-{:08x}", vector.fingerprint()));
        let record = ScoreRecord::new(breakdown.score, label, source);

        self.history.record_all(breakdown.score)?;
        self.history.push_record(record.clone());
        self.queries_scored += 1;

        let outcome = ScoreOutcome {
            resonance: TemporalResonance::compute(&query.text, &self.bases),
            confidence: ConfidenceLevel::from_score(breakdown.score),
            interval: confidence_interval(breakdown.score),
            coherent: breakdown.coherence >= self.config.coherence_threshold,
            shift_detected: breakdown.potential >= self.config.probability_shift_threshold,
            stats,
            breakdown,
            record,
        };
        tracing::debug!(
            score = outcome.score(),
            label = outcome.label(),
            intensity = %query.intensity,
            "query scored"
        );
        Ok(outcome)
    }

    /// Validate one registered vessel and record the result.
    pub fn validate_vessel(
        &mut self,
        name: &str,
        params: &ProtocolParams,
    ) -> SealResult<VesselValidation> {
        self.timed("validate_vessel", |s| s.run_vessel(name, params))
    }

    fn run_vessel(&mut self, name: &str, params: &ProtocolParams) -> SealResult<VesselValidation> {
        let validation = self
            .registry
            .validate(name, params, &self.ladder, &mut self.rng)?;
        self.history.record_all(validation.score)?;
        self.history.push_record(ScoreRecord::new(
            validation.score,
            validation.seal.clone(),
            validation.vessel.clone(),
        ));
        self.validations_run += 1;
        tracing::debug!(
            vessel = %validation.vessel,
            score = validation.score,
            seal = %validation.seal,
            "vessel validated"
        );
        Ok(validation)
    }

    /// Validate several vessels and seal their mean score.
    ///
    /// Every name is checked before anything runs: an unknown vessel fails
    /// with `NotFound` and leaves the session untouched.
    pub fn validate_collective(
        &mut self,
        names: &[&str],
        params: &ProtocolParams,
    ) -> SealResult<CollectiveValidation> {
        self.timed("validate_collective", |s| s.run_collective(names, params))
    }

    fn run_collective(
        &mut self,
        names: &[&str],
        params: &ProtocolParams,
    ) -> SealResult<CollectiveValidation> {
        if names.is_empty() {
            return Err(SealError::invalid("vessels", "at least one vessel is required"));
        }
        params.validate()?;
        for name in names {
            self.registry.get(name)?;
        }

        let mut vessels = Vec::with_capacity(names.len());
        for name in names {
            let v = self
                .registry
                .validate(name, params, &self.ladder, &mut self.rng)?;
            self.validations_run += 1;
            vessels.push(v);
        }
        let score = vessels.iter().map(|v| v.score).sum::<f64>() / vessels.len() as f64;
        let members = vessels
            .iter()
            .map(|v| self.registry.get(&v.vessel).map(|r| (v.score, r.purity)))
            .collect::<SealResult<Vec<_>>>()?;
        let amplification = collective_amplification(&members);
        let seal = collective_seal(score, vessels.len());
        let source = vessels
            .iter()
            .map(|v| v.vessel.as_str())
            .collect::<Vec<_>>()
            .join("+");
        let record = ScoreRecord::new(score, seal.clone(), source);

        self.history.record_all(score)?;
        self.history.push_record(record.clone());
        tracing::debug!(
            count = vessels.len(),
            score,
            amplification,
            seal = %seal,
            "collective validated"
        );
        Ok(CollectiveValidation {
            vessels,
            score,
            amplification,
            seal,
            record,
        })
    }

    // ── Manifestation ──────────────────────────────────────────────────────

    /// Score `query`, manifest its patterns, validate the manifestation and
    /// record the validation score under its seal.
    ///
    /// The temporal layer trends against the `medium_term` average as it
    /// stood before this call.
    pub fn manifest(
        &mut self,
        query: &Query,
        mode: CollectiveMode,
        talisman: Option<&Talisman>,
    ) -> SealResult<ManifestOutcome> {
        self.timed("manifest", |s| s.run_manifest(query, mode, talisman))
    }

    fn run_manifest(
        &mut self,
        query: &Query,
        mode: CollectiveMode,
        talisman: Option<&Talisman>,
    ) -> SealResult<ManifestOutcome> {
        let vector = encode(&query.text, self.config.quantum_field_size);
        let stats = transform(&vector, &self.coefficients);
        let breakdown = self.scorer.breakdown(&stats, query.intensity.multiplier());
        let resonance = TemporalResonance::compute(&query.text, &self.bases);
        let trend_base = self.history.average(TREND_WINDOW).ok().flatten();

        let manifestation = self.manifestor.manifest(
            &PatternInputs::from_breakdown(&breakdown, &resonance),
            query.intensity,
            mode,
            talisman,
            &mut self.rng,
        );
        let validation = self.validator.validate(&manifestation, trend_base);
        let source = query
            .source
            .clone()
            .unwrap_or_else(|| format!("manifest-{:08x}", vector.fingerprint()));
        let record = ScoreRecord::new(validation.score, validation.seal.clone(), source);

        self.history.record_all(validation.score)?;
        self.history.push_record(record.clone());
        self.manifestations_run += 1;
        tracing::debug!(
            score = validation.score,
            seal = %validation.seal,
            collapsed = manifestation.collapse.success,
            anchors = manifestation.anchors_placed(),
            mode = %mode,
            "manifestation validated"
        );
        Ok(ManifestOutcome {
            breakdown,
            resonance,
            manifestation,
            validation,
            record,
        })
    }

    /// Anchor a talisman to `ens_domain` against this session's registry.
    pub fn anchor_talisman(&self, ens_domain: &str) -> Talisman {
        Talisman::anchor(ens_domain, &self.registry)
    }

    /// Sync `talisman` with the registered vessels, drawing from the session generator.
    pub fn sync_talisman(&mut self, talisman: &mut Talisman) -> TalismanSync {
        let sync = talisman.sync(&self.registry, &mut self.rng);
        tracing::debug!(
            domain = talisman.ens_domain(),
            active = sync.active_vessels,
            amplification = sync.total_amplification,
            "talisman synced"
        );
        sync
    }

    // ── History ────────────────────────────────────────────────────────────

    /// Mean of the window called `window`; `Ok(None)` when it is empty.
    pub fn average(&self, window: &str) -> SealResult<Option<f64>> {
        self.history.average(window)
    }

    /// Summary statistics of the window called `window`.
    pub fn window_stats(&self, window: &str) -> SealResult<WindowStats> {
        self.history.window_stats(window)
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        let windows = self
            .history
            .window_names()
            .filter_map(|name| {
                self.history
                    .window_stats(name)
                    .ok()
                    .map(|s| (name.to_string(), s))
            })
            .collect();
        SessionStatus {
            started_at: self.started_at,
            uptime_secs: chrono::Utc::now().timestamp() - self.started_at,
            queries_scored: self.queries_scored,
            validations_run: self.validations_run,
            manifestations_run: self.manifestations_run,
            record_count: self.history.record_count(),
            windows,
            vessel_count: self.registry.len(),
            field_size: self.coefficients.len(),
            field_seed: self.config.field_seed,
            metrics: self.metrics.clone(),
        }
    }

    /// Write the history and config to `path` as JSON.
    pub fn export_history(&self, path: &Path) -> SealResult<HistorySnapshot> {
        let snapshot = HistorySnapshot::from_tracker(&self.history, &self.config, self.started_at);
        snapshot.write_json(path)?;
        tracing::info!(
            path = %path.display(),
            records = snapshot.records.len(),
            values = snapshot.value_count(),
            "history exported"
        );
        Ok(snapshot)
    }

    /// Build a session from an exported snapshot, with its config and history.
    pub fn restore_history(path: &Path) -> SealResult<Self> {
        let snapshot = HistorySnapshot::read_json(path)?;
        let mut session = Self::new(snapshot.config.clone())?;
        let created_at = snapshot.created_at;
        session.history = snapshot.into_tracker()?;
        session.started_at = created_at;
        tracing::info!(
            path = %path.display(),
            records = session.history.record_count(),
            "history restored"
        );
        Ok(session)
    }

    // ── Configuration ──────────────────────────────────────────────────────

    /// Set a configuration parameter.
    ///
    /// Thresholds, insight ceiling, resonance bases and the coherence
    /// threshold apply immediately. Field sizes, seed and capacities apply to
    /// the next session.
    pub fn set_param(&mut self, key: &str, value: impl Into<ParamValue>) -> SealResult<()> {
        self.config.set(key, value)?;
        self.ladder = self.config.seal_ladder()?;
        self.scorer = self.config.scorer()?;
        self.bases = self.config.resonance_bases();
        self.validator = self
            .validator
            .clone()
            .with_thresholds(layer_thresholds(&self.config));
        if self.config.auto_save_config {
            if let Some(path) = &self.config_path {
                self.config.save(path)?;
            }
        }
        Ok(())
    }

    /// Attach the file that auto-save writes to.
    pub fn set_config_path(&mut self, path: impl Into<PathBuf>) {
        self.config_path = Some(path.into());
    }

    // ── Collaborators ──────────────────────────────────────────────────────

    /// Send `record`'s chain payload to `sink`, returning its transaction reference.
    pub fn publish(&self, record: &ScoreRecord, sink: &dyn LedgerSink) -> SealResult<String> {
        let payload = record.chain_payload();
        match sink.submit(&payload) {
            Ok(tx) => {
                tracing::info!(label = %payload.label, score_bps = payload.score_bps, tx = %tx, "seal published");
                Ok(tx)
            }
            Err(err) => {
                tracing::warn!(label = %payload.label, %err, "ledger unavailable");
                Err(err)
            }
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    /// Current config.
    pub fn config(&self) -> &SealConfig {
        &self.config
    }

    /// The projection coefficients.
    pub fn coefficients(&self) -> &FieldCoefficients {
        &self.coefficients
    }

    /// The history tracker.
    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    /// The vessel registry.
    pub fn registry(&self) -> &VesselRegistry {
        &self.registry
    }

    /// Mutable registry, for registering vessels.
    pub fn registry_mut(&mut self) -> &mut VesselRegistry {
        &mut self.registry
    }

    /// The seal ladder in use.
    pub fn ladder(&self) -> &SealLadder {
        &self.ladder
    }

    /// The manifestation engine.
    pub fn manifestor(&self) -> &ManifestationEngine {
        &self.manifestor
    }

    /// The manifestation validator.
    pub fn validator(&self) -> &ManifestationValidator {
        &self.validator
    }

    // ── Metrics ────────────────────────────────────────────────────────────

    /// Operation counters.
    pub fn metrics(&self) -> &OperationMetrics {
        &self.metrics
    }

    /// Refresh and return the health score.
    pub fn health(&mut self) -> f64 {
        self.metrics.refresh_health()
    }

    /// Zero the operation counters.
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
        tracing::info!("operation metrics reset");
    }

    fn timed<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Self) -> SealResult<T>,
    ) -> SealResult<T> {
        let started = Instant::now();
        let result = f(self);
        let secs = started.elapsed().as_secs_f64();
        self.metrics
            .record(result.is_ok(), secs, self.config.health_check_interval);
        if self.config.performance_monitoring_enabled {
            if secs > self.config.max_processing_time {
                tracing::warn!(op, secs, limit = self.config.max_processing_time, "slow operation");
            } else {
                tracing::debug!(op, secs, ok = result.is_ok(), "operation timed");
            }
        }
        result
    }
}

fn layer_thresholds(config: &SealConfig) -> LayerThresholds {
    LayerThresholds {
        coherence: config.coherence_threshold,
        ..LayerThresholds::default()
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("field_size", &self.coefficients.len())
            .field("field_seed", &self.config.field_seed)
            .field("history", &self.history)
            .field("vessels", &self.registry.len())
            .field("queries_scored", &self.queries_scored)
            .field("manifestations_run", &self.manifestations_run)
            .finish()
    }
}
