//! Session configuration: typed fields plus a flat key/value surface.
//!
//! Every known key has a type-specific validator; a value that fails is
//! rejected with `InvalidParameter` and the previous value is kept. Unknown
//! keys are accepted as-is into [`SealConfig::extra`].
//!
//! Structural keys (`quantum_field_size`, `probability_field_size`,
//! `field_seed`, window capacities, `validation_history_max`) are read when a [`Session`](crate::session::Session)
//! is built; changing them on a live session affects the next one.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SealError, SealResult};
use crate::history::WindowSpec;
use crate::resonance::ResonanceBases;
use crate::scorer::{ScoreWeights, WeightedScorer};
use crate::sealer::SealLadder;

/// Largest accepted `quantum_field_size`.
pub const MAX_FIELD_SIZE: usize = 4096;

/// Largest accepted `field_seed`; seeds travel as signed integers on the flat surface.
pub const MAX_FIELD_SEED: u64 = i64::MAX as u64;

// ─── ParamValue ─────────────────────────────────────────────────────────────

/// A value on the flat configuration surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
    /// Free text.
    Text(String),
    /// Any other JSON value (arrays, objects, null). Only unknown keys hold these.
    Json(serde_json::Value),
}

impl ParamValue {
    /// Numeric view: integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ParamValue::Int(i) => Some(i as f64),
            ParamValue::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Integer view. Floats are not coerced.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ParamValue::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Boolean view.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ParamValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        ParamValue::Json(v)
    }
}

/// One accepted change on the flat surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamChange {
    /// Key that changed.
    pub key: String,
    /// Value before the change, `None` if the key was unset.
    pub old_value: Option<ParamValue>,
    /// Value after the change.
    pub new_value: ParamValue,
    /// Unix timestamp (seconds).
    pub timestamp: i64,
}

// ─── SealConfig ─────────────────────────────────────────────────────────────

/// Runtime configuration for a scoring session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SealConfig {
    /// Length of the encoded vector and the coefficient array. Default 369.
    pub quantum_field_size: usize,
    /// Seed for every random draw in the session. `None` seeds from OS entropy.
    pub field_seed: Option<u64>,
    /// Length of the manifestation probability field. Default 369.
    pub probability_field_size: usize,
    /// Alpha resonance base. Default 0.369.
    pub temporal_resonance_alpha: f64,
    /// Beta resonance base. Default 0.666.
    pub temporal_resonance_beta: f64,
    /// Gamma resonance base. Default 0.999.
    pub temporal_resonance_gamma: f64,
    /// Ceiling of the insight-strength term. Default 10.0.
    pub insight_strength_max: f64,
    /// Supreme seal threshold. Default 0.9.
    pub seal_threshold_supreme: f64,
    /// Royal seal threshold. Default 0.8.
    pub seal_threshold_royal: f64,
    /// Blue-flame seal threshold. Default 0.7.
    pub seal_threshold_blue_flame: f64,
    /// Approved seal threshold. Default 0.6.
    pub seal_threshold_approved: f64,
    /// `short_term` window capacity. Default 10.
    pub short_term_capacity: usize,
    /// `medium_term` window capacity. Default 100.
    pub medium_term_capacity: usize,
    /// `long_term` window capacity. Default 1000.
    pub long_term_capacity: usize,
    /// Capacity of the record log. Default 1000.
    pub validation_history_max: usize,
    /// Minimum coherence reported as "coherent" in outcomes. Default 0.369.
    pub coherence_threshold: f64,
    /// Minimum potential reported as a meaningful shift. Default 0.05.
    pub probability_shift_threshold: f64,
    /// Emit per-query timing at debug level. Default true.
    pub performance_monitoring_enabled: bool,
    /// Processing time (seconds) above which a query is logged as slow. Default 30.
    pub max_processing_time: f64,
    /// Persist the config after every accepted `set` when a path is attached. Default false.
    pub auto_save_config: bool,
    /// Operations between health score refreshes. Default 50.
    pub health_check_interval: u64,
    /// Unknown keys, accepted without validation. Any JSON shape is kept.
    #[serde(flatten)]
    pub extra: BTreeMap<String, ParamValue>,
    #[serde(skip)]
    changes: Vec<ParamChange>,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            quantum_field_size: 369,
            field_seed: None,
            probability_field_size: 369,
            temporal_resonance_alpha: 0.369,
            temporal_resonance_beta: 0.666,
            temporal_resonance_gamma: 0.999,
            insight_strength_max: 10.0,
            seal_threshold_supreme: 0.9,
            seal_threshold_royal: 0.8,
            seal_threshold_blue_flame: 0.7,
            seal_threshold_approved: 0.6,
            short_term_capacity: 10,
            medium_term_capacity: 100,
            long_term_capacity: 1000,
            validation_history_max: 1000,
            coherence_threshold: 0.369,
            probability_shift_threshold: 0.05,
            performance_monitoring_enabled: true,
            max_processing_time: 30.0,
            auto_save_config: false,
            health_check_interval: 50,
            extra: BTreeMap::new(),
            changes: Vec::new(),
        }
    }
}

impl SealConfig {
    /// Default config with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            field_seed: Some(seed),
            ..Self::default()
        }
    }

    /// Validate every typed field.
    pub fn validate(&self) -> SealResult<()> {
        if !(1..=MAX_FIELD_SIZE).contains(&self.quantum_field_size) {
            return Err(SealError::invalid(
                "quantum_field_size",
                format!("must be in [1, {MAX_FIELD_SIZE}], got {}", self.quantum_field_size),
            ));
        }
        if !(1..=MAX_FIELD_SIZE).contains(&self.probability_field_size) {
            return Err(SealError::invalid(
                "probability_field_size",
                format!("must be in [1, {MAX_FIELD_SIZE}], got {}", self.probability_field_size),
            ));
        }
        if self.health_check_interval < 1 {
            return Err(SealError::invalid("health_check_interval", "must be >= 1, got 0"));
        }
        if let Some(seed) = self.field_seed.filter(|&s| s > MAX_FIELD_SEED) {
            return Err(SealError::invalid(
                "field_seed",
                format!("must be in [0, {MAX_FIELD_SEED}], got {seed}"),
            ));
        }
        for (key, v) in [
            ("temporal_resonance_alpha", self.temporal_resonance_alpha),
            ("temporal_resonance_beta", self.temporal_resonance_beta),
            ("temporal_resonance_gamma", self.temporal_resonance_gamma),
            ("coherence_threshold", self.coherence_threshold),
            ("probability_shift_threshold", self.probability_shift_threshold),
        ] {
            check_unit(key, v)?;
        }
        check_positive("insight_strength_max", self.insight_strength_max)?;
        check_positive("max_processing_time", self.max_processing_time)?;
        for (key, v) in [
            ("short_term_capacity", self.short_term_capacity),
            ("medium_term_capacity", self.medium_term_capacity),
            ("long_term_capacity", self.long_term_capacity),
            ("validation_history_max", self.validation_history_max),
        ] {
            if v < 1 {
                return Err(SealError::invalid(key, format!("must be >= 1, got {v}")));
            }
        }
        self.seal_ladder()?;
        Ok(())
    }

    /// Parse from JSON and validate.
    pub fn from_json(json: &str) -> SealResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SealError::Persistence(format!("config JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty JSON rendering, unknown keys included.
    pub fn to_json_pretty(&self) -> SealResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SealError::Persistence(format!("config JSON encode error: {e}")))
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> SealResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            SealError::Persistence(format!("failed to read config at {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Write the config to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> SealResult<()> {
        let json = self.to_json_pretty()?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                SealError::Persistence(format!("failed to create {}: {e}", dir.display()))
            })?;
        }
        fs::write(path, json).map_err(|e| {
            SealError::Persistence(format!("failed to write config to {}: {e}", path.display()))
        })
    }

    // ── Flat surface ───────────────────────────────────────────────────────

    /// Current value of `key`, known or extra.
    pub fn get(&self, key: &str) -> Option<ParamValue> {
        let v = match key {
            "quantum_field_size" => ParamValue::Int(self.quantum_field_size as i64),
            "field_seed" => {
                return self
                    .field_seed
                    .and_then(|s| i64::try_from(s).ok())
                    .map(ParamValue::Int)
            }
            "probability_field_size" => ParamValue::Int(self.probability_field_size as i64),
            "health_check_interval" => ParamValue::Int(self.health_check_interval as i64),
            "temporal_resonance_alpha" => self.temporal_resonance_alpha.into(),
            "temporal_resonance_beta" => self.temporal_resonance_beta.into(),
            "temporal_resonance_gamma" => self.temporal_resonance_gamma.into(),
            "insight_strength_max" => self.insight_strength_max.into(),
            "seal_threshold_supreme" => self.seal_threshold_supreme.into(),
            "seal_threshold_royal" => self.seal_threshold_royal.into(),
            "seal_threshold_blue_flame" => self.seal_threshold_blue_flame.into(),
            "seal_threshold_approved" => self.seal_threshold_approved.into(),
            "short_term_capacity" => ParamValue::Int(self.short_term_capacity as i64),
            "medium_term_capacity" => ParamValue::Int(self.medium_term_capacity as i64),
            "long_term_capacity" => ParamValue::Int(self.long_term_capacity as i64),
            "validation_history_max" => ParamValue::Int(self.validation_history_max as i64),
            "coherence_threshold" => self.coherence_threshold.into(),
            "probability_shift_threshold" => self.probability_shift_threshold.into(),
            "performance_monitoring_enabled" => self.performance_monitoring_enabled.into(),
            "max_processing_time" => self.max_processing_time.into(),
            "auto_save_config" => self.auto_save_config.into(),
            _ => return self.extra.get(key).cloned(),
        };
        Some(v)
    }

    /// Set `key` to `value` after running its validator.
    ///
    /// On rejection the previous value is retained and nothing is logged in
    /// the change history.
    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) -> SealResult<()> {
        let value = value.into();
        let old_value = self.get(key);
        if let Err(err) = self.apply(key, &value) {
            tracing::warn!(key, %err, "rejected configuration value");
            return Err(err);
        }
        tracing::debug!(key, ?old_value, new_value = ?value, "configuration updated");
        self.changes.push(ParamChange {
            key: key.to_string(),
            old_value,
            new_value: value,
            timestamp: chrono::Utc::now().timestamp(),
        });
        Ok(())
    }

    /// Accepted changes, oldest first.
    pub fn changes(&self) -> &[ParamChange] {
        &self.changes
    }

    fn apply(&mut self, key: &str, value: &ParamValue) -> SealResult<()> {
        match key {
            "quantum_field_size" => {
                self.quantum_field_size = int_in(key, value, 1, MAX_FIELD_SIZE as i64)? as usize;
            }
            "field_seed" => {
                self.field_seed = Some(int_in(key, value, 0, i64::MAX)? as u64);
            }
            "probability_field_size" => {
                self.probability_field_size = int_in(key, value, 1, MAX_FIELD_SIZE as i64)? as usize;
            }
            "health_check_interval" => {
                self.health_check_interval = int_in(key, value, 1, i64::MAX)? as u64;
            }
            "temporal_resonance_alpha" => self.temporal_resonance_alpha = unit(key, value)?,
            "temporal_resonance_beta" => self.temporal_resonance_beta = unit(key, value)?,
            "temporal_resonance_gamma" => self.temporal_resonance_gamma = unit(key, value)?,
            "insight_strength_max" => self.insight_strength_max = positive(key, value)?,
            "seal_threshold_supreme"
            | "seal_threshold_royal"
            | "seal_threshold_blue_flame"
            | "seal_threshold_approved" => {
                let v = unit(key, value)?;
                let mut candidate = [
                    self.seal_threshold_supreme,
                    self.seal_threshold_royal,
                    self.seal_threshold_blue_flame,
                    self.seal_threshold_approved,
                ];
                let slot = match key {
                    "seal_threshold_supreme" => 0,
                    "seal_threshold_royal" => 1,
                    "seal_threshold_blue_flame" => 2,
                    _ => 3,
                };
                candidate[slot] = v;
                SealLadder::new(candidate[0], candidate[1], candidate[2], candidate[3])
                    .map_err(|e| SealError::invalid(key, e.to_string()))?;
                self.seal_threshold_supreme = candidate[0];
                self.seal_threshold_royal = candidate[1];
                self.seal_threshold_blue_flame = candidate[2];
                self.seal_threshold_approved = candidate[3];
            }
            "short_term_capacity" => self.short_term_capacity = int_in(key, value, 1, i64::MAX)? as usize,
            "medium_term_capacity" => self.medium_term_capacity = int_in(key, value, 1, i64::MAX)? as usize,
            "long_term_capacity" => self.long_term_capacity = int_in(key, value, 1, i64::MAX)? as usize,
            "validation_history_max" => {
                self.validation_history_max = int_in(key, value, 1, i64::MAX)? as usize;
            }
            "coherence_threshold" => self.coherence_threshold = unit(key, value)?,
            "probability_shift_threshold" => self.probability_shift_threshold = unit(key, value)?,
            "performance_monitoring_enabled" => self.performance_monitoring_enabled = boolean(key, value)?,
            "max_processing_time" => self.max_processing_time = positive(key, value)?,
            "auto_save_config" => self.auto_save_config = boolean(key, value)?,
            _ => {
                self.extra.insert(key.to_string(), value.clone());
            }
        }
        Ok(())
    }

    // ── Derived components ─────────────────────────────────────────────────

    /// Seal ladder from the four thresholds.
    pub fn seal_ladder(&self) -> SealResult<SealLadder> {
        SealLadder::new(
            self.seal_threshold_supreme,
            self.seal_threshold_royal,
            self.seal_threshold_blue_flame,
            self.seal_threshold_approved,
        )
    }

    /// Scorer with default weights and the configured insight ceiling.
    pub fn scorer(&self) -> SealResult<WeightedScorer> {
        WeightedScorer::with_weights(ScoreWeights::default(), self.insight_strength_max)
    }

    /// The four standard windows at the configured capacities.
    pub fn window_specs(&self) -> Vec<WindowSpec> {
        WindowSpec::standard(
            self.short_term_capacity,
            self.medium_term_capacity,
            self.long_term_capacity,
        )
    }

    /// Resonance bases; delta is fixed.
    pub fn resonance_bases(&self) -> ResonanceBases {
        ResonanceBases {
            alpha: self.temporal_resonance_alpha,
            beta: self.temporal_resonance_beta,
            gamma: self.temporal_resonance_gamma,
            ..ResonanceBases::default()
        }
    }
}

// ─── Validators ─────────────────────────────────────────────────────────────

fn check_unit(key: &str, v: f64) -> SealResult<()> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(SealError::invalid(key, format!("must be in [0, 1], got {v}")))
    }
}

fn check_positive(key: &str, v: f64) -> SealResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(SealError::invalid(key, format!("must be finite and > 0, got {v}")))
    }
}

fn number(key: &str, value: &ParamValue) -> SealResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| SealError::invalid(key, format!("expected a number, got {value:?}")))
}

fn unit(key: &str, value: &ParamValue) -> SealResult<f64> {
    let v = number(key, value)?;
    check_unit(key, v)?;
    Ok(v)
}

fn positive(key: &str, value: &ParamValue) -> SealResult<f64> {
    let v = number(key, value)?;
    check_positive(key, v)?;
    Ok(v)
}

fn int_in(key: &str, value: &ParamValue, lo: i64, hi: i64) -> SealResult<i64> {
    let v = value
        .as_i64()
        .ok_or_else(|| SealError::invalid(key, format!("expected an integer, got {value:?}")))?;
    if (lo..=hi).contains(&v) {
        Ok(v)
    } else {
        Err(SealError::invalid(key, format!("must be in [{lo}, {hi}], got {v}")))
    }
}

fn boolean(key: &str, value: &ParamValue) -> SealResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| SealError::invalid(key, format!("expected a boolean, got {value:?}")))
}
