//! Python FFI bindings via PyO3.
//!
//! Exposes a scoring [`Session`](crate::session::Session) plus the stateless
//! `encode` and `seal` helpers.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from seal_core import Session, encode, seal
//!
//! session = Session(seed=42)
//! out = session.score_query("manifest clarity", "TEST", intensity="absolute")
//! print(out.score, out.label)
//! print(session.average("short_term"))
//!
//! score, label = session.validate_vessel("vlatko")
//! score, seal = session.manifest("eternal flame", "TEST", mode="family_bloodline", talisman="vortex369.eth")
//! session.set_param("seal_threshold_approved", 0.55)
//! session.export_history("history.json")
//!
//! # ledger: any callable (label: str, score_bps: int) -> str
//! tx = session.publish_last(lambda label, bps: f"0x{bps:04x}")
//! ```

use std::path::Path;

use pyo3::exceptions::{PyConnectionError, PyIOError, PyKeyError, PyValueError};
use pyo3::prelude::*;

use crate::collab::ExternalLedger;
use crate::config::{ParamValue, SealConfig};
use crate::error::SealError;
use crate::manifest::CollectiveMode;
use crate::record::ChainPayload;
use crate::registry::ProtocolParams;
use crate::scorer::Intensity;
use crate::session::{Query, ScoreOutcome, Session};

fn to_py_err(err: SealError) -> PyErr {
    match err {
        SealError::InvalidParameter { .. } => PyValueError::new_err(err.to_string()),
        SealError::NotFound { .. } => PyKeyError::new_err(err.to_string()),
        SealError::UpstreamUnavailable(_) => PyConnectionError::new_err(err.to_string()),
        SealError::Persistence(_) => PyIOError::new_err(err.to_string()),
    }
}

fn to_param(value: &Bound<'_, PyAny>) -> PyResult<ParamValue> {
    // bool first: Python bools also extract as int.
    if let Ok(b) = value.extract::<bool>() {
        return Ok(ParamValue::Bool(b));
    }
    if let Ok(i) = value.extract::<i64>() {
        return Ok(ParamValue::Int(i));
    }
    if let Ok(f) = value.extract::<f64>() {
        return Ok(ParamValue::Float(f));
    }
    if let Ok(s) = value.extract::<String>() {
        return Ok(ParamValue::Text(s));
    }
    Err(PyValueError::new_err("value must be bool, int, float or str"))
}

fn from_param(py: Python<'_>, value: ParamValue) -> PyObject {
    match value {
        ParamValue::Int(i) => i.into_py(py),
        ParamValue::Float(f) => f.into_py(py),
        ParamValue::Bool(b) => b.into_py(py),
        ParamValue::Text(s) => s.into_py(py),
        // Structured values cross as their JSON text.
        ParamValue::Json(v) => v.to_string().into_py(py),
    }
}

// ── ScoreOutcome ──────────────────────────────────────────────────────────────

/// Result of scoring one query.
#[pyclass(name = "ScoreOutcome")]
#[derive(Clone)]
pub struct PyScoreOutcome {
    inner: ScoreOutcome,
}

#[pymethods]
impl PyScoreOutcome {
    /// Final score in [0.0, 1.0].
    #[getter]
    pub fn score(&self) -> f64 {
        self.inner.score()
    }
    /// Seal label.
    #[getter]
    pub fn label(&self) -> String {
        self.inner.label().to_string()
    }
    /// Recorded source.
    #[getter]
    pub fn source(&self) -> String {
        self.inner.record.source().to_string()
    }
    /// Coherence term.
    #[getter]
    pub fn coherence(&self) -> f64 {
        self.inner.breakdown.coherence
    }
    /// Insight-strength term.
    #[getter]
    pub fn insight_strength(&self) -> f64 {
        self.inner.breakdown.insight_strength
    }
    /// Potential term.
    #[getter]
    pub fn potential(&self) -> f64 {
        self.inner.breakdown.potential
    }
    /// Intensity multiplier.
    #[getter]
    pub fn multiplier(&self) -> f64 {
        self.inner.breakdown.multiplier
    }
    /// Field statistics as (mean, stddev, max_abs, entropy).
    #[getter]
    pub fn stats(&self) -> (f64, f64, f64, f64) {
        let s = &self.inner.stats;
        (s.mean, s.stddev, s.max_abs, s.entropy)
    }
    /// Confidence band description.
    #[getter]
    pub fn confidence(&self) -> &'static str {
        self.inner.confidence.as_str()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!(
            "ScoreOutcome(score={:.4}, label={:?})",
            self.inner.score(),
            self.inner.label()
        )
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Owned scoring session.
///
/// Example::
///
///     session = Session(seed=7)
///     out = session.score_query("hello", "TEST")
///     print(out.label)
#[pyclass(name = "Session")]
pub struct PySession {
    inner: Session,
}

#[pymethods]
impl PySession {
    /// Create a session.
    ///
    /// Args:
    ///     seed:        field seed; None seeds from OS entropy
    ///     config_json: optional JSON config; `seed` overrides its field_seed
    #[new]
    #[pyo3(signature = (seed=None, config_json=None))]
    pub fn new(seed: Option<u64>, config_json: Option<&str>) -> PyResult<Self> {
        let mut config = match config_json {
            Some(json) => SealConfig::from_json(json).map_err(to_py_err)?,
            None => SealConfig::default(),
        };
        if seed.is_some() {
            config.field_seed = seed;
        }
        Ok(Self {
            inner: Session::new(config).map_err(to_py_err)?,
        })
    }

    /// Restore a session from an exported history file.
    #[staticmethod]
    pub fn restore_history(path: &str) -> PyResult<Self> {
        Ok(Self {
            inner: Session::restore_history(Path::new(path)).map_err(to_py_err)?,
        })
    }

    /// Score `text` and seal it with `identity`.
    ///
    /// Args:
    ///     intensity: subtle | focused | temporal | collective | absolute
    #[pyo3(signature = (text, identity, intensity="focused", source=None))]
    pub fn score_query(
        &mut self,
        text: &str,
        identity: &str,
        intensity: &str,
        source: Option<String>,
    ) -> PyResult<PyScoreOutcome> {
        let intensity: Intensity = intensity.parse().map_err(to_py_err)?;
        let mut query = Query::new(text, identity).with_intensity(intensity);
        query.source = source;
        let inner = self.inner.score_query(&query).map_err(to_py_err)?;
        Ok(PyScoreOutcome { inner })
    }

    /// Validate one vessel. Returns (score, seal).
    #[pyo3(signature = (name, intensity=1.0, duration_secs=60.0, power=1.0))]
    pub fn validate_vessel(
        &mut self,
        name: &str,
        intensity: f64,
        duration_secs: f64,
        power: f64,
    ) -> PyResult<(f64, String)> {
        let params = ProtocolParams {
            intensity,
            duration_secs,
            power,
        };
        let v = self.inner.validate_vessel(name, &params).map_err(to_py_err)?;
        Ok((v.score, v.seal))
    }

    /// Validate several vessels together. Returns (score, seal).
    #[pyo3(signature = (names, intensity=1.0, duration_secs=60.0, power=1.0))]
    pub fn validate_collective(
        &mut self,
        names: Vec<String>,
        intensity: f64,
        duration_secs: f64,
        power: f64,
    ) -> PyResult<(f64, String)> {
        let params = ProtocolParams {
            intensity,
            duration_secs,
            power,
        };
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let c = self
            .inner
            .validate_collective(&names, &params)
            .map_err(to_py_err)?;
        Ok((c.score, c.seal))
    }

    /// Manifest `text` and seal the validation score. Returns (score, seal).
    ///
    /// Args:
    ///     mode:     individual | family_bloodline | community_resonance |
    ///               global_synchronization | universal_alignment
    ///     talisman: ENS domain to anchor a talisman to, or None
    #[pyo3(signature = (text, identity, intensity="focused", mode="individual", talisman=None))]
    pub fn manifest(
        &mut self,
        text: &str,
        identity: &str,
        intensity: &str,
        mode: &str,
        talisman: Option<&str>,
    ) -> PyResult<(f64, String)> {
        let intensity: Intensity = intensity.parse().map_err(to_py_err)?;
        let mode: CollectiveMode = mode.parse().map_err(to_py_err)?;
        let talisman = talisman.map(|domain| self.inner.anchor_talisman(domain));
        let query = Query::new(text, identity).with_intensity(intensity);
        let out = self
            .inner
            .manifest(&query, mode, talisman.as_ref())
            .map_err(to_py_err)?;
        Ok((out.score(), out.label().to_string()))
    }

    /// Refreshed health score in [0, 1].
    pub fn health(&mut self) -> f64 {
        self.inner.health()
    }

    /// Mean of a window, or None when empty.
    pub fn average(&self, window: &str) -> PyResult<Option<f64>> {
        self.inner.average(window).map_err(to_py_err)
    }

    /// Set a configuration parameter.
    pub fn set_param(&mut self, key: &str, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let value = to_param(value)?;
        self.inner.set_param(key, value).map_err(to_py_err)
    }

    /// Read a configuration parameter, or None if unset.
    pub fn get_param(&self, py: Python<'_>, key: &str) -> Option<PyObject> {
        self.inner.config().get(key).map(|v| from_param(py, v))
    }

    /// Status snapshot as a JSON string.
    pub fn status_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.status())
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Write the history to `path` as JSON.
    pub fn export_history(&self, path: &str) -> PyResult<()> {
        self.inner
            .export_history(Path::new(path))
            .map(|_| ())
            .map_err(to_py_err)
    }

    /// Publish the most recent record through `submit(label, score_bps) -> str`.
    pub fn publish_last(&self, submit: PyObject) -> PyResult<String> {
        let record = self
            .inner
            .history()
            .records()
            .last()
            .cloned()
            .ok_or_else(|| PyValueError::new_err("no records to publish"))?;
        let sink = ExternalLedger::new(move |p: &ChainPayload| {
            Python::with_gil(|py| {
                submit
                    .call1(py, (p.label.clone(), p.score_bps))
                    .and_then(|r| r.extract::<String>(py))
                    .map_err(|e| e.to_string())
            })
        });
        self.inner.publish(&record, &sink).map_err(to_py_err)
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        let s = self.inner.status();
        format!(
            "Session(field_size={}, seed={:?}, records={})",
            s.field_size, s.field_seed, s.record_count
        )
    }
}

// ── Free functions ────────────────────────────────────────────────────────────

/// Encode `text` into a normalised vector of `length` floats.
#[pyfunction]
#[pyo3(name = "encode")]
pub fn py_encode(text: &str, length: usize) -> Vec<f64> {
    crate::encoder::encode(text, length).as_slice().to_vec()
}

/// Seal label for `score` on the default ladder.
#[pyfunction]
#[pyo3(name = "seal")]
pub fn py_seal(score: f64, identity: &str) -> String {
    crate::sealer::seal(score, identity)
}

// ── Module entry point ────────────────────────────────────────────────────────

/// seal-core Python bindings.
#[pymodule]
pub fn seal_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySession>()?;
    m.add_class::<PyScoreOutcome>()?;
    m.add_function(wrap_pyfunction!(py_encode, m)?)?;
    m.add_function(wrap_pyfunction!(py_seal, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
