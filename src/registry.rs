//! Vessel registry and weighted validation protocols.
//!
//! A vessel is a named identity with fixed attributes. Validating a vessel
//! runs four protocols, combines their scores by weight, and seals the result
//! with the vessel's signature as the identity.
//!
//! | Protocol | Threshold | Weight |
//! |---|---|---|
//! | Purity | 0.8 | 0.30 |
//! | Coherence alignment | 0.369 | 0.25 |
//! | Temporal stability | 0.666 | 0.25 |
//! | Reality alteration | 0.7 | 0.20 |
//!
//! Two protocols draw a uniform jitter from the caller's generator, so a
//! seeded generator pins the outcome.

use hashbrown::HashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SealError, SealResult};
use crate::scorer::clamp_finite;
use crate::sealer::SealLadder;

/// Resonance frequency every vessel is aligned against.
pub const BASELINE_COHERENCE: f64 = 0.369;

/// Stability constant used by the temporal stability protocol.
pub const BASELINE_STABILITY: f64 = 0.999;

/// Test duration (seconds) at which the stability bonus saturates.
const STABILITY_SATURATION_SECS: f64 = 300.0;

// ─── Vessel ─────────────────────────────────────────────────────────────────

/// One registered identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VesselRecord {
    /// Display name.
    pub name: String,
    /// ENS anchor.
    pub ens_domain: String,
    /// Purity in [0, 1].
    pub purity: f64,
    /// Identity string sealed into labels.
    pub signature: String,
    /// Connection strength in [0, 1].
    pub connection_strength: f64,
    /// Resonance frequency in (0, 1].
    pub resonance_frequency: f64,
    /// Successful validations so far.
    pub validations: u32,
}

impl VesselRecord {
    fn preset(
        name: &str,
        ens_domain: &str,
        purity: f64,
        signature: &str,
        connection_strength: f64,
        resonance_frequency: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            ens_domain: ens_domain.to_string(),
            purity,
            signature: signature.to_string(),
            connection_strength,
            resonance_frequency,
            validations: 0,
        }
    }
}

// ─── Protocols ──────────────────────────────────────────────────────────────

/// The four validation protocols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Signature verification against purity.
    Purity,
    /// Alignment of the vessel frequency with the baseline.
    CoherenceAlignment,
    /// Persistence over the test duration.
    TemporalStability,
    /// Impact scaled by purity and power.
    RealityAlteration,
}

impl Protocol {
    /// All protocols in evaluation order.
    pub const ALL: [Protocol; 4] = [
        Protocol::Purity,
        Protocol::CoherenceAlignment,
        Protocol::TemporalStability,
        Protocol::RealityAlteration,
    ];

    /// Pass threshold.
    pub fn threshold(self) -> f64 {
        match self {
            Protocol::Purity => 0.8,
            Protocol::CoherenceAlignment => 0.369,
            Protocol::TemporalStability => 0.666,
            Protocol::RealityAlteration => 0.7,
        }
    }

    /// Weight in the combined score.
    pub fn weight(self) -> f64 {
        match self {
            Protocol::Purity => 0.3,
            Protocol::CoherenceAlignment => 0.25,
            Protocol::TemporalStability => 0.25,
            Protocol::RealityAlteration => 0.2,
        }
    }

    fn run<R: Rng + ?Sized>(self, vessel: &VesselRecord, params: &ProtocolParams, rng: &mut R) -> f64 {
        match self {
            Protocol::Purity => {
                let jitter = 0.9 + 0.2 * rng.gen::<f64>();
                (vessel.purity * params.intensity * jitter).min(1.0)
            }
            Protocol::CoherenceAlignment => {
                let f = vessel.resonance_frequency;
                let denom = f.max(BASELINE_COHERENCE);
                let alignment = 1.0 - (f - BASELINE_COHERENCE).abs() / denom;
                alignment * vessel.connection_strength
            }
            Protocol::TemporalStability => {
                let time_factor = (params.duration_secs / STABILITY_SATURATION_SECS).min(1.0);
                BASELINE_STABILITY * vessel.connection_strength * (0.8 + 0.4 * time_factor)
            }
            Protocol::RealityAlteration => {
                let jitter = 0.7 + 0.3 * rng.gen::<f64>();
                vessel.purity * params.power * jitter
            }
        }
    }
}

/// Caller-tunable inputs to the protocols.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Scales the purity protocol. Default 1.0.
    pub intensity: f64,
    /// Simulated test duration in seconds. Default 60.
    pub duration_secs: f64,
    /// Scales the reality alteration protocol. Default 1.0.
    pub power: f64,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            duration_secs: 60.0,
            power: 1.0,
        }
    }
}

impl ProtocolParams {
    /// Every field must be finite and non-negative.
    pub fn validate(&self) -> SealResult<()> {
        for (key, v) in [
            ("intensity", self.intensity),
            ("duration_secs", self.duration_secs),
            ("power", self.power),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(SealError::invalid(
                    key,
                    format!("must be finite and >= 0, got {v}"),
                ));
            }
        }
        Ok(())
    }
}

/// Outcome of one protocol.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolResult {
    /// Which protocol ran.
    pub protocol: Protocol,
    /// Raw protocol score.
    pub score: f64,
    /// `score ≥ threshold`.
    pub passed: bool,
}

/// Outcome of validating one vessel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VesselValidation {
    /// Registry key (lower-case name).
    pub vessel: String,
    /// Weighted mean of the protocol scores, clamped to [0, 1].
    pub score: f64,
    /// Seal label built from the vessel signature.
    pub seal: String,
    /// Per-protocol detail.
    pub protocols: Vec<ProtocolResult>,
}

impl VesselValidation {
    /// Number of protocols that passed.
    pub fn passed_count(&self) -> usize {
        self.protocols.iter().filter(|p| p.passed).count()
    }
}

// ─── Registry ───────────────────────────────────────────────────────────────

/// Owned table of vessels, keyed by lower-case name.
#[derive(Clone, Debug, Default)]
pub struct VesselRegistry {
    vessels: HashMap<String, VesselRecord>,
}

impl VesselRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the four standard vessels.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for v in [
            VesselRecord::preset("Vlatko", "vlatko.eth", 0.999, "VLATKO_DYNASTY_SEAL", 0.95, 0.369),
            VesselRecord::preset("Gabriel", "gabriel.eth", 0.988, "GABRIEL_DYNASTY_SEAL", 0.92, 0.666),
            VesselRecord::preset("Tesla", "tesla.eth", 0.977, "TESLA_INNOVATION_SEAL", 0.89, 0.999),
            VesselRecord::preset("Vortex", "vortex369.eth", 1.0, "VORTEX369_SUPREME_SEAL", 1.0, 0.369),
        ] {
            registry.vessels.insert(v.name.to_lowercase(), v);
        }
        registry
    }

    /// Register a vessel. Names are case-insensitive; duplicates and
    /// out-of-range attributes are rejected.
    pub fn register(&mut self, vessel: VesselRecord) -> SealResult<()> {
        let key = vessel.name.to_lowercase();
        if key.is_empty() {
            return Err(SealError::invalid("vessel", "name must not be empty"));
        }
        if self.vessels.contains_key(&key) {
            return Err(SealError::invalid(
                "vessel",
                format!("vessel {:?} already registered", vessel.name),
            ));
        }
        for (field, v) in [
            ("purity", vessel.purity),
            ("connection_strength", vessel.connection_strength),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(SealError::invalid(field, format!("must be in [0, 1], got {v}")));
            }
        }
        if !(vessel.resonance_frequency > 0.0 && vessel.resonance_frequency <= 1.0) {
            return Err(SealError::invalid(
                "resonance_frequency",
                format!("must be in (0, 1], got {}", vessel.resonance_frequency),
            ));
        }
        self.vessels.insert(key, vessel);
        Ok(())
    }

    /// Look up a vessel by name (case-insensitive).
    pub fn get(&self, name: &str) -> SealResult<&VesselRecord> {
        self.vessels
            .get(&name.to_lowercase())
            .ok_or_else(|| SealError::not_found("vessel", name))
    }

    /// `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.vessels.contains_key(&name.to_lowercase())
    }

    /// Number of registered vessels.
    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    /// `true` when no vessels are registered.
    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    /// Registered names (lower-case), sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vessels.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registered vessels ordered by registry key.
    pub fn vessels(&self) -> Vec<&VesselRecord> {
        let mut out: Vec<(&String, &VesselRecord)> = self.vessels.iter().collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out.into_iter().map(|(_, v)| v).collect()
    }

    /// Run every protocol for `name` and seal the weighted score.
    ///
    /// Fails with `NotFound` for unknown vessels and `InvalidParameter` for bad
    /// `params`; in both cases nothing is mutated and the generator is not advanced.
    /// On success the vessel's validation count increments.
    pub fn validate<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        params: &ProtocolParams,
        ladder: &SealLadder,
        rng: &mut R,
    ) -> SealResult<VesselValidation> {
        params.validate()?;
        let key = name.to_lowercase();
        let vessel = self
            .vessels
            .get_mut(&key)
            .ok_or_else(|| SealError::not_found("vessel", name))?;

        let protocols: Vec<ProtocolResult> = Protocol::ALL
            .iter()
            .map(|&p| {
                let score = p.run(vessel, params, rng);
                ProtocolResult {
                    protocol: p,
                    score,
                    passed: score >= p.threshold(),
                }
            })
            .collect();

        let total_weight: f64 = protocols.iter().map(|r| r.protocol.weight()).sum();
        let weighted: f64 = protocols.iter().map(|r| r.score * r.protocol.weight()).sum();
        // Reality alteration scales with `power`, so the raw mean can exceed 1.
        let score = if total_weight > 0.0 { weighted / total_weight } else { 0.0 };
        let score = clamp_finite(score, 0.0, 1.0);

        vessel.validations = vessel.validations.saturating_add(1);
        let seal = ladder.seal(score, &vessel.signature);

        Ok(VesselValidation {
            vessel: key,
            score,
            seal,
            protocols,
        })
    }
}
