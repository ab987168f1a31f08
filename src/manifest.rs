//! Manifestation engine: turns scored patterns into a collapse, anchor and
//! amplification outcome.
//!
//! ```text
//! field[i]    = (c·sin(0.369 i) + p·cos(0.666 i) + k·sin(0.999 i)) · prob[i]   then ÷ max|field|
//! energy      = Σ |field|
//! P(collapse) = min(energy × intensity, 1)
//! anchors     = first 10 anchors with strength × α > 0.5      (only on collapse)
//! amplify     = mode × (1 + 0.5 · stability) × (1 + 0.3 · talisman)
//! efficiency  = min(0.369 × amplify, 0.999)
//! warp        = 100 × efficiency × amplify
//! shift (%)   = 100 × (0.1 · P + 0.05)                         (0 without collapse)
//! stability'  = min(stability + min(0.1 · anchors, 1), 1)
//! ```
//!
//! `c`, `p`, `k` are the coherence, potential and insight strength of a
//! [`ScoreBreakdown`]; `α` is the alpha band of the text's
//! [`TemporalResonance`]. The probability field is drawn once from
//! Beta(2, 5) and the anchor table once from uniform ranges, both from the
//! caller's generator.
//!
//! # Invariants
//! - The normalised field lies in [-1, 1]; an all-zero field never collapses.
//! - Without a collapse no anchors are placed and stability is 0.
//! - `reality_stability` and `conversion_efficiency` are in [0, 1].

use core::fmt;
use core::str::FromStr;

use rand::Rng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

use crate::error::{SealError, SealResult};
use crate::registry::VesselRegistry;
use crate::resonance::TemporalResonance;
use crate::scorer::{Intensity, ScoreBreakdown};

/// Number of temporal anchors drawn per engine.
pub const ANCHOR_COUNT: usize = 369;

/// Anchors considered for placement on each collapse.
pub const ANCHOR_CANDIDATES: usize = 10;

/// Minimum `strength × α` for an anchor to be placed.
pub const ANCHOR_PLACEMENT_MIN: f64 = 0.5;

/// Natural energy-to-matter conversion rate.
pub const BASE_EFFICIENCY: f64 = 0.369;

/// Upper bound of the conversion efficiency.
pub const MAX_EFFICIENCY: f64 = 0.999;

/// Domain whose talisman anchors at full strength.
pub const SUPREME_DOMAIN: &str = "vortex369.eth";

// ─── Collective mode ────────────────────────────────────────────────────────

/// Scope of a manifestation, selecting its amplification factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectiveMode {
    /// 1.0
    #[default]
    Individual,
    /// 1.2
    FamilyBloodline,
    /// 1.5
    CommunityResonance,
    /// 2.0
    GlobalSynchronization,
    /// 3.0
    UniversalAlignment,
}

impl CollectiveMode {
    /// All modes, weakest first.
    pub const ALL: [CollectiveMode; 5] = [
        CollectiveMode::Individual,
        CollectiveMode::FamilyBloodline,
        CollectiveMode::CommunityResonance,
        CollectiveMode::GlobalSynchronization,
        CollectiveMode::UniversalAlignment,
    ];

    /// Amplification factor before the stability and talisman boosts.
    pub fn factor(self) -> f64 {
        match self {
            CollectiveMode::Individual => 1.0,
            CollectiveMode::FamilyBloodline => 1.2,
            CollectiveMode::CommunityResonance => 1.5,
            CollectiveMode::GlobalSynchronization => 2.0,
            CollectiveMode::UniversalAlignment => 3.0,
        }
    }

    /// Snake-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            CollectiveMode::Individual => "individual",
            CollectiveMode::FamilyBloodline => "family_bloodline",
            CollectiveMode::CommunityResonance => "community_resonance",
            CollectiveMode::GlobalSynchronization => "global_synchronization",
            CollectiveMode::UniversalAlignment => "universal_alignment",
        }
    }
}

impl fmt::Display for CollectiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectiveMode {
    type Err = SealError;

    fn from_str(s: &str) -> SealResult<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        CollectiveMode::ALL
            .into_iter()
            .find(|m| m.as_str() == lowered)
            .ok_or_else(|| SealError::invalid("collective_mode", format!("unknown mode {s:?}")))
    }
}

// ─── Talisman ───────────────────────────────────────────────────────────────

/// Result of one network sync.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TalismanSync {
    /// Vessels that connected.
    pub active_vessels: usize,
    /// Vessels that were tried.
    pub total_vessels: usize,
    /// `active / total`, 0 for an empty registry.
    pub network_strength: f64,
    /// Product of `1 + 0.1 × frequency × purity` over connected vessels.
    pub total_amplification: f64,
}

/// An ENS-anchored amplifier that boosts manifestations.
///
/// ```text
/// resonance     = min(anchor × network × (1 + 0.1 × strong_vessels), 1)
/// amplification = 1 + 0.5 × resonance      (applied to c, p, k)
/// boost         = 0.3 × resonance          (applied to the collective factor)
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Talisman {
    ens_domain: String,
    anchor_strength: f64,
    strong_vessels: usize,
    network_amplification: f64,
}

impl Talisman {
    /// Anchor a talisman to `ens_domain`.
    ///
    /// [`SUPREME_DOMAIN`] anchors at 1.0; any other domain at
    /// `0.369 + (hash % 1000) / 10000`. Vessels with a connection strength
    /// above 0.7 count as strong.
    pub fn anchor(ens_domain: &str, registry: &VesselRegistry) -> Self {
        let anchor_strength = if ens_domain == SUPREME_DOMAIN {
            1.0
        } else {
            (0.369 + (domain_hash(ens_domain) % 1000) as f64 / 10_000.0).min(1.0)
        };
        Self {
            ens_domain: ens_domain.to_string(),
            anchor_strength,
            strong_vessels: registry
                .vessels()
                .iter()
                .filter(|v| v.connection_strength > 0.7)
                .count(),
            network_amplification: 1.0,
        }
    }

    /// The anchoring domain.
    pub fn ens_domain(&self) -> &str {
        &self.ens_domain
    }

    /// Strength derived from the domain, in [0.369, 1].
    pub fn anchor_strength(&self) -> f64 {
        self.anchor_strength
    }

    /// Amplification from the last sync, 1.0 before any.
    pub fn network_amplification(&self) -> f64 {
        self.network_amplification
    }

    /// Current resonance in [0, 1].
    pub fn resonance(&self) -> f64 {
        let vessels = 1.0 + 0.1 * self.strong_vessels as f64;
        (self.anchor_strength * self.network_amplification * vessels).min(1.0)
    }

    /// Multiplier applied to the pattern inputs.
    pub fn amplification(&self) -> f64 {
        1.0 + 0.5 * self.resonance()
    }

    /// Extra collective amplification, `0.3 × resonance`.
    pub fn boost(&self) -> f64 {
        0.3 * self.resonance()
    }

    /// Try to connect every vessel; each connects with probability equal to
    /// its connection strength.
    pub fn sync<R: Rng + ?Sized>(&mut self, registry: &VesselRegistry, rng: &mut R) -> TalismanSync {
        let vessels = registry.vessels();
        let mut active = 0;
        let mut total_amplification = 1.0;
        for v in &vessels {
            if rng.gen::<f64>() < v.connection_strength {
                active += 1;
                total_amplification *= 1.0 + 0.1 * v.resonance_frequency * v.purity;
            }
        }
        self.network_amplification = total_amplification;
        self.strong_vessels = vessels.iter().filter(|v| v.connection_strength > 0.7).count();
        TalismanSync {
            active_vessels: active,
            total_vessels: vessels.len(),
            network_strength: if vessels.is_empty() {
                0.0
            } else {
                active as f64 / vessels.len() as f64
            },
            total_amplification,
        }
    }
}

fn domain_hash(domain: &str) -> u32 {
    domain.bytes().fold(2_166_136_261_u32, |h, b| {
        (h ^ b as u32).wrapping_mul(16_777_619)
    })
}

// ─── Inputs / outputs ───────────────────────────────────────────────────────

/// Pattern scalars that shape the manifestation field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternInputs {
    /// Coherence from the scorer.
    pub coherence: f64,
    /// Potential from the scorer.
    pub potential: f64,
    /// Insight strength from the scorer.
    pub insight_strength: f64,
    /// Alpha resonance band of the text, used for anchor placement.
    pub alpha_resonance: f64,
}

impl PatternInputs {
    /// Inputs from a scorer breakdown and the text's resonance.
    pub fn from_breakdown(breakdown: &ScoreBreakdown, resonance: &TemporalResonance) -> Self {
        Self {
            coherence: breakdown.coherence,
            potential: breakdown.potential,
            insight_strength: breakdown.insight_strength,
            alpha_resonance: resonance.alpha,
        }
    }

    /// Scale coherence, potential and insight by `factor`. Alpha is unchanged.
    pub fn amplified(self, factor: f64) -> Self {
        Self {
            coherence: self.coherence * factor,
            potential: self.potential * factor,
            insight_strength: self.insight_strength * factor,
            ..self
        }
    }
}

/// One temporal anchor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemporalAnchor {
    /// Index in the anchor table.
    pub position: usize,
    /// Strength in [0.1, 1). For placed anchors, already scaled by α.
    pub strength: f64,
    /// Resonance in [0.369, 0.999).
    pub resonance: f64,
    /// Stability in [0.5, 1).
    pub stability: f64,
}

/// Outcome of the probability collapse.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collapse {
    /// Intensity multiplier used as collapse strength.
    pub strength: f64,
    /// `Σ |field|`.
    pub field_energy: f64,
    /// `min(energy × strength, 1)`.
    pub probability: f64,
    /// Whether the collapse happened.
    pub success: bool,
    /// `0.1 × probability` on success, else 0.
    pub shift: f64,
}

/// Everything produced by one manifestation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifestation {
    /// Normalised manifestation field.
    pub field: Vec<f64>,
    /// Collapse outcome.
    pub collapse: Collapse,
    /// Anchors placed, in table order.
    pub anchors: Vec<TemporalAnchor>,
    /// Mean stability of the placed anchors, 0 if none.
    pub anchor_stability: f64,
    /// Collective mode requested.
    pub mode: CollectiveMode,
    /// Total amplification factor.
    pub amplification: f64,
    /// Talisman share of the amplification, 0 without a talisman.
    pub talisman_boost: f64,
    /// Energy-to-matter efficiency in [0, 0.999].
    pub conversion_efficiency: f64,
    /// `efficiency × amplification`.
    pub matter_density: f64,
    /// Net probability shift, percent.
    pub probability_shift: f64,
    /// `100 × matter_density`.
    pub warp_strength: f64,
    /// Stability including the anchor bonus, in [0, 1].
    pub reality_stability: f64,
}

impl Manifestation {
    /// Number of anchors placed.
    pub fn anchors_placed(&self) -> usize {
        self.anchors.len()
    }
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Probability field and anchor table, drawn once and reused.
#[derive(Clone, PartialEq)]
pub struct ManifestationEngine {
    probability_field: Vec<f64>,
    anchors: Vec<TemporalAnchor>,
}

impl ManifestationEngine {
    /// Draw a `field_size` Beta(2, 5) field and [`ANCHOR_COUNT`] anchors.
    pub fn generate<R: Rng + ?Sized>(field_size: usize, rng: &mut R) -> SealResult<Self> {
        if field_size == 0 {
            return Err(SealError::invalid("probability_field_size", "must be >= 1"));
        }
        let beta = Beta::new(2.0, 5.0)
            .map_err(|e| SealError::invalid("probability_field", e.to_string()))?;
        let probability_field = (0..field_size).map(|_| beta.sample(rng)).collect();
        let anchors = (0..ANCHOR_COUNT)
            .map(|position| TemporalAnchor {
                position,
                strength: rng.gen_range(0.1..1.0),
                resonance: rng.gen_range(0.369..0.999),
                stability: rng.gen_range(0.5..1.0),
            })
            .collect();
        Ok(Self {
            probability_field,
            anchors,
        })
    }

    /// Use an explicit field and anchor table.
    ///
    /// Field values must lie in [0, 1] and the field must not be empty.
    pub fn from_parts(probability_field: Vec<f64>, anchors: Vec<TemporalAnchor>) -> SealResult<Self> {
        if probability_field.is_empty() {
            return Err(SealError::invalid("probability_field", "must not be empty"));
        }
        if let Some(v) = probability_field.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(SealError::invalid(
                "probability_field",
                format!("values must be in [0, 1], got {v}"),
            ));
        }
        Ok(Self {
            probability_field,
            anchors,
        })
    }

    /// The probability field.
    pub fn probability_field(&self) -> &[f64] {
        &self.probability_field
    }

    /// The anchor table.
    pub fn anchors(&self) -> &[TemporalAnchor] {
        &self.anchors
    }

    /// Shape the probability field by `inputs` and normalise by its largest magnitude.
    pub fn field(&self, inputs: &PatternInputs) -> Vec<f64> {
        let mut field: Vec<f64> = self
            .probability_field
            .iter()
            .enumerate()
            .map(|(i, prob)| {
                let i = i as f64;
                let influence = inputs.coherence * (i * 0.369).sin()
                    + inputs.potential * (i * 0.666).cos()
                    + inputs.insight_strength * (i * 0.999).sin();
                let v = influence * prob;
                if v.is_finite() { v } else { 0.0 }
            })
            .collect();
        let peak = field.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if peak > 0.0 {
            field.iter_mut().for_each(|v| *v /= peak);
        }
        field
    }

    /// Run one manifestation. Draws exactly one value from `rng` for the collapse.
    pub fn manifest<R: Rng + ?Sized>(
        &self,
        inputs: &PatternInputs,
        intensity: Intensity,
        mode: CollectiveMode,
        talisman: Option<&Talisman>,
        rng: &mut R,
    ) -> Manifestation {
        let inputs = match talisman {
            Some(t) => inputs.amplified(t.amplification()),
            None => *inputs,
        };
        let field = self.field(&inputs);

        let strength = intensity.multiplier();
        let field_energy: f64 = field.iter().map(|v| v.abs()).sum();
        let probability = (field_energy * strength).min(1.0);
        let success = rng.gen::<f64>() < probability;
        let collapse = Collapse {
            strength,
            field_energy,
            probability,
            success,
            shift: if success { probability * 0.1 } else { 0.0 },
        };

        let anchors: Vec<TemporalAnchor> = if success {
            self.anchors
                .iter()
                .take(ANCHOR_CANDIDATES)
                .filter_map(|a| {
                    let strength = a.strength * inputs.alpha_resonance;
                    (strength > ANCHOR_PLACEMENT_MIN).then_some(TemporalAnchor { strength, ..*a })
                })
                .collect()
        } else {
            Vec::new()
        };
        let anchor_stability = if anchors.is_empty() {
            0.0
        } else {
            anchors.iter().map(|a| a.stability).sum::<f64>() / anchors.len() as f64
        };

        let talisman_boost = talisman.map_or(0.0, Talisman::boost);
        let amplification =
            mode.factor() * (1.0 + anchor_stability * 0.5) * (1.0 + talisman_boost);
        let conversion_efficiency = (BASE_EFFICIENCY * amplification).min(MAX_EFFICIENCY);
        let matter_density = conversion_efficiency * amplification;
        let success_bonus = if success { 0.05 } else { 0.0 };
        let anchor_bonus = (anchors.len() as f64 * 0.1).min(1.0);

        Manifestation {
            probability_shift: (collapse.shift + success_bonus) * 100.0,
            warp_strength: matter_density * 100.0,
            reality_stability: (anchor_stability + anchor_bonus).min(1.0),
            field,
            collapse,
            anchors,
            anchor_stability,
            mode,
            amplification,
            talisman_boost,
            conversion_efficiency,
            matter_density,
        }
    }
}

impl fmt::Debug for ManifestationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestationEngine")
            .field("field_size", &self.probability_field.len())
            .field("anchors", &self.anchors.len())
            .finish()
    }
}
