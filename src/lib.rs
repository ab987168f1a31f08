//! # seal-core
//!
//! Threshold-weighted scoring and sealing: turn a piece of text into a
//! bounded score, classify it on a seal ladder, and keep a bounded history.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! text → encode → InputVector → transform → FieldStatistics → score → seal → ScoreRecord
//!                                   ↑                           ↑       ↑          ↓
//!                          FieldCoefficients               Intensity  SealLadder  HistoryTracker
//!                           (seeded StdRng)
//! ```
//!
//! Every stage before the history is a pure function of its inputs. The only
//! randomness is the coefficient draw, the manifestation tables, the collapse
//! draw and protocol noise, all taken from one seedable generator owned by
//! the [`Session`].
//!
//! ```text
//! ScoreBreakdown → ManifestationEngine → Manifestation → ManifestationValidator → ValidationReport → history
//!                        ↑                                        ↑
//!               CollectiveMode, Talisman                   medium_term average
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`encoder`] | [`InputVector`], [`encode`] | Text → fixed-length normalised vector |
//! | [`field`] | [`FieldCoefficients`], [`FieldStatistics`], [`transform`] | Element-wise projection + mean, stddev, max, entropy |
//! | [`scorer`] | [`WeightedScorer`], [`Intensity`] | Weighted combination, clamped to [0, 1] |
//! | [`sealer`] | [`SealLadder`], [`ThresholdLadder`], [`seal`] | Score → label on a descending threshold table |
//! | [`history`] | [`HistoryTracker`], [`RingWindow`] | Named bounded windows + record log |
//! | [`record`] | [`ScoreRecord`], [`ChainPayload`] | Immutable scored events and collaborator payloads |
//! | [`resonance`] | [`TemporalResonance`] | Per-band scalar from text shape |
//! | [`registry`] | [`VesselRegistry`], [`Protocol`] | Named vessels and weighted validation protocols |
//! | [`manifest`] | [`ManifestationEngine`], [`Talisman`], [`CollectiveMode`] | Probability collapse, anchors, amplification |
//! | [`validation`] | [`ManifestationValidator`], [`ValidationLadder`] | Three-layer validation on a six-tier ladder |
//! | [`metrics`] | [`OperationMetrics`] | Success counters, mean latency, health score |
//! | [`config`] | [`SealConfig`], [`ParamValue`] | Typed config with a validated flat key surface |
//! | [`collab`] | [`LedgerSink`], [`render_broadcast`] | Ledger and broadcast collaborators |
//! | [`persist`] | [`HistorySnapshot`] | JSON export / restore of history |
//! | [`session`] | [`Session`], [`Query`], [`ScoreOutcome`] | Owned context running the pipeline |
//!
//! ## Errors
//!
//! Pipeline math is total and returns plain values. Everything else returns
//! [`SealResult`]; see [`SealError`] for the variants.
//!
//! ## Example
//!
//! ```rust
//! use seal_core::{Query, SealConfig, Session};
//!
//! let mut session = Session::new(SealConfig::seeded(42)).unwrap();
//! let out = session.score_query(&Query::new("manifest clarity", "TEST")).unwrap();
//! assert!((0.0..=1.0).contains(&out.score()));
//! assert_eq!(session.average("short_term").unwrap(), Some(out.score()));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod collab;
pub mod config;
pub mod encoder;
pub mod error;
pub mod field;
pub mod history;
pub mod manifest;
pub mod metrics;
pub mod persist;
pub mod record;
pub mod registry;
pub mod resonance;
pub mod scorer;
pub mod sealer;
pub mod session;
pub mod validation;

#[cfg(feature = "python-ffi")]
pub mod ffi;

pub use collab::{render_broadcast, ExternalLedger, LedgerSink, MemoryLedger};
pub use config::{ParamChange, ParamValue, SealConfig};
pub use encoder::{encode, InputVector};
pub use error::{SealError, SealResult};
pub use field::{transform, FieldCoefficients, FieldStatistics};
pub use history::{HistoryTracker, RingWindow, WindowSnapshot, WindowSpec, WindowStats};
pub use manifest::{
    CollectiveMode, Manifestation, ManifestationEngine, PatternInputs, Talisman, TalismanSync,
    TemporalAnchor,
};
pub use metrics::OperationMetrics;
pub use persist::HistorySnapshot;
pub use record::{BroadcastFields, ChainPayload, ScoreRecord};
pub use registry::{Protocol, ProtocolParams, VesselRecord, VesselRegistry, VesselValidation};
pub use resonance::{ResonanceBases, TemporalResonance};
pub use scorer::{score, Intensity, ScoreBreakdown, ScoreWeights, WeightedScorer};
pub use sealer::{
    collective_amplification, collective_seal, confidence_interval, seal, ConfidenceLevel,
    SealLadder, SealRank, ThresholdLadder, Tier,
};
pub use session::{
    CollectiveValidation, ManifestOutcome, Query, ScoreOutcome, Session, SessionStatus,
};
pub use validation::{
    LayerThresholds, LayerWeights, ManifestationValidator, ValidationLadder, ValidationRank,
    ValidationReport,
};
