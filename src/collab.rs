//! External collaborators: the ledger sink and broadcast text rendering.
//!
//! The crate never talks to a network itself. A [`LedgerSink`] receives the
//! [`ChainPayload`] of a record and returns a transaction reference; a
//! broadcast collaborator renders [`BroadcastFields`] into its own templates
//! via [`render_broadcast`].
//!
//! Two sinks ship with the crate:
//!
//! - [`MemoryLedger`] keeps payloads in process, for tests and dry runs.
//! - [`ExternalLedger`] delegates to a closure (used by the Python layer).

use parking_lot::Mutex;

use crate::error::{SealError, SealResult};
use crate::record::{BroadcastFields, ChainPayload};

/// A ledger that stores seal payloads.
pub trait LedgerSink: Send + Sync {
    /// Submit `payload`, returning the ledger's transaction reference.
    ///
    /// An unreachable ledger returns `UpstreamUnavailable`. Callers do not retry.
    fn submit(&self, payload: &ChainPayload) -> SealResult<String>;
}

// ─── In-memory sink ─────────────────────────────────────────────────────────

/// In-process ledger. Transaction references are `mem-<index>`.
///
/// Safe to share across threads; submissions are serialised by a
/// `parking_lot::Mutex`, which cannot be poisoned.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<ChainPayload>>,
}

impl MemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of every submitted payload, oldest first.
    pub fn entries(&self) -> Vec<ChainPayload> {
        self.entries.lock().clone()
    }

    /// Number of submitted payloads.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing has been submitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerSink for MemoryLedger {
    fn submit(&self, payload: &ChainPayload) -> SealResult<String> {
        let mut entries = self.entries.lock();
        entries.push(payload.clone());
        Ok(format!("mem-{:08}", entries.len() - 1))
    }
}

// ─── Closure-backed sink ────────────────────────────────────────────────────

type SubmitFn = Box<dyn Fn(&ChainPayload) -> Result<String, String> + Send + Sync>;

/// Ledger that forwards to a closure. An `Err(message)` from the closure
/// becomes `UpstreamUnavailable(message)`.
pub struct ExternalLedger {
    submit_fn: SubmitFn,
}

impl ExternalLedger {
    /// Wrap `f` as a ledger sink.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ChainPayload) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            submit_fn: Box::new(f),
        }
    }
}

impl core::fmt::Debug for ExternalLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExternalLedger").finish_non_exhaustive()
    }
}

impl LedgerSink for ExternalLedger {
    fn submit(&self, payload: &ChainPayload) -> SealResult<String> {
        (self.submit_fn)(payload).map_err(SealError::UpstreamUnavailable)
    }
}

// ─── Broadcast text ─────────────────────────────────────────────────────────

/// Substitute `{score}`, `{score_pct}`, `{label}` and `{multiplier}` in `template`.
///
/// `{score}` renders with four decimals, `{score_pct}` as a percentage with
/// one decimal, `{multiplier}` with two decimals. Other braces are left alone.
pub fn render_broadcast(template: &str, fields: &BroadcastFields) -> String {
    template
        .replace("{score_pct}", &format!("{:.1}%", fields.score * 100.0))
        .replace("{score}", &format!("{:.4}", fields.score))
        .replace("{label}", &fields.label)
        .replace("{multiplier}", &format!("{:.2}", fields.multiplier))
}
