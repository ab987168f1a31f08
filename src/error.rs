//! Error taxonomy shared by every fallible operation in the crate.
//!
//! The pipeline math (encode, transform, score, seal) is total and never
//! returns an error. Everything that touches named state, configuration,
//! files, or an external collaborator returns [`SealResult`].

use thiserror::Error;

/// Root error type for all seal-core failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SealError {
    /// A configuration or call parameter failed its validator. The previous
    /// value, if any, is retained.
    #[error("invalid parameter `{key}`: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears on the configuration surface.
        key: String,
        /// Human-readable rejection reason.
        reason: String,
    },

    /// A named window, vessel, or other registry entry does not exist.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Category of the missing entry (`"window"`, `"vessel"`, ...).
        kind: &'static str,
        /// The name that was looked up.
        name: String,
    },

    /// An external collaborator (chain node, wallet, broadcaster) could not be reached.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Reading, writing, or parsing a persisted document failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl SealError {
    /// Shorthand for [`SealError::InvalidParameter`].
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`SealError::NotFound`].
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Result alias used across the crate.
pub type SealResult<T> = Result<T, SealError>;
