//! Construction-time errors.
//!
//! Every failure while composing, expanding, or synthesizing a declaration
//! is fatal to that declaration alone and names both the declaration and the
//! offending slot. Nothing is silently dropped: a combination that cannot be
//! generated surfaces as one of these errors instead of a missing routine.
//!
//! # Error Categories
//!
//! - [`BuildError::CapabilityConflict`]: mutually exclusive capabilities
//! - [`BuildError::Resolution`]: a symbolic reference that names no slot
//! - [`BuildError::IllegalCombination`]: a shape that cannot be generated

use thiserror::Error;

/// Build result type alias.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors raised while turning a declaration into routines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Two capabilities of the same declaration cannot hold together.
    ///
    /// Reported at construction time, never during generation or at
    /// routine runtime.
    #[error("capability conflict in `{operation}` at slot `{slot}`: {message}")]
    CapabilityConflict {
        operation: String,
        slot: String,
        message: String,
    },

    /// A symbolic reference (override, size expression, unit body) names
    /// a slot the declaration does not have.
    #[error("resolution error in `{operation}` at slot `{slot}`: {message}")]
    Resolution {
        operation: String,
        slot: String,
        message: String,
    },

    /// The declaration describes a shape that cannot be generated.
    #[error("illegal combination in `{operation}` at slot `{slot}`: {message}")]
    IllegalCombination {
        operation: String,
        slot: String,
        message: String,
    },
}

impl BuildError {
    pub fn conflict(
        operation: impl Into<String>,
        slot: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CapabilityConflict {
            operation: operation.into(),
            slot: slot.into(),
            message: message.into(),
        }
    }

    pub fn resolution(
        operation: impl Into<String>,
        slot: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            operation: operation.into(),
            slot: slot.into(),
            message: message.into(),
        }
    }

    pub fn illegal(
        operation: impl Into<String>,
        slot: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::IllegalCombination {
            operation: operation.into(),
            slot: slot.into(),
            message: message.into(),
        }
    }

    /// Name of the declaration that failed.
    pub fn operation(&self) -> &str {
        match self {
            Self::CapabilityConflict { operation, .. }
            | Self::Resolution { operation, .. }
            | Self::IllegalCombination { operation, .. } => operation,
        }
    }

    /// Name of the offending slot.
    pub fn slot(&self) -> &str {
        match self {
            Self::CapabilityConflict { slot, .. }
            | Self::Resolution { slot, .. }
            | Self::IllegalCombination { slot, .. } => slot,
        }
    }
}
