//! Failure taxonomy for unit attempts and coordinator runs.

use common::{RemediationKey, UnitId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A classified failure from an `attempt` or `remediate` call.
///
/// The set is closed on purpose: every failure a worker can produce is
/// either remediable (a known condition with a known fix) or fatal
/// (anything else). There is no "unknown" category, so the coordinator's
/// dispatch is exhaustive and checked at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum Failure {
    /// A known, expected condition fixable by remediating `key`.
    #[error("remediable failure for '{key}': {reason}")]
    Remediable {
        /// Drives remediation; units sharing a key are remediated together.
        key: RemediationKey,
        /// Human-readable description of the condition.
        reason: String,
    },

    /// An unexpected or unclassified failure. Always aborts the run.
    #[error("fatal failure: {reason}")]
    Fatal {
        /// The original cause, for escalation.
        reason: String,
    },
}

impl Failure {
    /// Creates a remediable failure for the given key.
    pub fn remediable(key: impl Into<RemediationKey>, reason: impl Into<String>) -> Self {
        Failure::Remediable {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a fatal failure with the given cause.
    pub fn fatal(reason: impl Into<String>) -> Self {
        Failure::Fatal {
            reason: reason.into(),
        }
    }

    /// Returns true if this failure can be fixed by remediation.
    pub fn is_remediable(&self) -> bool {
        matches!(self, Failure::Remediable { .. })
    }
}

/// Why a coordinator run was aborted.
///
/// Both variants are terminal: no aggregate is returned, and the caller is
/// expected to escalate. Remediable failures never appear here — they are
/// absorbed by remediation and retry, or upgraded to `RetryExhausted` when
/// they persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum AbortReason {
    /// An attempt or remediation produced an unclassified failure.
    ///
    /// For remediation failures, `unit` is the first unit deferred under
    /// the failing key.
    #[error("fatal failure in unit {unit}: {cause}")]
    Fatal {
        /// The unit whose attempt (or whose remediation key) failed.
        unit: UnitId,
        /// The original cause.
        cause: String,
    },

    /// A unit failed remediable again after its key was remediated.
    ///
    /// The retry budget is one attempt, so a persisting remediable
    /// condition means the remediation did not take.
    #[error("retry budget exhausted for unit {unit}")]
    RetryExhausted {
        /// The unit that failed on both attempts.
        unit: UnitId,
    },
}

impl AbortReason {
    /// Returns the unit this abort is attributed to.
    pub fn unit(&self) -> UnitId {
        match self {
            AbortReason::Fatal { unit, .. } => *unit,
            AbortReason::RetryExhausted { unit } => *unit,
        }
    }
}

/// Convenience type alias for coordinator results.
pub type Result<T> = std::result::Result<T, AbortReason>;
