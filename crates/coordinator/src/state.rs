//! Per-unit state machine.

use serde::{Deserialize, Serialize};

/// The state of a single work unit within one coordinator run.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Succeeded
///           ├──► AwaitingRemediation ──► Retrying ──┬──► Succeeded
///           │                                       └──► Failed
///           └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitState {
    /// Unit has not been attempted yet.
    #[default]
    Pending,

    /// First attempt failed remediable; unit is deferred until its
    /// remediation key has been serviced.
    AwaitingRemediation,

    /// Second (and final) attempt is in progress.
    Retrying,

    /// Unit produced a result that was merged into the aggregate
    /// (terminal state).
    Succeeded,

    /// Unit failed fatally or exhausted its retry budget (terminal state).
    Failed,
}

impl UnitState {
    /// Returns true if the unit can be attempted from this state.
    pub fn can_attempt(&self) -> bool {
        matches!(self, UnitState::Pending | UnitState::Retrying)
    }

    /// Returns true if the unit still has retry budget left.
    pub fn can_retry(&self) -> bool {
        matches!(self, UnitState::AwaitingRemediation)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Succeeded | UnitState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::Pending => "Pending",
            UnitState::AwaitingRemediation => "AwaitingRemediation",
            UnitState::Retrying => "Retrying",
            UnitState::Succeeded => "Succeeded",
            UnitState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_pending() {
        assert_eq!(UnitState::default(), UnitState::Pending);
    }

    #[test]
    fn test_can_attempt() {
        assert!(UnitState::Pending.can_attempt());
        assert!(UnitState::Retrying.can_attempt());
        assert!(!UnitState::AwaitingRemediation.can_attempt());
        assert!(!UnitState::Succeeded.can_attempt());
        assert!(!UnitState::Failed.can_attempt());
    }

    #[test]
    fn test_can_retry() {
        assert!(UnitState::AwaitingRemediation.can_retry());
        assert!(!UnitState::Pending.can_retry());
        assert!(!UnitState::Retrying.can_retry());
        assert!(!UnitState::Succeeded.can_retry());
        assert!(!UnitState::Failed.can_retry());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!UnitState::Pending.is_terminal());
        assert!(!UnitState::AwaitingRemediation.is_terminal());
        assert!(!UnitState::Retrying.is_terminal());
        assert!(UnitState::Succeeded.is_terminal());
        assert!(UnitState::Failed.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(UnitState::Pending.to_string(), "Pending");
        assert_eq!(
            UnitState::AwaitingRemediation.to_string(),
            "AwaitingRemediation"
        );
        assert_eq!(UnitState::Retrying.to_string(), "Retrying");
        assert_eq!(UnitState::Succeeded.to_string(), "Succeeded");
        assert_eq!(UnitState::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_serialization() {
        let state = UnitState::AwaitingRemediation;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: UnitState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
