//! State machine vocabulary for bebop.
//!
//! The dispatcher records every change to the registry or to focus as a
//! [`StateTransition`], and [`StateViolation`]s describe invariants that
//! failed to hold after an event.
//!
//! ```text
//!     ┌──────────────────────────────────────────┐
//!     │                                          │ cycle / remove focused
//!     ▼                                          │
//! ┌─────────┐   first client appears   ┌─────────┴──────┐
//! │  None   │ ────────────────────────►│ Focused { i }  │
//! └─────────┘                          └────────┬───────┘
//!     ▲                                         │
//!     │            last client destroyed        │
//!     └─────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::types::Handle;

/// State transition events that can be traced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum StateTransition {
    /// Window was added to the registry
    ClientManaged { window: Handle, index: usize },
    /// Window was removed from the registry
    ClientUnmanaged { window: Handle, index: usize },
    /// Window was turned away
    ClientRejected { window: Handle, reason: String },
    /// Focus moved between clients
    FocusChanged {
        from: Option<Handle>,
        to: Option<Handle>,
    },
}

impl StateTransition {
    /// Snake-case name, matching the serialized tag
    pub fn name(&self) -> &'static str {
        match self {
            StateTransition::ClientManaged { .. } => "client_managed",
            StateTransition::ClientUnmanaged { .. } => "client_unmanaged",
            StateTransition::ClientRejected { .. } => "client_rejected",
            StateTransition::FocusChanged { .. } => "focus_changed",
        }
    }
}

/// An invariant that does not hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StateViolation {
    pub kind: ViolationKind,
    pub description: String,
}

/// Types of state violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Same handle tracked twice
    DuplicateHandle,
    /// More clients than the configured capacity
    CapacityOverflow,
    /// Focus index past the end of the registry
    FocusOutOfRange,
    /// Clients exist but none is focused
    FocusMissing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_serialization() {
        let transition = StateTransition::ClientManaged {
            window: 42,
            index: 0,
        };
        let json = serde_json::to_string(&transition).unwrap();
        assert!(json.contains("\"transition\":\"client_managed\""));
        assert!(json.contains("42"));
        assert_eq!(transition.name(), "client_managed");

        let parsed: StateTransition = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, transition);
    }

    #[test]
    fn test_violation_serialization() {
        let violation = StateViolation {
            kind: ViolationKind::FocusMissing,
            description: "2 clients, no focus".to_string(),
        };
        let json = serde_json::to_string(&violation).unwrap();
        assert!(json.contains("focus_missing"));
    }
}
