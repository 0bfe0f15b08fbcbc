//! Shared status-transition machinery
//!
//! Every workflow in the marketplace (orders, returns, tickets, reviews, KYC)
//! is a closed status enum with an explicit transition table. This module holds
//! the pieces they share: the [`Lifecycle`] trait, the business-rule error
//! taxonomy, and the audit trail written alongside every applied transition.

mod audit;
mod error;

pub use audit::{list_audit_trail, record_transition, AuditEntry, AuditLog};
pub use error::WorkflowError;

use std::fmt;
use uuid::Uuid;

/// A closed set of statuses with a fixed transition table.
pub trait Lifecycle: Copy + Eq + fmt::Debug + fmt::Display {
    /// Entity name used in errors and audit rows (e.g. `"order"`).
    const ENTITY: &'static str;

    /// Whether the edge `self -> next` is in the transition table.
    /// Never called with `next == self`.
    fn allows(self, next: Self) -> bool;

    /// Terminal statuses have no outgoing edges.
    fn is_terminal(self) -> bool;
}

/// Outcome of checking a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Already in the requested status; nothing to write.
    Unchanged,
    /// The edge is legal and must be applied.
    Advance,
}

/// Check a transition against the table of `S`.
///
/// Re-applying the current status is a no-op rather than an error so that two
/// moderators racing on the same action both observe success.
pub fn plan_transition<S: Lifecycle>(from: S, to: S) -> Result<Step, WorkflowError> {
    if from == to {
        return Ok(Step::Unchanged);
    }

    if !from.is_terminal() && from.allows(to) {
        Ok(Step::Advance)
    } else {
        Err(WorkflowError::IllegalTransition {
            entity: S::ENTITY,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Outcome of a compare-and-swap write that matched no row.
///
/// `current` is the status re-read after the miss. A racing writer that
/// already reached `target` makes this call a no-op; anything else is a
/// lost update.
pub fn settle_lost_race<S: Lifecycle>(current: S, target: S, id: Uuid) -> Result<(), WorkflowError> {
    if current == target {
        Ok(())
    } else {
        Err(WorkflowError::ConcurrentModification {
            entity: S::ENTITY,
            id,
        })
    }
}

/// Trimmed, non-empty text or a validation error naming the field.
pub fn require_text(field: &str, value: &str) -> Result<String, WorkflowError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
        Off,
    }

    impl fmt::Display for Light {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Lifecycle for Light {
        const ENTITY: &'static str = "light";

        fn allows(self, next: Self) -> bool {
            matches!(
                (self, next),
                (Light::Red, Light::Green) | (Light::Green, Light::Red) | (_, Light::Off)
            )
        }

        fn is_terminal(self) -> bool {
            matches!(self, Light::Off)
        }
    }

    #[test]
    fn test_same_status_is_unchanged() {
        assert_eq!(plan_transition(Light::Red, Light::Red), Ok(Step::Unchanged));
        assert_eq!(plan_transition(Light::Off, Light::Off), Ok(Step::Unchanged));
    }

    #[test]
    fn test_terminal_has_no_outgoing_edges() {
        let err = plan_transition(Light::Off, Light::Red).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::IllegalTransition {
                entity: "light",
                from: "Off".to_string(),
                to: "Red".to_string(),
            }
        );
    }

    #[test]
    fn test_lost_race_to_same_target_is_success() {
        let id = Uuid::new_v4();
        assert_eq!(settle_lost_race(Light::Green, Light::Green, id), Ok(()));
        assert_eq!(
            settle_lost_race(Light::Off, Light::Green, id),
            Err(WorkflowError::ConcurrentModification { entity: "light", id })
        );
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("subject", "  hi ").unwrap(), "hi");
        assert!(matches!(
            require_text("subject", " \t\n"),
            Err(WorkflowError::Validation(msg)) if msg.contains("subject")
        ));
    }
}
