//! Forward-only state machines.
//!
//! A state lists its outgoing edges; moves along any other edge are refused
//! with a `ValidationError` instead of silently succeeding.

use super::ValidationError;

/// A `Copy` state enum with an explicit edge list.
///
/// ```ignore
/// let next = Stage::Phone.transition_to(Stage::Address)?;
/// assert!(Stage::MediaUpload.is_terminal());
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// States reachable in one step.
    fn valid_transitions(&self) -> Vec<Self>;

    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Returns `target` if the edge exists.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            return Ok(target);
        }
        Err(ValidationError::invalid_format(
            "state_transition",
            format!("no edge from {:?} to {:?}", self, target),
        ))
    }

    /// No outgoing edges.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
