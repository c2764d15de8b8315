//! Termination state machine.

/// Lifecycle of the rented resource as seen by the termination coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationState {
    /// The resource is in use; statements may be dispatched.
    #[default]
    Active,
    /// A termination trigger fired; the resource is being released.
    Terminating,
    /// The resource has been released and cannot be reused.
    Terminated,
}

impl TerminationState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Active -> Terminating
    /// - Terminating -> Terminated
    pub fn can_transition_to(&self, target: TerminationState) -> bool {
        use TerminationState::*;
        matches!((*self, target), (Active, Terminating) | (Terminating, Terminated))
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: TerminationState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::ShellError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TerminationState::Terminated)
    }

    /// Check if statements may still be dispatched.
    pub fn is_active(&self) -> bool {
        matches!(self, TerminationState::Active)
    }
}
