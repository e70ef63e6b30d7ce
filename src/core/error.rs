//! Errors surfaced by firing and forcing transitions.

use thiserror::Error;

use super::fault::Fault;
use super::ids::{EventId, StateId};

/// Errors returned by [`fire`](crate::StateMachine::fire),
/// [`force`](crate::StateMachine::force) and their payload-carrying
/// variants.
#[derive(Debug, Error)]
pub enum FireError {
    /// No candidate edge accepted the event at the handling level. The
    /// machine is unchanged; observers have been notified.
    #[error("no transition from state '{state}' on event '{event}'")]
    TransitionNotFound { state: String, event: String },

    /// The machine was already faulted when the request arrived. Only
    /// [`reset`](crate::StateMachine::reset) is accepted in this
    /// condition.
    #[error("state machine is faulted: {0}")]
    Faulted(Fault),

    /// A handler failed during this request (or while draining requests
    /// it queued); the machine is now faulted.
    #[error("transition failed: {0}")]
    TransitionFailed(Fault),

    /// The state id was not issued by this machine's builder.
    #[error("state {0:?} does not belong to this machine")]
    UnknownState(StateId),

    /// The event id was not issued by this machine's builder.
    #[error("event {0:?} does not belong to this machine")]
    UnknownEvent(EventId),

    /// The target of a forced transition lives on a machine level that is
    /// not part of the live configuration.
    #[error("state '{state}' belongs to machine level '{level}', which is not active")]
    InactiveLevel { state: String, level: String },

    /// The installed synchronization gate did not run the critical
    /// section it was handed.
    #[error("synchronization gate declined to run the operation")]
    GateDeclined,
}
