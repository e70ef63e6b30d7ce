//! Machine-wide faults captured from failing handlers.

use chrono::{DateTime, Utc};

use super::ids::{EventId, GroupId, StateId};
use super::transition::HandlerError;

/// Which coordinator stage produced a fault.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FaultedComponent {
    /// The optional handler attached to the taken edge.
    TransitionHandler,
    /// A state's entry handler.
    EntryHandler,
    /// A state's exit handler.
    ExitHandler,
    /// A group's entry handler.
    GroupEntryHandler,
    /// A group's exit handler.
    GroupExitHandler,
}

impl FaultedComponent {
    fn describe(self) -> &'static str {
        match self {
            FaultedComponent::TransitionHandler => "transition handler",
            FaultedComponent::EntryHandler => "entry handler",
            FaultedComponent::ExitHandler => "exit handler",
            FaultedComponent::GroupEntryHandler => "group entry handler",
            FaultedComponent::GroupExitHandler => "group exit handler",
        }
    }
}

/// Immutable record of a handler failure.
///
/// Once a fault is set, the whole machine tree rejects `fire` and `force`
/// until [`reset`](crate::StateMachine::reset). The fault stays queryable
/// via [`fault`](crate::StateMachine::fault) in the meantime.
#[derive(Clone, Debug)]
pub struct Fault {
    pub(crate) component: FaultedComponent,
    pub(crate) error: HandlerError,
    pub(crate) from: StateId,
    pub(crate) to: StateId,
    pub(crate) from_name: String,
    pub(crate) to_name: String,
    pub(crate) event: EventId,
    pub(crate) event_name: String,
    pub(crate) group: Option<GroupId>,
    pub(crate) group_name: Option<String>,
    pub(crate) occurred_at: DateTime<Utc>,
}

impl Fault {
    /// The coordinator stage that failed.
    pub fn component(&self) -> FaultedComponent {
        self.component
    }

    /// The error returned by the failing handler.
    pub fn error(&self) -> &HandlerError {
        &self.error
    }

    /// State the failing step was leaving.
    pub fn from(&self) -> StateId {
        self.from
    }

    /// State the failing step was entering.
    pub fn to(&self) -> StateId {
        self.to
    }

    /// Name of the state the failing step was leaving.
    pub fn from_name(&self) -> &str {
        &self.from_name
    }

    /// Name of the state the failing step was entering.
    pub fn to_name(&self) -> &str {
        &self.to_name
    }

    /// Event that triggered the failing transition.
    pub fn event(&self) -> EventId {
        self.event
    }

    /// Name of the triggering event.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Group whose boundary handler failed, for group faults.
    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    /// Name of the faulting group, for group faults.
    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    /// When the fault was recorded.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.group_name {
            Some(group) => write!(
                f,
                "{} of group '{}' failed during '{}' -> '{}' on event '{}': {}",
                self.component.describe(),
                group,
                self.from_name,
                self.to_name,
                self.event_name,
                self.error
            ),
            None => write!(
                f,
                "{} failed during '{}' -> '{}' on event '{}': {}",
                self.component.describe(),
                self.from_name,
                self.to_name,
                self.event_name,
                self.error
            ),
        }
    }
}
