//! Observer registration lists and the events they receive.
//!
//! Observers are synchronous callbacks invoked in registration order at
//! fixed points of the dispatch cycle: after a transition commits, when an
//! event finds no transition, and when a fault is recorded. Observer
//! panics propagate to the firing caller; they are never converted into
//! faults.

use chrono::{DateTime, Utc};

use crate::core::{EventId, Fault, FireMethod, MachineId, StateId};

/// Notification that a transition committed.
#[derive(Clone, Debug)]
pub struct TransitionEvent {
    /// Source state of the taken edge.
    pub from: StateId,
    /// Target state of the taken edge.
    pub to: StateId,
    /// Name of `from`.
    pub from_name: String,
    /// Name of `to`.
    pub to_name: String,
    /// The triggering event.
    pub event: EventId,
    /// Name of the triggering event.
    pub event_name: String,
    /// Machine level the edge belongs to.
    pub machine: MachineId,
    /// Whether this was an inner self-transition.
    pub is_inner: bool,
    /// When the transition committed.
    pub occurred_at: DateTime<Utc>,
}

/// Notification that a fired event matched no transition.
#[derive(Clone, Debug)]
pub struct TransitionNotFoundEvent {
    /// The state that received the event.
    pub state: StateId,
    /// Name of `state`.
    pub state_name: String,
    /// The event that missed.
    pub event: EventId,
    /// Name of the event.
    pub event_name: String,
    /// Whether the miss came from the throwing or non-throwing form.
    pub method: FireMethod,
}

pub(crate) type TransitionObserver = Box<dyn FnMut(&TransitionEvent) + Send>;
pub(crate) type NotFoundObserver = Box<dyn FnMut(&TransitionNotFoundEvent) + Send>;
pub(crate) type FaultObserver = Box<dyn FnMut(&Fault) + Send>;

#[derive(Default)]
pub(crate) struct Observers {
    pub(crate) transition: Vec<TransitionObserver>,
    pub(crate) not_found: Vec<NotFoundObserver>,
    pub(crate) faulted: Vec<FaultObserver>,
}

impl Observers {
    pub(crate) fn notify_transition(&mut self, event: &TransitionEvent) {
        for observer in &mut self.transition {
            observer(event);
        }
    }

    pub(crate) fn notify_not_found(&mut self, event: &TransitionNotFoundEvent) {
        for observer in &mut self.not_found {
            observer(event);
        }
    }

    pub(crate) fn notify_faulted(&mut self, fault: &Fault) {
        for observer in &mut self.faulted {
            observer(fault);
        }
    }
}
