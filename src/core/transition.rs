//! Transition edges and the context handed to user handlers.
//!
//! Handlers never unwind into the engine: failure is signalled by
//! returning [`HandlerError`], which the coordinator escalates into a
//! machine-wide [`Fault`](crate::Fault).

use thiserror::Error;

use super::event::FireMethod;
use super::guard::Guard;
use super::ids::{EventId, StateId};

/// Error returned by an entry, exit, group or transition handler.
///
/// Returning `Err` from any handler faults the whole machine tree; see
/// [`Fault`](crate::Fault).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Create a handler error carrying a diagnostic message.
    pub fn new(message: impl Into<String>) -> Self {
        HandlerError {
            message: message.into(),
        }
    }

    /// The diagnostic message supplied by the failing handler.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError {
            message: message.to_string(),
        }
    }
}

/// Status returned by every user handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Boxed handler invoked with a mutable [`TransitionContext`].
pub type StateHandler<P> = Box<dyn FnMut(&mut TransitionContext<P>) -> HandlerResult + Send>;

/// A fire or force request deferred onto the reentrancy queue.
pub(crate) enum FireRequest<P> {
    Event {
        event: EventId,
        payload: P,
        method: FireMethod,
    },
    Forced {
        to: StateId,
        event: EventId,
    },
}

/// Context handed to entry, exit, group and transition handlers.
///
/// `from` and `to` describe the step the handler is part of: for the exit
/// of a nested state during a hierarchical walk, `from` is the state being
/// exited and `to` the final target of the transition, mirroring the order
/// guarantees of the coordinator.
///
/// A handler may request follow-up work through [`fire_with`],
/// [`try_fire_with`] and [`force`]; those requests join the machine's
/// reentrancy queue and run, in arrival order, once the current transition
/// has fully completed. The handler observes an optimistic success.
///
/// [`fire_with`]: TransitionContext::fire_with
/// [`try_fire_with`]: TransitionContext::try_fire_with
/// [`force`]: TransitionContext::force
pub struct TransitionContext<P> {
    /// State being left by this step.
    pub from: StateId,
    /// State being entered by this step.
    pub to: StateId,
    /// Name of `from`.
    pub from_name: String,
    /// Name of `to`.
    pub to_name: String,
    /// Event that triggered the transition.
    pub event: EventId,
    /// Name of the triggering event.
    pub event_name: String,
    /// Payload the event was fired with; `None` for forced transitions.
    pub payload: Option<P>,
    /// Whether this is an inner self-transition (no exit/entry crossing).
    pub is_inner: bool,

    pub(crate) pending: Vec<FireRequest<P>>,
}

impl<P> TransitionContext<P> {
    /// Queue `event` to be fired (throwing form) after the current
    /// transition completes. A failure of the deferred request surfaces
    /// from the outermost fire call, not here.
    pub fn fire_with(&mut self, event: EventId, payload: P) {
        self.pending.push(FireRequest::Event {
            event,
            payload,
            method: FireMethod::Fire,
        });
    }

    /// Queue `event` to be fired (non-throwing form) after the current
    /// transition completes. A miss during the drain only notifies
    /// observers.
    pub fn try_fire_with(&mut self, event: EventId, payload: P) {
        self.pending.push(FireRequest::Event {
            event,
            payload,
            method: FireMethod::TryFire,
        });
    }

    /// Queue a forced transition to `to`, to run after the current
    /// transition completes.
    pub fn force(&mut self, to: StateId, event: EventId) {
        self.pending.push(FireRequest::Forced { to, event });
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for TransitionContext<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionContext")
            .field("from_name", &self.from_name)
            .field("to_name", &self.to_name)
            .field("event_name", &self.event_name)
            .field("payload", &self.payload)
            .field("is_inner", &self.is_inner)
            .finish_non_exhaustive()
    }
}

impl TransitionContext<()> {
    /// Payload-free sugar for [`fire_with`](TransitionContext::fire_with).
    pub fn fire(&mut self, event: EventId) {
        self.fire_with(event, ());
    }

    /// Payload-free sugar for
    /// [`try_fire_with`](TransitionContext::try_fire_with).
    pub fn try_fire(&mut self, event: EventId) {
        self.try_fire_with(event, ());
    }
}

/// Guarded edge between two states (or a self-edge) for one event.
pub struct TransitionEdge<P> {
    pub(crate) from: StateId,
    pub(crate) to: StateId,
    pub(crate) guard: Option<Guard<P>>,
    pub(crate) handler: Option<StateHandler<P>>,
    pub(crate) is_inner: bool,
}

impl<P> TransitionEdge<P> {
    /// Source state of the edge.
    pub fn from(&self) -> StateId {
        self.from
    }

    /// Target state of the edge (equal to `from` for self-edges).
    pub fn to(&self) -> StateId {
        self.to
    }

    /// Whether the edge is an inner self-transition.
    pub fn is_inner(&self) -> bool {
        self.is_inner
    }

    /// Whether the edge applies to `payload`, i.e. it has no guard or its
    /// guard accepts.
    pub fn accepts(&self, payload: &P) -> bool {
        match &self.guard {
            Some(guard) => guard.check(payload),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_carries_message() {
        let err = HandlerError::new("relay jammed");
        assert_eq!(err.message(), "relay jammed");
        assert_eq!(err.to_string(), "relay jammed");
    }

    #[test]
    fn handler_error_from_str_and_string() {
        let a: HandlerError = "boom".into();
        let b: HandlerError = String::from("boom").into();
        assert_eq!(a, b);
    }

    #[test]
    fn edge_accepts_without_guard() {
        let edge: TransitionEdge<u32> = TransitionEdge {
            from: StateId(0),
            to: StateId(1),
            guard: None,
            handler: None,
            is_inner: false,
        };

        assert!(edge.accepts(&7));
    }

    #[test]
    fn edge_defers_to_guard() {
        let edge: TransitionEdge<u32> = TransitionEdge {
            from: StateId(0),
            to: StateId(1),
            guard: Some(Guard::new(|n: &u32| *n > 10)),
            handler: None,
            is_inner: false,
        };

        assert!(edge.accepts(&11));
        assert!(!edge.accepts(&3));
    }

    #[test]
    fn context_debug_names_the_step() {
        let ctx: TransitionContext<u32> = TransitionContext {
            from: StateId(0),
            to: StateId(1),
            from_name: "idle".to_string(),
            to_name: "running".to_string(),
            event: EventId(0),
            event_name: "start".to_string(),
            payload: Some(7),
            is_inner: false,
            pending: Vec::new(),
        };

        let rendered = format!("{ctx:?}");
        assert!(rendered.contains("idle"));
        assert!(rendered.contains("running"));
        assert!(rendered.contains("start"));
    }

    #[test]
    fn context_queues_requests_in_order() {
        let mut ctx: TransitionContext<()> = TransitionContext {
            from: StateId(0),
            to: StateId(1),
            from_name: "a".to_string(),
            to_name: "b".to_string(),
            event: EventId(0),
            event_name: "go".to_string(),
            payload: Some(()),
            is_inner: false,
            pending: Vec::new(),
        };

        ctx.fire(EventId(1));
        ctx.try_fire(EventId(2));
        ctx.force(StateId(2), EventId(3));

        assert_eq!(ctx.pending.len(), 3);
        assert!(matches!(
            ctx.pending[0],
            FireRequest::Event {
                method: FireMethod::Fire,
                ..
            }
        ));
        assert!(matches!(
            ctx.pending[1],
            FireRequest::Event {
                method: FireMethod::TryFire,
                ..
            }
        ));
        assert!(matches!(ctx.pending[2], FireRequest::Forced { .. }));
    }
}
