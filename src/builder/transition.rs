//! Fluent declaration of one transition edge.

use crate::core::{
    EventId, Guard, HandlerResult, StateHandler, StateId, TransitionContext,
};

/// Declares one edge, consumed by
/// [`MachineBuilder::transition`](crate::MachineBuilder::transition).
///
/// An event and both endpoints are mandatory; guard and handler are
/// optional. Edges for the same event and source state are tried in
/// declaration order when the event fires.
///
/// ```rust
/// use statik::{MachineBuilder, TransitionBuilder};
///
/// let mut b: MachineBuilder<u32> = MachineBuilder::new("gate");
/// let closed = b.state("closed");
/// let open = b.state("open");
/// b.initial(closed);
/// let badge = b.event("badge");
/// b.transition(
///     TransitionBuilder::new()
///         .on(badge)
///         .from(closed)
///         .to(open)
///         .when(|clearance: &u32| *clearance >= 3),
/// )
/// .unwrap();
/// ```
pub struct TransitionBuilder<P = ()> {
    pub(crate) event: Option<EventId>,
    pub(crate) from: Option<StateId>,
    pub(crate) to: Option<StateId>,
    pub(crate) guard: Option<Guard<P>>,
    pub(crate) handler: Option<StateHandler<P>>,
    pub(crate) is_inner: bool,
}

impl<P> TransitionBuilder<P> {
    /// Start an empty declaration.
    pub fn new() -> Self {
        TransitionBuilder {
            event: None,
            from: None,
            to: None,
            guard: None,
            handler: None,
            is_inner: false,
        }
    }

    /// The event triggering this edge.
    pub fn on(mut self, event: EventId) -> Self {
        self.event = Some(event);
        self
    }

    /// Source state of the edge.
    pub fn from(mut self, from: StateId) -> Self {
        self.from = Some(from);
        self
    }

    /// Target state of the edge.
    pub fn to(mut self, to: StateId) -> Self {
        self.to = Some(to);
        self
    }

    /// Guard the edge with a payload predicate.
    pub fn when(self, predicate: impl Fn(&P) -> bool + Send + Sync + 'static) -> Self {
        self.guard(Guard::new(predicate))
    }

    /// Guard the edge with a prebuilt [`Guard`].
    pub fn guard(mut self, guard: Guard<P>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Attach an infallible transition handler.
    pub fn handler(
        mut self,
        mut handler: impl FnMut(&mut TransitionContext<P>) + Send + 'static,
    ) -> Self {
        self.handler = Some(Box::new(move |ctx| {
            handler(ctx);
            Ok(())
        }));
        self
    }

    /// Attach a transition handler whose failure faults the machine.
    pub fn handler_fallible(
        mut self,
        handler: impl FnMut(&mut TransitionContext<P>) -> HandlerResult + Send + 'static,
    ) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Mark the edge as an inner self-transition: the handler runs but no
    /// exit or entry handler fires and nested machines stay untouched.
    /// Requires `from` and `to` to name the same state.
    pub fn inner(mut self) -> Self {
        self.is_inner = true;
        self
    }
}

impl<P> Default for TransitionBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}
