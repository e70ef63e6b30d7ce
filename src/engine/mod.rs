//! The execution engine: event dispatch, reentrancy queuing, fault
//! containment and the public machine surface.
//!
//! A [`StateMachine`] owns every arena of the tree (levels, states,
//! events, groups) and is the only mutable entry point. All operations
//! are synchronous calls on the caller's thread; the outermost call
//! always runs the machine to quiescence (its own transition plus every
//! request queued by handlers) before returning.

mod coordinator;
mod observer;
mod queue;
mod sync;

pub use observer::{TransitionEvent, TransitionNotFoundEvent};
pub use sync::{GateOp, SynchronizationGate};

use std::sync::Arc;

use tracing::debug;

use crate::core::{
    EventId, EventTrigger, Fault, FireError, FireMethod, FireRequest, Group, GroupId, MachineId,
    StateId, StateNode,
};
use observer::Observers;
use queue::ReentrancyQueue;

/// One level of the hierarchy: a set of sibling states with an initial
/// state and, when the level is part of the live configuration, a current
/// state.
pub(crate) struct MachineLevel {
    pub(crate) name: String,
    /// The state owning this level; `None` for the root.
    pub(crate) parent: Option<StateId>,
    pub(crate) states: Vec<StateId>,
    pub(crate) initial: StateId,
    /// `Some` iff this level is part of the live configuration.
    pub(crate) current: Option<StateId>,
}

/// A hierarchical state machine.
///
/// Built with [`MachineBuilder`](crate::MachineBuilder); topology is
/// fixed afterwards. The payload type `P` is shared by every event of the
/// tree; the untyped variant is `StateMachine<()>`, which adds the
/// payload-free [`fire`](StateMachine::fire) and
/// [`try_fire`](StateMachine::try_fire) sugar.
pub struct StateMachine<P = ()> {
    pub(crate) levels: Vec<MachineLevel>,
    pub(crate) states: Vec<StateNode<P>>,
    pub(crate) events: Vec<EventTrigger<P>>,
    pub(crate) groups: Vec<Group<P>>,
    pub(crate) fault: Option<Fault>,
    pub(crate) queue: ReentrancyQueue<P>,
    /// Whether a transition is currently executing on this tree.
    pub(crate) executing: bool,
    pub(crate) observers: Observers,
    pub(crate) gate: Option<Arc<dyn SynchronizationGate>>,
}

impl<P> std::fmt::Debug for StateMachine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.levels[0].name)
            .field("levels", &self.levels.len())
            .field("states", &self.states.len())
            .field("events", &self.events.len())
            .field("groups", &self.groups.len())
            .field("faulted", &self.fault.is_some())
            .finish_non_exhaustive()
    }
}

impl<P> StateMachine<P> {
    /// Assemble a machine from validated builder arenas. Every level
    /// starts deactivated; the builder resets the machine before handing
    /// it out.
    pub(crate) fn from_arenas(
        levels: Vec<MachineLevel>,
        states: Vec<StateNode<P>>,
        events: Vec<EventTrigger<P>>,
        groups: Vec<Group<P>>,
    ) -> Self {
        StateMachine {
            levels,
            states,
            events,
            groups,
            fault: None,
            queue: ReentrancyQueue::new(),
            executing: false,
            observers: Observers::default(),
            gate: None,
        }
    }

    /// The root level of the tree.
    pub fn root(&self) -> MachineId {
        MachineId::ROOT
    }

    /// Current state of the root level.
    pub fn current_state(&self) -> StateId {
        // The root level is always active outside of an in-progress walk.
        self.levels[0].current.unwrap_or(self.levels[0].initial)
    }

    /// Current state of `machine`, or `None` when that level is not part
    /// of the live configuration.
    pub fn current_state_of(&self, machine: MachineId) -> Option<StateId> {
        self.levels.get(machine.0).and_then(|level| level.current)
    }

    /// Initial state of `machine`.
    pub fn initial_state_of(&self, machine: MachineId) -> StateId {
        self.levels[machine.0].initial
    }

    /// The state owning `machine`, or `None` for the root.
    pub fn parent_state_of(&self, machine: MachineId) -> Option<StateId> {
        self.levels[machine.0].parent
    }

    /// The active-state chain, root level first.
    pub fn active_path(&self) -> Vec<StateId> {
        let mut path = Vec::new();
        let mut level = Some(MachineId::ROOT);
        while let Some(id) = level {
            let Some(current) = self.levels[id.0].current else {
                break;
            };
            path.push(current);
            level = self.states[current.0].child;
        }
        path
    }

    /// Whether `state` is anywhere in the active-state chain.
    pub fn is_in_state(&self, state: StateId) -> bool {
        self.active_path().contains(&state)
    }

    /// Name of a state.
    ///
    /// # Panics
    ///
    /// Panics if `state` was not issued by this machine's builder.
    pub fn state_name(&self, state: StateId) -> &str {
        &self.states[state.0].name
    }

    /// Name of an event.
    pub fn event_name(&self, event: EventId) -> &str {
        &self.events[event.0].name
    }

    /// Name of a machine level.
    pub fn machine_name(&self, machine: MachineId) -> &str {
        &self.levels[machine.0].name
    }

    /// Name of a group.
    pub fn group_name(&self, group: GroupId) -> &str {
        &self.groups[group.0].name
    }

    /// The current fault, or `None` while healthy.
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Whether a handler failure has faulted the tree.
    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// Register an observer for committed transitions.
    pub fn on_transition(&mut self, observer: impl FnMut(&TransitionEvent) + Send + 'static) {
        self.observers.transition.push(Box::new(observer));
    }

    /// Register an observer for events that matched no transition.
    pub fn on_transition_not_found(
        &mut self,
        observer: impl FnMut(&TransitionNotFoundEvent) + Send + 'static,
    ) {
        self.observers.not_found.push(Box::new(observer));
    }

    /// Register an observer for faults.
    pub fn on_faulted(&mut self, observer: impl FnMut(&Fault) + Send + 'static) {
        self.observers.faulted.push(Box::new(observer));
    }

    /// Install a critical-section wrapper around fire, force and reset.
    pub fn set_synchronizer(&mut self, gate: Arc<dyn SynchronizationGate>) {
        self.gate = Some(gate);
    }

    /// Remove the installed synchronization gate.
    pub fn clear_synchronizer(&mut self) {
        self.gate = None;
    }

    fn check_state(&self, state: StateId) -> Result<(), FireError> {
        if state.0 < self.states.len() {
            Ok(())
        } else {
            Err(FireError::UnknownState(state))
        }
    }

    fn check_event(&self, event: EventId) -> Result<(), FireError> {
        if event.0 < self.events.len() {
            Ok(())
        } else {
            Err(FireError::UnknownEvent(event))
        }
    }

    /// Run `run` inside the synchronization gate, if one is installed.
    fn gated<R>(
        &mut self,
        op: GateOp,
        run: impl FnOnce(&mut Self) -> R,
        declined: impl FnOnce() -> R,
    ) -> R {
        let Some(gate) = self.gate.clone() else {
            return run(self);
        };
        let mut run = Some(run);
        let mut result = None;
        gate.critical(op, &mut || {
            if let Some(run) = run.take() {
                result = Some(run(self));
            }
        });
        result.unwrap_or_else(declined)
    }
}

impl<P: Clone> StateMachine<P> {
    /// Fire `event` with a payload; a missed transition or a handler
    /// fault is returned as an error.
    pub fn fire_with(&mut self, event: EventId, payload: P) -> Result<(), FireError> {
        self.check_event(event)?;
        self.gated(
            GateOp::Fire,
            move |machine| {
                machine
                    .fire_event(event, payload, FireMethod::Fire)
                    .map(|_| ())
            },
            || Err(FireError::GateDeclined),
        )
    }

    /// Fire `event` with a payload; returns whether a transition was
    /// taken. A missed transition, a faulted machine and a handler fault
    /// all return `false`; the fault (if any) stays queryable via
    /// [`fault`](StateMachine::fault).
    pub fn try_fire_with(&mut self, event: EventId, payload: P) -> bool {
        if self.check_event(event).is_err() {
            return false;
        }
        self.gated(
            GateOp::TryFire,
            move |machine| {
                machine
                    .fire_event(event, payload, FireMethod::TryFire)
                    .unwrap_or(false)
            },
            || false,
        )
    }

    /// Transition directly to `to`, bypassing edge and guard resolution.
    ///
    /// The full hierarchical exit/entry chain runs and observers are
    /// notified, but no transition handler is invoked. `to`'s machine
    /// level must be part of the live configuration.
    pub fn force(&mut self, to: StateId, event: EventId) -> Result<(), FireError> {
        self.check_state(to)?;
        self.check_event(event)?;
        self.gated(
            GateOp::Force,
            move |machine| machine.force_transition(to, event),
            || Err(FireError::GateDeclined),
        )
    }

    /// Clear any fault and return every level to its initial
    /// configuration, without running entry or exit handlers. Always
    /// permitted, including while faulted.
    pub fn reset(&mut self) {
        self.gated(GateOp::Reset, |machine| machine.reset_now(), || ());
    }

    fn fire_event(
        &mut self,
        event: EventId,
        payload: P,
        method: FireMethod,
    ) -> Result<bool, FireError> {
        if let Some(fault) = &self.fault {
            debug!(
                event = %self.events[event.0].name,
                "fire rejected: machine is faulted"
            );
            return Err(FireError::Faulted(fault.clone()));
        }
        if self.executing {
            // A transition is mid-flight on this tree; defer and report
            // optimistic success to the inner caller.
            self.queue.push(FireRequest::Event {
                event,
                payload,
                method,
            });
            return Ok(true);
        }
        self.invoke(FireRequest::Event {
            event,
            payload,
            method,
        })
    }

    fn force_transition(&mut self, to: StateId, event: EventId) -> Result<(), FireError> {
        if let Some(fault) = &self.fault {
            return Err(FireError::Faulted(fault.clone()));
        }
        if self.executing {
            self.queue.push(FireRequest::Forced { to, event });
            return Ok(());
        }
        self.invoke(FireRequest::Forced { to, event }).map(|_| ())
    }

    /// Run one request to completion, then drain whatever it queued.
    /// Whatever happens, the queue ends up empty.
    fn invoke(&mut self, request: FireRequest<P>) -> Result<bool, FireError> {
        self.executing = true;
        let mut result = self.run_request(request);
        self.executing = false;
        if result.is_ok() {
            if let Err(error) = self.drain_queue() {
                result = Err(error);
            }
        }
        self.queue.clear();
        result
    }

    fn drain_queue(&mut self) -> Result<(), FireError> {
        while let Some(request) = self.queue.pop() {
            self.executing = true;
            let result = self.run_request(request);
            self.executing = false;
            // A fault, or a miss from a throwing-form request, aborts the
            // drain; invoke() discards whatever is left.
            match result {
                Ok(_) => {}
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    fn run_request(&mut self, request: FireRequest<P>) -> Result<bool, FireError> {
        match request {
            FireRequest::Event {
                event,
                payload,
                method,
            } => self.dispatch_event(event, payload, method),
            FireRequest::Forced { to, event } => self.run_forced(to, event).map(|()| true),
        }
    }

    /// Resolve and execute `event` against the live configuration.
    ///
    /// The handling level is the deepest active state holding any
    /// registration for the event; a guard miss there is final, with no
    /// bubbling to ancestor levels.
    fn dispatch_event(
        &mut self,
        event: EventId,
        payload: P,
        method: FireMethod,
    ) -> Result<bool, FireError> {
        let chain = self.active_path();
        let from = chain
            .iter()
            .rev()
            .copied()
            .find(|state| self.events[event.0].has_candidates_for(*state));
        let Some(from) = from else {
            let deepest = chain.last().copied().unwrap_or(self.levels[0].initial);
            return self.transition_not_found(deepest, event, method);
        };
        let Some(index) = self.events[event.0].resolve(from, &payload) else {
            return self.transition_not_found(from, event, method);
        };
        let (to, is_inner) = match self.events[event.0].edge(from, index) {
            Some(edge) => (edge.to(), edge.is_inner()),
            None => return self.transition_not_found(from, event, method),
        };
        debug!(
            event = %self.events[event.0].name,
            from = %self.states[from.0].name,
            to = %self.states[to.0].name,
            "dispatching transition"
        );
        match self.coordinate(from, to, event, Some(payload), is_inner, Some((from, index))) {
            Ok(()) => Ok(true),
            Err(fault) => {
                self.record_fault(fault.clone());
                Err(FireError::TransitionFailed(fault))
            }
        }
    }

    fn run_forced(&mut self, to: StateId, event: EventId) -> Result<(), FireError> {
        let level = self.states[to.0].machine;
        let Some(from) = self.levels[level.0].current else {
            return Err(FireError::InactiveLevel {
                state: self.states[to.0].name.clone(),
                level: self.levels[level.0].name.clone(),
            });
        };
        debug!(
            from = %self.states[from.0].name,
            to = %self.states[to.0].name,
            "forcing transition"
        );
        match self.coordinate(from, to, event, None, false, None) {
            Ok(()) => Ok(()),
            Err(fault) => {
                self.record_fault(fault.clone());
                Err(FireError::TransitionFailed(fault))
            }
        }
    }

    fn transition_not_found(
        &mut self,
        state: StateId,
        event: EventId,
        method: FireMethod,
    ) -> Result<bool, FireError> {
        let notification = TransitionNotFoundEvent {
            state,
            state_name: self.states[state.0].name.clone(),
            event,
            event_name: self.events[event.0].name.clone(),
            method,
        };
        debug!(
            state = %notification.state_name,
            event = %notification.event_name,
            "transition not found"
        );
        self.observers.notify_not_found(&notification);
        match method {
            FireMethod::Fire => Err(FireError::TransitionNotFound {
                state: notification.state_name,
                event: notification.event_name,
            }),
            FireMethod::TryFire => Ok(false),
        }
    }

    pub(crate) fn record_fault(&mut self, fault: Fault) {
        tracing::warn!(%fault, "state machine faulted");
        self.fault = Some(fault.clone());
        self.observers.notify_faulted(&fault);
    }

    pub(crate) fn reset_now(&mut self) {
        debug!("resetting state machine");
        self.fault = None;
        self.queue.clear();
        self.executing = false;
        for level in &mut self.levels {
            level.current = None;
        }
        self.activate_initial_chain();
    }

    /// Activate the root's initial chain: each level's initial state, as
    /// deep as nested machines reach, with zero handlers.
    fn activate_initial_chain(&mut self) {
        let mut level = MachineId::ROOT;
        loop {
            let initial = self.levels[level.0].initial;
            self.levels[level.0].current = Some(initial);
            match self.states[initial.0].child {
                Some(child) => level = child,
                None => break,
            }
        }
    }
}

impl StateMachine<()> {
    /// Payload-free sugar for [`fire_with`](StateMachine::fire_with).
    pub fn fire(&mut self, event: EventId) -> Result<(), FireError> {
        self.fire_with(event, ())
    }

    /// Payload-free sugar for [`try_fire_with`](StateMachine::try_fire_with).
    pub fn try_fire(&mut self, event: EventId) -> bool {
        self.try_fire_with(event, ())
    }
}
