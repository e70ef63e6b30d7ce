//! Execution of a chosen transition: hierarchical exit, handler, pointer
//! update, hierarchical entry, observer notification.
//!
//! Ordering guarantees, for a non-inner transition:
//! exit precedes entry; the deepest active state exits first and the
//! shallowest entered state enters first; each group boundary handler
//! runs at most once per transition. Any handler failure is converted
//! into a [`Fault`] tagged with the originating stage; nothing unwinds
//! through the walk.

use chrono::Utc;
use tracing::trace;

use crate::core::{
    EventId, Fault, FaultedComponent, GroupId, HandlerResult, MachineId, StateId,
    TransitionContext,
};

use super::observer::TransitionEvent;
use super::StateMachine;

/// Addresses one handler slot in the arenas.
enum HandlerSlot {
    StateEntry(StateId),
    StateExit(StateId),
    GroupEntry(GroupId),
    GroupExit(GroupId),
    Edge {
        event: EventId,
        from: StateId,
        index: usize,
    },
}

impl<P: Clone> StateMachine<P> {
    /// Execute a transition from `from` to `to` on `from`'s level.
    ///
    /// `edge` addresses the taken edge's handler slot; `None` for forced
    /// transitions, which skip handler invocation entirely. For an inner
    /// transition only the handler and the observers run.
    pub(crate) fn coordinate(
        &mut self,
        from: StateId,
        to: StateId,
        event: EventId,
        payload: Option<P>,
        is_inner: bool,
        edge: Option<(StateId, usize)>,
    ) -> Result<(), Fault> {
        let mut exited_groups = Vec::new();
        let mut entered_groups = Vec::new();

        if !is_inner {
            if let Some(child) = self.states[from.0].child {
                self.exit_chain(child, to, event, &payload, &mut exited_groups)?;
            }
            self.exit_state(from, to, event, &payload, &mut exited_groups)?;
        }

        if let Some((source, index)) = edge {
            let mut ctx = self.context(from, to, event, &payload, is_inner);
            let result = self.invoke_slot(
                HandlerSlot::Edge {
                    event,
                    from: source,
                    index,
                },
                &mut ctx,
            );
            result.map_err(|error| {
                self.make_fault(
                    FaultedComponent::TransitionHandler,
                    error,
                    from,
                    to,
                    event,
                    None,
                )
            })?;
        }

        // The sole mutation defining the configuration change at this
        // level.
        let level = self.states[from.0].machine;
        self.levels[level.0].current = Some(to);

        if !is_inner {
            self.enter_state(to, from, event, &payload, &mut entered_groups)?;
            if let Some(child) = self.states[to.0].child {
                self.enter_chain(child, from, event, &payload, &mut entered_groups)?;
            }
        }

        self.notify_transition(from, to, event, level, is_inner);
        Ok(())
    }

    /// Exit the active chain below a level, deepest first, deactivating
    /// each level on the way out.
    fn exit_chain(
        &mut self,
        level: MachineId,
        to: StateId,
        event: EventId,
        payload: &Option<P>,
        exited_groups: &mut Vec<GroupId>,
    ) -> Result<(), Fault> {
        if let Some(current) = self.levels[level.0].current {
            if let Some(grandchild) = self.states[current.0].child {
                self.exit_chain(grandchild, to, event, payload, exited_groups)?;
            }
            self.exit_state(current, to, event, payload, exited_groups)?;
            self.levels[level.0].current = None;
        }
        Ok(())
    }

    /// Activate a level at its initial state and run its entry chain,
    /// recursing into further nesting (shallowest first).
    fn enter_chain(
        &mut self,
        level: MachineId,
        from: StateId,
        event: EventId,
        payload: &Option<P>,
        entered_groups: &mut Vec<GroupId>,
    ) -> Result<(), Fault> {
        let initial = self.levels[level.0].initial;
        self.levels[level.0].current = Some(initial);
        self.enter_state(initial, from, event, payload, entered_groups)?;
        if let Some(grandchild) = self.states[initial.0].child {
            self.enter_chain(grandchild, from, event, payload, entered_groups)?;
        }
        Ok(())
    }

    /// Run a state's exit handler, then the exit handlers of every group
    /// the state leaves behind (last-declared first).
    fn exit_state(
        &mut self,
        exited: StateId,
        to: StateId,
        event: EventId,
        payload: &Option<P>,
        exited_groups: &mut Vec<GroupId>,
    ) -> Result<(), Fault> {
        let mut ctx = self.context(exited, to, event, payload, false);
        self.invoke_slot(HandlerSlot::StateExit(exited), &mut ctx)
            .map_err(|error| {
                self.make_fault(FaultedComponent::ExitHandler, error, exited, to, event, None)
            })?;

        let staying = self.states[to.0].groups.clone();
        let leaving: Vec<GroupId> = self.states[exited.0].groups.iter().rev().copied().collect();
        for group in leaving {
            if staying.contains(&group) || exited_groups.contains(&group) {
                continue;
            }
            exited_groups.push(group);
            self.invoke_slot(HandlerSlot::GroupExit(group), &mut ctx)
                .map_err(|error| {
                    self.make_fault(
                        FaultedComponent::GroupExitHandler,
                        error,
                        exited,
                        to,
                        event,
                        Some(group),
                    )
                })?;
        }
        Ok(())
    }

    /// Run a state's entry handler, then the entry handlers of every
    /// group newly entered (declaration order).
    fn enter_state(
        &mut self,
        entered: StateId,
        from: StateId,
        event: EventId,
        payload: &Option<P>,
        entered_groups: &mut Vec<GroupId>,
    ) -> Result<(), Fault> {
        let mut ctx = self.context(from, entered, event, payload, false);
        self.invoke_slot(HandlerSlot::StateEntry(entered), &mut ctx)
            .map_err(|error| {
                self.make_fault(
                    FaultedComponent::EntryHandler,
                    error,
                    from,
                    entered,
                    event,
                    None,
                )
            })?;

        let left_behind = self.states[from.0].groups.clone();
        let joining = self.states[entered.0].groups.clone();
        for group in joining {
            if left_behind.contains(&group) || entered_groups.contains(&group) {
                continue;
            }
            entered_groups.push(group);
            self.invoke_slot(HandlerSlot::GroupEntry(group), &mut ctx)
                .map_err(|error| {
                    self.make_fault(
                        FaultedComponent::GroupEntryHandler,
                        error,
                        from,
                        entered,
                        event,
                        Some(group),
                    )
                })?;
        }
        Ok(())
    }

    /// Call one handler slot, then absorb any requests it queued on its
    /// context into the reentrancy queue.
    fn invoke_slot(&mut self, slot: HandlerSlot, ctx: &mut TransitionContext<P>) -> HandlerResult {
        let result = match slot {
            HandlerSlot::StateEntry(state) => match self.states[state.0].on_entry.as_mut() {
                Some(handler) => handler(ctx),
                None => Ok(()),
            },
            HandlerSlot::StateExit(state) => match self.states[state.0].on_exit.as_mut() {
                Some(handler) => handler(ctx),
                None => Ok(()),
            },
            HandlerSlot::GroupEntry(group) => match self.groups[group.0].on_entry.as_mut() {
                Some(handler) => handler(ctx),
                None => Ok(()),
            },
            HandlerSlot::GroupExit(group) => match self.groups[group.0].on_exit.as_mut() {
                Some(handler) => handler(ctx),
                None => Ok(()),
            },
            HandlerSlot::Edge { event, from, index } => {
                match self.events[event.0]
                    .edge_mut(from, index)
                    .and_then(|edge| edge.handler.as_mut())
                {
                    Some(handler) => handler(ctx),
                    None => Ok(()),
                }
            }
        };
        self.queue.absorb(&mut ctx.pending);
        result
    }

    fn context(
        &self,
        from: StateId,
        to: StateId,
        event: EventId,
        payload: &Option<P>,
        is_inner: bool,
    ) -> TransitionContext<P> {
        TransitionContext {
            from,
            to,
            from_name: self.states[from.0].name.clone(),
            to_name: self.states[to.0].name.clone(),
            event,
            event_name: self.events[event.0].name.clone(),
            payload: payload.clone(),
            is_inner,
            pending: Vec::new(),
        }
    }

    fn make_fault(
        &self,
        component: FaultedComponent,
        error: crate::core::HandlerError,
        from: StateId,
        to: StateId,
        event: EventId,
        group: Option<GroupId>,
    ) -> Fault {
        Fault {
            component,
            error,
            from,
            to,
            from_name: self.states[from.0].name.clone(),
            to_name: self.states[to.0].name.clone(),
            event,
            event_name: self.events[event.0].name.clone(),
            group,
            group_name: group.map(|g| self.groups[g.0].name.clone()),
            occurred_at: Utc::now(),
        }
    }

    fn notify_transition(
        &mut self,
        from: StateId,
        to: StateId,
        event: EventId,
        machine: MachineId,
        is_inner: bool,
    ) {
        let notification = TransitionEvent {
            from,
            to,
            from_name: self.states[from.0].name.clone(),
            to_name: self.states[to.0].name.clone(),
            event,
            event_name: self.events[event.0].name.clone(),
            machine,
            is_inner,
            occurred_at: Utc::now(),
        };
        trace!(
            from = %notification.from_name,
            to = %notification.to_name,
            event = %notification.event_name,
            "transition committed"
        );
        self.observers.notify_transition(&notification);
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::{MachineBuilder, TransitionBuilder};
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    fn record(log: &Log, entry: impl Into<String>) {
        log.lock().unwrap().push(entry.into());
    }

    /// Root: off <-> on; on nests {low <-> high}; high nests {trim}.
    struct Nested {
        machine: crate::StateMachine,
        off: crate::StateId,
        on: crate::StateId,
        low: crate::StateId,
        high: crate::StateId,
        trim: crate::StateId,
        power: crate::EventId,
        shift: crate::EventId,
        log: Log,
    }

    fn nested() -> Nested {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut b: MachineBuilder = MachineBuilder::new("amp");
        let off = b.state("off");
        let on = b.state("on");
        b.initial(off);

        let modes = b.child_machine(on, "modes");
        let low = b.state_in(modes, "low");
        let high = b.state_in(modes, "high");
        b.initial(low);

        let fine = b.child_machine(high, "fine");
        let trim = b.state_in(fine, "trim");
        b.initial(trim);

        let power = b.event("power");
        let shift = b.event("shift");
        b.transition(TransitionBuilder::new().on(power).from(off).to(on))
            .unwrap();
        b.transition(TransitionBuilder::new().on(power).from(on).to(off))
            .unwrap();
        b.transition(TransitionBuilder::new().on(shift).from(low).to(high))
            .unwrap();

        for (state, name) in [
            (off, "off"),
            (on, "on"),
            (low, "low"),
            (high, "high"),
            (trim, "trim"),
        ] {
            let entry_log = Arc::clone(&log);
            b.on_entry(state, move |_| record(&entry_log, format!("enter {name}")));
            let exit_log = Arc::clone(&log);
            b.on_exit(state, move |_| record(&exit_log, format!("exit {name}")));
        }

        Nested {
            machine: b.build().unwrap(),
            off,
            on,
            low,
            high,
            trim,
            power,
            shift,
            log,
        }
    }

    #[test]
    fn entry_runs_shallowest_first() {
        let mut n = nested();
        n.machine.fire(n.power).unwrap();

        // Entering `on` activates the nested initial chain.
        assert_eq!(
            *n.log.lock().unwrap(),
            vec!["exit off", "enter on", "enter low"]
        );
        assert_eq!(n.machine.current_state(), n.on);
        assert_eq!(n.machine.current_state_of(crate::MachineId(1)), Some(n.low));
    }

    #[test]
    fn exit_runs_deepest_first() {
        let mut n = nested();
        n.machine.fire(n.power).unwrap();
        n.machine.fire(n.shift).unwrap();
        n.log.lock().unwrap().clear();

        n.machine.fire(n.power).unwrap();
        assert_eq!(
            *n.log.lock().unwrap(),
            vec!["exit trim", "exit high", "exit on", "enter off"]
        );
        assert_eq!(n.machine.current_state(), n.off);
        // Deactivated levels lose their current state.
        assert_eq!(n.machine.current_state_of(crate::MachineId(1)), None);
        assert_eq!(n.machine.current_state_of(crate::MachineId(2)), None);
    }

    #[test]
    fn shifting_into_a_nested_state_enters_its_chain() {
        let mut n = nested();
        n.machine.fire(n.power).unwrap();
        n.log.lock().unwrap().clear();

        n.machine.fire(n.shift).unwrap();
        assert_eq!(
            *n.log.lock().unwrap(),
            vec!["exit low", "enter high", "enter trim"]
        );
        assert_eq!(n.machine.active_path(), vec![n.on, n.high, n.trim]);
    }

    #[test]
    fn inner_transition_skips_exit_and_entry() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut b: MachineBuilder = MachineBuilder::new("counter");
        let idle = b.state("idle");
        b.initial(idle);
        let tick = b.event("tick");

        let handler_log = Arc::clone(&log);
        b.transition(
            TransitionBuilder::new()
                .on(tick)
                .from(idle)
                .to(idle)
                .inner()
                .handler(move |_| record(&handler_log, "tick handled")),
        )
        .unwrap();

        let entry_log = Arc::clone(&log);
        b.on_entry(idle, move |_| record(&entry_log, "enter idle"));
        let exit_log = Arc::clone(&log);
        b.on_exit(idle, move |_| record(&exit_log, "exit idle"));

        let mut machine = b.build().unwrap();
        let observer_log = Arc::clone(&log);
        machine.on_transition(move |event| {
            assert!(event.is_inner);
            record(&observer_log, "observed");
        });

        machine.fire(tick).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["tick handled", "observed"]);
        assert_eq!(machine.current_state(), idle);
    }

    #[test]
    fn ordinary_self_transition_exits_and_reenters() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut b: MachineBuilder = MachineBuilder::new("rebooter");
        let up = b.state("up");
        b.initial(up);
        let reboot = b.event("reboot");
        b.transition(TransitionBuilder::new().on(reboot).from(up).to(up))
            .unwrap();

        let entry_log = Arc::clone(&log);
        b.on_entry(up, move |_| record(&entry_log, "enter"));
        let exit_log = Arc::clone(&log);
        b.on_exit(up, move |_| record(&exit_log, "exit"));

        let mut machine = b.build().unwrap();
        machine.fire(reboot).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["exit", "enter"]);
    }

    #[test]
    fn group_boundary_handlers_fire_once_with_symmetric_difference() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut b: MachineBuilder = MachineBuilder::new("modes");
        let idle = b.state("idle");
        let working = b.state("working");
        let cleanup = b.state("cleanup");
        b.initial(idle);

        let busy = b.group("busy");
        b.add_to_group(working, busy);
        b.add_to_group(cleanup, busy);
        let entry_log = Arc::clone(&log);
        b.on_group_entry(busy, move |_| record(&entry_log, "busy on"));
        let exit_log = Arc::clone(&log);
        b.on_group_exit(busy, move |_| record(&exit_log, "busy off"));

        let work = b.event("work");
        let finish = b.event("finish");
        let done = b.event("done");
        b.transition(TransitionBuilder::new().on(work).from(idle).to(working))
            .unwrap();
        b.transition(
            TransitionBuilder::new()
                .on(finish)
                .from(working)
                .to(cleanup),
        )
        .unwrap();
        b.transition(TransitionBuilder::new().on(done).from(cleanup).to(idle))
            .unwrap();

        let mut machine = b.build().unwrap();
        machine.fire(work).unwrap();
        // Both endpoints are in `busy`: no boundary crossing.
        machine.fire(finish).unwrap();
        machine.fire(done).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["busy on", "busy off"]);
    }

    #[test]
    fn group_exit_order_is_last_declared_first() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut b: MachineBuilder = MachineBuilder::new("layers");
        let a = b.state("a");
        let z = b.state("z");
        b.initial(a);

        let outer = b.group("outer");
        let inner = b.group("inner");
        // Declaration order on the state: outer, then inner.
        b.add_to_group(a, outer);
        b.add_to_group(a, inner);
        b.add_to_group(z, outer); // `outer` survives the transition
        for (group, name) in [(outer, "outer"), (inner, "inner")] {
            let entry_log = Arc::clone(&log);
            b.on_group_entry(group, move |_| record(&entry_log, format!("+{name}")));
            let exit_log = Arc::clone(&log);
            b.on_group_exit(group, move |_| record(&exit_log, format!("-{name}")));
        }

        let hop = b.event("hop");
        b.transition(TransitionBuilder::new().on(hop).from(a).to(z))
            .unwrap();
        let back = b.event("back");
        b.transition(TransitionBuilder::new().on(back).from(z).to(a))
            .unwrap();

        let mut machine = b.build().unwrap();
        machine.fire(hop).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["-inner"]);

        log.lock().unwrap().clear();
        machine.fire(back).unwrap();
        // Entry order is declaration order.
        assert_eq!(*log.lock().unwrap(), vec!["+inner"]);
    }

    #[test]
    fn forced_transition_runs_chains_but_no_edge_handler() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut b: MachineBuilder = MachineBuilder::new("jump");
        let a = b.state("a");
        let z = b.state("z");
        b.initial(a);
        let go = b.event("go");

        let handler_log = Arc::clone(&log);
        b.transition(
            TransitionBuilder::new()
                .on(go)
                .from(a)
                .to(z)
                .handler(move |_| record(&handler_log, "edge handler")),
        )
        .unwrap();
        let exit_log = Arc::clone(&log);
        b.on_exit(a, move |_| record(&exit_log, "exit a"));
        let entry_log = Arc::clone(&log);
        b.on_entry(z, move |_| record(&entry_log, "enter z"));

        let mut machine = b.build().unwrap();
        let observed = Arc::clone(&log);
        machine.on_transition(move |_| record(&observed, "observed"));

        machine.force(z, go).unwrap();
        assert_eq!(machine.current_state(), z);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["exit a", "enter z", "observed"]
        );
    }

    #[test]
    fn fault_during_deep_exit_names_the_stage() {
        let mut b: MachineBuilder = MachineBuilder::new("amp");
        let off = b.state("off");
        let on = b.state("on");
        b.initial(off);
        let modes = b.child_machine(on, "modes");
        let low = b.state_in(modes, "low");
        b.initial(low);
        let power = b.event("power");
        b.transition(TransitionBuilder::new().on(power).from(off).to(on))
            .unwrap();
        b.transition(TransitionBuilder::new().on(power).from(on).to(off))
            .unwrap();
        b.on_exit_fallible(low, |_| Err("sensor stuck".into()));

        let mut machine = b.build().unwrap();
        machine.fire(power).unwrap();

        let error = machine.fire(power).unwrap_err();
        let fault = match error {
            crate::FireError::TransitionFailed(fault) => fault,
            other => panic!("unexpected error: {other}"),
        };
        assert_eq!(fault.component(), crate::FaultedComponent::ExitHandler);
        assert_eq!(fault.from_name(), "low");
        assert_eq!(fault.to_name(), "off");
        assert_eq!(fault.event_name(), "power");
        assert!(machine.is_faulted());
    }
}
