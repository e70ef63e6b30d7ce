//! Declarative construction of a machine tree.

use tracing::debug;

use crate::core::{
    EventId, EventTrigger, Group, GroupId, HandlerResult, MachineId, StateId, StateNode,
    TransitionContext, TransitionEdge,
};
use crate::engine::{MachineLevel, StateMachine};

use super::error::BuildError;
use super::transition::TransitionBuilder;

struct LevelSpec {
    name: String,
    parent: Option<StateId>,
    states: Vec<StateId>,
    initial: Option<StateId>,
}

/// Declares a whole machine tree, then validates and assembles it into a
/// [`StateMachine`].
///
/// Ids handed out by the builder (`StateId`, `EventId`, `MachineId`,
/// `GroupId`) are only meaningful for the machine it builds. Methods that
/// take an id panic when given one from another builder.
///
/// ```rust
/// use statik::{MachineBuilder, TransitionBuilder};
///
/// let mut b: MachineBuilder = MachineBuilder::new("door");
/// let closed = b.state("closed");
/// let open = b.state("open");
/// b.initial(closed);
/// let push = b.event("push");
/// b.transition(TransitionBuilder::new().on(push).from(closed).to(open))
///     .unwrap();
///
/// let mut door = b.build().unwrap();
/// door.fire(push).unwrap();
/// assert_eq!(door.current_state(), open);
/// ```
pub struct MachineBuilder<P = ()> {
    levels: Vec<LevelSpec>,
    states: Vec<StateNode<P>>,
    events: Vec<EventTrigger<P>>,
    groups: Vec<Group<P>>,
}

impl<P> std::fmt::Debug for MachineBuilder<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineBuilder")
            .field("name", &self.levels[0].name)
            .field("levels", &self.levels.len())
            .field("states", &self.states.len())
            .field("events", &self.events.len())
            .field("groups", &self.groups.len())
            .finish_non_exhaustive()
    }
}

impl<P> MachineBuilder<P> {
    /// Start a builder whose root level carries `name`.
    pub fn new(name: impl Into<String>) -> Self {
        MachineBuilder {
            levels: vec![LevelSpec {
                name: name.into(),
                parent: None,
                states: Vec::new(),
                initial: None,
            }],
            states: Vec::new(),
            events: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Declare a state on the root level.
    pub fn state(&mut self, name: impl Into<String>) -> StateId {
        self.state_in(MachineId::ROOT, name)
    }

    /// Declare a state on an explicit machine level.
    pub fn state_in(&mut self, machine: MachineId, name: impl Into<String>) -> StateId {
        let id = StateId(self.states.len());
        self.states.push(StateNode {
            name: name.into(),
            machine,
            child: None,
            on_entry: None,
            on_exit: None,
            groups: Vec::new(),
        });
        self.levels[machine.0].states.push(id);
        id
    }

    /// Give `parent` a nested machine level named `name`.
    ///
    /// The nested level is entered whenever `parent` is entered and exited
    /// whenever it is exited. A state owns at most one nested machine.
    pub fn child_machine(&mut self, parent: StateId, name: impl Into<String>) -> MachineId {
        let id = MachineId(self.levels.len());
        self.levels.push(LevelSpec {
            name: name.into(),
            parent: Some(parent),
            states: Vec::new(),
            initial: None,
        });
        self.states[parent.0].child = Some(id);
        id
    }

    /// Mark `state` as the initial state of its machine level.
    pub fn initial(&mut self, state: StateId) {
        let machine = self.states[state.0].machine;
        self.levels[machine.0].initial = Some(state);
    }

    /// Declare an event shared by the whole tree.
    pub fn event(&mut self, name: impl Into<String>) -> EventId {
        let id = EventId(self.events.len());
        self.events.push(EventTrigger::new(name.into()));
        id
    }

    /// Declare a cross-cutting group.
    pub fn group(&mut self, name: impl Into<String>) -> GroupId {
        let id = GroupId(self.groups.len());
        self.groups.push(Group {
            name: name.into(),
            on_entry: None,
            on_exit: None,
        });
        id
    }

    /// Add `state` to `group`. Boundary handler order follows the order
    /// of these calls per state.
    pub fn add_to_group(&mut self, state: StateId, group: GroupId) {
        self.states[state.0].groups.push(group);
    }

    /// Attach an infallible entry handler to `state`.
    pub fn on_entry(
        &mut self,
        state: StateId,
        mut handler: impl FnMut(&mut TransitionContext<P>) + Send + 'static,
    ) {
        self.states[state.0].on_entry = Some(Box::new(move |ctx| {
            handler(ctx);
            Ok(())
        }));
    }

    /// Attach an entry handler whose failure faults the machine.
    pub fn on_entry_fallible(
        &mut self,
        state: StateId,
        handler: impl FnMut(&mut TransitionContext<P>) -> HandlerResult + Send + 'static,
    ) {
        self.states[state.0].on_entry = Some(Box::new(handler));
    }

    /// Attach an infallible exit handler to `state`.
    pub fn on_exit(
        &mut self,
        state: StateId,
        mut handler: impl FnMut(&mut TransitionContext<P>) + Send + 'static,
    ) {
        self.states[state.0].on_exit = Some(Box::new(move |ctx| {
            handler(ctx);
            Ok(())
        }));
    }

    /// Attach an exit handler whose failure faults the machine.
    pub fn on_exit_fallible(
        &mut self,
        state: StateId,
        handler: impl FnMut(&mut TransitionContext<P>) -> HandlerResult + Send + 'static,
    ) {
        self.states[state.0].on_exit = Some(Box::new(handler));
    }

    /// Attach an infallible boundary-entry handler to `group`.
    pub fn on_group_entry(
        &mut self,
        group: GroupId,
        mut handler: impl FnMut(&mut TransitionContext<P>) + Send + 'static,
    ) {
        self.groups[group.0].on_entry = Some(Box::new(move |ctx| {
            handler(ctx);
            Ok(())
        }));
    }

    /// Attach a boundary-entry handler whose failure faults the machine.
    pub fn on_group_entry_fallible(
        &mut self,
        group: GroupId,
        handler: impl FnMut(&mut TransitionContext<P>) -> HandlerResult + Send + 'static,
    ) {
        self.groups[group.0].on_entry = Some(Box::new(handler));
    }

    /// Attach an infallible boundary-exit handler to `group`.
    pub fn on_group_exit(
        &mut self,
        group: GroupId,
        mut handler: impl FnMut(&mut TransitionContext<P>) + Send + 'static,
    ) {
        self.groups[group.0].on_exit = Some(Box::new(move |ctx| {
            handler(ctx);
            Ok(())
        }));
    }

    /// Attach a boundary-exit handler whose failure faults the machine.
    pub fn on_group_exit_fallible(
        &mut self,
        group: GroupId,
        handler: impl FnMut(&mut TransitionContext<P>) -> HandlerResult + Send + 'static,
    ) {
        self.groups[group.0].on_exit = Some(Box::new(handler));
    }

    /// Register a transition edge. Endpoints must live on the same
    /// machine level; inner edges must be self-edges.
    pub fn transition(&mut self, edge: TransitionBuilder<P>) -> Result<&mut Self, BuildError> {
        let event = edge.event.ok_or(BuildError::MissingEvent)?;
        let from = edge.from.ok_or(BuildError::MissingFromState)?;
        let to = edge.to.ok_or(BuildError::MissingToState)?;
        if self.states[from.0].machine != self.states[to.0].machine {
            return Err(BuildError::CrossLevelTransition {
                from: self.states[from.0].name.clone(),
                to: self.states[to.0].name.clone(),
            });
        }
        if edge.is_inner && from != to {
            return Err(BuildError::InnerEndpointsDiffer);
        }
        self.events[event.0].add_edge(TransitionEdge {
            from,
            to,
            guard: edge.guard,
            handler: edge.handler,
            is_inner: edge.is_inner,
        });
        Ok(self)
    }
}

impl<P: Clone> MachineBuilder<P> {
    /// Validate the declarations and assemble the machine, activated at
    /// its initial configuration.
    pub fn build(self) -> Result<StateMachine<P>, BuildError> {
        let mut levels = Vec::with_capacity(self.levels.len());
        for spec in self.levels {
            if spec.states.is_empty() {
                return Err(BuildError::EmptyLevel { level: spec.name });
            }
            let Some(initial) = spec.initial else {
                return Err(BuildError::MissingInitialState { level: spec.name });
            };
            for (i, a) in spec.states.iter().enumerate() {
                for b in &spec.states[i + 1..] {
                    if self.states[a.0].name == self.states[b.0].name {
                        return Err(BuildError::DuplicateStateName {
                            name: self.states[a.0].name.clone(),
                            level: spec.name,
                        });
                    }
                }
            }
            levels.push(MachineLevel {
                name: spec.name,
                parent: spec.parent,
                states: spec.states,
                initial,
                current: None,
            });
        }

        debug!(
            levels = levels.len(),
            states = self.states.len(),
            events = self.events.len(),
            "state machine assembled"
        );
        let mut machine =
            StateMachine::from_arenas(levels, self.states, self.events, self.groups);
        machine.reset_now();
        Ok(machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_an_initial_state() {
        let mut b: MachineBuilder = MachineBuilder::new("root");
        b.state("only");
        assert_eq!(
            b.build().unwrap_err(),
            BuildError::MissingInitialState {
                level: "root".to_string()
            }
        );
    }

    #[test]
    fn nested_levels_are_validated_too() {
        let mut b: MachineBuilder = MachineBuilder::new("root");
        let outer = b.state("outer");
        b.initial(outer);
        b.child_machine(outer, "inner");
        assert_eq!(
            b.build().unwrap_err(),
            BuildError::EmptyLevel {
                level: "inner".to_string()
            }
        );
    }

    #[test]
    fn duplicate_names_are_rejected_per_level() {
        let mut b: MachineBuilder = MachineBuilder::new("root");
        let a = b.state("same");
        b.state("same");
        b.initial(a);
        assert_eq!(
            b.build().unwrap_err(),
            BuildError::DuplicateStateName {
                name: "same".to_string(),
                level: "root".to_string()
            }
        );
    }

    #[test]
    fn same_name_on_different_levels_is_fine() {
        let mut b: MachineBuilder = MachineBuilder::new("root");
        let outer = b.state("same");
        b.initial(outer);
        let inner = b.child_machine(outer, "inner");
        let nested = b.state_in(inner, "same");
        b.initial(nested);
        assert!(b.build().is_ok());
    }

    #[test]
    fn transitions_must_stay_on_one_level() {
        let mut b: MachineBuilder = MachineBuilder::new("root");
        let outer = b.state("outer");
        b.initial(outer);
        let inner = b.child_machine(outer, "inner");
        let nested = b.state_in(inner, "nested");
        b.initial(nested);
        let hop = b.event("hop");

        let err = b
            .transition(TransitionBuilder::new().on(hop).from(outer).to(nested))
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::CrossLevelTransition {
                from: "outer".to_string(),
                to: "nested".to_string()
            }
        );
    }

    #[test]
    fn inner_edges_must_be_self_edges() {
        let mut b: MachineBuilder = MachineBuilder::new("root");
        let a = b.state("a");
        let z = b.state("z");
        b.initial(a);
        let hop = b.event("hop");

        let err = b
            .transition(TransitionBuilder::new().on(hop).from(a).to(z).inner())
            .unwrap_err();
        assert_eq!(err, BuildError::InnerEndpointsDiffer);
    }

    #[test]
    fn partial_edges_name_the_missing_piece() {
        let mut b: MachineBuilder = MachineBuilder::new("root");
        let a = b.state("a");
        b.initial(a);
        let hop = b.event("hop");

        assert_eq!(
            b.transition(TransitionBuilder::new().from(a).to(a))
                .unwrap_err(),
            BuildError::MissingEvent
        );
        assert_eq!(
            b.transition(TransitionBuilder::new().on(hop).to(a))
                .unwrap_err(),
            BuildError::MissingFromState
        );
        assert_eq!(
            b.transition(TransitionBuilder::new().on(hop).from(a))
                .unwrap_err(),
            BuildError::MissingToState
        );
    }

    #[test]
    fn builder_debug_summarizes_the_declarations() {
        let mut b: MachineBuilder = MachineBuilder::new("root");
        b.state("a");
        b.event("go");
        let rendered = format!("{b:?}");
        assert!(rendered.contains("MachineBuilder"));
        assert!(rendered.contains("root"));
    }

    #[test]
    fn built_machine_starts_at_the_initial_chain() {
        let mut b: MachineBuilder = MachineBuilder::new("root");
        let outer = b.state("outer");
        b.initial(outer);
        let inner = b.child_machine(outer, "inner");
        let nested = b.state_in(inner, "nested");
        b.initial(nested);

        let machine = b.build().unwrap();
        assert_eq!(machine.active_path(), vec![outer, nested]);
        assert_eq!(machine.machine_name(inner), "inner");
    }
}
