//! State nodes: vertices of the state graph.

use super::ids::{GroupId, MachineId};
use super::transition::StateHandler;

/// Vertex in the state graph.
///
/// A state belongs to exactly one machine level and may own one nested
/// machine, entered whenever the state is entered and exited (deepest
/// first) whenever the state is exited. Topology is fixed once the
/// builder finishes.
pub struct StateNode<P> {
    pub(crate) name: String,
    pub(crate) machine: MachineId,
    pub(crate) child: Option<MachineId>,
    pub(crate) on_entry: Option<StateHandler<P>>,
    pub(crate) on_exit: Option<StateHandler<P>>,
    /// Group memberships in declaration order.
    pub(crate) groups: Vec<GroupId>,
}

impl<P> StateNode<P> {
    /// Name of the state, unique within its machine level.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The machine level owning this state.
    pub fn machine(&self) -> MachineId {
        self.machine
    }

    /// The nested machine owned by this state, if any.
    pub fn child_machine(&self) -> Option<MachineId> {
        self.child
    }

    /// Groups this state belongs to, in declaration order.
    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }
}
