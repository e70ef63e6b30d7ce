//! Typed handles into the engine's arenas.
//!
//! Every relationship in the hierarchy (state -> owning machine level,
//! machine level -> parent state, state -> groups) is expressed as an id
//! into an arena owned by the engine. Ownership flows strictly
//! machine -> state -> child machine; everything else is a lookup.

use serde::{Deserialize, Serialize};

/// Handle to a state node, issued by [`MachineBuilder`](crate::MachineBuilder).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct StateId(pub(crate) usize);

/// Handle to an event trigger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct EventId(pub(crate) usize);

/// Handle to one machine level in the hierarchy.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct MachineId(pub(crate) usize);

/// Handle to a state group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct GroupId(pub(crate) usize);

impl MachineId {
    /// The root level of every machine tree.
    pub const ROOT: MachineId = MachineId(0);
}

impl StateId {
    /// Position of this state in the engine's state arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl EventId {
    /// Position of this event in the engine's event arena.
    pub fn index(self) -> usize {
        self.0
    }
}
