//! Core data model of the hierarchy: ids, states, events, edges, guards,
//! groups and faults.
//!
//! Everything here is owned by the engine's arenas
//! ([`StateMachine`](crate::StateMachine)); the types in this module hold
//! no references back into the tree, only ids.

mod error;
mod event;
mod fault;
mod group;
mod guard;
mod ids;
mod state;
mod transition;

pub use error::FireError;
pub use event::{EventTrigger, FireMethod};
pub use fault::{Fault, FaultedComponent};
pub use group::Group;
pub use guard::Guard;
pub use ids::{EventId, GroupId, MachineId, StateId};
pub use state::StateNode;
pub use transition::{
    HandlerError, HandlerResult, StateHandler, TransitionContext, TransitionEdge,
};

pub(crate) use transition::FireRequest;
