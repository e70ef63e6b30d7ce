//! Validation errors raised while declaring a machine.

use thiserror::Error;

/// Error raised by [`MachineBuilder`](crate::MachineBuilder) when a
/// declaration is inconsistent.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A machine level was declared without an initial state.
    #[error("machine level '{level}' has no initial state")]
    MissingInitialState {
        /// Name of the offending level.
        level: String,
    },

    /// A nested machine was declared but never given any states.
    #[error("machine level '{level}' has no states")]
    EmptyLevel {
        /// Name of the offending level.
        level: String,
    },

    /// Two states on the same level share a name.
    #[error("duplicate state name '{name}' in machine level '{level}'")]
    DuplicateStateName {
        /// The repeated name.
        name: String,
        /// Name of the level holding both states.
        level: String,
    },

    /// A transition's endpoints live on different machine levels.
    #[error("transition endpoints '{from}' and '{to}' belong to different machine levels")]
    CrossLevelTransition {
        /// Name of the source state.
        from: String,
        /// Name of the target state.
        to: String,
    },

    /// An inner transition was declared with distinct endpoints.
    #[error("inner transitions require identical endpoints")]
    InnerEndpointsDiffer,

    /// A transition was declared without an event.
    #[error("transition declared without an event")]
    MissingEvent,

    /// A transition was declared without a source state.
    #[error("transition declared without a source state")]
    MissingFromState,

    /// A transition was declared without a target state.
    #[error("transition declared without a target state")]
    MissingToState,
}
