//! Declarative construction and validation of machine trees.

mod error;
mod machine;
mod transition;

pub use error::BuildError;
pub use machine::MachineBuilder;
pub use transition::TransitionBuilder;
