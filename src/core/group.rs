//! Cross-cutting state groups with boundary handlers.

use super::transition::StateHandler;

/// Named membership shared by several states, possibly across machine
/// levels.
///
/// A group's entry handler runs when a transition crosses into its
/// membership (target side but not source side) and its exit handler when
/// a transition crosses out. Each boundary handler runs at most once per
/// transition, however deep the hierarchical walk.
pub struct Group<P> {
    pub(crate) name: String,
    pub(crate) on_entry: Option<StateHandler<P>>,
    pub(crate) on_exit: Option<StateHandler<P>>,
}

impl<P> Group<P> {
    /// Name of the group.
    pub fn name(&self) -> &str {
        &self.name
    }
}
