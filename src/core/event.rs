//! Event triggers and their per-source candidate edge lists.

use std::collections::HashMap;

use super::ids::StateId;
use super::transition::TransitionEdge;

/// How a fire request was made.
///
/// The throwing form ([`fire`](crate::StateMachine::fire)) surfaces a
/// missed transition as an error; the non-throwing form
/// ([`try_fire`](crate::StateMachine::try_fire)) reports it only to
/// observers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FireMethod {
    /// Throwing form: a miss is a user-visible failure.
    Fire,
    /// Non-throwing form: a miss returns `false`.
    TryFire,
}

/// Named stimulus that may cause a transition.
///
/// An event holds, per source state, the ordered list of candidate edges
/// registered for it. Firing tries the candidates for the current state in
/// registration order; the first whose guard accepts (or that has no
/// guard) is taken.
pub struct EventTrigger<P> {
    pub(crate) name: String,
    pub(crate) candidates: HashMap<StateId, Vec<TransitionEdge<P>>>,
}

impl<P> EventTrigger<P> {
    pub(crate) fn new(name: String) -> Self {
        EventTrigger {
            name,
            candidates: HashMap::new(),
        }
    }

    /// Name of the event.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn add_edge(&mut self, edge: TransitionEdge<P>) {
        self.candidates.entry(edge.from).or_default().push(edge);
    }

    /// Whether any edge is registered for `from`, regardless of guards.
    pub(crate) fn has_candidates_for(&self, from: StateId) -> bool {
        self.candidates
            .get(&from)
            .is_some_and(|edges| !edges.is_empty())
    }

    /// Index of the first candidate from `from` whose guard accepts
    /// `payload`, in registration order.
    pub(crate) fn resolve(&self, from: StateId, payload: &P) -> Option<usize> {
        self.candidates
            .get(&from)?
            .iter()
            .position(|edge| edge.accepts(payload))
    }

    pub(crate) fn edge_mut(&mut self, from: StateId, index: usize) -> Option<&mut TransitionEdge<P>> {
        self.candidates.get_mut(&from)?.get_mut(index)
    }

    pub(crate) fn edge(&self, from: StateId, index: usize) -> Option<&TransitionEdge<P>> {
        self.candidates.get(&from)?.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::guard::Guard;

    fn edge(from: usize, to: usize, guard: Option<Guard<i32>>) -> TransitionEdge<i32> {
        TransitionEdge {
            from: StateId(from),
            to: StateId(to),
            guard,
            handler: None,
            is_inner: false,
        }
    }

    #[test]
    fn resolve_picks_first_accepting_guard() {
        let mut event = EventTrigger::new("go".to_string());
        event.add_edge(edge(0, 1, Some(Guard::new(|n: &i32| *n < 0))));
        event.add_edge(edge(0, 2, Some(Guard::new(|n: &i32| *n > 0))));

        assert_eq!(event.resolve(StateId(0), &5), Some(1));
        assert_eq!(event.resolve(StateId(0), &-5), Some(0));
        assert_eq!(event.resolve(StateId(0), &0), None);
    }

    #[test]
    fn resolve_respects_registration_order() {
        let mut event = EventTrigger::new("go".to_string());
        event.add_edge(edge(0, 1, None));
        event.add_edge(edge(0, 2, None));

        // Both apply; the first registered wins.
        assert_eq!(event.resolve(StateId(0), &0), Some(0));
    }

    #[test]
    fn resolve_is_scoped_to_the_source_state() {
        let mut event = EventTrigger::new("go".to_string());
        event.add_edge(edge(0, 1, None));

        assert!(event.has_candidates_for(StateId(0)));
        assert!(!event.has_candidates_for(StateId(1)));
        assert_eq!(event.resolve(StateId(1), &0), None);
    }
}
