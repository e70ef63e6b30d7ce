//! FIFO queue of fire requests deferred during a transition.

use std::collections::VecDeque;

use crate::core::FireRequest;

/// Requests that arrived while a transition was already executing on the
/// tree. Drained in arrival order once the outermost transition
/// completes; discarded wholesale if draining faults.
pub(crate) struct ReentrancyQueue<P> {
    items: VecDeque<FireRequest<P>>,
}

impl<P> ReentrancyQueue<P> {
    pub(crate) fn new() -> Self {
        ReentrancyQueue {
            items: VecDeque::new(),
        }
    }

    pub(crate) fn push(&mut self, request: FireRequest<P>) {
        self.items.push_back(request);
    }

    pub(crate) fn pop(&mut self) -> Option<FireRequest<P>> {
        self.items.pop_front()
    }

    /// Move requests a handler queued on its context onto the tail.
    pub(crate) fn absorb(&mut self, pending: &mut Vec<FireRequest<P>>) {
        self.items.extend(pending.drain(..));
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventId, FireMethod, FireRequest};

    fn event_request(id: usize) -> FireRequest<()> {
        FireRequest::Event {
            event: EventId(id),
            payload: (),
            method: FireMethod::TryFire,
        }
    }

    #[test]
    fn drains_in_arrival_order() {
        let mut queue = ReentrancyQueue::new();
        queue.push(event_request(0));
        queue.push(event_request(1));
        queue.push(event_request(2));

        let mut order = Vec::new();
        while let Some(FireRequest::Event { event, .. }) = queue.pop() {
            order.push(event.index());
        }
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn absorb_appends_at_the_tail() {
        let mut queue = ReentrancyQueue::new();
        queue.push(event_request(0));

        let mut pending = vec![event_request(1), event_request(2)];
        queue.absorb(&mut pending);

        assert!(pending.is_empty());
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn clear_discards_everything() {
        let mut queue = ReentrancyQueue::new();
        queue.push(event_request(0));
        queue.push(event_request(1));
        queue.clear();
        assert!(queue.pop().is_none());
    }
}
