// Queue disciplines for the visit engine. The discipline alone determines
// traversal order; the engine peeks the head repeatedly while a state's
// arcs are being scanned and dequeues only when the state finishes.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use weft_core::StateId;

pub trait Queue {
    /// Current head, if any. Repeated calls without `dequeue` return the
    /// same state.
    fn head(&self) -> Option<StateId>;
    fn enqueue(&mut self, s: StateId);
    /// Remove the head.
    fn dequeue(&mut self);
    fn is_empty(&self) -> bool;
    fn clear(&mut self);
}

/// First-in first-out: breadth-first visitation order.
#[derive(Debug, Default)]
pub struct FifoQueue {
    queue: VecDeque<StateId>,
}

impl FifoQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Queue for FifoQueue {
    fn head(&self) -> Option<StateId> {
        self.queue.front().copied()
    }

    fn enqueue(&mut self, s: StateId) {
        self.queue.push_back(s);
    }

    fn dequeue(&mut self) {
        self.queue.pop_front();
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn clear(&mut self) {
        self.queue.clear();
    }
}

/// Last-in first-out: depth-first visitation order.
#[derive(Debug, Default)]
pub struct LifoQueue {
    stack: Vec<StateId>,
}

impl LifoQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Queue for LifoQueue {
    fn head(&self) -> Option<StateId> {
        self.stack.last().copied()
    }

    fn enqueue(&mut self, s: StateId) {
        self.stack.push(s);
    }

    fn dequeue(&mut self) {
        self.stack.pop();
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn clear(&mut self) {
        self.stack.clear();
    }
}

/// Smallest state id first.
#[derive(Debug, Default)]
pub struct StateOrderQueue {
    heap: BinaryHeap<Reverse<StateId>>,
}

impl StateOrderQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Queue for StateOrderQueue {
    fn head(&self) -> Option<StateId> {
        self.heap.peek().map(|r| r.0)
    }

    fn enqueue(&mut self, s: StateId) {
        self.heap.push(Reverse(s));
    }

    fn dequeue(&mut self) {
        self.heap.pop();
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = FifoQueue::new();
        q.enqueue(1);
        q.enqueue(2);
        q.enqueue(3);
        assert_eq!(q.head(), Some(1));
        assert_eq!(q.head(), Some(1));
        q.dequeue();
        assert_eq!(q.head(), Some(2));
        q.dequeue();
        q.dequeue();
        assert!(q.is_empty());
    }

    #[test]
    fn lifo_order() {
        let mut q = LifoQueue::new();
        q.enqueue(1);
        q.enqueue(2);
        assert_eq!(q.head(), Some(2));
        q.dequeue();
        assert_eq!(q.head(), Some(1));
    }

    #[test]
    fn state_order_picks_smallest() {
        let mut q = StateOrderQueue::new();
        q.enqueue(5);
        q.enqueue(1);
        q.enqueue(3);
        assert_eq!(q.head(), Some(1));
        q.dequeue();
        assert_eq!(q.head(), Some(3));
    }

    #[test]
    fn clear_empties() {
        let mut q = FifoQueue::new();
        q.enqueue(7);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.head(), None);
    }
}
