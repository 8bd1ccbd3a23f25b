//! Priority queue with a restricted push contract.
//!
//! A max-priority queue over integer priorities where every push must
//! carry a priority greater than or equal to the current maximum minus
//! one. Under that contract, splitting elements by priority parity keeps
//! both internal stacks sorted by increasing priority, so every
//! operation is O(1). Elements of equal priority pop in LIFO order.
//!
//! This is exactly the discipline of highest-label push-relabel: a
//! discharge at height `h` only activates nodes at height `h - 1` (a
//! push) or re-activates nodes at height `>= h` (a relabel), so the
//! queue never sees a push more than one below the top.

/// Max-priority queue allowing only pushes with priority >= top - 1.
///
/// Violating the push contract, or popping an empty queue, is a
/// programmer error: both are checked with `debug_assert!` and yield
/// erroneous queue behavior in release builds.
#[derive(Clone, Debug, Default)]
pub struct RestrictedPriorityQueue<E> {
    even_queue: Vec<(E, usize)>,
    odd_queue: Vec<(E, usize)>,
}

impl<E: Copy> RestrictedPriorityQueue<E> {
    pub fn new() -> Self {
        Self {
            even_queue: Vec::new(),
            odd_queue: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.even_queue.is_empty() && self.odd_queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.even_queue.clear();
        self.odd_queue.clear();
    }

    pub fn push(&mut self, element: E, priority: usize) {
        debug_assert!(self
            .even_queue
            .last()
            .map_or(true, |&(_, p)| priority + 1 >= p));
        debug_assert!(self.odd_queue.last().map_or(true, |&(_, p)| priority + 1 >= p));
        if priority & 1 == 1 {
            // Under the contract this parity stack stays sorted.
            debug_assert!(self.odd_queue.last().map_or(true, |&(_, p)| priority >= p));
            self.odd_queue.push((element, priority));
        } else {
            debug_assert!(self.even_queue.last().map_or(true, |&(_, p)| priority >= p));
            self.even_queue.push((element, priority));
        }
    }

    /// Removes and returns an element with the highest priority.
    pub fn pop(&mut self) -> E {
        debug_assert!(!self.is_empty());
        let even_priority = self.even_queue.last().map(|&(_, p)| p);
        let odd_priority = self.odd_queue.last().map(|&(_, p)| p);
        match (even_priority, odd_priority) {
            (Some(pe), Some(po)) => {
                if po > pe {
                    self.odd_queue.pop().unwrap().0
                } else {
                    self.even_queue.pop().unwrap().0
                }
            }
            (Some(_), None) => self.even_queue.pop().unwrap().0,
            (None, _) => self.odd_queue.pop().unwrap().0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_decreasing_priority() {
        let mut q = RestrictedPriorityQueue::new();
        q.push('a', 3);
        q.push('b', 4);
        q.push('c', 3);
        q.push('d', 4);
        assert_eq!(q.pop(), 'd');
        assert_eq!(q.pop(), 'b');
        // Ties are LIFO.
        assert_eq!(q.pop(), 'c');
        assert_eq!(q.pop(), 'a');
        assert!(q.is_empty());
    }

    #[test]
    fn push_one_below_top_is_allowed() {
        let mut q = RestrictedPriorityQueue::new();
        q.push(1usize, 10);
        q.push(2, 9);
        q.push(3, 10);
        q.push(4, 9);
        assert_eq!(q.pop(), 3);
        assert_eq!(q.pop(), 1);
        q.push(5, 8);
        assert_eq!(q.pop(), 4);
        assert_eq!(q.pop(), 2);
        assert_eq!(q.pop(), 5);
    }

    #[test]
    fn clear_empties_both_parities() {
        let mut q = RestrictedPriorityQueue::new();
        q.push(0usize, 0);
        q.push(1, 1);
        q.clear();
        assert!(q.is_empty());
    }
}
