//! Single-sequence frontier.
//!
//! All options live in one sequence sorted by depth. A batch deeper than
//! (or as deep as) the back is appended, a batch shallower than the front is
//! prepended, anything else is spliced in after a linear scan. This is
//! correct for every access pattern but degrades when batches keep landing in
//! the middle.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{viable, ChoiceOptionDeque};
use crate::node::ChoiceOption;
use crate::types::Depth;

#[derive(Debug, Default)]
pub struct SimpleChoiceOptionDeque {
    options: Mutex<VecDeque<Arc<ChoiceOption>>>,
}

impl SimpleChoiceOptionDeque {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<ChoiceOption>>> {
        self.options.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChoiceOptionDeque for SimpleChoiceOptionDeque {
    fn poll_first(&self) -> Option<Arc<ChoiceOption>> {
        self.lock().pop_front()
    }

    fn poll_last(&self) -> Option<Arc<ChoiceOption>> {
        self.lock().pop_back()
    }

    fn insert(&self, depth: Depth, options: &[Arc<ChoiceOption>]) {
        let batch: Vec<Arc<ChoiceOption>> = viable(depth, options).cloned().collect();
        if batch.is_empty() {
            return;
        }
        let mut queue = self.lock();
        debug_assert!(
            batch.iter().all(|o| queue.iter().all(|q| q.id() != o.id())),
            "Option should not be queued twice"
        );

        if queue.back().map_or(true, |o| o.depth() <= depth) {
            queue.extend(batch);
        } else if queue.front().is_some_and(|o| depth < o.depth()) {
            for option in batch.into_iter().rev() {
                queue.push_front(option);
            }
        } else {
            // Splice before the first strictly deeper option.
            let at = queue.iter().position(|o| o.depth() > depth).unwrap_or(queue.len());
            for (offset, option) in batch.into_iter().enumerate() {
                queue.insert(at + offset, option);
            }
        }
    }

    fn request(&self, option: &ChoiceOption) -> bool {
        let mut queue = self.lock();
        match queue.iter().position(|o| o.id() == option.id()) {
            Some(i) => {
                queue.remove(i);
                true
            }
            None => false,
        }
    }

    fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn size(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::arena::Arena;
    use crate::deque::tests::sibling_batches;

    #[test]
    fn test_splice_keeps_sibling_order() {
        let arena = Arena::new();
        let batches = sibling_batches(&arena, 3);
        let deque = SimpleChoiceOptionDeque::new();

        deque.insert(batches[0][0].depth(), &batches[0][1..]);
        deque.insert(batches[2][0].depth(), &batches[2][1..]);
        deque.insert(batches[1][0].depth(), &batches[1][1..]);

        let ids: Vec<_> = deque.drain().iter().map(|o| o.id()).collect();
        let expected: Vec<_> = batches.iter().flat_map(|b| b[1..].iter().map(|o| o.id())).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_prepend_shallower_batch() {
        let arena = Arena::new();
        let batches = sibling_batches(&arena, 2);
        let deque = SimpleChoiceOptionDeque::new();

        deque.insert(batches[1][0].depth(), &batches[1][1..]);
        deque.insert(batches[0][0].depth(), &batches[0][1..]);

        assert_eq!(deque.poll_first().unwrap().id(), batches[0][1].id());
        assert_eq!(deque.poll_last().unwrap().id(), batches[1][2].id());
    }
}
