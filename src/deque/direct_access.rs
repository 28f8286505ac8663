//! Depth-indexed frontier.
//!
//! One small queue per depth, stored in a vector indexed by depth. The
//! shallowest and deepest non-empty slots are cached, so polling either end
//! is O(1) amortized: the cached index only moves past slots that became
//! empty. The vector grows in batches of slots as deeper levels show up.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{viable, ChoiceOptionDeque};
use crate::node::ChoiceOption;
use crate::types::Depth;

#[derive(Debug, Default)]
struct Slots {
    slots: Vec<VecDeque<Arc<ChoiceOption>>>,
    /// Shallowest non-empty slot (meaningful only when `size > 0`).
    shallowest: usize,
    /// Deepest non-empty slot (meaningful only when `size > 0`).
    deepest: usize,
    size: usize,
}

impl Slots {
    /// Restore the cached-bounds invariant after a removal from `depth`.
    fn removed_from(&mut self, depth: usize) {
        self.size -= 1;
        if self.size == 0 {
            self.shallowest = 0;
            self.deepest = 0;
            return;
        }
        if depth == self.shallowest {
            while self.slots[self.shallowest].is_empty() {
                self.shallowest += 1;
            }
        }
        if depth == self.deepest {
            while self.slots[self.deepest].is_empty() {
                self.deepest -= 1;
            }
        }
    }
}

#[derive(Debug)]
pub struct DirectAccessChoiceOptionDeque {
    inner: Mutex<Slots>,
    growth_batch: usize,
}

impl Default for DirectAccessChoiceOptionDeque {
    fn default() -> Self {
        Self::with_growth_batch(32)
    }
}

impl DirectAccessChoiceOptionDeque {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if `growth_batch == 0`.
    pub fn with_growth_batch(growth_batch: usize) -> Self {
        assert_ne!(growth_batch, 0, "Growth batch should be positive");
        Self {
            inner: Mutex::new(Slots::default()),
            growth_batch,
        }
    }

    /// Number of depth slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChoiceOptionDeque for DirectAccessChoiceOptionDeque {
    fn poll_first(&self) -> Option<Arc<ChoiceOption>> {
        let mut inner = self.lock();
        if inner.size == 0 {
            return None;
        }
        let depth = inner.shallowest;
        let option = inner.slots[depth].pop_front();
        inner.removed_from(depth);
        option
    }

    fn poll_last(&self) -> Option<Arc<ChoiceOption>> {
        let mut inner = self.lock();
        if inner.size == 0 {
            return None;
        }
        let depth = inner.deepest;
        let option = inner.slots[depth].pop_back();
        inner.removed_from(depth);
        option
    }

    fn insert(&self, depth: Depth, options: &[Arc<ChoiceOption>]) {
        let d = depth.get();
        let mut inner = self.lock();
        if inner.slots.len() <= d {
            let len = (d / self.growth_batch + 1) * self.growth_batch;
            inner.slots.resize_with(len, VecDeque::new);
        }
        debug_assert!(
            options.iter().all(|o| inner.slots[d].iter().all(|q| q.id() != o.id())),
            "Option should not be queued twice"
        );
        let before = inner.slots[d].len();
        let batch = viable(depth, options).cloned();
        inner.slots[d].extend(batch);
        let added = inner.slots[d].len() - before;
        if added == 0 {
            return;
        }
        if inner.size == 0 {
            inner.shallowest = d;
            inner.deepest = d;
        } else {
            inner.shallowest = inner.shallowest.min(d);
            inner.deepest = inner.deepest.max(d);
        }
        inner.size += added;
    }

    /// Options are filed under their own depth, so only one slot is searched.
    fn request(&self, option: &ChoiceOption) -> bool {
        let d = option.depth().get();
        let mut inner = self.lock();
        let Some(slot) = inner.slots.get_mut(d) else {
            return false;
        };
        match slot.iter().position(|o| o.id() == option.id()) {
            Some(i) => {
                slot.remove(i);
                inner.removed_from(d);
                true
            }
            None => false,
        }
    }

    fn is_empty(&self) -> bool {
        self.lock().size == 0
    }

    fn size(&self) -> usize {
        self.lock().size
    }
}
