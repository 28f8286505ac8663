//! The exploration frontier.
//!
//! A [`ChoiceOptionDeque`] indexes the options that are still waiting to be
//! evaluated, ordered by depth. Polling the front yields shallow options
//! (breadth-first flavour), polling the back yields deep ones (depth-first
//! flavour). The deque never owns nodes: it holds shared handles into the
//! arena, and an option leaves it exactly once, by polling or by
//! [`request`][ChoiceOptionDeque::request].
//!
//! | Implementation | Insert | Poll | Request | Use Case |
//! |----------------|--------|------|---------|----------|
//! | [`SimpleChoiceOptionDeque`] | O(n) worst case | O(1) | O(n) | Shallow trees, debugging |
//! | [`DirectAccessChoiceOptionDeque`] | O(1) amortized | O(1) amortized | O(slot) | Default |
//!
//! Both implementations drop options that are already unsatisfiable at
//! insertion time. The rest of the engine relies on this: everything polled
//! from a deque is still viable.
//!
//! # Example
//!
//! ```
//! use symtree::deque::{DequeConfig, DequeKind};
//!
//! let deque = DequeConfig::default().build().unwrap();
//! assert!(deque.is_empty());
//!
//! let simple = DequeConfig { kind: DequeKind::Simple, ..DequeConfig::default() }.build().unwrap();
//! assert_eq!(simple.size(), 0);
//! ```

mod direct_access;
mod simple;

use std::sync::Arc;

pub use direct_access::DirectAccessChoiceOptionDeque;
pub use simple::SimpleChoiceOptionDeque;

use crate::error::ConfigError;
use crate::node::ChoiceOption;
use crate::types::Depth;

/// The frontier contract. Implementations are internally synchronized.
pub trait ChoiceOptionDeque: Send + Sync {
    /// Remove and return a shallowest option.
    fn poll_first(&self) -> Option<Arc<ChoiceOption>>;

    /// Remove and return a deepest option.
    fn poll_last(&self) -> Option<Arc<ChoiceOption>>;

    /// Insert a batch of sibling options living at `depth`.
    ///
    /// Options that are already unsatisfiable are skipped. An option must
    /// not be inserted while it is still queued.
    fn insert(&self, depth: Depth, options: &[Arc<ChoiceOption>]);

    /// Remove a specific option. Returns `false` if it was not in the deque.
    fn request(&self, option: &ChoiceOption) -> bool;

    fn is_empty(&self) -> bool;

    fn size(&self) -> usize;

    /// Remove every remaining option, shallowest first.
    fn drain(&self) -> Vec<Arc<ChoiceOption>> {
        std::iter::from_fn(|| self.poll_first()).collect()
    }
}

/// Which built-in deque to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DequeKind {
    Simple,
    #[default]
    DirectAccess,
}

/// Frontier configuration.
#[derive(Debug, Clone)]
pub struct DequeConfig {
    pub kind: DequeKind,
    /// Number of depth slots the direct-access deque grows by at once.
    pub growth_batch: usize,
}

impl Default for DequeConfig {
    fn default() -> Self {
        Self {
            kind: DequeKind::default(),
            growth_batch: 32,
        }
    }
}

impl DequeConfig {
    pub fn build(&self) -> Result<Box<dyn ChoiceOptionDeque>, ConfigError> {
        match self.kind {
            DequeKind::Simple => Ok(Box::new(SimpleChoiceOptionDeque::new())),
            DequeKind::DirectAccess => {
                if self.growth_batch == 0 {
                    return Err(ConfigError::ZeroGrowthBatch);
                }
                Ok(Box::new(DirectAccessChoiceOptionDeque::with_growth_batch(self.growth_batch)))
            }
        }
    }
}

/// Options worth enqueueing. Every option of the batch lives at `depth`.
fn viable(depth: Depth, options: &[Arc<ChoiceOption>]) -> impl Iterator<Item = &Arc<ChoiceOption>> {
    debug_assert!(
        options.iter().all(|o| o.depth() == depth),
        "Batch should live at depth {}",
        depth
    );
    options.iter().filter(|o| !o.is_unsatisfiable())
}
