//! Type-safe handles for search tree entities.
//!
//! This module provides newtype wrappers that enforce compile-time distinction
//! between node handles, option handles, depths, and branch-point identifiers,
//! preventing common mistakes in tree manipulation code.

use std::fmt;

/// A handle to a [`TreeNode`][crate::node::TreeNode] stored in the arena.
///
/// Handles are dense indices into the arena, assigned in creation order.
/// The root choice is always `NodeId(0)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The handle of the root choice.
    pub const ROOT: NodeId = NodeId(0);

    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the arena index of the node.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A handle to a [`ChoiceOption`][crate::node::ChoiceOption] stored in the arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OptionId(u32);

impl OptionId {
    /// The handle of the single option below the root choice.
    pub const ROOT: OptionId = OptionId(0);

    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the arena index of the option.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "o{}", self.0)
    }
}

/// Depth of a node in the search tree (0-indexed).
///
/// # Invariants
///
/// - The root choice (and its option) has depth 0
/// - A node's depth is its parent option's depth plus one
/// - Options share the depth of the choice owning them
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Depth(u32);

impl Depth {
    pub const ROOT: Depth = Depth(0);

    pub const fn new(depth: u32) -> Self {
        Self(depth)
    }

    /// Returns the raw depth as a `usize`.
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Returns the depth one level further from the root.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the depth one level closer to the root, or None at the root.
    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

impl From<Depth> for usize {
    fn from(depth: Depth) -> Self {
        depth.get()
    }
}

/// Identifier of a branch point in the program under test.
///
/// Branch ids are stable across runs: the same source-level conditional
/// reached along different paths produces choices sharing one id.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BranchId(pub u32);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_navigation() {
        let d0 = Depth::ROOT;
        let d1 = d0.next();
        let d2 = d1.next();

        assert!(d0.is_root());
        assert!(!d1.is_root());
        assert_eq!(d2.get(), 2);
        assert_eq!(d2.prev(), Some(d1));
        assert_eq!(d0.prev(), None);
        assert!(d0 < d1);
    }

    #[test]
    fn test_handles_display() {
        assert_eq!(NodeId::new(3).to_string(), "n3");
        assert_eq!(OptionId::new(7).to_string(), "o7");
        assert_eq!(BranchId(2).to_string(), "b2");
        assert_eq!(Depth::new(4).to_string(), "D4");
    }
}
