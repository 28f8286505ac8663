//! Append-only storage for tree nodes and options.
//!
//! Nodes and options are addressed by dense handles ([`NodeId`], [`OptionId`])
//! instead of owning pointers, which sidesteps the parent/child reference
//! cycles of the tree. Entries are never removed, so a handle stays valid for
//! the lifetime of the arena.
//!
//! Readers clone an `Arc` out of the table and release the lock immediately.
//! Lock order is: option lock, then node table, then option table. The arena
//! never takes an option lock while holding a table lock.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crate::error::TreeError;
use crate::expr::Constraint;
use crate::node::{Choice, ChoiceOption, NodeKind, TreeNode};
use crate::types::{BranchId, Depth, NodeId, OptionId};

pub struct Arena {
    nodes: RwLock<Vec<Arc<TreeNode>>>,
    options: RwLock<Vec<Arc<ChoiceOption>>>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("nodes", &self.node_count())
            .field("options", &self.option_count())
            .finish()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Arena {
    /// Create an arena holding the root choice: a single option guarded by
    /// `true`, in state `Unknown`.
    pub fn new() -> Self {
        let arena = Self {
            nodes: RwLock::new(Vec::new()),
            options: RwLock::new(Vec::new()),
        };
        let root = arena.push_choice(None, Depth::ROOT, vec![Constraint::truth()], None);
        assert_eq!(root, NodeId::ROOT); // Make sure the root choice is (0).
        arena
    }

    /// Number of nodes (choices and leaves).
    pub fn node_count(&self) -> usize {
        read(&self.nodes).len()
    }

    /// Number of options over all choices.
    pub fn option_count(&self) -> usize {
        read(&self.options).len()
    }

    pub fn node(&self, id: NodeId) -> Result<Arc<TreeNode>, TreeError> {
        read(&self.nodes)
            .get(id.index())
            .cloned()
            .ok_or_else(|| TreeError::IllegalTreeAccess(format!("no node {}", id)))
    }

    pub fn option(&self, id: OptionId) -> Result<Arc<ChoiceOption>, TreeError> {
        read(&self.options)
            .get(id.index())
            .cloned()
            .ok_or_else(|| TreeError::IllegalTreeAccess(format!("no option {}", id)))
    }

    /// The options of the choice `id`, in order.
    pub fn choice_options(&self, id: NodeId) -> Result<Vec<Arc<ChoiceOption>>, TreeError> {
        let node = self.node(id)?;
        let choice = node.as_choice().ok_or(TreeError::NotAChoice(id))?;
        choice.options().iter().map(|&o| self.option(o)).collect()
    }

    /// Snapshot of all nodes, in creation order.
    pub fn nodes(&self) -> Vec<Arc<TreeNode>> {
        read(&self.nodes).clone()
    }

    /// Snapshot of all options, in creation order.
    pub fn options(&self) -> Vec<Arc<ChoiceOption>> {
        read(&self.options).clone()
    }

    /// The option a node hangs from, `None` for the root choice.
    pub fn parent_option(&self, node: NodeId) -> Result<Option<Arc<ChoiceOption>>, TreeError> {
        match self.node(node)?.parent() {
            Some(parent) => self.option(parent).map(Some),
            None => Ok(None),
        }
    }

    /// Create a choice below `parent`, one option per constraint.
    ///
    /// The parent must be able to take a child: no child yet, and a legal
    /// transition to `Evaluated`.
    pub fn new_choice(
        &self,
        parent: &ChoiceOption,
        constraints: Vec<Constraint>,
        branch: Option<BranchId>,
    ) -> Result<NodeId, TreeError> {
        if constraints.is_empty() {
            return Err(TreeError::EmptyChoice);
        }
        let id = parent.attach_choice(|| self.push_choice(Some(parent.id()), parent.depth().next(), constraints, branch))?;
        debug!("new choice {} below {} at {}", id, parent.id(), parent.depth().next());
        Ok(id)
    }

    fn push_choice(&self, parent: Option<OptionId>, depth: Depth, constraints: Vec<Constraint>, branch: Option<BranchId>) -> NodeId {
        let mut nodes = write(&self.nodes);
        let mut options = write(&self.options);
        let id = NodeId::new(nodes.len() as u32);
        let first = options.len();
        let mut handles = Vec::with_capacity(constraints.len());
        for (number, constraint) in constraints.into_iter().enumerate() {
            let option_id = OptionId::new((first + number) as u32);
            options.push(Arc::new(ChoiceOption::new(option_id, id, number, depth, constraint)));
            handles.push(option_id);
        }
        let choice = Choice::new(handles, branch);
        nodes.push(Arc::new(TreeNode::new(id, parent, depth, NodeKind::Choice(choice))));
        id
    }

    pub(crate) fn push_node(&self, parent: Option<OptionId>, depth: Depth, kind: NodeKind) -> NodeId {
        let mut nodes = write(&self.nodes);
        let id = NodeId::new(nodes.len() as u32);
        nodes.push(Arc::new(TreeNode::new(id, parent, depth, kind)));
        id
    }
}
