//! Search tree nodes.
//!
//! The tree alternates between two kinds of entities:
//!
//! - a [`TreeNode`] is either an inner [`Choice`] or a leaf
//!   ([`Fail`], [`PathSolution`], exception solution, [`ExceededBudget`]);
//! - a [`ChoiceOption`] is one branch of a choice, the unit of exploration
//!   state. Its child, once set, is the next node on the path.
//!
//! All entities live in the [`Arena`] and refer to each other through
//! handles. The shape of the tree is immutable; the only mutable state is
//! each option's [`OptionState`], child, and (while unevaluated) constraint,
//! all guarded by one lock per option.
//!
//! # Option state machine
//!
//! ```text
//! Unknown ──► Satisfiable ──► Evaluated
//!    │
//!    └──► Unsatisfiable | BudgetExceeded | CutOff | ExplicitlyFailed | Evaluated
//! ```
//!
//! Every other transition is a [`TreeError::IllegalTransition`]. A child is
//! set at most once. Leaf setters create the leaf and perform the transition
//! in one step, so "mark unsatisfiable" and "attach a `Fail`" can never be
//! observed separately.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::arena::Arena;
use crate::budget::Budget;
use crate::error::TreeError;
use crate::expr::{Constraint, Labels, Value};
use crate::types::{BranchId, Depth, NodeId, OptionId};

/// Exploration state of a [`ChoiceOption`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OptionState {
    /// Not yet checked.
    Unknown,
    /// Known to be feasible, not yet evaluated.
    Satisfiable,
    /// Feasible and evaluated: has a choice or a leaf below it.
    Evaluated,
    Unsatisfiable,
    BudgetExceeded,
    /// Dropped without evaluation.
    CutOff,
    ExplicitlyFailed,
}

impl OptionState {
    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(self, to: OptionState) -> bool {
        match self {
            OptionState::Unknown => to != OptionState::Unknown,
            OptionState::Satisfiable => to == OptionState::Evaluated,
            _ => false,
        }
    }

    /// Total transition function: every pair has a defined outcome.
    pub fn transition(self, option: OptionId, to: OptionState) -> Result<OptionState, TreeError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TreeError::IllegalTransition { option, from: self, to })
        }
    }

    /// Whether the option has been dealt with for good.
    pub fn is_evaluated(self) -> bool {
        !matches!(self, OptionState::Unknown | OptionState::Satisfiable)
    }

    /// Evaluated options were satisfiable at some point.
    pub fn is_satisfiable(self) -> bool {
        matches!(self, OptionState::Satisfiable | OptionState::Evaluated)
    }
}

#[derive(Debug)]
struct OptionCell {
    state: OptionState,
    constraint: Constraint,
    child: Option<NodeId>,
}

/// One branch of a [`Choice`].
#[derive(Debug)]
pub struct ChoiceOption {
    id: OptionId,
    choice: NodeId,
    number: usize,
    depth: Depth,
    cell: Mutex<OptionCell>,
}

impl ChoiceOption {
    pub(crate) fn new(id: OptionId, choice: NodeId, number: usize, depth: Depth, constraint: Constraint) -> Self {
        Self {
            id,
            choice,
            number,
            depth,
            cell: Mutex::new(OptionCell {
                state: OptionState::Unknown,
                constraint,
                child: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OptionCell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> OptionId {
        self.id
    }

    /// The choice this option belongs to.
    pub fn choice(&self) -> NodeId {
        self.choice
    }

    /// Index within the owning choice.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Depth of the owning choice.
    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn state(&self) -> OptionState {
        self.lock().state
    }

    pub fn constraint(&self) -> Constraint {
        self.lock().constraint.clone()
    }

    pub fn child(&self) -> Option<NodeId> {
        self.lock().child
    }

    pub fn is_satisfiable(&self) -> bool {
        self.state().is_satisfiable()
    }

    pub fn is_unsatisfiable(&self) -> bool {
        self.state() == OptionState::Unsatisfiable
    }

    pub fn is_evaluated(&self) -> bool {
        self.state().is_evaluated()
    }

    /// Replace the guarding constraint with an equivalent one.
    pub fn set_option_constraint(&self, constraint: Constraint) -> Result<(), TreeError> {
        let mut cell = self.lock();
        if cell.child.is_some() || cell.state.is_evaluated() {
            return Err(TreeError::ConstraintFrozen(self.id));
        }
        cell.constraint = constraint;
        Ok(())
    }

    /// `Unknown -> Satisfiable`.
    pub fn set_satisfiable(&self) -> Result<(), TreeError> {
        let mut cell = self.lock();
        cell.state = cell.state.transition(self.id, OptionState::Satisfiable)?;
        debug!("{} is satisfiable", self.id);
        Ok(())
    }

    /// Drop the option without evaluating it.
    pub fn set_cut_off(&self) -> Result<(), TreeError> {
        let mut cell = self.lock();
        if cell.child.is_some() {
            return Err(TreeError::ChildAlreadySet(self.id));
        }
        cell.state = cell.state.transition(self.id, OptionState::CutOff)?;
        Ok(())
    }

    /// Mark the option unsatisfiable and attach a [`Fail`] leaf.
    pub fn set_unsatisfiable(&self, arena: &Arena) -> Result<NodeId, TreeError> {
        self.evaluate(arena, |_| OptionState::Unsatisfiable, || {
            NodeKind::Fail(Fail { explicitly_failed: false })
        })
    }

    /// Attach a [`Fail`] leaf for a path the program rejected.
    pub fn set_explicitly_failed(&self, arena: &Arena) -> Result<NodeId, TreeError> {
        self.evaluate(
            arena,
            |state| match state {
                OptionState::Satisfiable => OptionState::Evaluated,
                _ => OptionState::ExplicitlyFailed,
            },
            || NodeKind::Fail(Fail { explicitly_failed: true }),
        )
    }

    /// Attach a [`PathSolution`] leaf.
    pub fn set_solution(&self, arena: &Arena, solution: Solution, path_constraints: Vec<Constraint>) -> Result<NodeId, TreeError> {
        self.evaluate(
            arena,
            |_| OptionState::Evaluated,
            || NodeKind::PathSolution(PathSolution::new(solution, path_constraints)),
        )
    }

    /// Attach an exception solution leaf.
    pub fn set_exception_solution(
        &self,
        arena: &Arena,
        solution: Solution,
        path_constraints: Vec<Constraint>,
    ) -> Result<NodeId, TreeError> {
        self.evaluate(
            arena,
            |_| OptionState::Evaluated,
            || NodeKind::ExceptionPathSolution(PathSolution::new(solution, path_constraints)),
        )
    }

    /// Attach an [`ExceededBudget`] leaf.
    pub fn set_budget_exceeded(&self, arena: &Arena, budget: Budget) -> Result<NodeId, TreeError> {
        self.evaluate(
            arena,
            |state| match state {
                OptionState::Satisfiable => OptionState::Evaluated,
                _ => OptionState::BudgetExceeded,
            },
            || NodeKind::ExceededBudget(ExceededBudget { budget }),
        )
    }

    /// Create the child node and transition, atomically under the option lock.
    fn evaluate(
        &self,
        arena: &Arena,
        target: impl FnOnce(OptionState) -> OptionState,
        leaf: impl FnOnce() -> NodeKind,
    ) -> Result<NodeId, TreeError> {
        let mut cell = self.lock();
        if cell.child.is_some() {
            return Err(TreeError::ChildAlreadySet(self.id));
        }
        let to = target(cell.state);
        let to = cell.state.transition(self.id, to)?;
        let child = arena.push_node(Some(self.id), self.depth.next(), leaf());
        debug!("{}: {:?} -> {:?} with leaf {}", self.id, cell.state, to, child);
        cell.child = Some(child);
        cell.state = to;
        Ok(child)
    }

    /// Attach a choice as the child. Called by the arena while it holds
    /// the new node's slot.
    pub(crate) fn attach_choice(&self, build: impl FnOnce() -> NodeId) -> Result<NodeId, TreeError> {
        let mut cell = self.lock();
        if cell.child.is_some() {
            return Err(TreeError::ChildAlreadySet(self.id));
        }
        let to = cell.state.transition(self.id, OptionState::Evaluated)?;
        let child = build();
        cell.child = Some(child);
        cell.state = to;
        Ok(child)
    }
}

/// An inner node: an ordered, fixed list of options.
#[derive(Debug, Clone)]
pub struct Choice {
    options: Vec<OptionId>,
    branch: Option<BranchId>,
}

impl Choice {
    pub(crate) fn new(options: Vec<OptionId>, branch: Option<BranchId>) -> Self {
        Self { options, branch }
    }

    pub fn options(&self) -> &[OptionId] {
        &self.options
    }

    pub fn option(&self, index: usize) -> Result<OptionId, TreeError> {
        self.options
            .get(index)
            .copied()
            .ok_or_else(|| TreeError::IllegalTreeAccess(format!("option {} of a {}-ary choice", index, self.options.len())))
    }

    pub fn arity(&self) -> usize {
        self.options.len()
    }

    /// Branch point this choice was created at, if tagged.
    pub fn branch(&self) -> Option<BranchId> {
        self.branch
    }
}

/// A leaf for an infeasible or rejected path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fail {
    /// `true` if the program rejected the path, `false` if the solver did.
    pub explicitly_failed: bool,
}

/// A concrete witness for a path: the labelled return value and inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub value: Value,
    pub labels: Labels,
}

/// A leaf for a completed path.
///
/// Relabelling the same path (for instance from another concolic seed)
/// appends alternative solutions.
#[derive(Debug)]
pub struct PathSolution {
    solutions: Mutex<Vec<Solution>>,
    path_constraints: Vec<Constraint>,
}

impl PathSolution {
    fn new(solution: Solution, path_constraints: Vec<Constraint>) -> Self {
        Self {
            solutions: Mutex::new(vec![solution]),
            path_constraints,
        }
    }

    pub fn add_solution(&self, solution: Solution) {
        self.solutions.lock().unwrap_or_else(PoisonError::into_inner).push(solution);
    }

    pub fn solutions(&self) -> Vec<Solution> {
        self.solutions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The first solution found for the path.
    pub fn solution(&self) -> Solution {
        self.solutions.lock().unwrap_or_else(PoisonError::into_inner)[0].clone()
    }

    pub fn path_constraints(&self) -> &[Constraint] {
        &self.path_constraints
    }
}

/// A leaf for a run that exhausted a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceededBudget {
    pub budget: Budget,
}

#[derive(Debug)]
pub enum NodeKind {
    Choice(Choice),
    Fail(Fail),
    PathSolution(PathSolution),
    ExceptionPathSolution(PathSolution),
    ExceededBudget(ExceededBudget),
}

/// A node of the search tree.
#[derive(Debug)]
pub struct TreeNode {
    id: NodeId,
    parent: Option<OptionId>,
    depth: Depth,
    kind: NodeKind,
}

impl TreeNode {
    pub(crate) fn new(id: NodeId, parent: Option<OptionId>, depth: Depth, kind: NodeKind) -> Self {
        Self { id, parent, depth, kind }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The option this node is the child of; `None` only for the root.
    pub fn parent(&self) -> Option<OptionId> {
        self.parent
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_choice(&self) -> Option<&Choice> {
        match &self.kind {
            NodeKind::Choice(choice) => Some(choice),
            _ => None,
        }
    }

    pub fn as_path_solution(&self) -> Option<&PathSolution> {
        match &self.kind {
            NodeKind::PathSolution(s) | NodeKind::ExceptionPathSolution(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self.kind, NodeKind::Choice(_))
    }
}
