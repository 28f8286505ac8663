//! The search tree aggregate.
//!
//! A [`SearchTree`] owns everything the workers of one search share: the
//! node [`Arena`] with the root choice, the frontier deque, the optional
//! lists of enlisted leaves, the registry of symbolic variables, and the
//! optional [`CoverageCfg`].
//!
//! The root choice has a single option guarded by `true`. It is marked
//! satisfiable and enqueued on construction, so the first poll of the
//! frontier starts the first run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::arena::Arena;
use crate::context::SearchContext;
use crate::coverage::CoverageCfg;
use crate::deque::{ChoiceOptionDeque, DequeConfig};
use crate::error::{panic_message, Interrupt, SearchError, Step, TreeError};
use crate::expr::{Constraint, Returned, SymVar, Value};
use crate::node::{ChoiceOption, NodeKind, OptionState};
use crate::search::SearchRegion;
use crate::types::{BranchId, NodeId, OptionId};

/// Tree construction parameters.
#[derive(Debug, Clone, Default)]
pub struct TreeConfig {
    pub deque: DequeConfig,
    /// Keep lists of all path solutions, fails and exceeded budgets.
    pub enlist_leaves: bool,
}

#[derive(Debug, Default)]
struct EnlistedLeaves {
    path_solutions: Mutex<Vec<NodeId>>,
    fails: Mutex<Vec<NodeId>>,
    exceeded_budgets: Mutex<Vec<NodeId>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts of nodes and option states, computed from the arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub nodes: usize,
    pub choices: usize,
    pub options: usize,
    pub path_solutions: usize,
    pub exception_solutions: usize,
    /// Fail leaves, both solver-proven and explicit.
    pub fails: usize,
    pub explicit_fails: usize,
    pub exceeded_budgets: usize,
    pub unsatisfiable: usize,
    pub cut_off: usize,
    /// Options still `Unknown` or `Satisfiable`.
    pub unevaluated: usize,
}

impl TreeStats {
    pub fn leaves(&self) -> usize {
        self.path_solutions + self.exception_solutions + self.fails + self.exceeded_budgets
    }
}

pub struct SearchTree {
    arena: Arena,
    deque: Box<dyn ChoiceOptionDeque>,
    leaves: Option<EnlistedLeaves>,
    variables: Mutex<Vec<SymVar>>,
    coverage: Option<CoverageCfg>,
}

impl std::fmt::Debug for SearchTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchTree")
            .field("arena", &self.arena)
            .field("frontier", &self.deque.size())
            .field("enlist_leaves", &self.leaves.is_some())
            .field("coverage", &self.coverage.is_some())
            .finish()
    }
}

impl SearchTree {
    pub fn new(config: TreeConfig) -> Result<Self, SearchError> {
        let deque = config.deque.build()?;
        Self::with_deque(deque, config.enlist_leaves)
    }

    /// Create a tree around a custom frontier implementation.
    pub fn with_deque(deque: Box<dyn ChoiceOptionDeque>, enlist_leaves: bool) -> Result<Self, SearchError> {
        let arena = Arena::new();
        let root = arena.option(OptionId::ROOT)?;
        root.set_satisfiable()?;
        deque.insert(root.depth(), &[root]);
        Ok(Self {
            arena,
            deque,
            leaves: enlist_leaves.then(EnlistedLeaves::default),
            variables: Mutex::new(Vec::new()),
            coverage: None,
        })
    }

    /// Attach a coverage graph.
    pub fn with_coverage(mut self, coverage: CoverageCfg) -> Self {
        self.coverage = Some(coverage);
        self
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn deque(&self) -> &dyn ChoiceOptionDeque {
        self.deque.as_ref()
    }

    pub fn coverage(&self) -> Option<&CoverageCfg> {
        self.coverage.as_ref()
    }

    /// The single option of the root choice.
    pub fn root(&self) -> Result<Arc<ChoiceOption>, TreeError> {
        self.arena.option(OptionId::ROOT)
    }

    pub fn node_count(&self) -> usize {
        self.arena.node_count()
    }

    /// Create a choice below `parent` and register it with the coverage
    /// graph if it is tagged with a branch id.
    pub fn new_choice(
        &self,
        parent: &ChoiceOption,
        constraints: Vec<Constraint>,
        branch: Option<BranchId>,
    ) -> Result<NodeId, TreeError> {
        let id = self.arena.new_choice(parent, constraints, branch)?;
        if let (Some(coverage), Some(branch)) = (&self.coverage, branch) {
            coverage.register_choice(branch, id);
        }
        Ok(id)
    }

    /// Build the region's arguments in `ctx` and call its entry point.
    ///
    /// A panic of the program under test ends the run with
    /// [`Interrupt::Raised`] carrying the panic message. Panics raised
    /// inside a choice point keep unwinding.
    pub fn invoke_search_region<A>(&self, region: &SearchRegion<A>, ctx: &mut SearchContext<'_>) -> Step<Returned> {
        let invoked = panic::catch_unwind(AssertUnwindSafe(|| {
            let args = region.build_args(ctx)?;
            region.call(ctx, args)
        }));
        match invoked {
            Ok(step) => step,
            Err(payload) if ctx.in_engine() => panic::resume_unwind(payload),
            Err(payload) => {
                let message = panic_message(&*payload);
                debug!("search region raised: {}", message);
                Err(Interrupt::Raised(Value::Text(message)))
            }
        }
    }

    /// Options from the root option to `option`, both included.
    pub fn get_path_to(&self, option: &ChoiceOption) -> Result<Vec<Arc<ChoiceOption>>, TreeError> {
        let mut path = vec![self.arena.option(option.id())?];
        let mut current = option.choice();
        while let Some(parent) = self.arena.parent_option(current)? {
            current = parent.choice();
            path.push(parent);
        }
        path.reverse();
        Ok(path)
    }

    fn parent_of(&self, option: &ChoiceOption) -> Result<Arc<ChoiceOption>, TreeError> {
        self.arena
            .parent_option(option.choice())?
            .ok_or_else(|| TreeError::IllegalTreeAccess(format!("{} has no parent", option.id())))
    }

    /// The deepest option that is an ancestor of (or equal to) both.
    pub fn get_deepest_shared_ancestor(
        &self,
        a: &ChoiceOption,
        b: &ChoiceOption,
    ) -> Result<Arc<ChoiceOption>, TreeError> {
        let mut a = self.arena.option(a.id())?;
        let mut b = self.arena.option(b.id())?;
        while a.depth() > b.depth() {
            a = self.parent_of(&a)?;
        }
        while b.depth() > a.depth() {
            b = self.parent_of(&b)?;
        }
        while a.id() != b.id() {
            a = self.parent_of(&a)?;
            b = self.parent_of(&b)?;
        }
        Ok(a)
    }

    /// Options strictly below `from` down to `to` (included), root-most first.
    ///
    /// Fails with [`TreeError::NotAnAncestor`] unless `from` is a proper
    /// ancestor of `to`.
    pub fn get_path_between(&self, from: &ChoiceOption, to: &ChoiceOption) -> Result<Vec<Arc<ChoiceOption>>, TreeError> {
        let not_an_ancestor = TreeError::NotAnAncestor {
            from: from.id(),
            to: to.id(),
        };
        if to.depth() <= from.depth() {
            return Err(not_an_ancestor);
        }
        let mut path = vec![];
        let mut current = self.arena.option(to.id())?;
        while current.depth() > from.depth() {
            let parent = self.parent_of(&current)?;
            path.push(current);
            current = parent;
        }
        if current.id() != from.id() {
            return Err(not_an_ancestor);
        }
        path.reverse();
        Ok(path)
    }

    /// Put a batch of sibling options on the frontier.
    pub fn insert_options(&self, options: &[Arc<ChoiceOption>]) {
        if let Some(first) = options.first() {
            self.deque.insert(first.depth(), options);
        }
    }

    /// Register a symbolic variable; variables are identified by name.
    pub fn register_variable(&self, var: &SymVar) {
        let mut variables = lock(&self.variables);
        if !variables.iter().any(|v| v.name() == var.name()) {
            debug!("new symbolic variable {} in [{}, {}]", var, var.lo(), var.hi());
            variables.push(var.clone());
        }
    }

    /// All symbolic variables seen so far, in registration order.
    pub fn variables(&self) -> Vec<SymVar> {
        lock(&self.variables).clone()
    }

    pub fn add_to_path_solutions(&self, leaf: NodeId) {
        if let Some(leaves) = &self.leaves {
            lock(&leaves.path_solutions).push(leaf);
        }
    }

    pub fn add_to_fails(&self, leaf: NodeId) {
        if let Some(leaves) = &self.leaves {
            lock(&leaves.fails).push(leaf);
        }
    }

    pub fn add_to_exceeded_budgets(&self, leaf: NodeId) {
        if let Some(leaves) = &self.leaves {
            lock(&leaves.exceeded_budgets).push(leaf);
        }
    }

    /// Enlisted path solution leaves; empty unless leaves are enlisted.
    pub fn path_solutions(&self) -> Vec<NodeId> {
        self.leaves.as_ref().map_or_else(Vec::new, |l| lock(&l.path_solutions).clone())
    }

    pub fn fails(&self) -> Vec<NodeId> {
        self.leaves.as_ref().map_or_else(Vec::new, |l| lock(&l.fails).clone())
    }

    pub fn exceeded_budgets(&self) -> Vec<NodeId> {
        self.leaves.as_ref().map_or_else(Vec::new, |l| lock(&l.exceeded_budgets).clone())
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for node in self.arena.nodes() {
            stats.nodes += 1;
            match node.kind() {
                NodeKind::Choice(_) => stats.choices += 1,
                NodeKind::Fail(fail) => {
                    stats.fails += 1;
                    if fail.explicitly_failed {
                        stats.explicit_fails += 1;
                    }
                }
                NodeKind::PathSolution(_) => stats.path_solutions += 1,
                NodeKind::ExceptionPathSolution(_) => stats.exception_solutions += 1,
                NodeKind::ExceededBudget(_) => stats.exceeded_budgets += 1,
            }
        }
        for option in self.arena.options() {
            stats.options += 1;
            match option.state() {
                OptionState::Unsatisfiable => stats.unsatisfiable += 1,
                OptionState::CutOff => stats.cut_off += 1,
                OptionState::Unknown | OptionState::Satisfiable => stats.unevaluated += 1,
                _ => {}
            }
        }
        stats
    }
}
