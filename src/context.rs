//! The execution context handed to the program under test.
//!
//! A [`SearchContext`] lives for exactly one run. It knows where the run
//! currently is in the tree (the *current option*), which recorded options
//! still have to be replayed to reach the run's target, and it owns the
//! per-run [`ExecutionBudgetManager`] and coverage [`Trail`].
//!
//! Every conditional over symbolic data goes through [`SearchContext::choice`]
//! (or one of its variants), which implements the choice-point procedure:
//!
//! 1. account for the choice point and check the run budgets;
//! 2. decide concrete conditions directly, without touching the tree;
//! 3. on the recorded prefix, follow the recorded option;
//! 4. otherwise create a new choice and let the [`ChoicePointFactory`]
//!    pick the option to continue with.
//!
//! # Example
//!
//! ```
//! use symtree::expr::{Cmp, NumExpr, Returned};
//! use symtree::search::{Search, SearchConfig, SearchRegion};
//! use symtree::solver::EnumeratingSolver;
//!
//! let region = SearchRegion::new(
//!     |ctx| Ok(ctx.sym_int("x", 0, 3)),
//!     |ctx, x| {
//!         if ctx.compare(x.clone(), Cmp::Lt, NumExpr::from(2))? {
//!             Ok(Returned::from(x))
//!         } else {
//!             Ok(Returned::from(-1))
//!         }
//!     },
//! );
//! let outcome = Search::new(SearchConfig::default()).run_single(&region, EnumeratingSolver::new()).unwrap();
//! assert_eq!(outcome.stats.tree.path_solutions, 2);
//! ```

use std::sync::Arc;

use log::debug;

use crate::budget::ExecutionBudgetManager;
use crate::choice_point::ChoicePointFactory;
use crate::coverage::Trail;
use crate::error::{Interrupt, SearchError, Step, TreeError};
use crate::expr::{Cmp, Constraint, Labels, NumExpr, SymVar};
use crate::node::ChoiceOption;
use crate::search::Frontier;
use crate::solver::SolverSession;
use crate::tree::SearchTree;
use crate::types::BranchId;

pub struct SearchContext<'a> {
    tree: &'a SearchTree,
    frontier: &'a Frontier,
    factory: &'a dyn ChoicePointFactory,
    solver: &'a mut SolverSession,
    budget: ExecutionBudgetManager<'a>,
    current: Arc<ChoiceOption>,
    /// Recorded options leading from the root to the run's target.
    replay: Vec<Arc<ChoiceOption>>,
    cursor: usize,
    path_constraints: Vec<Constraint>,
    trail: Trail,
    seed: Option<Labels>,
    variables: Vec<SymVar>,
    /// Set while a choice point runs. A panic seen with this set came from
    /// the engine, not from the program under test.
    in_engine: bool,
}

impl std::fmt::Debug for SearchContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchContext")
            .field("current", &self.current.id())
            .field("replay", &self.replay.len())
            .field("cursor", &self.cursor)
            .field("seed", &self.seed)
            .finish()
    }
}

impl<'a> SearchContext<'a> {
    /// `path` runs from the root option to the target option, both
    /// included. The solver must already assert the whole path.
    pub(crate) fn new(
        tree: &'a SearchTree,
        frontier: &'a Frontier,
        factory: &'a dyn ChoicePointFactory,
        solver: &'a mut SolverSession,
        budget: ExecutionBudgetManager<'a>,
        mut path: Vec<Arc<ChoiceOption>>,
        seed: Option<Labels>,
    ) -> Result<Self, TreeError> {
        if path.is_empty() {
            return Err(TreeError::IllegalTreeAccess("empty path".to_string()));
        }
        let current = path.remove(0);
        let path_constraints = vec![current.constraint()];
        Ok(Self {
            tree,
            frontier,
            factory,
            solver,
            budget,
            current,
            replay: path,
            cursor: 0,
            path_constraints,
            trail: Trail::new(),
            seed,
            variables: Vec::new(),
            in_engine: false,
        })
    }

    pub fn tree(&self) -> &SearchTree {
        self.tree
    }

    /// The option whose subtree the run is in.
    pub fn current(&self) -> &Arc<ChoiceOption> {
        &self.current
    }

    /// Whether the run is still following the recorded prefix.
    pub fn is_replaying(&self) -> bool {
        self.cursor < self.replay.len()
    }

    pub fn budget(&self) -> &ExecutionBudgetManager<'a> {
        &self.budget
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    /// Concrete inputs of a concolic run.
    pub fn seed(&self) -> Option<&Labels> {
        self.seed.as_ref()
    }

    /// Constraints of the options taken so far, root first.
    pub fn path_constraints(&self) -> &[Constraint] {
        &self.path_constraints
    }

    /// Variables declared by this run.
    pub fn variables(&self) -> &[SymVar] {
        &self.variables
    }

    /// Declare a symbolic integer in `[lo, hi]`.
    pub fn sym_int(&mut self, name: &str, lo: i64, hi: i64) -> NumExpr {
        self.sym_var(SymVar::new(name, lo, hi))
    }

    pub fn sym_var(&mut self, var: SymVar) -> NumExpr {
        if !self.variables.iter().any(|v| v.name() == var.name()) {
            self.tree.register_variable(&var);
            self.variables.push(var.clone());
        }
        NumExpr::var(var)
    }

    /// Branch on `constraint`. Returns which side the run continues on.
    pub fn choice(&mut self, constraint: Constraint) -> Step<bool> {
        self.decide(constraint, None)
    }

    /// Like [`choice`][Self::choice], for a branch point with a stable id.
    pub fn choice_at(&mut self, branch: BranchId, constraint: Constraint) -> Step<bool> {
        self.decide(constraint, Some(branch))
    }

    /// Branch on `lhs cmp rhs`.
    pub fn compare(&mut self, lhs: impl Into<NumExpr>, cmp: Cmp, rhs: impl Into<NumExpr>) -> Step<bool> {
        self.decide(Constraint::cmp(cmp, lhs.into(), rhs.into()), None)
    }

    pub fn compare_at(&mut self, branch: BranchId, lhs: impl Into<NumExpr>, cmp: Cmp, rhs: impl Into<NumExpr>) -> Step<bool> {
        self.decide(Constraint::cmp(cmp, lhs.into(), rhs.into()), Some(branch))
    }

    /// Continue only where `constraint` holds; fail the path otherwise.
    pub fn assume(&mut self, constraint: Constraint) -> Step<()> {
        if self.choice(constraint)? {
            Ok(())
        } else {
            Err(Interrupt::Fail)
        }
    }

    /// Branch between several alternatives. Returns the index of the
    /// constraint the run continues with.
    ///
    /// If all constraints are concrete, the first true one is taken, and
    /// the path fails when none is.
    pub fn choose_index(&mut self, constraints: &[Constraint]) -> Step<usize> {
        self.in_engine = true;
        let chosen = self.choose_index_step(constraints);
        self.in_engine = false;
        chosen
    }

    fn choose_index_step(&mut self, constraints: &[Constraint]) -> Step<usize> {
        self.budget.check_choice_point().map_err(Interrupt::BudgetExceeded)?;
        if constraints.is_empty() {
            return Err(TreeError::EmptyChoice.into());
        }
        if constraints.iter().all(Constraint::is_concrete) {
            return constraints.iter().position(|c| c.as_const() == Some(true)).ok_or(Interrupt::Fail);
        }
        let chosen = match self.follow_known_path()? {
            Some(option) => {
                self.check_arity(&option, constraints.len())?;
                option
            }
            None => self.new_choice(constraints.to_vec(), None)?,
        };
        Ok(chosen.number())
    }

    fn decide(&mut self, constraint: Constraint, branch: Option<BranchId>) -> Step<bool> {
        self.in_engine = true;
        let decision = self.decide_step(constraint, branch);
        self.in_engine = false;
        decision
    }

    fn decide_step(&mut self, constraint: Constraint, branch: Option<BranchId>) -> Step<bool> {
        self.budget.check_choice_point().map_err(Interrupt::BudgetExceeded)?;

        if let Some(value) = constraint.as_const() {
            self.cover(branch, value);
            return Ok(value);
        }

        let decision = match self.follow_known_path()? {
            Some(option) => {
                self.check_arity(&option, 2)?;
                option.number() == 0
            }
            None => {
                let options = vec![constraint.clone(), constraint.not()];
                let chosen = self.new_choice(options, branch)?;
                Constraint::ptr_eq(&chosen.constraint(), &constraint)
            }
        };
        self.cover(branch, decision);
        Ok(decision)
    }

    fn cover(&mut self, branch: Option<BranchId>, decision: bool) {
        if let Some(branch) = branch {
            self.trail.push(branch, decision);
        }
    }

    /// While replaying, step onto the next recorded option.
    fn follow_known_path(&mut self) -> Step<Option<Arc<ChoiceOption>>> {
        let Some(next) = self.replay.get(self.cursor).cloned() else {
            return Ok(None);
        };
        if self.current.child() != Some(next.choice()) {
            return Err(TreeError::IllegalTreeAccess(format!(
                "run diverged from the recorded path below {}",
                self.current.id()
            ))
            .into());
        }
        self.budget
            .check_choice_depth(next.depth().get() as u64)
            .map_err(Interrupt::BudgetExceeded)?;
        self.cursor += 1;
        self.advance(&next);
        Ok(Some(next))
    }

    /// A replayed choice must have been recorded by a choice point with the
    /// same number of alternatives.
    fn check_arity(&self, option: &ChoiceOption, expected: usize) -> Result<(), TreeError> {
        let id = option.choice();
        let node = self.tree.arena().node(id)?;
        let arity = node.as_choice().ok_or(TreeError::NotAChoice(id))?.options().len();
        if arity != expected {
            return Err(TreeError::IllegalTreeAccess(format!(
                "{}-ary choice point replayed over {}-ary choice {}",
                expected, arity, id
            )));
        }
        Ok(())
    }

    /// Create a choice below the current option and move onto the option
    /// picked by the factory.
    fn new_choice(&mut self, constraints: Vec<Constraint>, branch: Option<BranchId>) -> Step<Arc<ChoiceOption>> {
        let depth = self.current.depth().next();
        self.budget
            .check_choice_depth(depth.get() as u64)
            .map_err(Interrupt::BudgetExceeded)?;

        let id = self.tree.new_choice(&self.current, constraints, branch)?;
        self.budget.register_new_choice();
        let options = self.tree.arena().choice_options(id)?;

        if self.frontier.beyond_bound(depth) {
            debug!("choice {} at {} is beyond the deepening bound", id, depth);
            self.frontier.insert(self.tree, &options);
            return Err(Interrupt::Backtrack);
        }

        let factory = self.factory;
        match factory.choose(self, &options)? {
            Some(i) => {
                let chosen = options[i].clone();
                self.advance(&chosen);
                Ok(chosen)
            }
            None => Err(Interrupt::Backtrack),
        }
    }

    fn advance(&mut self, option: &Arc<ChoiceOption>) {
        self.path_constraints.push(option.constraint());
        self.current = option.clone();
    }

    /// Check `option` with the solver on top of the current path and mark it
    /// satisfiable or unsatisfiable accordingly. An unsatisfiable option
    /// counts as a fail of the search.
    ///
    /// A satisfiable option stays asserted: the caller must continue with it.
    pub fn decide_on_choice_option(&mut self, option: &ChoiceOption) -> Result<bool, SearchError> {
        let sat = self.solver.check(option)?;
        if sat {
            option.set_satisfiable()?;
        } else {
            option.set_unsatisfiable(self.tree.arena())?;
            self.budget.global().record_fail();
        }
        Ok(sat)
    }

    /// Mark `option` satisfiable without asking the solver. Used when the
    /// path is known to be feasible.
    pub fn assume_choice_option(&mut self, option: &ChoiceOption) -> Result<(), SearchError> {
        option.set_satisfiable()?;
        self.solver.assert(option);
        Ok(())
    }

    /// Hand options that the run does not take to the frontier.
    pub fn enqueue(&self, options: &[Arc<ChoiceOption>]) {
        self.frontier.insert(self.tree, options);
    }

    /// The seed, completed with default values for variables it misses.
    pub fn concrete_labels(&self) -> Labels {
        let mut labels = self.seed.clone().unwrap_or_default();
        for v in &self.variables {
            if !labels.contains(v.name()) {
                labels.insert(v.name(), v.default_value());
            }
        }
        labels
    }

    pub(crate) fn in_engine(&self) -> bool {
        self.in_engine
    }

    /// Whether the run went past its target option.
    pub(crate) fn reached_target(&self) -> bool {
        !self.is_replaying()
    }

    /// Up to `count` labellings of the run's variables and `extra` other
    /// than `first`.
    pub(crate) fn alternative_labels(&mut self, extra: &[SymVar], first: &Labels, count: usize) -> Result<Vec<Labels>, SearchError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let vars = self.label_vars(extra);
        Ok(self.solver.alternative_labels(&vars, first, count)?)
    }

    fn label_vars(&self, extra: &[SymVar]) -> Vec<SymVar> {
        let mut vars = self.variables.clone();
        for v in extra {
            if !vars.iter().any(|w| w.name() == v.name()) {
                vars.push(v.clone());
            }
        }
        vars
    }

    /// Labels for the run's variables and `extra`.
    ///
    /// Concolic runs reuse their concrete inputs, symbolic runs ask the
    /// solver for a witness of the current path.
    pub(crate) fn label(&mut self, extra: &[SymVar]) -> Result<Labels, SearchError> {
        let vars = self.label_vars(extra);
        if self.seed.is_some() {
            let mut labels = self.concrete_labels();
            for v in &vars {
                if !labels.contains(v.name()) {
                    labels.insert(v.name(), v.default_value());
                }
            }
            Ok(labels)
        } else {
            Ok(self.solver.label(&vars)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::budget::{BudgetConfig, GlobalBudget};
    use crate::choice_point::SymbolicChoicePointFactory;
    use crate::expr::{Returned, Value};
    use crate::node::NodeKind;
    use crate::search::{Search, SearchConfig, SearchRegion, SearchStrategy};
    use crate::solver::{EnumeratingSolver, SolverMode};

    /// Three independent bits; returns their binary value.
    fn bits() -> SearchRegion<Vec<NumExpr>> {
        SearchRegion::new(
            |ctx| Ok(["a", "b", "c"].iter().map(|name| ctx.sym_int(name, 0, 1)).collect()),
            |ctx, bits| {
                let mut value = 0;
                for bit in bits {
                    value *= 2;
                    if ctx.compare(bit, Cmp::Eq, NumExpr::from(1))? {
                        value += 1;
                    }
                }
                Ok(Returned::from(value))
            },
        )
    }

    #[test]
    fn test_replay_reproduces_recorded_decisions() {
        let region = bits();
        let outcome = Search::new(SearchConfig::default()).run_single(&region, EnumeratingSolver::new()).unwrap();
        let tree = &outcome.tree;
        let nodes = tree.node_count();

        let frontier = Frontier::new(SearchStrategy::Dfs);
        let global = GlobalBudget::new(BudgetConfig::unlimited());
        let factory = SymbolicChoicePointFactory;
        let mut replayed = 0;
        for node in tree.arena().nodes() {
            let NodeKind::PathSolution(leaf) = node.kind() else {
                continue;
            };
            let Value::Int(expected) = leaf.solution().value else {
                panic!("{} is not an integer", leaf.solution().value);
            };
            let target = tree.arena().option(node.parent().unwrap()).unwrap();
            let path = tree.get_path_to(&target).unwrap();

            let mut solver = SolverSession::new(Box::new(EnumeratingSolver::new()), SolverMode::Incremental);
            solver.sync_to(&path).unwrap();
            let budget = ExecutionBudgetManager::new(&global);
            let mut ctx = SearchContext::new(tree, &frontier, &factory, &mut solver, budget, path, None).unwrap();
            let returned = tree.invoke_search_region(&region, &mut ctx).unwrap();

            assert_eq!(returned, Returned::from(expected));
            assert_eq!(ctx.current().id(), target.id());
            assert!(!ctx.is_replaying());
            assert_eq!(ctx.budget().actual_choice_points(), 0);
            replayed += 1;
        }
        assert_eq!(replayed, 8);
        assert_eq!(tree.node_count(), nodes);
        assert!(tree.deque().is_empty());
    }
}
