//! One worker's driver loop.
//!
//! An [`Executor`] owns a solver session and repeatedly evaluates frontier
//! options: it brings the solver to the option's path, checks the option if
//! nobody has yet, runs the search region from the root with the path as
//! replay prefix, and records how the run ended.
//!
//! Signals ([`Interrupt`]) are handled here and nowhere else. Engine errors
//! abort the worker and, with it, the whole search.

use std::sync::Arc;

use log::{debug, trace};

use crate::budget::{Budget, ExecutionBudgetManager, GlobalBudget};
use crate::choice_point::ChoicePointFactory;
use crate::context::SearchContext;
use crate::error::{Interrupt, SearchError, SolverError, Step, TreeError};
use crate::expr::{Returned, SymVar};
use crate::node::{ChoiceOption, OptionState, Solution};
use crate::search::{Frontier, SearchRegion};
use crate::solver::{Solver, SolverMode, SolverSession};
use crate::tree::SearchTree;

/// How the evaluation of one frontier option ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The option was infeasible; the region did not run.
    Unsatisfiable,
    PathSolution,
    ExceptionSolution,
    Fail,
    ExceededBudget(Budget),
    /// The run ended at a choice with nothing left to take.
    Backtracked,
}

pub struct Executor<'s> {
    tree: &'s SearchTree,
    frontier: &'s Frontier,
    global: &'s GlobalBudget,
    factory: &'s dyn ChoicePointFactory,
    solver: SolverSession,
    solutions_per_path: usize,
    runs: u64,
}

impl<'s> Executor<'s> {
    pub(crate) fn new(
        tree: &'s SearchTree,
        frontier: &'s Frontier,
        global: &'s GlobalBudget,
        factory: &'s dyn ChoicePointFactory,
        solver: Box<dyn Solver>,
        mode: SolverMode,
    ) -> Self {
        Self {
            tree,
            frontier,
            global,
            factory,
            solver: SolverSession::new(solver, mode),
            solutions_per_path: 1,
            runs: 0,
        }
    }

    /// Record up to `n` labellings for every path solution.
    pub(crate) fn with_solutions_per_path(mut self, n: usize) -> Self {
        self.solutions_per_path = n;
        self
    }

    /// Number of times this executor ran the search region.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Take the next option to evaluate.
    ///
    /// With coverage guidance, frontier options leading to uncovered edges
    /// are requested first.
    pub fn select(&self) -> Result<Option<Arc<ChoiceOption>>, SearchError> {
        if let Some(coverage) = self.tree.coverage() {
            if coverage.config().guide_frontier {
                for candidate in coverage.get_choice_options_leading_to_uncovered_edges(self.tree)? {
                    if self.tree.deque().request(&candidate) {
                        debug!("coverage: requested {}", candidate.id());
                        return Ok(Some(candidate));
                    }
                }
            }
        }
        Ok(self.frontier.poll(self.tree))
    }

    /// Evaluate one option taken off the frontier.
    pub fn evaluate<A>(&mut self, target: Arc<ChoiceOption>, region: &SearchRegion<A>) -> Result<RunOutcome, SearchError> {
        let path = self.tree.get_path_to(&target)?;
        match target.state() {
            OptionState::Unknown => {
                self.solver.sync_to(&path[..path.len() - 1])?;
                if !self.solver.check(&target)? {
                    target.set_unsatisfiable(self.tree.arena())?;
                    self.global.record_fail();
                    trace!("{} is unsatisfiable", target.id());
                    return Ok(RunOutcome::Unsatisfiable);
                }
                target.set_satisfiable()?;
            }
            OptionState::Satisfiable => self.solver.sync_to(&path)?,
            state => {
                return Err(TreeError::IllegalTreeAccess(format!("{} polled in state {:?}", target.id(), state)).into());
            }
        }

        let seed = if self.factory.wants_seed() {
            Some(self.solver.label(&self.tree.variables())?)
        } else {
            None
        };

        self.runs += 1;
        debug!("run {} towards {} at {}", self.runs, target.id(), target.depth());
        let tree = self.tree;
        let budget = ExecutionBudgetManager::new(self.global);
        let mut ctx = SearchContext::new(tree, self.frontier, self.factory, &mut self.solver, budget, path, seed)?;
        let result = tree.invoke_search_region(region, &mut ctx);
        record(tree, self.global, &target, ctx, result, self.solutions_per_path)
    }
}

/// Attach the leaf for a finished run and commit its coverage trail.
fn record(
    tree: &SearchTree,
    global: &GlobalBudget,
    target: &ChoiceOption,
    mut ctx: SearchContext<'_>,
    result: Step<Returned>,
    solutions_per_path: usize,
) -> Result<RunOutcome, SearchError> {
    let arena = tree.arena();
    let outcome = match result {
        Err(Interrupt::Error(e)) => return Err(e),
        Err(Interrupt::BudgetExceeded(budget)) => {
            // The trail of an aborted run is dropped.
            let leaf = if ctx.reached_target() {
                ctx.current().set_budget_exceeded(arena, budget)?
            } else {
                target.set_budget_exceeded(arena, budget)?
            };
            tree.add_to_exceeded_budgets(leaf);
            global.record_exceeded_budget();
            debug!("{} exceeded {}", leaf, budget);
            return Ok(RunOutcome::ExceededBudget(budget));
        }
        Err(Interrupt::Backtrack) => RunOutcome::Backtracked,
        _ if !ctx.reached_target() => {
            return Err(TreeError::IllegalTreeAccess(format!("run ended before reaching {}", target.id())).into());
        }
        Err(Interrupt::Fail) => {
            let leaf = ctx.current().set_explicitly_failed(arena)?;
            tree.add_to_fails(leaf);
            global.record_fail();
            RunOutcome::Fail
        }
        Err(Interrupt::Raised(value)) => {
            let labels = ctx.label(&[])?;
            let solution = Solution { value, labels };
            let constraints = ctx.path_constraints().to_vec();
            let leaf = ctx.current().set_exception_solution(arena, solution, constraints)?;
            tree.add_to_path_solutions(leaf);
            RunOutcome::ExceptionSolution
        }
        Ok(returned) => {
            let mut vars: Vec<SymVar> = vec![];
            returned.collect_vars(&mut vars);
            let labels = ctx.label(&vars)?;
            let value = returned.label(&labels).ok_or_else(|| {
                let name = vars.first().map_or("<return>", |v| v.name());
                SolverError::LabelingNotPossible(name.to_string())
            })?;
            debug!("path solution {} with {}", value, labels);
            let alternatives = ctx.alternative_labels(&vars, &labels, solutions_per_path.saturating_sub(1))?;
            let solution = Solution { value, labels };
            let constraints = ctx.path_constraints().to_vec();
            let leaf = ctx.current().set_solution(arena, solution, constraints)?;
            if !alternatives.is_empty() {
                let node = arena.node(leaf)?;
                if let Some(path_solution) = node.as_path_solution() {
                    for labels in alternatives {
                        if let Some(value) = returned.label(&labels) {
                            path_solution.add_solution(Solution { value, labels });
                        }
                    }
                }
            }
            tree.add_to_path_solutions(leaf);
            global.record_path_solution();
            RunOutcome::PathSolution
        }
    };
    if let Some(coverage) = tree.coverage() {
        coverage.manifest_trail(ctx.trail());
    }
    Ok(outcome)
}
