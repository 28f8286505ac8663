//! Search orchestration.
//!
//! A [`Search`] explores one [`SearchRegion`] exhaustively (or until a
//! global budget stops it): it builds the [`SearchTree`], starts one
//! [`Executor`] per worker, and collects [`SearchStats`] once every worker
//! is done.
//!
//! Workers share the tree and the frontier. A worker is *busy* from the
//! moment it polls until its run is recorded, so "the frontier is empty and
//! nobody is busy" means no more work can appear, and the workers quit.
//!
//! # Strategies
//!
//! | Strategy | Poll | Notes |
//! |----------|------|-------|
//! | [`SearchStrategy::Dfs`] | deepest first | Default |
//! | [`SearchStrategy::Bfs`] | shallowest first | |
//! | [`SearchStrategy::IterativeDeepening`] | deepest first | Options below the bound are parked until the frontier runs dry |

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam::thread;
use crossbeam::utils::Backoff;
use log::{debug, info, trace, warn};

use crate::budget::{BudgetConfig, GlobalBudget, StopReason};
use crate::choice_point::{ChoicePointFactory, ChoicePointMode};
use crate::context::SearchContext;
use crate::coverage::{CoverageCfg, CoverageConfig};
use crate::error::{panic_message, ConfigError, SearchError, Step};
use crate::executor::Executor;
use crate::expr::Returned;
use crate::node::{ChoiceOption, OptionState};
use crate::solver::{Solver, SolverMode};
use crate::tree::{SearchTree, TreeConfig, TreeStats};
use crate::types::{BranchId, Depth};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    #[default]
    Dfs,
    Bfs,
    /// Depth-first within a depth bound that grows by `increment` each
    /// time the bounded tree is exhausted.
    IterativeDeepening { increment: usize },
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub strategy: SearchStrategy,
    /// Number of worker threads used by [`Search::run`].
    pub workers: usize,
    pub tree: TreeConfig,
    pub budget: BudgetConfig,
    pub solver_mode: SolverMode,
    pub choice_points: ChoicePointMode,
    /// Track branch coverage; `None` disables the coverage graph.
    pub coverage: Option<CoverageConfig>,
    /// Labellings recorded per path solution, the first included.
    pub solutions_per_path: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::default(),
            workers: 1,
            tree: TreeConfig::default(),
            budget: BudgetConfig::default(),
            solver_mode: SolverMode::default(),
            choice_points: ChoicePointMode::default(),
            coverage: None,
            solutions_per_path: 1,
        }
    }
}

impl SearchConfig {
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_tree(mut self, tree: TreeConfig) -> Self {
        self.tree = tree;
        self
    }

    pub fn with_budget(mut self, budget: BudgetConfig) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_solver_mode(mut self, mode: SolverMode) -> Self {
        self.solver_mode = mode;
        self
    }

    pub fn with_choice_points(mut self, mode: ChoicePointMode) -> Self {
        self.choice_points = mode;
        self
    }

    pub fn with_coverage(mut self, coverage: CoverageConfig) -> Self {
        self.coverage = Some(coverage);
        self
    }

    pub fn with_solutions_per_path(mut self, n: usize) -> Self {
        self.solutions_per_path = n;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.solutions_per_path == 0 {
            return Err(ConfigError::ZeroSolutionsPerPath);
        }
        if self.strategy == (SearchStrategy::IterativeDeepening { increment: 0 }) {
            return Err(ConfigError::ZeroDeepeningIncrement);
        }
        Ok(())
    }
}

type ArgsFn<A> = dyn Fn(&mut SearchContext<'_>) -> Step<A> + Send + Sync;
type EntryFn<A> = dyn Fn(&mut SearchContext<'_>, A) -> Step<Returned> + Send + Sync;

/// The program under test: an argument builder and an entry point.
///
/// The builder usually declares the symbolic inputs; the entry point is
/// re-executed from the start on every run.
pub struct SearchRegion<A> {
    args: Box<ArgsFn<A>>,
    entry: Box<EntryFn<A>>,
    branches: Vec<BranchId>,
}

impl<A> std::fmt::Debug for SearchRegion<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchRegion").field("branches", &self.branches).finish()
    }
}

impl<A> SearchRegion<A> {
    pub fn new<B, E>(args: B, entry: E) -> Self
    where
        B: Fn(&mut SearchContext<'_>) -> Step<A> + Send + Sync + 'static,
        E: Fn(&mut SearchContext<'_>, A) -> Step<Returned> + Send + Sync + 'static,
    {
        Self {
            args: Box::new(args),
            entry: Box::new(entry),
            branches: Vec::new(),
        }
    }

    /// Declare the branch points of the region for coverage tracking.
    pub fn with_branches(mut self, branches: impl IntoIterator<Item = BranchId>) -> Self {
        self.branches = branches.into_iter().collect();
        self
    }

    pub fn branches(&self) -> &[BranchId] {
        &self.branches
    }

    pub(crate) fn build_args(&self, ctx: &mut SearchContext<'_>) -> Step<A> {
        (self.args)(ctx)
    }

    pub(crate) fn call(&self, ctx: &mut SearchContext<'_>, args: A) -> Step<Returned> {
        (self.entry)(ctx, args)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The tree's deque, wrapped with the strategy's poll order and the
/// iterative-deepening bound.
#[derive(Debug)]
pub(crate) struct Frontier {
    strategy: SearchStrategy,
    bound: AtomicUsize,
    parked: Mutex<Vec<Arc<ChoiceOption>>>,
}

impl Frontier {
    pub(crate) fn new(strategy: SearchStrategy) -> Self {
        let bound = match strategy {
            SearchStrategy::IterativeDeepening { increment } => increment,
            _ => usize::MAX,
        };
        Self {
            strategy,
            bound: AtomicUsize::new(bound),
            parked: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn bound(&self) -> usize {
        self.bound.load(Ordering::SeqCst)
    }

    pub(crate) fn beyond_bound(&self, depth: Depth) -> bool {
        depth.get() > self.bound()
    }

    /// Insert a batch of siblings, parking it if it lies below the bound.
    pub(crate) fn insert(&self, tree: &SearchTree, options: &[Arc<ChoiceOption>]) {
        let Some(first) = options.first() else {
            return;
        };
        if self.beyond_bound(first.depth()) {
            let mut parked = lock(&self.parked);
            parked.extend(options.iter().filter(|o| !o.is_unsatisfiable()).cloned());
        } else {
            tree.insert_options(options);
        }
    }

    pub(crate) fn poll(&self, tree: &SearchTree) -> Option<Arc<ChoiceOption>> {
        match self.strategy {
            SearchStrategy::Bfs => tree.deque().poll_first(),
            SearchStrategy::Dfs | SearchStrategy::IterativeDeepening { .. } => tree.deque().poll_last(),
        }
    }

    /// Raise the bound and release the parked options it now covers.
    /// Returns `false` if nothing was parked.
    pub(crate) fn deepen(&self, tree: &SearchTree) -> bool {
        let SearchStrategy::IterativeDeepening { increment } = self.strategy else {
            return false;
        };
        let mut parked = lock(&self.parked);
        if parked.is_empty() {
            return false;
        }
        let bound = self.bound().saturating_add(increment);
        self.bound.store(bound, Ordering::SeqCst);
        let (released, kept): (Vec<_>, Vec<_>) = parked.drain(..).partition(|o| o.depth().get() <= bound);
        *parked = kept;
        info!("deepening bound to {}: {} options released, {} still parked", bound, released.len(), parked.len());
        for option in released {
            tree.deque().insert(option.depth(), &[option]);
        }
        true
    }

    /// Remove everything that is still waiting, parked options included.
    pub(crate) fn drain(&self, tree: &SearchTree) -> Vec<Arc<ChoiceOption>> {
        let mut options = tree.deque().drain();
        options.append(&mut lock(&self.parked));
        options
    }
}

/// What a finished search hands back.
#[derive(Debug)]
pub struct SearchOutcome {
    pub tree: SearchTree,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    /// Runs of the search region over all workers.
    pub runs: u64,
    pub elapsed: Duration,
    /// Set when a global budget or full coverage ended the search early.
    pub stop_reason: Option<StopReason>,
    pub tree: TreeStats,
}

pub struct Search {
    config: SearchConfig,
    factory: Box<dyn ChoicePointFactory>,
}

impl std::fmt::Debug for Search {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Search").field("config", &self.config).finish()
    }
}

impl Search {
    pub fn new(config: SearchConfig) -> Self {
        let factory = config.choice_points.factory();
        Self { config, factory }
    }

    /// Use a custom decision procedure for new choices.
    pub fn with_factory(config: SearchConfig, factory: Box<dyn ChoicePointFactory>) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Explore `region` with `config.workers` threads, each owning a solver
    /// built by `make_solver`.
    pub fn run<A, S, F>(&self, region: &SearchRegion<A>, make_solver: F) -> Result<SearchOutcome, SearchError>
    where
        S: Solver + 'static,
        F: Fn() -> S + Sync,
    {
        let workers = self.config.workers;
        self.explore(region, |shared| {
            let make_solver = &make_solver;
            let joined = thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|worker| scope.spawn(move |_| shared.work(worker, Box::new(make_solver()), region)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|payload| Err(SearchError::WorkerPanicked(panic_message(&*payload))))
                    })
                    .collect::<Vec<_>>()
            })
            .map_err(|payload| SearchError::WorkerPanicked(panic_message(&*payload)))?;
            joined.into_iter().sum()
        })
    }

    /// Explore `region` on the calling thread.
    pub fn run_single<A, S>(&self, region: &SearchRegion<A>, solver: S) -> Result<SearchOutcome, SearchError>
    where
        S: Solver + 'static,
    {
        self.explore(region, |shared| shared.work(0, Box::new(solver), region))
    }

    fn explore<A>(
        &self,
        region: &SearchRegion<A>,
        drive: impl FnOnce(&Shared<'_>) -> Result<u64, SearchError>,
    ) -> Result<SearchOutcome, SearchError> {
        self.config.validate()?;
        let mut tree = SearchTree::new(self.config.tree.clone())?;
        if let Some(coverage) = self.config.coverage {
            tree = tree.with_coverage(CoverageCfg::new(region.branches().iter().copied(), coverage));
        }
        let frontier = Frontier::new(self.config.strategy);
        let global = GlobalBudget::new(self.config.budget.clone());
        info!(
            "search started: {:?} with {} worker(s), {:?} choice points",
            self.config.strategy, self.config.workers, self.config.choice_points
        );

        let shared = Shared {
            tree: &tree,
            frontier: &frontier,
            global: &global,
            factory: self.factory.as_ref(),
            solver_mode: self.config.solver_mode,
            solutions_per_path: self.config.solutions_per_path,
            active: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            reason: Mutex::new(None),
        };
        let runs = drive(&shared)?;
        let stop_reason = *lock(&shared.reason);

        if stop_reason.is_some() {
            let mut cut_off = 0;
            for option in frontier.drain(&tree) {
                if option.state() == OptionState::Unknown {
                    option.set_cut_off()?;
                    cut_off += 1;
                }
            }
            debug!("{} options cut off", cut_off);
        }

        let stats = SearchStats {
            runs,
            elapsed: global.elapsed(),
            stop_reason,
            tree: tree.stats(),
        };
        info!(
            "search finished after {} runs in {:?}: {} path solutions, {} fails, {} exceeded budgets",
            stats.runs, stats.elapsed, stats.tree.path_solutions, stats.tree.fails, stats.tree.exceeded_budgets
        );
        Ok(SearchOutcome { tree, stats })
    }
}

/// State shared by the workers of one search.
struct Shared<'s> {
    tree: &'s SearchTree,
    frontier: &'s Frontier,
    global: &'s GlobalBudget,
    factory: &'s dyn ChoicePointFactory,
    solver_mode: SolverMode,
    solutions_per_path: usize,
    /// Workers between poll and record.
    active: AtomicUsize,
    stop: AtomicBool,
    reason: Mutex<Option<StopReason>>,
}

/// Marks a worker busy until dropped. A panicking worker stops the search.
struct Busy<'a, 's>(&'a Shared<'s>);

impl<'a, 's> Busy<'a, 's> {
    fn enter(shared: &'a Shared<'s>) -> Self {
        shared.active.fetch_add(1, Ordering::SeqCst);
        Self(shared)
    }
}

impl Drop for Busy<'_, '_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
        if std::thread::panicking() {
            self.0.stop.store(true, Ordering::SeqCst);
        }
    }
}

impl<'s> Shared<'s> {
    fn work<A>(&self, worker: usize, solver: Box<dyn Solver>, region: &SearchRegion<A>) -> Result<u64, SearchError> {
        let mut executor = Executor::new(self.tree, self.frontier, self.global, self.factory, solver, self.solver_mode)
            .with_solutions_per_path(self.solutions_per_path);
        let result = self.drive(&mut executor, region);
        if let Err(e) = &result {
            warn!("worker {} aborted: {}", worker, e);
            self.stop.store(true, Ordering::SeqCst);
        }
        debug!("worker {} done after {} runs", worker, executor.runs());
        result.map(|()| executor.runs())
    }

    fn drive<A>(&self, executor: &mut Executor<'_>, region: &SearchRegion<A>) -> Result<(), SearchError> {
        let backoff = Backoff::new();
        while !self.stop.load(Ordering::SeqCst) {
            if let Some(reason) = self.global.exhausted() {
                self.halt(reason);
                break;
            }
            let busy = Busy::enter(self);
            match executor.select()? {
                Some(target) => {
                    let outcome = executor.evaluate(target, region)?;
                    drop(busy);
                    trace!("run outcome: {:?}", outcome);
                    backoff.reset();
                    self.check_coverage()?;
                }
                None => {
                    drop(busy);
                    // Re-check the deque: a busy worker inserts before it leaves.
                    if self.tree.deque().is_empty() && self.active.load(Ordering::SeqCst) == 0 {
                        if self.frontier.deepen(self.tree) || !self.tree.deque().is_empty() {
                            continue;
                        }
                        break;
                    }
                    backoff.snooze();
                }
            }
        }
        Ok(())
    }

    fn check_coverage(&self) -> Result<(), SearchError> {
        if let Some(coverage) = self.tree.coverage() {
            if coverage.config().terminate_on_full_coverage && coverage.full_coverage_achieved()? {
                self.halt(StopReason::FullCoverage);
            }
        }
        Ok(())
    }

    fn halt(&self, reason: StopReason) {
        let mut slot = lock(&self.reason);
        if slot.is_none() {
            warn!("search stopped early: {:?}", reason);
            *slot = Some(reason);
        }
        self.stop.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::deque::tests::sibling_batches;
    use crate::error::{SolverError, TreeError};
    use crate::expr::{Cmp, Constraint, Labels, NumExpr, SymVar};
    use crate::solver::EnumeratingSolver;

    /// `x > 0 ? (x < 3 ? x : -1) : 0` over `x` in `[-5, 5]`.
    fn three_paths() -> SearchRegion<NumExpr> {
        SearchRegion::new(
            |ctx| Ok(ctx.sym_int("x", -5, 5)),
            |ctx, x| {
                if ctx.compare(x.clone(), Cmp::Gt, NumExpr::from(0))? {
                    if ctx.compare(x.clone(), Cmp::Lt, NumExpr::from(3))? {
                        Ok(Returned::from(x))
                    } else {
                        Ok(Returned::from(-1))
                    }
                } else {
                    Ok(Returned::from(0))
                }
            },
        )
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(SearchConfig::default().validate(), Ok(()));
        assert_eq!(SearchConfig::default().with_workers(0).validate(), Err(ConfigError::NoWorkers));
        let config = SearchConfig::default().with_strategy(SearchStrategy::IterativeDeepening { increment: 0 });
        assert_eq!(config.validate(), Err(ConfigError::ZeroDeepeningIncrement));
        let config = SearchConfig::default().with_solutions_per_path(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroSolutionsPerPath));

        let search = Search::new(SearchConfig::default().with_workers(0));
        let err = search.run_single(&three_paths(), EnumeratingSolver::new()).unwrap_err();
        assert_eq!(err, SearchError::Config(ConfigError::NoWorkers));
    }

    #[test]
    fn test_frontier_parks_below_the_bound() {
        let tree = SearchTree::new(TreeConfig::default()).unwrap();
        let frontier = Frontier::new(SearchStrategy::IterativeDeepening { increment: 1 });
        let batches = sibling_batches(tree.arena(), 3);

        frontier.insert(&tree, &batches[0][1..]);
        frontier.insert(&tree, &batches[1][1..]);
        frontier.insert(&tree, &batches[2][1..]);
        // Root plus the depth-1 batch.
        assert_eq!(tree.deque().size(), 3);

        assert!(frontier.deepen(&tree));
        assert_eq!(frontier.bound(), 2);
        assert_eq!(tree.deque().size(), 5);
        assert!(frontier.deepen(&tree));
        assert_eq!(tree.deque().size(), 7);
        assert!(!frontier.deepen(&tree));
        assert_eq!(frontier.drain(&tree).len(), 7);
    }

    #[test]
    fn test_unbounded_strategies_never_park() {
        let tree = SearchTree::new(TreeConfig::default()).unwrap();
        let frontier = Frontier::new(SearchStrategy::Bfs);
        let batches = sibling_batches(tree.arena(), 2);
        frontier.insert(&tree, &batches[1][1..]);
        frontier.insert(&tree, &batches[0][1..]);
        assert!(!frontier.deepen(&tree));

        let first = frontier.poll(&tree).unwrap();
        assert_eq!(first.id(), crate::types::OptionId::ROOT);
        assert_eq!(frontier.poll(&tree).unwrap().depth().get(), 1);
    }

    #[test]
    fn test_strategies_find_every_path() {
        let strategies = [
            SearchStrategy::Dfs,
            SearchStrategy::Bfs,
            SearchStrategy::IterativeDeepening { increment: 1 },
        ];
        for strategy in strategies {
            let search = Search::new(SearchConfig::default().with_strategy(strategy));
            let outcome = search.run_single(&three_paths(), EnumeratingSolver::new()).unwrap();
            assert_eq!(outcome.stats.tree.path_solutions, 3, "{:?}", strategy);
            assert_eq!(outcome.stats.tree.unevaluated, 0, "{:?}", strategy);
            assert_eq!(outcome.stats.stop_reason, None);
        }
    }

    #[test]
    fn test_max_path_solutions_cuts_off_the_rest() {
        let config = SearchConfig::default().with_budget(BudgetConfig::default().with_max_path_solutions(1));
        let outcome = Search::new(config).run_single(&three_paths(), EnumeratingSolver::new()).unwrap();
        assert_eq!(outcome.stats.stop_reason, Some(StopReason::MaxPathSolutions));
        assert_eq!(outcome.stats.runs, 1);
        assert_eq!(outcome.stats.tree.path_solutions, 1);
        assert_eq!(outcome.stats.tree.cut_off, 2);
        assert_eq!(outcome.stats.tree.unevaluated, 0);
    }

    #[test]
    fn test_full_coverage_stops_the_search() {
        let b = BranchId(0);
        let region = SearchRegion::new(
            |ctx| Ok(ctx.sym_int("x", -5, 5)),
            move |ctx, x| {
                if ctx.compare_at(b, x.clone(), Cmp::Gt, NumExpr::from(0))? {
                    ctx.compare(x.clone(), Cmp::Lt, NumExpr::from(3))?;
                }
                Ok(Returned::Unit)
            },
        )
        .with_branches([b]);
        let coverage = CoverageConfig {
            guide_frontier: true,
            terminate_on_full_coverage: true,
        };
        let search = Search::new(SearchConfig::default().with_coverage(coverage));
        let outcome = search.run_single(&region, EnumeratingSolver::new()).unwrap();

        assert_eq!(outcome.stats.stop_reason, Some(StopReason::FullCoverage));
        // The false edge is requested ahead of the deeper option.
        assert_eq!(outcome.stats.runs, 2);
        assert_eq!(outcome.stats.tree.cut_off, 1);
        let cfg = outcome.tree.coverage().unwrap();
        assert_eq!(cfg.full_coverage_achieved(), Ok(true));
    }

    #[test]
    fn test_engine_errors_abort_the_search() {
        let region = SearchRegion::new(
            |_| Ok(()),
            |ctx, ()| {
                ctx.choose_index(&[])?;
                Ok(Returned::Unit)
            },
        );
        let err = Search::new(SearchConfig::default()).run_single(&region, EnumeratingSolver::new()).unwrap_err();
        assert_eq!(err, SearchError::Tree(TreeError::EmptyChoice));

        let err = Search::new(SearchConfig::default().with_workers(3))
            .run(&region, EnumeratingSolver::new)
            .unwrap_err();
        assert_eq!(err, SearchError::Tree(TreeError::EmptyChoice));
    }

    /// A backend that panics on its first satisfiability check.
    struct PanickingSolver;

    impl Solver for PanickingSolver {
        fn push(&mut self, _: &Constraint) {}
        fn pop(&mut self) -> Result<(), SolverError> {
            Ok(())
        }
        fn reset(&mut self) {}
        fn check_sat(&mut self) -> Result<bool, SolverError> {
            panic!("boom")
        }
        fn label(&mut self, _: &[SymVar]) -> Result<Labels, SolverError> {
            Ok(Labels::new())
        }
    }

    #[test]
    fn test_worker_panics_are_reported() {
        let err = Search::new(SearchConfig::default().with_workers(2))
            .run(&three_paths(), || PanickingSolver)
            .unwrap_err();
        assert_eq!(err, SearchError::WorkerPanicked("boom".to_string()));
    }

    #[test]
    fn test_program_panics_do_not_stop_the_workers() {
        let region: SearchRegion<()> = SearchRegion::new(|_| Ok(()), |_, ()| panic!("boom"));
        let outcome = Search::new(SearchConfig::default().with_workers(2))
            .run(&region, EnumeratingSolver::new)
            .unwrap();
        assert_eq!(outcome.stats.runs, 1);
        assert_eq!(outcome.stats.tree.exception_solutions, 1);
    }

    #[test]
    fn test_unsatisfiable_options_count_as_fails() {
        // The `x < 0` side is refuted while the first run creates its choice.
        let region = SearchRegion::new(
            |ctx| Ok(ctx.sym_int("x", 0, 5)),
            |ctx, x| {
                ctx.compare(x.clone(), Cmp::Lt, NumExpr::from(0))?;
                ctx.compare(x, Cmp::Lt, NumExpr::from(3))?;
                Ok(Returned::Unit)
            },
        );
        let budget = BudgetConfig {
            max_fails: Some(1),
            ..BudgetConfig::default()
        };
        let outcome = Search::new(SearchConfig::default().with_budget(budget))
            .run_single(&region, EnumeratingSolver::new())
            .unwrap();
        assert_eq!(outcome.stats.stop_reason, Some(StopReason::MaxFails));
        assert_eq!(outcome.stats.runs, 1);
        assert_eq!(outcome.stats.tree.unsatisfiable, 1);
        assert_eq!(outcome.stats.tree.cut_off, 1);
    }
}
