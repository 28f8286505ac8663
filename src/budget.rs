//! Budget accounting.
//!
//! Budgets are passive counters checked by the code under execution: nothing
//! preempts a run, the run notices at its next choice point that a budget is
//! exhausted and returns [`Interrupt::BudgetExceeded`][crate::error::Interrupt].
//!
//! - [`ExecutionBudgetManager`] is created fresh for every run and counts
//!   choice points of that run only. It is owned by one worker and needs no
//!   synchronization.
//! - [`GlobalBudget`] is shared by all workers of a search and decides when
//!   the whole search stops. Its counters are atomics, so the hot-path checks
//!   never take a lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A budget that can be exceeded, with its configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Budget {
    /// Maximum number of choice points reached in one run, replayed and
    /// concrete ones included.
    FixedPossibleChoicePoints(u64),
    /// Maximum depth of a choice in the tree.
    FixedActualChoicePoints(u64),
    /// Wall-clock time since the search started.
    GlobalTime(Duration),
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Budget::FixedPossibleChoicePoints(n) => write!(f, "possible choice points <= {}", n),
            Budget::FixedActualChoicePoints(n) => write!(f, "actual choice points <= {}", n),
            Budget::GlobalTime(d) => write!(f, "time <= {:?}", d),
        }
    }
}

/// Budget limits. `None` means unlimited.
#[derive(Debug, Clone, Default)]
pub struct BudgetConfig {
    /// Per run: choice points reached, replayed and concrete ones included.
    pub fixed_possible_choice_points: Option<u64>,
    /// Per path: depth of the deepest choice that may be created.
    pub fixed_actual_choice_points: Option<u64>,
    /// Whole search: wall-clock time.
    pub global_time: Option<Duration>,
    /// Whole search: stop after this many fails.
    pub max_fails: Option<u64>,
    /// Whole search: stop after this many path solutions.
    pub max_path_solutions: Option<u64>,
    /// Whole search: stop after this many runs exceeded a budget.
    pub max_exceeded_budgets: Option<u64>,
}

impl BudgetConfig {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_fixed_actual_choice_points(mut self, n: u64) -> Self {
        self.fixed_actual_choice_points = Some(n);
        self
    }

    pub fn with_fixed_possible_choice_points(mut self, n: u64) -> Self {
        self.fixed_possible_choice_points = Some(n);
        self
    }

    pub fn with_global_time(mut self, time: Duration) -> Self {
        self.global_time = Some(time);
        self
    }

    pub fn with_max_path_solutions(mut self, n: u64) -> Self {
        self.max_path_solutions = Some(n);
        self
    }
}

/// Why a search stopped before exhausting its frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    GlobalTime,
    MaxFails,
    MaxPathSolutions,
    MaxExceededBudgets,
    FullCoverage,
}

/// Counters shared by all workers of one search.
#[derive(Debug)]
pub struct GlobalBudget {
    config: BudgetConfig,
    start: Instant,
    fails: AtomicU64,
    path_solutions: AtomicU64,
    exceeded_budgets: AtomicU64,
}

impl GlobalBudget {
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            config,
            start: Instant::now(),
            fails: AtomicU64::new(0),
            path_solutions: AtomicU64::new(0),
            exceeded_budgets: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn time_exceeded(&self) -> Option<Budget> {
        let limit = self.config.global_time?;
        (self.elapsed() >= limit).then_some(Budget::GlobalTime(limit))
    }

    pub fn record_fail(&self) {
        self.fails.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_path_solution(&self) {
        self.path_solutions.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_exceeded_budget(&self) {
        self.exceeded_budgets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fails(&self) -> u64 {
        self.fails.load(Ordering::Relaxed)
    }
    pub fn path_solutions(&self) -> u64 {
        self.path_solutions.load(Ordering::Relaxed)
    }
    pub fn exceeded_budgets(&self) -> u64 {
        self.exceeded_budgets.load(Ordering::Relaxed)
    }

    /// Check whether any search-wide limit is reached.
    pub fn exhausted(&self) -> Option<StopReason> {
        let reached = |limit: Option<u64>, value: u64| limit.is_some_and(|l| value >= l);
        if self.time_exceeded().is_some() {
            Some(StopReason::GlobalTime)
        } else if reached(self.config.max_path_solutions, self.path_solutions()) {
            Some(StopReason::MaxPathSolutions)
        } else if reached(self.config.max_fails, self.fails()) {
            Some(StopReason::MaxFails)
        } else if reached(self.config.max_exceeded_budgets, self.exceeded_budgets()) {
            Some(StopReason::MaxExceededBudgets)
        } else {
            None
        }
    }
}

/// Per-run budget counters.
#[derive(Debug)]
pub struct ExecutionBudgetManager<'g> {
    global: &'g GlobalBudget,
    possible_choice_points: u64,
    actual_choice_points: u64,
}

impl<'g> ExecutionBudgetManager<'g> {
    pub fn new(global: &'g GlobalBudget) -> Self {
        Self {
            global,
            possible_choice_points: 0,
            actual_choice_points: 0,
        }
    }

    /// The search-wide counters this run reports to.
    pub fn global(&self) -> &'g GlobalBudget {
        self.global
    }

    /// Number of choice points reached in this run.
    pub fn possible_choice_points(&self) -> u64 {
        self.possible_choice_points
    }

    /// Number of choices created by this run.
    pub fn actual_choice_points(&self) -> u64 {
        self.actual_choice_points
    }

    pub fn fixed_possible_choice_point_budget(&self) -> Option<Budget> {
        self.global.config.fixed_possible_choice_points.map(Budget::FixedPossibleChoicePoints)
    }

    pub fn fixed_possible_choice_point_budget_is_exceeded(&self) -> bool {
        let limit = self.global.config.fixed_possible_choice_points;
        limit.is_some_and(|l| self.possible_choice_points > l)
    }

    pub fn fixed_actual_choice_point_budget(&self) -> Option<Budget> {
        self.global.config.fixed_actual_choice_points.map(Budget::FixedActualChoicePoints)
    }

    /// Whether a choice at `depth` would exceed the depth budget.
    pub fn fixed_actual_choice_point_budget_is_exceeded(&self, depth: u64) -> bool {
        let limit = self.global.config.fixed_actual_choice_points;
        limit.is_some_and(|l| depth > l)
    }

    /// Account for one choice point reached by the run and check the
    /// per-run count and the time budget.
    pub fn check_choice_point(&mut self) -> Result<(), Budget> {
        self.possible_choice_points += 1;
        if let Some(budget) = self.fixed_possible_choice_point_budget() {
            if self.fixed_possible_choice_point_budget_is_exceeded() {
                return Err(budget);
            }
        }
        if let Some(budget) = self.global.time_exceeded() {
            return Err(budget);
        }
        Ok(())
    }

    /// Check that a choice may exist at `depth`.
    pub fn check_choice_depth(&self, depth: u64) -> Result<(), Budget> {
        match self.fixed_actual_choice_point_budget() {
            Some(budget) if self.fixed_actual_choice_point_budget_is_exceeded(depth) => Err(budget),
            _ => Ok(()),
        }
    }

    /// Account for a newly created choice.
    pub fn register_new_choice(&mut self) {
        self.actual_choice_points += 1;
    }
}
