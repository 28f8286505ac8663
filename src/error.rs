//! Errors and control-flow signals.
//!
//! Two families live here:
//!
//! - **Errors** ([`TreeError`], [`SolverError`], [`ConfigError`], all
//!   wrapped by [`SearchError`]) indicate a defect or an incomplete backend.
//!   They abort the whole search.
//! - **Signals** ([`Interrupt`]) stop the current path and return control to
//!   the executor, which records the outcome and polls the next option.
//!   They are ordinary values: no unwinding and no backtraces.

use std::any::Any;

use thiserror::Error;

use crate::budget::Budget;
use crate::expr::Value;
use crate::node::OptionState;
use crate::types::{NodeId, OptionId};

/// Violations of the tree's mutation protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("illegal transition of option {option} from {from:?} to {to:?}")]
    IllegalTransition {
        option: OptionId,
        from: OptionState,
        to: OptionState,
    },
    #[error("child of option {0} is already set")]
    ChildAlreadySet(OptionId),
    #[error("a choice must have at least one option")]
    EmptyChoice,
    #[error("constraint of option {0} can no longer be modified")]
    ConstraintFrozen(OptionId),
    #[error("illegal tree access: {0}")]
    IllegalTreeAccess(String),
    #[error("option {from} is not a proper ancestor of option {to}")]
    NotAnAncestor { from: OptionId, to: OptionId },
    #[error("node {0} is not a choice")]
    NotAChoice(NodeId),
}

/// Failures of the constraint solver or labelling service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("solver could not decide satisfiability")]
    Unknown,
    #[error("no witness for variable `{0}` on a satisfiable path")]
    LabelingNotPossible(String),
    #[error("pop on an empty constraint stack")]
    EmptyStack,
}

/// Requests that the current configuration does not support.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("coverage-guided frontier selection is not enabled")]
    CoverageGuidanceDisabled,
    #[error("termination on full coverage is not enabled")]
    FullCoverageTerminationDisabled,
    #[error("no coverage CFG is configured")]
    NoCoverageCfg,
    #[error("at least one worker is required")]
    NoWorkers,
    #[error("deque growth batch must be positive")]
    ZeroGrowthBatch,
    #[error("iterative deepening increment must be positive")]
    ZeroDeepeningIncrement,
    #[error("at least one solution per path is required")]
    ZeroSolutionsPerPath,
}

/// Any error that aborts a search.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("tree: {0}")]
    Tree(#[from] TreeError),
    #[error("solver: {0}")]
    Solver(#[from] SolverError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

/// Signal ending the current path early.
///
/// Choice points return [`Step`], so a program under test propagates
/// signals with `?`. Only the executor inspects them.
#[derive(Debug, Clone, PartialEq)]
pub enum Interrupt {
    /// Nothing left to do on this path; everything is already recorded.
    Backtrack,
    /// The program explicitly rejected this path.
    Fail,
    /// A run budget was exhausted.
    BudgetExceeded(Budget),
    /// The program raised an exception, recorded as an exception solution.
    Raised(Value),
    /// An engine error; aborts the whole search.
    Error(SearchError),
}

impl From<TreeError> for Interrupt {
    fn from(e: TreeError) -> Self {
        Interrupt::Error(e.into())
    }
}

impl From<SolverError> for Interrupt {
    fn from(e: SolverError) -> Self {
        Interrupt::Error(e.into())
    }
}

impl From<SearchError> for Interrupt {
    fn from(e: SearchError) -> Self {
        Interrupt::Error(e)
    }
}

/// Result of a single step of the program under test.
///
/// `Ok(b)` continues with decision `b`; `Err(_)` ends the path.
pub type Step<T> = Result<T, Interrupt>;

/// Text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_error_converts_to_interrupt() {
        let e = TreeError::ChildAlreadySet(OptionId::new(3));
        let i: Interrupt = e.clone().into();
        assert_eq!(i, Interrupt::Error(SearchError::Tree(e)));
    }

    #[test]
    fn test_messages() {
        let e = TreeError::IllegalTransition {
            option: OptionId::new(1),
            from: OptionState::Evaluated,
            to: OptionState::Unsatisfiable,
        };
        assert_eq!(e.to_string(), "illegal transition of option o1 from Evaluated to Unsatisfiable");
        let e: SearchError = SolverError::LabelingNotPossible("x".into()).into();
        assert_eq!(e.to_string(), "solver: no witness for variable `x` on a satisfiable path");
    }
}
