//! # symtree: search trees and choice points for symbolic execution
//!
//! **`symtree`** is the exploration core of a symbolic-execution engine. The
//! program under test is re-executed from the start once per explored path.
//! Every conditional over symbolic data becomes a *choice point*: the first
//! time a run reaches it, a [`Choice`][crate::node::Choice] is recorded in a
//! shared search tree and a constraint solver decides which branches are
//! feasible; later runs replay the recorded prefix and diverge where the
//! frontier tells them to.
//!
//! ## Key Features
//!
//! - **Shared tree**: one [`SearchTree`][crate::tree::SearchTree] per search, safely
//!   extended by several workers at once. Nodes live in an append-only arena
//!   and are addressed by small handles.
//! - **Pluggable frontier**: the [`ChoiceOptionDeque`][crate::deque::ChoiceOptionDeque]
//!   trait with a simple and a depth-indexed direct-access implementation.
//! - **Symbolic and concolic decisions**: the
//!   [`ChoicePointFactory`][crate::choice_point::ChoicePointFactory] decides how
//!   a new choice is entered: by asking the solver, or by following concrete inputs.
//! - **Budgets**: per-run choice-point limits and search-wide limits on time,
//!   solutions and fails, checked cooperatively at choice points.
//! - **Coverage**: an optional branch-coverage graph that can steer the
//!   frontier towards uncovered edges and end the search at full coverage.
//!
//! ## Basic Usage
//!
//! ```rust
//! use symtree::expr::{Cmp, NumExpr, Returned};
//! use symtree::search::{Search, SearchConfig, SearchRegion};
//! use symtree::solver::EnumeratingSolver;
//!
//! // x in [-5, 5]; returns x when 0 < x < 3.
//! let region = SearchRegion::new(
//!     |ctx| Ok(ctx.sym_int("x", -5, 5)),
//!     |ctx, x| {
//!         if ctx.compare(x.clone(), Cmp::Gt, NumExpr::from(0))? && ctx.compare(x.clone(), Cmp::Lt, NumExpr::from(3))? {
//!             Ok(Returned::from(x))
//!         } else {
//!             Ok(Returned::Unit)
//!         }
//!     },
//! );
//!
//! let outcome = Search::new(SearchConfig::default()).run_single(&region, EnumeratingSolver::new()).unwrap();
//! assert_eq!(outcome.stats.tree.path_solutions, 3);
//! ```
//!
//! ## Core Components
//!
//! - **[`tree`]**: the [`SearchTree`][crate::tree::SearchTree] aggregate.
//! - **[`context`]**: the [`SearchContext`][crate::context::SearchContext] handed to the program.
//! - **[`search`]**: strategies and multi-worker orchestration.
//! - **[`executor`]**: one worker's poll, replay, run and record loop.
//! - **[`dot`]**: Graphviz rendering of a search tree.

pub mod arena;
pub mod budget;
pub mod choice_point;
pub mod context;
pub mod coverage;
pub mod deque;
pub mod dot;
pub mod error;
pub mod executor;
pub mod expr;
pub mod node;
pub mod search;
pub mod solver;
pub mod tree;
pub mod types;
