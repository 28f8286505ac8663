//! End-to-end exploration of small programs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use test_log::test;

use symtree::budget::{BudgetConfig, StopReason};
use symtree::choice_point::ChoicePointMode;
use symtree::deque::{DequeConfig, DequeKind};
use symtree::error::{Interrupt, SearchError, TreeError};
use symtree::expr::{Cmp, Constraint, NumExpr, Returned, Value};
use symtree::node::NodeKind;
use symtree::search::{Search, SearchConfig, SearchOutcome, SearchRegion, SearchStrategy};
use symtree::solver::{EnumeratingSolver, SolverMode};
use symtree::tree::TreeConfig;

/// `0 < x < 3` over `x` in `[-5, 5]`; every other input fails.
fn between() -> SearchRegion<NumExpr> {
    SearchRegion::new(
        |ctx| Ok(ctx.sym_int("x", -5, 5)),
        |ctx, x| {
            if ctx.compare(x.clone(), Cmp::Gt, NumExpr::from(0))? && ctx.compare(x.clone(), Cmp::Lt, NumExpr::from(3))? {
                Ok(Returned::from(x))
            } else {
                Err(Interrupt::Fail)
            }
        },
    )
}

/// Classify a triangle with sides in `[0, bound]`.
fn triangle(bound: i64) -> SearchRegion<(NumExpr, NumExpr, NumExpr)> {
    SearchRegion::new(
        move |ctx| Ok((ctx.sym_int("a", 0, bound), ctx.sym_int("b", 0, bound), ctx.sym_int("c", 0, bound))),
        |ctx, (a, b, c)| {
            let zero = NumExpr::from(0);
            if ctx.compare(a.clone(), Cmp::Le, zero.clone())?
                || ctx.compare(b.clone(), Cmp::Le, zero.clone())?
                || ctx.compare(c.clone(), Cmp::Le, zero)?
            {
                return Err(Interrupt::Raised(Value::Text("non-positive side".into())));
            }
            if ctx.compare(a.clone() + b.clone(), Cmp::Le, c.clone())?
                || ctx.compare(a.clone() + c.clone(), Cmp::Le, b.clone())?
                || ctx.compare(b.clone() + c.clone(), Cmp::Le, a.clone())?
            {
                return Ok(Returned::from(0));
            }
            let ab = ctx.compare(a.clone(), Cmp::Eq, b.clone())?;
            let bc = ctx.compare(b.clone(), Cmp::Eq, c.clone())?;
            if ab && bc {
                return Ok(Returned::from(3));
            }
            if ab || bc || ctx.compare(a, Cmp::Eq, c)? {
                return Ok(Returned::from(2));
            }
            Ok(Returned::from(1))
        },
    )
}

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

/// `10 / 0` for `x == 0`, `10 / 2` otherwise, with `x` in `[0, 5]`.
fn divide_ten() -> SearchRegion<NumExpr> {
    SearchRegion::new(
        |ctx| Ok(ctx.sym_int("x", 0, 5)),
        |ctx, x| {
            let divisor: i64 = if ctx.compare(x, Cmp::Eq, NumExpr::from(0))? { 0 } else { 2 };
            Ok(Returned::from(10 / divisor))
        },
    )
}

fn solution_values(outcome: &SearchOutcome) -> Vec<String> {
    let mut values: Vec<String> = outcome
        .tree
        .arena()
        .nodes()
        .iter()
        .filter_map(|node| match node.kind() {
            NodeKind::PathSolution(p) | NodeKind::ExceptionPathSolution(p) => Some(p.solution().value.to_string()),
            _ => None,
        })
        .collect();
    values.sort();
    values
}

fn assert_labels_satisfy_paths(outcome: &SearchOutcome) {
    for node in outcome.tree.arena().nodes() {
        if let NodeKind::PathSolution(p) | NodeKind::ExceptionPathSolution(p) = node.kind() {
            for labels in p.solutions().into_iter().map(|s| s.labels) {
                for c in p.path_constraints() {
                    assert_eq!(c.eval(&labels), Some(true), "{} violates {} at {}", labels, c, node.id());
                }
            }
        }
    }
}

#[test]
fn test_between_zero_and_three() {
    let config = SearchConfig::default().with_tree(TreeConfig {
        enlist_leaves: true,
        ..TreeConfig::default()
    });
    let outcome = Search::new(config).run_single(&between(), EnumeratingSolver::new()).unwrap();
    let stats = outcome.stats;
    assert_eq!(stats.tree.path_solutions, 1);
    assert_eq!(stats.tree.explicit_fails, 2);
    assert_eq!(stats.tree.unevaluated, 0);

    let leaves = outcome.tree.path_solutions();
    assert_eq!(leaves.len(), 1);
    let node = outcome.tree.arena().node(leaves[0]).unwrap();
    let solution = node.as_path_solution().unwrap().solution();
    let x = solution.labels.get("x").unwrap();
    assert!(x == 1 || x == 2, "x = {}", x);
    assert_eq!(solution.value, Value::Int(x));
    assert_eq!(outcome.tree.fails().len(), 2);
    assert_labels_satisfy_paths(&outcome);
}

#[test]
fn test_every_labelling_of_a_path() {
    let config = SearchConfig::default().with_solutions_per_path(3);
    let outcome = Search::new(config).run_single(&between(), EnumeratingSolver::new()).unwrap();
    assert_eq!(outcome.stats.tree.path_solutions, 1);

    let node = outcome
        .tree
        .arena()
        .nodes()
        .into_iter()
        .find(|node| matches!(node.kind(), NodeKind::PathSolution(_)))
        .unwrap();
    let solutions = node.as_path_solution().unwrap().solutions();
    // Only x = 1 and x = 2 satisfy the path.
    let labelled: Vec<i64> = solutions.iter().map(|s| s.labels.get("x").unwrap()).collect();
    assert_eq!(labelled, vec![1, 2]);
    let values: Vec<Value> = solutions.iter().map(|s| s.value.clone()).collect();
    assert_eq!(values, vec![Value::Int(1), Value::Int(2)]);
    assert_labels_satisfy_paths(&outcome);

    // A single labelling per path by default.
    let outcome = Search::new(SearchConfig::default()).run_single(&between(), EnumeratingSolver::new()).unwrap();
    let leaves = outcome.tree.arena().nodes();
    let node = leaves.iter().find(|node| matches!(node.kind(), NodeKind::PathSolution(_))).unwrap();
    assert_eq!(node.as_path_solution().unwrap().solutions().len(), 1);
}

#[test]
fn test_panicking_program_records_an_exception_solution() {
    let single = Search::new(SearchConfig::default()).run_single(&divide_ten(), EnumeratingSolver::new()).unwrap();
    let multi = Search::new(SearchConfig::default().with_workers(2))
        .run(&divide_ten(), EnumeratingSolver::new)
        .unwrap();
    for outcome in [single, multi] {
        let stats = outcome.stats;
        assert_eq!(stats.tree.exception_solutions, 1);
        assert_eq!(stats.tree.path_solutions, 1);
        assert_eq!(stats.tree.unevaluated, 0);
        assert_eq!(stats.stop_reason, None);

        let raised = outcome
            .tree
            .arena()
            .nodes()
            .into_iter()
            .find(|node| matches!(node.kind(), NodeKind::ExceptionPathSolution(_)))
            .unwrap();
        let solution = raised.as_path_solution().unwrap().solution();
        assert_eq!(solution.value, Value::Text("attempt to divide by zero".to_string()));
        assert_eq!(solution.labels.get("x"), Some(0));
        assert_eq!(solution_values(&outcome), vec!["\"attempt to divide by zero\"".to_string(), "5".to_string()]);
    }
}

#[test]
fn test_replay_over_a_wider_choice_is_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let region: SearchRegion<NumExpr> = SearchRegion::new(
        |ctx| Ok(ctx.sym_int("x", 0, 5)),
        move |ctx, x| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                let two = NumExpr::from(2);
                ctx.choose_index(&[
                    Constraint::cmp(Cmp::Lt, x.clone(), two.clone()),
                    Constraint::cmp(Cmp::Eq, x.clone(), two.clone()),
                    Constraint::cmp(Cmp::Gt, x, two),
                ])?;
            } else {
                // Diverges: a binary branch where a ternary one was recorded.
                ctx.compare(x, Cmp::Lt, NumExpr::from(2))?;
            }
            Ok(Returned::Unit)
        },
    );
    let err = Search::new(SearchConfig::default()).run_single(&region, EnumeratingSolver::new()).unwrap_err();
    assert!(matches!(err, SearchError::Tree(TreeError::IllegalTreeAccess(_))), "{}", err);
}

#[test]
fn test_replay_reaches_every_path_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let region: SearchRegion<Vec<NumExpr>> = SearchRegion::new(
        move |ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(["a", "b", "c"].iter().map(|name| ctx.sym_int(name, 0, 1)).collect())
        },
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
    );
    let outcome = Search::new(SearchConfig::default()).run_single(&region, EnumeratingSolver::new()).unwrap();

    assert_eq!(outcome.stats.tree.path_solutions, 8);
    // Root plus one choice per prefix of length 0, 1 and 2.
    assert_eq!(outcome.stats.tree.choices, 1 + 1 + 2 + 4);
    assert_eq!(outcome.stats.runs, 8);
    assert_eq!(calls.load(Ordering::SeqCst), 8);

    let expected: Vec<String> = {
        let mut v: Vec<String> = (0..8).map(|i| i.to_string()).collect();
        v.sort();
        v
    };
    assert_eq!(solution_values(&outcome), expected);
    assert_labels_satisfy_paths(&outcome);
}

#[test]
fn test_budget_aborts_the_third_choice_point() {
    let budget = BudgetConfig {
        fixed_possible_choice_points: Some(2),
        max_exceeded_budgets: Some(1),
        ..BudgetConfig::default()
    };
    let config = SearchConfig::default().with_budget(budget);
    let outcome = Search::new(config).run_single(&bits(), EnumeratingSolver::new()).unwrap();

    let stats = outcome.stats;
    assert_eq!(stats.stop_reason, Some(StopReason::MaxExceededBudgets));
    assert_eq!(stats.runs, 1);
    // Two choices below the root, none for the third bit.
    assert_eq!(stats.tree.choices, 3);
    assert_eq!(stats.tree.exceeded_budgets, 1);
    assert_eq!(stats.tree.path_solutions, 0);
    assert_eq!(stats.tree.fails, 0);
    assert_eq!(stats.tree.cut_off, 2);
}

#[test]
fn test_depth_budget_bounds_every_path() {
    let config = SearchConfig::default().with_budget(BudgetConfig::default().with_fixed_actual_choice_points(2));
    let outcome = Search::new(config).run_single(&bits(), EnumeratingSolver::new()).unwrap();

    let stats = outcome.stats;
    assert_eq!(stats.stop_reason, None);
    assert_eq!(stats.tree.choices, 1 + 1 + 2);
    assert_eq!(stats.tree.exceeded_budgets, 4);
    assert_eq!(stats.tree.path_solutions, 0);
}

#[test]
fn test_strategies_and_deques_agree() {
    let reference = Search::new(SearchConfig::default()).run_single(&triangle(4), EnumeratingSolver::new()).unwrap();
    let values = solution_values(&reference);
    assert!(reference.stats.tree.exception_solutions > 0);
    assert_labels_satisfy_paths(&reference);

    let strategies = [
        SearchStrategy::Dfs,
        SearchStrategy::Bfs,
        SearchStrategy::IterativeDeepening { increment: 1 },
        SearchStrategy::IterativeDeepening { increment: 3 },
    ];
    for strategy in strategies {
        for kind in [DequeKind::Simple, DequeKind::DirectAccess] {
            let tree = TreeConfig {
                deque: DequeConfig {
                    kind,
                    growth_batch: 2,
                },
                enlist_leaves: false,
            };
            let config = SearchConfig::default().with_strategy(strategy).with_tree(tree);
            let outcome = Search::new(config).run_single(&triangle(4), EnumeratingSolver::new()).unwrap();
            assert_eq!(outcome.stats.tree, reference.stats.tree, "{:?} {:?}", strategy, kind);
            assert_eq!(solution_values(&outcome), values, "{:?} {:?}", strategy, kind);
        }
    }
}

#[test]
fn test_global_solver_mode_agrees() {
    let incremental = Search::new(SearchConfig::default()).run_single(&triangle(3), EnumeratingSolver::new()).unwrap();
    let config = SearchConfig::default().with_solver_mode(SolverMode::Global);
    let global = Search::new(config).run_single(&triangle(3), EnumeratingSolver::new()).unwrap();
    assert_eq!(global.stats.tree, incremental.stats.tree);
    assert_eq!(solution_values(&global), solution_values(&incremental));
}

#[test]
fn test_workers_agree_with_a_single_worker() {
    let single = Search::new(SearchConfig::default()).run_single(&triangle(4), EnumeratingSolver::new()).unwrap();
    for workers in [2, 4] {
        let config = SearchConfig::default().with_workers(workers);
        let outcome = Search::new(config).run(&triangle(4), EnumeratingSolver::new).unwrap();
        assert_eq!(outcome.stats.tree, single.stats.tree, "{} workers", workers);
        assert_eq!(outcome.stats.runs, single.stats.runs, "{} workers", workers);
        assert_eq!(solution_values(&outcome), solution_values(&single));
        assert_labels_satisfy_paths(&outcome);
    }
}

#[test]
fn test_concolic_finds_the_same_paths() {
    let symbolic = Search::new(SearchConfig::default()).run_single(&triangle(4), EnumeratingSolver::new()).unwrap();
    let config = SearchConfig::default().with_choice_points(ChoicePointMode::Concolic);
    let concolic = Search::new(config).run_single(&triangle(4), EnumeratingSolver::new()).unwrap();

    assert_eq!(concolic.stats.tree.path_solutions, symbolic.stats.tree.path_solutions);
    assert_eq!(concolic.stats.tree.exception_solutions, symbolic.stats.tree.exception_solutions);
    assert_eq!(solution_values(&concolic), solution_values(&symbolic));
    assert_eq!(concolic.stats.tree.unevaluated, 0);
    assert_labels_satisfy_paths(&concolic);
}

#[test]
fn test_dot_contains_every_node() {
    let outcome = Search::new(SearchConfig::default()).run_single(&between(), EnumeratingSolver::new()).unwrap();
    let dot = outcome.tree.to_dot().unwrap();
    for node in outcome.tree.arena().nodes() {
        assert!(dot.contains(&format!("n{} [", node.id().index())), "missing {}", node.id());
    }
}
