//! Coverage tracking through whole searches.

use test_log::test;

use symtree::budget::StopReason;
use symtree::coverage::{CoverageConfig, CoverageState};
use symtree::expr::{Cmp, NumExpr, Returned};
use symtree::search::{Search, SearchConfig, SearchOutcome, SearchRegion};
use symtree::solver::EnumeratingSolver;
use symtree::types::BranchId;

const INC: BranchId = BranchId(0);
const DEC: BranchId = BranchId(1);
const LOCKED: BranchId = BranchId(2);

/// A counter fed with inputs in `[0, 2]` that locks once it reaches 3.
fn machine(steps: usize) -> SearchRegion<Vec<NumExpr>> {
    SearchRegion::new(
        move |ctx| Ok((0..steps).map(|i| ctx.sym_int(&format!("in{}", i), 0, 2)).collect()),
        |ctx, inputs: Vec<NumExpr>| {
            let mut counter = 0;
            for input in inputs {
                if ctx.compare_at(LOCKED, NumExpr::from(counter), Cmp::Ge, NumExpr::from(3))? {
                    break;
                }
                if ctx.compare_at(INC, input.clone(), Cmp::Eq, NumExpr::from(1))? {
                    counter += 1;
                } else if ctx.compare_at(DEC, input, Cmp::Eq, NumExpr::from(2))? {
                    counter -= 1;
                }
            }
            Ok(Returned::from(counter))
        },
    )
    .with_branches([INC, DEC, LOCKED])
}

fn explore(coverage: CoverageConfig) -> SearchOutcome {
    let search = Search::new(SearchConfig::default().with_coverage(coverage));
    search.run_single(&machine(4), EnumeratingSolver::new()).unwrap()
}

#[test]
fn test_exhaustive_search_covers_everything() {
    let outcome = explore(CoverageConfig {
        guide_frontier: true,
        terminate_on_full_coverage: false,
    });
    assert_eq!(outcome.stats.stop_reason, None);
    assert_eq!(outcome.stats.tree.unevaluated, 0);

    let cfg = outcome.tree.coverage().unwrap();
    for id in [INC, DEC, LOCKED] {
        assert_eq!(cfg.state(id), Some(CoverageState::AllCovered), "{}", id);
    }
    assert!(cfg.nodes_with_uncovered_edges().is_empty());
    // Concrete lock checks never create choices.
    assert!(cfg.node(LOCKED).unwrap().choices.is_empty());
    assert!(!cfg.node(INC).unwrap().choices.is_empty());
}

#[test]
fn test_full_coverage_ends_the_search_early() {
    let exhaustive = explore(CoverageConfig {
        guide_frontier: false,
        terminate_on_full_coverage: false,
    });

    for guide_frontier in [true, false] {
        let outcome = explore(CoverageConfig {
            guide_frontier,
            terminate_on_full_coverage: true,
        });
        assert_eq!(outcome.stats.stop_reason, Some(StopReason::FullCoverage));
        assert!(outcome.stats.runs < exhaustive.stats.runs, "guided: {}", guide_frontier);
        assert!(outcome.stats.tree.cut_off > 0);
        assert_eq!(outcome.tree.coverage().unwrap().full_coverage_achieved(), Ok(true));
    }
}

#[test]
fn test_guidance_needs_fewer_runs() {
    let guided = explore(CoverageConfig {
        guide_frontier: true,
        terminate_on_full_coverage: true,
    });
    let unguided = explore(CoverageConfig {
        guide_frontier: false,
        terminate_on_full_coverage: true,
    });
    assert!(guided.stats.runs <= unguided.stats.runs);
}
