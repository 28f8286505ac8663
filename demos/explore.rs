//! Explore a small program with every strategy and print the leaves.
//!
//! Run with:
//! ```bash
//! cargo run --example explore -- --workers 4 --strategy bfs
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};

use symtree::budget::BudgetConfig;
use symtree::choice_point::ChoicePointMode;
use symtree::deque::{DequeConfig, DequeKind};
use symtree::expr::{Cmp, NumExpr, Returned, Value};
use symtree::node::NodeKind;
use symtree::search::{Search, SearchConfig, SearchRegion, SearchStrategy};
use symtree::solver::{EnumeratingSolver, SolverMode};
use symtree::tree::TreeConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    Dfs,
    Bfs,
    Deepening,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Exploration order.
    #[clap(long, value_enum, default_value = "dfs")]
    strategy: Strategy,

    /// Number of worker threads.
    #[clap(long, value_name = "INT", default_value = "1")]
    workers: usize,

    /// Upper bound of the symbolic inputs.
    #[clap(long, value_name = "INT", default_value = "20")]
    bound: i64,

    /// Use the concolic decision procedure.
    #[clap(long)]
    concolic: bool,

    /// Re-assert the whole path on every check.
    #[clap(long)]
    global_solver: bool,

    /// Use the simple deque.
    #[clap(long)]
    simple_deque: bool,

    /// Maximum choice depth per path.
    #[clap(long, value_name = "INT")]
    max_depth: Option<u64>,

    /// Time budget in milliseconds.
    #[clap(long, value_name = "MS")]
    time: Option<u64>,

    /// Write the search tree to this DOT file.
    #[clap(long, value_name = "FILE")]
    dot: Option<std::path::PathBuf>,
}

/// Classify a triangle with sides `a`, `b`, `c`.
fn triangle(bound: i64) -> SearchRegion<(NumExpr, NumExpr, NumExpr)> {
    SearchRegion::new(
        move |ctx| Ok((ctx.sym_int("a", 0, bound), ctx.sym_int("b", 0, bound), ctx.sym_int("c", 0, bound))),
        |ctx, (a, b, c)| {
            let zero = NumExpr::from(0);
            if ctx.compare(a.clone(), Cmp::Le, zero.clone())?
                || ctx.compare(b.clone(), Cmp::Le, zero.clone())?
                || ctx.compare(c.clone(), Cmp::Le, zero)?
            {
                return Err(symtree::error::Interrupt::Raised(Value::Text("non-positive side".into())));
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

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Cli::parse();
    println!("args = {:?}", args);

    let strategy = match args.strategy {
        Strategy::Dfs => SearchStrategy::Dfs,
        Strategy::Bfs => SearchStrategy::Bfs,
        Strategy::Deepening => SearchStrategy::IterativeDeepening { increment: 2 },
    };
    let mut budget = BudgetConfig::default();
    budget.fixed_actual_choice_points = args.max_depth;
    budget.global_time = args.time.map(Duration::from_millis);
    let tree = TreeConfig {
        deque: DequeConfig {
            kind: if args.simple_deque { DequeKind::Simple } else { DequeKind::DirectAccess },
            ..DequeConfig::default()
        },
        enlist_leaves: true,
    };
    let config = SearchConfig::default()
        .with_strategy(strategy)
        .with_workers(args.workers)
        .with_tree(tree)
        .with_budget(budget)
        .with_solver_mode(if args.global_solver { SolverMode::Global } else { SolverMode::Incremental })
        .with_choice_points(if args.concolic { ChoicePointMode::Concolic } else { ChoicePointMode::Symbolic });

    let outcome = Search::new(config).run(&triangle(args.bound), EnumeratingSolver::new)?;
    println!("stats = {:#?}", outcome.stats);

    for leaf in outcome.tree.path_solutions() {
        let node = outcome.tree.arena().node(leaf)?;
        match node.kind() {
            NodeKind::PathSolution(p) | NodeKind::ExceptionPathSolution(p) => {
                let s = p.solution();
                println!("{} = {} with {}", leaf, s.value, s.labels);
            }
            _ => {}
        }
    }

    if let Some(path) = args.dot {
        std::fs::write(&path, outcome.tree.to_dot()?)?;
        println!("Written {}", path.display());
    }

    Ok(())
}
