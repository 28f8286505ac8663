//! Coverage-guided exploration of a small state machine.
//!
//! Run with:
//! ```bash
//! cargo run --example coverage -- --steps 6
//! ```

use clap::Parser;

use symtree::coverage::CoverageConfig;
use symtree::expr::{Cmp, NumExpr, Returned};
use symtree::search::{Search, SearchConfig, SearchRegion};
use symtree::solver::EnumeratingSolver;
use symtree::types::BranchId;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of inputs fed to the machine.
    #[arg(value_name = "INT", default_value = "4")]
    steps: usize,

    /// Keep exploring after every branch is covered.
    #[clap(long)]
    exhaustive: bool,

    /// Disable coverage-guided frontier selection.
    #[clap(long)]
    unguided: bool,
}

const INC: BranchId = BranchId(0);
const DEC: BranchId = BranchId(1);
const LOCKED: BranchId = BranchId(2);

/// A counter that locks once it reaches 3.
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

    let coverage = CoverageConfig {
        guide_frontier: !args.unguided,
        terminate_on_full_coverage: !args.exhaustive,
    };
    let search = Search::new(SearchConfig::default().with_coverage(coverage));
    let outcome = search.run_single(&machine(args.steps), EnumeratingSolver::new())?;

    println!("stats = {:#?}", outcome.stats);
    if let Some(cfg) = outcome.tree.coverage() {
        for id in [INC, DEC, LOCKED] {
            println!("{} -> {:?}", id, cfg.state(id));
        }
    }

    Ok(())
}
