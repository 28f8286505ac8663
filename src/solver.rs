//! Constraint solver interface.
//!
//! The search tree only needs a narrow service from its solver: an
//! assertion stack with `push`/`pop`, a satisfiability check, and labelling
//! of variables with a concrete witness. Real SMT backends plug in through
//! the [`Solver`] trait; [`EnumeratingSolver`] is a complete reference
//! backend for small bounded integer domains.
//!
//! ## Modes
//!
//! - [`SolverMode::Incremental`]: when the executor moves to another path, it
//!   pops back to the shared prefix and pushes only the new suffix.
//! - [`SolverMode::Global`]: every check re-asserts the whole path from
//!   scratch. Slower, but suitable for backends without incremental support.

use std::sync::Arc;

use log::{debug, trace};

use crate::error::SolverError;
use crate::expr::{Cmp, Constraint, Labels, NumExpr, SymVar};
use crate::node::ChoiceOption;
use crate::types::OptionId;

/// An incremental constraint solver.
pub trait Solver {
    /// Assert a constraint in a new scope.
    fn push(&mut self, constraint: &Constraint);

    /// Drop the most recent scope.
    fn pop(&mut self) -> Result<(), SolverError>;

    /// Drop every scope.
    fn reset(&mut self);

    /// Whether the conjunction of all asserted constraints is satisfiable.
    fn check_sat(&mut self) -> Result<bool, SolverError>;

    /// Concrete witness values for `vars` under the asserted constraints.
    fn label(&mut self, vars: &[SymVar]) -> Result<Labels, SolverError>;
}

/// How the executor keeps the solver in sync with the current path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverMode {
    #[default]
    Incremental,
    Global,
}

/// Brute-force solver over bounded integer domains.
///
/// Models are searched in lexicographic order of the variables (sorted by
/// name), each ranging from `lo` to `hi`, so the first model found is
/// deterministic. If the product of the domains exceeds
/// [`max_assignments`][EnumeratingSolver::with_max_assignments], the solver
/// gives up with [`SolverError::Unknown`].
#[derive(Debug, Clone)]
pub struct EnumeratingSolver {
    stack: Vec<Constraint>,
    max_assignments: u64,
    checks: u64,
}

impl Default for EnumeratingSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl EnumeratingSolver {
    pub fn new() -> Self {
        Self::with_max_assignments(1 << 20)
    }

    pub fn with_max_assignments(max_assignments: u64) -> Self {
        Self {
            stack: Vec::new(),
            max_assignments,
            checks: 0,
        }
    }

    /// Number of asserted scopes.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of satisfiability checks performed so far.
    pub fn checks(&self) -> u64 {
        self.checks
    }

    fn stack_vars(&self) -> Vec<SymVar> {
        let mut vars = vec![];
        for c in &self.stack {
            c.collect_vars(&mut vars);
        }
        vars.sort();
        vars
    }

    /// Find the first model of the stack over `vars`.
    fn find_model(&self, vars: &[SymVar]) -> Result<Option<Labels>, SolverError> {
        let mut space: u64 = 1;
        for v in vars {
            let size = v.hi().abs_diff(v.lo()).checked_add(1).ok_or(SolverError::Unknown)?;
            space = space.checked_mul(size).ok_or(SolverError::Unknown)?;
        }
        if space > self.max_assignments {
            debug!("search space of {} assignments is too large", space);
            return Err(SolverError::Unknown);
        }

        let mut values: Vec<i64> = vars.iter().map(|v| v.lo()).collect();
        loop {
            let labels = vars
                .iter()
                .zip(&values)
                .fold(Labels::new(), |labels, (v, &x)| labels.with(v.name(), x));
            if self.stack.iter().all(|c| c.eval(&labels) == Some(true)) {
                return Ok(Some(labels));
            }

            // Advance the odometer, last variable fastest.
            let mut i = vars.len();
            loop {
                if i == 0 {
                    return Ok(None);
                }
                i -= 1;
                if values[i] < vars[i].hi() {
                    values[i] += 1;
                    break;
                }
                values[i] = vars[i].lo();
            }
        }
    }
}

impl Solver for EnumeratingSolver {
    fn push(&mut self, constraint: &Constraint) {
        trace!("push {}", constraint);
        self.stack.push(constraint.clone());
    }

    fn pop(&mut self) -> Result<(), SolverError> {
        self.stack.pop().map(|_| ()).ok_or(SolverError::EmptyStack)
    }

    fn reset(&mut self) {
        self.stack.clear();
    }

    fn check_sat(&mut self) -> Result<bool, SolverError> {
        self.checks += 1;
        let model = self.find_model(&self.stack_vars())?;
        Ok(model.is_some())
    }

    fn label(&mut self, vars: &[SymVar]) -> Result<Labels, SolverError> {
        let Some(model) = self.find_model(&self.stack_vars())? else {
            let name = vars.first().map_or("<path>", |v| v.name());
            return Err(SolverError::LabelingNotPossible(name.to_string()));
        };
        // Variables the path does not constrain take their default value.
        let mut labels = model.clone();
        for v in vars {
            if !model.contains(v.name()) {
                labels.insert(v.name(), v.default_value());
            }
        }
        Ok(labels)
    }
}

/// A solver kept in sync with a path of options.
///
/// Tracks which options' constraints are currently asserted, so that moving
/// from one path to the next only touches the differing suffix.
pub(crate) struct SolverSession {
    solver: Box<dyn Solver>,
    mode: SolverMode,
    asserted: Vec<(OptionId, Constraint)>,
}

impl SolverSession {
    pub(crate) fn new(solver: Box<dyn Solver>, mode: SolverMode) -> Self {
        Self {
            solver,
            mode,
            asserted: Vec::new(),
        }
    }

    /// Assert exactly the constraints of `path`, root first.
    pub(crate) fn sync_to(&mut self, path: &[Arc<ChoiceOption>]) -> Result<(), SolverError> {
        match self.mode {
            SolverMode::Incremental => {
                let shared = self
                    .asserted
                    .iter()
                    .zip(path)
                    .take_while(|((id, _), o)| *id == o.id())
                    .count();
                while self.asserted.len() > shared {
                    self.solver.pop()?;
                    self.asserted.pop();
                }
                for option in &path[shared..] {
                    self.assert(option);
                }
            }
            SolverMode::Global => {
                self.solver.reset();
                self.asserted.clear();
                for option in path {
                    self.assert(option);
                }
            }
        }
        Ok(())
    }

    /// Assert the option's constraint on top of the current path, without
    /// checking it.
    pub(crate) fn assert(&mut self, option: &ChoiceOption) {
        let constraint = option.constraint();
        self.solver.push(&constraint);
        self.asserted.push((option.id(), constraint));
    }

    /// Check whether the option is feasible on top of the current path.
    ///
    /// A feasible option stays asserted, an infeasible one is popped again.
    pub(crate) fn check(&mut self, option: &ChoiceOption) -> Result<bool, SolverError> {
        if self.mode == SolverMode::Global {
            self.solver.reset();
            for (_, c) in &self.asserted {
                self.solver.push(c);
            }
        }
        self.assert(option);
        let sat = self.solver.check_sat()?;
        if !sat {
            self.solver.pop()?;
            self.asserted.pop();
        }
        Ok(sat)
    }

    pub(crate) fn label(&mut self, vars: &[SymVar]) -> Result<Labels, SolverError> {
        self.solver.label(vars)
    }

    /// Up to `count` further labellings of `vars` on the current path, each
    /// differing from `first` and from one another in some variable.
    ///
    /// The blocking constraints are popped again before returning.
    pub(crate) fn alternative_labels(
        &mut self,
        vars: &[SymVar],
        first: &Labels,
        count: usize,
    ) -> Result<Vec<Labels>, SolverError> {
        let mut found: Vec<Labels> = Vec::new();
        let mut blocked = 0;
        let searched = loop {
            if found.len() >= count {
                break Ok(());
            }
            let last = found.last().unwrap_or(first);
            let Some(block) = blocking_constraint(vars, last) else {
                break Ok(());
            };
            self.solver.push(&block);
            blocked += 1;
            match self.solver.check_sat() {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(e) => break Err(e),
            }
            match self.solver.label(vars) {
                Ok(labels) => found.push(labels),
                Err(e) => break Err(e),
            }
        };
        for _ in 0..blocked {
            self.solver.pop()?;
        }
        searched?;
        trace!("{} alternative labellings", found.len());
        Ok(found)
    }

    /// Number of asserted options.
    pub(crate) fn depth(&self) -> usize {
        self.asserted.len()
    }
}

/// `vars` take some value other than in `labels`. `None` if no variable is
/// labelled.
fn blocking_constraint(vars: &[SymVar], labels: &Labels) -> Option<Constraint> {
    vars.iter()
        .filter_map(|v| {
            let value = labels.get(v.name())?;
            Some(Constraint::cmp(Cmp::Ne, NumExpr::var(v.clone()), NumExpr::from(value)))
        })
        .reduce(|a, b| a.or(&b))
}

impl std::fmt::Debug for SolverSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverSession")
            .field("mode", &self.mode)
            .field("asserted", &self.asserted.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::arena::Arena;

    fn x() -> SymVar {
        SymVar::new("x", -5, 5)
    }

    #[test]
    fn test_push_pop_check() {
        let mut solver = EnumeratingSolver::new();
        let x = NumExpr::var(x());
        assert!(solver.check_sat().unwrap());

        solver.push(&Constraint::cmp(Cmp::Gt, x.clone(), NumExpr::from(3)));
        assert!(solver.check_sat().unwrap());
        solver.push(&Constraint::cmp(Cmp::Lt, x.clone(), NumExpr::from(0)));
        assert!(!solver.check_sat().unwrap());

        solver.pop().unwrap();
        assert!(solver.check_sat().unwrap());
        assert_eq!(solver.label(&[]).unwrap().get("x"), Some(4));

        solver.pop().unwrap();
        assert_eq!(solver.pop(), Err(SolverError::EmptyStack));
    }

    #[test]
    fn test_label_unconstrained_takes_default() {
        let mut solver = EnumeratingSolver::new();
        let y = SymVar::new("y", 2, 9);
        let labels = solver.label(&[x(), y]).unwrap();
        assert_eq!(labels.get("x"), Some(0));
        assert_eq!(labels.get("y"), Some(2));
    }

    #[test]
    fn test_label_unsat_path() {
        let mut solver = EnumeratingSolver::new();
        solver.push(&Constraint::constant(false));
        assert_eq!(solver.label(&[x()]), Err(SolverError::LabelingNotPossible("x".into())));
    }

    #[test]
    fn test_large_space_is_unknown() {
        let mut solver = EnumeratingSolver::with_max_assignments(10);
        solver.push(&Constraint::cmp(Cmp::Eq, NumExpr::var(x()), NumExpr::from(1)));
        assert_eq!(solver.check_sat(), Err(SolverError::Unknown));
    }

    #[test]
    fn test_pairing_exactly_one_side() {
        // For a split (c, !c), exactly one side holds at every point.
        let x = NumExpr::var(x());
        let c = Constraint::cmp(Cmp::Le, x.clone() * NumExpr::from(2), NumExpr::from(3));
        for value in -5..=5 {
            let mut solver = EnumeratingSolver::new();
            solver.push(&Constraint::cmp(Cmp::Eq, x.clone(), NumExpr::from(value)));
            solver.push(&c);
            let yes = solver.check_sat().unwrap();
            solver.pop().unwrap();
            solver.push(&c.not());
            let no = solver.check_sat().unwrap();
            assert!(yes ^ no, "x = {}", value);
        }
    }

    #[test]
    fn test_session_syncs_shared_prefix() {
        let arena = Arena::new();
        let batches = crate::deque::tests::sibling_batches(&arena, 3);
        let root = arena.option(OptionId::ROOT).unwrap();

        let mut session = SolverSession::new(Box::new(EnumeratingSolver::new()), SolverMode::Incremental);
        let deep = vec![root.clone(), batches[0][0].clone(), batches[1][0].clone(), batches[2][0].clone()];
        session.sync_to(&deep).unwrap();
        assert_eq!(session.depth(), 4);

        let sibling = vec![root.clone(), batches[0][0].clone(), batches[1][1].clone()];
        session.sync_to(&sibling).unwrap();
        assert_eq!(session.depth(), 3);

        assert!(session.check(&batches[2][1]).unwrap());
        assert_eq!(session.depth(), 4);
    }

    #[test]
    fn test_session_check_pops_infeasible() {
        let arena = Arena::new();
        let root = arena.option(OptionId::ROOT).unwrap();
        root.set_satisfiable().unwrap();
        let c = Constraint::cmp(Cmp::Gt, NumExpr::var(x()), NumExpr::from(9));
        let choice = arena.new_choice(&root, vec![c.clone(), c.not()], None).unwrap();
        let options = arena.choice_options(choice).unwrap();

        for mode in [SolverMode::Incremental, SolverMode::Global] {
            let mut session = SolverSession::new(Box::new(EnumeratingSolver::new()), mode);
            session.sync_to(std::slice::from_ref(&root)).unwrap();
            assert!(!session.check(&options[0]).unwrap());
            assert_eq!(session.depth(), 1);
            assert!(session.check(&options[1]).unwrap());
            assert_eq!(session.depth(), 2);
        }
    }

    #[test]
    fn test_alternative_labels_block_earlier_models() {
        let arena = Arena::new();
        let root = arena.option(OptionId::ROOT).unwrap();
        root.set_satisfiable().unwrap();
        let x = NumExpr::var(x());
        let c = Constraint::cmp(Cmp::Gt, x.clone(), NumExpr::from(2));
        let choice = arena.new_choice(&root, vec![c.clone(), c.not()], None).unwrap();
        let options = arena.choice_options(choice).unwrap();

        for mode in [SolverMode::Incremental, SolverMode::Global] {
            let mut session = SolverSession::new(Box::new(EnumeratingSolver::new()), mode);
            session.sync_to(std::slice::from_ref(&root)).unwrap();
            assert!(session.check(&options[0]).unwrap());
            let first = session.label(&[self::x()]).unwrap();
            assert_eq!(first.get("x"), Some(3));

            let more = session.alternative_labels(&[self::x()], &first, 5).unwrap();
            let values: Vec<_> = more.iter().map(|l| l.get("x").unwrap()).collect();
            assert_eq!(values, vec![4, 5]);
            // The path is asserted exactly as before.
            assert_eq!(session.depth(), 2);
            assert_eq!(session.label(&[self::x()]).unwrap(), first);

            assert!(session.alternative_labels(&[], &first, 5).unwrap().is_empty());
        }
    }
}
