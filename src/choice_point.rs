//! Decision procedures for newly discovered choices.
//!
//! When a run reaches a branch point beyond the recorded part of the tree,
//! the [`SearchContext`] creates a new choice and asks its
//! [`ChoicePointFactory`] which option the run continues with. The factory
//! marks that option satisfiable and hands every option it does not take to
//! the frontier.
//!
//! - [`SymbolicChoicePointFactory`] asks the solver, trying options in
//!   order until one is satisfiable.
//! - [`ConcolicChoicePointFactory`] follows the run's concrete inputs and
//!   never calls the solver: the observed side is feasible by construction.

use std::sync::Arc;

use log::debug;

use crate::context::SearchContext;
use crate::error::SearchError;
use crate::node::ChoiceOption;

pub trait ChoicePointFactory: Send + Sync {
    /// Pick the option of a fresh choice that the run continues with.
    ///
    /// The chosen option must be marked satisfiable and asserted, e.g. with
    /// [`SearchContext::decide_on_choice_option`] or
    /// [`SearchContext::assume_choice_option`]. Options not taken must be
    /// handed to [`SearchContext::enqueue`]. Returns `None` when no option
    /// can be taken.
    fn choose(&self, ctx: &mut SearchContext<'_>, options: &[Arc<ChoiceOption>]) -> Result<Option<usize>, SearchError>;

    /// Whether runs need concrete inputs.
    fn wants_seed(&self) -> bool {
        false
    }
}

/// Which built-in factory a search uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChoicePointMode {
    #[default]
    Symbolic,
    Concolic,
}

impl ChoicePointMode {
    pub fn factory(self) -> Box<dyn ChoicePointFactory> {
        match self {
            ChoicePointMode::Symbolic => Box::new(SymbolicChoicePointFactory),
            ChoicePointMode::Concolic => Box::new(ConcolicChoicePointFactory),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolicChoicePointFactory;

impl ChoicePointFactory for SymbolicChoicePointFactory {
    fn choose(&self, ctx: &mut SearchContext<'_>, options: &[Arc<ChoiceOption>]) -> Result<Option<usize>, SearchError> {
        let mut chosen = None;
        for (i, option) in options.iter().enumerate() {
            if ctx.decide_on_choice_option(option)? {
                chosen = Some(i);
                break;
            }
        }
        let rest: Vec<Arc<ChoiceOption>> = options
            .iter()
            .enumerate()
            .filter(|&(i, _)| Some(i) != chosen)
            .map(|(_, o)| o.clone())
            .collect();
        ctx.enqueue(&rest);
        match chosen {
            Some(i) => debug!("symbolic: continue with {}", options[i].id()),
            None => debug!("symbolic: no satisfiable option below {}", ctx.current().id()),
        }
        Ok(chosen)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConcolicChoicePointFactory;

impl ChoicePointFactory for ConcolicChoicePointFactory {
    fn choose(&self, ctx: &mut SearchContext<'_>, options: &[Arc<ChoiceOption>]) -> Result<Option<usize>, SearchError> {
        let labels = ctx.concrete_labels();
        let chosen = options.iter().position(|o| o.constraint().eval(&labels) == Some(true));

        let rest: Vec<Arc<ChoiceOption>> = options
            .iter()
            .enumerate()
            .filter(|&(i, _)| Some(i) != chosen)
            .map(|(_, o)| o.clone())
            .collect();
        if let Some(i) = chosen {
            ctx.assume_choice_option(&options[i])?;
            debug!("concolic: continue with {} under {}", options[i].id(), labels);
        }
        ctx.enqueue(&rest);
        Ok(chosen)
    }

    fn wants_seed(&self) -> bool {
        true
    }
}
