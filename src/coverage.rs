//! Branch coverage over the program's control-flow graph.
//!
//! Every source-level branch point carries a stable [`BranchId`]. The
//! [`CoverageCfg`] tracks, per id, whether the true edge and the false edge
//! have been taken by some completed run, and which choices of the search
//! tree were created at that branch point (a branch point reached along
//! several paths yields several choices).
//!
//! Decisions of a run are collected in a per-run [`Trail`] owned by the
//! execution context and committed with [`CoverageCfg::manifest_trail`]
//! once the run completes. Runs aborted by a budget are never manifested.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::error::{ConfigError, SearchError};
use crate::node::{ChoiceOption, OptionState};
use crate::tree::SearchTree;
use crate::types::{BranchId, NodeId};

/// Coverage-related modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageConfig {
    /// Prefer frontier options leading to uncovered edges.
    pub guide_frontier: bool,
    /// Stop the search once every edge is covered.
    pub terminate_on_full_coverage: bool,
}

/// Coverage of one branch point, derived from its two edge flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverageState {
    BothUncovered,
    TrueOnly,
    FalseOnly,
    AllCovered,
}

/// A branch point of the control-flow graph.
#[derive(Debug, Clone, Default)]
pub struct CfgNode {
    pub true_covered: bool,
    pub false_covered: bool,
    /// Choices created at this branch point.
    pub choices: Vec<NodeId>,
}

impl CfgNode {
    pub fn state(&self) -> CoverageState {
        match (self.true_covered, self.false_covered) {
            (false, false) => CoverageState::BothUncovered,
            (true, false) => CoverageState::TrueOnly,
            (false, true) => CoverageState::FalseOnly,
            (true, true) => CoverageState::AllCovered,
        }
    }

    pub fn is_fully_covered(&self) -> bool {
        self.true_covered && self.false_covered
    }

    fn cover(&mut self, decision: bool) {
        if decision {
            self.true_covered = true;
        } else {
            self.false_covered = true;
        }
    }
}

/// Decisions taken during one run, in order.
#[derive(Debug, Clone, Default)]
pub struct Trail {
    entries: Vec<(BranchId, bool)>,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: BranchId, decision: bool) {
        self.entries.push((id, decision));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BranchId, bool)> + '_ {
        self.entries.iter().copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug)]
pub struct CoverageCfg {
    config: CoverageConfig,
    id_to_node: Mutex<HashMap<BranchId, CfgNode>>,
    nodes_with_uncovered_edges: Mutex<BTreeSet<BranchId>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CoverageCfg {
    /// Create the graph for the given branch points, all uncovered.
    pub fn new(ids: impl IntoIterator<Item = BranchId>, config: CoverageConfig) -> Self {
        let mut id_to_node = HashMap::new();
        let mut uncovered = BTreeSet::new();
        for id in ids {
            id_to_node.insert(id, CfgNode::default());
            uncovered.insert(id);
        }
        Self {
            config,
            id_to_node: Mutex::new(id_to_node),
            nodes_with_uncovered_edges: Mutex::new(uncovered),
        }
    }

    pub fn config(&self) -> CoverageConfig {
        self.config
    }

    /// Number of known branch points.
    pub fn len(&self) -> usize {
        lock(&self.id_to_node).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.id_to_node).is_empty()
    }

    pub fn node(&self, id: BranchId) -> Option<CfgNode> {
        lock(&self.id_to_node).get(&id).cloned()
    }

    pub fn state(&self, id: BranchId) -> Option<CoverageState> {
        lock(&self.id_to_node).get(&id).map(CfgNode::state)
    }

    /// Branch points with at least one uncovered edge, in id order.
    pub fn nodes_with_uncovered_edges(&self) -> Vec<BranchId> {
        lock(&self.nodes_with_uncovered_edges).iter().copied().collect()
    }

    /// Record that `choice` was created at branch point `id`.
    ///
    /// Branch points not declared up front are added on first sight.
    pub fn register_choice(&self, id: BranchId, choice: NodeId) {
        let mut nodes = lock(&self.id_to_node);
        let node = nodes.entry(id).or_insert_with(|| {
            lock(&self.nodes_with_uncovered_edges).insert(id);
            CfgNode::default()
        });
        node.choices.push(choice);
    }

    /// Commit the decisions of a completed run.
    ///
    /// An id leaves the uncovered set only when this manifestation completed
    /// its coverage. Returns the number of ids that became fully covered.
    pub fn manifest_trail(&self, trail: &Trail) -> usize {
        let mut nodes = lock(&self.id_to_node);
        let mut completed = vec![];
        for (id, decision) in trail.iter() {
            let node = nodes.entry(id).or_insert_with(|| {
                lock(&self.nodes_with_uncovered_edges).insert(id);
                CfgNode::default()
            });
            let before = node.is_fully_covered();
            node.cover(decision);
            if !before && node.is_fully_covered() {
                completed.push(id);
            }
        }
        drop(nodes);

        if !completed.is_empty() {
            let mut uncovered = lock(&self.nodes_with_uncovered_edges);
            for id in &completed {
                uncovered.remove(id);
                debug!("branch {} is fully covered", id);
            }
        }
        completed.len()
    }

    /// Unevaluated options of registered choices whose edge is still
    /// uncovered. For a binary choice option 0 is the true edge and option 1
    /// the false edge.
    pub fn get_choice_options_leading_to_uncovered_edges(
        &self,
        tree: &SearchTree,
    ) -> Result<Vec<Arc<ChoiceOption>>, SearchError> {
        if !self.config.guide_frontier {
            return Err(ConfigError::CoverageGuidanceDisabled.into());
        }
        let targets: Vec<(NodeId, bool, bool)> = {
            let nodes = lock(&self.id_to_node);
            let uncovered = lock(&self.nodes_with_uncovered_edges);
            uncovered
                .iter()
                .filter_map(|id| nodes.get(id))
                .flat_map(|node| node.choices.iter().map(|&c| (c, !node.true_covered, !node.false_covered)))
                .collect()
        };

        let mut result = vec![];
        for (choice, want_true, want_false) in targets {
            let options = tree.arena().choice_options(choice)?;
            if options.len() != 2 {
                continue;
            }
            for (option, wanted) in options.into_iter().zip([want_true, want_false]) {
                if wanted && matches!(option.state(), OptionState::Unknown | OptionState::Satisfiable) {
                    result.push(option);
                }
            }
        }
        Ok(result)
    }

    /// Whether every edge of every known branch point is covered.
    pub fn full_coverage_achieved(&self) -> Result<bool, ConfigError> {
        if !self.config.terminate_on_full_coverage {
            return Err(ConfigError::FullCoverageTerminationDisabled);
        }
        Ok(lock(&self.nodes_with_uncovered_edges).is_empty())
    }
}
