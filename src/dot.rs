//! Search tree to DOT (Graphviz) conversion.
//!
//! # DOT Format
//!
//! The generated DOT output follows these conventions:
//! - **Choices** are rendered as circles labelled with their node id and,
//!   if tagged, their branch id
//! - **Leaves** are rendered as boxes: path solutions show their value,
//!   fails and exceeded budgets their kind
//! - **Options** are edges from a choice to the option's child, labelled
//!   with the option's constraint
//! - Options without a child (unknown, satisfiable, cut off) end in a small
//!   point node and are drawn dotted
//!
//! # Examples
//!
//! ```
//! use symtree::tree::{SearchTree, TreeConfig};
//!
//! let tree = SearchTree::new(TreeConfig::default()).unwrap();
//! let dot = tree.to_dot().unwrap();
//! assert!(dot.starts_with("digraph {"));
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::BTreeMap;

use crate::node::{NodeKind, OptionState};
use crate::tree::SearchTree;

/// Configuration options for DOT output generation.
///
/// ```
/// use symtree::dot::DotConfig;
///
/// let config = DotConfig {
///     show_constraints: false,
///     ..DotConfig::default()
/// };
/// assert_eq!(config.choice_shape, "circle");
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for choice nodes (default: "circle")
    pub choice_shape: &'static str,
    /// Shape for leaves (default: "box")
    pub leaf_shape: &'static str,
    /// Style for edges of options with a child (default: "solid")
    pub evaluated_edge_style: &'static str,
    /// Style for edges of options without a child (default: "dotted")
    pub pending_edge_style: &'static str,
    /// Label option edges with their constraints (default: true)
    pub show_constraints: bool,
    /// Put nodes of the same depth on the same rank (default: true)
    pub rank_by_depth: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            choice_shape: "circle",
            leaf_shape: "box",
            evaluated_edge_style: "solid",
            pending_edge_style: "dotted",
            show_constraints: true,
            rank_by_depth: true,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl SearchTree {
    /// Converts the search tree to DOT (Graphviz) format.
    ///
    /// Every node of the arena appears in the output, identified as
    /// `n<index>`.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the search tree to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        use std::fmt::Write as _;

        let nodes = self.arena().nodes();
        let options = self.arena().options();

        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.choice_shape)?;

        let mut ranks = BTreeMap::<usize, Vec<String>>::new();
        for node in &nodes {
            let name = format!("n{}", node.id().index());
            let attrs = match node.kind() {
                NodeKind::Choice(choice) => match choice.branch() {
                    Some(branch) => format!("label=\"{}\\n{}\"", node.id(), branch),
                    None => format!("label=\"{}\"", node.id()),
                },
                NodeKind::Fail(fail) => {
                    let kind = if fail.explicitly_failed { "fail" } else { "unsat" };
                    format!("shape={}, label=\"{}\"", config.leaf_shape, kind)
                }
                NodeKind::PathSolution(solution) => {
                    let label = escape(&solution.solution().value.to_string());
                    format!("shape={}, label=\"{}\", peripheries=2", config.leaf_shape, label)
                }
                NodeKind::ExceptionPathSolution(solution) => {
                    let label = escape(&solution.solution().value.to_string());
                    format!("shape={}, label=\"raise {}\"", config.leaf_shape, label)
                }
                NodeKind::ExceededBudget(leaf) => {
                    format!("shape={}, label=\"{}\"", config.leaf_shape, escape(&leaf.budget.to_string()))
                }
            };
            writeln!(dot, "{} [{}];", name, attrs)?;
            ranks.entry(node.depth().get()).or_default().push(name);
        }

        for option in &options {
            let label = if config.show_constraints {
                escape(&option.constraint().to_string())
            } else {
                option.number().to_string()
            };
            let from = option.choice().index();
            match option.child() {
                Some(child) => {
                    writeln!(
                        dot,
                        "n{} -> n{} [style={}, label=\"{}\"];",
                        from,
                        child.index(),
                        config.evaluated_edge_style,
                        label
                    )?;
                }
                None => {
                    let state = match option.state() {
                        OptionState::Unknown => "unknown",
                        OptionState::Satisfiable => "sat",
                        OptionState::CutOff => "cut off",
                        _ => "?",
                    };
                    writeln!(dot, "o{} [shape=point, xlabel=\"{}\"];", option.id().index(), state)?;
                    writeln!(
                        dot,
                        "n{} -> o{} [style={}, label=\"{}\"];",
                        from,
                        option.id().index(),
                        config.pending_edge_style,
                        label
                    )?;
                }
            }
        }

        if config.rank_by_depth {
            for names in ranks.values() {
                writeln!(dot, "{{ rank=same; {} }}", names.join("; "))?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
