//! Learning-path gating.
//!
//! Nodes are evaluated in prerequisite order: a node is unlocked once the user has
//! enough XP and every prerequisite is completed. Server-side completion always wins.

use std::collections::{btree_set, BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Error types for learning-path configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// Prerequisites loop back on themselves
    #[error("Prerequisite cycle among nodes: {}", node_ids.join(", "))]
    PrerequisiteCycle { node_ids: Vec<String> },

    /// A node names a prerequisite that is not part of the path
    #[error("Node {node_id} requires unknown node {prerequisite_id}")]
    UnknownPrerequisite {
        node_id: String,
        prerequisite_id: String,
    },

    /// Two nodes share an id
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),
}

/// A single learning unit within a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct LearningPathNode {
    pub id: String,
    #[serde(default)]
    pub xp_required: u64,
    #[serde(default)]
    pub prerequisite_node_ids: BTreeSet<String>,
    #[serde(default)]
    pub is_completed: bool,
}

impl LearningPathNode {
    pub fn new(id: impl Into<String>, xp_required: u64) -> Self {
        Self {
            id: id.into(),
            xp_required,
            prerequisite_node_ids: BTreeSet::new(),
            is_completed: false,
        }
    }

    /// Add a prerequisite node.
    pub fn requires(mut self, node_id: impl Into<String>) -> Self {
        self.prerequisite_node_ids.insert(node_id.into());
        self
    }

    /// Mark as completed on the server.
    pub fn completed(mut self) -> Self {
        self.is_completed = true;
        self
    }
}

/// Gating status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum NodeUnlockState {
    Locked,
    Unlocked,
    Completed,
}

/// Aggregate counts over an evaluated path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct PathProgress {
    pub total: usize,
    pub completed: usize,
    pub unlocked: usize,
    pub locked: usize,
    pub completion_percentage: f64,
}

/// Compute the unlock state of every node in a path.
pub fn evaluate_nodes(
    nodes: &[LearningPathNode],
    total_xp: u64,
) -> Result<BTreeMap<String, NodeUnlockState>, ConfigurationError> {
    let order = topological_order(nodes)?;
    let mut states = BTreeMap::new();

    for node in order {
        let state = if node.is_completed {
            NodeUnlockState::Completed
        } else if total_xp >= node.xp_required
            && node
                .prerequisite_node_ids
                .iter()
                .all(|id| states.get(id) == Some(&NodeUnlockState::Completed))
        {
            NodeUnlockState::Unlocked
        } else {
            NodeUnlockState::Locked
        };
        states.insert(node.id.clone(), state);
    }

    debug!(nodes = nodes.len(), total_xp, "Evaluated learning path");
    Ok(states)
}

/// Summarize an evaluated path.
pub fn summarize_path(states: &BTreeMap<String, NodeUnlockState>) -> PathProgress {
    let mut progress = PathProgress {
        total: states.len(),
        ..Default::default()
    };

    for state in states.values() {
        match state {
            NodeUnlockState::Completed => progress.completed += 1,
            NodeUnlockState::Unlocked => progress.unlocked += 1,
            NodeUnlockState::Locked => progress.locked += 1,
        }
    }

    if progress.total > 0 {
        progress.completion_percentage =
            progress.completed as f64 / progress.total as f64 * 100.0;
    }

    progress
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first walk that emits prerequisites before their dependents.
///
/// The walk keeps its own stack so path depth is bounded by the heap, not the
/// thread stack.
struct Walker<'a> {
    index: HashMap<&'a str, &'a LearningPathNode>,
    marks: HashMap<&'a str, Mark>,
    order: Vec<&'a LearningPathNode>,
}

/// A node being visited and the prerequisites not yet walked.
type Frame<'a> = (&'a LearningPathNode, btree_set::Iter<'a, String>);

impl<'a> Walker<'a> {
    fn visit(&mut self, root: &'a LearningPathNode) -> Result<(), ConfigurationError> {
        if self.marks.contains_key(root.id.as_str()) {
            return Ok(());
        }

        let mut stack: Vec<Frame<'a>> = Vec::new();
        self.marks.insert(root.id.as_str(), Mark::Visiting);
        stack.push((root, root.prerequisite_node_ids.iter()));

        while let Some((node, prerequisites)) = stack.last_mut() {
            let node = *node;
            let Some(prerequisite_id) = prerequisites.next() else {
                stack.pop();
                self.marks.insert(node.id.as_str(), Mark::Done);
                self.order.push(node);
                continue;
            };

            let Some(prerequisite) = self.index.get(prerequisite_id.as_str()).copied() else {
                warn!(
                    node_id = %node.id,
                    prerequisite_id = %prerequisite_id,
                    "Unknown prerequisite in learning path"
                );
                return Err(ConfigurationError::UnknownPrerequisite {
                    node_id: node.id.clone(),
                    prerequisite_id: prerequisite_id.clone(),
                });
            };

            match self.marks.get(prerequisite.id.as_str()) {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => return Err(cycle_error(&stack, prerequisite)),
                None => {
                    self.marks.insert(prerequisite.id.as_str(), Mark::Visiting);
                    stack.push((prerequisite, prerequisite.prerequisite_node_ids.iter()));
                }
            }
        }

        Ok(())
    }
}

/// The cycle closed by reaching `repeated` again, in walk order.
fn cycle_error(stack: &[Frame<'_>], repeated: &LearningPathNode) -> ConfigurationError {
    let start = stack
        .iter()
        .position(|(node, _)| node.id == repeated.id)
        .unwrap_or(0);
    let node_ids: Vec<String> = stack[start..]
        .iter()
        .map(|(node, _)| node.id.clone())
        .collect();
    warn!(nodes = ?node_ids, "Prerequisite cycle in learning path");
    ConfigurationError::PrerequisiteCycle { node_ids }
}

fn topological_order(
    nodes: &[LearningPathNode],
) -> Result<Vec<&LearningPathNode>, ConfigurationError> {
    let mut index = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if index.insert(node.id.as_str(), node).is_some() {
            return Err(ConfigurationError::DuplicateNode(node.id.clone()));
        }
    }

    let mut walker = Walker {
        index,
        marks: HashMap::with_capacity(nodes.len()),
        order: Vec::with_capacity(nodes.len()),
    };

    for node in nodes {
        walker.visit(node)?;
    }

    Ok(walker.order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<LearningPathNode> {
        vec![
            LearningPathNode::new("a", 0),
            LearningPathNode::new("b", 100).requires("a"),
            LearningPathNode::new("c", 200).requires("b"),
        ]
    }

    #[test]
    fn test_chain_nothing_completed() {
        let states = evaluate_nodes(&chain(), 1_000).unwrap();
        assert_eq!(states["a"], NodeUnlockState::Unlocked);
        assert_eq!(states["b"], NodeUnlockState::Locked);
        assert_eq!(states["c"], NodeUnlockState::Locked);
    }

    #[test]
    fn test_chain_first_completed() {
        let mut nodes = chain();
        nodes[0].is_completed = true;

        let states = evaluate_nodes(&nodes, 1_000).unwrap();
        assert_eq!(states["a"], NodeUnlockState::Completed);
        assert_eq!(states["b"], NodeUnlockState::Unlocked);
        assert_eq!(states["c"], NodeUnlockState::Locked);
    }

    #[test]
    fn test_unordered_input() {
        let mut nodes = chain();
        nodes.reverse();
        nodes[2].is_completed = true; // "a"
        nodes[1].is_completed = true; // "b"

        let states = evaluate_nodes(&nodes, 1_000).unwrap();
        assert_eq!(states["c"], NodeUnlockState::Unlocked);
    }

    #[test]
    fn test_xp_gate() {
        let nodes = vec![
            LearningPathNode::new("a", 0).completed(),
            LearningPathNode::new("b", 100).requires("a"),
        ];

        let states = evaluate_nodes(&nodes, 99).unwrap();
        assert_eq!(states["b"], NodeUnlockState::Locked);

        let states = evaluate_nodes(&nodes, 100).unwrap();
        assert_eq!(states["b"], NodeUnlockState::Unlocked);
    }

    #[test]
    fn test_entry_point_always_unlocked() {
        let states = evaluate_nodes(&[LearningPathNode::new("start", 0)], 0).unwrap();
        assert_eq!(states["start"], NodeUnlockState::Unlocked);
    }

    #[test]
    fn test_completed_overrides_gates() {
        let nodes = vec![
            LearningPathNode::new("a", 0),
            LearningPathNode::new("b", 5_000).requires("a").completed(),
        ];
        let states = evaluate_nodes(&nodes, 0).unwrap();
        assert_eq!(states["b"], NodeUnlockState::Completed);
    }

    #[test]
    fn test_mutual_cycle() {
        let nodes = vec![
            LearningPathNode::new("x", 0).requires("y"),
            LearningPathNode::new("y", 0).requires("x"),
        ];

        match evaluate_nodes(&nodes, 0) {
            Err(ConfigurationError::PrerequisiteCycle { node_ids }) => {
                assert_eq!(node_ids, vec!["x".to_string(), "y".to_string()]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_excludes_bystanders() {
        let nodes = vec![
            LearningPathNode::new("entry", 0),
            LearningPathNode::new("p", 0).requires("entry").requires("q"),
            LearningPathNode::new("q", 0).requires("r"),
            LearningPathNode::new("r", 0).requires("p"),
        ];

        let err = evaluate_nodes(&nodes, 0).unwrap_err();
        let ConfigurationError::PrerequisiteCycle { mut node_ids } = err else {
            panic!("expected cycle");
        };
        node_ids.sort();
        assert_eq!(node_ids, vec!["p", "q", "r"]);
    }

    #[test]
    fn test_self_prerequisite() {
        let nodes = vec![LearningPathNode::new("loop", 0).requires("loop")];
        let err = evaluate_nodes(&nodes, 0).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::PrerequisiteCycle {
                node_ids: vec!["loop".to_string()]
            }
        );
    }

    #[test]
    fn test_unknown_prerequisite() {
        let nodes = vec![LearningPathNode::new("a", 0).requires("ghost")];
        let err = evaluate_nodes(&nodes, 0).unwrap_err();
        assert_eq!(err.to_string(), "Node a requires unknown node ghost");
    }

    #[test]
    fn test_duplicate_node() {
        let nodes = vec![LearningPathNode::new("a", 0), LearningPathNode::new("a", 10)];
        assert_eq!(
            evaluate_nodes(&nodes, 0).unwrap_err(),
            ConfigurationError::DuplicateNode("a".to_string())
        );
    }

    #[test]
    fn test_long_chain() {
        let length = 10_000;
        let mut nodes: Vec<LearningPathNode> = (0..length)
            .map(|i| {
                let node = LearningPathNode::new(format!("n{i}"), 0);
                if i == 0 {
                    node.completed()
                } else {
                    node.requires(format!("n{}", i - 1))
                }
            })
            .collect();
        nodes.reverse();

        let states = evaluate_nodes(&nodes, 0).unwrap();
        assert_eq!(states.len(), length);
        assert_eq!(states["n0"], NodeUnlockState::Completed);
        assert_eq!(states["n1"], NodeUnlockState::Unlocked);
        assert_eq!(states["n2"], NodeUnlockState::Locked);
        assert_eq!(states[&format!("n{}", length - 1)], NodeUnlockState::Locked);
    }

    #[test]
    fn test_long_cycle() {
        let length = 10_000;
        let nodes: Vec<LearningPathNode> = (0..length)
            .map(|i| {
                LearningPathNode::new(format!("n{i}"), 0).requires(format!("n{}", (i + 1) % length))
            })
            .collect();

        let err = evaluate_nodes(&nodes, 0).unwrap_err();
        let ConfigurationError::PrerequisiteCycle { node_ids } = err else {
            panic!("expected cycle");
        };
        assert_eq!(node_ids.len(), length);
        assert_eq!(node_ids[0], "n0");
    }

    #[test]
    fn test_summarize_path() {
        let mut nodes = chain();
        nodes[0].is_completed = true;
        let states = evaluate_nodes(&nodes, 1_000).unwrap();

        let progress = summarize_path(&states);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.unlocked, 1);
        assert_eq!(progress.locked, 1);
        assert!((progress.completion_percentage - 33.333).abs() < 0.01);

        assert_eq!(summarize_path(&BTreeMap::new()).completion_percentage, 0.0);
    }
}
