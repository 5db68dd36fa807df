//! The control flow graph: statement-valued nodes and labeled directed
//! edges.
//!
//! Nodes wrap either an AST statement node or the exit sentinel (`None`). The
//! graph is a map from wrapped value to node — a value is never represented
//! by two nodes — and edge insertion is idempotent, which keeps rebuilt
//! graphs byte-identical.

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use crate::ast::NodeId;

/// The value a CFG node wraps: a statement node, or `None` for the exit of
/// the program (and of every function body).
pub type CfgValue = Option<NodeId>;

/// Branch kind of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// Taken when the wrapped condition evaluates to true.
    True,
    /// Taken when the wrapped condition evaluates to false.
    False,
    /// Always taken.
    Unconditional,
    /// Taken when evaluation throws.
    Exception,
}

impl Branch {
    pub fn as_str(self) -> &'static str {
        match self {
            Branch::True => "True",
            Branch::False => "False",
            Branch::Unconditional => "Unconditional",
            Branch::Exception => "Exception",
        }
    }
}

/// A directed, labeled edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: CfgValue,
    pub branch: Branch,
    pub to: CfgValue,
}

/// A node: the wrapped value plus its outgoing and incoming edges.
#[derive(Debug, Clone, Default)]
pub struct CfgNode {
    pub value: CfgValue,
    pub successors: SmallVec<[Edge; 2]>,
    pub predecessors: SmallVec<[Edge; 2]>,
}

impl CfgNode {
    fn new(value: CfgValue) -> Self {
        Self {
            value,
            successors: SmallVec::new(),
            predecessors: SmallVec::new(),
        }
    }

    /// True if this node is a successor of `other` (with the given branch
    /// kind, when one is required).
    pub fn is_successor_of(&self, other: &CfgNode, branch: Option<Branch>) -> bool {
        other.successors.iter().any(|edge| {
            edge.to == self.value && branch.map_or(true, |required| required == edge.branch)
        })
    }
}

/// Control flow graph over statement nodes.
#[derive(Debug, Default)]
pub struct ControlFlowGraph {
    nodes: IndexMap<CfgValue, CfgNode>,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The node wrapping `value`, if present.
    pub fn node(&self, value: CfgValue) -> Option<&CfgNode> {
        self.nodes.get(&value)
    }

    /// All nodes, in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &CfgNode> + '_ {
        self.nodes.values()
    }

    /// All edges, grouped by source node in creation order.
    pub fn edges(&self) -> Vec<Edge> {
        self.nodes
            .values()
            .flat_map(|node| node.successors.iter().copied())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Creates (or returns) the node for `value`.
    pub fn create_node(&mut self, value: CfgValue) -> CfgValue {
        self.nodes
            .entry(value)
            .or_insert_with(|| CfgNode::new(value));
        value
    }

    /// Connects `from` to `to` with the given branch kind. Inserting an edge
    /// that already exists leaves the graph unchanged.
    pub fn connect_if_not_found(&mut self, from: CfgValue, branch: Branch, to: CfgValue) {
        self.create_node(from);
        self.create_node(to);

        if self.is_connected(from, to, Some(branch)) {
            return;
        }

        let edge = Edge { from, branch, to };
        self.nodes[&from].successors.push(edge);
        self.nodes[&to].predecessors.push(edge);
    }

    /// True if an edge `from → to` exists (with the given branch kind, when
    /// one is required).
    pub fn is_connected(&self, from: CfgValue, to: CfgValue, branch: Option<Branch>) -> bool {
        let Some(from_node) = self.nodes.get(&from) else {
            return false;
        };
        from_node.successors.iter().any(|edge| {
            edge.to == to && branch.map_or(true, |required| required == edge.branch)
        })
    }

    /// All nodes reachable from `from` up to and including the exit node, in
    /// control-flow order, each node once (back edges are not followed
    /// twice).
    pub fn nodes_to_exit(&self, from: CfgValue) -> Vec<CfgValue> {
        let mut visited: IndexSet<CfgValue> = IndexSet::new();
        let mut stack = vec![from];

        while let Some(value) = stack.pop() {
            if !visited.insert(value) {
                continue;
            }
            if let Some(node) = self.nodes.get(&value) {
                // Push in reverse so the first successor is visited first.
                for edge in node.successors.iter().rev() {
                    if !visited.contains(&edge.to) {
                        stack.push(edge.to);
                    }
                }
            }
        }

        visited.into_iter().collect()
    }

    /// The edges that leave the region reachable from `from` into the exit
    /// node.
    pub fn exit_edges(&self, from: CfgValue) -> Vec<Edge> {
        let mut out = Vec::new();
        for value in self.nodes_to_exit(from) {
            if let Some(node) = self.nodes.get(&value) {
                for edge in &node.successors {
                    if edge.to.is_none() {
                        out.push(*edge);
                    }
                }
            }
        }
        out
    }
}
