//! Generic work-list data flow analysis over a control flow graph.
//!
//! The solver is abstract over the lattice: implementors supply the empty
//! element, the transfer function, the join of branch states, and state
//! equality. Transfer is fallible so an analysis can abort the fixpoint on
//! the first hard error.

use std::collections::VecDeque;

use fnv::FnvHashSet;
use indexmap::IndexMap;
use tracing::debug;

use crate::cfg::{CfgValue, ControlFlowGraph};

/// A forward data flow analysis over lattice values of type `Lattice`.
pub trait DataFlowAnalysis {
    type Lattice: Clone;
    type Error;

    /// The empty lattice element used to initialize in and out states.
    fn empty_lattice(&self) -> Self::Lattice;

    /// The out state of `node` given its in state.
    fn transfer(&self, node: CfgValue, in_state: Self::Lattice)
        -> Result<Self::Lattice, Self::Error>;

    /// Joins the out states of multiple predecessors into the in state of
    /// `node`. Only called with at least two states; a single predecessor
    /// passes its state through unchanged.
    fn join_branches(
        &self,
        head: Self::Lattice,
        tail: Vec<Self::Lattice>,
        node: CfgValue,
    ) -> Result<Self::Lattice, Self::Error>;

    /// Whether two states are equal; the fixpoint terminates when no
    /// transfer changes its node's out state.
    fn states_equal(&self, first: &Self::Lattice, second: &Self::Lattice) -> bool;
}

/// Work-list fixpoint driver.
pub struct WorkListSolver;

impl WorkListSolver {
    /// Runs `analysis` over `cfg` and returns the out state of every visited
    /// node. With a start node the work list is seeded with the nodes
    /// reachable from it (to the exit); otherwise every node participates.
    pub fn solve<A: DataFlowAnalysis>(
        analysis: &A,
        cfg: &ControlFlowGraph,
        start: Option<CfgValue>,
    ) -> Result<IndexMap<CfgValue, A::Lattice>, A::Error> {
        let initial: Vec<CfgValue> = match start {
            Some(node) => cfg.nodes_to_exit(node),
            None => cfg.nodes().map(|node| node.value).collect(),
        };

        let mut work_list: VecDeque<CfgValue> = initial.into_iter().collect();
        let mut queued: FnvHashSet<CfgValue> = work_list.iter().copied().collect();
        let mut out_states: IndexMap<CfgValue, A::Lattice> = IndexMap::new();

        let mut iterations = 0usize;
        while let Some(node) = work_list.pop_front() {
            queued.remove(&node);
            iterations += 1;

            let in_state = Self::join_predecessors(analysis, cfg, node, &out_states)?;
            let out_state = analysis.transfer(node, in_state)?;

            let changed = match out_states.get(&node) {
                Some(previous) => !analysis.states_equal(previous, &out_state),
                None => true,
            };
            out_states.insert(node, out_state);

            if changed {
                if let Some(cfg_node) = cfg.node(node) {
                    for edge in &cfg_node.successors {
                        if queued.insert(edge.to) {
                            work_list.push_back(edge.to);
                        }
                    }
                }
            }
        }

        debug!(iterations, states = out_states.len(), "fixpoint reached");
        Ok(out_states)
    }

    fn join_predecessors<A: DataFlowAnalysis>(
        analysis: &A,
        cfg: &ControlFlowGraph,
        node: CfgValue,
        out_states: &IndexMap<CfgValue, A::Lattice>,
    ) -> Result<A::Lattice, A::Error> {
        let mut incoming: Vec<A::Lattice> = Vec::new();
        if let Some(cfg_node) = cfg.node(node) {
            for edge in &cfg_node.predecessors {
                if let Some(state) = out_states.get(&edge.from) {
                    incoming.push(state.clone());
                }
            }
        }

        let mut states = incoming.into_iter();
        match states.next() {
            None => Ok(analysis.empty_lattice()),
            Some(head) => {
                let tail: Vec<A::Lattice> = states.collect();
                if tail.is_empty() {
                    // Single known predecessor: pass its state through.
                    Ok(head)
                } else {
                    analysis.join_branches(head, tail, node)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeId;
    use crate::cfg::Branch;
    use std::collections::BTreeSet;
    use std::convert::Infallible;

    /// Reachability: every node collects the ids seen on some path to it.
    struct Reaching;

    impl DataFlowAnalysis for Reaching {
        type Lattice = BTreeSet<u32>;
        type Error = Infallible;

        fn empty_lattice(&self) -> Self::Lattice {
            BTreeSet::new()
        }

        fn transfer(
            &self,
            node: CfgValue,
            mut in_state: Self::Lattice,
        ) -> Result<Self::Lattice, Self::Error> {
            if let Some(id) = node {
                in_state.insert(id.0);
            }
            Ok(in_state)
        }

        fn join_branches(
            &self,
            mut head: Self::Lattice,
            tail: Vec<Self::Lattice>,
            _node: CfgValue,
        ) -> Result<Self::Lattice, Self::Error> {
            for state in tail {
                head.extend(state);
            }
            Ok(head)
        }

        fn states_equal(&self, first: &Self::Lattice, second: &Self::Lattice) -> bool {
            first == second
        }
    }

    fn value(n: u32) -> CfgValue {
        Some(NodeId(n))
    }

    #[test]
    fn test_straight_line_fixpoint() {
        let mut cfg = ControlFlowGraph::new();
        cfg.connect_if_not_found(value(1), Branch::Unconditional, value(2));
        cfg.connect_if_not_found(value(2), Branch::Unconditional, None);

        let result = WorkListSolver::solve(&Reaching, &cfg, Some(value(1))).unwrap();

        assert_eq!(result[&None], BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_back_edge_terminates() {
        // 1 -> 2 -> 1 (back edge), 1 -> exit
        let mut cfg = ControlFlowGraph::new();
        cfg.connect_if_not_found(value(1), Branch::True, value(2));
        cfg.connect_if_not_found(value(2), Branch::Unconditional, value(1));
        cfg.connect_if_not_found(value(1), Branch::False, None);

        let result = WorkListSolver::solve(&Reaching, &cfg, Some(value(1))).unwrap();

        // The loop body contributes to the exit state through the back edge.
        assert_eq!(result[&None], BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_branch_join() {
        // 1 -> 2, 1 -> 3, both -> exit
        let mut cfg = ControlFlowGraph::new();
        cfg.connect_if_not_found(value(1), Branch::True, value(2));
        cfg.connect_if_not_found(value(1), Branch::False, value(3));
        cfg.connect_if_not_found(value(2), Branch::Unconditional, None);
        cfg.connect_if_not_found(value(3), Branch::Unconditional, None);

        let result = WorkListSolver::solve(&Reaching, &cfg, Some(value(1))).unwrap();

        assert_eq!(result[&None], BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn test_start_limits_the_scope() {
        let mut cfg = ControlFlowGraph::new();
        cfg.connect_if_not_found(value(1), Branch::Unconditional, value(2));
        cfg.connect_if_not_found(value(2), Branch::Unconditional, None);
        cfg.connect_if_not_found(value(9), Branch::Unconditional, value(1));

        let result = WorkListSolver::solve(&Reaching, &cfg, Some(value(1))).unwrap();

        assert!(!result.contains_key(&value(9)));
    }
}
