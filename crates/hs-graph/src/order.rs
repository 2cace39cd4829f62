//! Evaluation order over the component dependency graph.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use hs_core::CompId;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::Graph;

/// Order in which the scheduler sweeps components.
///
/// Strongly connected groups are placed contiguously and topologically
/// sorted against each other; ties are broken by the lowest component
/// index in each group, and members of a group keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOrder {
    pub order: Vec<CompId>,
    /// Groups that need fixed-point iteration (cycles and self-loops),
    /// members ascending.
    pub cyclic_groups: Vec<Vec<CompId>>,
}

impl EvaluationOrder {
    pub fn compute(graph: &Graph) -> Self {
        let n = graph.components().len();
        let mut deps: DiGraph<CompId, ()> = DiGraph::with_capacity(n, graph.connections().len());
        for info in graph.components() {
            deps.add_node(info.id);
        }

        let mut edges = BTreeSet::new();
        for conn in graph.connections() {
            edges.insert((conn.source_component.index(), conn.target_component.index()));
        }
        for &(from, to) in &edges {
            deps.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }

        let mut groups: Vec<Vec<usize>> = tarjan_scc(&deps)
            .into_iter()
            .map(|scc| {
                let mut members: Vec<usize> = scc.into_iter().map(|n| n.index()).collect();
                members.sort_unstable();
                members
            })
            .collect();
        // Stable group numbering, independent of Tarjan's output order
        groups.sort_unstable_by_key(|g| g[0]);

        let mut group_of = vec![0usize; n];
        for (gi, members) in groups.iter().enumerate() {
            for &m in members {
                group_of[m] = gi;
            }
        }

        // Kahn over the condensation with a min-heap keyed by lowest member
        let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); groups.len()];
        let mut in_degree = vec![0usize; groups.len()];
        let mut self_loop = vec![false; groups.len()];
        for &(from, to) in &edges {
            let (gf, gt) = (group_of[from], group_of[to]);
            if gf == gt {
                self_loop[gf] = true;
            } else if successors[gf].insert(gt) {
                in_degree[gt] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = groups
            .iter()
            .enumerate()
            .filter(|(gi, _)| in_degree[*gi] == 0)
            .map(|(gi, members)| Reverse((members[0], gi)))
            .collect();

        let mut order = Vec::with_capacity(n);
        let mut cyclic_groups = Vec::new();
        while let Some(Reverse((_, gi))) = ready.pop() {
            let members = &groups[gi];
            order.extend(members.iter().map(|&m| CompId::from_index(m)));
            if members.len() > 1 || self_loop[gi] {
                cyclic_groups.push(members.iter().map(|&m| CompId::from_index(m)).collect());
            }
            for &next in &successors[gi] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse((groups[next][0], next)));
                }
            }
        }

        Self {
            order,
            cyclic_groups,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn has_cycles(&self) -> bool {
        !self.cyclic_groups.is_empty()
    }
}
