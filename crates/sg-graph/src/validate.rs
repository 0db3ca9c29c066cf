//! Graph validation
//!
//! Shape checks that are reported, never enforced: acyclicity, weakly
//! connected components, and orphaned nodes.

use std::collections::{HashMap, HashSet};

use petgraph::algo::{connected_components, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::node::{Graph, NodeId};

/// Result of validating a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_acyclic: bool,
    /// Weakly connected components
    pub component_count: usize,
    /// Nodes with neither incoming nor outgoing edges
    pub orphan_node_ids: Vec<NodeId>,
}

impl ValidationReport {
    pub fn is_weakly_connected(&self) -> bool {
        self.component_count <= 1
    }
}

/// Build a compact petgraph view of `graph`
fn to_digraph(graph: &Graph) -> DiGraph<NodeId, ()> {
    let mut g = DiGraph::with_capacity(graph.nodes.len(), graph.edges.len());
    let mut index: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        index.insert(node.id, g.add_node(node.id));
    }
    for edge in &graph.edges {
        if let (Some(&a), Some(&b)) = (index.get(&edge.source), index.get(&edge.target)) {
            g.add_edge(a, b, ());
        }
    }
    g
}

/// Validate the shape of `graph`, logging what is found
pub fn validate(graph: &Graph) -> ValidationReport {
    let g = to_digraph(graph);

    let is_acyclic = !is_cyclic_directed(&g);
    if is_acyclic {
        tracing::info!("Graph is a Directed Acyclic Graph (DAG).");
    } else {
        tracing::warn!("Graph contains cycles.");
    }

    // Undirected connectivity over a directed graph = weak components
    let component_count = connected_components(&g);
    if component_count > 1 {
        tracing::warn!("Graph has {} weakly connected components.", component_count);
    }

    let touched: HashSet<NodeId> = graph.edges.iter().flat_map(|e| [e.source, e.target]).collect();
    let orphan_node_ids: Vec<NodeId> = graph
        .nodes
        .iter()
        .map(|n| n.id)
        .filter(|id| !touched.contains(id))
        .collect();
    if !orphan_node_ids.is_empty() {
        tracing::warn!("Found {} orphaned nodes in the graph.", orphan_node_ids.len());
    }

    ValidationReport { is_acyclic, component_count, orphan_node_ids }
}
