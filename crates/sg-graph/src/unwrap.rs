//! Unwrapper - remove wrapper `div`s and bridge their neighborhoods
//!
//! A wrapper is a `div` tag whose attributes satisfy any configured
//! predicate. Each wrapper is removed and every predecessor is connected
//! straight to every successor with a `rewired` edge. Removal runs in
//! topological order over one evolving copy of the graph, so wrappers nested
//! in wrappers bridge to the right place. A rewired edge keeps the order of
//! the edge into the outermost removed wrapper, and `inner_order` lists the
//! order of every hop below it, so children of different wrappers stay
//! distinct. Attribute records that only removed wrappers used are dropped
//! from the content store afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use sg_html::{AttrValue, AttributeMap};

use crate::content::{ContentKind, ContentStore};
use crate::node::{Edge, EdgeKey, Graph, NodeId};
use crate::validate::{ValidationReport, validate};

/// Tag name eligible for unwrapping
pub const WRAPPER_TAG: &str = "div";

/// Required value of one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expected {
    /// Scalar attribute, exact match
    Exact(String),
    /// Token-list attribute, matched as an unordered set
    Set(Vec<String>),
}

impl Expected {
    fn matches(&self, value: &AttrValue) -> bool {
        match self {
            Expected::Exact(s) => value.as_str() == Some(s.as_str()),
            Expected::Set(items) => {
                let want: HashSet<&str> = items.iter().map(String::as_str).collect();
                let have: HashSet<&str> = value.tokens().into_iter().collect();
                want == have
            }
        }
    }
}

/// Map of attribute name to required value; satisfied when all keys match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributePredicate(BTreeMap<String, Expected>);

impl AttributePredicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `name` to equal `value`
    pub fn exact(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), Expected::Exact(value.to_string()));
        self
    }

    /// Require the tokens of `name` to be exactly `values`, in any order
    pub fn set(mut self, name: &str, values: &[&str]) -> Self {
        self.0.insert(name.to_string(), Expected::Set(values.iter().map(|v| v.to_string()).collect()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, attributes: &AttributeMap) -> bool {
        self.0
            .iter()
            .all(|(name, expected)| attributes.get(name).is_some_and(|v| expected.matches(v)))
    }
}

/// Output of one unwrap pass
#[derive(Debug, Clone)]
pub struct UnwrapOutcome {
    pub graph: Graph,
    pub content: ContentStore,
    pub report: ValidationReport,
    /// Removed wrappers, in removal order
    pub removed: Vec<NodeId>,
    pub rewired_edges: usize,
    pub removed_attributes: usize,
}

/// Wrapper remover
#[derive(Debug, Clone, Default)]
pub struct Unwrapper {
    targets: Vec<AttributePredicate>,
}

impl Unwrapper {
    pub fn new(targets: Vec<AttributePredicate>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[AttributePredicate] {
        &self.targets
    }

    /// Wrapper tags in `graph`, ascending by id
    pub fn find_wrappers(&self, graph: &Graph, store: &ContentStore) -> Vec<NodeId> {
        let found: Vec<NodeId> = graph
            .nodes
            .iter()
            .filter(|node| node.tag_name() == Some(WRAPPER_TAG))
            .filter(|node| {
                let Some(attributes) = node.attributes_ref().and_then(|a| store.attributes(a)) else {
                    return false;
                };
                match self.targets.iter().find(|t| t.matches(attributes)) {
                    Some(target) => {
                        tracing::debug!("Node {} matched target attributes: {:?}", node.id, target);
                        true
                    }
                    None => false,
                }
            })
            .map(|node| node.id)
            .collect();
        tracing::info!("Identified {} nodes matching target attributes.", found.len());
        found
    }

    /// Remove wrappers from a copy of `graph` and filter a copy of `store`
    pub fn unwrap(&self, graph: &Graph, store: &ContentStore) -> UnwrapOutcome {
        tracing::info!("Starting the unwrapping process.");
        let wrappers: HashSet<NodeId> = self.find_wrappers(graph, store).into_iter().collect();

        let mut working: StableDiGraph<NodeId, Edge> =
            StableDiGraph::with_capacity(graph.nodes.len(), graph.edges.len());
        let mut index: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            index.insert(node.id, working.add_node(node.id));
        }
        let mut edge_keys: HashSet<EdgeKey> = HashSet::with_capacity(graph.edges.len());
        for edge in &graph.edges {
            if let (Some(&a), Some(&b)) = (index.get(&edge.source), index.get(&edge.target)) {
                working.add_edge(a, b, edge.clone());
                edge_keys.insert(edge.key());
            }
        }

        let order = removal_order(&working, &wrappers);
        tracing::info!("Total nodes to unwrap: {}", order.len());

        let mut removed = Vec::with_capacity(order.len());
        let mut rewired_edges = 0;
        for id in order {
            let Some(&idx) = index.get(&id).filter(|idx| working.contains_node(**idx)) else {
                tracing::warn!("Node {} not found in graph during rewiring. Skipping.", id);
                continue;
            };

            let incoming: Vec<(NodeIndex, Edge)> = working
                .edges_directed(idx, Direction::Incoming)
                .map(|e| (e.source(), e.weight().clone()))
                .collect();
            let outgoing: Vec<(NodeIndex, Edge)> = working
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| (e.target(), e.weight().clone()))
                .collect();

            for (pred, in_edge) in &incoming {
                for (succ, out_edge) in &outgoing {
                    let mut inner_order = in_edge.inner_order.clone();
                    inner_order.push(out_edge.order);
                    inner_order.extend_from_slice(&out_edge.inner_order);
                    let bridged = Edge {
                        source: in_edge.source,
                        target: out_edge.target,
                        relationship: in_edge.relationship,
                        order: in_edge.order,
                        rewired: true,
                        inner_order,
                    };
                    if edge_keys.insert(bridged.key()) {
                        working.add_edge(*pred, *succ, bridged);
                        rewired_edges += 1;
                    }
                }
            }

            for (_, edge) in incoming.iter().chain(outgoing.iter()) {
                edge_keys.remove(&edge.key());
            }
            working.remove_node(idx);
            removed.push(id);
            tracing::debug!("Removed node {} and rewired its connections.", id);
        }

        let removed_set: HashSet<NodeId> = removed.iter().copied().collect();
        let nodes: Vec<_> = graph
            .nodes
            .iter()
            .filter(|n| !removed_set.contains(&n.id))
            .cloned()
            .collect();
        let mut edges: Vec<Edge> = working
            .edge_indices()
            .filter_map(|e| working.edge_weight(e).cloned())
            .collect();
        edges.sort_by(|a, b| {
            (a.source, a.order, &a.inner_order, a.target, a.relationship)
                .cmp(&(b.source, b.order, &b.inner_order, b.target, b.relationship))
        });
        let unwrapped = Graph { nodes, edges };

        let referenced: HashSet<_> = unwrapped.nodes.iter().filter_map(|n| n.attributes_ref()).collect();
        let mut content = store.clone();
        let removed_attributes = content.retain(ContentKind::Attributes, &referenced);
        tracing::info!("Removed {} attributes.", removed_attributes);

        let report = validate(&unwrapped);
        tracing::info!("Unwrapping process completed.");

        UnwrapOutcome {
            graph: unwrapped,
            content,
            report,
            removed,
            rewired_edges,
            removed_attributes,
        }
    }
}

/// Wrappers in topological order, parents before children.
///
/// Falls back to ascending id if the graph has a cycle.
fn removal_order(working: &StableDiGraph<NodeId, Edge>, wrappers: &HashSet<NodeId>) -> Vec<NodeId> {
    match toposort(working, None) {
        Ok(sorted) => sorted
            .into_iter()
            .map(|idx| working[idx])
            .filter(|id| wrappers.contains(id))
            .collect(),
        Err(cycle) => {
            tracing::warn!(
                "Graph contains a cycle at node {}; unwrapping in id order.",
                working[cycle.node_id()]
            );
            let mut ids: Vec<NodeId> = wrappers.iter().copied().collect();
            ids.sort();
            ids
        }
    }
}

/// The wrapper predicates used on the crawled site by default
pub fn default_targets() -> Vec<AttributePredicate> {
    vec![
        AttributePredicate::new().set("class", &["page", "clearfix"]).exact("id", "page"),
        AttributePredicate::new().set("class", &["main-wrapper"]).exact("id", "main-wrapper"),
        AttributePredicate::new().set("class", &["main"]).exact("id", "main"),
        AttributePredicate::new().set("class", &["clearfix"]).exact("id", "wrapper"),
    ]
}
