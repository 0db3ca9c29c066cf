//! Graph model - nodes, edges and the graph container
//!
//! Node kinds are a closed set. Payloads live in the `ContentStore` and are
//! referenced by `ContentId`; a graph plus its store is one snapshot.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::content::{ContentId, ContentKind, ContentStore};
use crate::digest::Digest;

/// Node identifier, assigned once in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('n')
            .and_then(|rest| rest.parse().ok())
            .map(NodeId)
            .ok_or_else(|| format!("Invalid node id: {:?}", s))
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Node-specific data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// One per input file; never deduplicated
    Document { filename: String },
    Doctype { content: ContentId },
    Comment { content: ContentId },
    #[serde(rename = "textnode")]
    Text { content: ContentId },
    Tag {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<ContentId>,
        /// Digests of the surviving children, in order, at construction time
        #[serde(default)]
        children_digests: Vec<Digest>,
    },
}

/// Graph node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Tag name, if this is a tag
    #[inline]
    pub fn tag_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Tag { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Attribute record, if this is a tag with attributes
    #[inline]
    pub fn attributes_ref(&self) -> Option<ContentId> {
        match &self.kind {
            NodeKind::Tag { attributes, .. } => *attributes,
            _ => None,
        }
    }

    /// Payload record of a doctype, comment or text node
    #[inline]
    pub fn content_ref(&self) -> Option<ContentId> {
        match &self.kind {
            NodeKind::Doctype { content } | NodeKind::Comment { content } | NodeKind::Text { content } => {
                Some(*content)
            }
            _ => None,
        }
    }

    #[inline]
    pub fn is_document(&self) -> bool {
        matches!(self.kind, NodeKind::Document { .. })
    }
}

/// Edge relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    HasRoot,
    HasDoctype,
    HasComment,
    ContainsText,
    ContainsTag,
}

impl Relationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Relationship::HasRoot => "HAS_ROOT",
            Relationship::HasDoctype => "HAS_DOCTYPE",
            Relationship::HasComment => "HAS_COMMENT",
            Relationship::ContainsText => "CONTAINS_TEXT",
            Relationship::ContainsTag => "CONTAINS_TAG",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an edge within the edge set
pub type EdgeKey = (NodeId, NodeId, Relationship, u32, Vec<u32>);

/// Directed, ordered edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub relationship: Relationship,
    /// 1-based position of the target among the source's raw children
    pub order: u32,
    /// Synthesized by unwrapping rather than read from a document
    #[serde(default, skip_serializing_if = "is_false")]
    pub rewired: bool,
    /// For rewired edges: orders of the bridged edges below `order`, outermost
    /// removed wrapper first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inner_order: Vec<u32>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId, relationship: Relationship, order: u32) -> Self {
        Self {
            source,
            target,
            relationship,
            order,
            rewired: false,
            inner_order: Vec::new(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        (self.source, self.target, self.relationship, self.order, self.inner_order.clone())
    }
}

/// Structural integrity violation.
///
/// These cannot arise from valid construction; finding one means a bug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("Node {node} references missing content {content}")]
    DanglingContent { node: NodeId, content: ContentId },

    #[error("Node {node} references {content}, which holds {found:?} content")]
    WrongContentKind { node: NodeId, content: ContentId, found: ContentKind },

    #[error("Edge {from} -> {to} has an endpoint outside the graph")]
    DanglingEdge { from: NodeId, to: NodeId },

    #[error("Node id {0} is not unique or not ascending")]
    NodeOrder(NodeId),

    #[error("Edge {from} -> {to} ({relationship}, order {order}) is duplicated")]
    DuplicateEdge { from: NodeId, to: NodeId, relationship: Relationship, order: u32 },
}

/// Node/edge graph
///
/// Nodes are kept sorted by id, which makes id lookup a binary search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a node by ID
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|i| &self.nodes[i])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Outgoing edges of `id`, in storage order
    pub fn edges_from(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Incoming edges of `id`, in storage order
    pub fn edges_to(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.target == id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_document())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Verify ids, edge endpoints, edge uniqueness and content references
    pub fn check_references(&self, store: &ContentStore) -> Result<(), IntegrityError> {
        for pair in self.nodes.windows(2) {
            if pair[0].id >= pair[1].id {
                return Err(IntegrityError::NodeOrder(pair[1].id));
            }
        }

        for node in &self.nodes {
            let expected = match &node.kind {
                NodeKind::Doctype { .. } => Some(ContentKind::Doctype),
                NodeKind::Comment { .. } => Some(ContentKind::Comment),
                NodeKind::Text { .. } => Some(ContentKind::Text),
                _ => None,
            };
            let refs = node
                .content_ref()
                .map(|c| (c, expected))
                .into_iter()
                .chain(node.attributes_ref().map(|a| (a, Some(ContentKind::Attributes))));
            for (content, expected) in refs {
                if Some(content.kind()) != expected {
                    return Err(IntegrityError::WrongContentKind { node: node.id, content, found: content.kind() });
                }
                if !store.contains(content) {
                    return Err(IntegrityError::DanglingContent { node: node.id, content });
                }
            }
        }

        let mut seen = HashSet::with_capacity(self.edges.len());
        for edge in &self.edges {
            if !self.contains(edge.source) || !self.contains(edge.target) {
                return Err(IntegrityError::DanglingEdge { from: edge.source, to: edge.target });
            }
            if !seen.insert(edge.key()) {
                return Err(IntegrityError::DuplicateEdge {
                    from: edge.source,
                    to: edge.target,
                    relationship: edge.relationship,
                    order: edge.order,
                });
            }
        }
        Ok(())
    }
}
