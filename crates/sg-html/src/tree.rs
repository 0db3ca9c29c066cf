//! Parsed document tree (arena-based allocation)
//!
//! The parser output handed to the graph builder. Nodes live in one `Vec`
//! and reference their children by index, so arbitrarily deep markup never
//! needs recursion to build, walk, or drop.

use crate::AttributeMap;

/// Parsed node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParsedId(pub(crate) u32);

impl ParsedId {
    /// Synthetic document root
    pub const ROOT: ParsedId = ParsedId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind-specific payload of a parsed node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedKind {
    /// Document root
    Root,
    /// DOCTYPE, rendered as `name [PUBLIC "pub"] ["sys"]`
    Doctype(String),
    Comment(String),
    Text(String),
    Element {
        name: String,
        attributes: AttributeMap,
    },
    /// Markup that occupies a sibling slot but carries no content
    /// (processing instructions)
    Other,
}

/// Parsed node
#[derive(Debug, Clone)]
pub struct ParsedNode {
    pub kind: ParsedKind,
    pub children: Vec<ParsedId>,
}

impl ParsedNode {
    /// Whether this is a text node made only of whitespace
    #[inline]
    pub fn is_blank_text(&self) -> bool {
        matches!(&self.kind, ParsedKind::Text(t) if t.trim().is_empty())
    }
}

/// Arena tree of one parsed document
#[derive(Debug, Clone)]
pub struct ParsedTree {
    nodes: Vec<ParsedNode>,
    recovered_errors: usize,
}

impl ParsedTree {
    /// Create a tree holding only the root
    pub fn new() -> Self {
        Self {
            nodes: vec![ParsedNode { kind: ParsedKind::Root, children: Vec::new() }],
            recovered_errors: 0,
        }
    }

    pub fn root(&self) -> ParsedId {
        ParsedId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: ParsedId) -> Option<&ParsedNode> {
        self.nodes.get(id.index())
    }

    /// Children of a node, in document order
    pub fn children(&self, id: ParsedId) -> &[ParsedId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Number of nodes in the tree, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Parse errors html5ever recovered from while building this tree
    pub fn recovered_errors(&self) -> usize {
        self.recovered_errors
    }

    pub(crate) fn set_recovered_errors(&mut self, count: usize) {
        self.recovered_errors = count;
    }

    /// Append a new node under `parent`, returning its id.
    ///
    /// Returns `None` if `parent` is not in this tree.
    pub fn push_child(&mut self, parent: ParsedId, kind: ParsedKind) -> Option<ParsedId> {
        if parent.index() >= self.nodes.len() {
            return None;
        }
        let id = ParsedId(self.nodes.len() as u32);
        self.nodes.push(ParsedNode { kind, children: Vec::new() });
        self.nodes[parent.index()].children.push(id);
        Some(id)
    }

    /// Append an element under `parent`
    pub fn element(&mut self, parent: ParsedId, name: &str, attributes: AttributeMap) -> Option<ParsedId> {
        self.push_child(parent, ParsedKind::Element { name: name.to_string(), attributes })
    }

    /// Append a text node under `parent`
    pub fn text(&mut self, parent: ParsedId, content: &str) -> Option<ParsedId> {
        self.push_child(parent, ParsedKind::Text(content.to_string()))
    }

    /// Append a comment under `parent`
    pub fn comment(&mut self, parent: ParsedId, content: &str) -> Option<ParsedId> {
        self.push_child(parent, ParsedKind::Comment(content.to_string()))
    }

    /// Append a doctype under `parent`
    pub fn doctype(&mut self, parent: ParsedId, content: &str) -> Option<ParsedId> {
        self.push_child(parent, ParsedKind::Doctype(content.to_string()))
    }

    /// Node ids in pre-order (document order), root first
    pub fn preorder(&self) -> Vec<ParsedId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ParsedId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }
}

impl Default for ParsedTree {
    fn default() -> Self {
        Self::new()
    }
}
