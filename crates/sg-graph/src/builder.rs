//! Graph Builder - decompose parsed documents into one deduplicated DAG
//!
//! Each document gets its own `Document` node. Doctypes, comments and text
//! runs resolve to one node per distinct payload; tags resolve to one node per
//! structural digest, so an identical subtree met in many documents becomes a
//! single shared subgraph. Whitespace-only text produces nothing but still
//! occupies its sibling position.
//!
//! Work per document is split in two:
//! - [`GraphBuilder::prepare`] hashes the tree bottom-up. Pure, lock-free.
//! - [`GraphBuilder::commit`] resolves identities and emits nodes and edges
//!   under the builder's single lock, so a document lands all at once.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use sg_html::{HtmlParser, ParseError, ParsedId, ParsedKind, ParsedTree};

use crate::content::{ContentId, ContentStore, Payload};
use crate::digest::{Digest, SubtreeHasher};
use crate::node::{Edge, EdgeKey, Graph, Node, NodeId, NodeKind, Relationship};

/// Per-document build failure
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Document has an empty filename")]
    EmptyFilename,

    #[error("Failed to parse {filename}: {source}")]
    Parse {
        filename: String,
        #[source]
        source: ParseError,
    },
}

/// A document hashed and ready to commit
#[derive(Debug)]
pub struct PreparedDocument {
    filename: String,
    tree: ParsedTree,
    /// Digest per parsed node; `None` for nodes that never become graph nodes
    digests: Vec<Option<Digest>>,
}

impl PreparedDocument {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Digest of a parsed node, if it materializes
    pub fn digest(&self, id: ParsedId) -> Option<Digest> {
        self.digests.get(id.index()).copied().flatten()
    }

    /// Children that materialize, with their 1-based raw sibling position
    fn surviving_children(&self, id: ParsedId) -> impl Iterator<Item = (u32, ParsedId)> + '_ {
        self.tree
            .children(id)
            .iter()
            .enumerate()
            .filter(|(_, child)| self.digest(**child).is_some())
            .map(|(i, child)| ((i + 1) as u32, *child))
    }
}

/// Outcome of committing one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSummary {
    pub document: NodeId,
    pub nodes_created: usize,
    pub nodes_reused: usize,
    pub edges_created: usize,
}

/// A document left out of the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub filename: String,
    pub reason: String,
}

/// Batch outcome
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub documents: usize,
    pub nodes_reused: usize,
    pub failures: Vec<DocumentFailure>,
}

impl BuildReport {
    pub fn record_success(&mut self, summary: &DocumentSummary) {
        self.documents += 1;
        self.nodes_reused += summary.nodes_reused;
    }

    pub fn record_failure(&mut self, filename: impl Into<String>, reason: impl ToString) {
        let filename = filename.into();
        let reason = reason.to_string();
        tracing::error!("Error processing file {}: {}", filename, reason);
        self.failures.push(DocumentFailure { filename, reason });
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: BuildReport) {
        self.documents += other.documents;
        self.nodes_reused += other.nodes_reused;
        self.failures.extend(other.failures);
    }
}

/// Dedup identity of a non-document node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Identity {
    Doctype(ContentId),
    Comment(ContentId),
    Text(ContentId),
    Tag(Digest),
}

/// Everything guarded by the builder lock
#[derive(Debug, Default)]
struct BuildState {
    store: ContentStore,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    edge_keys: HashSet<EdgeKey>,
    identities: HashMap<Identity, NodeId>,
    next_id: u64,
}

impl BuildState {
    fn create(&mut self, kind: NodeKind) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.push(Node { id, kind });
        id
    }

    /// Resolve a leaf identity, creating the node on first sight
    fn leaf(&mut self, identity: Identity, kind: impl FnOnce() -> NodeKind, summary: &mut DocumentSummary) -> NodeId {
        if let Some(&id) = self.identities.get(&identity) {
            summary.nodes_reused += 1;
            return id;
        }
        let id = self.create(kind());
        self.identities.insert(identity, id);
        summary.nodes_created += 1;
        id
    }

    fn connect(&mut self, edge: Edge, summary: &mut DocumentSummary) {
        if self.edge_keys.insert(edge.key()) {
            self.edges.push(edge);
            summary.edges_created += 1;
        }
    }
}

/// Traversal step for identity resolution
enum Step {
    /// First sight of a parsed node
    Visit(ParsedId),
    /// All children of a new tag are resolved
    Finish(ParsedId, Digest),
}

/// Incremental, thread-safe graph builder
///
/// Shared by reference between concurrent document tasks. The node-identity
/// cache, the content store and the id counter sit behind one mutex, and every
/// check-then-insert happens while it is held.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    state: Mutex<BuildState>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from documents in the given order
    pub fn build<I, S>(documents: I) -> (Graph, ContentStore, BuildReport)
    where
        I: IntoIterator<Item = (S, ParsedTree)>,
        S: Into<String>,
    {
        let builder = Self::new();
        let mut report = BuildReport::default();
        for (filename, tree) in documents {
            let filename = filename.into();
            match builder.add_document(filename.clone(), tree) {
                Ok(summary) => report.record_success(&summary),
                Err(e) => report.record_failure(filename, e),
            }
        }
        let (graph, store) = builder.finish();
        (graph, store, report)
    }

    /// Parse and add one HTML document
    pub fn add_html(&self, filename: impl Into<String>, html: &str) -> Result<DocumentSummary, BuildError> {
        let filename = filename.into();
        let tree = HtmlParser::new()
            .parse(html)
            .map_err(|source| BuildError::Parse { filename: filename.clone(), source })?;
        self.add_document(filename, tree)
    }

    /// Add one parsed document
    pub fn add_document(&self, filename: impl Into<String>, tree: ParsedTree) -> Result<DocumentSummary, BuildError> {
        let prepared = Self::prepare(filename, tree)?;
        Ok(self.commit(&prepared))
    }

    /// Hash every node of `tree`, children before parents
    pub fn prepare(filename: impl Into<String>, tree: ParsedTree) -> Result<PreparedDocument, BuildError> {
        let filename = filename.into();
        if filename.is_empty() {
            return Err(BuildError::EmptyFilename);
        }

        let mut digests: Vec<Option<Digest>> = vec![None; tree.len()];
        // Reverse pre-order visits every child before its parent
        for id in tree.preorder().into_iter().rev() {
            let Some(node) = tree.get(id) else { continue };
            let digest = match &node.kind {
                ParsedKind::Root | ParsedKind::Other => None,
                ParsedKind::Text(_) if node.is_blank_text() => None,
                ParsedKind::Text(t) => Some(SubtreeHasher::text(t)),
                ParsedKind::Doctype(d) => Some(SubtreeHasher::doctype(d)),
                ParsedKind::Comment(c) => Some(SubtreeHasher::comment(c)),
                ParsedKind::Element { name, attributes } => {
                    let children: Vec<(u32, Digest)> = node
                        .children
                        .iter()
                        .enumerate()
                        .filter_map(|(i, c)| digests[c.index()].map(|d| ((i + 1) as u32, d)))
                        .collect();
                    Some(SubtreeHasher::tag(name, attributes, &children))
                }
            };
            digests[id.index()] = digest;
        }

        Ok(PreparedDocument { filename, tree, digests })
    }

    /// Resolve identities and emit the document's nodes and edges.
    ///
    /// Holds the builder lock for the whole document.
    pub fn commit(&self, doc: &PreparedDocument) -> DocumentSummary {
        let mut state = self.state.lock();
        let document = state.create(NodeKind::Document { filename: doc.filename.clone() });
        let mut summary = DocumentSummary {
            document,
            nodes_created: 1,
            nodes_reused: 0,
            edges_created: 0,
        };

        let mut resolved: Vec<Option<NodeId>> = vec![None; doc.tree.len()];
        let mut stack: Vec<Step> = Vec::new();
        push_visits(&mut stack, doc, doc.tree.root());

        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(id) => {
                    let (Some(node), Some(digest)) = (doc.tree.get(id), doc.digest(id)) else {
                        continue;
                    };
                    let st = &mut *state;
                    let node_id = match &node.kind {
                        ParsedKind::Doctype(s) => {
                            let content = st.store.intern(Payload::Doctype(s));
                            st.leaf(Identity::Doctype(content), || NodeKind::Doctype { content }, &mut summary)
                        }
                        ParsedKind::Comment(s) => {
                            let content = st.store.intern(Payload::Comment(s));
                            st.leaf(Identity::Comment(content), || NodeKind::Comment { content }, &mut summary)
                        }
                        ParsedKind::Text(s) => {
                            let content = st.store.intern(Payload::Text(s));
                            st.leaf(Identity::Text(content), || NodeKind::Text { content }, &mut summary)
                        }
                        ParsedKind::Element { .. } => {
                            if let Some(&existing) = st.identities.get(&Identity::Tag(digest)) {
                                // Subtree already wired by its first occurrence
                                summary.nodes_reused += 1;
                                existing
                            } else {
                                stack.push(Step::Finish(id, digest));
                                push_visits(&mut stack, doc, id);
                                continue;
                            }
                        }
                        ParsedKind::Root | ParsedKind::Other => continue,
                    };
                    resolved[id.index()] = Some(node_id);
                }
                Step::Finish(id, digest) => {
                    let Some(ParsedKind::Element { name, attributes }) = doc.tree.get(id).map(|n| &n.kind) else {
                        continue;
                    };
                    let st = &mut *state;
                    if let Some(&existing) = st.identities.get(&Identity::Tag(digest)) {
                        summary.nodes_reused += 1;
                        resolved[id.index()] = Some(existing);
                        continue;
                    }

                    let attributes = (!attributes.is_empty()).then(|| st.store.intern(Payload::Attributes(attributes)));
                    let children_digests = doc.surviving_children(id).filter_map(|(_, c)| doc.digest(c)).collect();
                    let tag = st.create(NodeKind::Tag { name: name.clone(), attributes, children_digests });
                    st.identities.insert(Identity::Tag(digest), tag);
                    summary.nodes_created += 1;
                    resolved[id.index()] = Some(tag);

                    for (order, child) in doc.surviving_children(id) {
                        let Some(target) = resolved[child.index()] else {
                            tracing::error!("Child of {} in {} was never resolved", tag, doc.filename);
                            continue;
                        };
                        let relationship = relationship_for(&doc.tree, child, false);
                        st.connect(Edge::new(tag, target, relationship, order), &mut summary);
                    }
                }
            }
        }

        for (order, child) in doc.surviving_children(doc.tree.root()) {
            let Some(target) = resolved[child.index()] else {
                tracing::error!("Top-level node of {} was never resolved", doc.filename);
                continue;
            };
            let relationship = relationship_for(&doc.tree, child, true);
            state.connect(Edge::new(document, target, relationship, order), &mut summary);
        }

        tracing::debug!(
            "Processed file: {} ({} created, {} reused)",
            doc.filename,
            summary.nodes_created,
            summary.nodes_reused
        );
        summary
    }

    /// Copy of the current graph and content store
    pub fn snapshot(&self) -> (Graph, ContentStore) {
        let state = self.state.lock();
        let graph = Graph { nodes: state.nodes.clone(), edges: state.edges.clone() };
        (graph, state.store.clone())
    }

    /// Freeze the builder into its graph and content store
    pub fn finish(self) -> (Graph, ContentStore) {
        let state = self.state.into_inner();
        (Graph { nodes: state.nodes, edges: state.edges }, state.store)
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.lock().edges.len()
    }
}

/// Queue surviving children of `parent` so the first is visited first
fn push_visits(stack: &mut Vec<Step>, doc: &PreparedDocument, parent: ParsedId) {
    let children: Vec<ParsedId> = doc.surviving_children(parent).map(|(_, c)| c).collect();
    stack.extend(children.into_iter().rev().map(Step::Visit));
}

fn relationship_for(tree: &ParsedTree, child: ParsedId, from_document: bool) -> Relationship {
    match tree.get(child).map(|n| &n.kind) {
        Some(ParsedKind::Doctype(_)) => Relationship::HasDoctype,
        Some(ParsedKind::Comment(_)) => Relationship::HasComment,
        Some(ParsedKind::Text(_)) => Relationship::ContainsText,
        _ if from_document => Relationship::HasRoot,
        _ => Relationship::ContainsTag,
    }
}
