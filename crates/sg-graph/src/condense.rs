//! Condenser - prune boilerplate fan-in and unreachable nodes
//!
//! Tags shared by a huge number of parents (site-wide navigation, tracking
//! snippets) and tags that carry no readable content are cut off from their
//! parents. Whatever is no longer reachable from a document is dropped, and
//! the content store is filtered down to the payloads still referenced.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::content::{ContentId, ContentKind, ContentStore};
use crate::node::{Edge, Graph, NodeId};

/// Condensation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CondenseOptions {
    /// Nodes with more incoming edges than this are cut off
    pub fan_in_threshold: usize,
    /// Tags that are never cut off
    pub keep_tags: Vec<String>,
    /// Tags that are always cut off
    pub drop_tags: Vec<String>,
}

impl Default for CondenseOptions {
    fn default() -> Self {
        Self {
            fan_in_threshold: 1000,
            keep_tags: ["title", "head", "body", "html", "text", "b", "i", "form"]
                .into_iter()
                .map(String::from)
                .collect(),
            drop_tags: ["meta", "input", "script", "select", "option"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// What condensation removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondenseReport {
    pub bad_targets: usize,
    pub nodes_removed: usize,
    pub edges_removed: usize,
    pub content_removed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Condenser {
    options: CondenseOptions,
}

impl Condenser {
    pub fn new(options: CondenseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CondenseOptions {
        &self.options
    }

    /// Nodes whose incoming edges get dropped
    pub fn bad_targets(&self, graph: &Graph) -> HashSet<NodeId> {
        let mut fan_in: HashMap<NodeId, usize> = HashMap::new();
        for edge in &graph.edges {
            *fan_in.entry(edge.target).or_default() += 1;
        }

        let mut bad: HashSet<NodeId> = fan_in
            .into_iter()
            .filter(|(_, count)| *count > self.options.fan_in_threshold)
            .map(|(id, _)| id)
            .collect();
        for node in &graph.nodes {
            match node.tag_name() {
                Some(name) if self.options.drop_tags.iter().any(|t| t == name) => {
                    bad.insert(node.id);
                }
                _ => {}
            }
        }
        for node in &graph.nodes {
            let keep = node.is_document() || node.tag_name().is_some_and(|name| self.options.keep_tags.iter().any(|t| t == name));
            if keep {
                bad.remove(&node.id);
            }
        }

        tracing::debug!("Identified {} bad targets.", bad.len());
        bad
    }

    /// Condensed copies of `graph` and `store`
    pub fn condense(&self, graph: &Graph, store: &ContentStore) -> (Graph, ContentStore, CondenseReport) {
        let bad = self.bad_targets(graph);
        let filtered: Vec<&Edge> = graph.edges.iter().filter(|e| !bad.contains(&e.target)).collect();

        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in &filtered {
            children.entry(edge.source).or_default().push(edge.target);
        }
        let mut connected: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = graph.documents().map(|d| d.id).collect();
        while let Some(id) = queue.pop_front() {
            if !connected.insert(id) {
                continue;
            }
            if let Some(next) = children.get(&id) {
                queue.extend(next.iter().copied().filter(|n| !connected.contains(n)));
            }
        }
        tracing::debug!("Found {} connected nodes.", connected.len());

        let nodes: Vec<_> = graph.nodes.iter().filter(|n| connected.contains(&n.id)).cloned().collect();
        let edges: Vec<Edge> = filtered
            .into_iter()
            .filter(|e| connected.contains(&e.source) && connected.contains(&e.target))
            .cloned()
            .collect();
        let condensed = Graph { nodes, edges };
        tracing::debug!(
            "Filtered structure has {} nodes and {} edges.",
            condensed.node_count(),
            condensed.edge_count()
        );

        let referenced: HashSet<ContentId> = condensed
            .nodes
            .iter()
            .flat_map(|n| n.content_ref().into_iter().chain(n.attributes_ref()))
            .collect();
        let mut content = store.clone();
        let content_removed = [ContentKind::Text, ContentKind::Doctype, ContentKind::Comment, ContentKind::Attributes]
            .into_iter()
            .map(|kind| content.retain(kind, &referenced))
            .sum();

        let report = CondenseReport {
            bad_targets: bad.len(),
            nodes_removed: graph.node_count() - condensed.node_count(),
            edges_removed: graph.edge_count() - condensed.edge_count(),
            content_removed,
        };
        tracing::info!(
            "Condensed graph: removed {} nodes, {} edges and {} payloads",
            report.nodes_removed,
            report.edges_removed,
            report.content_removed
        );
        (condensed, content, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;

    #[test]
    fn test_drop_tags_cut_off() {
        let builder = GraphBuilder::new();
        builder
            .add_html("a.html", "<html><head><script>x()</script></head><body><p>hi</p></body></html>")
            .unwrap();
        let (graph, store) = builder.finish();

        let (condensed, content, report) = Condenser::default().condense(&graph, &store);
        assert!(condensed.nodes.iter().all(|n| n.tag_name() != Some("script")));
        assert!(condensed.nodes.iter().any(|n| n.tag_name() == Some("p")));
        assert!(report.nodes_removed >= 2);
        assert_eq!(condensed.check_references(&content), Ok(()));
        assert!(content.len(ContentKind::Text) < store.len(ContentKind::Text));
    }

    #[test]
    fn test_fan_in_threshold() {
        let builder = GraphBuilder::new();
        for i in 0..4 {
            builder.add_html(format!("{i}.html"), &format!("<p>shared</p><p>{i}</p>")).unwrap();
        }
        let (graph, _) = builder.finish();
        let condenser = Condenser::new(CondenseOptions { fan_in_threshold: 3, ..CondenseOptions::default() });
        let bad = condenser.bad_targets(&graph);

        // every body differs, so the shared paragraph has one parent per document
        let shared_p = graph
            .nodes
            .iter()
            .find(|n| n.tag_name() == Some("p") && graph.edges_to(n.id).count() == 4);
        assert!(shared_p.is_some_and(|p| bad.contains(&p.id)));
    }

    #[test]
    fn test_keep_tags_win() {
        let builder = GraphBuilder::new();
        builder.add_html("a.html", "<title>t</title>").unwrap();
        let (graph, _) = builder.finish();
        let options = CondenseOptions { drop_tags: vec!["title".into()], ..CondenseOptions::default() };
        assert!(Condenser::new(options).bad_targets(&graph).is_empty());
    }
}
