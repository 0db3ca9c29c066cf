//! Decomposition tests for sg-graph
//!
//! Structural sharing, identity uniqueness and concurrent builders.

use std::collections::HashSet;
use std::sync::Arc;

use sg_graph::{ContentKind, Graph, GraphBuilder, NodeKind, Relationship, validate};

fn build(documents: &[(&str, &str)]) -> (Graph, sg_graph::ContentStore) {
    let builder = GraphBuilder::new();
    for (name, html) in documents {
        builder.add_html(*name, html).expect("document should build");
    }
    builder.finish()
}

fn tags_named<'a>(graph: &'a Graph, name: &'a str) -> impl Iterator<Item = &'a sg_graph::Node> {
    graph.nodes.iter().filter(move |n| n.tag_name() == Some(name))
}

// ============================================================================
// STRUCTURAL SHARING
// ============================================================================

#[test]
fn test_identical_subtree_shared_across_documents() {
    let nav = r#"<nav class="menu"><a href="/">Home</a><a href="/about">About</a></nav>"#;
    let (graph, store) = build(&[
        ("a.html", &format!("<body>{nav}<p>first</p></body>")),
        ("b.html", &format!("<body>{nav}<h1>second</h1></body>")),
    ]);

    let navs: Vec<_> = tags_named(&graph, "nav").collect();
    assert_eq!(navs.len(), 1);
    let parents: HashSet<_> = graph.edges_to(navs[0].id).map(|e| e.source).collect();
    assert_eq!(parents.len(), 2, "one edge from each document's body");
    assert!(graph.edges_to(navs[0].id).all(|e| e.relationship == Relationship::ContainsTag));

    assert_eq!(tags_named(&graph, "a").count(), 2);
    assert_eq!(graph.documents().count(), 2);
    assert_eq!(graph.check_references(&store), Ok(()));
}

#[test]
fn test_identical_documents_share_root() {
    let html = "<!DOCTYPE html><html><head><title>Same</title></head><body></body></html>";
    let (graph, store) = build(&[("a.html", html), ("b.html", html)]);

    let roots: Vec<_> = tags_named(&graph, "html").collect();
    assert_eq!(roots.len(), 1);
    let incoming: Vec<_> = graph.edges_to(roots[0].id).collect();
    assert_eq!(incoming.len(), 2);
    assert!(incoming.iter().all(|e| e.relationship == Relationship::HasRoot));

    let doctypes: Vec<_> = graph.nodes.iter().filter(|n| matches!(n.kind, NodeKind::Doctype { .. })).collect();
    assert_eq!(doctypes.len(), 1);
    assert_eq!(store.len(ContentKind::Doctype), 1);
}

#[test]
fn test_different_attributes_are_different_nodes() {
    let (graph, store) = build(&[("a.html", r#"<div id="x">hi</div><div id="y">hi</div>"#)]);
    assert_eq!(tags_named(&graph, "div").count(), 2);
    // the shared text payload and its node exist once
    assert_eq!(store.len(ContentKind::Text), 1);
    assert_eq!(graph.nodes.iter().filter(|n| matches!(n.kind, NodeKind::Text { .. })).count(), 1);
    assert_eq!(store.len(ContentKind::Attributes), 2);
}

#[test]
fn test_attribute_order_does_not_matter() {
    let (graph, store) = build(&[
        ("a.html", r#"<span lang="en" title="t">x</span>"#),
        ("b.html", r#"<span title="t" lang="en">x</span>"#),
    ]);
    assert_eq!(tags_named(&graph, "span").count(), 1);
    assert_eq!(store.len(ContentKind::Attributes), 1);
}

#[test]
fn test_whitespace_keeps_sibling_position() {
    let (graph, _) = build(&[("a.html", "<ul>\n  <li>one</li>\n  <li>two</li>\n</ul>")]);
    let ul = tags_named(&graph, "ul").next().unwrap();
    let mut orders: Vec<u32> = graph.edges_from(ul.id).map(|e| e.order).collect();
    orders.sort();
    assert_eq!(orders, vec![2, 4]);
}

// ============================================================================
// IDENTITY INVARIANTS
// ============================================================================

#[test]
fn test_node_ids_unique_and_ascending() {
    let (graph, _) = build(&[
        ("a.html", "<p>one</p><p>two</p>"),
        ("b.html", "<p>two</p><!-- note --><p>three</p>"),
    ]);
    let ids: HashSet<_> = graph.nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids.len(), graph.node_count());
    assert!(graph.nodes.windows(2).all(|w| w[0].id < w[1].id));
}

#[test]
fn test_edge_keys_unique() {
    let (graph, store) = build(&[
        ("a.html", "<p>x</p><p>x</p><p>x</p>"),
        ("b.html", "<p>x</p><p>x</p>"),
    ]);
    let keys: HashSet<_> = graph.edges.iter().map(|e| (e.source, e.target, e.relationship, e.order)).collect();
    assert_eq!(keys.len(), graph.edge_count());
    assert_eq!(graph.check_references(&store), Ok(()));
}

#[test]
fn test_built_graph_is_acyclic() {
    let (graph, _) = build(&[
        ("a.html", "<div><div><div>deep</div></div></div>"),
        ("b.html", "<div><div>deep</div></div>"),
    ]);
    let report = validate(&graph);
    assert!(report.is_acyclic);
    assert!(report.orphan_node_ids.is_empty());
}

#[test]
fn test_comment_and_doctype_relationships() {
    let (graph, _) = build(&[("a.html", "<!DOCTYPE html><!-- top --><html><body><!-- inner --></body></html>")]);
    let doc = graph.documents().next().unwrap();
    let mut rels: Vec<_> = graph.edges_from(doc.id).map(|e| (e.order, e.relationship)).collect();
    rels.sort();
    assert_eq!(
        rels,
        vec![(1, Relationship::HasDoctype), (2, Relationship::HasComment), (3, Relationship::HasRoot)]
    );
}

// ============================================================================
// FAILURES AND BATCHES
// ============================================================================

#[test]
fn test_build_records_failures() {
    let documents = vec![
        ("good.html".to_string(), sg_html::parse("<p>ok</p>").unwrap()),
        (String::new(), sg_html::parse("<p>lost</p>").unwrap()),
    ];
    let (graph, _, report) = GraphBuilder::build(documents);
    assert_eq!(report.documents, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(graph.documents().count(), 1);
}

#[test]
fn test_deeply_nested_document() {
    let depth = 3_000;
    let html = format!("{}x{}", "<span>".repeat(depth), "</span>".repeat(depth));
    let (graph, _) = build(&[("deep.html", &html)]);
    assert!(tags_named(&graph, "span").count() >= depth);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_concurrent_builders_keep_one_node_per_subtree() {
    let builder = Arc::new(GraphBuilder::new());
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let builder = Arc::clone(&builder);
            std::thread::spawn(move || {
                for i in 0..25 {
                    let html = format!("<header><b>shared</b></header><p>{worker}-{i}</p>");
                    builder.add_html(format!("{worker}-{i}.html"), &html).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let builder = Arc::try_unwrap(builder).expect("all workers joined");
    let (graph, store) = builder.finish();
    assert_eq!(graph.documents().count(), 200);
    assert_eq!(tags_named(&graph, "header").count(), 1);
    assert_eq!(tags_named(&graph, "b").count(), 1);
    assert_eq!(graph.check_references(&store), Ok(()));

    let ids: HashSet<_> = graph.nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids.len(), graph.node_count());
}
