//! Unwrapping tests for sg-graph
//!
//! Wrapper removal, edge bridging, chained wrappers and attribute cleanup.

use std::collections::HashSet;

use sg_graph::{
    AttributePredicate, ContentKind, ContentStore, Edge, Graph, GraphBuilder, Node, NodeId, NodeKind, Payload,
    Relationship, Unwrapper, default_targets,
};
use sg_html::{AttrValue, AttributeMap};

fn tag(id: u64, name: &str, attributes: Option<sg_graph::ContentId>) -> Node {
    Node { id: NodeId(id), kind: NodeKind::Tag { name: name.into(), attributes, children_digests: Vec::new() } }
}

fn page_attributes() -> AttributeMap {
    [("class", AttrValue::from(vec!["page", "clearfix"])), ("id", AttrValue::from("page"))]
        .into_iter()
        .collect()
}

/// document -> html -> body -> div.page -> p -> "Hi"
fn wrapped_paragraph() -> (Graph, ContentStore) {
    let mut store = ContentStore::new();
    let wrapper = store.intern(Payload::Attributes(&page_attributes()));
    let hi = store.intern(Payload::Text("Hi"));
    let graph = Graph {
        nodes: vec![
            Node { id: NodeId(1), kind: NodeKind::Document { filename: "index.html".into() } },
            tag(2, "html", None),
            tag(3, "body", None),
            tag(4, "div", Some(wrapper)),
            tag(5, "p", None),
            Node { id: NodeId(6), kind: NodeKind::Text { content: hi } },
        ],
        edges: vec![
            Edge::new(NodeId(1), NodeId(2), Relationship::HasRoot, 1),
            Edge::new(NodeId(2), NodeId(3), Relationship::ContainsTag, 1),
            Edge::new(NodeId(3), NodeId(4), Relationship::ContainsTag, 1),
            Edge::new(NodeId(4), NodeId(5), Relationship::ContainsTag, 1),
            Edge::new(NodeId(5), NodeId(6), Relationship::ContainsText, 1),
        ],
    };
    (graph, store)
}

fn page_target() -> Vec<AttributePredicate> {
    vec![AttributePredicate::new().set("class", &["page", "clearfix"]).exact("id", "page")]
}

// ============================================================================
// SINGLE WRAPPER
// ============================================================================

#[test]
fn test_wrapper_removed_and_bridged() {
    let (graph, store) = wrapped_paragraph();
    let wrapper_attrs = graph.node(NodeId(4)).and_then(|n| n.attributes_ref()).unwrap();

    let outcome = Unwrapper::new(page_target()).unwrap(&graph, &store);

    assert!(!outcome.graph.contains(NodeId(4)));
    assert_eq!(outcome.removed, vec![NodeId(4)]);

    let bridged: Vec<_> = outcome.graph.edges_from(NodeId(3)).collect();
    assert_eq!(bridged.len(), 1);
    assert_eq!(bridged[0].target, NodeId(5));
    assert_eq!(bridged[0].relationship, Relationship::ContainsTag);
    assert_eq!(bridged[0].order, 1);
    assert!(bridged[0].rewired);

    let text = outcome.graph.node(NodeId(6)).unwrap();
    assert_eq!(text, graph.node(NodeId(6)).unwrap());
    assert_eq!(outcome.content.text(text.content_ref().unwrap()), Some("Hi"));

    assert!(outcome.content.attributes(wrapper_attrs).is_none());
    assert_eq!(outcome.removed_attributes, 1);
    assert!(outcome.report.is_acyclic);
    assert!(outcome.report.orphan_node_ids.is_empty());
    assert_eq!(outcome.graph.check_references(&outcome.content), Ok(()));
}

#[test]
fn test_input_graph_untouched() {
    let (graph, store) = wrapped_paragraph();
    let before = graph.clone();
    let _ = Unwrapper::new(page_target()).unwrap(&graph, &store);
    assert_eq!(graph, before);
    assert_eq!(store.len(ContentKind::Attributes), 1);
}

#[test]
fn test_no_targets_changes_nothing() {
    let (graph, store) = wrapped_paragraph();
    let outcome = Unwrapper::new(Vec::new()).unwrap(&graph, &store);
    assert!(outcome.removed.is_empty());
    assert_eq!(outcome.graph.node_count(), graph.node_count());
    assert_eq!(outcome.graph.edge_count(), graph.edge_count());
    assert_eq!(outcome.removed_attributes, 0);
}

#[test]
fn test_only_div_is_unwrapped() {
    let (mut graph, store) = wrapped_paragraph();
    if let NodeKind::Tag { name, .. } = &mut graph.nodes[3].kind {
        *name = "section".into();
    }
    let outcome = Unwrapper::new(page_target()).unwrap(&graph, &store);
    assert!(outcome.removed.is_empty());
    assert!(outcome.graph.contains(NodeId(4)));
}

// ============================================================================
// SHARED AND CHAINED WRAPPERS
// ============================================================================

#[test]
fn test_chained_wrappers_bridge_to_content() {
    let html = r#"<html><body><div id="page" class="page clearfix"><div id="main" class="main"><p>Hi</p></div></div></body></html>"#;
    let builder = GraphBuilder::new();
    builder.add_html("a.html", html).unwrap();
    let (graph, store) = builder.finish();

    let outcome = Unwrapper::new(default_targets()).unwrap(&graph, &store);
    assert_eq!(outcome.removed.len(), 2);
    assert!(outcome.graph.nodes.iter().all(|n| n.tag_name() != Some("div")));

    let body = outcome.graph.nodes.iter().find(|n| n.tag_name() == Some("body")).unwrap();
    let p = outcome.graph.nodes.iter().find(|n| n.tag_name() == Some("p")).unwrap();
    let edges: Vec<_> = outcome.graph.edges_from(body.id).collect();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target, p.id);
    assert!(edges[0].rewired);
    assert_eq!(edges[0].relationship, Relationship::ContainsTag);

    // the outer wrapper goes first
    let outer = graph
        .nodes
        .iter()
        .find(|n| n.tag_name() == Some("div") && graph.edges_to(n.id).any(|e| e.source == body.id))
        .unwrap();
    assert_eq!(outcome.removed[0], outer.id);

    assert_eq!(outcome.content.len(ContentKind::Attributes), 0);
    assert!(outcome.report.is_acyclic);
    assert!(outcome.report.orphan_node_ids.is_empty());
}

#[test]
fn test_nested_wrappers_keep_full_path() {
    let html = r#"<body><div id="page" class="page clearfix"><div id="main" class="main"><p>one</p></div><div id="wrapper" class="clearfix"><span>two</span></div></div></body>"#;
    let builder = GraphBuilder::new();
    builder.add_html("a.html", html).unwrap();
    let (graph, store) = builder.finish();

    let outcome = Unwrapper::new(default_targets()).unwrap(&graph, &store);
    assert_eq!(outcome.removed.len(), 3);

    let body = outcome.graph.nodes.iter().find(|n| n.tag_name() == Some("body")).unwrap();
    let paths: Vec<_> = outcome
        .graph
        .edges_from(body.id)
        .map(|e| {
            let name = outcome.graph.node(e.target).and_then(|n| n.tag_name()).unwrap();
            (name, e.order, e.inner_order.clone())
        })
        .collect();
    assert_eq!(paths, vec![("p", 1, vec![1, 1]), ("span", 1, vec![2, 1])]);
}

#[test]
fn test_repeated_child_under_sibling_wrappers_kept_twice() {
    let html = r#"<body><div id="page" class="page clearfix"><div id="main" class="main"><p>same</p></div><div id="wrapper" class="clearfix"><p>same</p></div></div></body>"#;
    let builder = GraphBuilder::new();
    builder.add_html("a.html", html).unwrap();
    let (graph, store) = builder.finish();

    let outcome = Unwrapper::new(default_targets()).unwrap(&graph, &store);
    let body = outcome.graph.nodes.iter().find(|n| n.tag_name() == Some("body")).unwrap();
    let edges: Vec<_> = outcome.graph.edges_from(body.id).collect();
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].target, edges[1].target);
    assert_ne!(edges[0].inner_order, edges[1].inner_order);
    assert_eq!(outcome.graph.check_references(&outcome.content), Ok(()));
}

#[test]
fn test_shared_wrapper_bridges_every_parent() {
    let wrapper = r#"<div id="wrapper" class="clearfix"><p>shared</p><p>more</p></div>"#;
    let builder = GraphBuilder::new();
    builder.add_html("a.html", &format!("<body><h1>A</h1>{wrapper}</body>")).unwrap();
    builder.add_html("b.html", &format!("<body><h1>B</h1>{wrapper}</body>")).unwrap();
    let (graph, store) = builder.finish();

    let outcome = Unwrapper::new(default_targets()).unwrap(&graph, &store);
    assert_eq!(outcome.removed.len(), 1);
    // two bodies times two paragraphs
    assert_eq!(outcome.rewired_edges, 4);

    for body in outcome.graph.nodes.iter().filter(|n| n.tag_name() == Some("body")) {
        let mut bridged: Vec<_> = outcome.graph.edges_from(body.id).filter(|e| e.rewired).collect();
        bridged.sort_by_key(|e| e.inner_order.clone());
        assert_eq!(bridged.len(), 2);
        assert!(bridged.iter().all(|e| e.order == 2));
        assert_eq!(bridged[0].inner_order, vec![1]);
        assert_eq!(bridged[1].inner_order, vec![2]);
    }
}

// ============================================================================
// GARBAGE COLLECTION
// ============================================================================

#[test]
fn test_shared_attributes_survive() {
    let builder = GraphBuilder::new();
    builder
        .add_html(
            "a.html",
            r#"<body><div id="main" class="main"><span>x</span></div><section id="main" class="main">y</section></body>"#,
        )
        .unwrap();
    let (graph, store) = builder.finish();

    let outcome = Unwrapper::new(default_targets()).unwrap(&graph, &store);
    assert_eq!(outcome.removed.len(), 1);
    assert_eq!(outcome.removed_attributes, 0);

    let referenced: HashSet<_> = outcome.graph.nodes.iter().filter_map(|n| n.attributes_ref()).collect();
    let stored: HashSet<_> = outcome.content.attribute_ids().collect();
    assert_eq!(referenced, stored);
}

#[test]
fn test_other_payloads_untouched() {
    let (graph, store) = wrapped_paragraph();
    let outcome = Unwrapper::new(page_target()).unwrap(&graph, &store);
    assert_eq!(outcome.content.len(ContentKind::Text), store.len(ContentKind::Text));
}
