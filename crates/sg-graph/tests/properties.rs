//! Property tests for sg-graph

use proptest::prelude::*;
use sg_graph::{ContentStore, GraphBuilder, Payload, SubtreeHasher};
use sg_html::{AttrValue, AttributeMap};

fn attribute_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z]{1,6}", "[a-z0-9 ]{0,8}"), 0..6)
}

fn to_map(pairs: &[(String, String)]) -> AttributeMap {
    let mut map = AttributeMap::new();
    for (name, value) in pairs {
        map.insert_raw("div", name, value);
    }
    map
}

proptest! {
    #[test]
    fn prop_text_interning_is_idempotent(s in ".*") {
        let mut store = ContentStore::new();
        let first = store.intern(Payload::Text(&s));
        let second = store.intern(Payload::Text(&s));
        prop_assert_eq!(first, second);
        prop_assert_eq!(store.text(first), Some(s.as_str()));
    }

    #[test]
    fn prop_attribute_interning_ignores_insertion_order(pairs in attribute_pairs()) {
        let mut store = ContentStore::new();
        let forward = to_map(&pairs);
        let mut dedup = pairs.clone();
        // first duplicate wins, so only reverse distinct names
        dedup.sort_by(|a, b| a.0.cmp(&b.0));
        dedup.dedup_by(|a, b| a.0 == b.0);
        let distinct_forward = to_map(&dedup);
        dedup.reverse();
        let reversed = to_map(&dedup);

        let a = store.intern(Payload::Attributes(&distinct_forward));
        let b = store.intern(Payload::Attributes(&reversed));
        prop_assert_eq!(a, b);
        prop_assert!(forward.len() == distinct_forward.len());
    }

    #[test]
    fn prop_tag_digest_is_stable(name in "[a-z]{1,8}", pairs in attribute_pairs(), text in "[a-zA-Z ]{1,12}") {
        let attrs = to_map(&pairs);
        let child = SubtreeHasher::text(&text);
        let one = SubtreeHasher::tag(&name, &attrs, &[(1, child)]);
        let two = SubtreeHasher::tag(&name, &attrs.clone(), &[(1, SubtreeHasher::text(&text))]);
        prop_assert_eq!(one, two);
        prop_assert_ne!(one, SubtreeHasher::tag(&name, &attrs, &[(2, child)]));
    }

    #[test]
    fn prop_rebuilding_gives_same_shape(words in prop::collection::vec("[a-z]{1,5}", 1..8)) {
        let html: String = words.iter().map(|w| format!("<p class=\"{w}\">{w}</p>")).collect();
        let first = GraphBuilder::new();
        first.add_html("a.html", &html).unwrap();
        let second = GraphBuilder::new();
        second.add_html("a.html", &html).unwrap();
        prop_assert_eq!(first.finish().0, second.finish().0);
    }
}

#[test]
fn test_list_and_scalar_values_hash_differently() {
    let mut list = AttributeMap::new();
    list.insert("class", AttrValue::from(vec!["a"]));
    let mut scalar = AttributeMap::new();
    scalar.insert("class", AttrValue::from("a"));
    assert_ne!(SubtreeHasher::tag("div", &list, &[]), SubtreeHasher::tag("div", &scalar, &[]));
}
