//! Element Attributes
//!
//! Attribute maps as seen by the graph: names are ordered, and the
//! whitespace-separated HTML attributes (`class`, `rel`, ...) carry a list of
//! tokens instead of a raw string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute value: a plain string or a token list
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Single(String),
    List(Vec<String>),
}

impl AttrValue {
    /// Borrow the value as a string, if it is a single value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Single(s) => Some(s),
            AttrValue::List(_) => None,
        }
    }

    /// Tokens of this value. A single value is split on ASCII whitespace.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            AttrValue::Single(s) => s.split_ascii_whitespace().collect(),
            AttrValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Single(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Single(value)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(items: Vec<&str>) -> Self {
        AttrValue::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Attribute collection of one element
///
/// Backed by a `BTreeMap`, so two maps with the same entries compare and hash
/// equal regardless of source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, AttrValue>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Option<AttrValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Insert a raw attribute as it appears in markup on `element`.
    ///
    /// The first occurrence of a name wins, matching the HTML tokenizer.
    pub fn insert_raw(&mut self, element: &str, name: &str, raw: &str) {
        if self.0.contains_key(name) {
            return;
        }
        let value = if is_token_list(element, name) {
            AttrValue::List(raw.split_ascii_whitespace().map(str::to_string).collect())
        } else {
            AttrValue::Single(raw.to_string())
        };
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Whether `name` on `element` is a whitespace-separated token list
fn is_token_list(element: &str, name: &str) -> bool {
    match name {
        "class" | "accesskey" | "dropzone" => true,
        "rel" | "rev" => matches!(element, "a" | "link" | "area"),
        "headers" => matches!(element, "td" | "th"),
        "accept-charset" => element == "form",
        "archive" => element == "object",
        "sizes" => element == "icon",
        "sandbox" => element == "iframe",
        "for" => element == "output",
        _ => false,
    }
}
