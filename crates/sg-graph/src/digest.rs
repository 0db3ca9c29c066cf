//! Subtree Hasher - Merkle-style structural digests
//!
//! A digest covers a node's kind, name, attributes, payload and the digests of
//! its children, so identical subtrees hash identically wherever they occur.
//! Inputs are encoded with a kind byte and length prefixes before hashing with
//! BLAKE3; no process-local value (pointer, node id) ever enters the hash.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sg_html::{AttrValue, AttributeMap};

/// 256-bit structural digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// Parse a 64-character hex rendering
    pub fn from_hex(hex: &str) -> Option<Self> {
        blake3::Hash::from_hex(hex).ok().map(|hash| Digest(*hash.as_bytes()))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..12])
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Digest::from_hex(&raw).ok_or_else(|| serde::de::Error::custom("invalid digest"))
    }
}

// Kind tags
const KIND_DOCTYPE: u8 = 1;
const KIND_COMMENT: u8 = 2;
const KIND_TEXT: u8 = 3;
const KIND_TAG: u8 = 4;

// Attribute value tags
const VALUE_SINGLE: u8 = 0;
const VALUE_LIST: u8 = 1;

/// Structural hasher for parsed elements
pub struct SubtreeHasher;

impl SubtreeHasher {
    pub fn doctype(content: &str) -> Digest {
        Self::leaf(KIND_DOCTYPE, content)
    }

    pub fn comment(content: &str) -> Digest {
        Self::leaf(KIND_COMMENT, content)
    }

    pub fn text(content: &str) -> Digest {
        Self::leaf(KIND_TEXT, content)
    }

    /// Digest of a tag from its name, attributes and positioned children.
    ///
    /// `children` pairs each surviving child's 1-based sibling position with
    /// its digest, so gaps left by skipped whitespace are part of the identity.
    pub fn tag(name: &str, attributes: &AttributeMap, children: &[(u32, Digest)]) -> Digest {
        let mut enc = Encoder::new(KIND_TAG);
        enc.bytes(name.as_bytes());

        enc.len(attributes.len());
        for (key, value) in attributes.iter() {
            enc.bytes(key.as_bytes());
            match value {
                AttrValue::Single(s) => {
                    enc.tag(VALUE_SINGLE);
                    enc.bytes(s.as_bytes());
                }
                AttrValue::List(items) => {
                    enc.tag(VALUE_LIST);
                    enc.len(items.len());
                    for item in items {
                        enc.bytes(item.as_bytes());
                    }
                }
            }
        }

        enc.len(children.len());
        for (order, digest) in children {
            enc.hasher.update(&order.to_le_bytes());
            enc.hasher.update(&digest.0);
        }
        enc.finish()
    }

    fn leaf(kind: u8, content: &str) -> Digest {
        let mut enc = Encoder::new(kind);
        enc.bytes(content.as_bytes());
        enc.finish()
    }
}

/// Length-prefixed encoding fed straight into the hasher
struct Encoder {
    hasher: blake3::Hasher,
}

impl Encoder {
    fn new(kind: u8) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[kind]);
        Self { hasher }
    }

    fn tag(&mut self, tag: u8) {
        self.hasher.update(&[tag]);
    }

    fn len(&mut self, len: usize) {
        self.hasher.update(&(len as u64).to_le_bytes());
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.len(bytes.len());
        self.hasher.update(bytes);
    }

    fn finish(self) -> Digest {
        Digest(self.hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_matches_blake3_rendering() {
        let hash = blake3::hash(b"sitegraph");
        let digest = Digest(*hash.as_bytes());
        assert_eq!(digest.to_hex(), hash.to_hex().as_str());
        assert_eq!(Digest::from_hex(&digest.to_hex()), Some(digest));
        assert_eq!(Digest::from_hex("abc"), None);
        assert_eq!(Digest::from_hex(&"zz".repeat(32)), None);
    }

    #[test]
    fn test_kind_separates_equal_payloads() {
        assert_ne!(SubtreeHasher::text("x"), SubtreeHasher::comment("x"));
        assert_ne!(SubtreeHasher::comment("x"), SubtreeHasher::doctype("x"));
    }

    #[test]
    fn test_length_prefix_prevents_shifting() {
        let a: AttributeMap = [("ab", "c")].into_iter().collect();
        let b: AttributeMap = [("a", "bc")].into_iter().collect();
        assert_ne!(SubtreeHasher::tag("div", &a, &[]), SubtreeHasher::tag("div", &b, &[]));
    }

    #[test]
    fn test_single_and_list_values_differ() {
        let single: AttributeMap = [("class", AttrValue::from("page"))].into_iter().collect();
        let list: AttributeMap = [("class", AttrValue::from(vec!["page"]))].into_iter().collect();
        assert_ne!(SubtreeHasher::tag("div", &single, &[]), SubtreeHasher::tag("div", &list, &[]));
    }

    #[test]
    fn test_child_positions_are_hashed() {
        let text = SubtreeHasher::text("A");
        let attrs = AttributeMap::new();
        assert_ne!(
            SubtreeHasher::tag("p", &attrs, &[(1, text)]),
            SubtreeHasher::tag("p", &attrs, &[(2, text)])
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let d = SubtreeHasher::text("hello");
        assert_eq!(Digest::from_hex(&d.to_hex()), Some(d));
        assert_eq!(Digest::from_hex("zz"), None);
    }
}
