//! Content Store - Deduplicate payloads into content-addressed ids
//!
//! Text runs, doctype strings, comment strings and attribute maps are each
//! stored once per distinct value and referenced by id. Every kind has its
//! own table and its own id sequence (`t1`, `d1`, `c1`, `a1`, ...).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sg_html::AttributeMap;

/// Payload kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentKind {
    Text,
    Doctype,
    Comment,
    Attributes,
}

impl ContentKind {
    fn prefix(self) -> char {
        match self {
            ContentKind::Text => 't',
            ContentKind::Doctype => 'd',
            ContentKind::Comment => 'c',
            ContentKind::Attributes => 'a',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            't' => Some(ContentKind::Text),
            'd' => Some(ContentKind::Doctype),
            'c' => Some(ContentKind::Comment),
            'a' => Some(ContentKind::Attributes),
            _ => None,
        }
    }
}

/// Content-addressed identifier, unique per (kind, payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId {
    kind: ContentKind,
    index: u32,
}

impl ContentId {
    pub fn new(kind: ContentKind, index: u32) -> Self {
        Self { kind, index }
    }

    pub fn kind(self) -> ContentKind {
        self.kind
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.index)
    }
}

/// Error parsing a rendered content id
#[derive(Debug, thiserror::Error)]
#[error("Invalid content id: {0:?}")]
pub struct InvalidContentId(String);

impl FromStr for ContentId {
    type Err = InvalidContentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let kind = chars.next().and_then(ContentKind::from_prefix);
        let index = chars.as_str().parse::<u32>().ok();
        match (kind, index) {
            (Some(kind), Some(index)) if index > 0 => Ok(Self { kind, index }),
            _ => Err(InvalidContentId(s.to_string())),
        }
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Borrowed payload to intern
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Text(&'a str),
    Doctype(&'a str),
    Comment(&'a str),
    Attributes(&'a AttributeMap),
}

/// One table: id -> value, plus the reverse index used for dedup
#[derive(Debug, Clone)]
struct Table<T: Eq + Hash> {
    kind: ContentKind,
    entries: BTreeMap<ContentId, T>,
    index: HashMap<T, ContentId>,
    next: u32,
}

impl<T: Eq + Hash + Clone> Table<T> {
    fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
            index: HashMap::new(),
            next: 1,
        }
    }

    /// Rebuild a table; `next` never drops below a saved counter, so ids freed
    /// by `retain` before a save stay retired after a reload
    fn from_entries(kind: ContentKind, entries: BTreeMap<ContentId, T>, saved_next: u32) -> Self {
        let next = entries.keys().map(|id| id.index + 1).fold(saved_next.max(1), u32::max);
        let index = entries.iter().map(|(id, v)| (v.clone(), *id)).collect();
        Self { kind, entries, index, next }
    }

    fn intern<Q>(&mut self, value: &Q) -> ContentId
    where
        T: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = T> + ?Sized,
    {
        if let Some(&id) = self.index.get(value) {
            return id;
        }
        let id = ContentId::new(self.kind, self.next);
        self.next += 1;
        let owned = value.to_owned();
        self.entries.insert(id, owned.clone());
        self.index.insert(owned, id);
        id
    }

    fn retain(&mut self, keep: &HashSet<ContentId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| keep.contains(id));
        self.index.retain(|_, id| keep.contains(id));
        before - self.entries.len()
    }
}

/// Deduplicating store for all immutable node payloads
///
/// Interning is check-then-insert; callers sharing a store across threads
/// must hold one lock around each call (the graph builder does).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ContentTables", into = "ContentTables")]
pub struct ContentStore {
    texts: Table<String>,
    doctypes: Table<String>,
    comments: Table<String>,
    attributes: Table<AttributeMap>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self {
            texts: Table::new(ContentKind::Text),
            doctypes: Table::new(ContentKind::Doctype),
            comments: Table::new(ContentKind::Comment),
            attributes: Table::new(ContentKind::Attributes),
        }
    }

    /// Intern a payload, returning the existing id for an equal payload
    pub fn intern(&mut self, payload: Payload<'_>) -> ContentId {
        match payload {
            Payload::Text(s) => self.texts.intern(s),
            Payload::Doctype(s) => self.doctypes.intern(s),
            Payload::Comment(s) => self.comments.intern(s),
            Payload::Attributes(map) => self.attributes.intern(map),
        }
    }

    pub fn text(&self, id: ContentId) -> Option<&str> {
        self.texts.entries.get(&id).map(String::as_str)
    }

    pub fn doctype(&self, id: ContentId) -> Option<&str> {
        self.doctypes.entries.get(&id).map(String::as_str)
    }

    pub fn comment(&self, id: ContentId) -> Option<&str> {
        self.comments.entries.get(&id).map(String::as_str)
    }

    pub fn attributes(&self, id: ContentId) -> Option<&AttributeMap> {
        self.attributes.entries.get(&id)
    }

    /// Whether `id` resolves to a payload
    pub fn contains(&self, id: ContentId) -> bool {
        match id.kind {
            ContentKind::Text => self.texts.entries.contains_key(&id),
            ContentKind::Doctype => self.doctypes.entries.contains_key(&id),
            ContentKind::Comment => self.comments.entries.contains_key(&id),
            ContentKind::Attributes => self.attributes.entries.contains_key(&id),
        }
    }

    /// Number of payloads of one kind
    pub fn len(&self, kind: ContentKind) -> usize {
        match kind {
            ContentKind::Text => self.texts.entries.len(),
            ContentKind::Doctype => self.doctypes.entries.len(),
            ContentKind::Comment => self.comments.entries.len(),
            ContentKind::Attributes => self.attributes.entries.len(),
        }
    }

    /// Total number of payloads across all kinds
    pub fn total(&self) -> usize {
        self.texts.entries.len()
            + self.doctypes.entries.len()
            + self.comments.entries.len()
            + self.attributes.entries.len()
    }

    pub fn attribute_ids(&self) -> impl Iterator<Item = ContentId> + '_ {
        self.attributes.entries.keys().copied()
    }

    /// Drop every payload of `kind` whose id is not in `keep`.
    ///
    /// Returns the number of payloads removed. Ids are never handed out again.
    pub fn retain(&mut self, kind: ContentKind, keep: &HashSet<ContentId>) -> usize {
        match kind {
            ContentKind::Text => self.texts.retain(keep),
            ContentKind::Doctype => self.doctypes.retain(keep),
            ContentKind::Comment => self.comments.retain(keep),
            ContentKind::Attributes => self.attributes.retain(keep),
        }
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized form: one id -> payload map per kind
#[derive(Serialize, Deserialize)]
struct ContentTables {
    texts: BTreeMap<ContentId, String>,
    doctypes: BTreeMap<ContentId, String>,
    comments: BTreeMap<ContentId, String>,
    attributes: BTreeMap<ContentId, AttributeMap>,
    /// Next unassigned index per kind; absent in older snapshots
    #[serde(default)]
    next: NextIds,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct NextIds {
    texts: u32,
    doctypes: u32,
    comments: u32,
    attributes: u32,
}

impl From<ContentStore> for ContentTables {
    fn from(store: ContentStore) -> Self {
        Self {
            next: NextIds {
                texts: store.texts.next,
                doctypes: store.doctypes.next,
                comments: store.comments.next,
                attributes: store.attributes.next,
            },
            texts: store.texts.entries,
            doctypes: store.doctypes.entries,
            comments: store.comments.entries,
            attributes: store.attributes.entries,
        }
    }
}

impl From<ContentTables> for ContentStore {
    fn from(tables: ContentTables) -> Self {
        Self {
            texts: Table::from_entries(ContentKind::Text, tables.texts, tables.next.texts),
            doctypes: Table::from_entries(ContentKind::Doctype, tables.doctypes, tables.next.doctypes),
            comments: Table::from_entries(ContentKind::Comment, tables.comments, tables.next.comments),
            attributes: Table::from_entries(ContentKind::Attributes, tables.attributes, tables.next.attributes),
        }
    }
}
