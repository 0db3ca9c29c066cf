//! sitegraph Graph
//!
//! Decomposes a corpus of parsed HTML documents into a single deduplicated
//! DAG. Payloads live once in a `ContentStore`, identical subtrees collapse to
//! one node via `SubtreeHasher` digests, and the `Unwrapper` strips wrapper
//! `div`s while keeping every ancestor connected to its descendants.

mod builder;
mod condense;
mod content;
mod digest;
mod node;
mod unwrap;
mod validate;

pub use builder::{BuildError, BuildReport, DocumentFailure, DocumentSummary, GraphBuilder, PreparedDocument};
pub use condense::{CondenseOptions, CondenseReport, Condenser};
pub use content::{ContentId, ContentKind, ContentStore, InvalidContentId, Payload};
pub use digest::{Digest, SubtreeHasher};
pub use node::{Edge, EdgeKey, Graph, IntegrityError, Node, NodeId, NodeKind, Relationship};
pub use unwrap::{AttributePredicate, Expected, UnwrapOutcome, Unwrapper, WRAPPER_TAG, default_targets};
pub use validate::{ValidationReport, validate};
