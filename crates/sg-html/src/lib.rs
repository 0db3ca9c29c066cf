//! sitegraph HTML Parser
//!
//! HTML5 parsing built on html5ever. Produces a `ParsedTree`: an arena of
//! doctype, comment, text and element nodes with attribute maps, in document
//! order, ready to be decomposed into a graph.

mod attributes;
mod parser;
mod tree;

pub use attributes::{AttrValue, AttributeMap};
pub use parser::HtmlParser;
pub use tree::{ParsedId, ParsedKind, ParsedNode, ParsedTree};

/// Parse an HTML string into a `ParsedTree`
pub fn parse(html: &str) -> Result<ParsedTree, ParseError> {
    HtmlParser::new().parse(html)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to read HTML input: {0}")]
    Io(#[from] std::io::Error),
}
