//! HTML5 Parser implementation
//!
//! Uses html5ever's build-in RcDom and converts it to a `ParsedTree`.
//! Conversion walks the RcDom with an explicit stack, so nesting depth is
//! bounded by memory rather than by the call stack.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::{AttributeMap, ParseError, ParsedId, ParsedKind, ParsedTree};

/// HTML5 parser
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse an HTML string
    pub fn parse(&self, html: &str) -> Result<ParsedTree, ParseError> {
        self.parse_bytes(html.as_bytes())
    }

    /// Parse raw bytes; invalid UTF-8 is replaced, never rejected
    pub fn parse_bytes(&self, mut bytes: &[u8]) -> Result<ParsedTree, ParseError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut bytes)
            .map_err(ParseError::Io)?;

        let mut tree = ParsedTree::new();
        self.convert(&dom.document, &mut tree);

        let errors = dom.errors.borrow().len();
        if errors > 0 {
            tracing::debug!("html5ever recovered from {} parse errors", errors);
        }
        tree.set_recovered_errors(errors);

        tracing::trace!("Parsed {} nodes", tree.len());
        Ok(tree)
    }

    /// Convert the RcDom document into `tree`, children in document order
    fn convert(&self, document: &Handle, tree: &mut ParsedTree) {
        let mut stack: Vec<(Handle, ParsedId)> = Vec::new();
        push_children(&mut stack, document, ParsedId::ROOT);

        while let Some((handle, parent)) = stack.pop() {
            let kind = match &handle.data {
                RcNodeData::Document => continue,
                RcNodeData::Doctype { name, public_id, system_id } => {
                    ParsedKind::Doctype(render_doctype(name, public_id, system_id))
                }
                RcNodeData::Text { contents } => ParsedKind::Text(contents.borrow().to_string()),
                RcNodeData::Comment { contents } => ParsedKind::Comment(contents.to_string()),
                RcNodeData::Element { name, attrs, .. } => {
                    let tag: &str = &name.local;
                    let mut attributes = AttributeMap::new();
                    for attr in attrs.borrow().iter() {
                        attributes.insert_raw(tag, &attr.name.local, &attr.value);
                    }
                    ParsedKind::Element { name: tag.to_string(), attributes }
                }
                RcNodeData::ProcessingInstruction { .. } => ParsedKind::Other,
            };

            let Some(id) = tree.push_child(parent, kind) else {
                continue;
            };

            if let RcNodeData::Element { template_contents, .. } = &handle.data {
                // <template> keeps its markup in a detached fragment
                if let Some(contents) = template_contents.borrow().as_ref() {
                    push_children(&mut stack, contents, id);
                }
            }
            push_children(&mut stack, &handle, id);
        }
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Push children reversed so the first child is converted first
fn push_children(stack: &mut Vec<(Handle, ParsedId)>, handle: &Handle, parent: ParsedId) {
    for child in handle.children.borrow().iter().rev() {
        stack.push((child.clone(), parent));
    }
}

fn render_doctype(name: &str, public_id: &str, system_id: &str) -> String {
    let mut out = name.to_string();
    if !public_id.is_empty() {
        out.push_str(&format!(" PUBLIC \"{}\"", public_id));
        if !system_id.is_empty() {
            out.push_str(&format!(" \"{}\"", system_id));
        }
    } else if !system_id.is_empty() {
        out.push_str(&format!(" SYSTEM \"{}\"", system_id));
    }
    out
}
