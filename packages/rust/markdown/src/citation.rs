//! Citation extraction: a read-only walk over parsed links.

use comrak::nodes::{AstNode, NodeLink, NodeValue};
use tracing::debug;

use chatmark_shared::Citation;

/// Title used when a link has neither a title attribute nor text.
const FALLBACK_TITLE: &str = "Source";

/// URL schemes that denote actions rather than sources.
const ACTION_SCHEMES: [&str; 3] = ["mailto:", "tel:", "javascript:"];

/// Collect citations from every source link in document order.
///
/// Positions come from one running counter: each text node advances it by its
/// character length and each accepted link by one.
pub fn extract_citations<'a>(root: &'a AstNode<'a>) -> Vec<Citation> {
    let mut visitor = CitationVisitor::default();
    visitor.visit(root);
    debug!(count = visitor.citations.len(), "extracted citations");
    visitor.citations
}

#[derive(Default)]
struct CitationVisitor {
    citations: Vec<Citation>,
    position: usize,
}

impl CitationVisitor {
    fn visit<'a>(&mut self, node: &'a AstNode<'a>) {
        match &node.data.borrow().value {
            NodeValue::Link(link) => self.visit_link(node, link),
            NodeValue::Text(text) => self.position += text.chars().count(),
            _ => {}
        }

        for child in node.children() {
            self.visit(child);
        }
    }

    fn visit_link<'a>(&mut self, node: &'a AstNode<'a>, link: &NodeLink) {
        if !is_source_url(&link.url) {
            return;
        }

        match Citation::new(link.url.clone(), link_title(node, link), "", self.position) {
            Ok(citation) => {
                self.citations.push(citation);
                self.position += 1;
            }
            Err(e) => debug!(url = %link.url, error = %e, "skipping link"),
        }
    }
}

fn is_source_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    !lower.is_empty() && !ACTION_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

/// Explicit title, else the link's direct text children, else [`FALLBACK_TITLE`].
fn link_title<'a>(node: &'a AstNode<'a>, link: &NodeLink) -> String {
    if !link.title.trim().is_empty() {
        return link.title.clone();
    }

    let text: String = node
        .children()
        .filter_map(|child| match &child.data.borrow().value {
            NodeValue::Text(text) => Some(text.clone()),
            _ => None,
        })
        .collect();

    let text = text.trim();
    if text.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        text.to_string()
    }
}
