//! Thin wrapper over comrak: one option set shared by the outer document and
//! every enrichment fragment.
//!
//! Parse and render run under `catch_unwind` so a panic inside the third-party
//! parser surfaces as a single [`ChatmarkError::Processing`].

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use comrak::nodes::AstNode;
use comrak::{Arena, Options, format_html, parse_document};

use chatmark_shared::{ChatmarkError, Result};

use crate::cleanup::strip_citation_brackets;
use crate::normalize::normalize;

/// Configured parser/renderer pair.
pub(crate) struct MarkdownEngine {
    options: Options,
}

impl MarkdownEngine {
    pub(crate) fn new(hard_breaks: bool) -> Self {
        let mut options = Options::default();
        options.extension.table = true;
        options.extension.strikethrough = true;
        options.extension.tasklist = true;
        options.extension.autolink = true;
        // Raw HTML is escaped. `unsafe_` stays off, which also blanks
        // javascript:, vbscript: and data: link targets.
        options.render.escape = true;
        options.render.hardbreaks = hard_breaks;
        Self { options }
    }

    /// Parse markdown into an AST allocated in `arena`.
    pub(crate) fn parse<'a>(
        &self,
        arena: &'a Arena<AstNode<'a>>,
        markdown: &str,
    ) -> Result<&'a AstNode<'a>> {
        catch_unwind(AssertUnwindSafe(|| {
            parse_document(arena, markdown, &self.options)
        }))
        .map_err(|payload| {
            ChatmarkError::processing("markdown parser panicked", panic_message(payload))
        })
    }

    /// Render an AST to HTML.
    pub(crate) fn render<'a>(&self, root: &'a AstNode<'a>) -> Result<String> {
        let mut buffer = Vec::new();
        catch_unwind(AssertUnwindSafe(|| {
            format_html(root, &self.options, &mut buffer)
        }))
        .map_err(|payload| {
            ChatmarkError::processing("html renderer panicked", panic_message(payload))
        })?
        .map_err(|e| ChatmarkError::processing("html renderer failed", e))?;

        String::from_utf8(buffer)
            .map_err(|e| ChatmarkError::processing("renderer produced invalid UTF-8", e))
    }

    /// Render a self-contained markdown fragment with the same passes as the
    /// outer document: normalize, parse, strip bracket citations, render.
    pub(crate) fn render_fragment(&self, markdown: &str) -> Result<String> {
        let arena = Arena::new();
        let root = self.parse(&arena, &normalize(markdown))?;
        strip_citation_brackets(root);
        self.render(root)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_gfm_extensions() {
        let engine = MarkdownEngine::new(true);
        let html = engine
            .render_fragment("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done")
            .unwrap();
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn raw_html_is_escaped() {
        let engine = MarkdownEngine::new(true);
        let html = engine.render_fragment("<script>alert(1)</script>").unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn dangerous_link_targets_are_suppressed() {
        let engine = MarkdownEngine::new(true);
        let html = engine.render_fragment("[x](javascript:alert(1))").unwrap();
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn hard_breaks_follow_config() {
        let with_breaks = MarkdownEngine::new(true).render_fragment("a\nb").unwrap();
        let without = MarkdownEngine::new(false).render_fragment("a\nb").unwrap();
        assert!(with_breaks.contains("<br />"));
        assert!(!without.contains("<br />"));
    }

    #[test]
    fn fragment_strips_citation_brackets() {
        let html = MarkdownEngine::new(true)
            .render_fragment("See the guide [2] for details.")
            .unwrap();
        assert_eq!(html, "<p>See the guide for details.</p>\n");
    }

    #[test]
    fn panic_message_reads_common_payloads() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic payload");
    }
}
