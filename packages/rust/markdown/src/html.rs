//! DOM post-processing of rendered HTML.
//!
//! The fragment is parsed with `scraper` and written back out by a small
//! serializer that applies the rewrites on the way:
//! - `markdown-table` / `markdown-quote` class hooks,
//! - removal of paragraphs holding only `{` or `}`,
//! - inline list recovery for plain-text paragraphs.
//!
//! Paragraphs inside `<pre>`, `<code>` or an enrichment card are never rewritten.

use scraper::{ElementRef, Html, Node};

use crate::inline_list::{Conversion, ListBlock, try_convert};

const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const ENRICHMENT_CLASS: &str = "inline-enrichment";

/// Apply the DOM rewrites, then collapse blank lines outside code and trim.
pub fn post_process(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len() + 64);
    write_children(fragment.root_element(), false, &mut out);
    collapse_newlines(&out).trim().to_string()
}

// ---------------------------------------------------------------------------
// Serializer
// ---------------------------------------------------------------------------

fn write_children(parent: ElementRef<'_>, protected: bool, out: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => escape_text(text, out),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(element, protected, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, protected: bool, out: &mut String) {
    let name = element.value().name();

    if name == "p" && !protected && rewrite_paragraph(element, out) {
        return;
    }

    let hook_class = match name {
        "table" => Some("markdown-table"),
        "blockquote" => Some("markdown-quote"),
        _ => None,
    };

    out.push('<');
    out.push_str(name);
    let mut class_written = false;
    for (attr, value) in element.value().attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_attr(value, out);
        if attr == "class" {
            if let Some(hook) = hook_class {
                out.push(' ');
                out.push_str(hook);
            }
            class_written = true;
        }
        out.push('"');
    }
    if let (Some(hook), false) = (hook_class, class_written) {
        out.push_str(" class=\"");
        out.push_str(hook);
        out.push('"');
    }

    if VOID_ELEMENTS.contains(&name) {
        out.push_str(" />");
        return;
    }
    out.push('>');

    let protected = protected
        || matches!(name, "pre" | "code")
        || element.value().classes().any(|class| class == ENRICHMENT_CLASS);
    write_children(element, protected, out);

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Drop brace-only paragraphs and expand flattened lists.
/// Returns true when the paragraph was replaced (or removed).
fn rewrite_paragraph(paragraph: ElementRef<'_>, out: &mut String) -> bool {
    let text: String = paragraph.text().collect();
    if matches!(text.trim(), "{" | "}") {
        return true;
    }

    let plain_text = paragraph.children().all(|child| !child.value().is_element());
    if !plain_text || text.trim().is_empty() {
        return false;
    }

    match try_convert(&text) {
        Some(conversion) => {
            write_conversion(&conversion, out);
            true
        }
        None => false,
    }
}

fn write_conversion(conversion: &Conversion, out: &mut String) {
    if !conversion.leading_text.trim().is_empty() {
        write_text_paragraph(&conversion.leading_text, out);
        out.push('\n');
    }
    write_list(&conversion.primary, out);
    for nested in &conversion.nested {
        out.push('\n');
        write_list(nested, out);
    }
    if !conversion.trailing_text.trim().is_empty() {
        out.push('\n');
        write_text_paragraph(&conversion.trailing_text, out);
    }
}

fn write_text_paragraph(text: &str, out: &mut String) {
    out.push_str("<p>");
    escape_text(text, out);
    out.push_str("</p>");
}

fn write_list(block: &ListBlock, out: &mut String) {
    let tag = block.tag.tag_name();
    out.push('<');
    out.push_str(tag);
    out.push('>');
    for item in &block.items {
        out.push_str("<li>");
        escape_text(item, out);
        out.push_str("</li>");
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

// ---------------------------------------------------------------------------
// Newline collapse
// ---------------------------------------------------------------------------

/// Collapse runs of newlines to one, except inside `<pre>` and `<code>`.
fn collapse_newlines(html: &str) -> String {
    let mut collapsed = String::with_capacity(html.len());
    let mut pre_depth = 0usize;
    let mut code_depth = 0usize;
    let mut last_was_newline = false;

    for (index, ch) in html.char_indices() {
        if ch == '<' {
            let ahead: Vec<u8> = html.as_bytes()[index..]
                .iter()
                .take(7)
                .map(u8::to_ascii_lowercase)
                .collect();
            if ahead.starts_with(b"<pre>") || ahead.starts_with(b"<pre ") {
                pre_depth += 1;
            } else if ahead.starts_with(b"</pre>") {
                pre_depth = pre_depth.saturating_sub(1);
            } else if ahead.starts_with(b"<code>") || ahead.starts_with(b"<code ") {
                code_depth += 1;
            } else if ahead.starts_with(b"</code>") {
                code_depth = code_depth.saturating_sub(1);
            }
        }

        if ch == '\n' && pre_depth == 0 && code_depth == 0 {
            if !last_was_newline {
                collapsed.push(ch);
            }
            last_was_newline = true;
        } else {
            collapsed.push(ch);
            last_was_newline = false;
        }
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn tables_and_quotes_get_hook_classes() {
        let html = post_process("<table><tr><td>1</td></tr></table>\n<blockquote>\n<p>q</p>\n</blockquote>");
        assert!(html.contains(r#"<table class="markdown-table">"#));
        assert!(html.contains(r#"<blockquote class="markdown-quote">"#));
    }

    #[test]
    fn existing_class_is_extended() {
        let html = post_process(r#"<table class="wide"><tr><td>1</td></tr></table>"#);
        assert!(html.contains(r#"<table class="wide markdown-table">"#));
    }

    #[rstest]
    #[case("<p>{</p>\n<p>text</p>\n<p> } </p>", "<p>text</p>")]
    #[case("<pre><code>{\n}</code></pre>", "<pre><code>{\n}</code></pre>")]
    fn brace_only_paragraphs(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(post_process(input), expected);
    }

    #[test]
    fn brace_paragraph_inside_enrichment_is_kept() {
        let input = r#"<div class="inline-enrichment hint"><div class="enrichment-text"><p>}</p></div></div>"#;
        assert_eq!(post_process(input), input);
    }

    #[test]
    fn plain_paragraph_becomes_list() {
        let html = post_process("<p>Key points: 1. First. 2. Second.</p>\n");
        assert_eq!(html, "<p>Key points:</p>\n<ol><li>First</li><li>Second</li></ol>");
    }

    #[test]
    fn paragraph_with_markup_is_not_converted() {
        let input = "<p>Key points: 1. <em>First</em> 2. Second</p>";
        assert_eq!(post_process(input), input);
    }

    #[test]
    fn enrichment_paragraphs_are_not_converted() {
        let input = r#"<div class="inline-enrichment example"><p>Steps: 1. one 2. two</p></div>"#;
        assert_eq!(post_process(input), input);
    }

    #[test]
    fn converted_text_is_escaped() {
        let html = post_process("<p>Compare: - a &lt; b - c &amp; d</p>");
        assert_eq!(html, "<p>Compare:</p>\n<ul><li>a &lt; b</li><li>c &amp; d</li></ul>");
    }

    #[rstest]
    #[case(r#"<p>a<br />b</p><p><img src="x.png" /></p>"#)]
    #[case(r#"<p><a title="say &quot;hi&quot;">x</a></p>"#)]
    fn void_elements_and_attributes_round_trip(#[case] input: &str) {
        assert_eq!(post_process(input), input);
    }

    #[test]
    fn newlines_collapse_outside_code_only() {
        let html = post_process("<p>a</p>\n\n\n<pre><code>x\n\n\ny</code></pre>\n\n<p>b</p>\n");
        assert_eq!(html, "<p>a</p>\n<pre><code>x\n\n\ny</code></pre>\n<p>b</p>");
    }
}
