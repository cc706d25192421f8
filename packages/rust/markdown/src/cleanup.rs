//! AST cleanup: strip stray `[n]` citation markers from prose.
//!
//! Code spans, code blocks, raw HTML, links and images are never touched.

use comrak::nodes::{AstNode, NodeValue};

const MAX_CITATION_DIGITS: usize = 3;

/// Whether a text run starts or ends its line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RunEdges {
    pub start: bool,
    pub end: bool,
}

/// Remove bracket-numeral citation markers from every prose text node under `root`.
///
/// Adjacent text siblings are treated as one run so a marker split across
/// nodes by the parser is still recognized.
pub(crate) fn strip_citation_brackets<'a>(root: &'a AstNode<'a>) {
    let mut child = root.first_child();
    while let Some(current) = child {
        child = current.next_sibling();

        if is_protected(current) {
            continue;
        }

        let Some(mut merged) = text_of(current) else {
            strip_citation_brackets(current);
            continue;
        };

        let mut run = Vec::new();
        while let Some(next) = child {
            let Some(text) = text_of(next) else {
                break;
            };
            merged.push_str(&text);
            run.push(next);
            child = next.next_sibling();
        }

        let edges = RunEdges {
            start: is_line_edge(current.previous_sibling()),
            end: is_line_edge(child),
        };
        let cleaned = remove_bracket_numbers(&merged, edges);
        if cleaned != merged {
            if let NodeValue::Text(ref mut text) = current.data.borrow_mut().value {
                *text = cleaned;
            }
            for node in run {
                node.detach();
            }
        }
    }
}

fn is_protected<'a>(node: &'a AstNode<'a>) -> bool {
    matches!(
        node.data.borrow().value,
        NodeValue::Code(_)
            | NodeValue::CodeBlock(_)
            | NodeValue::HtmlInline(_)
            | NodeValue::HtmlBlock(_)
            | NodeValue::Link(_)
            | NodeValue::Image(_)
    )
}

/// No sibling, or a line break, on this side of a run.
fn is_line_edge<'a>(sibling: Option<&'a AstNode<'a>>) -> bool {
    sibling.is_none_or(|node| {
        matches!(
            node.data.borrow().value,
            NodeValue::SoftBreak | NodeValue::LineBreak
        )
    })
}

fn text_of<'a>(node: &'a AstNode<'a>) -> Option<String> {
    match &node.data.borrow().value {
        NodeValue::Text(text) => Some(text.clone()),
        _ => None,
    }
}

/// Remove `[1]`-style markers (1 to 3 ASCII digits) that stand alone.
///
/// A marker is removed only when neither neighbour is alphanumeric, so
/// `array[2]` and `foo[12]bar` survive. One adjacent space collapses with it:
/// spaces after the marker are skipped when a space precedes it, and a space
/// before closing punctuation is dropped. At a line edge in `edges` the spaces
/// between the marker and that edge go too.
pub(crate) fn remove_bracket_numbers(text: &str, edges: RunEdges) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    while cursor < chars.len() {
        if let Some(close) = citation_close(&chars, cursor) {
            let before_ok = cursor == 0 || !chars[cursor - 1].is_alphanumeric();
            let after_ok = chars.get(close + 1).is_none_or(|c| !c.is_alphanumeric());

            if before_ok && after_ok {
                cursor = close + 1;
                if edges.start && out.trim_start_matches(' ').is_empty() {
                    out.clear();
                    while chars.get(cursor) == Some(&' ') {
                        cursor += 1;
                    }
                } else if out.ends_with(' ') {
                    match chars.get(cursor) {
                        Some(' ') => {
                            while chars.get(cursor) == Some(&' ') {
                                cursor += 1;
                            }
                        }
                        Some('.' | ',' | ';' | ':' | '!' | '?' | ')') => {
                            out.pop();
                        }
                        _ => {}
                    }
                }
                if edges.end && chars[cursor..].iter().all(|&c| c == ' ') {
                    let kept = out.trim_end_matches(' ').len();
                    out.truncate(kept);
                    cursor = chars.len();
                }
                continue;
            }
        }

        out.push(chars[cursor]);
        cursor += 1;
    }

    out
}

/// Index of the `]` closing a `[digits]` marker opened at `open`.
fn citation_close(chars: &[char], open: usize) -> Option<usize> {
    if chars.get(open) != Some(&'[') {
        return None;
    }
    let digits = chars[open + 1..]
        .iter()
        .take(MAX_CITATION_DIGITS)
        .take_while(|c| c.is_ascii_digit())
        .count();
    let close = open + 1 + digits;
    (digits > 0 && chars.get(close) == Some(&']')).then_some(close)
}

#[cfg(test)]
mod tests {
    use comrak::Arena;
    use rstest::rstest;

    use super::*;
    use crate::engine::MarkdownEngine;

    #[rstest]
    #[case("See docs [3].", "See docs.")]
    #[case("See the docs[1].", "See the docs[1].")]
    #[case("Also check array[2] access.", "Also check array[2] access.")]
    #[case("foo[12]bar", "foo[12]bar")]
    #[case("Claims [1] and [2] hold", "Claims and hold")]
    #[case("Numbers [1][2] stacked", "Numbers stacked")]
    #[case("(see [7])", "(see)")]
    #[case("Too long [1234] stays", "Too long [1234] stays")]
    #[case("Empty [] stays", "Empty [] stays")]
    #[case("café [1] ok", "café ok")]
    #[case("[9]", "")]
    fn remove_bracket_numbers_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(remove_bracket_numbers(input, RunEdges::default()), expected);
    }

    #[rstest]
    #[case(RunEdges { start: true, end: true }, "Start of text and end")]
    #[case(RunEdges { start: true, end: false }, "Start of text and end ")]
    #[case(RunEdges { start: false, end: true }, " Start of text and end")]
    #[case(RunEdges::default(), " Start of text and end ")]
    fn markers_at_line_edges_take_their_spaces(#[case] edges: RunEdges, #[case] expected: &str) {
        assert_eq!(
            remove_bracket_numbers("[1] Start of text and end [2]", edges),
            expected
        );
    }

    #[test]
    fn edges_without_markers_keep_spaces() {
        let edges = RunEdges { start: true, end: true };
        assert_eq!(remove_bracket_numbers(" kept ", edges), " kept ");
    }

    fn strip_and_render(markdown: &str) -> String {
        let engine = MarkdownEngine::new(true);
        let arena = Arena::new();
        let root = engine.parse(&arena, markdown).unwrap();
        strip_citation_brackets(root);
        engine.render(root).unwrap()
    }

    #[test]
    fn code_and_links_are_left_alone() {
        let html = strip_and_render(
            "See docs [3] and `code [4]` plus [link [5]](https://x.test).",
        );
        assert_eq!(
            html,
            "<p>See docs and <code>code [4]</code> plus <a href=\"https://x.test\">link [5]</a>.</p>\n"
        );
    }

    #[test]
    fn fenced_code_is_left_alone() {
        let html = strip_and_render("```\narr [1]\n```");
        assert!(html.contains("arr [1]"));
    }

    #[test]
    fn markers_at_paragraph_edges_leave_no_spaces() {
        assert_eq!(
            strip_and_render("[1] Start of text and end [2]"),
            "<p>Start of text and end</p>\n"
        );
        assert_eq!(
            strip_and_render("First line [1]\n[2] second line"),
            "<p>First line<br />\nsecond line</p>\n"
        );
    }

    #[test]
    fn markers_inside_emphasis_are_stripped() {
        let html = strip_and_render("*claim [2] here*");
        assert_eq!(html, "<p><em>claim here</em></p>\n");
    }
}
