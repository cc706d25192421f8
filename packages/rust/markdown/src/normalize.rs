//! Pre-parse repair of generated markdown.
//!
//! Two passes over the text:
//! 1. Fence repair: force openers onto their own line, move prose glued to a
//!    closer onto the next block, close a fence left open at end of input.
//! 2. Header scope: indent continuation prose under `1. Header` lines so it
//!    stays inside the list item instead of breaking out as a new block.
//!
//! Both passes leave fenced code untouched and the composition is idempotent.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::fence::{
    FENCE_MIN_LENGTH, FenceMarker, FenceTracker, is_line_start, same_line_closer, scan_fence_marker,
    scan_fence_opener,
};
use crate::marker::starts_with_ordered_marker;

/// Width continuation lines are indented to under a numeric header.
const CONTINUATION_INDENT: &str = "    ";

/// Result of [`normalize_with_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    /// The input ended inside a fence and a closer was appended.
    pub closed_unterminated_fence: bool,
}

/// Normalize markdown for parsing. See the module docs for the passes applied.
pub fn normalize(markdown: &str) -> String {
    normalize_with_report(markdown).text
}

/// [`normalize`], also reporting whether an unterminated fence was closed.
pub fn normalize_with_report(markdown: &str) -> Normalized {
    if markdown.is_empty() {
        return Normalized {
            text: String::new(),
            closed_unterminated_fence: false,
        };
    }

    let unified = markdown.replace("\r\n", "\n");
    let (repaired, closed_unterminated_fence) = repair_fences(&unified);
    let text = indent_under_numeric_headers(&repaired);

    debug!(
        input_len = markdown.len(),
        output_len = text.len(),
        closed_unterminated_fence,
        "normalized markdown"
    );

    Normalized {
        text,
        closed_unterminated_fence,
    }
}

// ---------------------------------------------------------------------------
// Pass 1: fence repair
// ---------------------------------------------------------------------------

fn repair_fences(text: &str) -> (String, bool) {
    let mut out = String::with_capacity(text.len() + 64);
    let mut tracker = FenceTracker::new();
    let mut cursor = 0;

    while cursor < text.len() {
        if let Some(marker) = scan_fence_marker(text, cursor) {
            if !tracker.inside_fence() {
                // "```ls```" closes on its own line: inline code, copied as is
                if let Some(end) = same_line_closer(text, cursor, marker) {
                    out.push_str(&text[cursor..end]);
                    cursor = end;
                    continue;
                }

                open_fence_on_own_line(&mut out);
                tracker.enter_fence(marker);
                out.push_str(&text[cursor..cursor + marker.len]);
                cursor += marker.len;

                let info_len = text[cursor..]
                    .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
                    .unwrap_or(text.len() - cursor);
                out.push_str(&text[cursor..cursor + info_len]);
                cursor += info_len;

                if text[cursor..].chars().next().is_some_and(|c| c != '\n') {
                    out.push('\n');
                }
                continue;
            }

            if is_line_start(text, cursor) && tracker.would_close_fence(marker) {
                tracker.exit_fence();
                out.push_str(&text[cursor..cursor + marker.len]);
                cursor += marker.len;

                // prose glued to the closer starts a new block
                if text[cursor..].chars().next().is_some_and(|c| c != '\n') {
                    out.push_str("\n\n");
                }
                continue;
            }
        }

        let Some(ch) = text[cursor..].chars().next() else {
            break;
        };
        out.push(ch);
        cursor += ch.len_utf8();
    }

    let unterminated = tracker.open_fence();
    if let Some(open) = unterminated {
        let closer = FenceMarker {
            ch: open.ch,
            len: open.len.max(FENCE_MIN_LENGTH),
        };
        out.push('\n');
        out.push_str(&closer.to_text());
    }

    (out, unterminated.is_some())
}

/// Ensure the fence about to be written starts after a blank line.
///
/// Indentation already written on the current line is kept in front of the
/// fence so list-item fences stay inside their item.
fn open_fence_on_own_line(out: &mut String) {
    let line_start = out.rfind('\n').map_or(0, |i| i + 1);
    let prefix = &out[line_start..];
    let indent = (!prefix.is_empty() && prefix.chars().all(|c| c == ' ' || c == '\t'))
        .then(|| prefix.to_string());

    if let Some(indent) = &indent {
        out.truncate(line_start);
        ensure_blank_line(out);
        out.push_str(indent);
    } else {
        ensure_blank_line(out);
    }
}

fn ensure_blank_line(out: &mut String) {
    if out.is_empty() {
        return;
    }
    if !out.ends_with('\n') {
        out.push_str("\n\n");
    } else if out.len() > 1 && !out.ends_with("\n\n") {
        out.push('\n');
    }
}

// ---------------------------------------------------------------------------
// Pass 2: numeric header scope
// ---------------------------------------------------------------------------

fn indent_under_numeric_headers(text: &str) -> String {
    static HEADER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[0-9]{1,3}[.)] ").expect("valid regex"));

    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut tracker = FenceTracker::new();
    let mut in_header_scope = false;

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();

        let marker = if tracker.inside_fence() {
            scan_fence_marker(trimmed, 0)
        } else {
            scan_fence_opener(trimmed, 0)
        };
        let fence_line = match marker {
            Some(marker) => {
                if !tracker.inside_fence() {
                    tracker.enter_fence(marker);
                } else if tracker.would_close_fence(marker) {
                    tracker.exit_fence();
                }
                true
            }
            None => false,
        };
        let code_line = fence_line || tracker.inside_fence();

        if !code_line && HEADER_RE.is_match(trimmed) {
            in_header_scope = true;
            out.push((*line).to_string());
        } else if in_header_scope && !code_line && should_indent(trimmed) {
            out.push(indent_continuation(line, trimmed));
        } else {
            out.push((*line).to_string());
        }

        // two blank lines in a row end the section
        if in_header_scope
            && line.trim().is_empty()
            && lines.get(index + 1).is_some_and(|next| next.trim().is_empty())
        {
            in_header_scope = false;
        }
    }

    out.join("\n")
}

/// Continuation prose only. List markers already carry their own structure.
fn should_indent(trimmed: &str) -> bool {
    let Some(first) = trimmed.chars().next() else {
        return false;
    };
    !matches!(first, '-' | '*' | '+' | '•') && !starts_with_ordered_marker(trimmed)
}

/// Bring the line to at least four columns of indentation.
fn indent_continuation(line: &str, trimmed: &str) -> String {
    let width: usize = line[..line.len() - trimmed.len()]
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();
    if width >= CONTINUATION_INDENT.len() {
        line.to_string()
    } else {
        format!("{CONTINUATION_INDENT}{trimmed}")
    }
}
