//! `{{kind: content}}` callouts.
//!
//! Each well-formed marker outside code is replaced by an opaque placeholder
//! token before the outer document is parsed, so fences or lists inside the
//! callout can never interfere with the surrounding markdown. The rendered card
//! is substituted back into the HTML afterwards.

use tracing::debug;
use uuid::Uuid;

use chatmark_shared::{Enrichment, EnrichmentKind, ProcessingWarning, Result, WarningKind};

use crate::engine::MarkdownEngine;
use crate::fence::FenceTracker;

const MARKER_START: &str = "{{";
const MARKER_END: &str = "}}";
const PLACEHOLDER_PREFIX: &str = "ENRICHMENT_";

/// Longest `{{token:` still treated as an attempted callout.
const MAX_KIND_TOKEN_LEN: usize = 32;

/// Output of [`extract`].
#[derive(Debug, Default)]
pub(crate) struct Extraction {
    /// Input with every extracted marker replaced by its token.
    pub text: String,
    pub enrichments: Vec<Enrichment>,
    pub placeholders: Placeholders,
    pub warnings: Vec<ProcessingWarning>,
}

/// Token to rendered card HTML, scoped to one processing call.
#[derive(Debug, Default)]
pub(crate) struct Placeholders {
    entries: Vec<(String, String)>,
}

impl Placeholders {
    /// Store `html` under a fresh unguessable token and return the token.
    fn insert(&mut self, html: String) -> String {
        let token = format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4().simple());
        self.entries.push((token.clone(), html));
        token
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(token, _)| token.as_str())
    }

    /// Swap every token in rendered HTML for its card, dropping the `<p>` the
    /// renderer wraps around a token that stood alone.
    pub(crate) fn reinsert(&self, html: &str) -> String {
        let mut rendered = html.to_string();
        for (token, card) in &self.entries {
            rendered = rendered.replace(&format!("<p>{token}</p>"), card);
            rendered = rendered.replace(token.as_str(), card);
        }
        rendered
    }
}

/// What a `{{` at the cursor turned out to be.
enum MarkerHead {
    Known { kind: EnrichmentKind, content_start: usize },
    Unknown(String),
    NotAMarker,
}

/// Extract callouts from normalized markdown.
pub(crate) fn extract(markdown: &str, engine: &MarkdownEngine) -> Result<Extraction> {
    let mut extraction = Extraction {
        text: String::with_capacity(markdown.len() + 64),
        ..Extraction::default()
    };
    let mut tracker = FenceTracker::new();
    let mut cursor = 0;
    // character offset, reported in enrichment and warning positions
    let mut position = 0;

    while cursor < markdown.len() {
        let span = tracker.advance(markdown, cursor);
        if span > 0 {
            let copied = &markdown[cursor..cursor + span];
            extraction.text.push_str(copied);
            position += copied.chars().count();
            cursor += span;
            continue;
        }

        if !tracker.inside_code() && markdown[cursor..].starts_with(MARKER_START) {
            match read_marker_head(markdown, cursor) {
                MarkerHead::Known {
                    kind,
                    content_start,
                } => match find_marker_end(markdown, content_start) {
                    Some(end) if inside_link_text(markdown, cursor, end + MARKER_END.len()) => {
                        extraction.warnings.push(ProcessingWarning::new(
                            format!("{} enrichment inside link text left as text", kind.token()),
                            WarningKind::NestedStructure,
                            position,
                        )?);
                    }
                    Some(end) => {
                        let content = markdown[content_start..end].trim();
                        if !content.is_empty() {
                            let enrichment = Enrichment::new(kind, content, position)?;
                            let card = render_card(engine, kind, content)?;
                            let token = extraction.placeholders.insert(card);
                            extraction.text.push_str(&token);
                            extraction.enrichments.push(enrichment);
                        }

                        let consumed = end + MARKER_END.len();
                        position += markdown[cursor..consumed].chars().count();
                        cursor = consumed;
                        continue;
                    }
                    None => extraction.warnings.push(ProcessingWarning::new(
                        format!("Unterminated {} enrichment left as text", kind.token()),
                        WarningKind::MalformedEnrichment,
                        position,
                    )?),
                },
                MarkerHead::Unknown(token) => extraction.warnings.push(ProcessingWarning::new(
                    format!("Unknown enrichment type: {token}"),
                    WarningKind::UnknownEnrichmentType,
                    position,
                )?),
                MarkerHead::NotAMarker => {}
            }
        }

        let Some(ch) = markdown[cursor..].chars().next() else {
            break;
        };
        extraction.text.push(ch);
        cursor += ch.len_utf8();
        position += 1;
    }

    debug!(
        enrichments = extraction.enrichments.len(),
        warnings = extraction.warnings.len(),
        "extracted enrichments"
    );
    Ok(extraction)
}

/// Classify the text between `{{` and the first `:`.
fn read_marker_head(markdown: &str, marker_start: usize) -> MarkerHead {
    let token_start = marker_start + MARKER_START.len();
    let Some(colon) = markdown[token_start..].find(':') else {
        return MarkerHead::NotAMarker;
    };
    let raw = &markdown[token_start..token_start + colon];

    if let Some(kind) = EnrichmentKind::from_token(raw) {
        return MarkerHead::Known {
            kind,
            content_start: token_start + colon + 1,
        };
    }

    let token = raw.trim();
    let looks_like_kind = !token.is_empty()
        && token.len() <= MAX_KIND_TOKEN_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if looks_like_kind {
        MarkerHead::Unknown(token.to_string())
    } else {
        MarkerHead::NotAMarker
    }
}

/// Byte index of the `}}` closing a marker whose content starts at `start`.
/// A `}}` inside a fence or inline code span does not count.
fn find_marker_end(markdown: &str, start: usize) -> Option<usize> {
    let mut tracker = FenceTracker::new();
    let mut scan = start;
    while scan < markdown.len() {
        let span = tracker.advance(markdown, scan);
        if span > 0 {
            scan += span;
            continue;
        }
        if !tracker.inside_code() && markdown[scan..].starts_with(MARKER_END) {
            return Some(scan);
        }
        scan += markdown[scan..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Whether `markdown[start..end]` sits between the brackets of an inline link.
fn inside_link_text(markdown: &str, start: usize, end: usize) -> bool {
    let bytes = markdown.as_bytes();

    let mut depth = 0usize;
    let mut opened = false;
    for (index, &byte) in bytes[..start].iter().enumerate().rev() {
        match byte {
            b'\n' if index > 0 && bytes[index - 1] == b'\n' => return false,
            b']' => depth += 1,
            b'[' if depth == 0 => {
                opened = true;
                break;
            }
            b'[' => depth -= 1,
            _ => {}
        }
    }
    if !opened {
        return false;
    }

    let mut depth = 0usize;
    for (index, &byte) in bytes.iter().enumerate().skip(end) {
        match byte {
            b'\n' if bytes.get(index + 1) == Some(&b'\n') => return false,
            b'[' => depth += 1,
            b']' if depth == 0 => return bytes.get(index + 1) == Some(&b'('),
            b']' => depth -= 1,
            _ => {}
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Card rendering
// ---------------------------------------------------------------------------

fn card_title(kind: EnrichmentKind) -> &'static str {
    match kind {
        EnrichmentKind::Hint => "Helpful Hints",
        EnrichmentKind::Background => "Background Context",
        EnrichmentKind::Reminder => "Important Reminders",
        EnrichmentKind::Warning => "Warning",
        EnrichmentKind::Example => "Example",
    }
}

fn card_icon_path(kind: EnrichmentKind) -> &'static str {
    match kind {
        EnrichmentKind::Hint => {
            "M12 2a7 7 0 0 0-7 7c0 2.59 1.47 4.84 3.63 6.02L9 18h6l.37-2.98A7.01 7.01 0 0 0 19 9a7 7 0 0 0-7-7zm-3 19h6v1H9v-1z"
        }
        EnrichmentKind::Background => "M4 6h16v2H4zM4 10h16v2H4zM4 14h16v2H4z",
        EnrichmentKind::Reminder => {
            "M12 22a2 2 0 0 0 2-2H10a2 2 0 0 0 2 2zm6-6v-5a6 6 0 0 0-4-5.65V4a2 2 0 0 0-4 0v1.35A6 6 0 0 0 6 11v5l-2 2v1h16v-1l-2-2z"
        }
        EnrichmentKind::Warning => "M1 21h22L12 2 1 21zm12-3h-2v-2h2v2zm0-4h-2V7h2v7z",
        EnrichmentKind::Example => {
            "M12 2a10 10 0 1 0 10 10A10 10 0 0 0 12 2zm1 15h-2v-6h2zm0-8h-2V7h2z"
        }
    }
}

/// Self-contained card: icon and title header, rendered markdown body.
fn render_card(engine: &MarkdownEngine, kind: EnrichmentKind, content: &str) -> Result<String> {
    let body = engine.render_fragment(content)?;
    let token = kind.token();
    Ok(format!(
        concat!(
            r#"<div class="inline-enrichment {token}" data-enrichment-type="{token}">"#,
            r#"<div class="inline-enrichment-header">"#,
            r#"<svg viewBox="0 0 24 24" fill="currentColor"><path d="{icon}"/></svg>"#,
            r#"<span>{title}</span></div>"#,
            r#"<div class="enrichment-text">{body}</div></div>"#,
        ),
        token = token,
        icon = card_icon_path(kind),
        title = card_title(kind),
        body = body.trim_end(),
    ))
}

#[cfg(test)]
mod tests {
    use chatmark_shared::EnrichmentPriority;

    use super::*;

    fn run(markdown: &str) -> Extraction {
        extract(markdown, &MarkdownEngine::new(true)).unwrap()
    }

    #[test]
    fn hint_becomes_placeholder_and_card() {
        let extraction = run("{{hint: Use **var** for local inference.}}");

        assert_eq!(extraction.enrichments.len(), 1);
        let hint = &extraction.enrichments[0];
        assert_eq!(hint.kind(), EnrichmentKind::Hint);
        assert_eq!(hint.content(), "Use **var** for local inference.");
        assert_eq!(hint.position(), 0);

        let token = extraction.placeholders.tokens().next().unwrap().to_string();
        assert_eq!(extraction.text, token);

        let html = extraction.placeholders.reinsert(&format!("<p>{token}</p>\n"));
        assert!(html.starts_with(r#"<div class="inline-enrichment hint" data-enrichment-type="hint">"#));
        assert!(html.contains("<span>Helpful Hints</span>"));
        assert!(html.contains("<strong>var</strong>"));
        assert!(!html.contains("{{") && !html.contains("}}"));
        assert!(!html.contains(&token));
    }

    #[test]
    fn placeholder_tokens_are_opaque_words() {
        let extraction = run("{{hint: a}} {{warning: b}}");
        let tokens: Vec<&str> = extraction.placeholders.tokens().collect();
        assert_eq!(tokens.len(), 2);
        assert_ne!(tokens[0], tokens[1]);
        for token in tokens {
            assert!(token.starts_with(PLACEHOLDER_PREFIX));
            assert_eq!(token.len(), PLACEHOLDER_PREFIX.len() + 32);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            assert_eq!(extraction.text.matches(token).count(), 1);
        }
    }

    #[test]
    fn markers_inside_code_are_untouched() {
        for input in ["```\n{{hint: x}}\n```", "`{{hint: x}}`", "~~~~\n{{warning: y}}\n~~~~"] {
            let extraction = run(input);
            assert_eq!(extraction.text, input);
            assert!(extraction.enrichments.is_empty());
            assert!(extraction.warnings.is_empty());
        }
    }

    #[test]
    fn unknown_kind_is_literal_with_warning() {
        let extraction = run("Say {{tip: x}} now");
        assert_eq!(extraction.text, "Say {{tip: x}} now");
        assert!(extraction.enrichments.is_empty());
        assert_eq!(extraction.warnings.len(), 1);
        assert_eq!(extraction.warnings[0].kind, WarningKind::UnknownEnrichmentType);
        assert_eq!(extraction.warnings[0].position, 4);
    }

    #[test]
    fn template_braces_are_not_reported() {
        let extraction = run("Hello {{ user.name }}, note: ok");
        assert_eq!(extraction.text, "Hello {{ user.name }}, note: ok");
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn unterminated_marker_degrades_to_text() {
        let extraction = run("{{warning: never closed");
        assert_eq!(extraction.text, "{{warning: never closed");
        assert!(extraction.enrichments.is_empty());
        assert_eq!(extraction.warnings[0].kind, WarningKind::MalformedEnrichment);
    }

    #[test]
    fn empty_content_is_dropped_silently() {
        let extraction = run("a {{hint:   }} b");
        assert_eq!(extraction.text, "a  b");
        assert!(extraction.enrichments.is_empty());
        assert!(extraction.warnings.is_empty());
        assert_eq!(extraction.placeholders.len(), 0);
    }

    #[test]
    fn kind_token_is_case_insensitive() {
        let extraction = run("{{ WARNING : careful}}");
        assert_eq!(extraction.enrichments[0].kind(), EnrichmentKind::Warning);
        assert_eq!(extraction.enrichments[0].priority(), EnrichmentPriority::High);
        assert_eq!(extraction.enrichments[0].content(), "careful");
    }

    #[test]
    fn closer_inside_inline_code_is_skipped() {
        let extraction = run("{{example: `a}}b` done}}");
        assert_eq!(extraction.enrichments[0].content(), "`a}}b` done");
    }

    #[test]
    fn example_with_fenced_code_renders_block() {
        let extraction = run("{{example:\n```java\nint x = 1;\n```\n}}");
        let token = extraction.placeholders.tokens().next().unwrap().to_string();
        let html = extraction.placeholders.reinsert(&token);
        assert!(html.contains(r#"<pre><code class="language-java">int x = 1;"#));
        assert!(html.contains("<span>Example</span>"));
    }

    #[test]
    fn marker_inside_link_text_is_left_alone() {
        let input = "See [{{hint: x}}](https://a.example) now";
        let extraction = run(input);

        assert_eq!(extraction.text, input);
        assert!(extraction.enrichments.is_empty());
        assert_eq!(extraction.warnings.len(), 1);
        assert_eq!(extraction.warnings[0].kind, WarningKind::NestedStructure);
        assert_eq!(extraction.warnings[0].position, 5);
    }

    #[test]
    fn link_inside_marker_is_still_extracted() {
        let extraction = run("{{hint: see [docs](https://d.example)}} and [a](b)");
        assert_eq!(extraction.enrichments.len(), 1);
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn bracketed_marker_without_link_is_extracted() {
        let extraction = run("Note [{{hint: x}}] here");
        assert_eq!(extraction.enrichments.len(), 1);
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn positions_are_character_offsets() {
        let extraction = run("abc {{hint: x}} é {{reminder: y}}");
        let positions: Vec<usize> = extraction.enrichments.iter().map(|e| e.position()).collect();
        assert_eq!(positions, [4, 18]);
        assert_eq!(extraction.enrichments[1].priority(), EnrichmentPriority::High);
    }

    #[test]
    fn reinsert_handles_wrapped_and_inline_tokens() {
        let mut placeholders = Placeholders::default();
        let first = placeholders.insert("<div>A</div>".to_string());
        let second = placeholders.insert("<div>B</div>".to_string());
        let html = placeholders.reinsert(&format!("<p>{first}</p>\n<p>see {second} now</p>"));
        assert_eq!(html, "<div>A</div>\n<p>see <div>B</div> now</p>");
    }
}
