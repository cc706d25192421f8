//! Inline list recovery: turns flattened prose such as
//! "Key points: 1. First 2. Second" back into list structure.
//!
//! Ordered markers are tried numeric, roman, then letter; the first kind with at
//! least two usable items wins. Bulleted lists (`-`, `*`, `+`, `•`) need an
//! introductory position so a hyphen mid-sentence is not a list.

use crate::marker::{OrderedKind, scan_kind_at};

const MIN_ITEMS: usize = 2;
const MAX_NESTED_DEPTH: usize = 3;
const BULLET_CHARS: [char; 4] = ['-', '*', '+', '•'];

/// List element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTag {
    Ordered,
    Unordered,
}

impl ListTag {
    pub fn tag_name(self) -> &'static str {
        match self {
            Self::Ordered => "ol",
            Self::Unordered => "ul",
        }
    }
}

/// One list and its item labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBlock {
    pub tag: ListTag,
    pub items: Vec<String>,
}

/// A paragraph rewritten as lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Text before the first marker; empty when none.
    pub leading_text: String,
    pub primary: ListBlock,
    /// Lists recovered from `label: 1. a 2. b` items, in document order.
    pub nested: Vec<ListBlock>,
    /// Prose after the last item's sentence end; empty when none.
    pub trailing_text: String,
}

/// Try to recover list structure from plain paragraph text.
pub fn try_convert(text: &str) -> Option<Conversion> {
    let parse = Parse::try_parse(text)?;
    let mut nested = Vec::new();
    collect_nested(&parse, 0, &mut nested);

    Some(Conversion {
        leading_text: parse.leading,
        primary: parse.block,
        nested,
        trailing_text: parse.trailing,
    })
}

fn collect_nested(parse: &Parse, depth: usize, out: &mut Vec<ListBlock>) {
    if depth >= MAX_NESTED_DEPTH {
        return;
    }
    for segment in &parse.nested_segments {
        let Some(inner) = Parse::try_parse(segment) else {
            continue;
        };
        out.push(inner.block.clone());
        collect_nested(&inner, depth + 1, out);
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Parse {
    leading: String,
    block: ListBlock,
    nested_segments: Vec<String>,
    trailing: String,
}

/// Byte offsets of one marker in the trimmed text.
#[derive(Debug, Clone, Copy)]
struct Marker {
    start: usize,
    content_start: usize,
}

impl Parse {
    fn try_parse(input: &str) -> Option<Self> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }

        OrderedKind::ALL
            .into_iter()
            .find_map(|kind| Self::from_markers(text, &ordered_markers(text, kind), ListTag::Ordered))
            .or_else(|| {
                let bullet = first_intro_bullet(text)?;
                Self::from_markers(text, &bullet_markers(text, bullet), ListTag::Unordered)
            })
    }

    fn from_markers(text: &str, markers: &[Marker], tag: ListTag) -> Option<Self> {
        if markers.len() < MIN_ITEMS {
            return None;
        }

        let leading = text[..markers[0].start].trim().to_string();
        let mut items = Vec::with_capacity(markers.len());
        let mut nested_segments = Vec::new();
        let mut trailing = String::new();

        for (index, marker) in markers.iter().enumerate() {
            let end = markers.get(index + 1).map_or(text.len(), |next| next.start);
            let raw = text[marker.content_start..end].trim();
            if raw.is_empty() {
                continue;
            }

            let (entry, tail) = if index == markers.len() - 1 {
                split_trailing_text(raw)
            } else {
                (raw, "")
            };

            let (label, nested) = split_nested_list(entry);
            items.push(label);
            if let Some(segment) = nested {
                nested_segments.push(segment);
            }
            if !tail.trim().is_empty() {
                trailing = tail.to_string();
            }
        }

        if items.len() < MIN_ITEMS {
            return None;
        }

        Some(Self {
            leading,
            block: ListBlock { tag, items },
            nested_segments,
            trailing,
        })
    }
}

fn ordered_markers(text: &str, kind: OrderedKind) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut index = 0;
    while index < text.len() {
        // content_start < len means real content follows the delimiter
        match scan_kind_at(text, index, kind).filter(|found| found.content_start < text.len()) {
            Some(found) => {
                markers.push(Marker {
                    start: found.start,
                    content_start: found.content_start,
                });
                index = found.content_start;
            }
            None => index += 1,
        }
    }
    markers
}

/// The first bullet character that opens a list and has a second marker after it.
fn first_intro_bullet(text: &str) -> Option<char> {
    text.char_indices().find_map(|(index, ch)| {
        let is_candidate = BULLET_CHARS.contains(&ch)
            && is_bullet_intro(text, index)
            && text[index + ch.len_utf8()..]
                .char_indices()
                .any(|(offset, next)| {
                    next == ch && is_bullet_marker(text, index + ch.len_utf8() + offset, ch)
                });
        is_candidate.then_some(ch)
    })
}

/// Text start, right after `:` or a newline, or after `: `.
fn is_bullet_intro(text: &str, index: usize) -> bool {
    let bytes = text.as_bytes();
    match index {
        0 => true,
        _ => match bytes[index - 1] {
            b':' | b'\n' => true,
            b' ' => index >= 2 && bytes[index - 2] == b':',
            _ => false,
        },
    }
}

/// Bullet character followed by a space.
fn is_bullet_marker(text: &str, index: usize, bullet: char) -> bool {
    text[index..].starts_with(bullet) && text.as_bytes().get(index + bullet.len_utf8()) == Some(&b' ')
}

fn bullet_markers(text: &str, bullet: char) -> Vec<Marker> {
    let width = bullet.len_utf8() + 1;
    let mut markers: Vec<Marker> = Vec::new();

    for (index, ch) in text.char_indices() {
        if ch != bullet || !is_bullet_marker(text, index, bullet) {
            continue;
        }
        if markers.is_empty() && !is_bullet_intro(text, index) {
            continue;
        }
        markers.push(Marker {
            start: index,
            content_start: index + width,
        });
    }
    markers
}

/// Split the last item at its first sentence end that is followed by more prose.
///
/// Punctuation not followed by whitespace (`1.8`) is part of the item, and so
/// is the period of a one-letter abbreviation (`e.g.`, `i.e.`).
fn split_trailing_text(raw: &str) -> (&str, &str) {
    for (index, ch) in raw.char_indices() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        if ch == '.' && ends_with_single_letter(&raw[..index]) {
            continue;
        }
        let rest = &raw[index + 1..];
        if rest.is_empty() {
            break;
        }
        let after_space = rest.trim_start();
        if after_space.len() == rest.len() {
            continue;
        }
        if !after_space.is_empty() {
            let trailing_start = raw.len() - after_space.len();
            return (raw[..trailing_start].trim(), after_space.trim());
        }
        break;
    }
    (raw, "")
}

/// Last word of `text` is one letter, as in "e.g" or "i.e".
fn ends_with_single_letter(text: &str) -> bool {
    let mut chars = text.chars().rev();
    chars.next().is_some_and(char::is_alphabetic)
        && chars.next().is_none_or(|before| !before.is_alphanumeric())
}

/// `label: 1. a 2. b` becomes ("label", Some("1. a 2. b")).
fn split_nested_list(entry: &str) -> (String, Option<String>) {
    let trimmed = entry.trim();
    if let Some(colon) = trimmed.find(':') {
        if colon > 0 && colon < trimmed.len() - 1 {
            let tail = trimmed[colon + 1..].trim();
            if Parse::try_parse(tail).is_some() {
                return (normalize_label(&trimmed[..colon]), Some(tail.to_string()));
            }
        }
    }
    (normalize_label(trimmed), None)
}

/// Cut at the first colon and drop trailing sentence punctuation.
fn normalize_label(raw: &str) -> String {
    let mut label = raw.trim();
    if let Some(colon) = label.find(':') {
        if colon > 0 {
            label = label[..colon].trim();
        }
    }
    while let Some(stripped) = label.strip_suffix(['.', '!', '?']) {
        label = stripped.trim_end();
    }
    label.to_string()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn items(block: &ListBlock) -> Vec<&str> {
        block.items.iter().map(String::as_str).collect()
    }

    #[test]
    fn key_points_become_ordered_list() {
        let conversion = try_convert("Key points: 1. First. 2. Second.").unwrap();
        assert_eq!(conversion.leading_text, "Key points:");
        assert_eq!(conversion.primary.tag, ListTag::Ordered);
        assert_eq!(items(&conversion.primary), ["First", "Second"]);
        assert!(conversion.nested.is_empty());
        assert_eq!(conversion.trailing_text, "");
    }

    #[test]
    fn trailing_prose_is_hoisted_out() {
        let conversion = try_convert("Steps: 1. Install 2. Run it. Then check the logs.").unwrap();
        assert_eq!(items(&conversion.primary), ["Install", "Run it"]);
        assert_eq!(conversion.trailing_text, "Then check the logs.");
    }

    #[test]
    fn version_numbers_do_not_end_the_item() {
        let conversion = try_convert("Use: 1. Java 1.8 2. Java 21").unwrap();
        assert_eq!(items(&conversion.primary), ["Java 1.8", "Java 21"]);
        assert_eq!(conversion.trailing_text, "");
    }

    #[rstest]
    #[case("Options: i. alpha ii. beta", ListTag::Ordered, &["alpha", "beta"])]
    #[case("Pick: a) red b) blue", ListTag::Ordered, &["red", "blue"])]
    #[case("Notes: - one - two", ListTag::Unordered, &["one", "two"])]
    #[case("- one - two", ListTag::Unordered, &["one", "two"])]
    #[case("Bullets:• uno • dos", ListTag::Unordered, &["uno", "dos"])]
    fn marker_kinds(#[case] text: &str, #[case] tag: ListTag, #[case] expected: &[&str]) {
        let conversion = try_convert(text).unwrap();
        assert_eq!(conversion.primary.tag, tag);
        assert_eq!(items(&conversion.primary), expected);
    }

    #[rstest]
    #[case("A well-known pattern - with a dash - appears here.")]
    #[case("Only 1. one item here")]
    #[case("Java 1.8 and 2.0 are versions")]
    #[case("plain sentence")]
    #[case("")]
    #[case("Trailing: 1. 2. ")]
    fn prose_is_not_converted(#[case] text: &str) {
        assert_eq!(try_convert(text), None);
    }

    #[test]
    fn nested_list_is_extracted_from_item() {
        let conversion =
            try_convert("Plan: 1. Setup: a) install b) configure 2. Deploy").unwrap();
        assert_eq!(items(&conversion.primary), ["Setup", "Deploy"]);
        assert_eq!(conversion.nested.len(), 1);
        assert_eq!(items(&conversion.nested[0]), ["install", "configure"]);
    }

    #[test]
    fn nested_depth_is_capped() {
        // numeric > roman > letter > dash > asterisk: the asterisk list is too deep
        let text = "Top: 1. g: i. e: a) c: - u: * p * q - w b) d ii. f 2. h";
        let conversion = try_convert(text).unwrap();
        assert_eq!(items(&conversion.primary), ["g", "h"]);
        assert_eq!(conversion.nested.len(), MAX_NESTED_DEPTH);
        assert_eq!(items(&conversion.nested[0]), ["e", "f"]);
        assert_eq!(items(&conversion.nested[1]), ["c", "d"]);
        assert_eq!(items(&conversion.nested[2]), ["u", "w"]);
    }

    #[test]
    fn labels_cut_at_colon_and_drop_punctuation() {
        assert_eq!(normalize_label("Wow!?"), "Wow");
        assert_eq!(normalize_label("Name: rest"), "Name");
        assert_eq!(normalize_label(":leading"), ":leading");
    }

    #[rstest]
    #[case("Done.", ("Done.", ""))]
    #[case("Done. More here", ("Done.", "More here"))]
    #[case("e.g.x and", ("e.g.x and", ""))]
    #[case("b e.g. this. More", ("b e.g. this.", "More"))]
    #[case("Use i.e. the default", ("Use i.e. the default", ""))]
    #[case("Maven, e.g. Then", ("Maven, e.g. Then", ""))]
    fn split_trailing_text_cases(#[case] raw: &str, #[case] expected: (&str, &str)) {
        assert_eq!(split_trailing_text(raw), expected);
    }

    #[test]
    fn abbreviations_do_not_end_the_last_item() {
        let conversion =
            try_convert("Install it. Configure e.g. Maven: 1. a 2. b e.g. this. More").unwrap();
        assert_eq!(conversion.leading_text, "Install it. Configure e.g. Maven:");
        assert_eq!(items(&conversion.primary), ["a", "b e.g. this"]);
        assert_eq!(conversion.trailing_text, "More");
    }
}
