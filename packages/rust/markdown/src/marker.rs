//! Ordered list marker detection: `1.` `2)` / `a.` `b)` / `i.` `iv)`.

const MAX_NUMERIC_DIGITS: usize = 3;
const MAX_ROMAN_LENGTH: usize = 6;

/// Ordered marker styles, in the order the inline list parser tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderedKind {
    Numeric,
    Roman,
    Letter,
}

impl OrderedKind {
    pub const ALL: [OrderedKind; 3] = [Self::Numeric, Self::Roman, Self::Letter];

    /// Byte offset just past the marker's sequence (before the delimiter).
    fn read_sequence(self, bytes: &[u8], index: usize) -> Option<usize> {
        let len = match self {
            Self::Numeric => bytes[index..]
                .iter()
                .take(MAX_NUMERIC_DIGITS)
                .take_while(|b| b.is_ascii_digit())
                .count(),
            Self::Letter => usize::from(bytes.get(index).is_some_and(u8::is_ascii_lowercase)),
            Self::Roman => bytes[index..]
                .iter()
                .take(MAX_ROMAN_LENGTH)
                .take_while(|b| matches!(b, b'i' | b'v' | b'x'))
                .count(),
        };
        (len > 0).then_some(index + len)
    }
}

/// A detected marker. Offsets are bytes into the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerMatch {
    pub start: usize,
    /// First non-whitespace byte after the delimiter (or end of text).
    pub content_start: usize,
    pub kind: OrderedKind,
}

/// Markers may not start in the middle of a word.
fn is_marker_boundary(text: &str, index: usize) -> bool {
    text[..index]
        .chars()
        .next_back()
        .is_none_or(|prev| !prev.is_alphanumeric())
}

/// Scan for a marker of a specific kind at `index`.
pub fn scan_kind_at(text: &str, index: usize, kind: OrderedKind) -> Option<MarkerMatch> {
    let bytes = text.as_bytes();
    if index >= bytes.len() || !text.is_char_boundary(index) || !is_marker_boundary(text, index) {
        return None;
    }

    let delimiter_at = kind.read_sequence(bytes, index)?;
    if !matches!(bytes.get(delimiter_at), Some(b'.' | b')')) {
        return None;
    }

    let after = delimiter_at + 1;
    match bytes.get(after) {
        // Version strings like 1.8
        Some(b) if b.is_ascii_digit() && kind == OrderedKind::Numeric => return None,
        Some(b) if !b.is_ascii_whitespace() => return None,
        _ => {}
    }

    let content_start = after
        + bytes[after..]
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();

    Some(MarkerMatch {
        start: index,
        content_start,
        kind,
    })
}

/// Scan for any ordered marker at `index`, trying numeric, roman, then letter.
pub fn scan_at(text: &str, index: usize) -> Option<MarkerMatch> {
    OrderedKind::ALL
        .into_iter()
        .find_map(|kind| scan_kind_at(text, index, kind))
}

/// Whether a line (leading whitespace already stripped) opens with an ordered marker.
///
/// The delimiter must be followed by whitespace or the end of the line, so
/// "1.Foo" is prose and "1. Foo" is a list item.
pub fn starts_with_ordered_marker(trimmed_line: &str) -> bool {
    scan_at(trimmed_line, 0).is_some()
}
