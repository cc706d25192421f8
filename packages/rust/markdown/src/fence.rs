//! Code-region tracking shared by every text scanner in the pipeline.
//!
//! A scanner walks the text left to right and asks [`FenceTracker::advance`] at
//! each position whether a fence or backtick run starts there. While
//! [`FenceTracker::inside_code`] is true, no transformation may touch the text.
//!
//! All indices are byte offsets. Fence and backtick characters are ASCII, so a
//! run never splits a multi-byte character.

/// Minimum run length of a code fence.
pub(crate) const FENCE_MIN_LENGTH: usize = 3;

const BACKTICK: u8 = b'`';
const TILDE: u8 = b'~';

/// A run of 3+ backticks or tildes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceMarker {
    /// `b'`'` or `b'~'`.
    pub ch: u8,
    pub len: usize,
}

impl FenceMarker {
    /// The marker as text, e.g. "````".
    pub fn to_text(self) -> String {
        char::from(self.ch).to_string().repeat(self.len)
    }
}

/// Length of the run of `ch` starting at `index`.
fn run_length(bytes: &[u8], index: usize, ch: u8) -> usize {
    bytes[index..].iter().take_while(|&&b| b == ch).count()
}

/// Scan for a fence marker (3+ backticks or tildes) at `index`.
pub fn scan_fence_marker(text: &str, index: usize) -> Option<FenceMarker> {
    let bytes = text.as_bytes();
    let ch = *bytes.get(index)?;
    if ch != BACKTICK && ch != TILDE {
        return None;
    }
    let len = run_length(bytes, index, ch);
    (len >= FENCE_MIN_LENGTH).then_some(FenceMarker { ch, len })
}

/// Scan for a marker at `index` that can open a fence.
///
/// A run followed on the same line by another run of the same character at
/// least as long is an inline span such as "```ls```", not an opener.
pub fn scan_fence_opener(text: &str, index: usize) -> Option<FenceMarker> {
    scan_fence_marker(text, index).filter(|&marker| same_line_closer(text, index, marker).is_none())
}

/// End of the first run on the same line that could close `marker` opened at `index`.
pub(crate) fn same_line_closer(text: &str, index: usize, marker: FenceMarker) -> Option<usize> {
    let bytes = text.as_bytes();
    let line_end = bytes[index..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| index + offset);
    let line = &bytes[..line_end];

    let mut scan = index + marker.len;
    while scan < line_end {
        if line[scan] != marker.ch {
            scan += 1;
            continue;
        }
        let len = run_length(line, scan, marker.ch);
        if len >= marker.len {
            return Some(scan + len);
        }
        scan += len;
    }
    None
}

/// Scan for a backtick run (1+ backticks) at `index`, returning its length.
pub fn scan_backtick_run(text: &str, index: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(index) != Some(&BACKTICK) {
        return None;
    }
    Some(run_length(bytes, index, BACKTICK))
}

/// Whether a backtick run of exactly `run_len` exists after the opening run at `start`.
pub fn has_closing_backtick_run(text: &str, start: usize, run_len: usize) -> bool {
    let bytes = text.as_bytes();
    let mut scan = start + run_len;
    while scan < bytes.len() {
        let Some(offset) = bytes[scan..].iter().position(|&b| b == BACKTICK) else {
            return false;
        };
        let run_start = scan + offset;
        let found = run_length(bytes, run_start, BACKTICK);
        if found == run_len {
            return true;
        }
        scan = run_start + found;
    }
    false
}

/// Mutable fence/inline-code state for one left-to-right scan.
///
/// Created fresh by the scan loop that owns it and dropped when the loop ends.
#[derive(Debug, Default)]
pub struct FenceTracker {
    fence: Option<FenceMarker>,
    inline_run: Option<usize>,
}

impl FenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inside_fence(&self) -> bool {
        self.fence.is_some()
    }

    pub fn inside_inline_code(&self) -> bool {
        self.inline_run.is_some()
    }

    /// Inside either a fenced block or an inline code span.
    pub fn inside_code(&self) -> bool {
        self.inside_fence() || self.inside_inline_code()
    }

    /// The opener of the current fence, if any.
    pub fn open_fence(&self) -> Option<FenceMarker> {
        self.fence
    }

    pub fn enter_fence(&mut self, marker: FenceMarker) {
        self.fence = Some(marker);
    }

    pub fn exit_fence(&mut self) {
        self.fence = None;
    }

    /// A closer must use the opener's character and be at least as long.
    pub fn would_close_fence(&self, marker: FenceMarker) -> bool {
        self.fence
            .is_some_and(|open| open.ch == marker.ch && marker.len >= open.len)
    }

    /// Update state for a code delimiter at `cursor`.
    ///
    /// Returns the number of bytes the delimiter spans (the caller copies them
    /// through verbatim), or 0 when no delimiter starts here. Fences are only
    /// recognized at the start of a line (after optional indentation).
    pub fn advance(&mut self, text: &str, cursor: usize) -> usize {
        if !matches!(text.as_bytes().get(cursor), Some(&BACKTICK | &TILDE)) {
            return 0;
        }

        if is_line_start(text, cursor) {
            let marker = if self.inside_fence() {
                scan_fence_marker(text, cursor)
            } else {
                scan_fence_opener(text, cursor)
            };
            if let Some(marker) = marker {
                if !self.inside_fence() {
                    self.enter_fence(marker);
                } else if self.would_close_fence(marker) {
                    self.exit_fence();
                }
                return marker.len;
            }
        }

        if self.inside_fence() {
            return 0;
        }

        let Some(run_len) = scan_backtick_run(text, cursor) else {
            return 0;
        };
        match self.inline_run {
            None if has_closing_backtick_run(text, cursor, run_len) => {
                self.inline_run = Some(run_len);
            }
            Some(open_len) if open_len == run_len => {
                self.inline_run = None;
            }
            // Unmatched opener or a differently sized run inside a span: literal text.
            _ => {}
        }
        run_len
    }
}

/// Whether only spaces or tabs precede byte `index` on its line.
pub(crate) fn is_line_start(text: &str, index: usize) -> bool {
    text.as_bytes()[..index]
        .iter()
        .rev()
        .take_while(|&&b| b != b'\n')
        .all(|&b| b == b' ' || b == b'\t')
}
