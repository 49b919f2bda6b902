// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Source buffers and location tracking.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_SOURCE_ID: AtomicU32 = AtomicU32::new(0);

/// Identifies one loaded [`Source`]. Ranges carry this instead of a borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceId(pub u32);

/// A file name plus its immutable text.
#[derive(Debug, Clone)]
pub struct Source {
    id: SourceId,
    name: String,
    text: String,
    line_map: LineMap,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_map = LineMap::new(&text);
        Self {
            id: SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            text,
            line_map,
        }
    }

    /// Read a source file from disk. The path's display form becomes the name.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(path.display().to_string(), text))
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_map(&self) -> &LineMap {
        &self.line_map
    }

    /// Location of a byte offset, clamped to the end of the text.
    pub fn location(&self, pos: usize) -> Location {
        let pos = pos.min(self.text.len());
        let (line, column) = self.line_map.offset_to_line_col(pos);
        Location { pos, line, column }
    }

    /// Range covering the bytes `start..end`.
    pub fn range(&self, start: usize, end: usize) -> Range {
        Range {
            source: self.id,
            start: self.location(start),
            end: self.location(end.max(start)),
        }
    }

    /// Text of `range`.
    pub fn slice(&self, range: Range) -> &str {
        self.text.get(range.start.pos..range.end.pos).unwrap_or("")
    }

    /// Full text of every line the range touches, without the final newline.
    pub fn covering_lines(&self, range: Range) -> &str {
        let first = self.line_map.line_start(range.start.line).unwrap_or(0);
        let last = self
            .line_map
            .line_start(range.end.line + 1)
            .map(|s| s.saturating_sub(1))
            .unwrap_or(self.text.len());
        self.text.get(first..last.max(first)).unwrap_or("")
    }
}

/// A byte offset with its 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub pos: usize,
    pub line: u32,
    pub column: u32,
}

/// A half-open region of one source. `start.pos <= end.pos` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub source: SourceId,
    pub start: Location,
    pub end: Location,
}

impl Range {
    /// Span from the start of `lhs` to the furthest end of either range.
    ///
    /// Both ranges must come from the same source and `lhs` must not start
    /// after `rhs`.
    pub fn merge(lhs: Range, rhs: Range) -> Range {
        debug_assert_eq!(lhs.source, rhs.source, "merging ranges of different sources");
        debug_assert!(lhs.start.pos <= rhs.start.pos, "merge operands out of order");
        let end = if rhs.end.pos > lhs.end.pos { rhs.end } else { lhs.end };
        Range { source: lhs.source, start: lhs.start, end }
    }

    pub fn len(&self) -> usize {
        self.end.pos - self.start.pos
    }

    pub fn is_empty(&self) -> bool {
        self.start.pos == self.end.pos
    }

    pub fn contains(&self, other: &Range) -> bool {
        self.source == other.source
            && self.start.pos <= other.start.pos
            && other.end.pos <= self.end.pos
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Precomputed line-start offsets for O(log n) byte-offset → line:col lookup.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Byte offset of the start of each line. line_starts[0] is always 0.
    line_starts: Vec<usize>,
}

impl LineMap {
    /// Build a line map by scanning source for newlines. O(n).
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineMap { line_starts }
    }

    /// Convert byte offset to (line, col), both 1-based. O(log n).
    ///
    /// Lines and columns past `u32::MAX` saturate; the byte offset itself is
    /// kept exactly in [`Location::pos`].
    pub fn offset_to_line_col(&self, offset: usize) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line_idx).copied().unwrap_or(0);
        let col = offset.saturating_sub(line_start) + 1;
        (saturate(line_idx + 1), saturate(col))
    }

    /// Byte offset where a 1-based line begins.
    pub fn line_start(&self, line: u32) -> Option<usize> {
        let idx = (line as usize).checked_sub(1)?;
        self.line_starts.get(idx).copied()
    }

    /// Get the source text of a 1-based line number. O(1).
    pub fn line_text<'a>(&self, source: &'a str, line: u32) -> Option<&'a str> {
        let start = self.line_start(line)?;
        let end = self
            .line_start(line + 1)
            .map(|s| s.saturating_sub(1)) // exclude the \n
            .unwrap_or(source.len());
        source.get(start..end)
    }

    /// Number of lines in the source.
    pub fn line_count(&self) -> u32 {
        saturate(self.line_starts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source() {
        let lm = LineMap::new("");
        assert_eq!(lm.offset_to_line_col(0), (1, 1));
        assert_eq!(lm.line_count(), 1);
    }

    #[test]
    fn multi_line() {
        let src = "abc\ndef\nghi";
        let lm = LineMap::new(src);
        assert_eq!(lm.line_count(), 3);
        assert_eq!(lm.offset_to_line_col(2), (1, 3)); // 'c'
        assert_eq!(lm.offset_to_line_col(4), (2, 1)); // 'd'
        assert_eq!(lm.offset_to_line_col(8), (3, 1)); // 'g'
        assert_eq!(lm.line_text(src, 2), Some("def"));
        assert_eq!(lm.line_text(src, 4), None);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn offsets_past_u32_do_not_wrap() {
        let lm = LineMap::new("a\nb");
        let far = u32::MAX as usize + 10;
        assert_eq!(lm.offset_to_line_col(far), (2, u32::MAX));
    }

    #[test]
    fn trailing_newline() {
        let src = "abc\n";
        let lm = LineMap::new(src);
        assert_eq!(lm.line_count(), 2);
        assert_eq!(lm.line_text(src, 2), Some(""));
    }

    #[test]
    fn source_ids_are_distinct() {
        let a = Source::new("a.kn", "");
        let b = Source::new("b.kn", "");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn location_clamps_to_end() {
        let src = Source::new("t.kn", "ab\ncd");
        let loc = src.location(100);
        assert_eq!(loc.pos, 5);
        assert_eq!((loc.line, loc.column), (2, 3));
    }

    #[test]
    fn merge_takes_furthest_end() {
        let src = Source::new("t.kn", "let value = 10");
        let outer = src.range(0, 14);
        let inner = src.range(4, 9);
        let merged = Range::merge(outer, inner);
        assert_eq!(merged.start.pos, 0);
        assert_eq!(merged.end.pos, 14);

        let merged = Range::merge(src.range(0, 3), src.range(4, 9));
        assert_eq!((merged.start.pos, merged.end.pos), (0, 9));
        assert_eq!(src.slice(merged), "let value");
    }

    #[test]
    fn covering_lines_spans_multiple_lines() {
        let src = Source::new("t.kn", "one\ntwo three\nfour\nfive");
        let range = src.range(8, 16);
        assert_eq!(src.covering_lines(range), "two three\nfour");
        assert_eq!(src.covering_lines(src.range(0, 1)), "one");
        assert_eq!(src.covering_lines(src.range(20, 22)), "five");
    }
}
