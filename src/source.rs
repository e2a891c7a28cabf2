//! Position-addressed source model.
//!
//! Every node, edit and diagnostic in a compilation unit is addressed by a
//! half-open byte range into one immutable source buffer. Line/column
//! positions are derived on demand for reporting only.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A range whose start lies after its end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid range: start {start} is after end {end}")]
pub struct InvalidRange {
    pub start: usize,
    pub end: usize,
}

/// Half-open `[start, end)` byte range into one source buffer.
///
/// `start <= end` holds for every value of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TextRange {
    start: usize,
    end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Result<Self, InvalidRange> {
        if start > end {
            return Err(InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Zero-width range at `offset`, used for pure insertions.
    pub fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when the two ranges share at least one position.
    ///
    /// A zero-width range overlaps a non-empty range only when it lies strictly
    /// inside it; touching ranges never overlap.
    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_range(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn as_std(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// 1-based line/column position, columns counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

/// Immutable source text of one compilation unit with a line index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
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

    /// Text covered by `range`, or `None` when the range is out of bounds or
    /// splits a UTF-8 sequence.
    pub fn slice(&self, range: TextRange) -> Option<&str> {
        self.text.get(range.as_std())
    }

    /// Convert a byte offset into a 1-based line/column pair. Offsets past the
    /// end clamp to the end of the buffer.
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.text.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx];
        let column = self
            .text
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        LineCol {
            line: line_idx + 1,
            column: column + 1,
        }
    }

    /// Byte offset where the line containing `offset` starts.
    pub fn line_start(&self, offset: usize) -> usize {
        let offset = offset.min(self.text.len());
        match self.line_starts.binary_search(&offset) {
            Ok(i) => self.line_starts[i],
            Err(i) => self.line_starts[i - 1],
        }
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn indentation_at(&self, offset: usize) -> &str {
        let start = self.line_start(offset);
        let line = &self.text[start..];
        let width = line
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(line.len());
        &line[..width]
    }
}
