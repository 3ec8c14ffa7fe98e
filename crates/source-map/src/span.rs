//! Span and byte offset types for stylesheet positions.

use std::ops::Range;
use text_size::TextSize;

/// A byte offset into a stylesheet.
pub type ByteOffset = TextSize;

/// A half-open byte range `[start, end)` in a stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// The start byte offset (inclusive).
    pub start: ByteOffset,
    /// The end byte offset (exclusive).
    pub end: ByteOffset,
}

impl Span {
    /// Creates a new span from start and end byte offsets.
    #[inline]
    pub fn new(start: impl Into<ByteOffset>, end: impl Into<ByteOffset>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Creates an empty span at the given offset.
    #[inline]
    pub fn empty(offset: impl Into<ByteOffset>) -> Self {
        let offset = offset.into();
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Returns the span as a `usize` range suitable for slicing.
    #[inline]
    pub fn as_range(self) -> Range<usize> {
        u32::from(self.start) as usize..u32::from(self.end) as usize
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(
            TextSize::from(range.start as u32),
            TextSize::from(range.end as u32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_from_range() {
        let span = Span::from(3..9);
        assert_eq!(span.start, TextSize::from(3));
        assert_eq!(span.end, TextSize::from(9));
        assert_eq!(span.as_range(), 3..9);
    }

    #[test]
    fn test_span_empty() {
        let span = Span::empty(5u32);
        assert_eq!(span.start, span.end);
        assert_eq!(span.as_range(), 5..5);
    }
}
