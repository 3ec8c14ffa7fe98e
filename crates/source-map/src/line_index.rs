//! Line index for offset ↔ line/column conversion.

use crate::ByteOffset;
use text_size::TextSize;

/// A line and column position (0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineCol {
    /// 0-indexed line number.
    pub line: u32,
    /// 0-indexed column.
    pub col: u32,
}

impl LineCol {
    /// Creates a new line/column position.
    #[inline]
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// Byte offsets of every line start in a text, for O(log n) lookups.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// `line_starts[i]` is the offset where line `i` begins.
    line_starts: Vec<ByteOffset>,
}

impl LineIndex {
    /// Creates a new line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];

        for (offset, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(TextSize::from((offset + 1) as u32));
            }
        }

        Self { line_starts }
    }

    /// Converts a byte offset to a line and byte column.
    pub fn line_col(&self, offset: ByteOffset) -> Option<LineCol> {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.checked_sub(1)?,
        };

        let line_start = self.line_starts[line];
        let col = u32::from(offset) - u32::from(line_start);

        Some(LineCol {
            line: line as u32,
            col,
        })
    }

    /// Converts a byte offset to a line and a column counted in characters.
    ///
    /// Source map consumers count columns in characters, not bytes, so
    /// stylesheets with non-ASCII content need this variant.
    pub fn char_line_col(&self, offset: ByteOffset, text: &str) -> Option<LineCol> {
        let LineCol { line, col } = self.line_col(offset)?;
        let start = u32::from(self.line_starts[line as usize]) as usize;
        let end = start + col as usize;
        let col = text.get(start..end)?.chars().count() as u32;
        Some(LineCol { line, col })
    }

    /// Converts a line and a 1-based UTF-16 column to a byte offset.
    ///
    /// CSS tokenizers report columns this way. Columns past the end of the
    /// line clamp to the line end.
    pub fn utf16_offset(&self, line: u32, column: u32, text: &str) -> Option<ByteOffset> {
        let start = u32::from(*self.line_starts.get(line as usize)?) as usize;
        let rest = text.get(start..)?;
        let mut units = 1;
        let mut offset = start;
        for ch in rest.chars() {
            if units >= column || ch == '\n' {
                break;
            }
            units += ch.len_utf16() as u32;
            offset += ch.len_utf8();
        }
        Some(TextSize::from(offset as u32))
    }
}
