//! Line lookup over source text.
//!
//! [`LineIndex`] is built once per file and answers byte offset to line
//! queries by binary search over a table of line-start offsets.
//!
//! ## Coordinate Conventions
//!
//! - Lines are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Every offset in `[0, text.len()]` is valid input, including the offset
//!   one past the last byte

// ============================================================================
// Line Index
// ============================================================================

/// Table of line-start byte offsets for one text blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Strictly increasing; `starts[0] == 0`, one entry after every `\n`.
    starts: Vec<usize>,
}

impl LineIndex {
    /// Build the index for `text` in a single pass.
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut starts = Vec::with_capacity(bytes.len() / 32 + 1);
        starts.push(0);
        for (i, &byte) in bytes.iter().enumerate() {
            if byte == b'\n' {
                starts.push(i + 1);
            }
        }
        LineIndex { starts }
    }

    /// Return the 1-based line containing `offset`.
    ///
    /// An offset directly after a newline belongs to the next line. Offsets
    /// past the end of the text resolve to the last line.
    pub fn line_at(&self, offset: usize) -> u32 {
        // Number of line starts at or before `offset`; never 0 since starts[0] == 0.
        let line = self.starts.partition_point(|&start| start <= offset);
        u32::try_from(line).unwrap_or(u32::MAX)
    }

    /// Number of lines; a trailing newline opens one final empty line.
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let index = LineIndex::new("hello");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_at(0), 1);
        assert_eq!(index.line_at(4), 1);
        assert_eq!(index.line_at(5), 1);
    }

    #[test]
    fn test_empty_text() {
        let index = LineIndex::new("");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_at(0), 1);
    }

    #[test]
    fn test_line_boundaries() {
        // "ab\ncd\n" -> line starts 0, 3, 6
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.line_at(0), 1);
        assert_eq!(index.line_at(2), 1, "the newline byte belongs to its line");
        assert_eq!(index.line_at(3), 2, "offset after newline starts next line");
        assert_eq!(index.line_at(5), 2);
        assert_eq!(index.line_at(6), 3, "end of file after trailing newline");
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_consecutive_newlines() {
        let index = LineIndex::new("\n\n\nx");
        assert_eq!(index.line_at(0), 1);
        assert_eq!(index.line_at(1), 2);
        assert_eq!(index.line_at(2), 3);
        assert_eq!(index.line_at(3), 4);
        assert_eq!(index.line_at(4), 4);
    }

    #[test]
    fn test_offset_past_end_is_last_line() {
        let index = LineIndex::new("a\nb");
        assert_eq!(index.line_at(100), 2);
    }

    #[test]
    fn test_monotonic_with_newline_count() {
        let texts = [
            "class A {\n  void x() {}\n}\n",
            "\n\n",
            "no newline at all",
            "a\r\nb\r\n\r\nc",
            "ünïcödé\nzeile zwei\n",
        ];
        for text in texts {
            let index = LineIndex::new(text);
            let bytes = text.as_bytes();
            for i0 in 0..bytes.len() {
                for i1 in (i0 + 1)..=bytes.len() {
                    let k = bytes[i0..i1].iter().filter(|&&b| b == b'\n').count() as u32;
                    // The last byte of the range is itself a newline: it still
                    // sits on the line it terminates.
                    let k = if bytes[i1 - 1] == b'\n' { k - 1 } else { k };
                    assert_eq!(
                        index.line_at(i1 - 1),
                        index.line_at(i0) + k,
                        "text {:?} range {}..{}",
                        text,
                        i0,
                        i1
                    );
                }
            }
        }
    }
}
