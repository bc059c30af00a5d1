//! Source positions and the line/column index used to produce them.

use serde::{Deserialize, Serialize};

/// A position in a source file: 1-based line, 1-based column, 0-based byte offset.
///
/// Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl SourcePosition {
    /// Sentinel position for AST nodes synthesized during error recovery.
    pub const SYNTHETIC: SourcePosition = SourcePosition {
        line: 0,
        column: 0,
        offset: 0,
    };

    pub const fn new(line: u32, column: u32, offset: u32) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        *self == Self::SYNTHETIC
    }
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets to `(line, column)` pairs in O(log n).
///
/// Built once per source string from the offsets where each line starts,
/// then reused for every token and diagnostic produced from that source
/// rather than rescanning from the beginning each time.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the first character of each line. `line_starts[0] == 0`.
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Resolves a byte offset to a `SourcePosition`. Offsets past the end of
    /// the source clamp to the last known line.
    pub fn position(&self, offset: u32) -> SourcePosition {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_at) => insert_at.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        let column = offset.saturating_sub(line_start) + 1;
        SourcePosition::new((line_idx as u32) + 1, column, offset)
    }

    /// The text of 1-based line `line_number`, without its trailing
    /// newline. Out-of-range line numbers return an empty string.
    fn line_text<'s>(&self, source: &'s str, line_number: u32) -> &'s str {
        let idx = line_number.saturating_sub(1) as usize;
        let Some(&start) = self.line_starts.get(idx) else {
            return "";
        };
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&next| next as usize)
            .unwrap_or(source.len());
        source[start as usize..end].trim_end_matches(['\n', '\r'])
    }

    /// Renders `position`'s line plus one line of context on either side,
    /// each prefixed with its 1-based line number, for use as a
    /// [`crate::Diagnostic`]'s `source_snippet`.
    pub fn snippet(&self, source: &str, position: SourcePosition) -> String {
        let line = position.line;
        let first = line.saturating_sub(1).max(1);
        let last = (line + 1).min(self.line_starts.len() as u32);
        (first..=last)
            .map(|n| format!("{n:>4} | {}", self.line_text(source, n)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_first_column() {
        let idx = LineIndex::new("hello\nworld");
        assert_eq!(idx.position(0), SourcePosition::new(1, 1, 0));
    }

    #[test]
    fn second_line() {
        let idx = LineIndex::new("hello\nworld");
        // offset 6 is the 'w' of "world"
        assert_eq!(idx.position(6), SourcePosition::new(2, 1, 6));
    }

    #[test]
    fn mid_line_column() {
        let idx = LineIndex::new("abc\ndefgh");
        // offset 7 is the 'g' -> line 2, column 4
        assert_eq!(idx.position(7), SourcePosition::new(2, 4, 7));
    }

    #[test]
    fn no_trailing_newline() {
        let idx = LineIndex::new("one\ntwo\nthree");
        assert_eq!(idx.position(12), SourcePosition::new(3, 5, 12));
    }

    #[test]
    fn empty_source() {
        let idx = LineIndex::new("");
        assert_eq!(idx.position(0), SourcePosition::new(1, 1, 0));
    }

    #[test]
    fn snippet_includes_one_line_of_context_on_each_side() {
        let source = "one\ntwo\nthree\nfour";
        let idx = LineIndex::new(source);
        let snippet = idx.snippet(source, SourcePosition::new(3, 1, 8));
        assert_eq!(snippet, "   2 | two\n   3 | three\n   4 | four");
    }

    #[test]
    fn snippet_clamps_at_first_and_last_line() {
        let source = "only";
        let idx = LineIndex::new(source);
        let snippet = idx.snippet(source, SourcePosition::new(1, 1, 0));
        assert_eq!(snippet, "   1 | only");
    }

    #[test]
    fn synthetic_is_zero() {
        assert!(SourcePosition::SYNTHETIC.is_synthetic());
        assert!(!SourcePosition::new(1, 1, 0).is_synthetic());
    }
}
