//! Source location tracking for syntax errors.
//!
//! AST nodes do not carry spans: programs are compared structurally for the
//! parse/generate round trip, and spans would make two equivalent programs
//! differ. Spans exist only on the lexer/parser boundary and in diagnostics.
//!
//! # Examples
//!
//! ```
//! # use thingtalk_ast::foundation::span::*;
//! let mut map = SourceMap::new();
//! let file_id = map.add_file("rule.tt", "now => notify;\nnow => return;".to_string());
//! let span = Span::new(file_id, 0, 14, 1);
//!
//! assert_eq!(map.file_name(&span), "rule.tt");
//! assert_eq!(map.snippet(&span), "now => notify;");
//! ```

use serde::{Deserialize, Serialize};

/// Compact source location reference.
///
/// Points to a byte range in a source file with cached line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index into SourceMap.files
    pub file_id: u16,
    /// Byte offset of start position
    pub start: u32,
    /// Byte offset of end position (exclusive)
    pub end: u32,
    /// Cached line number (1-based) for the start position, 0 if unknown
    pub start_line: u16,
}

/// Collection of all source texts seen by a compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source text with line indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Display name (file path, or `<input>` for inline programs)
    pub name: String,
    /// Original source text
    pub source: String,
    /// Byte offsets of each line start, with an EOF sentinel
    pub line_starts: Vec<u32>,
}

impl Span {
    /// Create a new span.
    pub fn new(file_id: u16, start: u32, end: u32, start_line: u16) -> Self {
        Self {
            file_id,
            start,
            end,
            start_line,
        }
    }

    /// Create a zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0, 1)
    }

    /// Check if this span is zero-length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Get the length of this span in bytes.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Merge two spans (returns span covering both).
    ///
    /// Panics if spans are from different files.
    pub fn merge(&self, other: &Span) -> Span {
        assert_eq!(
            self.file_id, other.file_id,
            "cannot merge spans from different files"
        );
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            start_line: self.start_line.min(other.start_line),
        }
    }
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Add a source text and return its ID.
    pub fn add_file(&mut self, name: impl Into<String>, source: String) -> u16 {
        let file_id = self.files.len();
        assert!(file_id < u16::MAX as usize, "too many source files");
        self.files.push(SourceFile::new(name.into(), source));
        file_id as u16
    }

    /// Get the source file for a span.
    pub fn file(&self, span: &Span) -> Option<&SourceFile> {
        self.files.get(span.file_id as usize)
    }

    /// Get the display name for a span's file.
    pub fn file_name(&self, span: &Span) -> &str {
        self.file(span).map_or("<unknown>", |f| f.name.as_str())
    }

    /// Get the source snippet for a span.
    pub fn snippet(&self, span: &Span) -> &str {
        self.file(span)
            .and_then(|f| f.source.get(span.start as usize..span.end as usize))
            .unwrap_or("")
    }

    /// Get the 1-based (line, column) position for a span's start.
    pub fn line_col(&self, span: &Span) -> (u32, u32) {
        self.file(span).map_or((0, 0), |f| f.line_col(span.start))
    }

    /// Get the number of files in this map.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl SourceFile {
    /// Create a new source file with precomputed line starts.
    pub fn new(name: String, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            name,
            source,
            line_starts,
        }
    }

    /// Get 1-based (line, column) for a byte offset. Offsets past EOF clamp to EOF.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx.min(self.line_starts.len().saturating_sub(2)),
            Err(idx) => idx.max(1) - 1,
        };
        let line = (line_idx + 1) as u32;
        let col = (offset - self.line_starts[line_idx]) + 1;
        (line, col)
    }

    /// Get the text of a specific line (1-based), without its newline.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 || line as usize >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[(line - 1) as usize] as usize;
        let end = self.line_starts[line as usize] as usize;
        self.source
            .get(start..end)
            .map(|s| s.trim_end_matches(['\n', '\r']))
    }
}

/// Compute byte offsets of line starts in source text.
///
/// `line_starts[0]` is always 0 and the last entry is the EOF sentinel.
fn compute_line_starts(source: &str) -> Vec<u32> {
    let mut line_starts = vec![0];
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            line_starts.push((idx + 1) as u32);
        }
    }
    if line_starts.last() != Some(&(source.len() as u32)) {
        line_starts.push(source.len() as u32);
    }
    line_starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let merged = Span::new(0, 10, 20, 1).merge(&Span::new(0, 15, 30, 1));
        assert_eq!((merged.start, merged.end), (10, 30));
        assert_eq!(merged.len(), 20);
    }

    #[test]
    fn test_compute_line_starts() {
        assert_eq!(compute_line_starts("now\n=> notify;"), vec![0, 4, 14]);
        assert_eq!(compute_line_starts("a\n"), vec![0, 2]);
    }

    #[test]
    fn test_line_col() {
        let file = SourceFile::new("x".into(), "now\n=> notify;".into());
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(4), (2, 1));
        assert_eq!(file.line_col(7), (2, 4));
        assert_eq!(file.line_text(2), Some("=> notify;"));
        assert_eq!(file.line_text(3), None);
    }

    #[test]
    fn test_source_map_snippet() {
        let mut map = SourceMap::new();
        let id = map.add_file("<input>", "monitor @com.xkcd.get_comic()".to_string());
        let span = Span::new(id, 8, 17, 1);
        assert_eq!(map.snippet(&span), "@com.xkcd");
        assert_eq!(map.line_col(&span), (1, 9));
    }
}
