//! Diagnostics for parsing, schema resolution, type checking and compilation.
//!
//! Every failure surfaced by the front end is a [`CompileError`]: a category,
//! the [`NodePath`] of the offending node and, for syntax errors, the source
//! span.
//!
//! # Design
//!
//! - `CompileError`: single diagnostic located by node path and optional span
//! - `ErrorKind`: categorizes errors by the stage that detected them
//! - `DiagnosticFormatter`: formats diagnostics with source snippets
//!
//! # Examples
//!
//! ```
//! # use thingtalk_resolve::error::*;
//! # use thingtalk_ast::NodePath;
//! let path = NodePath::root().field("rules").index(0);
//! let error = CompileError::new(
//!     ErrorKind::UndefinedName,
//!     path,
//!     "undefined variable 'title'".to_string(),
//! );
//! assert_eq!(error.to_string(), "error: undefined name: undefined variable 'title'");
//! ```

use crate::schema::SchemaError;
use std::fmt;
use thingtalk_ast::{NodePath, SourceMap, Span};
use thingtalk_parser::ParseError;

/// Diagnostic with a location and a message.
///
/// Each diagnostic has:
/// - Node path (where in the program the error occurred)
/// - Source span, when the error comes from source text
/// - Error kind and message
/// - Optional secondary labels and notes
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    /// Category of this error
    pub kind: ErrorKind,
    /// Location inside the program tree
    pub path: NodePath,
    /// Primary source location, if known
    pub span: Option<Span>,
    /// Primary error message
    pub message: String,
    /// Additional labeled locations
    pub labels: Vec<Label>,
    /// Additional notes or hints
    pub notes: Vec<String>,
}

/// Category of error.
///
/// # Invariant
///
/// The discriminant values must match the ERROR_KIND_NAMES array indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// Syntax error from the parser
    Syntax = 0,

    // Schema resolution
    /// No schema for a device kind
    UnknownSchema = 1,
    /// The device kind has no such channel
    UnknownChannel = 2,
    /// The schema delegate failed
    SchemaTransport = 3,

    // Type checking
    /// A value, join key, operator or field has the wrong type
    TypeMismatch = 4,
    /// A required parameter was not given
    MissingRequiredArgument = 5,
    /// Reference to a name that is not in scope
    UndefinedName = 6,

    // Compilation
    /// A placeholder that cannot be filled locally reached compilation
    UnresolvedPlaceholder = 7,

    /// Defect in the caller or in the front end itself
    Internal = 8,
}

/// Human-readable names for error kinds.
///
/// Index matches ErrorKind discriminant.
const ERROR_KIND_NAMES: &[&str] = &[
    "syntax error",              // 0: Syntax
    "unknown schema",            // 1: UnknownSchema
    "unknown channel",           // 2: UnknownChannel
    "schema transport error",    // 3: SchemaTransport
    "type mismatch",             // 4: TypeMismatch
    "missing required argument", // 5: MissingRequiredArgument
    "undefined name",            // 6: UndefinedName
    "unresolved placeholder",    // 7: UnresolvedPlaceholder
    "internal error",            // 8: Internal
];

/// Secondary labeled location in a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub path: NodePath,
    pub message: String,
}

impl CompileError {
    /// Creates a new error diagnostic.
    ///
    /// # Parameters
    ///
    /// * `kind` - Error category
    /// * `path` - Location of the offending node
    /// * `message` - Human-readable error message
    ///
    /// # Returns
    ///
    /// A new error with no span and no labels or notes.
    pub fn new(kind: ErrorKind, path: NodePath, message: String) -> Self {
        Self {
            kind,
            path,
            span: None,
            message,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Attaches the source span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Adds a secondary labeled location.
    ///
    /// # Parameters
    ///
    /// * `path` - Related node
    /// * `message` - Label text (e.g., "left side of the join")
    ///
    /// # Returns
    ///
    /// Self (for chaining).
    pub fn with_label(mut self, path: NodePath, message: String) -> Self {
        self.labels.push(Label { path, message });
        self
    }

    /// Adds a note or hint.
    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    /// Wraps a resolver failure at `path`.
    pub fn from_schema(error: SchemaError, path: NodePath) -> Self {
        let kind = match &error {
            SchemaError::UnknownSchema(_) => ErrorKind::UnknownSchema,
            SchemaError::UnknownChannel { .. } => ErrorKind::UnknownChannel,
            SchemaError::Transport { .. } => ErrorKind::SchemaTransport,
        };
        Self::new(kind, path, error.to_string())
    }
}

impl ErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn name(self) -> &'static str {
        ERROR_KIND_NAMES[self as usize]
    }
}

impl From<ParseError> for CompileError {
    fn from(error: ParseError) -> Self {
        Self::new(ErrorKind::Syntax, NodePath::root(), error.message).with_span(error.span)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {}: {}", self.kind.name(), self.message)
    }
}

impl std::error::Error for CompileError {}

/// Result type for front-end operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Formats diagnostics with source code context.
///
/// Produces messages with:
/// - File and line/column location when a span is known
/// - Source code snippet with `^^^` under the span
/// - The node path of the offending node otherwise
/// - Secondary labels, notes and hints
///
/// # Examples
///
/// ```
/// # use thingtalk_resolve::error::*;
/// # use thingtalk_ast::{NodePath, SourceMap, Span};
/// let mut sources = SourceMap::new();
/// let file_id = sources.add_file("rule.tt", "now => ;".to_string());
/// let error = CompileError::new(
///     ErrorKind::Syntax,
///     NodePath::root(),
///     "unexpected ';'".to_string(),
/// )
/// .with_span(Span::new(file_id, 7, 8, 1));
///
/// let formatted = DiagnosticFormatter::new(&sources).format(&error);
/// assert!(formatted.contains("rule.tt:1:8"));
/// ```
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    /// Formats a diagnostic as a string with source context.
    pub fn format(&self, error: &CompileError) -> String {
        let mut output = format!("{}\n", error);

        match error.span {
            Some(span) => self.push_snippet(&mut output, &span),
            None => output.push_str(&format!("  --> {}\n", error.path)),
        }

        for label in &error.labels {
            output.push_str(&format!("   = note: {}\n", label.message));
            output.push_str(&format!("     at {}\n", label.path));
        }

        for note in &error.notes {
            output.push_str(&format!("   = help: {}\n", note));
        }

        output
    }

    fn push_snippet(&self, output: &mut String, span: &Span) {
        let (line, col) = self.sources.line_col(span);
        output.push_str(&format!(
            "  --> {}:{}:{}\n",
            self.sources.file_name(span),
            line,
            col
        ));

        let Some(source_line) = self.sources.file(span).and_then(|f| f.line_text(line)) else {
            return;
        };
        output.push_str("   |\n");
        output.push_str(&format!("{:3} | {}\n", line, source_line));

        let start_col = col as usize;
        let span_len = span.end.saturating_sub(span.start) as usize;
        let end_col = (start_col + span_len).min(source_line.len() + 1);
        let underline = " ".repeat(start_col.saturating_sub(1))
            + &"^".repeat(end_col.saturating_sub(start_col).max(1));
        output.push_str(&format!("   | {}\n", underline));
    }

    /// Formats multiple diagnostics, separated by blank lines.
    pub fn format_all(&self, errors: &[CompileError]) -> String {
        errors
            .iter()
            .map(|e| self.format(e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
