//! Parse errors and collected diagnostics.

use std::fmt;
use thiserror::Error;

/// Category of parse error.
///
/// A parse error aborts the current compilation unit; there is no local
/// recovery. Partially built nodes are reclaimed when the arena is
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token kind: an identifier, string, or number where a
    /// different kind was required.
    LexicalRelay,
    /// Expected one of a fixed set of keywords.
    ExpectedKeyword,
    /// Missing `end if` / `end repeat` / `end <handler>`, or the token
    /// stream ran out mid-construct.
    UnterminatedConstruct,
    /// `set` target not in the global-property table.
    UnknownProperty,
    /// Reserved shapes: `set P of OBJ to …`, bare `global`.
    UnsupportedConstruct,
    /// The term parser exhausted its alternatives.
    MalformedExpression,
}

/// Structured parse diagnostic.
///
/// Carries the file name, the 1-based line of the offending token, a
/// human-readable message, and a description of the offending token
/// when one was available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{line}: error: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub file: String,
    pub line: u32,
    pub message: String,
    /// Description of the offending token, if the stream had one.
    pub found: Option<String>,
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A collected warning or error message.
///
/// Warnings (unknown top-level constructs) do not abort parsing; they
/// accumulate on the parser and go to the tracing channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.file, self.line, self.severity, self.message
        )
    }
}
