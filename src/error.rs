//! Error types for the DBD grammar engine.
//!
//! This module provides a unified error type [`DbdError`] covering lexical,
//! syntax, resource-limit and I/O failures. Parsing is all-or-nothing: every
//! error is fatal to the document being parsed and propagates synchronously
//! to the caller of the parse entry point.

use thiserror::Error;

/// Result type alias using [`DbdError`].
pub type Result<T> = std::result::Result<T, DbdError>;

/// Unified error type for all DBD operations.
#[derive(Error, Debug)]
pub enum DbdError {
    /// A byte invalid for the scanner's current state, or a malformed
    /// quoted string.
    #[error("invalid input {found} in state {state} at line {line}, column {column}")]
    Lex {
        /// Name of the scanner state that rejected the byte
        state: &'static str,
        /// Description of the offending input (byte or condition)
        found: String,
        line: u32,
        column: u32,
    },

    /// A token invalid for the parser's current state.
    #[error("syntax error at line {line}, column {column}: {message} (near {token:?})")]
    Syntax {
        message: String,
        /// Text of the offending token
        token: String,
        line: u32,
        column: u32,
    },

    /// A string-length or argument-count ceiling was exceeded.
    #[error("limit exceeded: {message}")]
    Limit { message: String },

    /// A named file could not be opened or read.
    #[error("failed to read '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure on an already-open stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// One frame of a nested-parse backtrace. Chained frames read
    /// innermost first.
    #[error("in {file} at line {line}, column {column}: {source}")]
    Include {
        file: String,
        line: u32,
        column: u32,
        #[source]
        source: Box<DbdError>,
    },
}

/// One {file, line, column} frame of a nested-parse backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl DbdError {
    /// Create a lexical error.
    pub fn lex(state: &'static str, found: impl Into<String>, line: u32, column: u32) -> Self {
        Self::Lex {
            state,
            found: found.into(),
            line,
            column,
        }
    }

    /// Create a syntax error.
    pub fn syntax(
        message: impl Into<String>,
        token: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self::Syntax {
            message: message.into(),
            token: token.into(),
            line,
            column,
        }
    }

    /// Create a resource-limit error.
    pub fn limit(message: impl Into<String>) -> Self {
        Self::Limit {
            message: message.into(),
        }
    }

    /// Wrap this error in a nested-parse frame. A loader resolving an
    /// include directive records here which file referenced the failing
    /// sub-document and where.
    pub fn in_file(self, file: impl Into<String>, line: u32, column: u32) -> Self {
        Self::Include {
            file: file.into(),
            line,
            column,
            source: Box::new(self),
        }
    }

    /// The accumulated nested-parse frames of this error, innermost first.
    pub fn frames(&self) -> Vec<Frame> {
        let mut out = Vec::new();
        let mut cur = self;
        while let Self::Include {
            file,
            line,
            column,
            source,
        } = cur
        {
            out.push(Frame {
                file: file.clone(),
                line: *line,
                column: *column,
            });
            cur = source;
        }
        out.reverse();
        out
    }
}
