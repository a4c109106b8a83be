//! Positions, data errors and warnings reported while parsing.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Where in a source something was found.
///
/// Text codecs report 1-based lines and 0-based columns. Binary codecs
/// report line 0 and the absolute byte offset as the column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LexicalPosition {
    pub source: Option<Arc<str>>,
    pub line: u64,
    pub column: u64,
}

impl LexicalPosition {
    pub fn new(source: Option<Arc<str>>, line: u64, column: u64) -> Self {
        Self {
            source,
            line,
            column,
        }
    }

    /// Position of a byte offset within a binary source.
    pub fn at_offset(source: Option<Arc<str>>, offset: u64) -> Self {
        Self::new(source, 0, offset)
    }
}

impl fmt::Display for LexicalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{source}:{}:{}", self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// A data error: malformed or semantically invalid input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{position}: {message}")]
pub struct ParseError {
    pub position: LexicalPosition,
    pub message: String,
    /// Description of an underlying cause, such as an I/O failure.
    pub cause: Option<String>,
}

impl ParseError {
    pub fn new(position: LexicalPosition, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
            cause: None,
        }
    }

    /// An error without positional context.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(LexicalPosition::default(), message)
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

/// A recoverable oddity that does not invalidate the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub position: LexicalPosition,
    pub message: String,
}

impl ParseWarning {
    pub fn new(position: LexicalPosition, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        let pos = LexicalPosition::new(Some(Arc::from("cube.smft")), 4, 2);
        assert_eq!(pos.to_string(), "cube.smft:4:2");
        assert_eq!(LexicalPosition::at_offset(None, 64).to_string(), "0:64");
    }

    #[test]
    fn test_error_display_and_cause() {
        let err = ParseError::new(LexicalPosition::new(None, 3, 0), "Unexpected EOF")
            .with_cause("stream closed");
        assert_eq!(err.to_string(), "3:0: Unexpected EOF");
        assert_eq!(err.cause.as_deref(), Some("stream closed"));
    }
}
