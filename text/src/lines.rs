use std::io::BufRead;
use std::sync::Arc;

use smf_core::diagnostic::{LexicalPosition, ParseError};

use crate::lexer;

/// Reads lexed lines, skipping blank lines and `#` comments.
pub struct LineReader<R> {
    reader: R,
    source: Option<Arc<str>>,
    line: u64,
    buffer: String,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R, source: Option<Arc<str>>) -> Self {
        Self {
            reader,
            source,
            line: 0,
            buffer: String::new(),
        }
    }

    /// Position of the line most recently read.
    pub fn position(&self) -> LexicalPosition {
        LexicalPosition::new(self.source.clone(), self.line, 0)
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.position(), message)
    }

    /// The tokens of the next non-blank line, or `None` at the end of the
    /// stream.
    pub fn next_tokens(&mut self) -> Result<Option<Vec<String>>, ParseError> {
        loop {
            self.buffer.clear();
            let read = self
                .reader
                .read_line(&mut self.buffer)
                .map_err(|e| self.error("I/O error while reading").with_cause(e))?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;

            let trimmed = self.buffer.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            log::trace!("{}: {}", self.position(), trimmed);
            return lexer::lex(trimmed)
                .map(Some)
                .map_err(|e| ParseError::new(self.position(), e.to_string()));
        }
    }

    /// Like [`LineReader::next_tokens`], but the end of the stream is an error.
    pub fn require_tokens(&mut self) -> Result<Vec<String>, ParseError> {
        self.next_tokens()?
            .ok_or_else(|| self.error("Unexpected EOF"))
    }

    /// Discard lines up to and including the next `end`.
    pub fn skip_until_end(&mut self) -> Result<(), ParseError> {
        loop {
            let tokens = self.require_tokens()?;
            if is_end(&tokens) {
                return Ok(());
            }
        }
    }
}

pub fn is_end(tokens: &[String]) -> bool {
    tokens.len() == 1 && tokens[0] == "end"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(text: &'static str) -> LineReader<&'static [u8]> {
        LineReader::new(text.as_bytes(), Some(Arc::from("test.smft")))
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let mut lines = reader("\n# comment\n  a b\n\n   # another\nc\n");
        assert_eq!(lines.next_tokens().unwrap().unwrap(), ["a", "b"]);
        assert_eq!(lines.position().line, 3);
        assert_eq!(lines.next_tokens().unwrap().unwrap(), ["c"]);
        assert_eq!(lines.position().line, 6);
        assert_eq!(lines.next_tokens().unwrap(), None);
    }

    #[test]
    fn test_unexpected_eof() {
        let mut lines = reader("x\n");
        lines.require_tokens().unwrap();
        let error = lines.require_tokens().unwrap_err();
        assert_eq!(error.message, "Unexpected EOF");
        assert_eq!(error.to_string(), "test.smft:1:0: Unexpected EOF");
    }

    #[test]
    fn test_skip_until_end() {
        let mut lines = reader("1 2\n3 4\nend\nnext\n");
        lines.skip_until_end().unwrap();
        assert_eq!(lines.next_tokens().unwrap().unwrap(), ["next"]);
    }

    #[test]
    fn test_lex_error_has_position() {
        let mut lines = reader("ok\nattribute \"open\n");
        lines.next_tokens().unwrap();
        let error = lines.next_tokens().unwrap_err();
        assert_eq!(error.position.line, 2);
    }
}
