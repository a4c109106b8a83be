//! Splitting lines into tokens.
//!
//! Tokens are separated by whitespace. A token starting with `"` runs to the
//! next unescaped `"` and may contain whitespace; inside it `\"` and `\\`
//! stand for `"` and `\`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated string starting at column {0}")]
    UnterminatedString(usize),
    #[error("unrecognized escape '\\{escape}' at column {column}")]
    UnknownEscape { escape: char, column: usize },
}

/// Tokenize one line.
pub fn lex(line: &str) -> Result<Vec<String>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' {
            chars.next();
            let mut token = String::new();
            let mut closed = false;
            while let Some((column, c)) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some((_, '"')) => token.push('"'),
                        Some((_, '\\')) => token.push('\\'),
                        Some((_, escape)) => return Err(LexError::UnknownEscape { escape, column }),
                        None => return Err(LexError::UnterminatedString(start)),
                    },
                    c => token.push(c),
                }
            }
            if !closed {
                return Err(LexError::UnterminatedString(start));
            }
            tokens.push(token);
            continue;
        }

        let mut token = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            token.push(c);
            chars.next();
        }
        tokens.push(token);
    }

    Ok(tokens)
}

/// Quote `text` so that [`lex`] reads it back as one token.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
