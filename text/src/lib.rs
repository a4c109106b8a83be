//! # SMF Text
//!
//! The `smft` encoding: a line-oriented, human-editable rendition of an SMF
//! mesh. A stream starts with `smf <major> <minor>`, continues with header
//! commands up to `end`, then carries any of the `vertices-noninterleaved`,
//! `triangles` and `metadata` sections, each closed by `end`.
//!
//! ```text
//! smf 1 0
//! vertices 3
//! triangles 1 16
//! coordinates +x +y -z counter-clockwise
//! attribute "position" float 3 32
//! end
//! vertices-noninterleaved
//! attribute "position"
//! 0.0 0.0 0.0
//! 1.0 0.0 0.0
//! 0.0 1.0 0.0
//! end
//! triangles
//! 0 1 2
//! end
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

mod format;
mod header;
mod lexer;
mod lines;
mod parser;
mod sections;
mod serializer;

pub use format::{FORMAT, TextFormat};
pub use lexer::{LexError, lex, quote};
pub use parser::TextParser;
pub use serializer::TextSerializer;
