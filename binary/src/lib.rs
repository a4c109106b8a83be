//! # SMF Binary
//!
//! The `smfb` encoding: a 16 octet file header followed by tagged sections,
//! each carrying its own size so readers can skip what they do not need.
//!
//! ```text
//! 89 53 4D 46 0D 0A 1A 0A   magic
//! u32 major, u32 minor      format version (2.0)
//! SMF_HEAD                  header
//! SMF_VDNI                  non-interleaved vertex data     (optional)
//! SMF_TRIS                  triangles                       (optional)
//! SMF_META                  metadata                        (any number)
//! SMF_END!                  end of stream
//! ```
//!
//! Vertex data is written in the byte order chosen with [`BinaryOptions`];
//! everything else is big-endian.

mod format;
mod head;
mod io;
mod parser;
mod sections;
mod serializer;
mod structures;

pub use format::{BinaryFormat, BinaryOptions, FORMAT};
pub use parser::BinaryParser;
pub use serializer::BinarySerializer;
