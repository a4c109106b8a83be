//! Layout value types.
//!
//! Every type here checks its invariants at construction. Once a value
//! exists it is valid, so codecs and consumers never re-validate an
//! [`Attribute`] or a [`Header`] they were handed.

mod attribute;
mod coords;
mod header;
mod names;
mod schema;
mod triangles;

pub use attribute::{Attribute, ComponentType};
pub use coords::{Axis, AxisSystem, CoordinateSystem, WindingOrder};
pub use header::{Header, HeaderBuilder};
pub use names::{AttributeName, MAXIMUM_NAME_CHARACTERS, SchemaName};
pub use schema::{FormatVersion, SchemaIdentifier};
pub use triangles::TriangleBlock;

/// Byte order of multi-octet values in a buffer or stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    /// Byte order of the running platform.
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::LittleEndian
        } else {
            Self::BigEndian
        }
    }
}
