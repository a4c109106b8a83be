//! The streaming event protocol shared by every codec.
//!
//! Parsing pushes events from a codec into the receiver traits in
//! [`events`]; serializing pulls the mirror-image [`Serializer`] calls from a
//! consumer into a codec. Both directions deliver the same logical content:
//! a version, a header, non-interleaved attribute columns, triangles and
//! metadata blocks.

mod events;
mod serializer;
mod trace;
mod value;

pub use events::{
    AttributesEvents, BodyEvents, Diagnostics, HeaderEvents, MetaEvents, ParserEvents,
    TrianglesEvents, ValuesEvents,
};
pub use serializer::{Serializer, SerializerGuard};
pub use trace::{EventTrace, TraceOptions};
pub use value::{AttributeValue, Components};
