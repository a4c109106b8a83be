//! Receiver side of the event protocol.
//!
//! A codec drives these traits while it reads a stream. Each stage, when
//! offered, returns either a receiver for the next stage or `None`. `None`
//! means the consumer does not want that level of detail: the codec skips
//! the corresponding bytes and calls none of that stage's per-item methods.
//!
//! Call order for one session:
//!
//! ```text
//! on_start
//! on_version_received ─▶ HeaderEvents
//!     on_header_parsed ─▶ BodyEvents            (only for a valid header)
//!         on_attributes_non_interleaved ─▶ AttributesEvents
//!             { on_data_attribute_start ─▶ ValuesEvents { on_value }*
//!               on_data_attribute_value_finish }*   (header order)
//!             on_data_attributes_non_interleaved_finish
//!         on_triangles ─▶ TrianglesEvents
//!             on_data_triangle* on_data_triangles_finish
//!         on_meta ─▶ MetaEvents
//!             on_meta_data
//! on_finish
//! ```
//!
//! The three body sections arrive in stream order. Every start that was
//! delivered is matched by exactly one finish, even when errors occur in
//! between, and `on_finish` is always the last call.

use crate::diagnostic::{ParseError, ParseWarning};
use crate::layout::{Attribute, FormatVersion, Header, SchemaIdentifier};
use crate::protocol::AttributeValue;

/// Error and warning channel shared by every stage.
pub trait Diagnostics {
    fn on_warning(&mut self, warning: ParseWarning);
    fn on_error(&mut self, error: ParseError);
}

/// Top-level receiver for one parse session.
pub trait ParserEvents: Diagnostics {
    /// Always the first call.
    fn on_start(&mut self);

    /// The stream declared a supported format version.
    ///
    /// Returning `None` ends parsing after this call.
    fn on_version_received(&mut self, version: FormatVersion) -> Option<&mut dyn HeaderEvents>;

    /// Always the last call.
    fn on_finish(&mut self);
}

pub trait HeaderEvents: Diagnostics {
    /// A header satisfying every layout invariant was read.
    fn on_header_parsed(&mut self, header: &Header) -> Option<&mut dyn BodyEvents>;
}

/// Offers of the body sections, in the order the stream presents them.
pub trait BodyEvents: Diagnostics {
    fn on_attributes_non_interleaved(&mut self) -> Option<&mut dyn AttributesEvents> {
        None
    }

    fn on_triangles(&mut self) -> Option<&mut dyn TrianglesEvents> {
        None
    }

    /// A metadata block with the given schema follows.
    fn on_meta(&mut self, _schema: &SchemaIdentifier) -> Option<&mut dyn MetaEvents> {
        None
    }
}

/// Non-interleaved vertex data: one attribute column at a time.
pub trait AttributesEvents: Diagnostics {
    /// Data for `attribute` follows. Attributes arrive in header order.
    fn on_data_attribute_start(&mut self, attribute: &Attribute) -> Option<&mut dyn ValuesEvents>;

    /// Matches every [`AttributesEvents::on_data_attribute_start`], whether
    /// or not values were accepted.
    fn on_data_attribute_value_finish(&mut self, _attribute: &Attribute) {}

    fn on_data_attributes_non_interleaved_finish(&mut self) {}
}

/// Values of one attribute, exactly `vertex_count` of them.
pub trait ValuesEvents: Diagnostics {
    fn on_value(&mut self, value: &AttributeValue);
}

/// Triangles, exactly `triangle_count` of them.
pub trait TrianglesEvents: Diagnostics {
    fn on_data_triangle(&mut self, v0: u64, v1: u64, v2: u64);

    fn on_data_triangles_finish(&mut self) {}
}

pub trait MetaEvents: Diagnostics {
    fn on_meta_data(&mut self, schema: &SchemaIdentifier, data: &[u8]);
}
