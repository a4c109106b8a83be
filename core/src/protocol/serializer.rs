//! Serializer side of the event protocol.
//!
//! Every codec's serializer owns a [`SerializerGuard`] and consults it before
//! writing anything. The guard is the single place where the call order is
//! enforced, so all codecs reject the same misuse in the same way.

use std::fmt;
use std::io;

use crate::error::{ProtocolViolation, SerializeError, SerializeResult};
use crate::layout::{Attribute, AttributeName, Header, SchemaIdentifier};
use crate::protocol::AttributeValue;

/// Writes a mesh in some concrete encoding.
///
/// Calls must follow the protocol order:
///
/// ```text
/// serialize_header
/// [ serialize_vertex_data_non_interleaved_start
///   { serialize_data(name) serialize_value* }*     (header order)
///   serialize_vertex_data_non_interleaved_finish ]
/// [ serialize_triangles_start serialize_triangle* serialize_triangles_finish ]
/// serialize_metadata*                               (between sections)
/// finish
/// ```
///
/// The first call that breaks the order returns
/// [`SerializeError::Protocol`]; after that, or after an I/O error or an
/// [`SerializeError::Unencodable`] value, every call returns
/// [`SerializeError::Failed`].
pub trait Serializer {
    fn serialize_header(&mut self, header: &Header) -> SerializeResult<()>;

    fn serialize_vertex_data_non_interleaved_start(&mut self) -> SerializeResult<()>;

    /// Begin the values of the named attribute.
    fn serialize_data(&mut self, name: &AttributeName) -> SerializeResult<()>;

    fn serialize_value(&mut self, value: &AttributeValue) -> SerializeResult<()>;

    fn serialize_vertex_data_non_interleaved_finish(&mut self) -> SerializeResult<()>;

    fn serialize_triangles_start(&mut self) -> SerializeResult<()>;

    fn serialize_triangle(&mut self, v0: u64, v1: u64, v2: u64) -> SerializeResult<()>;

    fn serialize_triangles_finish(&mut self) -> SerializeResult<()>;

    fn serialize_metadata(&mut self, schema: &SchemaIdentifier, data: &[u8]) -> SerializeResult<()>;

    /// Write any trailer and flush the stream.
    fn finish(&mut self) -> SerializeResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Ready,
    Vertices {
        next: usize,
        current: Option<(usize, u64)>,
    },
    Triangles {
        received: u64,
    },
    Finished,
    Failed,
}

/// Tracks where a serializer is in the protocol.
#[derive(Debug)]
pub struct SerializerGuard {
    state: State,
    header: Option<Header>,
    vertices_done: bool,
    triangles_done: bool,
}

impl SerializerGuard {
    pub fn new() -> Self {
        Self {
            state: State::Initial,
            header: None,
            vertices_done: false,
            triangles_done: false,
        }
    }

    /// The header, once it has been accepted.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn is_failed(&self) -> bool {
        self.state == State::Failed
    }

    /// Mark the session failed.
    pub fn fail(&mut self) {
        self.state = State::Failed;
    }

    /// Pass an I/O result through, failing the session on error.
    pub fn io<T>(&mut self, result: io::Result<T>) -> SerializeResult<T> {
        result.map_err(|e| {
            self.fail();
            SerializeError::Io(e)
        })
    }

    /// Fail the session because `format` cannot represent part of the mesh.
    pub fn unencodable<T>(&mut self, format: &'static str, message: impl fmt::Display) -> SerializeResult<T> {
        let message = message.to_string();
        log::error!("{format} cannot encode this mesh: {message}");
        self.fail();
        Err(SerializeError::Unencodable { format, message })
    }

    fn violation<T>(&mut self, violation: ProtocolViolation) -> SerializeResult<T> {
        log::error!("serializer protocol violation: {violation}");
        self.fail();
        Err(SerializeError::Protocol(violation))
    }

    fn check_live(&mut self) -> SerializeResult<()> {
        match self.state {
            State::Failed => Err(SerializeError::Failed),
            State::Finished => self.violation(ProtocolViolation::Finished),
            _ => Ok(()),
        }
    }

    fn require_ready(&mut self) -> SerializeResult<()> {
        self.check_live()?;
        match self.state {
            State::Ready => Ok(()),
            State::Initial => self.violation(ProtocolViolation::HeaderNotSerialized),
            State::Vertices { .. } => {
                self.violation(ProtocolViolation::SectionStillOpen("vertex data"))
            }
            State::Triangles { .. } => self.violation(ProtocolViolation::SectionStillOpen("triangle")),
            State::Finished | State::Failed => Err(SerializeError::Failed),
        }
    }

    pub fn header_accepted(&mut self, header: &Header) -> SerializeResult<()> {
        self.check_live()?;
        if self.state != State::Initial {
            return self.violation(ProtocolViolation::HeaderAlreadySerialized);
        }
        self.header = Some(header.clone());
        self.state = State::Ready;
        Ok(())
    }

    pub fn vertices_start(&mut self) -> SerializeResult<()> {
        self.require_ready()?;
        if self.vertices_done {
            return self.violation(ProtocolViolation::SectionAlreadySerialized("vertices"));
        }
        self.state = State::Vertices {
            next: 0,
            current: None,
        };
        Ok(())
    }

    /// Begin an attribute, returning its declaration.
    pub fn data_start(&mut self, name: &AttributeName) -> SerializeResult<&Attribute> {
        self.check_live()?;
        match self.check_data_start(name) {
            Ok(index) => {
                self.state = State::Vertices {
                    next: index + 1,
                    current: Some((index, 0)),
                };
                self.attribute_at(index)
            }
            Err(violation) => self.violation(violation),
        }
    }

    fn check_data_start(&self, name: &AttributeName) -> Result<usize, ProtocolViolation> {
        let State::Vertices { next, current } = self.state else {
            return Err(ProtocolViolation::SectionNotOpen("vertex data"));
        };
        let header = self
            .header
            .as_ref()
            .ok_or(ProtocolViolation::HeaderNotSerialized)?;
        check_attribute_complete(header, current)?;
        if header.attribute(name).is_none() {
            return Err(ProtocolViolation::UnknownAttribute(name.clone()));
        }
        let expected = header
            .attributes_in_order()
            .get(next)
            .ok_or(ProtocolViolation::NoMoreAttributes)?;
        if expected.name() != name {
            return Err(ProtocolViolation::AttributeOutOfOrder {
                expected: expected.name().clone(),
                received: name.clone(),
            });
        }
        Ok(next)
    }

    /// Account for one value of the current attribute, returning its
    /// declaration.
    pub fn value(&mut self, value: &AttributeValue) -> SerializeResult<&Attribute> {
        self.check_live()?;
        match self.check_value(value) {
            Ok((next, index, received)) => {
                self.state = State::Vertices {
                    next,
                    current: Some((index, received + 1)),
                };
                self.attribute_at(index)
            }
            Err(violation) => self.violation(violation),
        }
    }

    fn check_value(&self, value: &AttributeValue) -> Result<(usize, usize, u64), ProtocolViolation> {
        let State::Vertices { next, current } = self.state else {
            return Err(ProtocolViolation::SectionNotOpen("vertex data"));
        };
        let (index, received) = current.ok_or(ProtocolViolation::NoAttributeStarted)?;
        let header = self
            .header
            .as_ref()
            .ok_or(ProtocolViolation::HeaderNotSerialized)?;
        let attribute = &header.attributes_in_order()[index];
        if received >= header.vertex_count() {
            return Err(ProtocolViolation::TooManyValues {
                attribute: attribute.name().clone(),
                expected: header.vertex_count(),
            });
        }
        value.check_shape(attribute)?;
        value.check_range(attribute)?;
        Ok((next, index, received))
    }

    fn attribute_at(&self, index: usize) -> SerializeResult<&Attribute> {
        self.header
            .as_ref()
            .and_then(|h| h.attributes_in_order().get(index))
            .ok_or(SerializeError::Failed)
    }

    pub fn vertices_finish(&mut self) -> SerializeResult<()> {
        self.check_live()?;
        match self.check_vertices_finish() {
            Ok(()) => {
                self.vertices_done = true;
                self.state = State::Ready;
                Ok(())
            }
            Err(violation) => self.violation(violation),
        }
    }

    fn check_vertices_finish(&self) -> Result<(), ProtocolViolation> {
        let State::Vertices { next, current } = self.state else {
            return Err(ProtocolViolation::SectionNotOpen("vertex data"));
        };
        let header = self
            .header
            .as_ref()
            .ok_or(ProtocolViolation::HeaderNotSerialized)?;
        check_attribute_complete(header, current)?;
        if next < header.attributes_in_order().len() {
            let missed = header.attributes_in_order()[next..]
                .iter()
                .map(|a| a.name().clone())
                .collect();
            return Err(ProtocolViolation::MissedAttributes(missed));
        }
        Ok(())
    }

    pub fn triangles_start(&mut self) -> SerializeResult<()> {
        self.require_ready()?;
        if self.triangles_done {
            return self.violation(ProtocolViolation::SectionAlreadySerialized("triangles"));
        }
        self.state = State::Triangles { received: 0 };
        Ok(())
    }

    /// Account for one triangle.
    pub fn triangle(&mut self, v0: u64, v1: u64, v2: u64) -> SerializeResult<()> {
        self.check_live()?;
        match self.check_triangle([v0, v1, v2]) {
            Ok(received) => {
                self.state = State::Triangles {
                    received: received + 1,
                };
                Ok(())
            }
            Err(violation) => self.violation(violation),
        }
    }

    fn check_triangle(&self, indices: [u64; 3]) -> Result<u64, ProtocolViolation> {
        let State::Triangles { received } = self.state else {
            return Err(ProtocolViolation::SectionNotOpen("triangle"));
        };
        let triangles = self
            .header
            .as_ref()
            .ok_or(ProtocolViolation::HeaderNotSerialized)?
            .triangles();
        if received >= triangles.triangle_count() {
            return Err(ProtocolViolation::TooManyTriangles {
                expected: triangles.triangle_count(),
            });
        }
        if let Some(&index) = indices.iter().find(|&&v| v > triangles.max_index()) {
            return Err(ProtocolViolation::TriangleIndexTooLarge {
                index,
                bits: triangles.index_size_bits(),
            });
        }
        Ok(received)
    }

    pub fn triangles_finish(&mut self) -> SerializeResult<()> {
        self.check_live()?;
        let State::Triangles { received } = self.state else {
            return self.violation(ProtocolViolation::SectionNotOpen("triangle"));
        };
        let expected = self
            .header
            .as_ref()
            .map_or(0, |h| h.triangles().triangle_count());
        if received != expected {
            return self.violation(ProtocolViolation::TooFewTriangles { expected, received });
        }
        self.triangles_done = true;
        self.state = State::Ready;
        Ok(())
    }

    pub fn metadata(&mut self) -> SerializeResult<()> {
        self.require_ready()
    }

    pub fn finish(&mut self) -> SerializeResult<()> {
        self.require_ready()?;
        self.state = State::Finished;
        Ok(())
    }
}

/// The attribute in progress, if any, must have received every value.
fn check_attribute_complete(
    header: &Header,
    current: Option<(usize, u64)>,
) -> Result<(), ProtocolViolation> {
    match current {
        Some((index, received)) if received != header.vertex_count() => {
            Err(ProtocolViolation::TooFewValues {
                attribute: header.attributes_in_order()[index].name().clone(),
                expected: header.vertex_count(),
                received,
            })
        }
        _ => Ok(()),
    }
}

impl Default for SerializerGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ComponentType, TriangleBlock};

    fn name(s: &str) -> AttributeName {
        AttributeName::new(s).unwrap()
    }

    fn header() -> Header {
        Header::builder()
            .with_vertex_count(2)
            .with_triangles(TriangleBlock::new(1, 8).unwrap())
            .with_attribute(Attribute::new(name("position"), ComponentType::Float, 3, 32).unwrap())
            .with_attribute(Attribute::new(name("id"), ComponentType::UnsignedInteger, 1, 8).unwrap())
            .build()
            .unwrap()
    }

    fn position() -> AttributeValue {
        AttributeValue::float(&[0.0, 1.0, 2.0]).unwrap()
    }

    fn id(v: u64) -> AttributeValue {
        AttributeValue::unsigned(&[v]).unwrap()
    }

    fn assert_violation<T: std::fmt::Debug>(result: SerializeResult<T>) {
        assert!(
            matches!(result, Err(SerializeError::Protocol(_))),
            "expected protocol violation, got {result:?}"
        );
    }

    #[test]
    fn test_full_sequence() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.vertices_start().unwrap();
        guard.data_start(&name("position")).unwrap();
        guard.value(&position()).unwrap();
        guard.value(&position()).unwrap();
        guard.data_start(&name("id")).unwrap();
        guard.value(&id(1)).unwrap();
        guard.value(&id(255)).unwrap();
        guard.vertices_finish().unwrap();
        guard.triangles_start().unwrap();
        guard.triangle(0, 1, 1).unwrap();
        guard.triangles_finish().unwrap();
        guard.metadata().unwrap();
        guard.finish().unwrap();
    }

    #[test]
    fn test_data_before_header() {
        let mut guard = SerializerGuard::new();
        assert_violation(guard.vertices_start());
        assert!(guard.is_failed());
        assert!(matches!(
            guard.header_accepted(&header()),
            Err(SerializeError::Failed)
        ));
    }

    #[test]
    fn test_unencodable_fails_the_session() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        let result: SerializeResult<()> = guard.unencodable("test", "value out of range");
        assert!(matches!(
            result,
            Err(SerializeError::Unencodable { format: "test", ref message }) if message == "value out of range"
        ));
        assert!(guard.is_failed());
        assert!(matches!(guard.vertices_start(), Err(SerializeError::Failed)));
    }

    #[test]
    fn test_header_twice() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        assert_violation(guard.header_accepted(&header()));
    }

    #[test]
    fn test_attribute_out_of_order() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.vertices_start().unwrap();
        let result = guard.data_start(&name("id"));
        assert!(matches!(
            result,
            Err(SerializeError::Protocol(ProtocolViolation::AttributeOutOfOrder { .. }))
        ));
        assert!(matches!(guard.vertices_finish(), Err(SerializeError::Failed)));
    }

    #[test]
    fn test_unknown_attribute() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.vertices_start().unwrap();
        assert!(matches!(
            guard.data_start(&name("tangent")),
            Err(SerializeError::Protocol(ProtocolViolation::UnknownAttribute(_)))
        ));
    }

    #[test]
    fn test_value_count_enforced() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.vertices_start().unwrap();
        guard.data_start(&name("position")).unwrap();
        guard.value(&position()).unwrap();
        assert!(matches!(
            guard.data_start(&name("id")),
            Err(SerializeError::Protocol(ProtocolViolation::TooFewValues { received: 1, .. }))
        ));

        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.vertices_start().unwrap();
        guard.data_start(&name("position")).unwrap();
        guard.value(&position()).unwrap();
        guard.value(&position()).unwrap();
        assert!(matches!(
            guard.value(&position()),
            Err(SerializeError::Protocol(ProtocolViolation::TooManyValues { .. }))
        ));
    }

    #[test]
    fn test_value_shape_and_range() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.vertices_start().unwrap();
        guard.data_start(&name("position")).unwrap();
        assert!(matches!(
            guard.value(&id(0)),
            Err(SerializeError::Protocol(ProtocolViolation::ValueShapeMismatch { .. }))
        ));

        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.vertices_start().unwrap();
        guard.data_start(&name("position")).unwrap();
        guard.value(&position()).unwrap();
        guard.value(&position()).unwrap();
        guard.data_start(&name("id")).unwrap();
        assert!(matches!(
            guard.value(&id(256)),
            Err(SerializeError::Protocol(ProtocolViolation::ValueOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_missed_attributes() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.vertices_start().unwrap();
        guard.data_start(&name("position")).unwrap();
        guard.value(&position()).unwrap();
        guard.value(&position()).unwrap();
        assert!(matches!(
            guard.vertices_finish(),
            Err(SerializeError::Protocol(ProtocolViolation::MissedAttributes(missed)))
                if missed == vec![name("id")]
        ));
    }

    #[test]
    fn test_triangles() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.triangles_start().unwrap();
        assert!(matches!(
            guard.triangle(0, 256, 1),
            Err(SerializeError::Protocol(ProtocolViolation::TriangleIndexTooLarge { index: 256, bits: 8 }))
        ));

        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.triangles_start().unwrap();
        assert_violation(guard.triangles_finish());

        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.triangles_start().unwrap();
        guard.triangle(0, 1, 2).unwrap();
        assert_violation(guard.triangle(0, 1, 2));
    }

    #[test]
    fn test_sections_not_repeated_and_closed() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.triangles_start().unwrap();
        assert_violation(guard.metadata());

        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.triangles_start().unwrap();
        guard.triangle(0, 1, 2).unwrap();
        guard.triangles_finish().unwrap();
        assert_violation(guard.triangles_start());
    }

    #[test]
    fn test_calls_after_finish() {
        let mut guard = SerializerGuard::new();
        guard.header_accepted(&header()).unwrap();
        guard.finish().unwrap();
        assert!(matches!(
            guard.metadata(),
            Err(SerializeError::Protocol(ProtocolViolation::Finished))
        ));
        assert!(matches!(guard.finish(), Err(SerializeError::Failed)));
    }

    #[test]
    fn test_io_error_fails_session() {
        let mut guard = SerializerGuard::new();
        let result: SerializeResult<()> =
            guard.io(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")));
        assert!(matches!(result, Err(SerializeError::Io(_))));
        assert!(matches!(
            guard.header_accepted(&header()),
            Err(SerializeError::Failed)
        ));
    }
}
