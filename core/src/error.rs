//! Error types shared by the SMF crates.
//!
//! Three families are kept apart:
//!
//! - [`LayoutError`] and [`PackingError`] are construction failures of value
//!   types (attributes, headers, packing configurations).
//! - [`ProtocolViolation`] is a defect in calling code that drives a
//!   serializer out of order. It is never accumulated with data errors.
//! - Data errors found while parsing are not Rust errors at all; they are
//!   [`ParseError`](crate::diagnostic::ParseError) values delivered through
//!   the event protocol.

use thiserror::Error;

use crate::layout::{AttributeName, Axis, ComponentType, FormatVersion};

/// Failure to construct a layout value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("invalid attribute name '{0}': must be 1-64 characters of letters, digits, '_', '-' or '.'")]
    InvalidAttributeName(String),
    #[error("invalid schema name '{0}': must be a dotted identifier of at most 64 characters")]
    InvalidSchemaName(String),
    #[error("unsupported component count {0}: must be in [1, 4]")]
    UnsupportedComponentCount(u32),
    #[error("unsupported component size {bits} for component type {component_type}")]
    UnsupportedComponentSize {
        component_type: ComponentType,
        bits: u32,
    },
    #[error("unrecognized component type '{0}'")]
    UnknownComponentType(String),
    #[error("unsupported triangle index size {0}: must be one of 8, 16, 32, 64")]
    UnsupportedIndexSize(u32),
    #[error("axes {right} {up} {forward} are not mutually perpendicular")]
    AxesNotPerpendicular { right: Axis, up: Axis, forward: Axis },
    #[error("invalid coordinate system '{0}'")]
    InvalidCoordinateSystem(String),
    #[error("duplicate attribute name '{0}'")]
    DuplicateAttribute(AttributeName),
}

/// Failure to compute or address an interleaved vertex layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackingError {
    #[error("vertex size overflows u32 at attribute '{0}'")]
    VertexSizeOverflow(AttributeName),
    #[error("offset for attribute {position} of vertex {vertex} overflows u64")]
    OffsetOverflow { position: usize, vertex: u64 },
    #[error("attribute position {position} is out of range (attribute count {count})")]
    InvalidAttributePosition { position: usize, count: usize },
    #[error("alignment {0} is not a non-zero power of two")]
    InvalidAlignment(u32),
    #[error("attribute '{0}' is not present in the header")]
    UnknownAttribute(AttributeName),
    #[error("buffer size for {vertex_count} vertices of {vertex_size} octets overflows usize")]
    BufferSizeOverflow { vertex_count: u64, vertex_size: u32 },
}

/// A serializer was driven in an order the event protocol forbids.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("header has already been serialized")]
    HeaderAlreadySerialized,
    #[error("header has not yet been serialized")]
    HeaderNotSerialized,
    #[error("{0} have already been serialized")]
    SectionAlreadySerialized(&'static str),
    #[error("{0} section is not open")]
    SectionNotOpen(&'static str),
    #[error("{0} section is still open")]
    SectionStillOpen(&'static str),
    #[error("attributes serialized in the wrong order: expected '{expected}', received '{received}'")]
    AttributeOutOfOrder {
        expected: AttributeName,
        received: AttributeName,
    },
    #[error("attribute '{0}' is not declared in the header")]
    UnknownAttribute(AttributeName),
    #[error("no more attributes to serialize")]
    NoMoreAttributes,
    #[error("no attribute has been started")]
    NoAttributeStarted,
    #[error("too many values for attribute '{attribute}': expected {expected}")]
    TooManyValues { attribute: AttributeName, expected: u64 },
    #[error("too few values for attribute '{attribute}': expected {expected}, received {received}")]
    TooFewValues {
        attribute: AttributeName,
        expected: u64,
        received: u64,
    },
    #[error("some attributes were not serialized: {}", join_names(.0))]
    MissedAttributes(Vec<AttributeName>),
    #[error(
        "incorrect value type for attribute '{attribute}': expected {expected_type} {expected_count}, received {received_type} {received_count}"
    )]
    ValueShapeMismatch {
        attribute: AttributeName,
        expected_type: ComponentType,
        expected_count: u32,
        received_type: ComponentType,
        received_count: u32,
    },
    #[error("value for attribute '{attribute}' does not fit in {bits}-bit components")]
    ValueOutOfRange { attribute: AttributeName, bits: u32 },
    #[error("too many triangles: expected {expected}")]
    TooManyTriangles { expected: u64 },
    #[error("too few triangles: expected {expected}, received {received}")]
    TooFewTriangles { expected: u64, received: u64 },
    #[error("triangle index {index} does not fit in {bits} bits")]
    TriangleIndexTooLarge { index: u64, bits: u32 },
    #[error("serializer has already finished")]
    Finished,
}

fn join_names(names: &[AttributeName]) -> String {
    names
        .iter()
        .map(AttributeName::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// An in-memory mesh whose data disagrees with its header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("no data specified for attribute '{0}'")]
    MissingAttributeData(AttributeName),
    #[error("data specified for attribute '{0}', which the header does not declare")]
    UndeclaredAttribute(AttributeName),
    #[error("data for attribute '{0}' does not match its declaration in the header")]
    AttributeMismatch(AttributeName),
    #[error("attribute '{attribute}' has {actual} values, header declares {expected} vertices")]
    ArrayLength {
        attribute: AttributeName,
        expected: u64,
        actual: u64,
    },
    #[error("mesh has {actual} triangles, header declares {expected}")]
    TriangleCount { expected: u64, actual: u64 },
    #[error("triangle index {index} does not fit in {bits} bits")]
    TriangleIndexTooLarge { index: u64, bits: u32 },
}

/// Error returned by serializer calls.
#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A well-formed value the target encoding has no representation for.
    #[error("{format} cannot encode this mesh: {message}")]
    Unencodable { format: &'static str, message: String },
    #[error("serializer has failed and rejects further calls")]
    Failed,
}

pub type SerializeResult<T> = Result<T, SerializeError>;

/// Error returned by format providers when opening a session.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("format {format} does not support version {version}")]
    UnsupportedVersion {
        format: String,
        version: FormatVersion,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LayoutError::UnsupportedIndexSize(24);
        assert_eq!(
            err.to_string(),
            "unsupported triangle index size 24: must be one of 8, 16, 32, 64"
        );

        let err = ProtocolViolation::MissedAttributes(vec![
            AttributeName::new("normal").unwrap(),
            AttributeName::new("uv").unwrap(),
        ]);
        assert_eq!(err.to_string(), "some attributes were not serialized: normal uv");
    }

    #[test]
    fn test_serialize_error_from_violation() {
        let err: SerializeError = ProtocolViolation::HeaderNotSerialized.into();
        assert!(matches!(
            err,
            SerializeError::Protocol(ProtocolViolation::HeaderNotSerialized)
        ));
        assert_eq!(
            err.to_string(),
            "protocol violation: header has not yet been serialized"
        );
    }
}
