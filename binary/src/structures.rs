//! Fixed structures of the `smfb` encoding.
//!
//! A file is a 16 octet file header followed by sections. Each section is a
//! 16 octet section header (identifier and data size) followed by its data,
//! padded with zeros to a multiple of 16 octets. The declared size includes
//! the padding. All structure fields are big-endian; only vertex data uses
//! the byte order chosen in the header section.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use smf_core::error::LayoutError;
use smf_core::layout::{
    Attribute, AttributeName, Axis, AxisSystem, ByteOrder, ComponentType, CoordinateSystem,
    FormatVersion, Header, SchemaIdentifier, SchemaName, WindingOrder,
};

use crate::io::align;

pub const MAGIC: [u8; 8] = [0x89, b'S', b'M', b'F', 0x0D, 0x0A, 0x1A, 0x0A];

pub const SECTION_HEADER: u64 = u64::from_be_bytes(*b"SMF_HEAD");
pub const SECTION_VERTICES: u64 = u64::from_be_bytes(*b"SMF_VDNI");
pub const SECTION_TRIANGLES: u64 = u64::from_be_bytes(*b"SMF_TRIS");
pub const SECTION_METADATA: u64 = u64::from_be_bytes(*b"SMF_META");
pub const SECTION_END: u64 = u64::from_be_bytes(*b"SMF_END!");

/// Octets reserved for a name after its length field.
///
/// The bound is on UTF-8 octets, not characters, so a valid name with
/// non-ASCII characters may be too long for this encoding.
pub const NAME_CAPACITY: usize = 64;
/// Length field plus name octets.
pub const NAME_SIZE: usize = 4 + NAME_CAPACITY;
/// Name, major version, minor version.
pub const SCHEMA_ID_SIZE: usize = NAME_SIZE + 8;
/// Name, component type, count, size in bits.
pub const ATTRIBUTE_SIZE: usize = NAME_SIZE + 12;

/// Size of the header fields written by this crate.
pub const HEADER_FIELDS_SIZE: u32 = 108;
/// Size of the header fields before the data byte order field.
pub const HEADER_FIELDS_MINIMUM_SIZE: u32 = 104;
/// Largest header field size accepted from newer writers.
pub const HEADER_FIELDS_MAXIMUM_SIZE: u32 = 4096;

/// Fixed size prefix of a metadata section: schema identifier and length.
pub const METADATA_PREFIX_SIZE: u64 = SCHEMA_ID_SIZE as u64 + 4;

/// Human readable form of a section identifier.
pub fn section_name(id: u64) -> String {
    let bytes = id.to_be_bytes();
    if bytes.iter().all(u8::is_ascii_graphic) {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        format!("{id:#018x}")
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FileHeader {
    magic: [u8; 8],
    major: [u8; 4],
    minor: [u8; 4],
}

impl FileHeader {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(version: FormatVersion) -> Self {
        Self {
            magic: MAGIC,
            major: version.major.to_be_bytes(),
            minor: version.minor.to_be_bytes(),
        }
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        bytemuck::pod_read_unaligned(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn has_magic(&self) -> bool {
        self.magic == MAGIC
    }

    pub fn version(&self) -> FormatVersion {
        FormatVersion::new(
            u32::from_be_bytes(self.major),
            u32::from_be_bytes(self.minor),
        )
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SectionHeader {
    id: [u8; 8],
    size: [u8; 8],
}

impl SectionHeader {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(id: u64, size: u64) -> Self {
        Self {
            id: id.to_be_bytes(),
            size: size.to_be_bytes(),
        }
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        bytemuck::pod_read_unaligned(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn id(&self) -> u64 {
        u64::from_be_bytes(self.id)
    }

    pub fn size(&self) -> u64 {
        u64::from_be_bytes(self.size)
    }
}

/// A malformed field inside a structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("name of {0} UTF-8 octets exceeds the {NAME_CAPACITY} octet name field")]
    NameTooLong(usize),
    #[error("name is not valid UTF-8")]
    NameNotUtf8,
    #[error("invalid axis ordinal {0}")]
    InvalidAxis(u8),
    #[error("invalid winding order ordinal {0}")]
    InvalidWindingOrder(u8),
    #[error("invalid data byte order {0}; expected 0 (big-endian) or 1 (little-endian)")]
    InvalidByteOrder(u32),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Cursor over the octets of a structure already read in full.
///
/// Callers size the buffer for the fields they take.
pub struct Fields<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Fields<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    /// Offset of the next field from the start of the buffer.
    pub fn at(&self) -> usize {
        self.at
    }

    pub fn take(&mut self, count: usize) -> &'a [u8] {
        let taken = &self.bytes[self.at..self.at + count];
        self.at += count;
        taken
    }

    pub fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut array = [0; N];
        array.copy_from_slice(self.take(N));
        array
    }

    pub fn u32(&mut self) -> u32 {
        u32::from_be_bytes(self.array())
    }

    pub fn u64(&mut self) -> u64 {
        u64::from_be_bytes(self.array())
    }
}

pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Pad `out` with zeros to alignment.
pub fn pad(out: &mut Vec<u8>) {
    let padding = crate::io::padding(out.len() as u64) as usize;
    out.extend(std::iter::repeat_n(0, padding));
}

/// Write a name as a length and a zero-padded field of [`NAME_CAPACITY`] octets.
pub fn encode_name(out: &mut Vec<u8>, name: &str) -> Result<(), FieldError> {
    let bytes = name.as_bytes();
    if bytes.len() > NAME_CAPACITY {
        return Err(FieldError::NameTooLong(bytes.len()));
    }
    put_u32(out, bytes.len() as u32);
    out.extend_from_slice(bytes);
    out.extend(std::iter::repeat_n(0, NAME_CAPACITY - bytes.len()));
    Ok(())
}

pub fn decode_name(bytes: &[u8]) -> Result<&str, FieldError> {
    let mut fields = Fields::new(bytes);
    let length = fields.u32() as usize;
    if length > NAME_CAPACITY {
        return Err(FieldError::NameTooLong(length));
    }
    std::str::from_utf8(&fields.take(NAME_CAPACITY)[..length]).map_err(|_| FieldError::NameNotUtf8)
}

/// Write a schema identifier, or zeros when there is none.
pub fn encode_schema(out: &mut Vec<u8>, schema: Option<&SchemaIdentifier>) -> Result<(), FieldError> {
    match schema {
        Some(schema) => {
            encode_name(out, schema.name().as_str())?;
            put_u32(out, schema.version_major());
            put_u32(out, schema.version_minor());
        }
        None => out.extend_from_slice(&[0; SCHEMA_ID_SIZE]),
    }
    Ok(())
}

/// Read a schema identifier; an empty name means none.
pub fn decode_schema(bytes: &[u8]) -> Result<Option<SchemaIdentifier>, FieldError> {
    let mut fields = Fields::new(bytes);
    let name = decode_name(fields.take(NAME_SIZE))?;
    if name.is_empty() {
        return Ok(None);
    }
    let name = SchemaName::new(name)?;
    let major = fields.u32();
    let minor = fields.u32();
    Ok(Some(SchemaIdentifier::new(name, major, minor)))
}

pub fn encode_coordinates(coordinates: CoordinateSystem) -> [u8; 4] {
    let axes = coordinates.axes();
    [
        axes.right().ordinal(),
        axes.up().ordinal(),
        axes.forward().ordinal(),
        coordinates.winding_order().ordinal(),
    ]
}

pub fn decode_coordinates(bytes: [u8; 4]) -> Result<CoordinateSystem, FieldError> {
    let axis = |ordinal: u8| Axis::from_ordinal(ordinal).ok_or(FieldError::InvalidAxis(ordinal));
    let [right, up, forward, winding] = bytes;
    let axes = AxisSystem::new(axis(right)?, axis(up)?, axis(forward)?)?;
    let winding =
        WindingOrder::from_ordinal(winding).ok_or(FieldError::InvalidWindingOrder(winding))?;
    Ok(CoordinateSystem::new(axes, winding))
}

pub fn encode_byte_order(order: ByteOrder) -> u32 {
    match order {
        ByteOrder::BigEndian => 0,
        ByteOrder::LittleEndian => 1,
    }
}

pub fn decode_byte_order(code: u32) -> Result<ByteOrder, FieldError> {
    match code {
        0 => Ok(ByteOrder::BigEndian),
        1 => Ok(ByteOrder::LittleEndian),
        other => Err(FieldError::InvalidByteOrder(other)),
    }
}

pub fn encode_attribute(out: &mut Vec<u8>, attribute: &Attribute) -> Result<(), FieldError> {
    encode_name(out, attribute.name().as_str())?;
    put_u32(out, attribute.component_type().to_integer());
    put_u32(out, attribute.component_count());
    put_u32(out, attribute.component_size_bits());
    Ok(())
}

pub fn decode_attribute(bytes: &[u8; ATTRIBUTE_SIZE]) -> Result<Attribute, FieldError> {
    let mut fields = Fields::new(bytes);
    let name = AttributeName::new(decode_name(fields.take(NAME_SIZE))?)?;
    let component_type = ComponentType::from_integer(fields.u32())?;
    let count = fields.u32();
    let bits = fields.u32();
    Ok(Attribute::new(name, component_type, count, bits)?)
}

/// Data size of the header section for `header`.
pub fn header_section_size(header: &Header) -> u64 {
    let attributes = header.attributes_in_order().len() as u64 * ATTRIBUTE_SIZE as u64;
    fields_block_size(HEADER_FIELDS_SIZE) + attributes + crate::io::padding(attributes)
}

/// The field size word and the fields, padded.
pub fn fields_block_size(fields_size: u32) -> u64 {
    let size = 4 + u64::from(fields_size);
    size + crate::io::padding(size)
}

/// Padded size of one attribute's block in the vertex section.
pub fn vertex_block_size(attribute: &Attribute, vertex_count: u64) -> Option<u64> {
    align(vertex_count.checked_mul(u64::from(attribute.size_octets()))?)
}

pub fn vertex_section_size(header: &Header) -> Option<u64> {
    header
        .attributes_in_order()
        .iter()
        .try_fold(0u64, |total, attribute| {
            total.checked_add(vertex_block_size(attribute, header.vertex_count())?)
        })
}

pub fn triangle_section_size(header: &Header) -> Option<u64> {
    let triangles = header.triangles();
    align(
        triangles
            .triangle_count()
            .checked_mul(u64::from(triangles.triangle_size_octets()))?,
    )
}

pub fn metadata_section_size(length: u64) -> Option<u64> {
    align(METADATA_PREFIX_SIZE.checked_add(length)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smf_core::layout::TriangleBlock;

    fn name(s: &str) -> AttributeName {
        AttributeName::new(s).unwrap()
    }

    #[test]
    fn test_section_ids() {
        assert_eq!(SECTION_HEADER, 0x534D_465F_4845_4144);
        assert_eq!(SECTION_END, 0x534D_465F_454E_4421);
        assert_eq!(section_name(SECTION_VERTICES), "SMF_VDNI");
        assert_eq!(section_name(1), "0x0000000000000001");
    }

    #[test]
    fn test_file_header_layout() {
        assert_eq!(FileHeader::SIZE, 16);
        let header = FileHeader::new(FormatVersion::new(2, 1));
        assert_eq!(
            header.as_bytes(),
            [0x89, 0x53, 0x4D, 0x46, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 2, 0, 0, 0, 1]
        );
        let mut bytes = [0; FileHeader::SIZE];
        bytes.copy_from_slice(header.as_bytes());
        let read = FileHeader::from_bytes(&bytes);
        assert!(read.has_magic());
        assert_eq!(read.version(), FormatVersion::new(2, 1));
    }

    #[test]
    fn test_section_header_layout() {
        let header = SectionHeader::new(SECTION_TRIANGLES, 48);
        assert_eq!(&header.as_bytes()[..8], b"SMF_TRIS");
        assert_eq!(header.as_bytes()[15], 48);
    }

    #[test]
    fn test_names() {
        let mut out = Vec::new();
        encode_name(&mut out, "position").unwrap();
        assert_eq!(out.len(), NAME_SIZE);
        assert_eq!(decode_name(&out).unwrap(), "position");

        let long = "x".repeat(65);
        assert_eq!(encode_name(&mut out, &long), Err(FieldError::NameTooLong(65)));

        // 33 characters, 66 octets.
        let wide = "é".repeat(33);
        assert_eq!(encode_name(&mut out, &wide), Err(FieldError::NameTooLong(66)));

        let mut bad = vec![0, 0, 0, 65];
        bad.resize(NAME_SIZE, 0);
        assert_eq!(decode_name(&bad), Err(FieldError::NameTooLong(65)));
    }

    #[test]
    fn test_schema() {
        let mut out = Vec::new();
        encode_schema(&mut out, None).unwrap();
        assert_eq!(out.len(), SCHEMA_ID_SIZE);
        assert_eq!(decode_schema(&out), Ok(None));

        let schema = SchemaIdentifier::new(SchemaName::new("com.example").unwrap(), 3, 4);
        out.clear();
        encode_schema(&mut out, Some(&schema)).unwrap();
        assert_eq!(decode_schema(&out), Ok(Some(schema)));
    }

    #[test]
    fn test_coordinates() {
        let coordinates = CoordinateSystem::default();
        assert_eq!(encode_coordinates(coordinates), [0, 1, 5, 1]);
        assert_eq!(decode_coordinates([0, 1, 5, 1]), Ok(coordinates));
        assert_eq!(decode_coordinates([9, 1, 5, 1]), Err(FieldError::InvalidAxis(9)));
        assert!(matches!(
            decode_coordinates([0, 3, 5, 1]),
            Err(FieldError::Layout(LayoutError::AxesNotPerpendicular { .. }))
        ));
    }

    #[test]
    fn test_attribute_record() {
        let attribute = Attribute::float(name("normal"), 3, 16).unwrap();
        let mut out = Vec::new();
        encode_attribute(&mut out, &attribute).unwrap();
        let mut record = [0; ATTRIBUTE_SIZE];
        record.copy_from_slice(&out);
        assert_eq!(decode_attribute(&record), Ok(attribute));

        record[NAME_SIZE + 11] = 24;
        assert!(matches!(
            decode_attribute(&record),
            Err(FieldError::Layout(LayoutError::UnsupportedComponentSize { .. }))
        ));
    }

    #[test]
    fn test_section_sizes() {
        let header = Header::builder()
            .with_vertex_count(3)
            .with_triangles(TriangleBlock::new(1, 16).unwrap())
            .with_attribute(Attribute::float(name("position"), 3, 32).unwrap())
            .with_attribute(Attribute::unsigned(name("id"), 1, 8).unwrap())
            .build()
            .unwrap();
        assert_eq!(header_section_size(&header), 112 + 160);
        assert_eq!(vertex_section_size(&header), Some(48 + 16));
        assert_eq!(triangle_section_size(&header), Some(16));
        assert_eq!(metadata_section_size(5), Some(96));
    }
}
