//! The header section.
//!
//! ```text
//! u32             size of the fields that follow (108)
//! schema id       76 octets, all zero when absent
//! u64             vertex count
//! u64             triangle count
//! u32             triangle index size in bits
//! u32             attribute count
//! u8 x 4          right, up, forward axis ordinals, winding order ordinal
//! u32             vertex data byte order (0 big-endian, 1 little-endian)
//! padding
//! attribute x N   80 octets each: name, component type, count, bits
//! padding
//! ```
//!
//! Streams whose field size stops before the byte order field carry
//! big-endian vertex data. Fields past the known ones are skipped.

use std::io::Read;

use smf_core::diagnostic::ParseError;
use smf_core::layout::{ByteOrder, Header, TriangleBlock};

use crate::io::BinaryReader;
use crate::structures::{
    ATTRIBUTE_SIZE, FieldError, Fields, HEADER_FIELDS_MAXIMUM_SIZE, HEADER_FIELDS_MINIMUM_SIZE,
    HEADER_FIELDS_SIZE, SCHEMA_ID_SIZE, decode_attribute, decode_byte_order, decode_coordinates,
    decode_schema, encode_attribute, encode_byte_order, encode_coordinates, encode_schema,
    fields_block_size, pad, put_u32, put_u64,
};

/// Encode the data of the header section, padding included.
pub fn encode_header(header: &Header, data_byte_order: ByteOrder) -> Result<Vec<u8>, FieldError> {
    let mut out = Vec::with_capacity(crate::structures::header_section_size(header) as usize);
    put_u32(&mut out, HEADER_FIELDS_SIZE);
    encode_schema(&mut out, header.schema_identifier())?;
    put_u64(&mut out, header.vertex_count());
    let triangles = header.triangles();
    put_u64(&mut out, triangles.triangle_count());
    put_u32(&mut out, triangles.index_size_bits());
    put_u32(&mut out, header.attributes_in_order().len() as u32);
    out.extend_from_slice(&encode_coordinates(header.coordinate_system()));
    put_u32(&mut out, encode_byte_order(data_byte_order));
    pad(&mut out);

    for attribute in header.attributes_in_order() {
        encode_attribute(&mut out, attribute)?;
    }
    pad(&mut out);
    Ok(out)
}

/// Read the header section whose data starts at the reader's offset and
/// spans `size` octets.
///
/// Every malformed field is reported; a header is produced only when there
/// were none. On success the reader is positioned at the end of the section.
pub fn read_header<R: Read>(
    reader: &mut BinaryReader<R>,
    size: u64,
) -> Result<(Header, ByteOrder), Vec<ParseError>> {
    let start = reader.offset();
    let Some(end) = start.checked_add(size) else {
        return Err(vec![reader.error(format!("Header section size {size} is out of range"))]);
    };

    let fields_size = reader.read_u32().map_err(|e| vec![e])?;
    if !(HEADER_FIELDS_MINIMUM_SIZE..=HEADER_FIELDS_MAXIMUM_SIZE).contains(&fields_size) {
        return Err(vec![reader.error_at(
            start,
            format!("Unsupported header field size {fields_size}; expected {HEADER_FIELDS_SIZE}"),
        )]);
    }
    let attributes_start = start + fields_block_size(fields_size);
    if attributes_start > end {
        return Err(vec![reader.error_at(
            start,
            format!("Header section of {size} octets cannot hold {fields_size} octets of fields"),
        )]);
    }

    let fields_start = reader.offset();
    let bytes = reader.read_bytes(u64::from(fields_size)).map_err(|e| vec![e])?;
    let mut fields = Fields::new(&bytes);
    let mut errors = Vec::new();
    let mut field_error = |at: usize, field: &str, e: FieldError| {
        errors.push(reader.error_at(fields_start + at as u64, format!("Invalid {field}: {e}")));
    };

    let mut builder = Header::builder();
    match decode_schema(fields.take(SCHEMA_ID_SIZE)) {
        Ok(schema) => builder.set_schema_identifier(schema),
        Err(e) => field_error(0, "schema identifier", e),
    }
    builder.set_vertex_count(fields.u64());

    let triangles_at = fields.at();
    let triangle_count = fields.u64();
    match TriangleBlock::new(triangle_count, fields.u32()) {
        Ok(triangles) => builder.set_triangles(triangles),
        Err(e) => field_error(triangles_at, "triangles", e.into()),
    }

    let attribute_count = fields.u32();

    let coordinates_at = fields.at();
    match decode_coordinates(fields.array()) {
        Ok(coordinates) => builder.set_coordinate_system(coordinates),
        Err(e) => field_error(coordinates_at, "coordinate system", e),
    }

    let mut byte_order = ByteOrder::BigEndian;
    if fields_size >= HEADER_FIELDS_SIZE {
        let order_at = fields.at();
        match decode_byte_order(fields.u32()) {
            Ok(order) => byte_order = order,
            Err(e) => field_error(order_at, "data byte order", e),
        }
    }

    let attributes_size = u64::from(attribute_count) * ATTRIBUTE_SIZE as u64;
    if attributes_start + attributes_size > end {
        errors.push(reader.error_at(
            start,
            format!("Header section of {size} octets cannot hold {attribute_count} attributes"),
        ));
        return Err(errors);
    }
    if let Err(e) = reader.skip_to(attributes_start) {
        errors.push(e);
        return Err(errors);
    }

    for index in 0..attribute_count {
        let record_at = reader.offset();
        let record = match reader.read_array::<ATTRIBUTE_SIZE>() {
            Ok(record) => record,
            Err(e) => {
                errors.push(e);
                return Err(errors);
            }
        };
        match decode_attribute(&record) {
            Ok(attribute) => builder.push_attribute(attribute),
            Err(e) => errors.push(reader.error_at(record_at, format!("Invalid attribute {index}: {e}"))),
        }
    }

    if let Err(e) = reader.skip_to(end) {
        errors.push(e);
        return Err(errors);
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    builder
        .build()
        .map(|header| (header, byte_order))
        .map_err(|e| vec![reader.error_at(start, format!("Invalid header: {e}"))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use smf_core::layout::{
        Attribute, AttributeName, CoordinateSystem, SchemaIdentifier, SchemaName,
    };

    use crate::structures::header_section_size;

    fn name(s: &str) -> AttributeName {
        AttributeName::new(s).unwrap()
    }

    fn header() -> Header {
        Header::builder()
            .with_vertex_count(4)
            .with_triangles(TriangleBlock::new(2, 32).unwrap())
            .with_schema_identifier(Some(SchemaIdentifier::new(
                SchemaName::new("com.example.mesh").unwrap(),
                1,
                0,
            )))
            .with_coordinate_system(CoordinateSystem::from_tokens(&["+z", "+y", "+x", "clockwise"]).unwrap())
            .with_attribute(Attribute::float(name("position"), 3, 64).unwrap())
            .with_attribute(Attribute::signed(name("bone"), 4, 16).unwrap())
            .build()
            .unwrap()
    }

    fn read(bytes: &[u8]) -> Result<(Header, ByteOrder), Vec<ParseError>> {
        let mut reader = BinaryReader::new(bytes, None);
        read_header(&mut reader, bytes.len() as u64)
    }

    #[test]
    fn test_header_section() {
        let bytes = encode_header(&header(), ByteOrder::LittleEndian).unwrap();
        assert_eq!(bytes.len() as u64, header_section_size(&header()));
        let (read, order) = read(&bytes).unwrap();
        assert_eq!(read, header());
        assert_eq!(order, ByteOrder::LittleEndian);
    }

    #[test]
    fn test_fields_without_byte_order() {
        let mut bytes = encode_header(&header(), ByteOrder::LittleEndian).unwrap();
        bytes[3] = HEADER_FIELDS_MINIMUM_SIZE as u8;
        let (_, order) = read(&bytes).unwrap();
        assert_eq!(order, ByteOrder::BigEndian);
    }

    #[test]
    fn test_errors_are_accumulated() {
        let mut bytes = encode_header(&header(), ByteOrder::BigEndian).unwrap();
        // Index size, then the first axis ordinal, then the byte order.
        bytes[4 + 76 + 16 + 3] = 24;
        bytes[4 + 76 + 24] = 9;
        bytes[4 + 76 + 31] = 7;
        let errors = read(&bytes).unwrap_err();
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].message.starts_with("Invalid triangles"));
        assert_eq!(errors[0].position.column, 4 + 76 + 8);
    }

    #[test]
    fn test_too_many_attributes() {
        let mut bytes = encode_header(&header(), ByteOrder::BigEndian).unwrap();
        bytes[4 + 76 + 23] = 3;
        let errors = read(&bytes).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot hold 3 attributes"));
    }

    #[test]
    fn test_duplicate_attributes() {
        let mut bytes = encode_header(&header(), ByteOrder::BigEndian).unwrap();
        let first = bytes[112..192].to_vec();
        bytes[192..272].copy_from_slice(&first);
        let errors = read(&bytes).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("Invalid header"));
    }
}
