use std::io::{self, Write};

use smf_core::error::{ProviderError, SerializeResult};
use smf_core::layout::{AttributeName, ByteOrder, FormatVersion, Header, SchemaIdentifier};
use smf_core::packing::encoding::{encode_value, write_uint};
use smf_core::protocol::{AttributeValue, Serializer, SerializerGuard};

use crate::format::BinaryOptions;
use crate::head::encode_header;
use crate::io::BinaryWriter;
use crate::parser::SUPPORTED_MAJOR;
use crate::structures::{
    FileHeader, SECTION_END, SECTION_HEADER, SECTION_METADATA, SECTION_TRIANGLES,
    SECTION_VERTICES, SectionHeader, encode_schema, header_section_size, metadata_section_size,
    put_u32, triangle_section_size, vertex_section_size,
};

/// Writes an `smfb` stream.
///
/// Section sizes follow from the header, so the stream is written strictly
/// front to back and never needs to seek.
pub struct BinarySerializer<W: Write> {
    version: FormatVersion,
    options: BinaryOptions,
    writer: BinaryWriter<W>,
    guard: SerializerGuard,
    index_width: usize,
}

impl<W: Write> BinarySerializer<W> {
    pub fn new(version: FormatVersion, options: BinaryOptions, writer: W) -> Result<Self, ProviderError> {
        if version.major != SUPPORTED_MAJOR {
            return Err(ProviderError::UnsupportedVersion {
                format: crate::FORMAT.name.to_owned(),
                version,
            });
        }
        Ok(Self {
            version,
            options,
            writer: BinaryWriter::new(writer),
            guard: SerializerGuard::new(),
            index_width: 0,
        })
    }

    fn write(&mut self, f: impl FnOnce(&mut BinaryWriter<W>) -> io::Result<()>) -> SerializeResult<()> {
        let result = f(&mut self.writer);
        self.guard.io(result)
    }

    fn section(&mut self, id: u64, size: Option<u64>) -> SerializeResult<()> {
        let Some(size) = size else {
            return self.guard.unencodable(crate::FORMAT.name, "section size overflows u64");
        };
        log::trace!("section {} ({size} octets)", crate::structures::section_name(id));
        self.write(|w| w.write_all(SectionHeader::new(id, size).as_bytes()))
    }

    fn header_size(&self, size: fn(&Header) -> Option<u64>) -> Option<u64> {
        self.guard.header().and_then(size)
    }
}

impl<W: Write> Serializer for BinarySerializer<W> {
    fn serialize_header(&mut self, header: &Header) -> SerializeResult<()> {
        self.guard.header_accepted(header)?;
        let data = match encode_header(header, self.options.data_byte_order) {
            Ok(data) => data,
            Err(e) => return self.guard.unencodable(crate::FORMAT.name, e),
        };
        let file_header = FileHeader::new(self.version);
        self.write(|w| w.write_all(file_header.as_bytes()))?;
        self.section(SECTION_HEADER, Some(header_section_size(header)))?;
        self.write(|w| w.write_all(&data))
    }

    fn serialize_vertex_data_non_interleaved_start(&mut self) -> SerializeResult<()> {
        self.guard.vertices_start()?;
        let size = self.header_size(vertex_section_size);
        self.section(SECTION_VERTICES, size)
    }

    fn serialize_data(&mut self, name: &AttributeName) -> SerializeResult<()> {
        self.guard.data_start(name)?;
        self.write(|w| w.pad())
    }

    fn serialize_value(&mut self, value: &AttributeValue) -> SerializeResult<()> {
        let attribute = self.guard.value(value)?;
        let mut buffer = [0; 32];
        let encoded = &mut buffer[..attribute.size_octets() as usize];
        encode_value(value, attribute, self.options.data_byte_order, encoded);
        let result = self.writer.write_all(encoded);
        self.guard.io(result)
    }

    fn serialize_vertex_data_non_interleaved_finish(&mut self) -> SerializeResult<()> {
        self.guard.vertices_finish()?;
        self.write(|w| w.pad())
    }

    fn serialize_triangles_start(&mut self) -> SerializeResult<()> {
        self.guard.triangles_start()?;
        self.index_width = self
            .guard
            .header()
            .map_or(0, |h| h.triangles().index_size_octets() as usize);
        let size = self.header_size(triangle_section_size);
        self.section(SECTION_TRIANGLES, size)
    }

    fn serialize_triangle(&mut self, v0: u64, v1: u64, v2: u64) -> SerializeResult<()> {
        self.guard.triangle(v0, v1, v2)?;
        let width = self.index_width;
        let mut buffer = [0; 24];
        for (i, index) in [v0, v1, v2].into_iter().enumerate() {
            write_uint(&mut buffer[i * width..], index, width, ByteOrder::BigEndian);
        }
        self.write(|w| w.write_all(&buffer[..3 * width]))
    }

    fn serialize_triangles_finish(&mut self) -> SerializeResult<()> {
        self.guard.triangles_finish()?;
        self.write(|w| w.pad())
    }

    fn serialize_metadata(&mut self, schema: &SchemaIdentifier, data: &[u8]) -> SerializeResult<()> {
        self.guard.metadata()?;
        let Ok(length) = u32::try_from(data.len()) else {
            return self.guard.unencodable(
                crate::FORMAT.name,
                format!("metadata of {} octets exceeds the largest encodable length", data.len()),
            );
        };
        let mut prefix = Vec::new();
        if let Err(e) = encode_schema(&mut prefix, Some(schema)) {
            return self.guard.unencodable(crate::FORMAT.name, e);
        }
        put_u32(&mut prefix, length);

        self.section(SECTION_METADATA, metadata_section_size(u64::from(length)))?;
        self.write(|w| {
            w.write_all(&prefix)?;
            w.write_all(data)?;
            w.pad()
        })
    }

    fn finish(&mut self) -> SerializeResult<()> {
        self.guard.finish()?;
        self.section(SECTION_END, Some(0))?;
        self.write(|w| w.flush())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smf_core::error::SerializeError;
    use smf_core::layout::{Attribute, SchemaName, TriangleBlock};

    fn name(s: &str) -> AttributeName {
        AttributeName::new(s).unwrap()
    }

    fn header() -> Header {
        Header::builder()
            .with_vertex_count(2)
            .with_triangles(TriangleBlock::new(1, 16).unwrap())
            .with_attribute(Attribute::unsigned(name("id"), 1, 16).unwrap())
            .build()
            .unwrap()
    }

    fn write_mesh(order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::new();
        let options = BinaryOptions::default().with_data_byte_order(order);
        let mut serializer = BinarySerializer::new(FormatVersion::new(2, 0), options, &mut out).unwrap();
        let unsigned = |v: u64| AttributeValue::unsigned(&[v]).unwrap();
        let schema = SchemaIdentifier::new(SchemaName::new("com.example").unwrap(), 1, 0);

        serializer.serialize_header(&header()).unwrap();
        serializer.serialize_vertex_data_non_interleaved_start().unwrap();
        serializer.serialize_data(&name("id")).unwrap();
        serializer.serialize_value(&unsigned(0x0102)).unwrap();
        serializer.serialize_value(&unsigned(0x0304)).unwrap();
        serializer.serialize_vertex_data_non_interleaved_finish().unwrap();
        serializer.serialize_triangles_start().unwrap();
        serializer.serialize_triangle(0, 1, 0x0a0b).unwrap();
        serializer.serialize_triangles_finish().unwrap();
        serializer.serialize_metadata(&schema, b"hi").unwrap();
        serializer.finish().unwrap();
        out
    }

    #[test]
    fn test_stream_layout() {
        let out = write_mesh(ByteOrder::BigEndian);
        // file header, header section, vertices, triangles, metadata, end
        let header = 16 + 16 + 112 + 80;
        let vertices = header + 16 + 16;
        let triangles = vertices + 16 + 16;
        let metadata = triangles + 16 + 96;
        assert_eq!(out.len(), metadata + 16);

        assert_eq!(&out[16..24], b"SMF_HEAD");
        assert_eq!(&out[header..header + 8], b"SMF_VDNI");
        assert_eq!(&out[header + 16..header + 20], &[1, 2, 3, 4]);
        assert_eq!(&out[vertices..vertices + 8], b"SMF_TRIS");
        assert_eq!(&out[vertices + 16..vertices + 22], &[0, 0, 0, 1, 0x0a, 0x0b]);
        assert_eq!(&out[triangles..triangles + 8], b"SMF_META");
        assert_eq!(&out[metadata..metadata + 8], b"SMF_END!");
        assert_eq!(out.len() % 16, 0);
    }

    #[test]
    fn test_little_endian_vertex_data() {
        let out = write_mesh(ByteOrder::LittleEndian);
        let header = 16 + 16 + 112 + 80;
        assert_eq!(&out[header + 16..header + 20], &[2, 1, 4, 3]);
        // Triangles stay big-endian.
        assert_eq!(&out[header + 48..header + 54], &[0, 0, 0, 1, 0x0a, 0x0b]);
    }

    #[test]
    fn test_rejects_other_major_version() {
        let result = BinarySerializer::new(FormatVersion::new(1, 0), BinaryOptions::default(), Vec::new());
        assert!(matches!(result, Err(ProviderError::UnsupportedVersion { .. })));
    }

    #[test]
    fn test_name_too_long_for_name_field() {
        // A valid attribute name of 40 characters takes 80 octets in UTF-8.
        let wide = name(&"é".repeat(40));
        let header = Header::builder()
            .with_vertex_count(1)
            .with_attribute(Attribute::unsigned(wide, 1, 8).unwrap())
            .build()
            .unwrap();
        let mut out = Vec::new();
        let mut serializer =
            BinarySerializer::new(FormatVersion::new(2, 0), BinaryOptions::default(), &mut out).unwrap();
        let result = serializer.serialize_header(&header);
        let Err(SerializeError::Unencodable { format, message }) = &result else {
            panic!("expected an unencodable name, got {result:?}");
        };
        assert_eq!(*format, "smfb");
        assert!(message.contains("80 UTF-8 octets"), "{message}");
        assert!(matches!(serializer.finish(), Err(SerializeError::Failed)));
        drop(serializer);
        assert!(out.is_empty());
    }

    #[test]
    fn test_protocol_violation() {
        let mut serializer =
            BinarySerializer::new(FormatVersion::new(2, 0), BinaryOptions::default(), Vec::new()).unwrap();
        serializer.serialize_header(&header()).unwrap();
        assert!(matches!(
            serializer.serialize_data(&name("id")),
            Err(SerializeError::Protocol(_))
        ));
        assert!(matches!(serializer.finish(), Err(SerializeError::Failed)));
    }
}
