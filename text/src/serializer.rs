use std::io::Write;

use smf_core::error::{ProviderError, SerializeResult};
use smf_core::layout::{AttributeName, FormatVersion, Header, SchemaIdentifier};
use smf_core::protocol::{AttributeValue, Serializer, SerializerGuard};

use crate::lexer::quote;
use crate::parser::SUPPORTED_MAJOR;
use crate::sections::{SECTION_METADATA, SECTION_TRIANGLES, SECTION_VERTICES, metadata_to_lines};

/// Writes an `smft` stream.
///
/// Floats are written in their shortest exact decimal form, so parsing the
/// output yields the same `f64` values.
pub struct TextSerializer<W: Write> {
    version: FormatVersion,
    writer: W,
    guard: SerializerGuard,
}

impl<W: Write> TextSerializer<W> {
    pub fn new(version: FormatVersion, writer: W) -> Result<Self, ProviderError> {
        if version.major != SUPPORTED_MAJOR {
            return Err(ProviderError::UnsupportedVersion {
                format: crate::FORMAT.name.to_owned(),
                version,
            });
        }
        Ok(Self {
            version,
            writer,
            guard: SerializerGuard::new(),
        })
    }

    fn line(&mut self, line: &str) -> SerializeResult<()> {
        let result = writeln!(self.writer, "{line}");
        self.guard.io(result)
    }

    fn write_header(&mut self, header: &Header) -> SerializeResult<()> {
        self.line(&format!("smf {} {}", self.version.major, self.version.minor))?;
        if let Some(schema) = header.schema_identifier() {
            self.line(&format!(
                "schema {} {} {}",
                schema.name(),
                schema.version_major(),
                schema.version_minor()
            ))?;
        }
        self.line(&format!("vertices {}", header.vertex_count()))?;
        let triangles = header.triangles();
        self.line(&format!(
            "triangles {} {}",
            triangles.triangle_count(),
            triangles.index_size_bits()
        ))?;
        self.line(&format!(
            "coordinates {}",
            header.coordinate_system().to_human_string()
        ))?;
        for attribute in header.attributes_in_order() {
            self.line(&format!(
                "attribute {} {} {} {}",
                quote(attribute.name().as_str()),
                attribute.component_type().name(),
                attribute.component_count(),
                attribute.component_size_bits()
            ))?;
        }
        self.line("end")
    }
}

fn format_value(value: &AttributeValue) -> String {
    fn join<T>(values: &[T], f: impl Fn(&T) -> String) -> String {
        values.iter().map(f).collect::<Vec<_>>().join(" ")
    }
    match value {
        AttributeValue::Signed(c) => join(c.as_slice(), i64::to_string),
        AttributeValue::Unsigned(c) => join(c.as_slice(), u64::to_string),
        AttributeValue::Float(c) => join(c.as_slice(), |v| format!("{v:?}")),
    }
}

impl<W: Write> Serializer for TextSerializer<W> {
    fn serialize_header(&mut self, header: &Header) -> SerializeResult<()> {
        self.guard.header_accepted(header)?;
        self.write_header(header)
    }

    fn serialize_vertex_data_non_interleaved_start(&mut self) -> SerializeResult<()> {
        self.guard.vertices_start()?;
        self.line(SECTION_VERTICES)
    }

    fn serialize_data(&mut self, name: &AttributeName) -> SerializeResult<()> {
        self.guard.data_start(name)?;
        self.line(&format!("attribute {}", quote(name.as_str())))
    }

    fn serialize_value(&mut self, value: &AttributeValue) -> SerializeResult<()> {
        self.guard.value(value)?;
        self.line(&format_value(value))
    }

    fn serialize_vertex_data_non_interleaved_finish(&mut self) -> SerializeResult<()> {
        self.guard.vertices_finish()?;
        self.line("end")
    }

    fn serialize_triangles_start(&mut self) -> SerializeResult<()> {
        self.guard.triangles_start()?;
        self.line(SECTION_TRIANGLES)
    }

    fn serialize_triangle(&mut self, v0: u64, v1: u64, v2: u64) -> SerializeResult<()> {
        self.guard.triangle(v0, v1, v2)?;
        self.line(&format!("{v0} {v1} {v2}"))
    }

    fn serialize_triangles_finish(&mut self) -> SerializeResult<()> {
        self.guard.triangles_finish()?;
        self.line("end")
    }

    fn serialize_metadata(&mut self, schema: &SchemaIdentifier, data: &[u8]) -> SerializeResult<()> {
        self.guard.metadata()?;
        let lines = metadata_to_lines(data);
        self.line(&format!(
            "{SECTION_METADATA} {} {} {} {}",
            schema.name(),
            schema.version_major(),
            schema.version_minor(),
            lines.len()
        ))?;
        for line in &lines {
            self.line(line)?;
        }
        self.line("end")
    }

    fn finish(&mut self) -> SerializeResult<()> {
        self.guard.finish()?;
        let result = self.writer.flush();
        self.guard.io(result)
    }
}
