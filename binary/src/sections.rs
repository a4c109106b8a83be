//! Body sections.
//!
//! ```text
//! SMF_VDNI   per attribute in header order: vertex count values, padding
//! SMF_TRIS   triangle count * 3 big-endian indices, padding
//! SMF_META   schema id, u32 length, data, padding
//! ```
//!
//! Every section declares its size, so a data error inside one skips to its
//! end and parsing resumes at the next section. Only a short read stops the
//! parse.

use std::io::Read;

use smf_core::diagnostic::{ParseError, ParseWarning};
use smf_core::layout::{Attribute, ByteOrder, Header};
use smf_core::packing::encoding::{decode_value, read_uint};
use smf_core::protocol::{AttributesEvents, BodyEvents, Diagnostics, TrianglesEvents, ValuesEvents};

use crate::io::BinaryReader;
use crate::structures::{
    METADATA_PREFIX_SIZE, SCHEMA_ID_SIZE, decode_schema, section_name, triangle_section_size,
    vertex_block_size, vertex_section_size,
};

/// Whether the body loop can go on after a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Largest encoded value: four 64-bit components.
const VALUE_CAPACITY: usize = 32;

fn report<D: Diagnostics + ?Sized>(receiver: &mut D, error: ParseError) {
    log::debug!("{error}");
    receiver.on_error(error);
}

fn stop_on<D: Diagnostics + ?Sized>(receiver: &mut D, result: Result<(), ParseError>) -> Flow {
    match result {
        Ok(()) => Flow::Continue,
        Err(e) => {
            report(receiver, e);
            Flow::Stop
        }
    }
}

fn too_small<R: Read>(reader: &BinaryReader<R>, id: u64, size: u64, expected: Option<u64>) -> Option<ParseError> {
    match expected {
        Some(expected) if size >= expected => None,
        Some(expected) => Some(reader.error(format!(
            "Section '{}' is too small; expected at least {expected} octets, got {size}",
            section_name(id)
        ))),
        None => Some(reader.error(format!(
            "Section '{}' would exceed the largest representable size",
            section_name(id)
        ))),
    }
}

/// Skip an unrecognized section, with a warning.
pub fn skip_unknown<R: Read>(reader: &BinaryReader<R>, id: u64, body: &mut dyn BodyEvents) -> Flow {
    let message = format!("Unrecognized section '{}'; skipping it", section_name(id));
    log::warn!("{}: {message}", reader.position_at(reader.offset()));
    body.on_warning(ParseWarning::new(reader.position_at(reader.offset()), message));
    Flow::Continue
}

/// Report a section that may appear only once. The caller skips it.
pub fn skip_repeated<R: Read>(reader: &BinaryReader<R>, id: u64, body: &mut dyn BodyEvents) -> Flow {
    report(
        body,
        reader.error(format!("Section '{}' already specified", section_name(id))),
    );
    Flow::Continue
}

pub fn vertices<R: Read>(
    reader: &mut BinaryReader<R>,
    header: &Header,
    order: ByteOrder,
    id: u64,
    size: u64,
    body: &mut dyn BodyEvents,
) -> Flow {
    if let Some(error) = too_small(reader, id, size, vertex_section_size(header)) {
        report(body, error);
        return Flow::Continue;
    }
    let Some(receiver) = body.on_attributes_non_interleaved() else {
        return Flow::Continue;
    };

    let mut flow = Flow::Continue;
    for attribute in header.attributes_in_order() {
        // Checked by vertex_section_size above.
        let block = vertex_block_size(attribute, header.vertex_count()).unwrap_or(0);
        let block_end = reader.offset() + block;

        let result = match receiver.on_data_attribute_start(attribute) {
            Some(values) => read_values(reader, attribute, header.vertex_count(), order, values),
            None => Ok(()),
        };
        let result = result.and_then(|()| reader.skip_to(block_end));
        flow = stop_on(receiver, result);
        receiver.on_data_attribute_value_finish(attribute);
        if flow == Flow::Stop {
            break;
        }
    }
    receiver.on_data_attributes_non_interleaved_finish();
    flow
}

fn read_values<R: Read>(
    reader: &mut BinaryReader<R>,
    attribute: &Attribute,
    count: u64,
    order: ByteOrder,
    receiver: &mut dyn ValuesEvents,
) -> Result<(), ParseError> {
    let mut buffer = [0; VALUE_CAPACITY];
    let value = &mut buffer[..attribute.size_octets() as usize];
    for _ in 0..count {
        reader.read_exact(value)?;
        receiver.on_value(&decode_value(value, attribute, order));
    }
    Ok(())
}

pub fn triangles<R: Read>(
    reader: &mut BinaryReader<R>,
    header: &Header,
    id: u64,
    size: u64,
    body: &mut dyn BodyEvents,
) -> Flow {
    if let Some(error) = too_small(reader, id, size, triangle_section_size(header)) {
        report(body, error);
        return Flow::Continue;
    }
    let Some(receiver) = body.on_triangles() else {
        return Flow::Continue;
    };
    let result = read_triangles(reader, header, receiver);
    let flow = stop_on(receiver, result);
    receiver.on_data_triangles_finish();
    flow
}

fn read_triangles<R: Read>(
    reader: &mut BinaryReader<R>,
    header: &Header,
    receiver: &mut dyn TrianglesEvents,
) -> Result<(), ParseError> {
    let triangles = header.triangles();
    let width = triangles.index_size_octets() as usize;
    let mut buffer = [0; 24];
    let triangle = &mut buffer[..3 * width];
    for _ in 0..triangles.triangle_count() {
        reader.read_exact(triangle)?;
        let index = |i: usize| read_uint(&triangle[i * width..], width, ByteOrder::BigEndian);
        receiver.on_data_triangle(index(0), index(1), index(2));
    }
    Ok(())
}

pub fn metadata<R: Read>(reader: &mut BinaryReader<R>, id: u64, size: u64, body: &mut dyn BodyEvents) -> Flow {
    if let Some(error) = too_small(reader, id, size, Some(METADATA_PREFIX_SIZE)) {
        report(body, error);
        return Flow::Continue;
    }
    let schema_at = reader.offset();
    let prefix = match reader.read_array::<{ SCHEMA_ID_SIZE + 4 }>() {
        Ok(prefix) => prefix,
        Err(e) => {
            report(body, e);
            return Flow::Stop;
        }
    };
    let schema = match decode_schema(&prefix[..SCHEMA_ID_SIZE]) {
        Ok(Some(schema)) => schema,
        Ok(None) => {
            report(body, reader.error_at(schema_at, "Metadata has no schema identifier"));
            return Flow::Continue;
        }
        Err(e) => {
            report(
                body,
                reader.error_at(schema_at, format!("Invalid metadata schema identifier: {e}")),
            );
            return Flow::Continue;
        }
    };
    let mut length = [0; 4];
    length.copy_from_slice(&prefix[SCHEMA_ID_SIZE..]);
    let length = u64::from(u32::from_be_bytes(length));
    if METADATA_PREFIX_SIZE + length > size {
        report(
            body,
            reader.error(format!(
                "Metadata length {length} exceeds its section of {size} octets"
            )),
        );
        return Flow::Continue;
    }

    let Some(receiver) = body.on_meta(&schema) else {
        return Flow::Continue;
    };
    match reader.read_bytes(length) {
        Ok(data) => {
            receiver.on_meta_data(&schema, &data);
            Flow::Continue
        }
        Err(e) => {
            report(receiver, e);
            Flow::Stop
        }
    }
}
