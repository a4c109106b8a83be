//! Packing parsed meshes straight into interleaved buffers.

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostic::{ParseError, ParseWarning};
use crate::error::PackingError;
use crate::layout::{Attribute, AttributeName, ByteOrder, FormatVersion, Header, TriangleBlock};
use crate::logged::Logged;
use crate::packing::PackingConfiguration;
use crate::packing::encoding::{encode_value, write_uint};
use crate::protocol::{
    AttributeValue, AttributesEvents, BodyEvents, Diagnostics, HeaderEvents, ParserEvents,
    TrianglesEvents, ValuesEvents,
};

/// One interleaved buffer to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRequest {
    id: u32,
    attributes: Option<Vec<AttributeName>>,
}

impl PackRequest {
    /// Every attribute of the header, in header order.
    pub fn all(id: u32) -> Self {
        Self {
            id,
            attributes: None,
        }
    }

    /// The named attributes, in the given order.
    pub fn attributes(id: u32, names: impl IntoIterator<Item = AttributeName>) -> Self {
        Self {
            id,
            attributes: Some(names.into_iter().collect()),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    fn resolve(&self, header: &Header) -> Result<Vec<Attribute>, PackingError> {
        match &self.attributes {
            None => Ok(header.attributes_in_order().to_vec()),
            Some(names) => names
                .iter()
                .map(|name| {
                    header
                        .attribute(name)
                        .cloned()
                        .ok_or_else(|| PackingError::UnknownAttribute(name.clone()))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackingOptions {
    pub byte_order: ByteOrder,
    /// Power-of-two alignment of attribute offsets and the vertex size.
    pub alignment: u32,
}

impl Default for PackingOptions {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::native(),
            alignment: 1,
        }
    }
}

impl PackingOptions {
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_alignment(mut self, alignment: u32) -> Self {
        self.alignment = alignment;
        self
    }
}

/// Interleaved vertex data for one [`PackRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBuffer {
    configuration: PackingConfiguration,
    data: Vec<u8>,
}

impl PackedBuffer {
    pub fn configuration(&self) -> &PackingConfiguration {
        &self.configuration
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// View the buffer as a slice of `T`, for uploads that want typed data.
    ///
    /// Fails if the buffer length or alignment does not suit `T`.
    pub fn cast<T: bytemuck::Pod>(&self) -> Result<&[T], bytemuck::PodCastError> {
        bytemuck::try_cast_slice(&self.data)
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Triangle indices at the header's index size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedTriangles {
    triangles: TriangleBlock,
    data: Vec<u8>,
}

impl PackedTriangles {
    pub fn triangles(&self) -> TriangleBlock {
        self.triangles
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// The result of packing one parsed mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedMesh {
    header: Header,
    byte_order: ByteOrder,
    buffers: BTreeMap<u32, PackedBuffer>,
    triangles: PackedTriangles,
}

impl PackedMesh {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn buffer(&self, id: u32) -> Option<&PackedBuffer> {
        self.buffers.get(&id)
    }

    pub fn buffers(&self) -> impl Iterator<Item = (u32, &PackedBuffer)> {
        self.buffers.iter().map(|(&id, buffer)| (id, buffer))
    }

    pub fn triangles(&self) -> &PackedTriangles {
        &self.triangles
    }
}

/// A [`ParserEvents`] consumer that packs vertex data into interleaved
/// buffers as values arrive.
///
/// Buffers are allocated when the header is parsed, one per request. Every
/// attribute column is scattered into each buffer that contains it, so no
/// intermediate per-attribute storage is kept.
#[derive(Debug)]
pub struct PackedMeshes {
    requests: Vec<PackRequest>,
    options: PackingOptions,
    header: Option<Header>,
    buffers: BTreeMap<u32, PackedBuffer>,
    triangles: Option<PackedTriangles>,
    targets: Vec<(u32, usize)>,
    current: Option<Attribute>,
    vertex: u64,
    triangle: u64,
    attributes_seen: Vec<AttributeName>,
    triangles_seen: bool,
    errors: Vec<ParseError>,
    warnings: Vec<ParseWarning>,
}

impl PackedMeshes {
    pub fn new(requests: Vec<PackRequest>, options: PackingOptions) -> Self {
        Self {
            requests,
            options,
            header: None,
            buffers: BTreeMap::new(),
            triangles: None,
            targets: Vec::new(),
            current: None,
            vertex: 0,
            triangle: 0,
            attributes_seen: Vec::new(),
            triangles_seen: false,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// The packed mesh, or every error seen while parsing and packing.
    pub fn into_mesh(mut self) -> Logged<PackedMesh> {
        if let Some(header) = &self.header {
            let missing: BTreeSet<&str> = self
                .buffers
                .values()
                .flat_map(|b| b.configuration.attributes_ordered())
                .map(|p| p.attribute().name())
                .filter(|name| !self.attributes_seen.contains(*name))
                .map(AttributeName::as_str)
                .collect();
            if header.vertex_count() > 0 && !missing.is_empty() {
                self.errors.push(ParseError::message(format!(
                    "No data specified for attributes: {}",
                    missing.into_iter().collect::<Vec<_>>().join(" ")
                )));
            }
            let triangle_count = header.triangles().triangle_count();
            if triangle_count > 0 && !self.triangles_seen {
                self.errors.push(ParseError::message(format!(
                    "A non-zero triangle count ({triangle_count}) was specified, but no triangles were provided"
                )));
            }
        }

        let mesh = match (self.header, self.triangles) {
            (Some(header), Some(triangles)) => Some(PackedMesh {
                header,
                byte_order: self.options.byte_order,
                buffers: self.buffers,
                triangles,
            }),
            _ => {
                if self.errors.is_empty() {
                    self.errors.push(ParseError::message("No header was parsed"));
                }
                None
            }
        };
        Logged::from_parts(mesh, self.errors, self.warnings)
    }

    fn allocate(&mut self, header: &Header) -> Result<(), PackingError> {
        for request in &self.requests {
            let attributes = request.resolve(header)?;
            let configuration = PackingConfiguration::build_aligned(&attributes, self.options.alignment)?;
            let size = configuration.buffer_size_octets(header.vertex_count())?;
            log::debug!(
                "allocating buffer {} of {} octets ({} octets per vertex)",
                request.id,
                size,
                configuration.vertex_size_octets()
            );
            self.buffers.insert(
                request.id,
                PackedBuffer {
                    configuration,
                    data: vec![0; size],
                },
            );
        }

        let triangles = header.triangles();
        let size = triangles
            .triangle_count()
            .checked_mul(u64::from(triangles.triangle_size_octets()))
            .and_then(|size| usize::try_from(size).ok())
            .ok_or(PackingError::BufferSizeOverflow {
                vertex_count: triangles.triangle_count(),
                vertex_size: triangles.triangle_size_octets(),
            })?;
        self.triangles = Some(PackedTriangles {
            triangles,
            data: vec![0; size],
        });
        Ok(())
    }

    fn write_value(&mut self, value: &AttributeValue) -> Result<(), String> {
        let Some(attribute) = &self.current else {
            return Err("value received outside an attribute".to_owned());
        };
        value.check_shape(attribute).map_err(|e| e.to_string())?;
        let size = attribute.size_octets() as usize;
        for &(id, position) in &self.targets {
            let Some(buffer) = self.buffers.get_mut(&id) else {
                continue;
            };
            let offset = buffer
                .configuration
                .offset_octets_for_index(position, self.vertex)
                .map_err(|e| e.to_string())?;
            let start = usize::try_from(offset).map_err(|e| e.to_string())?;
            let Some(out) = buffer.data.get_mut(start..start + size) else {
                return Err(format!(
                    "vertex {} exceeds the declared vertex count",
                    self.vertex
                ));
            };
            encode_value(value, attribute, self.options.byte_order, out);
        }
        Ok(())
    }

    fn write_triangle(&mut self, indices: [u64; 3]) -> Result<(), String> {
        let Some(triangles) = &mut self.triangles else {
            return Err("triangle received before the header".to_owned());
        };
        let block = triangles.triangles;
        let width = block.index_size_octets() as usize;
        let start = usize::try_from(self.triangle)
            .ok()
            .and_then(|t| t.checked_mul(block.triangle_size_octets() as usize))
            .ok_or_else(|| format!("triangle {} is out of range", self.triangle))?;
        let Some(out) = triangles.data.get_mut(start..start + width * 3) else {
            return Err(format!(
                "triangle {} exceeds the declared triangle count",
                self.triangle
            ));
        };
        for (i, &index) in indices.iter().enumerate() {
            if index > block.max_index() {
                return Err(format!(
                    "triangle index {index} does not fit in {} bits",
                    block.index_size_bits()
                ));
            }
            write_uint(&mut out[i * width..], index, width, self.options.byte_order);
        }
        Ok(())
    }
}

impl Diagnostics for PackedMeshes {
    fn on_warning(&mut self, warning: ParseWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    fn on_error(&mut self, error: ParseError) {
        log::error!("{error}");
        self.errors.push(error);
    }
}

impl ParserEvents for PackedMeshes {
    fn on_start(&mut self) {
        log::debug!("packing {} requested buffers", self.requests.len());
    }

    fn on_version_received(&mut self, version: FormatVersion) -> Option<&mut dyn HeaderEvents> {
        log::debug!("packing mesh of format version {version}");
        Some(self)
    }

    fn on_finish(&mut self) {}
}

impl HeaderEvents for PackedMeshes {
    fn on_header_parsed(&mut self, header: &Header) -> Option<&mut dyn BodyEvents> {
        if let Err(e) = self.allocate(header) {
            self.on_error(ParseError::message(e.to_string()));
            return None;
        }
        self.header = Some(header.clone());
        Some(self)
    }
}

impl BodyEvents for PackedMeshes {
    fn on_attributes_non_interleaved(&mut self) -> Option<&mut dyn AttributesEvents> {
        if self.buffers.is_empty() { None } else { Some(self) }
    }

    fn on_triangles(&mut self) -> Option<&mut dyn TrianglesEvents> {
        self.triangles_seen = true;
        self.triangle = 0;
        Some(self)
    }
}

impl AttributesEvents for PackedMeshes {
    fn on_data_attribute_start(&mut self, attribute: &Attribute) -> Option<&mut dyn ValuesEvents> {
        self.targets = self
            .buffers
            .iter()
            .filter_map(|(&id, buffer)| {
                buffer
                    .configuration
                    .packed_attribute_by_name(attribute.name())
                    .map(|packed| (id, packed.position()))
            })
            .collect();
        self.vertex = 0;
        if self.targets.is_empty() {
            log::trace!("attribute '{}' is not packed, skipping", attribute.name());
            return None;
        }
        self.attributes_seen.push(attribute.name().clone());
        self.current = Some(attribute.clone());
        Some(self)
    }

    fn on_data_attribute_value_finish(&mut self, _attribute: &Attribute) {
        self.current = None;
        self.targets.clear();
    }
}

impl ValuesEvents for PackedMeshes {
    fn on_value(&mut self, value: &AttributeValue) {
        if let Err(message) = self.write_value(value) {
            self.on_error(ParseError::message(message));
        }
        self.vertex += 1;
    }
}

impl TrianglesEvents for PackedMeshes {
    fn on_data_triangle(&mut self, v0: u64, v1: u64, v2: u64) {
        if let Err(message) = self.write_triangle([v0, v1, v2]) {
            self.on_error(ParseError::message(message));
        }
        self.triangle += 1;
    }
}
