//! Building [`MemoryMesh`] values from parser events.

use std::collections::BTreeMap;

use crate::diagnostic::{ParseError, ParseWarning};
use crate::layout::{Attribute, AttributeName, FormatVersion, Header, SchemaIdentifier};
use crate::logged::Logged;
use crate::memory::{AttributeArray, MemoryMesh, Metadata};
use crate::protocol::{
    AttributeValue, AttributesEvents, BodyEvents, Diagnostics, HeaderEvents, MetaEvents,
    ParserEvents, TrianglesEvents, ValuesEvents,
};

// Upper bound on up-front allocation; a header may declare more vertices
// than the stream delivers.
const MAXIMUM_PREALLOCATED_VERTICES: u64 = 1 << 16;

/// A [`ParserEvents`] consumer that collects everything into memory.
#[derive(Debug, Default)]
pub struct MemoryMeshProducer {
    version: Option<FormatVersion>,
    header: Option<Header>,
    arrays: BTreeMap<AttributeName, AttributeArray>,
    current: Option<AttributeName>,
    triangles: Vec<[u64; 3]>,
    metadata: Vec<Metadata>,
    errors: Vec<ParseError>,
    warnings: Vec<ParseWarning>,
}

impl MemoryMeshProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The format version the stream declared, if any.
    pub fn version(&self) -> Option<FormatVersion> {
        self.version
    }

    /// The collected mesh, or every error seen while parsing and assembling.
    pub fn into_mesh(mut self) -> Logged<MemoryMesh> {
        let Some(header) = self.header else {
            if self.errors.is_empty() {
                self.errors.push(ParseError::message("No header was parsed"));
            }
            return Logged::failed(self.errors, self.warnings);
        };

        if header.vertex_count() == 0 {
            for attribute in header.attributes_in_order() {
                self.arrays
                    .entry(attribute.name().clone())
                    .or_insert_with(|| AttributeArray::new(attribute.clone()));
            }
        }

        let mesh = match MemoryMesh::new(header, self.arrays.into_values(), self.triangles, self.metadata) {
            Ok(mesh) => Some(mesh),
            Err(e) => {
                // Parsers already reported the cause in more detail.
                if self.errors.is_empty() {
                    self.errors.push(ParseError::message(e.to_string()));
                }
                None
            }
        };
        Logged::from_parts(mesh, self.errors, self.warnings)
    }
}

impl Diagnostics for MemoryMeshProducer {
    fn on_warning(&mut self, warning: ParseWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    fn on_error(&mut self, error: ParseError) {
        log::error!("{error}");
        self.errors.push(error);
    }
}

impl ParserEvents for MemoryMeshProducer {
    fn on_start(&mut self) {}

    fn on_version_received(&mut self, version: FormatVersion) -> Option<&mut dyn HeaderEvents> {
        self.version = Some(version);
        Some(self)
    }

    fn on_finish(&mut self) {
        log::debug!(
            "collected {} attribute arrays, {} triangles, {} metadata blocks",
            self.arrays.len(),
            self.triangles.len(),
            self.metadata.len()
        );
    }
}

impl HeaderEvents for MemoryMeshProducer {
    fn on_header_parsed(&mut self, header: &Header) -> Option<&mut dyn BodyEvents> {
        self.header = Some(header.clone());
        Some(self)
    }
}

impl BodyEvents for MemoryMeshProducer {
    fn on_attributes_non_interleaved(&mut self) -> Option<&mut dyn AttributesEvents> {
        Some(self)
    }

    fn on_triangles(&mut self) -> Option<&mut dyn TrianglesEvents> {
        let expected = self
            .header
            .as_ref()
            .map_or(0, |h| h.triangles().triangle_count());
        self.triangles
            .reserve(expected.min(MAXIMUM_PREALLOCATED_VERTICES) as usize);
        Some(self)
    }

    fn on_meta(&mut self, _schema: &SchemaIdentifier) -> Option<&mut dyn MetaEvents> {
        Some(self)
    }
}

impl AttributesEvents for MemoryMeshProducer {
    fn on_data_attribute_start(&mut self, attribute: &Attribute) -> Option<&mut dyn ValuesEvents> {
        let vertices = self
            .header
            .as_ref()
            .map_or(0, |h| h.vertex_count().min(MAXIMUM_PREALLOCATED_VERTICES));
        self.arrays.insert(
            attribute.name().clone(),
            AttributeArray::with_capacity(attribute.clone(), vertices as usize),
        );
        self.current = Some(attribute.name().clone());
        Some(self)
    }

    fn on_data_attribute_value_finish(&mut self, _attribute: &Attribute) {
        self.current = None;
    }
}

impl ValuesEvents for MemoryMeshProducer {
    fn on_value(&mut self, value: &AttributeValue) {
        let result = match self.current.as_ref().and_then(|name| self.arrays.get_mut(name)) {
            Some(array) => array.push(value).map_err(|e| e.to_string()),
            None => Err("value received outside an attribute".to_owned()),
        };
        if let Err(message) = result {
            self.on_error(ParseError::message(message));
        }
    }
}

impl TrianglesEvents for MemoryMeshProducer {
    fn on_data_triangle(&mut self, v0: u64, v1: u64, v2: u64) {
        self.triangles.push([v0, v1, v2]);
    }
}

impl MetaEvents for MemoryMeshProducer {
    fn on_meta_data(&mut self, schema: &SchemaIdentifier, data: &[u8]) {
        self.metadata.push(Metadata {
            schema: schema.clone(),
            data: data.to_vec(),
        });
    }
}
