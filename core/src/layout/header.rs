//! Mesh headers.

use std::collections::BTreeMap;

use crate::error::LayoutError;
use crate::layout::{Attribute, AttributeName, CoordinateSystem, SchemaIdentifier, TriangleBlock};

/// Everything a mesh declares before its data.
///
/// A header is immutable once built. `attributes_by_name` is derived from
/// `attributes_in_order` during [`HeaderBuilder::build`] and never changes
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    vertex_count: u64,
    triangles: TriangleBlock,
    schema_identifier: Option<SchemaIdentifier>,
    coordinate_system: CoordinateSystem,
    attributes_in_order: Vec<Attribute>,
    attributes_by_name: BTreeMap<AttributeName, usize>,
}

impl Header {
    pub fn builder() -> HeaderBuilder {
        HeaderBuilder::default()
    }

    pub fn vertex_count(&self) -> u64 {
        self.vertex_count
    }

    pub fn triangles(&self) -> TriangleBlock {
        self.triangles
    }

    pub fn schema_identifier(&self) -> Option<&SchemaIdentifier> {
        self.schema_identifier.as_ref()
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.coordinate_system
    }

    pub fn attributes_in_order(&self) -> &[Attribute] {
        &self.attributes_in_order
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &AttributeName) -> Option<&Attribute> {
        self.attributes_by_name
            .get(name)
            .map(|&index| &self.attributes_in_order[index])
    }

    /// Position of an attribute within `attributes_in_order`.
    pub fn attribute_position(&self, name: &AttributeName) -> Option<usize> {
        self.attributes_by_name.get(name).copied()
    }

    /// Iterate over `(name, attribute)` pairs sorted by name.
    pub fn attributes_by_name(&self) -> impl Iterator<Item = (&AttributeName, &Attribute)> {
        self.attributes_by_name
            .iter()
            .map(|(name, &index)| (name, &self.attributes_in_order[index]))
    }

    /// A builder pre-filled with this header's fields.
    pub fn to_builder(&self) -> HeaderBuilder {
        HeaderBuilder {
            vertex_count: self.vertex_count,
            triangles: self.triangles,
            schema_identifier: self.schema_identifier.clone(),
            coordinate_system: self.coordinate_system,
            attributes: self.attributes_in_order.clone(),
        }
    }
}

/// Builder for [`Header`].
///
/// # Example
///
/// ```ignore
/// let header = Header::builder()
///     .with_vertex_count(3)
///     .with_triangles(TriangleBlock::new(1, 16)?)
///     .with_attribute(Attribute::float(AttributeName::new("position")?, 3, 32)?)
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeaderBuilder {
    vertex_count: u64,
    triangles: TriangleBlock,
    schema_identifier: Option<SchemaIdentifier>,
    coordinate_system: CoordinateSystem,
    attributes: Vec<Attribute>,
}

impl HeaderBuilder {
    pub fn with_vertex_count(mut self, vertex_count: u64) -> Self {
        self.vertex_count = vertex_count;
        self
    }

    pub fn with_triangles(mut self, triangles: TriangleBlock) -> Self {
        self.triangles = triangles;
        self
    }

    pub fn with_schema_identifier(mut self, schema: Option<SchemaIdentifier>) -> Self {
        self.schema_identifier = schema;
        self
    }

    pub fn with_coordinate_system(mut self, coordinate_system: CoordinateSystem) -> Self {
        self.coordinate_system = coordinate_system;
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        self.attributes = attributes.into_iter().collect();
        self
    }

    pub fn set_vertex_count(&mut self, vertex_count: u64) {
        self.vertex_count = vertex_count;
    }

    pub fn set_triangles(&mut self, triangles: TriangleBlock) {
        self.triangles = triangles;
    }

    pub fn set_schema_identifier(&mut self, schema: Option<SchemaIdentifier>) {
        self.schema_identifier = schema;
    }

    pub fn set_coordinate_system(&mut self, coordinate_system: CoordinateSystem) {
        self.coordinate_system = coordinate_system;
    }

    pub fn push_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Build the header, rejecting repeated attribute names.
    pub fn build(self) -> Result<Header, LayoutError> {
        let mut attributes_by_name = BTreeMap::new();
        for (index, attribute) in self.attributes.iter().enumerate() {
            if attributes_by_name
                .insert(attribute.name().clone(), index)
                .is_some()
            {
                return Err(LayoutError::DuplicateAttribute(attribute.name().clone()));
            }
        }

        Ok(Header {
            vertex_count: self.vertex_count,
            triangles: self.triangles,
            schema_identifier: self.schema_identifier,
            coordinate_system: self.coordinate_system,
            attributes_in_order: self.attributes,
            attributes_by_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ComponentType, SchemaName};

    fn attr(name: &str, ty: ComponentType, count: u32, bits: u32) -> Attribute {
        Attribute::new(AttributeName::new(name).unwrap(), ty, count, bits).unwrap()
    }

    #[test]
    fn test_header_consistency() {
        let attributes = vec![
            attr("position", ComponentType::Float, 3, 32),
            attr("normal", ComponentType::Float, 3, 16),
            attr("bones", ComponentType::UnsignedInteger, 4, 8),
        ];
        let header = Header::builder()
            .with_vertex_count(100)
            .with_attributes(attributes.clone())
            .build()
            .unwrap();

        assert_eq!(header.attributes_by_name().count(), attributes.len());
        for (index, a) in attributes.iter().enumerate() {
            assert_eq!(header.attribute(a.name()), Some(a));
            assert_eq!(header.attribute_position(a.name()), Some(index));
        }
        assert_eq!(header.attributes_in_order(), attributes.as_slice());
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let result = Header::builder()
            .with_attribute(attr("uv", ComponentType::Float, 2, 32))
            .with_attribute(attr("position", ComponentType::Float, 3, 32))
            .with_attribute(attr("uv", ComponentType::Float, 2, 16))
            .build();

        assert_eq!(
            result,
            Err(LayoutError::DuplicateAttribute(AttributeName::new("uv").unwrap()))
        );
    }

    #[test]
    fn test_to_builder_preserves_fields() {
        let header = Header::builder()
            .with_vertex_count(8)
            .with_triangles(TriangleBlock::new(12, 16).unwrap())
            .with_schema_identifier(Some(SchemaIdentifier::new(
                SchemaName::new("com.example.cube").unwrap(),
                1,
                0,
            )))
            .with_attribute(attr("position", ComponentType::Float, 3, 32))
            .build()
            .unwrap();

        let rebuilt = header.to_builder().build().unwrap();
        assert_eq!(rebuilt, header);

        let changed = header.to_builder().with_vertex_count(9).build().unwrap();
        assert_eq!(changed.vertex_count(), 9);
        assert_eq!(changed.triangles(), header.triangles());
    }

    #[test]
    fn test_empty_header_defaults() {
        let header = Header::builder().build().unwrap();
        assert_eq!(header.vertex_count(), 0);
        assert_eq!(header.triangles().triangle_count(), 0);
        assert_eq!(header.triangles().index_size_bits(), 32);
        assert!(header.schema_identifier().is_none());
        assert!(header.attributes_in_order().is_empty());
    }
}
