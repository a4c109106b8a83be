//! Whole meshes held in memory.
//!
//! This module provides:
//! - [`AttributeArray`] - One attribute column, stored flat by component type
//! - [`Metadata`] - An opaque metadata block tagged with its schema
//! - [`MemoryMesh`] - A header together with all of its data

use std::collections::BTreeMap;

use crate::error::{MeshError, ProtocolViolation};
use crate::layout::{Attribute, AttributeName, ComponentType, Header, SchemaIdentifier};
use crate::protocol::{AttributeValue, Components};

/// Components of an attribute column, `component_count` per vertex.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Signed(Vec<i64>),
    Unsigned(Vec<u64>),
    Float(Vec<f64>),
}

impl ArrayData {
    fn len(&self) -> usize {
        match self {
            Self::Signed(v) => v.len(),
            Self::Unsigned(v) => v.len(),
            Self::Float(v) => v.len(),
        }
    }
}

/// The values of one attribute for every vertex of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeArray {
    attribute: Attribute,
    data: ArrayData,
}

impl AttributeArray {
    /// An empty column for `attribute`.
    pub fn new(attribute: Attribute) -> Self {
        Self::with_capacity(attribute, 0)
    }

    /// An empty column with room for `vertices` values.
    pub fn with_capacity(attribute: Attribute, vertices: usize) -> Self {
        let capacity = vertices.saturating_mul(attribute.component_count() as usize);
        let data = match attribute.component_type() {
            ComponentType::SignedInteger => ArrayData::Signed(Vec::with_capacity(capacity)),
            ComponentType::UnsignedInteger => ArrayData::Unsigned(Vec::with_capacity(capacity)),
            ComponentType::Float => ArrayData::Float(Vec::with_capacity(capacity)),
        };
        Self { attribute, data }
    }

    /// Collect a column from values, checking each against `attribute`.
    pub fn from_values(
        attribute: Attribute,
        values: impl IntoIterator<Item = AttributeValue>,
    ) -> Result<Self, ProtocolViolation> {
        let mut array = Self::new(attribute);
        for value in values {
            array.push(&value)?;
        }
        Ok(array)
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Append one vertex's value.
    pub fn push(&mut self, value: &AttributeValue) -> Result<(), ProtocolViolation> {
        value.check_shape(&self.attribute)?;
        value.check_range(&self.attribute)?;
        match (&mut self.data, value) {
            (ArrayData::Signed(data), AttributeValue::Signed(c)) => data.extend_from_slice(c.as_slice()),
            (ArrayData::Unsigned(data), AttributeValue::Unsigned(c)) => {
                data.extend_from_slice(c.as_slice())
            }
            (ArrayData::Float(data), AttributeValue::Float(c)) => data.extend_from_slice(c.as_slice()),
            // check_shape has already rejected every other pairing
            _ => {}
        }
        Ok(())
    }

    /// Number of vertices stored.
    pub fn len(&self) -> usize {
        self.data.len() / self.attribute.component_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// The value of vertex `index`.
    pub fn get(&self, index: usize) -> Option<AttributeValue> {
        let count = self.attribute.component_count() as usize;
        let range = index.checked_mul(count)?..index.checked_add(1)?.checked_mul(count)?;
        match &self.data {
            ArrayData::Signed(data) => Some(AttributeValue::Signed(gather(data.get(range)?))),
            ArrayData::Unsigned(data) => Some(AttributeValue::Unsigned(gather(data.get(range)?))),
            ArrayData::Float(data) => Some(AttributeValue::Float(gather(data.get(range)?))),
        }
    }

    /// Values in vertex order.
    pub fn values(&self) -> impl Iterator<Item = AttributeValue> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }
}

fn gather<T: Copy + Default>(slice: &[T]) -> Components<T> {
    let mut values = [T::default(); 4];
    let count = slice.len().min(4);
    values[..count].copy_from_slice(&slice[..count]);
    Components::from_array(values, count)
}

/// A metadata block. The contents are opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub schema: SchemaIdentifier,
    pub data: Vec<u8>,
}

/// A header with every attribute column, the triangles and the metadata
/// blocks of a mesh.
///
/// Construction checks the data against the header: one column per
/// declared attribute holding exactly `vertex_count` values, and exactly
/// `triangle_count` triangles whose indices fit the index size.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMesh {
    header: Header,
    arrays: BTreeMap<AttributeName, AttributeArray>,
    triangles: Vec<[u64; 3]>,
    metadata: Vec<Metadata>,
}

impl MemoryMesh {
    pub fn new(
        header: Header,
        arrays: impl IntoIterator<Item = AttributeArray>,
        triangles: Vec<[u64; 3]>,
        metadata: Vec<Metadata>,
    ) -> Result<Self, MeshError> {
        let mut by_name = BTreeMap::new();
        for array in arrays {
            let name = array.attribute().name().clone();
            match header.attribute(&name) {
                None => return Err(MeshError::UndeclaredAttribute(name)),
                Some(declared) if declared != array.attribute() => {
                    return Err(MeshError::AttributeMismatch(name));
                }
                Some(_) => {}
            }
            if array.len() as u64 != header.vertex_count() {
                return Err(MeshError::ArrayLength {
                    attribute: name,
                    expected: header.vertex_count(),
                    actual: array.len() as u64,
                });
            }
            by_name.insert(name, array);
        }

        for attribute in header.attributes_in_order() {
            if !by_name.contains_key(attribute.name()) {
                return Err(MeshError::MissingAttributeData(attribute.name().clone()));
            }
        }

        let block = header.triangles();
        if triangles.len() as u64 != block.triangle_count() {
            return Err(MeshError::TriangleCount {
                expected: block.triangle_count(),
                actual: triangles.len() as u64,
            });
        }
        if let Some(&index) = triangles.iter().flatten().find(|&&i| i > block.max_index()) {
            return Err(MeshError::TriangleIndexTooLarge {
                index,
                bits: block.index_size_bits(),
            });
        }

        Ok(Self {
            header,
            arrays: by_name,
            triangles,
            metadata,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn array(&self, name: &AttributeName) -> Option<&AttributeArray> {
        self.arrays.get(name)
    }

    /// Attribute columns in header order.
    pub fn arrays_in_order(&self) -> impl Iterator<Item = &AttributeArray> + '_ {
        self.header
            .attributes_in_order()
            .iter()
            .filter_map(|a| self.arrays.get(a.name()))
    }

    pub fn triangles(&self) -> &[[u64; 3]] {
        &self.triangles
    }

    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    /// Compare two meshes, allowing float components to differ by the
    /// rounding their component size implies.
    ///
    /// Relative tolerances are 1e-2 for 16-bit, 1e-5 for 32-bit and 1e-12
    /// for 64-bit floats. Everything else must match exactly.
    pub fn approx_eq(&self, other: &MemoryMesh) -> bool {
        if self.header != other.header
            || self.triangles != other.triangles
            || self.metadata != other.metadata
        {
            return false;
        }
        self.header.attributes_in_order().iter().all(|attribute| {
            match (self.arrays.get(attribute.name()), other.arrays.get(attribute.name())) {
                (Some(a), Some(b)) => arrays_approx_eq(a, b),
                _ => false,
            }
        })
    }
}

fn arrays_approx_eq(a: &AttributeArray, b: &AttributeArray) -> bool {
    match (&a.data, &b.data) {
        (ArrayData::Float(x), ArrayData::Float(y)) => {
            let tolerance = float_tolerance(a.attribute.component_size_bits());
            x.len() == y.len() && x.iter().zip(y).all(|(&p, &q)| floats_close(p, q, tolerance))
        }
        (x, y) => x == y,
    }
}

fn float_tolerance(bits: u32) -> f64 {
    match bits {
        16 => 1.0e-2,
        32 => 1.0e-5,
        _ => 1.0e-12,
    }
}

fn floats_close(a: f64, b: f64, tolerance: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    if a == b {
        return true;
    }
    (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
}
