//! Interleaved vertex layouts.
//!
//! Offsets are assigned by one forward scan over the attributes in the order
//! given. By default no padding is inserted: attribute `i` starts at the sum
//! of the sizes of attributes `0..i`, and the vertex stride is the sum of all
//! sizes. [`PackingConfiguration::build_aligned`] is the opt-in alternative
//! for consumers that need word-aligned access.
//!
//! ```text
//! attributes: position float 3 32 | normal float 3 16 | id uint 1 8
//! offsets:    0                     12                  18
//! vertex:     [pppppppppppp|nnnnnn|i]  = 19 octets
//! ```

use std::collections::BTreeMap;

use crate::error::PackingError;
use crate::layout::{Attribute, AttributeName};

/// An attribute together with its offset inside a packed vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedAttribute {
    attribute: Attribute,
    position: usize,
    offset_octets: u32,
}

impl PackedAttribute {
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Index of this attribute within the configuration.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Offset from the start of a vertex, in octets.
    pub fn offset_octets(&self) -> u32 {
        self.offset_octets
    }
}

/// A deterministic interleaved layout for an ordered attribute list.
///
/// Immutable once built; rebuild it when the attribute list changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackingConfiguration {
    vertex_size_octets: u32,
    attributes: Vec<PackedAttribute>,
    by_name: BTreeMap<AttributeName, usize>,
    by_offset: BTreeMap<u32, usize>,
}

impl PackingConfiguration {
    /// Pack `attributes` with no padding.
    ///
    /// Names are assumed unique, which every [`Header`](crate::layout::Header)
    /// already guarantees.
    pub fn build(attributes: &[Attribute]) -> Result<Self, PackingError> {
        Self::build_aligned(attributes, 1)
    }

    /// Pack `attributes`, rounding every offset and the vertex size up to a
    /// multiple of `alignment` octets.
    pub fn build_aligned(attributes: &[Attribute], alignment: u32) -> Result<Self, PackingError> {
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(PackingError::InvalidAlignment(alignment));
        }

        let mut offset: u32 = 0;
        let mut packed = Vec::with_capacity(attributes.len());
        let mut by_name = BTreeMap::new();
        let mut by_offset = BTreeMap::new();

        for (position, attribute) in attributes.iter().enumerate() {
            let overflow = || PackingError::VertexSizeOverflow(attribute.name().clone());
            let start = align_up(offset, alignment).ok_or_else(overflow)?;
            offset = start
                .checked_add(attribute.size_octets())
                .ok_or_else(overflow)?;

            by_name.insert(attribute.name().clone(), position);
            by_offset.insert(start, position);
            packed.push(PackedAttribute {
                attribute: attribute.clone(),
                position,
                offset_octets: start,
            });
        }

        let vertex_size_octets = match attributes.last() {
            Some(last) => align_up(offset, alignment)
                .ok_or_else(|| PackingError::VertexSizeOverflow(last.name().clone()))?,
            None => 0,
        };

        log::trace!(
            "packed {} attributes into {} octets per vertex",
            packed.len(),
            vertex_size_octets
        );

        Ok(Self {
            vertex_size_octets,
            attributes: packed,
            by_name,
            by_offset,
        })
    }

    /// Size of one interleaved vertex in octets.
    pub fn vertex_size_octets(&self) -> u32 {
        self.vertex_size_octets
    }

    pub fn attributes_ordered(&self) -> &[PackedAttribute] {
        &self.attributes
    }

    pub fn packed_attribute_by_name(&self, name: &AttributeName) -> Option<&PackedAttribute> {
        self.by_name.get(name).map(|&i| &self.attributes[i])
    }

    /// The attribute starting exactly at `offset` octets into a vertex.
    pub fn packed_attribute_at_offset(&self, offset: u32) -> Option<&PackedAttribute> {
        self.by_offset.get(&offset).map(|&i| &self.attributes[i])
    }

    /// Octet address of attribute `position` of vertex `vertex` in an
    /// interleaved buffer: `vertex * vertex_size + offset(position)`.
    pub fn offset_octets_for_index(&self, position: usize, vertex: u64) -> Result<u64, PackingError> {
        let packed = self
            .attributes
            .get(position)
            .ok_or(PackingError::InvalidAttributePosition {
                position,
                count: self.attributes.len(),
            })?;
        vertex
            .checked_mul(u64::from(self.vertex_size_octets))
            .and_then(|base| base.checked_add(u64::from(packed.offset_octets)))
            .ok_or(PackingError::OffsetOverflow { position, vertex })
    }

    /// Octets needed to hold `vertex_count` interleaved vertices.
    pub fn buffer_size_octets(&self, vertex_count: u64) -> Result<usize, PackingError> {
        vertex_count
            .checked_mul(u64::from(self.vertex_size_octets))
            .and_then(|size| usize::try_from(size).ok())
            .ok_or(PackingError::BufferSizeOverflow {
                vertex_count,
                vertex_size: self.vertex_size_octets,
            })
    }
}

fn align_up(value: u32, alignment: u32) -> Option<u32> {
    let mask = alignment - 1;
    value.checked_add(mask).map(|v| v & !mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ComponentType;
    use rstest::rstest;

    fn attr(name: &str, ty: ComponentType, count: u32, bits: u32) -> Attribute {
        Attribute::new(AttributeName::new(name).unwrap(), ty, count, bits).unwrap()
    }

    #[test]
    fn test_single_attribute() {
        let config = PackingConfiguration::build(&[attr("x", ComponentType::Float, 1, 16)]).unwrap();
        assert_eq!(config.vertex_size_octets(), 2);
        assert_eq!(config.offset_octets_for_index(0, 0).unwrap(), 0);
        assert_eq!(config.offset_octets_for_index(0, 1).unwrap(), 2);
        assert_eq!(config.offset_octets_for_index(0, 2).unwrap(), 4);
    }

    #[test]
    fn test_single_byte_attribute() {
        let config =
            PackingConfiguration::build(&[attr("x", ComponentType::UnsignedInteger, 1, 8)]).unwrap();
        assert_eq!(config.vertex_size_octets(), 1);
        assert_eq!(config.offset_octets_for_index(0, 0).unwrap(), 0);
        assert_eq!(config.offset_octets_for_index(0, 1).unwrap(), 1);
        assert_eq!(config.offset_octets_for_index(0, 2).unwrap(), 2);
    }

    #[test]
    fn test_packing_law() {
        let attributes = vec![
            attr("position", ComponentType::Float, 3, 32),
            attr("normal", ComponentType::Float, 3, 16),
            attr("id", ComponentType::UnsignedInteger, 1, 8),
            attr("weights", ComponentType::Float, 4, 64),
        ];
        let config = PackingConfiguration::build(&attributes).unwrap();

        let mut expected_offset = 0;
        for (i, a) in attributes.iter().enumerate() {
            let packed = config.packed_attribute_by_name(a.name()).unwrap();
            assert_eq!(packed.offset_octets(), expected_offset);
            assert_eq!(packed.position(), i);
            assert_eq!(packed.attribute(), a);
            expected_offset += a.size_octets();
        }
        assert_eq!(config.vertex_size_octets(), expected_offset);
        assert_eq!(config.vertex_size_octets(), 12 + 6 + 1 + 32);

        assert_eq!(config.offset_octets_for_index(2, 0).unwrap(), 18);
        assert_eq!(config.offset_octets_for_index(2, 3).unwrap(), 3 * 51 + 18);
    }

    #[test]
    fn test_name_and_offset_lookups_agree() {
        let attributes = vec![
            attr("a", ComponentType::SignedInteger, 2, 16),
            attr("b", ComponentType::Float, 1, 32),
            attr("c", ComponentType::UnsignedInteger, 3, 8),
        ];
        let config = PackingConfiguration::build(&attributes).unwrap();
        for a in &attributes {
            let by_name = config.packed_attribute_by_name(a.name()).unwrap();
            let by_offset = config
                .packed_attribute_at_offset(by_name.offset_octets())
                .unwrap();
            assert_eq!(by_name, by_offset);
        }
        assert!(config.packed_attribute_at_offset(1).is_none());
    }

    #[test]
    fn test_empty_configuration() {
        let config = PackingConfiguration::build(&[]).unwrap();
        assert_eq!(config.vertex_size_octets(), 0);
        assert!(config.attributes_ordered().is_empty());
        assert_eq!(
            config.offset_octets_for_index(0, 0),
            Err(PackingError::InvalidAttributePosition {
                position: 0,
                count: 0
            })
        );
    }

    #[test]
    fn test_offset_overflow_reported() {
        let config = PackingConfiguration::build(&[attr("a", ComponentType::Float, 4, 64)]).unwrap();
        assert_eq!(
            config.offset_octets_for_index(0, u64::MAX),
            Err(PackingError::OffsetOverflow {
                position: 0,
                vertex: u64::MAX
            })
        );
    }

    #[test]
    fn test_buffer_size() {
        let config = PackingConfiguration::build(&[attr("a", ComponentType::Float, 3, 32)]).unwrap();
        assert_eq!(config.buffer_size_octets(10).unwrap(), 120);
        assert!(matches!(
            config.buffer_size_octets(u64::MAX),
            Err(PackingError::BufferSizeOverflow { .. })
        ));
    }

    #[rstest]
    #[case::align4(4, &[0, 4, 8], 12)]
    #[case::align8(8, &[0, 8, 16], 24)]
    #[case::align1(1, &[0, 3, 7], 8)]
    fn test_aligned_packing(#[case] alignment: u32, #[case] offsets: &[u32], #[case] size: u32) {
        let attributes = vec![
            attr("a", ComponentType::UnsignedInteger, 3, 8),
            attr("b", ComponentType::Float, 1, 32),
            attr("c", ComponentType::UnsignedInteger, 1, 8),
        ];
        let config = PackingConfiguration::build_aligned(&attributes, alignment).unwrap();
        let actual: Vec<u32> = config
            .attributes_ordered()
            .iter()
            .map(PackedAttribute::offset_octets)
            .collect();
        assert_eq!(actual, offsets);
        assert_eq!(config.vertex_size_octets(), size);
    }

    #[rstest]
    #[case::zero(0)]
    #[case::three(3)]
    #[case::twelve(12)]
    fn test_invalid_alignment(#[case] alignment: u32) {
        assert_eq!(
            PackingConfiguration::build_aligned(&[], alignment),
            Err(PackingError::InvalidAlignment(alignment))
        );
    }
}
