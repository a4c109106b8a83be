use crate::error::LayoutError;

/// Triangle count and index width declared by a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriangleBlock {
    triangle_count: u64,
    index_size_bits: u32,
}

impl TriangleBlock {
    /// Index sizes in bits a triangle block may use.
    pub const SUPPORTED_INDEX_SIZES: [u32; 4] = [8, 16, 32, 64];

    pub fn new(triangle_count: u64, index_size_bits: u32) -> Result<Self, LayoutError> {
        if !Self::SUPPORTED_INDEX_SIZES.contains(&index_size_bits) {
            return Err(LayoutError::UnsupportedIndexSize(index_size_bits));
        }
        Ok(Self {
            triangle_count,
            index_size_bits,
        })
    }

    pub fn triangle_count(&self) -> u64 {
        self.triangle_count
    }

    pub fn index_size_bits(&self) -> u32 {
        self.index_size_bits
    }

    pub fn index_size_octets(&self) -> u32 {
        self.index_size_bits / 8
    }

    /// Size of one triangle (three indices) in octets.
    pub fn triangle_size_octets(&self) -> u32 {
        self.index_size_octets() * 3
    }

    /// Largest vertex index representable at this index size.
    pub fn max_index(&self) -> u64 {
        match self.index_size_bits {
            64 => u64::MAX,
            bits => (1u64 << bits) - 1,
        }
    }
}

impl Default for TriangleBlock {
    fn default() -> Self {
        Self {
            triangle_count: 0,
            index_size_bits: 32,
        }
    }
}
