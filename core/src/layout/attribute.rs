//! Vertex attribute declarations.

use std::fmt;

use crate::error::LayoutError;
use crate::layout::AttributeName;

/// Kind of the scalar components of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentType {
    /// Two's complement signed integers.
    SignedInteger,
    /// Unsigned integers.
    UnsignedInteger,
    /// IEEE 754 floating point.
    Float,
}

impl ComponentType {
    /// All component types, in integer code order.
    pub const ALL: [ComponentType; 3] = [
        ComponentType::SignedInteger,
        ComponentType::UnsignedInteger,
        ComponentType::Float,
    ];

    /// Name used by the text encoding.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedInteger => "integer-signed",
            Self::UnsignedInteger => "integer-unsigned",
            Self::Float => "float",
        }
    }

    /// Parse a name produced by [`ComponentType::name`].
    pub fn from_name(name: &str) -> Result<Self, LayoutError> {
        match name {
            "integer-signed" => Ok(Self::SignedInteger),
            "integer-unsigned" => Ok(Self::UnsignedInteger),
            "float" => Ok(Self::Float),
            other => Err(LayoutError::UnknownComponentType(other.to_owned())),
        }
    }

    /// Integer code used by the binary encoding.
    pub fn to_integer(&self) -> u32 {
        match self {
            Self::SignedInteger => 0,
            Self::UnsignedInteger => 1,
            Self::Float => 2,
        }
    }

    /// Decode an integer produced by [`ComponentType::to_integer`].
    pub fn from_integer(code: u32) -> Result<Self, LayoutError> {
        match code {
            0 => Ok(Self::SignedInteger),
            1 => Ok(Self::UnsignedInteger),
            2 => Ok(Self::Float),
            other => Err(LayoutError::UnknownComponentType(other.to_string())),
        }
    }

    /// Component sizes in bits this type supports.
    pub fn supported_sizes(&self) -> &'static [u32] {
        match self {
            Self::SignedInteger | Self::UnsignedInteger => &[8, 16, 32, 64],
            Self::Float => &[16, 32, 64],
        }
    }

    pub fn is_supported_size(&self, bits: u32) -> bool {
        self.supported_sizes().contains(&bits)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared vertex attribute.
///
/// The component count and size are checked at construction, so any
/// `Attribute` that exists describes a representable layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    name: AttributeName,
    component_type: ComponentType,
    component_count: u32,
    component_size_bits: u32,
}

impl Attribute {
    /// Create an attribute, rejecting unsupported counts and sizes.
    pub fn new(
        name: AttributeName,
        component_type: ComponentType,
        component_count: u32,
        component_size_bits: u32,
    ) -> Result<Self, LayoutError> {
        if !(1..=4).contains(&component_count) {
            return Err(LayoutError::UnsupportedComponentCount(component_count));
        }
        if !component_type.is_supported_size(component_size_bits) {
            return Err(LayoutError::UnsupportedComponentSize {
                component_type,
                bits: component_size_bits,
            });
        }
        Ok(Self {
            name,
            component_type,
            component_count,
            component_size_bits,
        })
    }

    /// Shorthand for a float attribute.
    pub fn float(name: AttributeName, count: u32, bits: u32) -> Result<Self, LayoutError> {
        Self::new(name, ComponentType::Float, count, bits)
    }

    /// Shorthand for a signed integer attribute.
    pub fn signed(name: AttributeName, count: u32, bits: u32) -> Result<Self, LayoutError> {
        Self::new(name, ComponentType::SignedInteger, count, bits)
    }

    /// Shorthand for an unsigned integer attribute.
    pub fn unsigned(name: AttributeName, count: u32, bits: u32) -> Result<Self, LayoutError> {
        Self::new(name, ComponentType::UnsignedInteger, count, bits)
    }

    pub fn name(&self) -> &AttributeName {
        &self.name
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn component_count(&self) -> u32 {
        self.component_count
    }

    pub fn component_size_bits(&self) -> u32 {
        self.component_size_bits
    }

    /// Size of one component in octets, rounded up.
    pub fn component_size_octets(&self) -> u32 {
        self.component_size_bits.div_ceil(8)
    }

    /// Size of one attribute value (all components) in octets.
    pub fn size_octets(&self) -> u32 {
        self.component_size_octets() * self.component_count
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.name, self.component_type, self.component_count, self.component_size_bits
        )
    }
}
