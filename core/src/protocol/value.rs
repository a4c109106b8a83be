//! Attribute values carried by the event protocol.
//!
//! One value type covers every (component type, component count) shape, so
//! the protocol has a single `on_value` callback. Whether a value fits the
//! attribute it is delivered for is a runtime check,
//! [`AttributeValue::check_shape`].

use std::fmt;

use crate::error::{LayoutError, ProtocolViolation};
use crate::layout::{Attribute, ComponentType};

/// One to four components of the same scalar type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Components<T> {
    values: [T; 4],
    count: u8,
}

impl<T: Copy + Default> Components<T> {
    /// Copy 1 to 4 components.
    pub fn new(values: &[T]) -> Result<Self, LayoutError> {
        if values.is_empty() || values.len() > 4 {
            return Err(LayoutError::UnsupportedComponentCount(values.len() as u32));
        }
        let mut stored = [T::default(); 4];
        stored[..values.len()].copy_from_slice(values);
        Ok(Self {
            values: stored,
            count: values.len() as u8,
        })
    }

    /// The first `count` entries of `values`, with `count` clamped to [1, 4].
    pub(crate) fn from_array(values: [T; 4], count: usize) -> Self {
        Self {
            values,
            count: count.clamp(1, 4) as u8,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values[..usize::from(self.count)]
    }

    pub fn count(&self) -> u32 {
        u32::from(self.count)
    }
}

/// A single vertex's value for one attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    Signed(Components<i64>),
    Unsigned(Components<u64>),
    Float(Components<f64>),
}

impl AttributeValue {
    pub fn signed(values: &[i64]) -> Result<Self, LayoutError> {
        Components::new(values).map(Self::Signed)
    }

    pub fn unsigned(values: &[u64]) -> Result<Self, LayoutError> {
        Components::new(values).map(Self::Unsigned)
    }

    pub fn float(values: &[f64]) -> Result<Self, LayoutError> {
        Components::new(values).map(Self::Float)
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Signed(_) => ComponentType::SignedInteger,
            Self::Unsigned(_) => ComponentType::UnsignedInteger,
            Self::Float(_) => ComponentType::Float,
        }
    }

    pub fn component_count(&self) -> u32 {
        match self {
            Self::Signed(c) => c.count(),
            Self::Unsigned(c) => c.count(),
            Self::Float(c) => c.count(),
        }
    }

    /// Check that this value has the type and count `attribute` declares.
    pub fn check_shape(&self, attribute: &Attribute) -> Result<(), ProtocolViolation> {
        if self.component_type() != attribute.component_type()
            || self.component_count() != attribute.component_count()
        {
            return Err(ProtocolViolation::ValueShapeMismatch {
                attribute: attribute.name().clone(),
                expected_type: attribute.component_type(),
                expected_count: attribute.component_count(),
                received_type: self.component_type(),
                received_count: self.component_count(),
            });
        }
        Ok(())
    }

    /// Check that integer components are representable at the attribute's
    /// component size. Float values always fit; narrowing rounds.
    pub fn check_range(&self, attribute: &Attribute) -> Result<(), ProtocolViolation> {
        let bits = attribute.component_size_bits();
        let fits = match self {
            Self::Signed(c) => c.as_slice().iter().all(|&v| signed_fits(v, bits)),
            Self::Unsigned(c) => c.as_slice().iter().all(|&v| unsigned_fits(v, bits)),
            Self::Float(_) => true,
        };
        if fits {
            Ok(())
        } else {
            Err(ProtocolViolation::ValueOutOfRange {
                attribute: attribute.name().clone(),
                bits,
            })
        }
    }
}

fn signed_fits(value: i64, bits: u32) -> bool {
    if bits >= 64 {
        return true;
    }
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    (min..=max).contains(&value)
}

fn unsigned_fits(value: u64, bits: u32) -> bool {
    bits >= 64 || value < (1u64 << bits)
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{v}")?;
            }
            Ok(())
        }
        match self {
            Self::Signed(c) => join(f, c.as_slice()),
            Self::Unsigned(c) => join(f, c.as_slice()),
            Self::Float(c) => join(f, c.as_slice()),
        }
    }
}
