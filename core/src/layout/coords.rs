//! Coordinate system descriptions.
//!
//! A coordinate system is purely descriptive: it records which signed axes a
//! mesh treats as right, up and forward, and which winding order marks the
//! front face of a triangle. Nothing in the toolkit transforms vertices.

use std::fmt;
use std::str::FromStr;

use crate::error::LayoutError;

/// A signed coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    PositiveX,
    PositiveY,
    PositiveZ,
    NegativeX,
    NegativeY,
    NegativeZ,
}

impl Axis {
    pub const ALL: [Axis; 6] = [
        Axis::PositiveX,
        Axis::PositiveY,
        Axis::PositiveZ,
        Axis::NegativeX,
        Axis::NegativeY,
        Axis::NegativeZ,
    ];

    /// Signed name such as `+x` or `-z`.
    pub fn signed_name(&self) -> &'static str {
        match self {
            Self::PositiveX => "+x",
            Self::PositiveY => "+y",
            Self::PositiveZ => "+z",
            Self::NegativeX => "-x",
            Self::NegativeY => "-y",
            Self::NegativeZ => "-z",
        }
    }

    pub fn from_signed_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|axis| axis.signed_name() == name)
    }

    /// Ordinal used by the binary encoding.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::PositiveX => 0,
            Self::PositiveY => 1,
            Self::PositiveZ => 2,
            Self::NegativeX => 3,
            Self::NegativeY => 4,
            Self::NegativeZ => 5,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal)).copied()
    }

    /// The unsigned axis (0 = x, 1 = y, 2 = z).
    fn unsigned_index(&self) -> u8 {
        self.ordinal() % 3
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signed_name())
    }
}

/// Three mutually perpendicular axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisSystem {
    right: Axis,
    up: Axis,
    forward: Axis,
}

impl AxisSystem {
    pub fn new(right: Axis, up: Axis, forward: Axis) -> Result<Self, LayoutError> {
        let (r, u, f) = (
            right.unsigned_index(),
            up.unsigned_index(),
            forward.unsigned_index(),
        );
        if r == u || u == f || r == f {
            return Err(LayoutError::AxesNotPerpendicular { right, up, forward });
        }
        Ok(Self { right, up, forward })
    }

    pub fn right(&self) -> Axis {
        self.right
    }

    pub fn up(&self) -> Axis {
        self.up
    }

    pub fn forward(&self) -> Axis {
        self.forward
    }
}

impl Default for AxisSystem {
    fn default() -> Self {
        Self {
            right: Axis::PositiveX,
            up: Axis::PositiveY,
            forward: Axis::NegativeZ,
        }
    }
}

/// Winding order of front-facing triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindingOrder {
    Clockwise,
    #[default]
    CounterClockwise,
}

impl WindingOrder {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clockwise => "clockwise",
            Self::CounterClockwise => "counter-clockwise",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "clockwise" => Some(Self::Clockwise),
            "counter-clockwise" => Some(Self::CounterClockwise),
            _ => None,
        }
    }

    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Clockwise => 0,
            Self::CounterClockwise => 1,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Clockwise),
            1 => Some(Self::CounterClockwise),
            _ => None,
        }
    }
}

/// Axes plus winding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CoordinateSystem {
    axes: AxisSystem,
    winding_order: WindingOrder,
}

impl CoordinateSystem {
    pub fn new(axes: AxisSystem, winding_order: WindingOrder) -> Self {
        Self {
            axes,
            winding_order,
        }
    }

    pub fn axes(&self) -> AxisSystem {
        self.axes
    }

    pub fn winding_order(&self) -> WindingOrder {
        self.winding_order
    }

    /// Human readable form, e.g. `+x +y -z counter-clockwise`.
    pub fn to_human_string(&self) -> String {
        format!(
            "{} {} {} {}",
            self.axes.right,
            self.axes.up,
            self.axes.forward,
            self.winding_order.name()
        )
    }

    /// Parse the four tokens written by [`CoordinateSystem::to_human_string`].
    pub fn from_tokens(tokens: &[&str]) -> Result<Self, LayoutError> {
        let invalid = || LayoutError::InvalidCoordinateSystem(tokens.join(" "));
        let &[right, up, forward, winding] = tokens else {
            return Err(invalid());
        };
        let axis = |name: &str| Axis::from_signed_name(name).ok_or_else(invalid);
        let axes = AxisSystem::new(axis(right)?, axis(up)?, axis(forward)?)?;
        let winding_order = WindingOrder::from_name(winding).ok_or_else(invalid)?;
        Ok(Self::new(axes, winding_order))
    }
}

impl FromStr for CoordinateSystem {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        Self::from_tokens(&tokens)
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_human_string())
    }
}
