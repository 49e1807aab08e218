use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::Vec3;

/// Error returned when a string does not name a coordinate axis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown axis '{0}', expected one of x, y, z")]
pub struct AxisError(pub String);

/// One of the three world axes.
///
/// Axis-aligned rectangles and planes are perpendicular to their axis. The two
/// remaining axes span the surface as `(a, b)`: X spans (Y, Z), Y spans (X, Z),
/// Z spans (X, Y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index (0=X, 1=Y, 2=Z).
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    /// The in-plane axes `(a, b)` of a surface perpendicular to this axis.
    pub fn plane_axes(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }

    /// Upper-case suffix used by per-axis program entry names (`hit_rect_X`).
    pub fn suffix(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }

    /// Builds a point from a coordinate along this axis and the two in-plane coordinates.
    pub fn compose(self, k: f32, a: f32, b: f32) -> Vec3 {
        match self {
            Axis::X => Vec3::new(k, a, b),
            Axis::Y => Vec3::new(a, k, b),
            Axis::Z => Vec3::new(a, b, k),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Axis {
    type Err = AxisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "x" | "X" => Ok(Axis::X),
            "y" | "Y" => Ok(Axis::Y),
            "z" | "Z" => Ok(Axis::Z),
            other => Err(AxisError(other.to_string())),
        }
    }
}
