//! Lumen math - vector types and ray/box primitives shared by the scene crates.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod axis;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use axis::{Axis, AxisError};
pub use interval::Interval;
pub use ray::Ray;
pub use transform::Mat4Ext;

/// RGB color, linear, components usually in [0, 1] (emitters go above).
pub type Color = Vec3;
