//! Shape kinds and the host geometry trait.

use std::fmt;

use lumen_core::sets;
use lumen_math::{Aabb, Axis, Interval, Ray, Vec3};
use rand::RngCore;

use crate::hittable::HitRecord;

/// Tagged shape variant. Boxes are groups of rectangles, not a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Sphere,
    MovingSphere,
    VolumeSphere,
    Rect(Axis),
    VolumeBox,
    Triangle,
    TriangleMesh,
    Plane,
}

impl ShapeKind {
    pub fn program_set(self) -> &'static str {
        match self {
            ShapeKind::Sphere => sets::SPHERE,
            ShapeKind::MovingSphere => sets::MOVING_SPHERE,
            ShapeKind::VolumeSphere => sets::VOLUME_SPHERE,
            ShapeKind::Rect(_) => sets::AARECT,
            ShapeKind::VolumeBox => sets::VOLUME_BOX,
            ShapeKind::Triangle => sets::TRIANGLE,
            ShapeKind::TriangleMesh => sets::MESH,
            ShapeKind::Plane => sets::PLANE,
        }
    }

    /// Entry name of the bounding-volume program.
    pub fn bounds_entry(self) -> String {
        match self {
            ShapeKind::Rect(axis) => format!("get_bounds_{}", axis.suffix()),
            ShapeKind::TriangleMesh => "mesh_bounds".to_string(),
            _ => "get_bounds".to_string(),
        }
    }

    /// Entry name of the intersection program.
    pub fn intersect_entry(self) -> String {
        match self {
            ShapeKind::Sphere | ShapeKind::MovingSphere | ShapeKind::VolumeSphere => "hit_sphere".to_string(),
            ShapeKind::Rect(axis) => format!("hit_rect_{}", axis.suffix()),
            ShapeKind::VolumeBox => "hit_volume".to_string(),
            ShapeKind::Triangle => "hit_triangle".to_string(),
            ShapeKind::TriangleMesh => "mesh_intersection".to_string(),
            ShapeKind::Plane => "hit_plane".to_string(),
        }
    }

    /// `(sample, pdf)` entry names for shapes usable as lights.
    pub fn light_entries(self) -> Option<(String, String)> {
        match self {
            ShapeKind::Sphere => Some(("sample".to_string(), "pdf".to_string())),
            ShapeKind::Rect(axis) => Some((format!("sample_{}", axis.suffix()), format!("pdf_{}", axis.suffix()))),
            _ => None,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Sphere => write!(f, "sphere"),
            ShapeKind::MovingSphere => write!(f, "moving sphere"),
            ShapeKind::VolumeSphere => write!(f, "volume sphere"),
            ShapeKind::Rect(axis) => write!(f, "{} rectangle", axis),
            ShapeKind::VolumeBox => write!(f, "volume box"),
            ShapeKind::Triangle => write!(f, "triangle"),
            ShapeKind::TriangleMesh => write!(f, "triangle mesh"),
            ShapeKind::Plane => write!(f, "plane"),
        }
    }
}

/// Relative margin added to the bounds of curved and volumetric shapes.
const BOUNDS_MARGIN: f32 = 1e-4;

/// Grow `bbox` so that rounding in the hit point cannot leave it.
///
/// The margin scales with the largest coordinate of the box.
pub(crate) fn conservative_bounds(bbox: Aabb) -> Aabb {
    let scale = bbox.min_point().abs().max(bbox.max_point().abs()).max_element().max(1.0);
    bbox.padded(BOUNDS_MARGIN * scale)
}

/// Host implementation of a shape: bounds, intersection and, for lights,
/// direction sampling.
pub trait Shape: Send + Sync + fmt::Debug {
    fn kind(&self) -> ShapeKind;

    /// Nearest intersection within `ray_t`. Fills geometry fields of `rec`.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'_>) -> bool;

    /// Conservative bounds, `None` when the shape is unbounded.
    fn bounding_box(&self) -> Option<Aabb>;

    /// Number of sub-primitives (triangles for meshes).
    fn sub_primitive_count(&self) -> usize {
        1
    }

    /// Material slots the sub-primitives refer to: highest slot + 1.
    fn material_slots(&self) -> usize {
        1
    }

    /// Representative point, used to evaluate light emission.
    fn centroid(&self) -> Vec3 {
        self.bounding_box().map(|b| b.centroid()).unwrap_or(Vec3::ZERO)
    }

    /// Scattering density for participating media.
    fn density(&self) -> Option<f32> {
        None
    }

    /// Solid-angle density of sampling `direction` from `origin`.
    fn pdf_value(&self, _origin: Vec3, _direction: Vec3) -> f32 {
        0.0
    }

    /// Direction from `origin` toward a random point on the shape.
    fn random_direction(&self, _origin: Vec3, _rng: &mut dyn RngCore) -> Vec3 {
        Vec3::X
    }
}
