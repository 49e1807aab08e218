//! Hittable trait and HitRecord for ray-object intersection.

use lumen_core::ShadingBinding;
use lumen_math::{Aabb, Interval, Ray, Vec2, Vec3};

use crate::primitive::Primitive;

/// Record of a ray-object intersection.
#[derive(Debug, Clone, Default)]
pub struct HitRecord<'a> {
    /// Point of intersection
    pub p: Vec3,
    /// Outward geometric normal (unit length)
    pub normal: Vec3,
    /// Interpolated normal for meshes, otherwise the geometric normal
    pub shading_normal: Vec3,
    /// Whether the ray arrived from the outward side
    pub front_face: bool,
    /// UV texture coordinates
    pub u: f32,
    pub v: f32,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Weights of the second and third triangle vertex; zero for other shapes
    pub barycentric: Vec2,
    /// Material slot of the hit sub-primitive
    pub material: u32,
    /// Primitive that was hit
    pub primitive: Option<&'a Primitive>,
}

impl<'a> HitRecord<'a> {
    /// Store the outward normal and record which side the ray came from.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        self.front_face = ray.direction.dot(outward_normal) < 0.0;
        self.normal = outward_normal;
        self.shading_normal = outward_normal;
    }

    /// Normal pointing against the incoming ray.
    pub fn facing_normal(&self) -> Vec3 {
        if self.front_face {
            self.shading_normal
        } else {
            -self.shading_normal
        }
    }

    /// Shading binding for the hit sub-primitive.
    pub fn binding(&self) -> Option<&'a ShadingBinding> {
        self.primitive?.bindings().get(self.material as usize)
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Test if a ray hits this object within the given interval.
    ///
    /// Returns true if hit, and fills in the hit record.
    fn hit<'a>(&'a self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'a>) -> bool;

    /// Axis-aligned bounds, or `None` for unbounded objects such as planes.
    fn bounding_box(&self) -> Option<Aabb>;
}
