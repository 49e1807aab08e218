//! Infinite axis-aligned plane.

use lumen_math::{Aabb, Axis, Interval, Ray, Vec3};

use crate::error::{BuildError, BuildResult};
use crate::hittable::HitRecord;
use crate::shape::{Shape, ShapeKind};

/// Plane perpendicular to `axis` at `offset`. Outward normal is `+axis`
/// unless `invert` is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub axis: Axis,
    pub offset: f32,
    pub invert: bool,
}

impl Plane {
    pub fn new(axis: Axis, offset: f32, invert: bool) -> BuildResult<Self> {
        if !offset.is_finite() {
            return Err(BuildError::NonFinite { shape: "plane" });
        }
        Ok(Self { axis, offset, invert })
    }
}

impl Shape for Plane {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Plane
    }

    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'_>) -> bool {
        let k = self.axis.index();
        let t = (self.offset - ray.origin[k]) / ray.direction[k];
        if !ray_t.surrounds(t) {
            return false;
        }

        rec.t = t;
        rec.p = ray.at(t);
        let normal = if self.invert { -self.axis.unit() } else { self.axis.unit() };
        rec.set_face_normal(ray, normal);

        // Tiles the unit square across the plane
        let (a, b) = self.axis.plane_axes();
        rec.u = rec.p[a.index()].rem_euclid(1.0);
        rec.v = rec.p[b.index()].rem_euclid(1.0);
        rec.barycentric = Default::default();
        rec.material = 0;
        true
    }

    fn bounding_box(&self) -> Option<Aabb> {
        None
    }

    fn centroid(&self) -> Vec3 {
        self.axis.unit() * self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_hit_far_away() {
        let plane = Plane::new(Axis::Y, -1.0, false).unwrap();
        let ray = Ray::new_simple(Vec3::new(1.0e5, 0.0, -3.0e5), -Vec3::Y);
        let mut rec = HitRecord::default();

        assert!(plane.hit(&ray, Interval::RAY, &mut rec));
        assert!((rec.t - 1.0).abs() < 1e-5);
        assert!(rec.front_face);
        assert_eq!(plane.bounding_box(), None);
    }

    #[test]
    fn test_inverted_plane() {
        let plane = Plane::new(Axis::X, 2.0, true).unwrap();
        let ray = Ray::new_simple(Vec3::ZERO, Vec3::X);
        let mut rec = HitRecord::default();

        assert!(plane.hit(&ray, Interval::RAY, &mut rec));
        assert_eq!(rec.normal, -Vec3::X);
        assert!(rec.front_face);
    }

    #[test]
    fn test_parallel_ray_misses() {
        let plane = Plane::new(Axis::Z, 0.0, false).unwrap();
        let ray = Ray::new_simple(Vec3::new(0.0, 0.0, 1.0), Vec3::X);
        let mut rec = HitRecord::default();
        assert!(!plane.hit(&ray, Interval::RAY, &mut rec));
    }

    #[test]
    fn test_uv_in_unit_square() {
        let plane = Plane::new(Axis::Y, 0.0, false).unwrap();
        let ray = Ray::new_simple(Vec3::new(-2.25, 1.0, 3.5), -Vec3::Y);
        let mut rec = HitRecord::default();

        assert!(plane.hit(&ray, Interval::RAY, &mut rec));
        assert!((rec.u - 0.75).abs() < 1e-5);
        assert!((rec.v - 0.5).abs() < 1e-5);
    }
}
