//! Axis-aligned rectangles.

use lumen_math::{Aabb, Axis, Interval, Ray, Vec3};
use rand::{Rng, RngCore};

use crate::error::{BuildError, BuildResult};
use crate::hittable::HitRecord;
use crate::shape::{Shape, ShapeKind};

/// Rectangle perpendicular to `axis` at coordinate `k`.
///
/// `a` and `b` are the in-plane coordinates given by `Axis::plane_axes`.
/// The outward normal is `+axis`, or `-axis` when `flip` is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub axis: Axis,
    pub a0: f32,
    pub a1: f32,
    pub b0: f32,
    pub b1: f32,
    pub k: f32,
    pub flip: bool,
}

impl Rect {
    pub fn new(axis: Axis, a0: f32, a1: f32, b0: f32, b1: f32, k: f32) -> BuildResult<Self> {
        if ![a0, a1, b0, b1, k].iter().all(|v| v.is_finite()) {
            return Err(BuildError::NonFinite { shape: "rectangle" });
        }
        if !(a1 > a0 && b1 > b0) {
            return Err(BuildError::DegenerateExtent { shape: "rectangle" });
        }
        Ok(Self {
            axis,
            a0,
            a1,
            b0,
            b1,
            k,
            flip: false,
        })
    }

    /// Rectangle perpendicular to X spanning (y, z).
    pub fn x(y0: f32, y1: f32, z0: f32, z1: f32, x: f32) -> BuildResult<Self> {
        Self::new(Axis::X, y0, y1, z0, z1, x)
    }

    /// Rectangle perpendicular to Y spanning (x, z).
    pub fn y(x0: f32, x1: f32, z0: f32, z1: f32, y: f32) -> BuildResult<Self> {
        Self::new(Axis::Y, x0, x1, z0, z1, y)
    }

    /// Rectangle perpendicular to Z spanning (x, y).
    pub fn z(x0: f32, x1: f32, y0: f32, y1: f32, z: f32) -> BuildResult<Self> {
        Self::new(Axis::Z, x0, x1, y0, y1, z)
    }

    pub fn flipped(mut self) -> Self {
        self.flip = !self.flip;
        self
    }

    pub fn area(&self) -> f32 {
        (self.a1 - self.a0) * (self.b1 - self.b0)
    }

    pub fn outward_normal(&self) -> Vec3 {
        if self.flip {
            -self.axis.unit()
        } else {
            self.axis.unit()
        }
    }

    /// Hit distance and in-plane coordinates, if the ray crosses the rectangle.
    fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<(f32, f32, f32)> {
        let (a_axis, b_axis) = self.axis.plane_axes();
        let k_index = self.axis.index();

        let t = (self.k - ray.origin[k_index]) / ray.direction[k_index];
        if !ray_t.surrounds(t) {
            return None;
        }

        let a = ray.origin[a_axis.index()] + t * ray.direction[a_axis.index()];
        let b = ray.origin[b_axis.index()] + t * ray.direction[b_axis.index()];
        if a < self.a0 || a > self.a1 || b < self.b0 || b > self.b1 {
            return None;
        }
        Some((t, a, b))
    }
}

impl Shape for Rect {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Rect(self.axis)
    }

    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'_>) -> bool {
        let Some((t, a, b)) = self.intersect(ray, ray_t) else {
            return false;
        };

        rec.u = (a - self.a0) / (self.a1 - self.a0);
        rec.v = (b - self.b0) / (self.b1 - self.b0);
        rec.t = t;
        rec.p = self.axis.compose(self.k, a, b);
        rec.set_face_normal(ray, self.outward_normal());
        rec.barycentric = Default::default();
        rec.material = 0;
        true
    }

    /// Padded along the normal axis so the slab test still works.
    fn bounding_box(&self) -> Option<Aabb> {
        Some(Aabb::from_points(
            self.axis.compose(self.k, self.a0, self.b0),
            self.axis.compose(self.k, self.a1, self.b1),
        ))
    }

    fn centroid(&self) -> Vec3 {
        self.axis
            .compose(self.k, 0.5 * (self.a0 + self.a1), 0.5 * (self.b0 + self.b1))
    }

    fn pdf_value(&self, origin: Vec3, direction: Vec3) -> f32 {
        let ray = Ray::new_simple(origin, direction);
        let Some((t, _, _)) = self.intersect(&ray, Interval::RAY) else {
            return 0.0;
        };

        let distance_squared = t * t * direction.length_squared();
        let cosine = (direction.dot(self.axis.unit()) / direction.length()).abs();
        if cosine <= f32::EPSILON {
            return 0.0;
        }
        distance_squared / (cosine * self.area())
    }

    fn random_direction(&self, origin: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        let a = rng.gen_range(self.a0..self.a1);
        let b = rng.gen_range(self.b0..self.b1);
        self.axis.compose(self.k, a, b) - origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rect_hits_stay_inside_bounds() {
        let mut rng = StdRng::seed_from_u64(41);
        let axes = [Axis::X, Axis::Y, Axis::Z];

        for _ in 0..30 {
            let a0 = rng.gen_range(-600.0..600.0);
            let b0 = rng.gen_range(-600.0..600.0);
            let rect = Rect::new(
                axes[rng.gen_range(0..3)],
                a0,
                a0 + rng.gen_range(0.01..300.0),
                b0,
                b0 + rng.gen_range(0.01..300.0),
                rng.gen_range(-600.0..600.0),
            )
            .unwrap();
            let bbox = rect.bounding_box().unwrap();
            let mut hits = 0;

            for _ in 0..200 {
                let origin = Vec3::new(
                    rng.gen_range(-1000.0..1000.0),
                    rng.gen_range(-1000.0..1000.0),
                    rng.gen_range(-1000.0..1000.0),
                );
                let target = rect.axis.compose(
                    rect.k,
                    rng.gen_range(rect.a0..=rect.a1),
                    rng.gen_range(rect.b0..=rect.b1),
                );
                let mut rec = HitRecord::default();
                if rect.hit(&Ray::new_simple(origin, target - origin), Interval::RAY, &mut rec) {
                    hits += 1;
                    assert!(bbox.contains_point(rec.p), "{:?} outside {:?}", rec.p, bbox);
                    assert_eq!(rec.p[rect.axis.index()], rect.k);
                }
            }
            assert!(hits > 0);
        }
    }

    #[test]
    fn test_rect_hit_and_uv() {
        let rect = Rect::z(0.0, 2.0, 0.0, 4.0, -1.0).unwrap();
        let ray = Ray::new_simple(Vec3::new(0.5, 3.0, 0.0), -Vec3::Z);
        let mut rec = HitRecord::default();

        assert!(rect.hit(&ray, Interval::RAY, &mut rec));
        assert!((rec.t - 1.0).abs() < 1e-5);
        assert!((rec.u - 0.25).abs() < 1e-5);
        assert!((rec.v - 0.75).abs() < 1e-5);
        // Normal is +Z, ray travels -Z
        assert!(rec.front_face);
    }

    #[test]
    fn test_flipped_rect_normal() {
        let rect = Rect::y(0.0, 1.0, 0.0, 1.0, 5.0).unwrap().flipped();
        assert_eq!(rect.outward_normal(), -Vec3::Y);

        let ray = Ray::new_simple(Vec3::new(0.5, 0.0, 0.5), Vec3::Y);
        let mut rec = HitRecord::default();
        assert!(rect.hit(&ray, Interval::RAY, &mut rec));
        assert!(rec.front_face);
    }

    #[test]
    fn test_rect_miss_outside_extent() {
        let rect = Rect::x(0.0, 1.0, 0.0, 1.0, 3.0).unwrap();
        let ray = Ray::new_simple(Vec3::new(0.0, 2.0, 0.5), Vec3::X);
        let mut rec = HitRecord::default();
        assert!(!rect.hit(&ray, Interval::RAY, &mut rec));
    }

    #[test]
    fn test_degenerate_rect_rejected() {
        assert!(matches!(
            Rect::z(1.0, 1.0, 0.0, 1.0, 0.0),
            Err(BuildError::DegenerateExtent { .. })
        ));
        assert!(matches!(
            Rect::z(0.0, 1.0, 0.0, f32::INFINITY, 0.0),
            Err(BuildError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_bounds_are_padded_along_normal() {
        let rect = Rect::y(213.0, 343.0, 227.0, 332.0, 554.0).unwrap();
        let bbox = rect.bounding_box().unwrap();
        assert!(bbox.y.size() > 0.0);
        assert!(bbox.contains_point(Vec3::new(300.0, 554.0, 300.0)));
    }

    #[test]
    fn test_light_sampling_matches_area() {
        let rect = Rect::y(-1.0, 1.0, -1.0, 1.0, 2.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..50 {
            let dir = rect.random_direction(Vec3::ZERO, &mut rng);
            assert!(rect.pdf_value(Vec3::ZERO, dir) > 0.0);
        }

        // Straight up: distance 2, cosine 1, area 4
        let pdf = rect.pdf_value(Vec3::ZERO, Vec3::Y);
        assert!((pdf - 1.0).abs() < 1e-4);
        assert_eq!(rect.pdf_value(Vec3::ZERO, -Vec3::Y), 0.0);
    }
}
