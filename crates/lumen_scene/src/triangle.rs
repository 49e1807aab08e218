//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use lumen_math::{Aabb, Interval, Ray, Vec2, Vec3};

use crate::error::{BuildError, BuildResult};
use crate::hittable::HitRecord;
use crate::shape::{Shape, ShapeKind};

/// Möller-Trumbore test against the triangle `a, a + e1, a + e2`.
///
/// Returns `(t, beta, gamma)`, the weights of the second and third vertex.
pub fn intersect_triangle(ray: &Ray, a: Vec3, e1: Vec3, e2: Vec3, ray_t: Interval) -> Option<(f32, f32, f32)> {
    let h = ray.direction.cross(e2);
    let det = e1.dot(h);

    // Ray is parallel to triangle
    if det.abs() < 1e-8 {
        return None;
    }

    let f = 1.0 / det;
    let s = ray.origin - a;
    let beta = f * s.dot(h);
    if !(0.0..=1.0).contains(&beta) {
        return None;
    }

    let q = s.cross(e1);
    let gamma = f * ray.direction.dot(q);
    if gamma < 0.0 || beta + gamma > 1.0 {
        return None;
    }

    let t = f * e2.dot(q);
    ray_t.surrounds(t).then_some((t, beta, gamma))
}

/// A single triangle with per-vertex UVs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Vec3; 3],
    pub texcoords: [Vec2; 3],
    /// Geometric normal, (b - a) x (c - a) normalized
    normal: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> BuildResult<Self> {
        Self::with_texcoords([a, b, c], [Vec2::ZERO, Vec2::X, Vec2::Y])
    }

    pub fn with_texcoords(vertices: [Vec3; 3], texcoords: [Vec2; 3]) -> BuildResult<Self> {
        if !vertices.iter().all(|v| v.is_finite()) {
            return Err(BuildError::NonFinite { shape: "triangle" });
        }
        let [a, b, c] = vertices;
        let normal = (b - a).cross(c - a);
        if normal.length_squared() == 0.0 {
            return Err(BuildError::DegenerateExtent { shape: "triangle" });
        }
        Ok(Self {
            vertices,
            texcoords,
            normal: normal.normalize(),
        })
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

impl Shape for Triangle {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Triangle
    }

    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'_>) -> bool {
        let [a, b, c] = self.vertices;
        let Some((t, beta, gamma)) = intersect_triangle(ray, a, b - a, c - a, ray_t) else {
            return false;
        };

        rec.t = t;
        rec.p = ray.at(t);
        rec.set_face_normal(ray, self.normal);
        rec.barycentric = Vec2::new(beta, gamma);
        let [ta, tb, tc] = self.texcoords;
        let uv = (1.0 - beta - gamma) * ta + beta * tb + gamma * tc;
        (rec.u, rec.v) = (uv.x, uv.y);
        rec.material = 0;
        true
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(Aabb::enclosing(self.vertices))
    }

    fn centroid(&self) -> Vec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
    }
}
