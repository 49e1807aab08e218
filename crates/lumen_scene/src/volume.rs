//! Participating-media boundaries.
//!
//! The host side only finds where a ray enters the medium. Free-path
//! sampling inside it is done by the volumetric program from `density`.

use lumen_math::{Aabb, Interval, Ray, Vec3};

use crate::error::{BuildError, BuildResult};
use crate::hittable::HitRecord;
use crate::shape::{conservative_bounds, Shape, ShapeKind};
use crate::sphere::{hit_sphere, record_sphere_hit, validate_radius};

fn validate_density(shape: &'static str, density: f32) -> BuildResult<()> {
    if !density.is_finite() || density < 0.0 {
        return Err(BuildError::InvalidDensity { shape, density });
    }
    Ok(())
}

/// Spherical medium of constant density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSphere {
    pub center: Vec3,
    pub radius: f32,
    pub density: f32,
}

impl VolumeSphere {
    pub fn new(center: Vec3, radius: f32, density: f32) -> BuildResult<Self> {
        validate_radius("volume sphere", radius)?;
        validate_density("volume sphere", density)?;
        if !center.is_finite() {
            return Err(BuildError::NonFinite { shape: "volume sphere" });
        }
        Ok(Self { center, radius, density })
    }
}

impl Shape for VolumeSphere {
    fn kind(&self) -> ShapeKind {
        ShapeKind::VolumeSphere
    }

    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'_>) -> bool {
        match hit_sphere(self.center, self.radius, ray, ray_t) {
            Some(t) => {
                record_sphere_hit(self.center, self.radius, ray, t, rec);
                true
            }
            None => false,
        }
    }

    fn bounding_box(&self) -> Option<Aabb> {
        let rvec = Vec3::splat(self.radius);
        Some(conservative_bounds(Aabb::from_points(self.center - rvec, self.center + rvec)))
    }

    fn centroid(&self) -> Vec3 {
        self.center
    }

    fn density(&self) -> Option<f32> {
        Some(self.density)
    }
}

/// Box-shaped medium of constant density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeBox {
    pub min: Vec3,
    pub max: Vec3,
    pub density: f32,
}

impl VolumeBox {
    pub fn new(p0: Vec3, p1: Vec3, density: f32) -> BuildResult<Self> {
        validate_density("volume box", density)?;
        if !p0.is_finite() || !p1.is_finite() {
            return Err(BuildError::NonFinite { shape: "volume box" });
        }
        if !p1.cmpgt(p0).all() {
            return Err(BuildError::DegenerateExtent { shape: "volume box" });
        }
        Ok(Self {
            min: p0,
            max: p1,
            density,
        })
    }

    /// Entry and exit distances of the slab test, unclipped.
    fn slabs(&self, ray: &Ray) -> (f32, usize, f32, usize) {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        let (mut near_axis, mut far_axis) = (0, 0);

        for axis in 0..3 {
            let inv_d = 1.0 / ray.direction[axis];
            let mut t0 = (self.min[axis] - ray.origin[axis]) * inv_d;
            let mut t1 = (self.max[axis] - ray.origin[axis]) * inv_d;
            if inv_d < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_near {
                t_near = t0;
                near_axis = axis;
            }
            if t1 < t_far {
                t_far = t1;
                far_axis = axis;
            }
        }
        (t_near, near_axis, t_far, far_axis)
    }
}

impl Shape for VolumeBox {
    fn kind(&self) -> ShapeKind {
        ShapeKind::VolumeBox
    }

    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'_>) -> bool {
        let (t_near, near_axis, t_far, far_axis) = self.slabs(ray);
        if t_near > t_far {
            return false;
        }

        // Entry point, or exit point when the ray starts inside
        let (t, axis) = if ray_t.surrounds(t_near) {
            (t_near, near_axis)
        } else if ray_t.surrounds(t_far) {
            (t_far, far_axis)
        } else {
            return false;
        };

        rec.t = t;
        let p = ray.at(t);

        let mut outward = Vec3::ZERO;
        let mut on_face = p.clamp(self.min, self.max);
        if p[axis] - self.min[axis] < self.max[axis] - p[axis] {
            outward[axis] = -1.0;
            on_face[axis] = self.min[axis];
        } else {
            outward[axis] = 1.0;
            on_face[axis] = self.max[axis];
        }
        rec.p = on_face;
        rec.set_face_normal(ray, outward);

        let (a, b) = ((axis + 1) % 3, (axis + 2) % 3);
        rec.u = (rec.p[a] - self.min[a]) / (self.max[a] - self.min[a]);
        rec.v = (rec.p[b] - self.min[b]) / (self.max[b] - self.min[b]);
        rec.barycentric = Default::default();
        rec.material = 0;
        true
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(conservative_bounds(Aabb::from_points(self.min, self.max)))
    }

    fn density(&self) -> Option<f32> {
        Some(self.density)
    }
}
