//! Sphere and moving sphere.

use std::f32::consts::PI;

use lumen_core::brdf::Onb;
use lumen_math::{Aabb, Interval, Ray, Vec3};
use rand::{Rng, RngCore};

use crate::error::{BuildError, BuildResult};
use crate::hittable::HitRecord;
use crate::shape::{conservative_bounds, Shape, ShapeKind};

/// A static sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> BuildResult<Self> {
        validate_radius("sphere", radius)?;
        if !center.is_finite() {
            return Err(BuildError::NonFinite { shape: "sphere" });
        }
        Ok(Self { center, radius })
    }

    /// UV coordinates for a point on the unit sphere.
    ///
    /// theta is measured down from +Y, phi around Y from -X.
    pub fn get_sphere_uv(p: Vec3) -> (f32, f32) {
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        (phi / (2.0 * PI), theta / PI)
    }
}

pub(crate) fn validate_radius(shape: &'static str, radius: f32) -> BuildResult<()> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(BuildError::InvalidRadius { shape, radius });
    }
    Ok(())
}

/// Nearest root of the ray-sphere quadratic inside `ray_t`.
pub(crate) fn hit_sphere(center: Vec3, radius: f32, ray: &Ray, ray_t: Interval) -> Option<f32> {
    let oc = center - ray.origin;
    let a = ray.direction.length_squared();
    let h = ray.direction.dot(oc);
    let c = oc.length_squared() - radius * radius;

    let discriminant = h * h - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrtd = discriminant.sqrt();
    let root = (h - sqrtd) / a;
    if ray_t.surrounds(root) {
        return Some(root);
    }
    let root = (h + sqrtd) / a;
    ray_t.surrounds(root).then_some(root)
}

/// Fill `rec` for a sphere hit at `t`.
pub(crate) fn record_sphere_hit(center: Vec3, radius: f32, ray: &Ray, t: f32, rec: &mut HitRecord<'_>) {
    rec.t = t;
    // Reproject onto the surface to drop the error accumulated along the ray
    let outward_normal = (ray.at(t) - center).normalize();
    rec.p = center + radius * outward_normal;
    rec.set_face_normal(ray, outward_normal);
    (rec.u, rec.v) = Sphere::get_sphere_uv(outward_normal);
    rec.barycentric = Default::default();
    rec.material = 0;
}

impl Shape for Sphere {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Sphere
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

    fn pdf_value(&self, origin: Vec3, direction: Vec3) -> f32 {
        if hit_sphere(self.center, self.radius, &Ray::new_simple(origin, direction), Interval::RAY).is_none() {
            return 0.0;
        }
        let dist_squared = (self.center - origin).length_squared();
        let cos_theta_max = (1.0 - self.radius * self.radius / dist_squared).max(0.0).sqrt();
        let solid_angle = 2.0 * PI * (1.0 - cos_theta_max);
        1.0 / solid_angle
    }

    fn random_direction(&self, origin: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        let direction = self.center - origin;
        let uvw = Onb::from_w(direction);
        uvw.local(random_to_sphere(self.radius, direction.length_squared(), rng))
    }
}

/// Direction inside the cone subtended by a sphere, about +Z.
fn random_to_sphere(radius: f32, distance_squared: f32, rng: &mut dyn RngCore) -> Vec3 {
    let r1: f32 = rng.gen();
    let r2: f32 = rng.gen();
    let cos_theta_max = (1.0 - radius * radius / distance_squared).max(0.0).sqrt();
    let z = 1.0 + r2 * (cos_theta_max - 1.0);

    let phi = 2.0 * PI * r1;
    let sin_theta = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, z)
}

/// Sphere whose center moves linearly between two times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingSphere {
    pub center0: Vec3,
    pub center1: Vec3,
    pub time0: f32,
    pub time1: f32,
    pub radius: f32,
}

impl MovingSphere {
    pub fn new(center0: Vec3, center1: Vec3, time0: f32, time1: f32, radius: f32) -> BuildResult<Self> {
        validate_radius("moving sphere", radius)?;
        if !center0.is_finite() || !center1.is_finite() {
            return Err(BuildError::NonFinite { shape: "moving sphere" });
        }
        if !(time1 > time0) {
            return Err(BuildError::InvalidTimeRange { time0, time1 });
        }
        Ok(Self {
            center0,
            center1,
            time0,
            time1,
            radius,
        })
    }

    /// Center at `time`, held at the end positions outside the shutter interval.
    pub fn center(&self, time: f32) -> Vec3 {
        let time = time.clamp(self.time0, self.time1);
        self.center0 + ((time - self.time0) / (self.time1 - self.time0)) * (self.center1 - self.center0)
    }
}

impl Shape for MovingSphere {
    fn kind(&self) -> ShapeKind {
        ShapeKind::MovingSphere
    }

    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'_>) -> bool {
        let center = self.center(ray.time);
        match hit_sphere(center, self.radius, ray, ray_t) {
            Some(t) => {
                record_sphere_hit(center, self.radius, ray, t, rec);
                true
            }
            None => false,
        }
    }

    /// Union of the boxes at both ends of the shutter interval.
    fn bounding_box(&self) -> Option<Aabb> {
        let rvec = Vec3::splat(self.radius);
        let box0 = Aabb::from_points(self.center0 - rvec, self.center0 + rvec);
        let box1 = Aabb::from_points(self.center1 - rvec, self.center1 + rvec);
        Some(conservative_bounds(Aabb::surrounding(&box0, &box1)))
    }
}
