//! Triangle mesh shape over sealed structure-of-arrays buffers.

use lumen_core::MeshDeviceBuffers;
use lumen_math::{Aabb, Interval, Ray, Vec2, Vec3};

use crate::bvh::Bvh;
use crate::hittable::HitRecord;
use crate::shape::{Shape, ShapeKind};
use crate::triangle::intersect_triangle;

/// Mesh as one primitive; each triangle is a sub-primitive.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    buffers: MeshDeviceBuffers,
    bvh: Bvh,
    bbox: Aabb,
    material_slots: usize,
}

impl TriangleMesh {
    pub fn new(buffers: MeshDeviceBuffers) -> Self {
        let boxes: Vec<Aabb> = (0..buffers.triangle_count())
            .map(|i| Aabb::enclosing(buffers.vertices[3 * i..3 * i + 3].iter().copied()))
            .collect();
        let bvh = Bvh::build(&boxes);
        let bbox = bvh.bounding_box().unwrap_or(Aabb::EMPTY);
        let material_slots = buffers
            .material_ids
            .iter()
            .max()
            .map_or(0, |&max| max as usize + 1);

        Self {
            buffers,
            bvh,
            bbox,
            material_slots,
        }
    }

    pub fn buffers(&self) -> &MeshDeviceBuffers {
        &self.buffers
    }

    pub fn triangle_count(&self) -> usize {
        self.buffers.triangle_count()
    }
}

impl Shape for TriangleMesh {
    fn kind(&self) -> ShapeKind {
        ShapeKind::TriangleMesh
    }

    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord<'_>) -> bool {
        let buffers = &self.buffers;
        let mut closest: Option<(usize, f32, f32, f32)> = None;

        self.bvh.nearest(ray, ray_t, |i, interval| {
            let (t, beta, gamma) = intersect_triangle(
                ray,
                buffers.vertices[3 * i],
                buffers.edges[2 * i],
                buffers.edges[2 * i + 1],
                interval,
            )?;
            closest = Some((i, t, beta, gamma));
            Some(t)
        });

        let Some((i, t, beta, gamma)) = closest else {
            return false;
        };
        let alpha = 1.0 - beta - gamma;
        let weights = Vec3::new(alpha, beta, gamma);

        rec.t = t;
        rec.p = ray.at(t);
        let geometric = buffers.edges[2 * i].cross(buffers.edges[2 * i + 1]).normalize();
        rec.set_face_normal(ray, geometric);

        let n = &buffers.normals[3 * i..3 * i + 3];
        let interpolated = weights.x * n[0] + weights.y * n[1] + weights.z * n[2];
        if interpolated.length_squared() > 0.0 {
            rec.shading_normal = interpolated.normalize();
        }

        let uv: &[Vec2] = &buffers.texcoords[3 * i..3 * i + 3];
        let uv = weights.x * uv[0] + weights.y * uv[1] + weights.z * uv[2];
        (rec.u, rec.v) = (uv.x, uv.y);
        rec.barycentric = Vec2::new(beta, gamma);
        rec.material = buffers.material_ids[i];
        true
    }

    fn bounding_box(&self) -> Option<Aabb> {
        (!self.bvh.is_empty()).then_some(self.bbox)
    }

    fn sub_primitive_count(&self) -> usize {
        self.triangle_count()
    }

    fn material_slots(&self) -> usize {
        self.material_slots
    }
}
