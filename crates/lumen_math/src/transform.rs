// Transform utilities for Mat4
//
// glam already provides transform_point3/transform_vector3 and inverse();
// these are the extra operations instancing and light sampling need.

use glam::{Mat3, Mat4, Vec3};

use crate::Aabb;

/// Extension trait for Mat4 with bounding-box and normal transforms.
pub trait Mat4Ext {
    /// Box around all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Transforms a surface normal with the inverse transpose and renormalizes.
    fn transform_normal(&self, normal: Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if !aabb.is_finite() {
            return *aabb;
        }
        Aabb::enclosing(aabb.corners().map(|corner| self.transform_point3(corner)))
    }

    fn transform_normal(&self, normal: Vec3) -> Vec3 {
        let normal_matrix = Mat3::from_mat4(*self).inverse().transpose();
        (normal_matrix * normal).normalize_or_zero()
    }
}
