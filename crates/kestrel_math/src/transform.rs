// Transform utilities for Mat4
//
// glam::Mat4 already provides transform_point3(), transform_vector3() and
// inverse(); this adds what instancing needs on top.

use crate::Aabb;
use glam::{Mat3, Mat4, Vec3};

/// Extension trait for Mat4 used when moving geometry between object and
/// world space.
pub trait Mat4Ext {
    /// Transform a surface normal by the inverse transpose of the upper 3x3.
    ///
    /// The result is not normalized.
    fn transform_normal(&self, normal: Vec3) -> Vec3;

    /// Bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transform_normal(&self, normal: Vec3) -> Vec3 {
        let linear = Mat3::from_mat4(*self);
        linear.inverse().transpose() * normal
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }
        Aabb::from_point_set(aabb.corners().iter().map(|&c| self.transform_point3(c)))
    }
}
