//! Orthonormal frames for shading-space conversions.

use crate::Vec3;

/// Build two unit tangents completing `n` to a right-handed basis.
///
/// Branchless construction (Duff et al. 2017). `n` must be normalized.
pub fn coordinate_system(n: Vec3) -> (Vec3, Vec3) {
    let sign = 1.0f32.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

    (tangent, bitangent)
}

/// Orthonormal basis `(s, t, n)` with `n` as the local +Z axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub s: Vec3,
    pub t: Vec3,
    pub n: Vec3,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            s: Vec3::X,
            t: Vec3::Y,
            n: Vec3::Z,
        }
    }
}

impl Frame {
    /// Frame around a unit normal with arbitrary tangent orientation.
    pub fn from_normal(n: Vec3) -> Self {
        let (s, t) = coordinate_system(n);
        Self { s, t, n }
    }

    /// World direction to local coordinates.
    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.s), v.dot(self.t), v.dot(self.n))
    }

    /// Local coordinates back to a world direction.
    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.s * v.x + self.t * v.y + self.n * v.z
    }
}
