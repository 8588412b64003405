//! Kestrel math - thin layer over glam used by the renderer crates.
//!
//! Provides bounding volumes, parametric intervals and orthonormal
//! shading frames. Everything vector-related comes straight from glam.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod frame;
mod interval;
mod transform;

pub use aabb::Aabb;
pub use frame::{coordinate_system, Frame};
pub use interval::Interval;
pub use transform::Mat4Ext;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glam_reexport() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(Vec2::new(0.5, 0.25).x, 0.5);
    }
}
