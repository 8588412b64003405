//! Scale/rotate/translate placement for instances.

use kestrel_math::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Transform components that can be composed into a matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Uniform scale followed by a translation.
    pub fn from_scale_translation(scale: f32, translation: Vec3) -> Self {
        Self {
            translation,
            scale: Vec3::splat(scale),
            ..Default::default()
        }
    }

    /// Convert to a 4x4 matrix. Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}
