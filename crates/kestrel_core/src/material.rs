//! Principled material hints.
//!
//! A `MaterialDesc` carries constant parameters only; the renderer turns it
//! into a scattering model. Field names follow the Disney principled model.

use kestrel_math::Vec3;
use serde::{Deserialize, Serialize};

/// Constant-valued principled material parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDesc {
    /// Material name (from the MTL `newmtl` statement)
    pub name: String,

    /// Base/diffuse color (linear RGB, 0-1)
    pub diffuse_color: Vec3,

    /// Metallic factor (0=dielectric, 1=metal)
    pub metallic: f32,

    /// Roughness factor (0=smooth, 1=rough)
    pub roughness: f32,

    /// Specular amount for dielectrics
    pub specular: f32,

    pub specular_tint: f32,
    pub sheen: f32,
    pub sheen_tint: f32,
    pub clearcoat: f32,
    pub clearcoat_gloss: f32,
    pub subsurface: f32,
    pub anisotropic: f32,

    /// Index of refraction (MTL `Ni`)
    pub ior: f32,

    /// Fraction of light transmitted (1 - MTL `d`)
    pub transmission: f32,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: Vec3::new(0.5, 0.5, 0.5),
            metallic: 0.0,
            roughness: 0.5,
            specular: 0.5,
            specular_tint: 0.0,
            sheen: 0.0,
            sheen_tint: 0.5,
            clearcoat: 0.0,
            clearcoat_gloss: 1.0,
            subsurface: 0.0,
            anisotropic: 0.0,
            ior: 1.5,
            transmission: 0.0,
        }
    }
}

impl MaterialDesc {
    /// Create a new material with just a name and diffuse color.
    pub fn new(name: impl Into<String>, diffuse_color: Vec3) -> Self {
        Self {
            name: name.into(),
            diffuse_color,
            ..Default::default()
        }
    }

    /// Map a Blinn-Phong specular exponent (MTL `Ns`) to roughness.
    pub fn roughness_from_shininess(shininess: f32) -> f32 {
        (2.0 / (shininess.max(0.0) + 2.0)).sqrt().clamp(0.0, 1.0)
    }

    /// Check if this material lets light through.
    pub fn is_transmissive(&self) -> bool {
        self.transmission > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roughness_from_shininess() {
        assert!((MaterialDesc::roughness_from_shininess(0.0) - 1.0).abs() < 1e-6);
        let glossy = MaterialDesc::roughness_from_shininess(1000.0);
        assert!(glossy > 0.0 && glossy < 0.1, "roughness = {}", glossy);
    }

    #[test]
    fn test_material_desc_json_defaults() {
        let desc: MaterialDesc =
            serde_json::from_str(r#"{ "name": "gold", "metallic": 1.0 }"#).unwrap();

        assert_eq!(desc.name, "gold");
        assert_eq!(desc.metallic, 1.0);
        assert_eq!(desc.roughness, MaterialDesc::default().roughness);
        assert!(!desc.is_transmissive());
    }
}
