//! Dirac-delta lobes. They cannot be evaluated, only sampled.

use kestrel_math::{Vec2, Vec3};

use super::fresnel::fr_dielectric;
use super::{BxDFSample, BxDFType};
use crate::geometry::{abs_cos_theta, cos_theta, face_forward, refract};
use crate::spectrum::Spectrum;

/// Perfect mirror.
#[derive(Clone, Debug)]
pub struct Mirror {
    pub r: Spectrum,
}

impl Mirror {
    pub fn new(r: Spectrum) -> Self {
        Self { r }
    }

    pub fn flags(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::SPECULAR
    }

    /// Reflects `wo` about +Z. The 2D sample is ignored.
    pub fn sample_f(&self, wo: Vec3, _u: Vec2) -> Option<BxDFSample> {
        let wi = Vec3::new(-wo.x, -wo.y, wo.z);
        let cos = abs_cos_theta(wi);
        if cos == 0.0 {
            return None;
        }
        Some(BxDFSample::new(self.r / cos, wi, 1.0, self.flags()))
    }
}

/// Smooth dielectric boundary choosing between reflection and refraction
/// with probability given by the Fresnel term.
#[derive(Clone, Debug)]
pub struct SpecularDielectric {
    pub r: Spectrum,
    pub t: Spectrum,
    /// Index above the surface
    pub eta_a: f32,
    /// Index below the surface
    pub eta_b: f32,
}

impl SpecularDielectric {
    pub fn new(r: Spectrum, t: Spectrum, eta_a: f32, eta_b: f32) -> Self {
        Self { r, t, eta_a, eta_b }
    }

    pub fn flags(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::TRANSMISSION | BxDFType::SPECULAR
    }

    pub fn sample_f(&self, wo: Vec3, u: Vec2) -> Option<BxDFSample> {
        let f = fr_dielectric(cos_theta(wo), self.eta_a, self.eta_b);

        if u.x < f {
            let wi = Vec3::new(-wo.x, -wo.y, wo.z);
            let cos = abs_cos_theta(wi);
            if cos == 0.0 {
                return None;
            }
            return Some(BxDFSample::new(
                self.r * (f / cos),
                wi,
                f,
                BxDFType::REFLECTION | BxDFType::SPECULAR,
            ));
        }

        let entering = cos_theta(wo) > 0.0;
        let (eta_i, eta_t) = if entering {
            (self.eta_a, self.eta_b)
        } else {
            (self.eta_b, self.eta_a)
        };
        let wi = refract(wo, face_forward(Vec3::Z, wo), eta_i / eta_t)?;
        let cos = abs_cos_theta(wi);
        if cos == 0.0 {
            return None;
        }

        // radiance is compressed by the squared index ratio
        let ft = self.t * (1.0 - f) * ((eta_i * eta_i) / (eta_t * eta_t));
        Some(BxDFSample::new(
            ft / cos,
            wi,
            1.0 - f,
            BxDFType::TRANSMISSION | BxDFType::SPECULAR,
        ))
    }
}
