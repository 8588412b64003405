use kestrel_math::{Vec2, Vec3};

use super::{BxDFSample, BxDFType};
use crate::geometry::{abs_cos_theta, same_hemisphere};
use crate::sampling::{cosine_sample_hemisphere, INV_PI};
use crate::spectrum::Spectrum;

/// Ideal diffuse reflection.
#[derive(Clone, Debug)]
pub struct LambertianReflection {
    pub r: Spectrum,
}

impl LambertianReflection {
    pub fn new(r: Spectrum) -> Self {
        Self { r }
    }

    pub fn flags(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::DIFFUSE
    }

    pub fn f(&self, wo: Vec3, wi: Vec3) -> Spectrum {
        if same_hemisphere(wo, wi) {
            self.r * INV_PI
        } else {
            Spectrum::ZERO
        }
    }

    pub fn pdf(&self, wo: Vec3, wi: Vec3) -> f32 {
        if same_hemisphere(wo, wi) {
            abs_cos_theta(wi) * INV_PI
        } else {
            0.0
        }
    }

    pub fn sample_f(&self, wo: Vec3, u: Vec2) -> Option<BxDFSample> {
        if wo.z == 0.0 {
            return None;
        }
        let mut wi = cosine_sample_hemisphere(u);
        if wo.z < 0.0 {
            wi.z = -wi.z;
        }
        Some(BxDFSample::new(self.f(wo, wi), wi, self.pdf(wo, wi), self.flags()))
    }
}
