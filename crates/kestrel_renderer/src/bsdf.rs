//! A scattering model bound to one hit's shading frame.

use kestrel_core::MaterialDesc;
use kestrel_math::{Frame, Vec2, Vec3};

use crate::bxdf::{BxDF, BxDFSample, BxDFType, Disney, SpecularDielectric};
use crate::spectrum::Spectrum;

/// World-space wrapper around a [`BxDF`].
///
/// A geometry stores one unbound `Bsdf` as its material. Every hit clones
/// it and calls [`Bsdf::set_interaction`], so no two interactions ever
/// share one.
#[derive(Debug, Clone)]
pub struct Bsdf {
    bxdf: BxDF,
    /// Geometric normal, used to tell reflection from transmission
    ng: Vec3,
    shading: Frame,
}

impl Bsdf {
    pub fn new(bxdf: impl Into<BxDF>) -> Self {
        Self {
            bxdf: bxdf.into(),
            ng: Vec3::Z,
            shading: Frame::default(),
        }
    }

    /// Material for an asset's hints: smooth glass when it transmits,
    /// otherwise a Disney BRDF.
    pub fn from_material(desc: &MaterialDesc) -> Self {
        if desc.is_transmissive() {
            let tint = Spectrum::from_rgb(desc.diffuse_color);
            Self::new(SpecularDielectric::new(Spectrum::ONE, tint, 1.0, desc.ior))
        } else {
            Self::new(Disney::from(desc))
        }
    }

    /// Capture the geometric normal and shading frame of a hit.
    pub fn set_interaction(&mut self, ng: Vec3, shading: Frame) {
        self.ng = ng;
        self.shading = shading;
    }

    /// Clone of this material bound to a hit.
    pub fn bind(&self, ng: Vec3, shading: Frame) -> Bsdf {
        let mut bsdf = self.clone();
        bsdf.set_interaction(ng, shading);
        bsdf
    }

    pub fn bxdf(&self) -> &BxDF {
        &self.bxdf
    }

    pub fn shading_frame(&self) -> &Frame {
        &self.shading
    }

    pub fn flags(&self) -> BxDFType {
        self.bxdf.flags()
    }

    /// Number of lobes matching `types` (zero or one).
    pub fn num_components(&self, types: BxDFType) -> usize {
        usize::from(self.bxdf.matches_flags(types))
    }

    /// True when light sampling can contribute at this vertex.
    pub fn has_non_specular(&self) -> bool {
        self.flags().intersects(BxDFType::DIFFUSE | BxDFType::GLOSSY)
    }

    #[inline]
    pub fn world_to_local(&self, v: Vec3) -> Vec3 {
        self.shading.to_local(v)
    }

    #[inline]
    pub fn local_to_world(&self, v: Vec3) -> Vec3 {
        self.shading.to_world(v)
    }

    /// Evaluate for world-space directions.
    ///
    /// Whether the pair reflects or transmits is decided by the geometric
    /// normal, not the shading one, which keeps interpolated normals from
    /// leaking light through the surface.
    pub fn f(&self, wo_world: Vec3, wi_world: Vec3, types: BxDFType) -> Spectrum {
        let wo = self.world_to_local(wo_world);
        let wi = self.world_to_local(wi_world);
        if wo.z == 0.0 || !self.bxdf.matches_flags(types) {
            return Spectrum::ZERO;
        }

        let reflect = wi_world.dot(self.ng) * wo_world.dot(self.ng) > 0.0;
        let flags = self.bxdf.flags();
        if (reflect && flags.contains(BxDFType::REFLECTION)) || (!reflect && flags.contains(BxDFType::TRANSMISSION)) {
            self.bxdf.f(wo, wi)
        } else {
            Spectrum::ZERO
        }
    }

    pub fn pdf(&self, wo_world: Vec3, wi_world: Vec3, types: BxDFType) -> f32 {
        if !self.bxdf.matches_flags(types) {
            return 0.0;
        }
        let wo = self.world_to_local(wo_world);
        let wi = self.world_to_local(wi_world);
        if wo.z == 0.0 {
            return 0.0;
        }
        self.bxdf.pdf(wo, wi)
    }

    /// Sample an incident direction, returned in world space.
    pub fn sample_f(&self, wo_world: Vec3, u: Vec2, types: BxDFType) -> Option<BxDFSample> {
        if !self.bxdf.matches_flags(types) {
            return None;
        }
        let wo = self.world_to_local(wo_world);
        if wo.z == 0.0 {
            return None;
        }

        let sample = self.bxdf.sample_f(wo, u)?;
        if sample.pdf == 0.0 || sample.f.is_black() || sample.wi.z == 0.0 {
            return None;
        }

        Some(BxDFSample {
            wi: self.local_to_world(sample.wi),
            ..sample
        })
    }
}
