//! Scattering models in the local shading frame.
//!
//! Every variant answers the same three questions: the value `f(wo, wi)`,
//! the density `pdf(wo, wi)` its own sampler would assign to `wi`, and a
//! sample `(f, wi, pdf)` drawn from a 2D uniform. Directions point away
//! from the surface and the shading normal is +Z.
//!
//! The variants are flattened into one [`BxDF`] enum so a BSDF can hold
//! its model by value and be cloned per hit without boxing.

mod disney;
mod fresnel;
mod lambertian;
mod microfacet;
mod specular;

pub use disney::Disney;
pub use fresnel::{fr_conductor, fr_dielectric, fr_schlick, schlick_weight, Fresnel};
pub use lambertian::LambertianReflection;
pub use microfacet::{MicrofacetReflection, MicrofacetTransmission, TrowbridgeReitz};
pub use specular::{Mirror, SpecularDielectric};

use bitflags::bitflags;
use kestrel_math::{Vec2, Vec3};

use crate::spectrum::Spectrum;

bitflags! {
    /// Hemisphere and lobe character of a scattering model.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BxDFType: u8 {
        const REFLECTION = 1 << 0;
        const TRANSMISSION = 1 << 1;
        const DIFFUSE = 1 << 2;
        const GLOSSY = 1 << 3;
        const SPECULAR = 1 << 4;
        const ALL = Self::REFLECTION.bits()
            | Self::TRANSMISSION.bits()
            | Self::DIFFUSE.bits()
            | Self::GLOSSY.bits()
            | Self::SPECULAR.bits();
    }
}

/// A direction drawn from a scattering model.
#[derive(Debug, Clone, Copy)]
pub struct BxDFSample {
    pub f: Spectrum,
    pub wi: Vec3,
    pub pdf: f32,
    /// Lobe the sample came from
    pub flags: BxDFType,
}

impl BxDFSample {
    pub fn new(f: Spectrum, wi: Vec3, pdf: f32, flags: BxDFType) -> Self {
        Self { f, wi, pdf, flags }
    }

    pub fn is_specular(&self) -> bool {
        self.flags.contains(BxDFType::SPECULAR)
    }
}

/// One scattering model.
#[derive(Debug, Clone)]
pub enum BxDF {
    Lambertian(LambertianReflection),
    Mirror(Mirror),
    SpecularDielectric(SpecularDielectric),
    MicrofacetReflection(MicrofacetReflection),
    MicrofacetTransmission(MicrofacetTransmission),
    Disney(Disney),
}

impl BxDF {
    pub fn flags(&self) -> BxDFType {
        match self {
            BxDF::Lambertian(bxdf) => bxdf.flags(),
            BxDF::Mirror(bxdf) => bxdf.flags(),
            BxDF::SpecularDielectric(bxdf) => bxdf.flags(),
            BxDF::MicrofacetReflection(bxdf) => bxdf.flags(),
            BxDF::MicrofacetTransmission(bxdf) => bxdf.flags(),
            BxDF::Disney(bxdf) => bxdf.flags(),
        }
    }

    /// True when every lobe of this model is within `t`.
    pub fn matches_flags(&self, t: BxDFType) -> bool {
        t.contains(self.flags())
    }

    /// Scattering value. Delta lobes always return black.
    pub fn f(&self, wo: Vec3, wi: Vec3) -> Spectrum {
        match self {
            BxDF::Lambertian(bxdf) => bxdf.f(wo, wi),
            BxDF::Mirror(_) | BxDF::SpecularDielectric(_) => Spectrum::ZERO,
            BxDF::MicrofacetReflection(bxdf) => bxdf.f(wo, wi),
            BxDF::MicrofacetTransmission(bxdf) => bxdf.f(wo, wi),
            BxDF::Disney(bxdf) => bxdf.f(wo, wi),
        }
    }

    /// Density of `sample_f` producing `wi`. Zero for delta lobes.
    pub fn pdf(&self, wo: Vec3, wi: Vec3) -> f32 {
        match self {
            BxDF::Lambertian(bxdf) => bxdf.pdf(wo, wi),
            BxDF::Mirror(_) | BxDF::SpecularDielectric(_) => 0.0,
            BxDF::MicrofacetReflection(bxdf) => bxdf.pdf(wo, wi),
            BxDF::MicrofacetTransmission(bxdf) => bxdf.pdf(wo, wi),
            BxDF::Disney(bxdf) => bxdf.pdf(wo, wi),
        }
    }

    pub fn sample_f(&self, wo: Vec3, u: Vec2) -> Option<BxDFSample> {
        match self {
            BxDF::Lambertian(bxdf) => bxdf.sample_f(wo, u),
            BxDF::Mirror(bxdf) => bxdf.sample_f(wo, u),
            BxDF::SpecularDielectric(bxdf) => bxdf.sample_f(wo, u),
            BxDF::MicrofacetReflection(bxdf) => bxdf.sample_f(wo, u),
            BxDF::MicrofacetTransmission(bxdf) => bxdf.sample_f(wo, u),
            BxDF::Disney(bxdf) => bxdf.sample_f(wo, u),
        }
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for BxDF {
                fn from(bxdf: $ty) -> Self {
                    BxDF::$variant(bxdf)
                }
            }
        )*
    };
}

impl_from_variant!(
    Lambertian(LambertianReflection),
    Mirror(Mirror),
    SpecularDielectric(SpecularDielectric),
    MicrofacetReflection(MicrofacetReflection),
    MicrofacetTransmission(MicrofacetTransmission),
    Disney(Disney),
);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_flags_filtering() {
        let diffuse: BxDF = LambertianReflection::new(Spectrum::ONE).into();
        assert!(diffuse.matches_flags(BxDFType::ALL));
        assert!(diffuse.matches_flags(BxDFType::REFLECTION | BxDFType::DIFFUSE));
        assert!(!diffuse.matches_flags(BxDFType::TRANSMISSION | BxDFType::DIFFUSE));

        let glass: BxDF = SpecularDielectric::new(Spectrum::ONE, Spectrum::ONE, 1.0, 1.5).into();
        assert!(!glass.matches_flags(BxDFType::REFLECTION | BxDFType::SPECULAR));
    }

    #[test]
    fn test_delta_lobes_cannot_be_evaluated() {
        let mirror: BxDF = Mirror::new(Spectrum::ONE).into();
        let wo = Vec3::new(0.6, 0.0, 0.8);
        let wi = Vec3::new(-0.6, 0.0, 0.8);
        assert!(mirror.f(wo, wi).is_black());
        assert_eq!(mirror.pdf(wo, wi), 0.0);
    }

    #[test]
    fn test_sample_pdf_consistency_all_smooth_variants() {
        let variants: Vec<BxDF> = vec![
            LambertianReflection::new(Spectrum::splat(0.5)).into(),
            MicrofacetReflection::new(
                Spectrum::ONE,
                TrowbridgeReitz::isotropic(0.25),
                Fresnel::Conductor {
                    eta_i: Spectrum::ONE,
                    eta_t: Spectrum::splat(0.2),
                    k: Spectrum::splat(3.9),
                },
            )
            .into(),
            MicrofacetTransmission::new(Spectrum::ONE, TrowbridgeReitz::isotropic(0.4), 1.0, 1.33).into(),
            Disney::plastic(Spectrum::splat(0.5), 0.3).with_clearcoat(0.5, 0.5).into(),
        ];

        let mut rng = StdRng::seed_from_u64(99);
        for bxdf in &variants {
            for _ in 0..1000 {
                let wo = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(0.2..1.0))
                    .normalize();
                let u = Vec2::new(rng.gen(), rng.gen());
                let Some(s) = bxdf.sample_f(wo, u) else {
                    continue;
                };
                if s.pdf == 0.0 {
                    continue;
                }
                let pdf = bxdf.pdf(wo, s.wi);
                assert!(
                    (s.pdf - pdf).abs() <= 1e-3 * pdf.max(1.0),
                    "{:?}: sampled {} vs evaluated {}",
                    bxdf.flags(),
                    s.pdf,
                    pdf
                );
            }
        }
    }
}
