//! Disney principled BRDF.
//!
//! Based on Burley's 2012 "Physically Based Shading at Disney" and the
//! 2015 course notes. The model sums a Burley diffuse term blended toward
//! a Hanrahan-Krueger subsurface approximation, a sheen lobe, a GTR2
//! specular lobe and a GTR1 clearcoat lobe.
//!
//! Sampling picks one lobe stochastically but always reports the value and
//! density of the whole mixture.

use std::f32::consts::PI;

use kestrel_core::MaterialDesc;
use kestrel_math::{Vec2, Vec3};

use super::fresnel::{fr_schlick, schlick_weight};
use super::microfacet::TrowbridgeReitz;
use super::{BxDFSample, BxDFType};
use crate::geometry::{abs_cos_theta, reflect, same_hemisphere, spherical_direction};
use crate::sampling::{cosine_sample_hemisphere, INV_PI};
use crate::spectrum::Spectrum;

/// Constant-parameter Disney BRDF.
#[derive(Clone, Debug)]
pub struct Disney {
    /// Base color (albedo for dielectrics, reflectance for metals)
    pub base_color: Spectrum,

    /// Metallic: 0 = dielectric, 1 = metal
    pub metallic: f32,

    /// Roughness: 0 = smooth/glossy, 1 = rough/diffuse
    pub roughness: f32,

    /// Specular: Fresnel reflectance at normal incidence for dielectrics
    pub specular: f32,

    /// Tints the specular towards base_color
    pub specular_tint: f32,

    /// Grazing component for cloth-like materials
    pub sheen: f32,

    pub sheen_tint: f32,

    /// Second specular lobe for car paint, lacquered wood
    pub clearcoat: f32,

    /// 0 = satin, 1 = gloss
    pub clearcoat_gloss: f32,

    /// Blend from Burley diffuse to the subsurface approximation
    pub subsurface: f32,

    /// Aspect ratio of the specular highlight
    pub anisotropic: f32,
}

impl Default for Disney {
    fn default() -> Self {
        Self {
            base_color: Spectrum::splat(0.8),
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
        }
    }
}

impl Disney {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rough, non-specular diffuse.
    pub fn diffuse(color: Spectrum) -> Self {
        Self {
            base_color: color,
            roughness: 1.0,
            specular: 0.0,
            ..Default::default()
        }
    }

    pub fn metal(color: Spectrum, roughness: f32) -> Self {
        Self {
            base_color: color,
            metallic: 1.0,
            roughness,
            specular: 1.0,
            ..Default::default()
        }
    }

    pub fn plastic(color: Spectrum, roughness: f32) -> Self {
        Self {
            base_color: color,
            roughness,
            ..Default::default()
        }
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_clearcoat(mut self, clearcoat: f32, gloss: f32) -> Self {
        self.clearcoat = clearcoat.max(0.0);
        self.clearcoat_gloss = gloss.clamp(0.0, 1.0);
        self
    }

    pub fn with_sheen(mut self, sheen: f32, tint: f32) -> Self {
        self.sheen = sheen.max(0.0);
        self.sheen_tint = tint.clamp(0.0, 1.0);
        self
    }

    pub fn with_anisotropic(mut self, anisotropic: f32) -> Self {
        self.anisotropic = anisotropic.clamp(0.0, 1.0);
        self
    }

    pub fn flags(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::DIFFUSE | BxDFType::GLOSSY
    }

    /// Probability of sampling the diffuse lobe.
    #[inline]
    fn diffuse_ratio(&self) -> f32 {
        0.5 * (1.0 - self.metallic)
    }

    /// Probability of GTR2 over GTR1 once the specular branch is taken.
    #[inline]
    fn gtr2_ratio(&self) -> f32 {
        1.0 / (1.0 + self.clearcoat)
    }

    #[inline]
    fn clearcoat_alpha(&self) -> f32 {
        lerp(0.1, 0.001, self.clearcoat_gloss)
    }

    fn specular_distribution(&self) -> TrowbridgeReitz {
        let aspect = (1.0 - 0.9 * self.anisotropic).sqrt();
        TrowbridgeReitz::new(
            (self.roughness / aspect).max(0.001),
            (self.roughness * aspect).max(0.001),
            false,
        )
    }

    pub fn f(&self, wo: Vec3, wi: Vec3) -> Spectrum {
        if !same_hemisphere(wo, wi) {
            return Spectrum::ZERO;
        }
        let Some(wh) = (wi + wo).try_normalize() else {
            return Spectrum::ZERO;
        };
        let cos_o = abs_cos_theta(wo);
        let cos_i = abs_cos_theta(wi);
        let cos_d = wi.dot(wh);

        let luminance = self.base_color.y();
        let c_tint = if luminance > 0.0 {
            self.base_color / luminance
        } else {
            Spectrum::ONE
        };
        let c_spec0 = Spectrum::lerp(
            Spectrum::lerp(Spectrum::ONE, c_tint, self.specular_tint) * (self.specular * 0.08),
            self.base_color,
            self.metallic,
        );
        let c_sheen = Spectrum::lerp(Spectrum::ONE, c_tint, self.sheen_tint);

        // diffuse fresnel: 1 at normal incidence to 0.5 at grazing, with
        // retro-reflection growing with roughness
        let fo = schlick_weight(cos_o);
        let fi = schlick_weight(cos_i);
        let fd90 = 0.5 + 2.0 * cos_d * cos_d * self.roughness;
        let fd = lerp(1.0, fd90, fo) * lerp(1.0, fd90, fi);

        let fss90 = cos_d * cos_d * self.roughness;
        let fss = lerp(1.0, fss90, fo) * lerp(1.0, fss90, fi);
        // 1.25 roughly preserves albedo
        let ss = 1.25 * (fss * (1.0 / (cos_o + cos_i) - 0.5) + 0.5);

        let sheen = c_sheen * (self.sheen * schlick_weight(cos_d));
        let diffuse = (self.base_color * (INV_PI * lerp(fd, ss, self.subsurface)) + sheen)
            * (1.0 - self.metallic);

        let ds = self.specular_distribution().d(wh);
        let fs = fr_schlick(c_spec0, cos_d);
        let roughg = sqr(self.roughness * 0.5 + 0.5);
        let gs = smith_g_ggx(cos_o, roughg) * smith_g_ggx(cos_i, roughg);
        let specular = fs * (gs * ds);

        diffuse + specular + Spectrum::splat(self.clearcoat_f(wo, wi, wh))
    }

    fn clearcoat_f(&self, wo: Vec3, wi: Vec3, wh: Vec3) -> f32 {
        if self.clearcoat <= 0.0 {
            return 0.0;
        }
        // fixed ior of 1.5 gives F0 = 0.04
        let dr = d_gtr1(abs_cos_theta(wh), self.clearcoat_alpha());
        let fr = lerp(0.04, 1.0, schlick_weight(wo.dot(wh)));
        let gr = smith_g_ggx(abs_cos_theta(wo), 0.25) * smith_g_ggx(abs_cos_theta(wi), 0.25);
        self.clearcoat * gr * fr * dr / 4.0
    }

    pub fn pdf(&self, wo: Vec3, wi: Vec3) -> f32 {
        if !same_hemisphere(wo, wi) {
            return 0.0;
        }
        let Some(wh) = (wo + wi).try_normalize() else {
            return 0.0;
        };
        let cos_h = abs_cos_theta(wh);

        let diffuse_ratio = self.diffuse_ratio();
        let specular_ratio = 1.0 - diffuse_ratio;

        let pdf_gtr2 = self.specular_distribution().pdf(wo, wh);
        let pdf_gtr1 = d_gtr1(cos_h, self.clearcoat_alpha()) * cos_h;
        let pdf_spec = lerp(pdf_gtr1, pdf_gtr2, self.gtr2_ratio()) / (4.0 * wi.dot(wh).abs());
        let pdf_diff = abs_cos_theta(wi) * INV_PI;

        diffuse_ratio * pdf_diff + specular_ratio * pdf_spec
    }

    pub fn sample_f(&self, wo: Vec3, u: Vec2) -> Option<BxDFSample> {
        if wo.z == 0.0 {
            return None;
        }
        let diffuse_ratio = self.diffuse_ratio();

        let (wi, flags) = if u.x < diffuse_ratio {
            let mut wi = cosine_sample_hemisphere(Vec2::new(u.x / diffuse_ratio, u.y));
            if wo.z < 0.0 {
                wi.z = -wi.z;
            }
            (wi, BxDFType::REFLECTION | BxDFType::DIFFUSE)
        } else {
            let mut u = Vec2::new((u.x - diffuse_ratio) / (1.0 - diffuse_ratio), u.y);
            let gtr2_ratio = self.gtr2_ratio();

            let mut wh = if u.x < gtr2_ratio {
                u.x /= gtr2_ratio;
                self.specular_distribution().sample_wh(wo, u)
            } else {
                u.x = (u.x - gtr2_ratio) / (1.0 - gtr2_ratio);
                sample_gtr1(self.clearcoat_alpha(), u)
            };
            if !same_hemisphere(wo, wh) {
                wh = -wh;
            }
            let wi = reflect(wo, wh);
            if !same_hemisphere(wo, wi) {
                return None;
            }
            (wi, BxDFType::REFLECTION | BxDFType::GLOSSY)
        };

        Some(BxDFSample::new(self.f(wo, wi), wi, self.pdf(wo, wi), flags))
    }
}

impl From<&MaterialDesc> for Disney {
    fn from(desc: &MaterialDesc) -> Self {
        Self {
            base_color: Spectrum::from_rgb(desc.diffuse_color),
            metallic: desc.metallic.clamp(0.0, 1.0),
            roughness: desc.roughness.clamp(0.0, 1.0),
            specular: desc.specular.max(0.0),
            specular_tint: desc.specular_tint.clamp(0.0, 1.0),
            sheen: desc.sheen.max(0.0),
            sheen_tint: desc.sheen_tint.clamp(0.0, 1.0),
            clearcoat: desc.clearcoat.max(0.0),
            clearcoat_gloss: desc.clearcoat_gloss.clamp(0.0, 1.0),
            subsurface: desc.subsurface.clamp(0.0, 1.0),
            anisotropic: desc.anisotropic.clamp(0.0, 1.0),
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

#[inline]
fn sqr(x: f32) -> f32 {
    x * x
}

/// Berry distribution used by the clearcoat lobe.
fn d_gtr1(cos_theta: f32, alpha: f32) -> f32 {
    if alpha >= 1.0 {
        return INV_PI;
    }
    let a2 = alpha * alpha;
    (a2 - 1.0) / (PI * a2.ln() * (1.0 + (a2 - 1.0) * cos_theta * cos_theta))
}

/// Smith masking with the `1 / (4 cos)` of the microfacet BRDF folded in.
fn smith_g_ggx(cos_theta: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let c2 = cos_theta * cos_theta;
    1.0 / (cos_theta + (a2 + c2 - a2 * c2).sqrt())
}

/// Half vector distributed as `D_gtr1(wh) |cos(wh)|` in the +Z hemisphere.
fn sample_gtr1(alpha: f32, u: Vec2) -> Vec3 {
    let a2 = alpha * alpha;
    let cos_theta = ((1.0 - a2.powf(1.0 - u.x)) / (1.0 - a2)).max(0.0).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    spherical_direction(sin_theta, cos_theta, phi, Vec3::X, Vec3::Y, Vec3::Z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::{uniform_hemisphere_pdf, uniform_sample_hemisphere};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_u(rng: &mut StdRng) -> Vec2 {
        Vec2::new(rng.gen(), rng.gen())
    }

    fn materials() -> Vec<Disney> {
        vec![
            Disney::default(),
            Disney::metal(Spectrum::splat(0.9), 0.3),
            Disney::plastic(Spectrum::splat(0.4), 0.2).with_clearcoat(1.0, 0.8),
            Disney::diffuse(Spectrum::splat(0.7)).with_sheen(1.0, 0.5),
            Disney::metal(Spectrum::splat(0.6), 0.5).with_anisotropic(0.8),
        ]
    }

    #[test]
    fn test_disney_default() {
        let mat = Disney::new();
        assert!((mat.metallic - 0.0).abs() < 0.001);
        assert!((mat.roughness - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_schlick_weight() {
        assert!((schlick_weight(1.0) - 0.0).abs() < 0.001);
        assert!((schlick_weight(0.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_opposite_hemispheres_black() {
        for mat in materials() {
            let wo = Vec3::new(0.2, 0.1, 0.9).normalize();
            let wi = Vec3::new(0.1, -0.3, -0.8).normalize();
            assert!(mat.f(wo, wi).is_black());
            assert_eq!(mat.pdf(wo, wi), 0.0);
        }
    }

    #[test]
    fn test_sample_returns_full_mixture() {
        let mut rng = StdRng::seed_from_u64(41);
        for mat in materials() {
            let mut checked = 0;
            for _ in 0..1500 {
                let mut wo = uniform_sample_hemisphere(random_u(&mut rng));
                wo.z = wo.z.max(0.1);
                let wo = wo.normalize();

                let Some(s) = mat.sample_f(wo, random_u(&mut rng)) else {
                    continue;
                };
                let pdf = mat.pdf(wo, s.wi);
                let f = mat.f(wo, s.wi);
                assert!((s.pdf - pdf).abs() <= 1e-4 * pdf.max(1.0), "{} vs {}", s.pdf, pdf);
                assert_eq!(s.f, f);
                checked += 1;
            }
            assert!(checked >= 700, "only {} valid samples", checked);
        }
    }

    #[test]
    fn test_pdf_integrates_to_at_most_one() {
        let mut rng = StdRng::seed_from_u64(43);
        let wo = Vec3::new(0.3, 0.0, 0.95).normalize();
        for mat in materials() {
            let n = 100_000;
            let mut sum = 0.0;
            for _ in 0..n {
                let wi = uniform_sample_hemisphere(random_u(&mut rng));
                sum += mat.pdf(wo, wi) / uniform_hemisphere_pdf();
            }
            let integral = sum / n as f32;
            // specular mass lost below the horizon keeps this under 1
            assert!(integral < 1.05, "pdf integral = {}", integral);
            assert!(integral > 0.5, "pdf integral = {}", integral);
        }
    }

    #[test]
    fn test_from_material_desc() {
        let desc = MaterialDesc {
            metallic: 2.0,
            clearcoat: 0.5,
            ..MaterialDesc::new("car paint", Vec3::new(0.8, 0.1, 0.1))
        };
        let disney = Disney::from(&desc);
        assert_eq!(disney.metallic, 1.0);
        assert_eq!(disney.clearcoat, 0.5);
        assert!((disney.base_color.to_rgb() - Vec3::new(0.8, 0.1, 0.1)).length() < 1e-6);
    }
}
