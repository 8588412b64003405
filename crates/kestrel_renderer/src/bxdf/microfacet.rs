//! Trowbridge-Reitz (GGX) microfacets and the glossy lobes built on them.

use std::f32::consts::PI;

use kestrel_math::{Vec2, Vec3};

use super::fresnel::Fresnel;
use super::{BxDFSample, BxDFType};
use crate::geometry::*;
use crate::spectrum::Spectrum;

/// Anisotropic Trowbridge-Reitz normal distribution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrowbridgeReitz {
    alpha_x: f32,
    alpha_y: f32,
    sample_visible_area: bool,
}

impl TrowbridgeReitz {
    /// Alphas are clamped to 0.001 so near-specular lobes stay finite.
    pub fn new(alpha_x: f32, alpha_y: f32, sample_visible_area: bool) -> Self {
        Self {
            alpha_x: alpha_x.max(0.001),
            alpha_y: alpha_y.max(0.001),
            sample_visible_area,
        }
    }

    /// Isotropic distribution sampling visible normals.
    pub fn isotropic(alpha: f32) -> Self {
        Self::new(alpha, alpha, true)
    }

    /// Perceptual roughness in [0, 1] to alpha.
    pub fn roughness_to_alpha(roughness: f32) -> f32 {
        let x = roughness.max(1e-3).ln();
        1.62142 + 0.819955 * x + 0.1734 * x * x + 0.0171201 * x * x * x + 0.000640711 * x * x * x * x
    }

    pub fn alpha(&self) -> (f32, f32) {
        (self.alpha_x, self.alpha_y)
    }

    pub fn samples_visible_area(&self) -> bool {
        self.sample_visible_area
    }

    /// Differential area of microfacets with normal `wh`.
    pub fn d(&self, wh: Vec3) -> f32 {
        let tan2 = tan2_theta(wh);
        if tan2.is_infinite() || tan2.is_nan() {
            return 0.0;
        }
        let cos4 = cos2_theta(wh) * cos2_theta(wh);
        let e = (cos2_phi(wh) / (self.alpha_x * self.alpha_x)
            + sin2_phi(wh) / (self.alpha_y * self.alpha_y))
            * tan2;
        1.0 / (PI * self.alpha_x * self.alpha_y * cos4 * (1.0 + e) * (1.0 + e))
    }

    /// Masked microfacet area per visible area, seen from `w`.
    pub fn lambda(&self, w: Vec3) -> f32 {
        let abs_tan = tan_theta(w).abs();
        if abs_tan.is_infinite() || abs_tan.is_nan() {
            return 0.0;
        }
        let alpha = (cos2_phi(w) * self.alpha_x * self.alpha_x
            + sin2_phi(w) * self.alpha_y * self.alpha_y)
            .sqrt();
        let alpha2_tan2 = (alpha * abs_tan) * (alpha * abs_tan);
        (-1.0 + (1.0 + alpha2_tan2).sqrt()) / 2.0
    }

    #[inline]
    pub fn g1(&self, w: Vec3) -> f32 {
        1.0 / (1.0 + self.lambda(w))
    }

    #[inline]
    pub fn g(&self, wo: Vec3, wi: Vec3) -> f32 {
        1.0 / (1.0 + self.lambda(wo) + self.lambda(wi))
    }

    /// Draw a microfacet normal on the same side as `wo`.
    pub fn sample_wh(&self, wo: Vec3, u: Vec2) -> Vec3 {
        if self.sample_visible_area {
            let flip = wo.z < 0.0;
            let wh = sample_visible(if flip { -wo } else { wo }, self.alpha_x, self.alpha_y, u);
            return if flip { -wh } else { wh };
        }

        let (phi, tan2) = if self.alpha_x == self.alpha_y {
            (2.0 * PI * u.y, self.alpha_x * self.alpha_x * u.x / (1.0 - u.x))
        } else {
            let mut phi = (self.alpha_y / self.alpha_x * (2.0 * PI * u.y + 0.5 * PI).tan()).atan();
            if u.y > 0.5 {
                phi += PI;
            }
            let (sin_phi, cos_phi) = phi.sin_cos();
            let ax2 = self.alpha_x * self.alpha_x;
            let ay2 = self.alpha_y * self.alpha_y;
            let alpha2 = 1.0 / (cos_phi * cos_phi / ax2 + sin_phi * sin_phi / ay2);
            (phi, alpha2 * u.x / (1.0 - u.x))
        };
        let cos_theta = 1.0 / (1.0 + tan2).sqrt();
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let wh = spherical_direction(sin_theta, cos_theta, phi, Vec3::X, Vec3::Y, Vec3::Z);
        if same_hemisphere(wo, wh) {
            wh
        } else {
            -wh
        }
    }

    /// Density of [`sample_wh`](Self::sample_wh) with respect to `wh`.
    pub fn pdf(&self, wo: Vec3, wh: Vec3) -> f32 {
        if self.sample_visible_area {
            self.d(wh) * self.g1(wo) * wo.dot(wh).abs() / abs_cos_theta(wo)
        } else {
            self.d(wh) * abs_cos_theta(wh)
        }
    }
}

/// Slopes for the unit-roughness distribution seen from `cos_theta`.
fn sample11(cos_theta: f32, u1: f32, u2: f32) -> (f32, f32) {
    // normal incidence
    if cos_theta > 0.9999 {
        let r = (u1 / (1.0 - u1)).sqrt();
        let phi = 2.0 * PI * u2;
        return (r * phi.cos(), r * phi.sin());
    }

    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let tan_theta = sin_theta / cos_theta;
    let a = 1.0 / tan_theta;
    let g1 = 2.0 / (1.0 + (1.0 + 1.0 / (a * a)).sqrt());

    let a = 2.0 * u1 / g1 - 1.0;
    let tmp = (1.0 / (a * a - 1.0)).min(1e10);
    let b = tan_theta;
    let d = (b * b * tmp * tmp - (a * a - b * b) * tmp).max(0.0).sqrt();
    let slope_x_1 = b * tmp - d;
    let slope_x_2 = b * tmp + d;
    let slope_x = if a < 0.0 || slope_x_2 > 1.0 / tan_theta {
        slope_x_1
    } else {
        slope_x_2
    };

    let (s, u2) = if u2 > 0.5 {
        (1.0, 2.0 * (u2 - 0.5))
    } else {
        (-1.0, 2.0 * (0.5 - u2))
    };
    let z = (u2 * (u2 * (u2 * 0.27385 - 0.73369) + 0.46341))
        / (u2 * (u2 * (u2 * 0.093073 + 0.309420) - 1.000000) + 0.597999);
    let slope_y = s * z * (1.0 + slope_x * slope_x).sqrt();

    (slope_x, slope_y)
}

/// Visible-normal sampling by stretching to unit roughness.
fn sample_visible(wi: Vec3, alpha_x: f32, alpha_y: f32, u: Vec2) -> Vec3 {
    let stretched = Vec3::new(alpha_x * wi.x, alpha_y * wi.y, wi.z).normalize();

    let (slope_x, slope_y) = sample11(cos_theta(stretched), u.x, u.y);

    let (cos_phi, sin_phi) = (cos_phi(stretched), sin_phi(stretched));
    let rotated_x = cos_phi * slope_x - sin_phi * slope_y;
    let rotated_y = sin_phi * slope_x + cos_phi * slope_y;

    Vec3::new(-alpha_x * rotated_x, -alpha_y * rotated_y, 1.0).normalize()
}

/// Torrance-Sparrow glossy reflection.
#[derive(Clone, Debug)]
pub struct MicrofacetReflection {
    pub r: Spectrum,
    pub distribution: TrowbridgeReitz,
    pub fresnel: Fresnel,
}

impl MicrofacetReflection {
    pub fn new(r: Spectrum, distribution: TrowbridgeReitz, fresnel: Fresnel) -> Self {
        Self {
            r,
            distribution,
            fresnel,
        }
    }

    pub fn flags(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::GLOSSY
    }

    pub fn f(&self, wo: Vec3, wi: Vec3) -> Spectrum {
        if !same_hemisphere(wo, wi) {
            return Spectrum::ZERO;
        }
        let cos_o = abs_cos_theta(wo);
        let cos_i = abs_cos_theta(wi);
        if cos_i == 0.0 || cos_o == 0.0 {
            return Spectrum::ZERO;
        }
        let Some(wh) = (wi + wo).try_normalize() else {
            return Spectrum::ZERO;
        };

        let f = self.fresnel.evaluate(wi.dot(face_forward(wh, Vec3::Z)));
        self.r * f * (self.distribution.d(wh) * self.distribution.g(wo, wi) / (4.0 * cos_i * cos_o))
    }

    pub fn pdf(&self, wo: Vec3, wi: Vec3) -> f32 {
        if !same_hemisphere(wo, wi) {
            return 0.0;
        }
        let Some(wh) = (wo + wi).try_normalize() else {
            return 0.0;
        };
        self.distribution.pdf(wo, wh) / (4.0 * wo.dot(wh))
    }

    pub fn sample_f(&self, wo: Vec3, u: Vec2) -> Option<BxDFSample> {
        if wo.z == 0.0 {
            return None;
        }
        let wh = self.distribution.sample_wh(wo, u);
        // rare for visible-normal sampling, but possible with the classical mode
        if wo.dot(wh) <= 0.0 {
            return None;
        }
        let wi = reflect(wo, wh);
        if !same_hemisphere(wo, wi) {
            return None;
        }

        let pdf = self.distribution.pdf(wo, wh) / (4.0 * wo.dot(wh));
        Some(BxDFSample::new(self.f(wo, wi), wi, pdf, self.flags()))
    }
}

/// Rough dielectric transmission (Walter et al. 2007).
#[derive(Clone, Debug)]
pub struct MicrofacetTransmission {
    pub t: Spectrum,
    pub distribution: TrowbridgeReitz,
    /// Index above the surface
    pub eta_a: f32,
    /// Index below the surface
    pub eta_b: f32,
}

impl MicrofacetTransmission {
    pub fn new(t: Spectrum, distribution: TrowbridgeReitz, eta_a: f32, eta_b: f32) -> Self {
        Self {
            t,
            distribution,
            eta_a,
            eta_b,
        }
    }

    pub fn flags(&self) -> BxDFType {
        BxDFType::TRANSMISSION | BxDFType::GLOSSY
    }

    fn fresnel(&self) -> Fresnel {
        Fresnel::Dielectric {
            eta_i: self.eta_a,
            eta_t: self.eta_b,
        }
    }

    /// Transmitted over incident index along the generalised half vector.
    fn eta(&self, wo: Vec3) -> f32 {
        if cos_theta(wo) > 0.0 {
            self.eta_b / self.eta_a
        } else {
            self.eta_a / self.eta_b
        }
    }

    pub fn f(&self, wo: Vec3, wi: Vec3) -> Spectrum {
        if same_hemisphere(wo, wi) {
            return Spectrum::ZERO;
        }
        let cos_o = cos_theta(wo);
        let cos_i = cos_theta(wi);
        if cos_i == 0.0 || cos_o == 0.0 {
            return Spectrum::ZERO;
        }

        let eta = self.eta(wo);
        let Some(mut wh) = (wo + wi * eta).try_normalize() else {
            return Spectrum::ZERO;
        };
        if wh.z < 0.0 {
            wh = -wh;
        }
        // both directions on the same side of the microfacet
        if wo.dot(wh) * wi.dot(wh) > 0.0 {
            return Spectrum::ZERO;
        }

        let f = self.fresnel().evaluate(wo.dot(wh));
        let sqrt_denom = wo.dot(wh) + eta * wi.dot(wh);
        // radiance is compressed by the squared index ratio
        let factor = 1.0 / eta;

        let value = self.distribution.d(wh) * self.distribution.g(wo, wi) * eta * eta
            * wi.dot(wh).abs()
            * wo.dot(wh).abs()
            * factor
            * factor
            / (cos_i * cos_o * sqrt_denom * sqrt_denom);
        (Spectrum::ONE - f) * self.t * value.abs()
    }

    pub fn pdf(&self, wo: Vec3, wi: Vec3) -> f32 {
        if same_hemisphere(wo, wi) {
            return 0.0;
        }
        let eta = self.eta(wo);
        let Some(wh) = (wo + wi * eta).try_normalize() else {
            return 0.0;
        };
        if wo.dot(wh) * wi.dot(wh) > 0.0 {
            return 0.0;
        }

        let sqrt_denom = wo.dot(wh) + eta * wi.dot(wh);
        let dwh_dwi = ((eta * eta * wi.dot(wh)) / (sqrt_denom * sqrt_denom)).abs();
        self.distribution.pdf(wo, wh) * dwh_dwi
    }

    pub fn sample_f(&self, wo: Vec3, u: Vec2) -> Option<BxDFSample> {
        if wo.z == 0.0 {
            return None;
        }
        let wh = self.distribution.sample_wh(wo, u);
        if wo.dot(wh) <= 0.0 {
            return None;
        }

        let eta = if cos_theta(wo) > 0.0 {
            self.eta_a / self.eta_b
        } else {
            self.eta_b / self.eta_a
        };
        let wi = refract(wo, wh, eta)?;
        // a steep microfacet can bend the refracted ray back to wo's side
        if same_hemisphere(wo, wi) {
            return None;
        }
        let pdf = self.pdf(wo, wi);
        if pdf <= 0.0 {
            return None;
        }
        Some(BxDFSample::new(self.f(wo, wi), wi, pdf, self.flags()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::{uniform_hemisphere_pdf, uniform_sample_hemisphere, uniform_sample_sphere};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_u(rng: &mut StdRng) -> Vec2 {
        Vec2::new(rng.gen(), rng.gen())
    }

    fn random_wo(rng: &mut StdRng) -> Vec3 {
        // stay away from grazing where densities blow up
        let mut w = uniform_sample_hemisphere(random_u(rng));
        w.z = w.z.max(0.1);
        w.normalize()
    }

    fn assert_pdf_consistent(sampled: f32, evaluated: f32) {
        let tolerance = 1e-3 * sampled.abs().max(1.0);
        assert!(
            (sampled - evaluated).abs() < tolerance,
            "sampled pdf {} vs evaluated {}",
            sampled,
            evaluated
        );
    }

    #[test]
    fn test_d_normalization() {
        // integral of D(wh) cos(wh) over the hemisphere is 1
        let dist = TrowbridgeReitz::new(0.3, 0.6, false);
        let mut rng = StdRng::seed_from_u64(17);
        let n = 200_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let wh = uniform_sample_hemisphere(random_u(&mut rng));
            sum += dist.d(wh) * cos_theta(wh) / uniform_hemisphere_pdf();
        }
        let estimate = sum / n as f32;
        assert!((estimate - 1.0).abs() < 0.05, "integral = {}", estimate);
    }

    #[test]
    fn test_d_guard_at_horizon() {
        let dist = TrowbridgeReitz::isotropic(0.5);
        assert_eq!(dist.d(Vec3::X), 0.0);
        assert_eq!(dist.lambda(Vec3::X), 0.0);
    }

    #[test]
    fn test_g1_is_one_at_normal_incidence() {
        let dist = TrowbridgeReitz::isotropic(0.8);
        assert!((dist.g1(Vec3::Z) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_wh_same_side_as_wo() {
        let mut rng = StdRng::seed_from_u64(5);
        for visible in [true, false] {
            let dist = TrowbridgeReitz::new(0.4, 0.2, visible);
            for _ in 0..500 {
                let mut wo = random_wo(&mut rng);
                if rng.gen::<bool>() {
                    wo = -wo;
                }
                let wh = dist.sample_wh(wo, random_u(&mut rng));
                assert!(same_hemisphere(wo, wh), "wo = {:?}, wh = {:?}", wo, wh);
                assert!((wh.length() - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_roughness_to_alpha_monotonic() {
        let a = TrowbridgeReitz::roughness_to_alpha(0.1);
        let b = TrowbridgeReitz::roughness_to_alpha(0.5);
        assert!(a < b, "{} !< {}", a, b);
    }

    #[test]
    fn test_reflection_opposite_hemispheres_is_black() {
        let bxdf = MicrofacetReflection::new(
            Spectrum::ONE,
            TrowbridgeReitz::isotropic(0.3),
            Fresnel::NoOp,
        );
        let wo = Vec3::new(0.3, 0.2, 0.9).normalize();
        let wi = Vec3::new(-0.1, 0.4, -0.8).normalize();
        assert!(bxdf.f(wo, wi).is_black());
        assert_eq!(bxdf.pdf(wo, wi), 0.0);
    }

    #[test]
    fn test_reflection_sample_pdf_consistency() {
        let mut rng = StdRng::seed_from_u64(23);
        for visible in [true, false] {
            let bxdf = MicrofacetReflection::new(
                Spectrum::splat(0.9),
                TrowbridgeReitz::new(0.35, 0.2, visible),
                Fresnel::Dielectric { eta_i: 1.0, eta_t: 1.5 },
            );
            let mut checked = 0;
            for _ in 0..2000 {
                let wo = random_wo(&mut rng);
                let Some(s) = bxdf.sample_f(wo, random_u(&mut rng)) else {
                    continue;
                };
                assert_pdf_consistent(s.pdf, bxdf.pdf(wo, s.wi));
                checked += 1;
            }
            assert!(checked > 1000, "only {} valid samples", checked);
        }
    }

    #[test]
    fn test_transmission_sample_pdf_consistency() {
        let mut rng = StdRng::seed_from_u64(29);
        let bxdf = MicrofacetTransmission::new(
            Spectrum::ONE,
            TrowbridgeReitz::isotropic(0.3),
            1.0,
            1.5,
        );
        let mut checked = 0;
        for _ in 0..2000 {
            let mut wo = random_wo(&mut rng);
            if rng.gen::<bool>() {
                wo = -wo;
            }
            let Some(s) = bxdf.sample_f(wo, random_u(&mut rng)) else {
                continue;
            };
            assert!(!same_hemisphere(wo, s.wi));
            assert_pdf_consistent(s.pdf, bxdf.pdf(wo, s.wi));
            checked += 1;
        }
        assert!(checked > 500, "only {} valid samples", checked);
    }

    #[test]
    fn test_transmission_samples_always_cross_the_surface() {
        // unclamped directions, including grazing ones, in both hemispheres
        let mut rng = StdRng::seed_from_u64(31);
        let bxdf = MicrofacetTransmission::new(
            Spectrum::ONE,
            TrowbridgeReitz::isotropic(0.3),
            1.0,
            1.5,
        );
        let mut accepted = 0;
        for _ in 0..20_000 {
            let wo = uniform_sample_sphere(random_u(&mut rng));
            let Some(s) = bxdf.sample_f(wo, random_u(&mut rng)) else {
                continue;
            };
            assert!(
                !same_hemisphere(wo, s.wi),
                "wo = {:?} and wi = {:?} on the same side",
                wo,
                s.wi
            );
            assert!(s.pdf > 0.0, "accepted sample with pdf {}", s.pdf);
            accepted += 1;
        }
        assert!(accepted > 5_000, "only {} samples accepted", accepted);
    }

    #[test]
    fn test_transmission_rejects_reflection_pairs() {
        let bxdf = MicrofacetTransmission::new(
            Spectrum::ONE,
            TrowbridgeReitz::isotropic(0.3),
            1.0,
            1.5,
        );
        let wo = Vec3::new(0.2, 0.0, 0.9).normalize();
        let wi = Vec3::new(-0.2, 0.0, 0.9).normalize();
        assert!(bxdf.f(wo, wi).is_black());
        assert_eq!(bxdf.pdf(wo, wi), 0.0);
    }
}
