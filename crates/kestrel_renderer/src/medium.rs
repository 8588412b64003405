//! Participating media and the Henyey-Greenstein phase function.

use std::fmt::Debug;
use std::f32::consts::PI;

use kestrel_math::{coordinate_system, Vec2, Vec3};

use crate::geometry::spherical_direction;
use crate::interaction::{Interaction, MediumInteraction};
use crate::ray::Ray;
use crate::sampler::Sampler;
use crate::sampling::INV_4PI;
use crate::spectrum::{Spectrum, SPECTRUM_SAMPLES};

/// Index of a medium in the scene's medium arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediumId(pub usize);

/// Media on both sides of a surface. `None` is vacuum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediumInterface {
    pub inside: Option<MediumId>,
    pub outside: Option<MediumId>,
}

impl MediumInterface {
    pub fn new(inside: Option<MediumId>, outside: Option<MediumId>) -> Self {
        Self { inside, outside }
    }

    /// The same medium on both sides.
    pub fn uniform(medium: Option<MediumId>) -> Self {
        Self {
            inside: medium,
            outside: medium,
        }
    }

    pub fn vacuum() -> Self {
        Self::default()
    }

    /// True when crossing the surface changes the medium.
    pub fn is_transition(&self) -> bool {
        self.inside != self.outside
    }
}

/// HG phase value for the cosine between `wo` and `wi`.
#[inline]
pub fn phase_hg(cos_theta: f32, g: f32) -> f32 {
    let denom = 1.0 + g * g + 2.0 * g * cos_theta;
    INV_4PI * (1.0 - g * g) / (denom * denom.sqrt())
}

/// Henyey-Greenstein phase function with asymmetry `g` in (-1, 1).
///
/// Both `wo` and `wi` point away from the scattering point, so `g > 0`
/// favours forward scattering (`wi` close to `-wo`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HenyeyGreenstein {
    pub g: f32,
}

impl HenyeyGreenstein {
    pub fn new(g: f32) -> Self {
        Self { g }
    }

    pub fn p(&self, wo: Vec3, wi: Vec3) -> f32 {
        phase_hg(wo.dot(wi), self.g)
    }

    /// Draw `wi` by inverting the HG distribution. Returns `(phase, wi)`;
    /// the phase value doubles as the pdf.
    pub fn sample_p(&self, wo: Vec3, u: Vec2) -> (f32, Vec3) {
        let g = self.g;
        let cos_theta = if g.abs() < 1e-3 {
            1.0 - 2.0 * u.x
        } else {
            let sqr_term = (1.0 - g * g) / (1.0 + g - 2.0 * g * u.x);
            -(1.0 + g * g - sqr_term * sqr_term) / (2.0 * g)
        };

        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = 2.0 * PI * u.y;
        let (v1, v2) = coordinate_system(wo);
        let wi = spherical_direction(sin_theta, cos_theta, phi, v1, v2, wo);
        (phase_hg(cos_theta, g), wi)
    }
}

/// A region of space that absorbs and scatters light.
pub trait Medium: Send + Sync + Debug {
    /// Beam transmittance along `ray` up to `t_max`.
    fn tr(&self, ray: &Ray, sampler: &mut dyn Sampler) -> Spectrum;

    /// Free-flight sampling along `ray`.
    ///
    /// Returns the path throughput weight and, when the flight ended inside
    /// the medium before `t_max`, the scattering vertex.
    fn sample(&self, ray: &Ray, sampler: &mut dyn Sampler) -> (Spectrum, Option<MediumInteraction>);
}

/// Medium with constant coefficients everywhere.
#[derive(Debug, Clone)]
pub struct HomogeneousMedium {
    sigma_a: Spectrum,
    sigma_s: Spectrum,
    sigma_t: Spectrum,
    g: f32,
}

impl HomogeneousMedium {
    pub fn new(sigma_a: Spectrum, sigma_s: Spectrum, g: f32) -> Self {
        Self {
            sigma_a,
            sigma_s,
            sigma_t: sigma_a + sigma_s,
            g,
        }
    }

    pub fn sigma_a(&self) -> Spectrum {
        self.sigma_a
    }

    pub fn sigma_s(&self) -> Spectrum {
        self.sigma_s
    }

    pub fn sigma_t(&self) -> Spectrum {
        self.sigma_t
    }

    pub fn phase(&self) -> HenyeyGreenstein {
        HenyeyGreenstein::new(self.g)
    }

    /// exp(-sigma_t * distance) per channel. A clear channel stays at 1
    /// even for infinite distances.
    fn transmittance(&self, distance: f32) -> Spectrum {
        self.sigma_t
            .map(|s| if s == 0.0 { 1.0 } else { (-s * distance).exp() })
    }
}

impl Medium for HomogeneousMedium {
    fn tr(&self, ray: &Ray, _sampler: &mut dyn Sampler) -> Spectrum {
        self.transmittance(ray.t_max * ray.direction.length())
    }

    fn sample(&self, ray: &Ray, sampler: &mut dyn Sampler) -> (Spectrum, Option<MediumInteraction>) {
        let channel = ((sampler.get_1d() * SPECTRUM_SAMPLES as f32) as usize).min(SPECTRUM_SAMPLES - 1);
        let length = ray.direction.length();
        let dist = -(1.0 - sampler.get_1d()).ln() / self.sigma_t[channel];
        let t = (dist / length).min(ray.t_max);
        let sampled_medium = t < ray.t_max;

        let tr = self.transmittance(t * length);
        let density = if sampled_medium { self.sigma_t * tr } else { tr };
        let mut pdf = density.average();
        if pdf == 0.0 {
            pdf = 1.0;
        }

        if sampled_medium {
            let interaction = Interaction::in_medium(ray.at(t), -ray.direction, ray.time, ray.medium);
            let mi = MediumInteraction::new(interaction, self.phase());
            (tr * self.sigma_s / pdf, Some(mi))
        } else {
            (tr / pdf, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::RandomSampler;
    use crate::sampling::uniform_sample_sphere;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_medium_interface_transition() {
        assert!(!MediumInterface::vacuum().is_transition());
        assert!(!MediumInterface::uniform(Some(MediumId(0))).is_transition());
        assert!(MediumInterface::new(Some(MediumId(0)), None).is_transition());
        assert!(MediumInterface::new(Some(MediumId(0)), Some(MediumId(1))).is_transition());
    }

    #[test]
    fn test_phase_hg_normalized() {
        let mut rng = StdRng::seed_from_u64(5);
        for g in [-0.5, 0.0, 0.3, 0.5] {
            let n = 100_000;
            let wo = Vec3::Z;
            let mut sum = 0.0;
            for _ in 0..n {
                let wi = uniform_sample_sphere(Vec2::new(rng.gen(), rng.gen()));
                sum += phase_hg(wo.dot(wi), g) / INV_4PI;
            }
            let integral = sum / n as f32;
            assert!((integral - 1.0).abs() < 0.05, "g = {}: integral = {}", g, integral);
        }
    }

    #[test]
    fn test_sample_p_matches_p() {
        let mut rng = StdRng::seed_from_u64(8);
        for g in [0.0, 0.0005, -0.4, 0.8] {
            let hg = HenyeyGreenstein::new(g);
            let wo = Vec3::new(0.2, -0.3, 0.9).normalize();
            for _ in 0..500 {
                let (phase, wi) = hg.sample_p(wo, Vec2::new(rng.gen(), rng.gen()));
                assert!((wi.length() - 1.0).abs() < 1e-4);
                let p = hg.p(wo, wi);
                assert!((phase - p).abs() <= 1e-3 * p.max(1.0), "g = {}: {} vs {}", g, phase, p);
            }
        }
    }

    #[test]
    fn test_clear_medium_has_unit_transmittance() {
        let medium = HomogeneousMedium::new(Spectrum::ZERO, Spectrum::ZERO, 0.0);
        let mut sampler = RandomSampler::new(1, 0);

        for t_max in [0.0, 1.0, 1e6, f32::INFINITY] {
            let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0)).with_segment(0.0, t_max);
            let tr = medium.tr(&ray, &mut sampler);
            assert_eq!(tr, Spectrum::ONE, "t_max = {}", t_max);

            let (weight, mi) = medium.sample(&ray, &mut sampler);
            assert!(mi.is_none());
            assert_eq!(weight, Spectrum::ONE);
        }
    }

    #[test]
    fn test_transmittance_beer_lambert() {
        let medium = HomogeneousMedium::new(Spectrum::splat(0.25), Spectrum::splat(0.25), 0.0);
        let mut sampler = RandomSampler::new(1, 0);
        // direction length 2, so distance is 4
        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)).with_segment(0.0, 2.0);
        let tr = medium.tr(&ray, &mut sampler);
        assert!((tr[0] - (-2.0f32).exp()).abs() < 1e-6, "tr = {}", tr[0]);
    }

    #[test]
    fn test_free_flight_estimator_is_unbiased() {
        // E[weight] over surface-reached events must equal Tr to the surface
        let medium = HomogeneousMedium::new(Spectrum::splat(0.2), Spectrum::splat(0.3), 0.0);
        let mut sampler = RandomSampler::new(1, 17);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z).with_segment(0.0, 2.0);

        let n = 50_000;
        let mut surface = 0.0;
        let mut scattered = 0;
        for _ in 0..n {
            let (weight, mi) = medium.sample(&ray, &mut sampler);
            match mi {
                Some(mi) => {
                    scattered += 1;
                    assert!(mi.interaction.p.z < 2.0);
                    // sigma_s / sigma_t
                    assert!((weight[0] - 0.6).abs() < 1e-4, "weight = {}", weight[0]);
                }
                None => surface += weight[0],
            }
        }
        let estimate = surface / n as f32;
        let expected = (-1.0f32).exp();
        assert!((estimate - expected).abs() < 0.01, "{} vs {}", estimate, expected);
        assert!(scattered > 0);
    }
}
