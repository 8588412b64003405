//! Fresnel reflectance.

use crate::spectrum::Spectrum;

/// Fresnel reflectance of a dielectric interface for unpolarized light.
///
/// `cos_theta_i` is measured on the side of `eta_i`; a negative value means
/// the ray arrives from the other side and the indices are swapped.
pub fn fr_dielectric(cos_theta_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    let mut cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    let (mut eta_i, mut eta_t) = (eta_i, eta_t);
    if cos_theta_i <= 0.0 {
        std::mem::swap(&mut eta_i, &mut eta_t);
        cos_theta_i = cos_theta_i.abs();
    }

    let sin_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0).sqrt();
    let sin_theta_t = eta_i / eta_t * sin_theta_i;
    if sin_theta_t >= 1.0 {
        // total internal reflection
        return 1.0;
    }
    let cos_theta_t = (1.0 - sin_theta_t * sin_theta_t).max(0.0).sqrt();

    let r_parl = (eta_t * cos_theta_i - eta_i * cos_theta_t) / (eta_t * cos_theta_i + eta_i * cos_theta_t);
    let r_perp = (eta_i * cos_theta_i - eta_t * cos_theta_t) / (eta_i * cos_theta_i + eta_t * cos_theta_t);
    (r_parl * r_parl + r_perp * r_perp) / 2.0
}

/// Fresnel reflectance at a conductor with absorption coefficient `k`.
pub fn fr_conductor(cos_theta_i: f32, eta_i: Spectrum, eta_t: Spectrum, k: Spectrum) -> Spectrum {
    let cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    let eta = eta_t / eta_i;
    let eta_k = k / eta_i;

    let cos2 = cos_theta_i * cos_theta_i;
    let sin2 = 1.0 - cos2;
    let eta2 = eta * eta;
    let eta_k2 = eta_k * eta_k;

    let t0 = eta2 - eta_k2 - sin2;
    let a2_plus_b2 = (t0 * t0 + eta2 * eta_k2 * 4.0).sqrt();
    let t1 = a2_plus_b2 + cos2;
    let a = ((a2_plus_b2 + t0) * 0.5).sqrt();
    let t2 = a * (2.0 * cos_theta_i);
    let rs = (t1 - t2) / (t1 + t2);

    let t3 = a2_plus_b2 * cos2 + sin2 * sin2;
    let t4 = t2 * sin2;
    let rp = rs * (t3 - t4) / (t3 + t4);

    (rp + rs) * 0.5
}

/// `(1 - cos)^5`, the interpolation weight in Schlick's approximation.
#[inline]
pub fn schlick_weight(cos_theta: f32) -> f32 {
    let m = (1.0 - cos_theta).clamp(0.0, 1.0);
    let m2 = m * m;
    m2 * m2 * m
}

/// Schlick's approximation around reflectance `r0` at normal incidence.
#[inline]
pub fn fr_schlick(r0: Spectrum, cos_theta: f32) -> Spectrum {
    Spectrum::lerp(r0, Spectrum::ONE, schlick_weight(cos_theta))
}

/// Fresnel term attached to a microfacet lobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Fresnel {
    /// Reflects everything.
    NoOp,
    Dielectric { eta_i: f32, eta_t: f32 },
    Conductor {
        eta_i: Spectrum,
        eta_t: Spectrum,
        k: Spectrum,
    },
}

impl Fresnel {
    pub fn evaluate(&self, cos_theta_i: f32) -> Spectrum {
        match *self {
            Fresnel::NoOp => Spectrum::ONE,
            Fresnel::Dielectric { eta_i, eta_t } => {
                Spectrum::splat(fr_dielectric(cos_theta_i, eta_i, eta_t))
            }
            Fresnel::Conductor { eta_i, eta_t, k } => {
                fr_conductor(cos_theta_i.abs(), eta_i, eta_t, k)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dielectric_normal_incidence() {
        // ((1.5 - 1) / (1.5 + 1))^2
        let f = fr_dielectric(1.0, 1.0, 1.5);
        assert!((f - 0.04).abs() < 1e-5, "F = {}", f);
    }

    #[test]
    fn test_dielectric_is_symmetric_at_normal_incidence() {
        let outside = fr_dielectric(1.0, 1.0, 1.5);
        let inside = fr_dielectric(-1.0, 1.0, 1.5);
        assert!((outside - inside).abs() < 1e-6);
    }

    #[test]
    fn test_dielectric_total_internal_reflection() {
        // leaving glass at a grazing angle
        assert_eq!(fr_dielectric(-0.1, 1.0, 1.5), 1.0);
    }

    #[test]
    fn test_dielectric_grazing_is_one() {
        let f = fr_dielectric(0.0, 1.0, 1.5);
        assert!((f - 1.0).abs() < 1e-5, "F = {}", f);
    }

    #[test]
    fn test_conductor_without_absorption_matches_dielectric() {
        let f = fr_conductor(1.0, Spectrum::ONE, Spectrum::splat(1.5), Spectrum::ZERO);
        for i in 0..crate::spectrum::SPECTRUM_SAMPLES {
            assert!((f[i] - 0.04).abs() < 1e-4, "F[{}] = {}", i, f[i]);
        }
    }

    #[test]
    fn test_schlick_endpoints() {
        assert_eq!(schlick_weight(1.0), 0.0);
        assert_eq!(schlick_weight(0.0), 1.0);
        let r0 = Spectrum::splat(0.04);
        assert!((fr_schlick(r0, 1.0)[0] - 0.04).abs() < 1e-6);
        assert!((fr_schlick(r0, 0.0)[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_noop_reflects_everything() {
        assert_eq!(Fresnel::NoOp.evaluate(0.3), Spectrum::ONE);
    }
}
