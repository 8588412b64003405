//! Warps from the unit square to directions and points, with densities.

use kestrel_math::{Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

pub const INV_PI: f32 = 1.0 / PI;
pub const INV_2PI: f32 = 1.0 / (2.0 * PI);
pub const INV_4PI: f32 = 1.0 / (4.0 * PI);

/// Uniform direction on the +Z hemisphere.
pub fn uniform_sample_hemisphere(u: Vec2) -> Vec3 {
    let z = u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

#[inline]
pub fn uniform_hemisphere_pdf() -> f32 {
    INV_2PI
}

/// Uniform direction on the unit sphere.
pub fn uniform_sample_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

#[inline]
pub fn uniform_sphere_pdf() -> f32 {
    INV_4PI
}

/// Uniform point on the unit disk by polar mapping.
pub fn uniform_sample_disk(u: Vec2) -> Vec2 {
    let r = u.x.sqrt();
    let theta = 2.0 * PI * u.y;
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Shirley-Chiu concentric mapping onto the unit disk.
pub fn concentric_sample_disk(u: Vec2) -> Vec2 {
    let offset = 2.0 * u - Vec2::ONE;
    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (offset.y, FRAC_PI_2 - FRAC_PI_4 * (offset.x / offset.y))
    };
    r * Vec2::new(theta.cos(), theta.sin())
}

/// Cosine-weighted direction on the +Z hemisphere (Malley's method).
pub fn cosine_sample_hemisphere(u: Vec2) -> Vec3 {
    let d = concentric_sample_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta * INV_PI
}

/// Balance heuristic weight for `nf` samples from `f_pdf` against `g`.
#[inline]
pub fn balance_heuristic(nf: u32, f_pdf: f32, ng: u32, g_pdf: f32) -> f32 {
    let f = nf as f32 * f_pdf;
    let g = ng as f32 * g_pdf;
    f / (f + g)
}

/// Power heuristic with exponent 2.
#[inline]
pub fn power_heuristic(nf: u32, f_pdf: f32, ng: u32, g_pdf: f32) -> f32 {
    let f = nf as f32 * f_pdf;
    let g = ng as f32 * g_pdf;
    (f * f) / (f * f + g * g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_u(rng: &mut StdRng) -> Vec2 {
        Vec2::new(rng.gen(), rng.gen())
    }

    #[test]
    fn test_cosine_hemisphere_is_unit_and_upper() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let w = cosine_sample_hemisphere(random_u(&mut rng));
            assert!((w.length() - 1.0).abs() < 1e-4, "w = {:?}", w);
            assert!(w.z >= 0.0);
        }
    }

    #[test]
    fn test_cosine_hemisphere_mean_cos() {
        // E[cos] under p = cos/pi is 2/3
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let mean: f32 = (0..n)
            .map(|_| cosine_sample_hemisphere(random_u(&mut rng)).z)
            .sum::<f32>()
            / n as f32;
        assert!((mean - 2.0 / 3.0).abs() < 0.01, "mean = {}", mean);
    }

    #[test]
    fn test_concentric_disk_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let d = concentric_sample_disk(random_u(&mut rng));
            assert!(d.length() <= 1.0 + 1e-5);
        }
        assert_eq!(concentric_sample_disk(Vec2::splat(0.5)), Vec2::ZERO);
    }

    #[test]
    fn test_uniform_sphere_covers_both_hemispheres() {
        assert!((uniform_sample_sphere(Vec2::new(0.0, 0.0)).z - 1.0).abs() < 1e-6);
        assert!((uniform_sample_sphere(Vec2::new(1.0, 0.0)).z + 1.0).abs() < 1e-6);
        assert!((uniform_sphere_pdf() * 4.0 * PI - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_heuristics() {
        assert!((balance_heuristic(1, 1.0, 1, 1.0) - 0.5).abs() < 1e-6);
        assert!((power_heuristic(1, 2.0, 1, 1.0) - 0.8).abs() < 1e-6);
        assert!((balance_heuristic(1, 2.0, 1, 1.0) - 2.0 / 3.0).abs() < 1e-6);
    }
}
