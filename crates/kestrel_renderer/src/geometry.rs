//! Shading-space trigonometry.
//!
//! Directions handed to a BxDF live in a local frame where the shading
//! normal is +Z, so angles fall out of the components directly.

use kestrel_math::Vec3;

#[inline]
pub fn cos_theta(w: Vec3) -> f32 {
    w.z
}

#[inline]
pub fn cos2_theta(w: Vec3) -> f32 {
    w.z * w.z
}

#[inline]
pub fn abs_cos_theta(w: Vec3) -> f32 {
    w.z.abs()
}

#[inline]
pub fn sin2_theta(w: Vec3) -> f32 {
    (1.0 - cos2_theta(w)).max(0.0)
}

#[inline]
pub fn sin_theta(w: Vec3) -> f32 {
    sin2_theta(w).sqrt()
}

#[inline]
pub fn tan_theta(w: Vec3) -> f32 {
    sin_theta(w) / cos_theta(w)
}

#[inline]
pub fn tan2_theta(w: Vec3) -> f32 {
    sin2_theta(w) / cos2_theta(w)
}

#[inline]
pub fn cos_phi(w: Vec3) -> f32 {
    let sin_theta = sin_theta(w);
    if sin_theta == 0.0 {
        1.0
    } else {
        (w.x / sin_theta).clamp(-1.0, 1.0)
    }
}

#[inline]
pub fn sin_phi(w: Vec3) -> f32 {
    let sin_theta = sin_theta(w);
    if sin_theta == 0.0 {
        0.0
    } else {
        (w.y / sin_theta).clamp(-1.0, 1.0)
    }
}

#[inline]
pub fn cos2_phi(w: Vec3) -> f32 {
    cos_phi(w) * cos_phi(w)
}

#[inline]
pub fn sin2_phi(w: Vec3) -> f32 {
    sin_phi(w) * sin_phi(w)
}

#[inline]
pub fn same_hemisphere(w: Vec3, wp: Vec3) -> bool {
    w.z * wp.z > 0.0
}

/// Mirror `wo` about `n`. Both point away from the surface.
#[inline]
pub fn reflect(wo: Vec3, n: Vec3) -> Vec3 {
    -wo + 2.0 * wo.dot(n) * n
}

/// Refract `wi` through a surface with normal `n` on the incident side.
///
/// `eta` is the ratio of the incident over the transmitted index. Returns
/// `None` on total internal reflection.
pub fn refract(wi: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_theta_i = n.dot(wi);
    let sin2_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0);
    let sin2_theta_t = eta * eta * sin2_theta_i;
    if sin2_theta_t >= 1.0 {
        return None;
    }
    let cos_theta_t = (1.0 - sin2_theta_t).sqrt();
    Some(eta * -wi + (eta * cos_theta_i - cos_theta_t) * n)
}

/// Flip `n` onto the same side as `v`.
#[inline]
pub fn face_forward(n: Vec3, v: Vec3) -> Vec3 {
    if n.dot(v) < 0.0 {
        -n
    } else {
        n
    }
}

/// Direction from spherical angles in the frame `(x, y, z)`.
#[inline]
pub fn spherical_direction(sin_theta: f32, cos_theta: f32, phi: f32, x: Vec3, y: Vec3, z: Vec3) -> Vec3 {
    sin_theta * phi.cos() * x + sin_theta * phi.sin() * y + cos_theta * z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_about_z() {
        let wo = Vec3::new(0.3, -0.4, 0.866).normalize();
        let wi = reflect(wo, Vec3::Z);
        assert!((wi - Vec3::new(-wo.x, -wo.y, wo.z)).length() < 1e-6);
    }

    #[test]
    fn test_refract_straight_through() {
        let wt = refract(Vec3::Z, Vec3::Z, 1.0 / 1.5).unwrap();
        assert!((wt + Vec3::Z).length() < 1e-6, "wt = {:?}", wt);
    }

    #[test]
    fn test_refract_snell() {
        let eta = 1.0 / 1.5;
        let wi = Vec3::new(0.5, 0.0, 0.75f32.sqrt());
        let wt = refract(wi, Vec3::Z, eta).unwrap();

        assert!((wt.length() - 1.0).abs() < 1e-5);
        assert!(wt.z < 0.0);
        // n_i sin(theta_i) == n_t sin(theta_t)
        assert!((sin_theta(wi) - 1.5 * sin_theta(wt)).abs() < 1e-5);
    }

    #[test]
    fn test_total_internal_reflection() {
        let grazing = Vec3::new(0.9, 0.0, 0.19f32.sqrt());
        assert!(refract(grazing, Vec3::Z, 1.5).is_none());
    }

    #[test]
    fn test_phi_at_pole() {
        assert_eq!(cos_phi(Vec3::Z), 1.0);
        assert_eq!(sin_phi(Vec3::Z), 0.0);
        assert_eq!(tan2_theta(Vec3::Z), 0.0);
    }

    #[test]
    fn test_face_forward() {
        assert_eq!(face_forward(Vec3::Z, -Vec3::Z), -Vec3::Z);
        assert_eq!(face_forward(Vec3::Z, Vec3::new(0.1, 0.0, 0.1)), Vec3::Z);
    }
}
