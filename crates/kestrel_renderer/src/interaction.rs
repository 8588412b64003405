//! Path vertices: surface hits and medium scattering events.

use kestrel_math::{Frame, Vec2, Vec3};

use crate::bsdf::Bsdf;
use crate::medium::{HenyeyGreenstein, MediumId, MediumInterface};
use crate::ray::Ray;

/// Distance a spawned ray's origin is pushed off the surface.
pub const RAY_EPSILON: f32 = 1e-4;
/// Shadow rays stop this far short of their target.
pub const SHADOW_EPSILON: f32 = 1e-4;

/// Data common to every vertex.
#[derive(Debug, Clone, Copy)]
pub struct Interaction {
    pub p: Vec3,
    pub time: f32,
    /// Towards the previous vertex
    pub wo: Vec3,
    /// Geometric normal, zero for points that are not on a surface
    pub n: Vec3,
    pub medium_interface: MediumInterface,
}

impl Interaction {
    pub fn new(p: Vec3, wo: Vec3, n: Vec3, time: f32, medium_interface: MediumInterface) -> Self {
        Self {
            p,
            time,
            wo,
            n,
            medium_interface,
        }
    }

    /// A bare point, e.g. the position of a light.
    pub fn from_point(p: Vec3, time: f32) -> Self {
        Self::new(p, Vec3::ZERO, Vec3::ZERO, time, MediumInterface::vacuum())
    }

    /// A vertex inside `medium`.
    pub fn in_medium(p: Vec3, wo: Vec3, time: f32, medium: Option<MediumId>) -> Self {
        Self::new(p, wo, Vec3::ZERO, time, MediumInterface::uniform(medium))
    }

    pub fn is_surface_interaction(&self) -> bool {
        self.n != Vec3::ZERO
    }

    /// Medium a ray leaving in direction `w` starts in.
    pub fn get_medium(&self, w: Vec3) -> Option<MediumId> {
        if self.is_surface_interaction() && w.dot(self.n) > 0.0 {
            self.medium_interface.outside
        } else {
            self.medium_interface.inside
        }
    }

    /// `p` pushed off the surface onto the side `w` leaves through.
    fn offset_origin(&self, w: Vec3) -> Vec3 {
        if !self.is_surface_interaction() {
            return self.p;
        }
        let offset = self.n * RAY_EPSILON;
        if w.dot(self.n) < 0.0 {
            self.p - offset
        } else {
            self.p + offset
        }
    }

    /// Unbounded ray leaving this vertex along `d`.
    pub fn spawn_ray(&self, d: Vec3) -> Ray {
        let d = d.normalize();
        Ray::new(self.offset_origin(d), d)
            .with_time(self.time)
            .with_medium(self.get_medium(d))
    }

    /// Shadow segment from this vertex towards `target`, stopping just
    /// short of it.
    pub fn spawn_ray_to(&self, target: &Interaction) -> Ray {
        let to_target = target.p - self.p;
        let origin = self.offset_origin(to_target);
        let d = target.p - origin;
        let dist = d.length();
        if dist == 0.0 {
            return Ray::new(origin, Vec3::Z)
                .with_segment(0.0, 0.0)
                .with_time(self.time)
                .with_medium(self.get_medium(to_target));
        }
        Ray::new(origin, d / dist)
            .with_segment(0.0, (dist - SHADOW_EPSILON).max(0.0))
            .with_time(self.time)
            .with_medium(self.get_medium(to_target))
    }
}

/// A hit on scene geometry.
#[derive(Debug, Clone)]
pub struct SurfaceInteraction {
    pub interaction: Interaction,
    pub uv: Vec2,
    /// Built from the true triangle normal
    pub geometry_frame: Frame,
    /// Built from interpolated vertex normals when the mesh has them
    pub shading_frame: Frame,
    /// `None` on medium boundaries, which only separate two media
    pub bsdf: Option<Bsdf>,
    pub instance: usize,
    pub geometry: usize,
    pub primitive: usize,
    /// Ray parameter of the hit
    pub t: f32,
}

impl SurfaceInteraction {
    pub fn p(&self) -> Vec3 {
        self.interaction.p
    }

    pub fn wo(&self) -> Vec3 {
        self.interaction.wo
    }

    pub fn spawn_ray(&self, d: Vec3) -> Ray {
        self.interaction.spawn_ray(d)
    }

    /// Continue a ray through a medium boundary without scattering.
    pub fn skip_boundary(&self, ray: &Ray) -> Ray {
        self.interaction.spawn_ray(ray.direction)
    }
}

/// A scattering event inside a participating medium.
#[derive(Debug, Clone, Copy)]
pub struct MediumInteraction {
    pub interaction: Interaction,
    pub phase: HenyeyGreenstein,
}

impl MediumInteraction {
    pub fn new(interaction: Interaction, phase: HenyeyGreenstein) -> Self {
        Self { interaction, phase }
    }

    pub fn p(&self) -> Vec3 {
        self.interaction.p
    }

    pub fn wo(&self) -> Vec3 {
        self.interaction.wo
    }

    pub fn spawn_ray(&self, d: Vec3) -> Ray {
        self.interaction.spawn_ray(d)
    }
}
