//! Pinhole camera.

use kestrel_math::Vec3;

use crate::medium::MediumId;
use crate::ray::Ray;

/// Pinhole camera mapping film coordinates to primary rays.
///
/// Every builder method recomputes the cached viewport, so a camera is
/// always ready to generate rays.
#[derive(Debug, Clone)]
pub struct Camera {
    image_width: u32,
    image_height: u32,

    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,
    /// Vertical field of view in degrees
    vfov: f32,
    medium: Option<MediumId>,

    // cached by initialize()
    upper_left: Vec3,
    viewport_u: Vec3,
    viewport_v: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
}

impl Camera {
    pub fn new() -> Self {
        let mut camera = Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            medium: None,
            upper_left: Vec3::ZERO,
            viewport_u: Vec3::ZERO,
            viewport_v: Vec3::ZERO,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
        };
        camera.initialize();
        camera
    }

    /// Film resolution; only the aspect ratio matters to the camera.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self.initialize();
        self
    }

    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialize();
        self
    }

    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self.initialize();
        self
    }

    /// Medium the camera sits in.
    pub fn with_medium(mut self, medium: Option<MediumId>) -> Self {
        self.medium = medium;
        self
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    pub fn position(&self) -> Vec3 {
        self.look_from
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        -self.w
    }

    fn initialize(&mut self) {
        let theta = self.vfov.to_radians();
        let viewport_height = 2.0 * (theta / 2.0).tan();
        let viewport_width = viewport_height * (self.image_width as f32 / self.image_height as f32);

        self.w = (self.look_from - self.look_at).normalize();
        self.u = self.vup.cross(self.w).normalize();
        self.v = self.w.cross(self.u);

        // film y grows downwards
        self.viewport_u = viewport_width * self.u;
        self.viewport_v = -viewport_height * self.v;
        self.upper_left = self.look_from - self.w - self.viewport_u / 2.0 - self.viewport_v / 2.0;
    }

    /// Primary ray through film position `(s, t)`, both in `[0, 1]`, with
    /// `(0, 0)` at the top-left corner.
    pub fn generate_ray(&self, s: f32, t: f32) -> Ray {
        let target = self.upper_left + s * self.viewport_u + t * self.viewport_v;
        Ray::new(self.look_from, (target - self.look_from).normalize()).with_medium(self.medium)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
