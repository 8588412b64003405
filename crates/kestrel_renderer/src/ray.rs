//! Ray type shared by the integrators and the intersection engine.

use kestrel_math::{Interval, Vec3};

use crate::medium::MediumId;

/// A ray segment `origin + t * direction` for `t` in `[t_min, t_max)`.
///
/// `t_max` is narrowed to the hit distance by
/// [`Intersector::intersect`](crate::accel::Intersector::intersect), so an
/// occlusion test on the same ray afterwards is clipped to the hit.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    /// Not necessarily normalized
    pub direction: Vec3,
    pub t_min: f32,
    pub t_max: f32,
    pub time: f32,
    /// Medium the origin lies in
    pub medium: Option<MediumId>,
}

impl Ray {
    /// Unbounded ray at time 0 in vacuum.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            t_min: 0.0,
            t_max: f32::INFINITY,
            time: 0.0,
            medium: None,
        }
    }

    #[inline]
    pub fn with_medium(mut self, medium: Option<MediumId>) -> Self {
        self.medium = medium;
        self
    }

    #[inline]
    pub fn with_segment(mut self, t_min: f32, t_max: f32) -> Self {
        self.t_min = t_min;
        self.t_max = t_max;
        self
    }

    #[inline]
    pub fn with_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    /// P(t) = origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }

    /// Current valid parametric range.
    #[inline]
    pub fn interval(&self) -> Interval {
        Interval::new(self.t_min, self.t_max)
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Z)
    }
}
