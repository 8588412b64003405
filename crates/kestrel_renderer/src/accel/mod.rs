//! Ray/scene intersection engines.
//!
//! The integrators only see the [`Intersector`] trait. A hit is reported as
//! indices into the scene plus barycentrics; turning that into a shading
//! point is the scene's job.

mod bvh;
#[cfg(feature = "embree")]
mod embree;

pub use bvh::{intersect_triangle, Bvh, BvhIntersector};
#[cfg(feature = "embree")]
pub use embree::EmbreeIntersector;

use kestrel_math::Aabb;
use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::ray::Ray;
use crate::scene::{GeometryCollection, Instance};

/// Nearest hit along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub instance: usize,
    /// Geometry within the instance's collection
    pub geometry: usize,
    /// Triangle within the geometry
    pub primitive: usize,
    /// Barycentric weight of the second vertex
    pub u: f32,
    /// Barycentric weight of the third vertex
    pub v: f32,
    pub t: f32,
}

/// Nearest-hit and any-hit queries against a built scene.
///
/// Implementations are read-only after construction and are queried from
/// every render thread at once.
pub trait Intersector: Send + Sync {
    /// Nearest hit in `[t_min, t_max)`. On a hit `ray.t_max` is narrowed to
    /// the hit distance.
    fn intersect(&self, ray: &mut Ray) -> Option<Hit>;

    /// True when anything lies in `[t_min, t_max)`.
    fn occluded(&self, ray: &Ray) -> bool;

    /// World-space bounds of everything in the scene.
    fn bounds(&self) -> Aabb;
}

/// Which intersection engine a scene is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Bvh,
    Embree,
}

impl Backend {
    pub(crate) fn build(
        self,
        collections: &[GeometryCollection],
        instances: &[Instance],
    ) -> Result<Box<dyn Intersector>, SceneError> {
        match self {
            Backend::Bvh => Ok(Box::new(BvhIntersector::new(collections, instances))),
            #[cfg(feature = "embree")]
            Backend::Embree => Ok(Box::new(EmbreeIntersector::new(collections, instances)?)),
            #[cfg(not(feature = "embree"))]
            Backend::Embree => Err(SceneError::Device(
                "kestrel_renderer was built without the `embree` feature".to_string(),
            )),
        }
    }
}
