//! Ambient occlusion.

use kestrel_math::Frame;
use serde::{Deserialize, Serialize};

use crate::geometry::face_forward;
use crate::ray::Ray;
use crate::sampler::Sampler;
use crate::sampling::{cosine_hemisphere_pdf, cosine_sample_hemisphere, uniform_hemisphere_pdf, uniform_sample_hemisphere};
use crate::scene::Scene;
use crate::spectrum::Spectrum;

use super::Integrator;

/// How occlusion directions are drawn over the hemisphere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AoStrategy {
    Uniform,
    #[default]
    Cosine,
}

/// Cosine-weighted fraction of the hemisphere above the first hit that is
/// open to the sky. An unoccluded point is 1, a fully enclosed one 0.
#[derive(Debug, Clone)]
pub struct AoIntegrator {
    samples: u32,
    strategy: AoStrategy,
}

impl AoIntegrator {
    pub fn new(samples: u32, strategy: AoStrategy) -> Self {
        Self {
            samples: samples.max(1),
            strategy,
        }
    }
}

impl Integrator for AoIntegrator {
    fn li(&self, mut ray: Ray, scene: &Scene, sampler: &mut dyn Sampler) -> Spectrum {
        let Some(si) = scene.intersect(&mut ray) else {
            return Spectrum::ZERO;
        };

        // true geometry, not shading normals
        let n = face_forward(si.geometry_frame.n, -ray.direction);
        let frame = Frame::from_normal(n);

        let mut occlusion = 0.0;
        for _ in 0..self.samples {
            let u = sampler.get_2d();
            let (local, pdf) = match self.strategy {
                AoStrategy::Uniform => (uniform_sample_hemisphere(u), uniform_hemisphere_pdf()),
                AoStrategy::Cosine => {
                    let w = cosine_sample_hemisphere(u);
                    (w, cosine_hemisphere_pdf(w.z.abs()))
                }
            };
            if pdf <= 0.0 {
                continue;
            }

            let wi = frame.to_world(local);
            if !scene.occluded(&si.spawn_ray(wi)) {
                occlusion += wi.dot(n) / pdf;
            }
        }

        Spectrum::splat(occlusion / (self.samples as f32 * std::f32::consts::PI))
    }

    fn name(&self) -> &'static str {
        "ao"
    }
}
