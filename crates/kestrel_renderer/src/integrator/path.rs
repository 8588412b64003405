//! Unidirectional path tracing for scenes without participating media.

use crate::bxdf::BxDFType;
use crate::ray::Ray;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::Spectrum;

use super::direct::{uniform_sample_one_light, ScatteringPoint};
use super::{russian_roulette, Integrator, RR_MIN_BOUNCES};

/// Path tracer with next-event estimation at every non-specular vertex.
///
/// Medium boundaries are crossed without counting a bounce. Media
/// themselves are ignored; use [`super::VolPathIntegrator`] for those.
#[derive(Debug, Clone)]
pub struct PathIntegrator {
    max_depth: u32,
    rr_threshold: f32,
}

impl PathIntegrator {
    pub fn new(max_depth: u32, rr_threshold: f32) -> Self {
        Self {
            max_depth,
            rr_threshold,
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

impl Integrator for PathIntegrator {
    fn li(&self, mut ray: Ray, scene: &Scene, sampler: &mut dyn Sampler) -> Spectrum {
        let mut l = Spectrum::ZERO;
        let mut beta = Spectrum::ONE;
        let mut specular_bounce = false;
        let mut bounces = 0;

        loop {
            let Some(si) = scene.intersect(&mut ray) else {
                if bounces == 0 || specular_bounce {
                    for light in scene.lights() {
                        l += beta * light.le(&ray);
                    }
                }
                break;
            };

            if bounces >= self.max_depth {
                break;
            }

            let Some(bsdf) = &si.bsdf else {
                ray = si.skip_boundary(&ray);
                continue;
            };

            if bsdf.has_non_specular() {
                l += beta * uniform_sample_one_light(ScatteringPoint::Surface(&si), scene, sampler, false);
            }

            let Some(bs) = bsdf.sample_f(si.wo(), sampler.get_2d(), BxDFType::ALL) else {
                break;
            };
            beta *= bs.f * bs.wi.dot(si.shading_frame.n).abs() / bs.pdf;
            specular_bounce = bs.is_specular();
            ray = si.spawn_ray(bs.wi);

            if bounces > RR_MIN_BOUNCES && !russian_roulette(&mut beta, self.rr_threshold, sampler.get_1d()) {
                break;
            }
            bounces += 1;
        }

        l
    }

    fn name(&self) -> &'static str {
        "path"
    }
}
