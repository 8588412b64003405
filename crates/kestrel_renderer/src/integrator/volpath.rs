//! Path tracing through participating media.

use crate::bxdf::BxDFType;
use crate::ray::Ray;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::Spectrum;

use super::direct::{uniform_sample_one_light, ScatteringPoint};
use super::{russian_roulette, Integrator, RR_MIN_BOUNCES};

/// Volumetric path tracer.
///
/// Every segment is first handed to the medium the ray travels through,
/// which either places a scattering vertex before the next surface or
/// returns the transmittance weight for reaching it. Shadow rays carry
/// transmittance through media and across medium boundaries.
#[derive(Debug, Clone)]
pub struct VolPathIntegrator {
    max_depth: u32,
    rr_threshold: f32,
}

impl VolPathIntegrator {
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

impl Integrator for VolPathIntegrator {
    fn li(&self, mut ray: Ray, scene: &Scene, sampler: &mut dyn Sampler) -> Spectrum {
        let mut l = Spectrum::ZERO;
        let mut beta = Spectrum::ONE;
        let mut specular_bounce = false;
        let mut bounces = 0;

        loop {
            let hit = scene.intersect(&mut ray);

            let mut medium_event = None;
            if let Some(medium) = ray.medium.and_then(|id| scene.medium(id)) {
                let (weight, mi) = medium.sample(&ray, sampler);
                beta *= weight;
                medium_event = mi;
            }
            if beta.is_black() {
                break;
            }

            if let Some(mi) = medium_event {
                if bounces >= self.max_depth {
                    break;
                }
                l += beta * uniform_sample_one_light(ScatteringPoint::Medium(&mi), scene, sampler, true);

                // phase sampling is exact, so the weight is one
                let (_, wi) = mi.phase.sample_p(mi.wo(), sampler.get_2d());
                ray = mi.spawn_ray(wi);
                specular_bounce = false;
            } else {
                let Some(si) = hit else {
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
                    l += beta * uniform_sample_one_light(ScatteringPoint::Surface(&si), scene, sampler, true);
                }

                let Some(bs) = bsdf.sample_f(si.wo(), sampler.get_2d(), BxDFType::ALL) else {
                    break;
                };
                beta *= bs.f * bs.wi.dot(si.shading_frame.n).abs() / bs.pdf;
                specular_bounce = bs.is_specular();
                ray = si.spawn_ray(bs.wi);
            }

            if bounces > RR_MIN_BOUNCES && !russian_roulette(&mut beta, self.rr_threshold, sampler.get_1d()) {
                break;
            }
            bounces += 1;
        }

        l
    }

    fn name(&self) -> &'static str {
        "volpath"
    }
}
