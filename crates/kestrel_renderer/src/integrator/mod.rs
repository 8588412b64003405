//! Radiance estimators.
//!
//! An integrator answers one question: how much radiance arrives along a
//! camera ray. The render loop averages its answers over the samples of a
//! pixel.

mod ao;
mod direct;
#[cfg(test)]
mod fixtures;
mod normal;
mod path;
mod volpath;

pub use ao::{AoIntegrator, AoStrategy};
pub use direct::{estimate_direct, uniform_sample_one_light, ScatteringPoint};
pub use normal::{NormalIntegrator, NormalView};
pub use path::PathIntegrator;
pub use volpath::VolPathIntegrator;

use crate::ray::Ray;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::Spectrum;

/// Paths shorter than this never face Russian roulette.
pub const RR_MIN_BOUNCES: u32 = 3;

/// Estimates incident radiance along camera rays.
///
/// Integrators hold configuration only and are shared by every render
/// thread. All per-path state lives on the stack of [`Integrator::li`].
pub trait Integrator: Send + Sync {
    fn li(&self, ray: Ray, scene: &Scene, sampler: &mut dyn Sampler) -> Spectrum;

    fn name(&self) -> &'static str;
}

/// Russian roulette on path throughput.
///
/// Paths whose brightest channel is below `threshold` survive with
/// probability `1 - q`, `q = max(0.05, 1 - max(beta))`, and survivors are
/// reweighted by `1 / (1 - q)` so the expected throughput is unchanged.
/// Returns false when the path should stop.
pub fn russian_roulette(beta: &mut Spectrum, threshold: f32, u: f32) -> bool {
    let max_component = beta.max_component();
    if max_component >= threshold {
        return true;
    }
    let q = (1.0 - max_component).max(0.05);
    if u < q {
        return false;
    }
    *beta /= 1.0 - q;
    true
}
