//! Debug view of surface normals.

use serde::{Deserialize, Serialize};

use crate::ray::Ray;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::Spectrum;

use super::Integrator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalView {
    #[default]
    Geometric,
    Shading,
}

/// Writes `|n|` of the first hit as an RGB color.
#[derive(Debug, Clone)]
pub struct NormalIntegrator {
    view: NormalView,
}

impl NormalIntegrator {
    pub fn new(view: NormalView) -> Self {
        Self { view }
    }
}

impl Integrator for NormalIntegrator {
    fn li(&self, mut ray: Ray, scene: &Scene, _sampler: &mut dyn Sampler) -> Spectrum {
        let Some(si) = scene.intersect(&mut ray) else {
            return Spectrum::ZERO;
        };
        let n = match self.view {
            NormalView::Geometric => si.geometry_frame.n,
            NormalView::Shading => si.shading_frame.n,
        };
        Spectrum::from_rgb(n.abs())
    }

    fn name(&self) -> &'static str {
        "normals"
    }
}
