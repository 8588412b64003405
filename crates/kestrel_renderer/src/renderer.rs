//! Parallel render loop and its configuration.
//!
//! Tiles are distributed over the rayon pool. Every tile renders with its
//! own clone of the template sampler and writes only its own pixels, so the
//! scene, camera and integrator are the only shared state besides the
//! progress counter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::film::ImageBuffer;
use crate::integrator::{
    AoIntegrator, AoStrategy, Integrator, NormalIntegrator, NormalView, PathIntegrator, VolPathIntegrator,
};
use crate::sampler::{RandomSampler, Sampler, SobolSampler};
use crate::scene::Scene;
use crate::tile::{generate_tiles, render_tile, TileResult, DEFAULT_TILE_SIZE};

/// Which estimator computes pixel radiance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegratorKind {
    #[default]
    Path,
    VolPath,
    AmbientOcclusion { samples: u32, cosine: bool },
    Normals { shading: bool },
}

/// Which sample generator drives the estimators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    #[default]
    Random,
    /// Owen-scrambled Sobol'; rounds `samples_per_pixel` up to a power of two
    Sobol,
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    /// Tile edge in pixels
    pub tile_size: u32,
    /// Maximum number of scattering events per path
    pub max_depth: u32,
    /// Russian roulette only touches paths whose throughput falls below this
    pub rr_threshold: f32,
    pub integrator: IntegratorKind,
    pub sampler: SamplerKind,
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            samples_per_pixel: 16,
            tile_size: DEFAULT_TILE_SIZE,
            max_depth: 5,
            rr_threshold: 1.0,
            integrator: IntegratorKind::Path,
            sampler: SamplerKind::Random,
            seed: 0,
        }
    }
}

impl RenderConfig {
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_samples(mut self, samples_per_pixel: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_rr_threshold(mut self, rr_threshold: f32) -> Self {
        self.rr_threshold = rr_threshold;
        self
    }

    pub fn with_integrator(mut self, integrator: IntegratorKind) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerKind) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidConfig("samples_per_pixel must be at least 1".into()));
        }
        if self.tile_size == 0 {
            return Err(RenderError::InvalidConfig("tile_size must be at least 1".into()));
        }
        if self.rr_threshold.is_nan() || self.rr_threshold < 0.0 {
            return Err(RenderError::InvalidConfig(format!(
                "rr_threshold must be non-negative, got {}",
                self.rr_threshold
            )));
        }
        if let IntegratorKind::AmbientOcclusion { samples: 0, .. } = self.integrator {
            return Err(RenderError::InvalidConfig("ambient occlusion needs at least 1 sample".into()));
        }
        Ok(())
    }

    pub fn build_integrator(&self) -> Box<dyn Integrator> {
        match self.integrator {
            IntegratorKind::Path => Box::new(PathIntegrator::new(self.max_depth, self.rr_threshold)),
            IntegratorKind::VolPath => Box::new(VolPathIntegrator::new(self.max_depth, self.rr_threshold)),
            IntegratorKind::AmbientOcclusion { samples, cosine } => {
                let strategy = if cosine { AoStrategy::Cosine } else { AoStrategy::Uniform };
                Box::new(AoIntegrator::new(samples, strategy))
            }
            IntegratorKind::Normals { shading } => {
                let view = if shading { NormalView::Shading } else { NormalView::Geometric };
                Box::new(NormalIntegrator::new(view))
            }
        }
    }

}

/// Render `scene` as configured by `config`.
///
/// The camera is resized to the configured resolution.
pub fn render(scene: &Scene, camera: &Camera, config: &RenderConfig) -> RenderResult<ImageBuffer> {
    config.validate()?;
    let camera = camera.clone().with_resolution(config.width, config.height);
    let integrator = config.build_integrator();
    let (spp, seed) = (config.samples_per_pixel, config.seed);
    let image = match config.sampler {
        SamplerKind::Random => render_with(
            scene,
            &camera,
            integrator.as_ref(),
            &RandomSampler::new(spp, seed),
            config.tile_size,
        ),
        SamplerKind::Sobol => render_with(
            scene,
            &camera,
            integrator.as_ref(),
            &SobolSampler::new(spp, seed),
            config.tile_size,
        ),
    };
    Ok(image)
}

/// Render with an explicit integrator and template sampler at the camera's
/// resolution.
///
/// Each tile clones `sampler`; the sampler reseeds itself per pixel, so the
/// result does not depend on thread scheduling.
pub fn render_with<S>(
    scene: &Scene,
    camera: &Camera,
    integrator: &dyn Integrator,
    sampler: &S,
    tile_size: u32,
) -> ImageBuffer
where
    S: Sampler + Clone + Sync,
{
    let (width, height) = camera.resolution();
    let tiles = generate_tiles(width, height, tile_size);
    let total = tiles.len();
    let report_every = (total / 10).max(1);
    let completed = AtomicUsize::new(0);

    log::info!(
        "Rendering {}x{} at {} spp with the {} integrator ({} tiles)",
        width,
        height,
        sampler.samples_per_pixel(),
        integrator.name(),
        total
    );
    let start = Instant::now();

    let results: Vec<TileResult> = tiles
        .par_iter()
        .map(|tile| {
            let mut tile_sampler = sampler.clone();
            let result = render_tile(tile, camera, scene, integrator, &mut tile_sampler);

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            log::debug!("tile {}/{}", done, total);
            if done % report_every == 0 || done == total {
                log::info!("{}% complete", done * 100 / total);
            }
            result
        })
        .collect();

    let mut image = ImageBuffer::new(width, height);
    for TileResult { tile, pixels } in results {
        for ((x, y), color) in tile.pixels().zip(pixels) {
            image.set(x, y, color);
        }
    }

    log::info!("Render finished in {:.2?}", start.elapsed());
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::Bsdf;
    use crate::bxdf::LambertianReflection;
    use crate::light::PointLight;
    use crate::sampler::FixedSampler;
    use crate::scene::{Geometry, GeometryCollection, Instance, SceneBuilder};
    use crate::spectrum::Spectrum;
    use kestrel_core::Mesh;
    use kestrel_math::{Mat4, Vec3};

    fn small_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        let floor = builder.add_collection(GeometryCollection::new(
            "floor",
            vec![Geometry::new(
                Mesh::quad(1.0),
                Bsdf::new(LambertianReflection::new(Spectrum::splat(0.5))),
            )],
        ));
        builder.add_instance(Instance::new(floor, Mat4::from_scale(Vec3::splat(3.0))));
        let ball = builder.add_collection(GeometryCollection::new(
            "ball",
            vec![Geometry::new(
                Mesh::uv_sphere(0.5, 16, 8),
                Bsdf::new(LambertianReflection::new(Spectrum::splat(0.8))),
            )],
        ));
        builder.add_instance(Instance::new(ball, Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0))));
        builder.add_light(PointLight::new(Vec3::new(1.0, 3.0, 1.0), Spectrum::splat(10.0)));
        builder.build().unwrap()
    }

    fn small_camera() -> Camera {
        Camera::new()
            .with_position(Vec3::new(0.0, 1.5, 4.0), Vec3::new(0.0, 0.5, 0.0), Vec3::Y)
            .with_fov(45.0)
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tile_size, 32);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.rr_threshold, 1.0);
    }

    #[test]
    fn test_validate_rejects_zero_fields() {
        let bad = [
            RenderConfig::default().with_resolution(0, 10),
            RenderConfig::default().with_samples(0),
            RenderConfig::default().with_tile_size(0),
            RenderConfig::default().with_rr_threshold(f32::NAN),
            RenderConfig::default().with_integrator(IntegratorKind::AmbientOcclusion {
                samples: 0,
                cosine: true,
            }),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(RenderError::InvalidConfig(_))),
                "accepted {:?}",
                config
            );
        }
    }

    #[test]
    fn test_build_integrator() {
        let kinds = [
            (IntegratorKind::Path, "path"),
            (IntegratorKind::VolPath, "volpath"),
            (IntegratorKind::AmbientOcclusion { samples: 4, cosine: false }, "ao"),
            (IntegratorKind::Normals { shading: true }, "normals"),
        ];
        for (kind, name) in kinds {
            let integrator = RenderConfig::default().with_integrator(kind).build_integrator();
            assert_eq!(integrator.name(), name);
        }
    }

    #[test]
    fn test_config_json() {
        let json = r#"{ "width": 64, "samples_per_pixel": 2, "integrator": { "type": "ambient_occlusion", "samples": 8, "cosine": true } }"#;
        let config: RenderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, RenderConfig::default().height);
        assert_eq!(config.samples_per_pixel, 2);
        assert_eq!(config.integrator, IntegratorKind::AmbientOcclusion { samples: 8, cosine: true });

        let back: RenderConfig = serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_render_is_deterministic() {
        let scene = small_scene();
        let config = RenderConfig::default()
            .with_resolution(24, 16)
            .with_samples(2)
            .with_tile_size(7)
            .with_seed(99);

        let a = render(&scene, &small_camera(), &config).unwrap();
        let b = render(&scene, &small_camera(), &config).unwrap();
        assert_eq!(a, b);
        assert!(a.pixels.iter().any(|p| p.x > 0.0), "image is black");
    }

    #[test]
    fn test_tile_size_does_not_change_image() {
        let scene = small_scene();
        let config = RenderConfig::default().with_resolution(20, 12).with_samples(1).with_seed(5);

        let a = render(&scene, &small_camera(), &config.clone().with_tile_size(4)).unwrap();
        let b = render(&scene, &small_camera(), &config.with_tile_size(64)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sobol_render() {
        let scene = small_scene();
        let config = RenderConfig::default()
            .with_resolution(16, 12)
            .with_samples(3)
            .with_tile_size(5)
            .with_seed(4)
            .with_sampler(SamplerKind::Sobol);

        let a = render(&scene, &small_camera(), &config).unwrap();
        let b = render(&scene, &small_camera(), &config.clone().with_tile_size(16)).unwrap();
        assert_eq!(a, b);
        assert!(a.pixels.iter().any(|p| p.x > 0.0), "image is black");

        let random = render(&scene, &small_camera(), &config.with_sampler(SamplerKind::Random)).unwrap();
        assert_ne!(a, random);
    }

    #[test]
    fn test_sampler_kind_json() {
        let config: RenderConfig = serde_json::from_str(r#"{ "sampler": "sobol" }"#).unwrap();
        assert_eq!(config.sampler, SamplerKind::Sobol);
        assert_eq!(RenderConfig::default().sampler, SamplerKind::Random);
    }

    #[test]
    fn test_normals_render() {
        let scene = small_scene();
        // straight down onto open floor, away from the ball
        let camera = Camera::new()
            .with_resolution(8, 8)
            .with_position(Vec3::new(1.5, 5.0, 1.51), Vec3::new(1.5, 0.0, 1.5), Vec3::Y)
            .with_fov(20.0);
        let integrator = NormalIntegrator::new(NormalView::Geometric);
        let image = render_with(&scene, &camera, &integrator, &FixedSampler::new(1, 0.5), 4);

        for p in &image.pixels {
            assert!((*p - Vec3::Y).length() < 1e-4, "pixel = {:?}", p);
        }
    }
}
