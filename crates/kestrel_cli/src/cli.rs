use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use kestrel_renderer::{Backend, IntegratorKind, RenderConfig, SamplerKind};
use log::LevelFilter;

/// Log verbosity accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntegratorArg {
    Path,
    Volpath,
    /// Cosine-weighted ambient occlusion
    Ao,
    /// Uniformly sampled ambient occlusion
    AoUniform,
    Normals,
    ShadingNormals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SamplerArg {
    Random,
    /// Scrambled Sobol'; rounds spp up to a power of two
    Sobol,
}

impl From<SamplerArg> for SamplerKind {
    fn from(sampler: SamplerArg) -> Self {
        match sampler {
            SamplerArg::Random => SamplerKind::Random,
            SamplerArg::Sobol => SamplerKind::Sobol,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Bvh,
    Embree,
}

impl From<BackendArg> for Backend {
    fn from(backend: BackendArg) -> Self {
        match backend {
            BackendArg::Bvh => Backend::Bvh,
            BackendArg::Embree => Backend::Embree,
        }
    }
}

/// Command line arguments. Flags override values from `--config`.
#[derive(Debug, Parser)]
#[command(name = "kestrel")]
#[command(about = "Monte Carlo path tracer", version)]
pub struct Args {
    /// JSON render configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "render.png")]
    pub output: PathBuf,

    /// Render this OBJ instead of the built-in demo scene
    #[arg(long)]
    pub obj: Option<PathBuf>,

    /// Fill the demo scene with homogeneous fog of this density
    #[arg(long)]
    pub fog: Option<f32>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// Samples per pixel
    #[arg(short = 's', long = "spp")]
    pub samples_per_pixel: Option<u32>,

    #[arg(long)]
    pub max_depth: Option<u32>,

    #[arg(long)]
    pub rr_threshold: Option<f32>,

    #[arg(long)]
    pub tile_size: Option<u32>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(short, long, value_enum)]
    pub integrator: Option<IntegratorArg>,

    #[arg(long, value_enum)]
    pub sampler: Option<SamplerArg>,

    /// Occlusion rays per camera sample for the AO integrators
    #[arg(long, default_value_t = 16)]
    pub ao_samples: u32,

    #[arg(long, value_enum, default_value = "bvh")]
    pub backend: BackendArg,

    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Args {
    /// Overwrite `config` with every flag given on the command line.
    pub fn apply(&self, config: &mut RenderConfig) {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(spp) = self.samples_per_pixel {
            config.samples_per_pixel = spp;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(rr_threshold) = self.rr_threshold {
            config.rr_threshold = rr_threshold;
        }
        if let Some(tile_size) = self.tile_size {
            config.tile_size = tile_size;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(sampler) = self.sampler {
            config.sampler = sampler.into();
        }
        if let Some(integrator) = self.integrator {
            config.integrator = match integrator {
                IntegratorArg::Path => IntegratorKind::Path,
                IntegratorArg::Volpath => IntegratorKind::VolPath,
                IntegratorArg::Ao => IntegratorKind::AmbientOcclusion {
                    samples: self.ao_samples,
                    cosine: true,
                },
                IntegratorArg::AoUniform => IntegratorKind::AmbientOcclusion {
                    samples: self.ao_samples,
                    cosine: false,
                },
                IntegratorArg::Normals => IntegratorKind::Normals { shading: false },
                IntegratorArg::ShadingNormals => IntegratorKind::Normals { shading: true },
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "kestrel",
            "--width",
            "320",
            "--spp",
            "4",
            "--integrator",
            "ao-uniform",
            "--ao-samples",
            "8",
            "--sampler",
            "sobol",
        ]);
        let mut config = RenderConfig::default().with_resolution(100, 50).with_seed(7);
        args.apply(&mut config);

        assert_eq!(config.width, 320);
        assert_eq!(config.height, 50);
        assert_eq!(config.samples_per_pixel, 4);
        assert_eq!(config.seed, 7);
        assert_eq!(config.sampler, SamplerKind::Sobol);
        assert_eq!(config.integrator, IntegratorKind::AmbientOcclusion { samples: 8, cosine: false });
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["kestrel"]);
        assert_eq!(args.output, PathBuf::from("render.png"));
        assert_eq!(args.backend, BackendArg::Bvh);
        assert!(args.config.is_none() && args.obj.is_none());

        let mut config = RenderConfig::default();
        args.apply(&mut config);
        assert_eq!(config, RenderConfig::default());
    }
}
