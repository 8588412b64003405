//! Kestrel renderer - CPU Monte Carlo light transport
//!
//! Path tracing with next-event estimation over triangle-mesh scenes,
//! homogeneous participating media and point lights. Scenes are assembled
//! with [`SceneBuilder`] and rendered tile-parallel with [`render`].

pub mod accel;
mod bsdf;
pub mod bxdf;
mod camera;
mod error;
mod film;
pub mod geometry;
pub mod integrator;
mod interaction;
mod light;
mod medium;
mod ray;
mod renderer;
pub mod sampler;
pub mod sampling;
mod scene;
mod spectrum;
mod tile;

pub use accel::{Backend, Hit, Intersector};
pub use bsdf::Bsdf;
pub use bxdf::{BxDF, BxDFSample, BxDFType};
pub use camera::Camera;
pub use error::{RenderError, RenderResult, SceneError, SceneResult};
pub use film::{color_to_rgba, linear_to_srgb, ImageBuffer};
pub use integrator::Integrator;
pub use interaction::{Interaction, MediumInteraction, SurfaceInteraction, RAY_EPSILON, SHADOW_EPSILON};
pub use light::{Light, LightFlags, LightSample, PointLight, VisibilityTester};
pub use medium::{phase_hg, HenyeyGreenstein, HomogeneousMedium, Medium, MediumId, MediumInterface};
pub use ray::Ray;
pub use renderer::{render, render_with, IntegratorKind, RenderConfig, SamplerKind};
pub use sampler::{FixedSampler, RandomSampler, Sampler, SobolSampler};
pub use scene::{Geometry, GeometryCollection, Instance, Scene, SceneBuilder};
pub use spectrum::{CoefficientSpectrum, RgbSpectrum, SampledSpectrum, Spectrum, SPECTRUM_SAMPLES};
pub use tile::{generate_tiles, render_tile, Tile, TileResult, DEFAULT_TILE_SIZE};

/// Re-export the math types used throughout the public API
pub use kestrel_math::{Aabb, Frame, Interval, Mat4, Vec2, Vec3};
