//! Error types for scene construction and rendering.
//!
//! Only setup can fail. Degenerate samples during rendering are not errors;
//! they end the path with no contribution.

use thiserror::Error;

/// Failure while assembling a scene or its intersection engine.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene has no instances")]
    EmptyScene,

    #[error("geometry {geometry} of collection '{collection}' is invalid: {reason}")]
    InvalidGeometry {
        collection: String,
        geometry: usize,
        reason: String,
    },

    #[error("medium {0} is referenced but was never added")]
    MissingMedium(usize),

    #[error("instance {0} references a collection that does not exist")]
    InvalidInstance(usize),

    #[error("intersection device error: {0}")]
    Device(String),
}

/// Failure before or after the render loop itself.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type SceneResult<T> = Result<T, SceneError>;
pub type RenderResult<T> = Result<T, RenderError>;
