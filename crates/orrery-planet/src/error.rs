use orrery_render::{BufferError, ShaderError};
use thiserror::Error;

use crate::geometry::GeometryError;
use crate::material::ColorError;

/// Error types for body construction.
#[derive(Debug, Error)]
pub enum PlanetError {
    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("invalid color: {0}")]
    Color(#[from] ColorError),

    #[error("shader program: {0}")]
    Shader(#[from] ShaderError),

    #[error("buffer allocation: {0}")]
    Buffer(#[from] BufferError),
}
