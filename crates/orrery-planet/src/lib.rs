//! Renderable celestial bodies: sphere tessellation, the planet shader and
//! its CPU lighting mirror, per-body device buffers, and [`Planet`].

pub mod buffers;
mod error;
pub mod geometry;
pub mod lighting;
pub mod material;
mod planet;
pub mod shader;
pub mod transform;

pub use buffers::BodyBuffers;
pub use error::PlanetError;
pub use geometry::{
    DEFAULT_BANDS, DEFAULT_SEGMENTS, GeometryError, SphereMesh, generate_sphere,
    generate_sphere_with_resolution,
};
pub use lighting::{AMBIENT_LIGHT, LIGHT_REFERENCE_POINT, SUN_COLOR, shade, vertex_lighting};
pub use material::{ColorError, MaterialColor};
pub use planet::{Planet, PlanetDescriptor, Tessellation};
pub use shader::{PLANET_FRAGMENT_SHADER, PLANET_VERTEX_SHADER, PlanetBindings};
pub use transform::Transform;
