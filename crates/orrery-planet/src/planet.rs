//! The renderable celestial body.

use glam::{Mat4, Vec3};
use log::info;
use orrery_render::{GraphicsDevice, ShaderProgram, build_program};
use serde::{Deserialize, Serialize};

use crate::buffers::BodyBuffers;
use crate::error::PlanetError;
use crate::geometry::{SphereMesh, generate_sphere, generate_sphere_with_resolution};
use crate::material::MaterialColor;
use crate::shader::{PLANET_FRAGMENT_SHADER, PLANET_VERTEX_SHADER, PlanetBindings};
use crate::transform::Transform;

/// Latitude/longitude resolution of a body's sphere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tessellation {
    pub bands: u32,
    pub segments: u32,
}

/// Serializable description of a body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanetDescriptor {
    pub name: String,
    pub radius: f32,
    pub color: MaterialColor,
    #[serde(default)]
    pub central_body: Option<String>,
    /// Uses the default resolution when absent.
    #[serde(default)]
    pub tessellation: Option<Tessellation>,
}

/// A lit, flat-colored sphere with its own program and buffers.
///
/// Construction generates the mesh, builds the program and uploads the
/// buffers, in that order. A failure at any step leaves nothing allocated.
pub struct Planet<D: GraphicsDevice> {
    name: String,
    central_body: Option<String>,
    color: MaterialColor,
    mesh: SphereMesh,
    transform: Transform,
    program: ShaderProgram<D, PlanetBindings>,
    buffers: BodyBuffers<D>,
}

impl<D: GraphicsDevice> Planet<D> {
    /// Build a body of `radius` at the default resolution.
    pub fn new(
        device: &mut D,
        radius: f32,
        name: impl Into<String>,
        color: MaterialColor,
        central_body: Option<String>,
    ) -> Result<Self, PlanetError> {
        Self::from_descriptor(
            device,
            &PlanetDescriptor {
                name: name.into(),
                radius,
                color,
                central_body,
                tessellation: None,
            },
        )
    }

    /// Build a body from a descriptor.
    pub fn from_descriptor(
        device: &mut D,
        descriptor: &PlanetDescriptor,
    ) -> Result<Self, PlanetError> {
        Self::with_shaders(
            device,
            descriptor,
            PLANET_VERTEX_SHADER,
            PLANET_FRAGMENT_SHADER,
        )
    }

    pub(crate) fn with_shaders(
        device: &mut D,
        descriptor: &PlanetDescriptor,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, PlanetError> {
        let mesh = match descriptor.tessellation {
            Some(Tessellation { bands, segments }) => {
                generate_sphere_with_resolution(descriptor.radius, bands, segments)?
            }
            None => generate_sphere(descriptor.radius)?,
        };
        let program = build_program::<D, PlanetBindings>(device, vertex_source, fragment_source)?;
        let buffers = BodyBuffers::upload(device, &descriptor.name, &mesh, descriptor.color)?;

        info!(
            "Created body '{}' (radius {}, {} vertices, {} triangles)",
            descriptor.name,
            descriptor.radius,
            mesh.vertex_count(),
            mesh.triangle_count()
        );

        Ok(Self {
            name: descriptor.name.clone(),
            central_body: descriptor.central_body.clone(),
            color: descriptor.color,
            mesh,
            transform: Transform::default(),
            program,
            buffers,
        })
    }

    /// Move the body; only the translation of the model-view matrix changes.
    pub fn set_position(&mut self, position: impl Into<Vec3>) {
        self.transform.set_translation(position.into());
    }

    /// Issue one indexed draw of the whole sphere.
    ///
    /// Leaves this body's program and buffers bound on `device`.
    pub fn draw(&self, device: &mut D, projection: &Mat4, sun_position: Vec3) {
        let bindings = self.program.bindings();
        device.use_program(self.program.handle());

        self.buffers.positions.bind(device, bindings.vertex_position);
        self.buffers.colors.bind(device, bindings.vertex_color);
        self.buffers.normals.bind(device, bindings.vertex_normal);

        device.set_uniform_mat4(bindings.projection_matrix, projection);
        device.set_uniform_mat4(bindings.model_view_matrix, self.transform.model_view());
        device.set_uniform_mat4(bindings.normal_matrix, self.transform.normal_matrix());
        device.set_uniform_vec3(bindings.sun_position, sun_position);

        self.buffers.indices.bind(device);
        self.buffers.indices.draw(device);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the body this one orbits, if any.
    pub fn central_body(&self) -> Option<&str> {
        self.central_body.as_deref()
    }

    pub fn radius(&self) -> f32 {
        self.mesh.radius()
    }

    pub fn color(&self) -> MaterialColor {
        self.color
    }

    pub fn mesh(&self) -> &SphereMesh {
        &self.mesh
    }

    pub fn model_view_matrix(&self) -> &Mat4 {
        self.transform.model_view()
    }

    pub fn normal_matrix(&self) -> &Mat4 {
        self.transform.normal_matrix()
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation()
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn index_count(&self) -> usize {
        self.mesh.indices().len()
    }

    pub fn buffers(&self) -> &BodyBuffers<D> {
        &self.buffers
    }
}
