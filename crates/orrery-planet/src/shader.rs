//! Embedded WGSL for planet bodies and the typed binding set it exposes.

use orrery_render::{
    AttributeLocation, BindingResolver, GraphicsDevice, ProgramBindings, ShaderError,
    UniformLocation,
};

/// Vertex stage: clip-space transform plus per-vertex Lambert lighting.
pub const PLANET_VERTEX_SHADER: &str = r#"
@group(0) @binding(0) var<uniform> u_projection_matrix: mat4x4<f32>;
@group(0) @binding(1) var<uniform> u_model_view_matrix: mat4x4<f32>;
@group(0) @binding(2) var<uniform> u_normal_matrix: mat4x4<f32>;
@group(0) @binding(3) var<uniform> u_sun_position: vec3<f32>;

struct VertexInput {
    @location(0) a_vertex_position: vec3<f32>,
    @location(1) a_vertex_color: vec4<f32>,
    @location(2) a_vertex_normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) v_color: vec4<f32>,
    @location(1) v_lighting: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u_projection_matrix * u_model_view_matrix * vec4<f32>(in.a_vertex_position, 1.0);

    let normal = normalize((u_normal_matrix * vec4<f32>(in.a_vertex_normal, 1.0)).xyz);
    let reference = (u_model_view_matrix * vec4<f32>(1.0, 1.0, 1.0, 1.0)).xyz;
    let to_sun = normalize(u_sun_position - reference);
    let diffuse = max(dot(normal, to_sun), 0.0);
    let ambient_light = vec3<f32>(0.3, 0.3, 0.3);
    let sun_color = vec3<f32>(1.0, 1.0, 1.0);

    out.v_color = in.a_vertex_color;
    out.v_lighting = ambient_light + sun_color * diffuse;
    return out;
}
"#;

/// Fragment stage: modulate the vertex color by the interpolated lighting.
pub const PLANET_FRAGMENT_SHADER: &str = r#"
struct FragmentInput {
    @location(0) v_color: vec4<f32>,
    @location(1) v_lighting: vec3<f32>,
};

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.v_color.rgb * in.v_lighting, in.v_color.a);
}
"#;

/// Binding locations of the planet program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanetBindings {
    pub vertex_position: AttributeLocation,
    pub vertex_color: AttributeLocation,
    pub vertex_normal: AttributeLocation,
    pub projection_matrix: UniformLocation,
    pub model_view_matrix: UniformLocation,
    pub normal_matrix: UniformLocation,
    pub sun_position: UniformLocation,
}

impl ProgramBindings for PlanetBindings {
    fn resolve<D: GraphicsDevice>(resolver: &BindingResolver<'_, D>) -> Result<Self, ShaderError> {
        Ok(Self {
            vertex_position: resolver.attribute("a_vertex_position")?,
            vertex_color: resolver.attribute("a_vertex_color")?,
            vertex_normal: resolver.attribute("a_vertex_normal")?,
            projection_matrix: resolver.uniform("u_projection_matrix")?,
            model_view_matrix: resolver.uniform("u_model_view_matrix")?,
            normal_matrix: resolver.uniform("u_normal_matrix")?,
            sun_position: resolver.uniform("u_sun_position")?,
        })
    }
}
