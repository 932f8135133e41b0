//! CPU mirror of the planet vertex lighting.
//!
//! Matches `vs_main` in [`PLANET_VERTEX_SHADER`](crate::PLANET_VERTEX_SHADER)
//! so lighting can be checked without reading back a frame.

use glam::{Mat4, Vec3, Vec4};

/// Constant light applied to every vertex.
pub const AMBIENT_LIGHT: Vec3 = Vec3::splat(0.3);
/// Color of the directional sun term.
pub const SUN_COLOR: Vec3 = Vec3::ONE;
/// Object-space point whose eye-space image anchors the sun direction.
pub const LIGHT_REFERENCE_POINT: Vec4 = Vec4::ONE;

/// Per-vertex lighting term for an object-space `normal`.
///
/// The result lies in `[AMBIENT_LIGHT, AMBIENT_LIGHT + SUN_COLOR]`.
pub fn vertex_lighting(
    model_view: &Mat4,
    normal_matrix: &Mat4,
    sun_position: Vec3,
    normal: Vec3,
) -> Vec3 {
    let transformed = (*normal_matrix * normal.extend(1.0)).truncate().normalize_or_zero();
    let reference = (*model_view * LIGHT_REFERENCE_POINT).truncate();
    let to_sun = (sun_position - reference).normalize_or_zero();
    let diffuse = transformed.dot(to_sun).max(0.0);
    AMBIENT_LIGHT + SUN_COLOR * diffuse
}

/// Final fragment color for an interpolated `color` and `lighting` term.
pub fn shade(color: [f32; 4], lighting: Vec3) -> [f32; 4] {
    let rgb = Vec3::new(color[0], color[1], color[2]) * lighting;
    [rgb.x, rgb.y, rgb.z, color[3]]
}
