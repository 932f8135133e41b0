//! Latitude/longitude sphere tessellation.
//!
//! The mesh has a single vertex at each pole and no duplicated seam column,
//! so every edge is shared by exactly two triangles. Triangles wind
//! counter-clockwise seen from outside the sphere.

use std::f32::consts::{PI, TAU};

use thiserror::Error;

/// Latitude bands used by [`generate_sphere`].
pub const DEFAULT_BANDS: u32 = 32;
/// Longitude segments used by [`generate_sphere`].
pub const DEFAULT_SEGMENTS: u32 = 64;
/// Largest vertex count addressable with `u16` indices.
pub const MAX_VERTICES: u64 = u16::MAX as u64 + 1;

/// Error types for sphere generation.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("sphere radius must be positive and finite, got {radius}")]
    InvalidRadius { radius: f32 },

    #[error("sphere needs at least 2 bands and 3 segments, got {bands}x{segments}")]
    InvalidResolution { bands: u32, segments: u32 },

    #[error("{bands}x{segments} sphere needs {vertices} vertices, u16 indices address at most 65536")]
    TooManyVertices {
        bands: u32,
        segments: u32,
        vertices: u64,
    },
}

/// A closed, outward-facing triangulated sphere centered at the origin.
#[derive(Clone, Debug)]
pub struct SphereMesh {
    radius: f32,
    bands: u32,
    segments: u32,
    positions: Vec<[f32; 3]>,
    indices: Vec<u16>,
}

impl SphereMesh {
    /// Radius the sphere was generated with.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Latitude bands and longitude segments.
    pub fn resolution(&self) -> (u32, u32) {
        (self.bands, self.segments)
    }

    /// Vertex positions, north pole first and south pole last.
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Triangle list indices, three per triangle.
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Generate a sphere of `radius` at the default resolution.
pub fn generate_sphere(radius: f32) -> Result<SphereMesh, GeometryError> {
    generate_sphere_with_resolution(radius, DEFAULT_BANDS, DEFAULT_SEGMENTS)
}

/// Generate a sphere with `bands` latitude bands and `segments` longitude segments.
///
/// The vertex count is `2 + (bands - 1) * segments` and the triangle count
/// is `2 * (bands - 1) * segments`.
pub fn generate_sphere_with_resolution(
    radius: f32,
    bands: u32,
    segments: u32,
) -> Result<SphereMesh, GeometryError> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(GeometryError::InvalidRadius { radius });
    }
    if bands < 2 || segments < 3 {
        return Err(GeometryError::InvalidResolution { bands, segments });
    }
    let vertices = 2 + u64::from(bands - 1) * u64::from(segments);
    if vertices > MAX_VERTICES {
        return Err(GeometryError::TooManyVertices {
            bands,
            segments,
            vertices,
        });
    }

    let rings = bands - 1;
    let mut positions = Vec::with_capacity(vertices as usize);
    positions.push([0.0, radius, 0.0]);
    for ring in 1..bands {
        let theta = ring as f32 * PI / bands as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for segment in 0..segments {
            let phi = segment as f32 * TAU / segments as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            positions.push([
                radius * sin_theta * cos_phi,
                radius * cos_theta,
                radius * sin_theta * sin_phi,
            ]);
        }
    }
    positions.push([0.0, -radius, 0.0]);

    let north = 0u16;
    let south = (vertices - 1) as u16;
    // Vertex count is capped above, so every ring index fits in u16.
    let ring_vertex = |ring: u32, segment: u32| -> u16 {
        (1 + (ring - 1) * segments + segment % segments) as u16
    };

    let mut indices = Vec::with_capacity((6 * rings * segments) as usize);
    for segment in 0..segments {
        indices.extend_from_slice(&[north, ring_vertex(1, segment + 1), ring_vertex(1, segment)]);
    }
    for ring in 1..rings {
        for segment in 0..segments {
            let upper = ring_vertex(ring, segment);
            let upper_next = ring_vertex(ring, segment + 1);
            let lower = ring_vertex(ring + 1, segment);
            let lower_next = ring_vertex(ring + 1, segment + 1);
            indices.extend_from_slice(&[upper, upper_next, lower]);
            indices.extend_from_slice(&[upper_next, lower_next, lower]);
        }
    }
    for segment in 0..segments {
        indices.extend_from_slice(&[
            ring_vertex(rings, segment),
            ring_vertex(rings, segment + 1),
            south,
        ]);
    }

    Ok(SphereMesh {
        radius,
        bands,
        segments,
        positions,
        indices,
    })
}
