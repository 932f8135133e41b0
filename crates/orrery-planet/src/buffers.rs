//! Device buffers owned by a body.

use orrery_render::{
    AttributeLayout, BufferAllocator, BufferError, GraphicsDevice, IndexBuffer, VertexBuffer,
};

use crate::geometry::SphereMesh;
use crate::material::MaterialColor;

/// Position, index, color and normal buffers of one body.
///
/// Uploaded once and never written again. Dropping releases all four.
pub struct BodyBuffers<D: GraphicsDevice> {
    pub positions: VertexBuffer<D>,
    pub indices: IndexBuffer<D>,
    pub colors: VertexBuffer<D>,
    pub normals: VertexBuffer<D>,
}

impl<D: GraphicsDevice> BodyBuffers<D> {
    /// Upload `mesh` with `color` replicated per vertex.
    ///
    /// Normals reuse the raw positions; the shader normalizes them.
    pub fn upload(
        device: &mut D,
        name: &str,
        mesh: &SphereMesh,
        color: MaterialColor,
    ) -> Result<Self, BufferError> {
        let mut allocator = BufferAllocator::new(device);
        let vertices: &[f32] = bytemuck::cast_slice(mesh.positions());

        let positions = allocator.create_vertex_buffer(
            &format!("{name}-positions"),
            vertices,
            AttributeLayout::FLOAT3,
        )?;
        let indices =
            allocator.create_index_buffer(&format!("{name}-indices"), mesh.indices())?;
        let colors = allocator.create_vertex_buffer(
            &format!("{name}-colors"),
            &color.per_vertex(mesh.vertex_count()),
            AttributeLayout::FLOAT4,
        )?;
        let normals = allocator.create_vertex_buffer(
            &format!("{name}-normals"),
            vertices,
            AttributeLayout::FLOAT3,
        )?;

        Ok(Self {
            positions,
            indices,
            colors,
            normals,
        })
    }
}

#[cfg(test)]
mod tests {
    use orrery_render::{DeviceBuffer, HeadlessDevice};

    use super::*;
    use crate::geometry::generate_sphere_with_resolution;

    #[test]
    fn test_vertex_counts_match() {
        let mut device = HeadlessDevice::new();
        let mesh = generate_sphere_with_resolution(2.0, 6, 8).unwrap();
        let buffers =
            BodyBuffers::upload(&mut device, "test", &mesh, MaterialColor::WHITE).unwrap();

        let n = mesh.vertex_count() as u32;
        assert_eq!(buffers.positions.vertex_count, n);
        assert_eq!(buffers.colors.vertex_count, n);
        assert_eq!(buffers.normals.vertex_count, n);
        assert_eq!(buffers.indices.index_count as usize, mesh.indices().len());
        assert_eq!(buffers.colors.buffer.size(), u64::from(n) * 16);
    }

    #[test]
    fn test_normals_equal_positions() {
        let mut device = HeadlessDevice::new();
        let mesh = generate_sphere_with_resolution(4.0, 5, 7).unwrap();
        let buffers =
            BodyBuffers::upload(&mut device, "test", &mesh, MaterialColor::WHITE).unwrap();

        assert_eq!(
            buffers.normals.buffer.read_f32(),
            buffers.positions.buffer.read_f32()
        );
        let first = &buffers.normals.buffer.read_f32()[..3];
        assert_eq!(first, &[0.0, 4.0, 0.0]);
    }

    #[test]
    fn test_allocation_failure_propagates() {
        let mut device = HeadlessDevice::new().with_max_buffer_size(64);
        let mesh = generate_sphere_with_resolution(1.0, 4, 4).unwrap();

        let result = BodyBuffers::upload(&mut device, "tiny", &mesh, MaterialColor::WHITE);

        assert!(matches!(result, Err(BufferError::TooLarge { .. })));
    }
}
