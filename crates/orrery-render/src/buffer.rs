//! Vertex and index buffer management for GPU rendering.

use log::debug;
use thiserror::Error;

use crate::device::{AttributeLayout, AttributeLocation, BufferKind, GraphicsDevice};

/// Error types for buffer allocation.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("buffer '{label}' has no contents")]
    Empty { label: String },

    #[error("buffer '{label}' needs {size} bytes, device limit is {limit}")]
    TooLarge { label: String, size: u64, limit: u64 },

    #[error("device failed to allocate buffer '{label}': {message}")]
    Backend { label: String, message: String },
}

/// A static vertex buffer feeding a single attribute.
pub struct VertexBuffer<D: GraphicsDevice> {
    pub buffer: D::Buffer,
    pub vertex_count: u32,
    pub layout: AttributeLayout,
}

impl<D: GraphicsDevice> VertexBuffer<D> {
    /// Bind this buffer to an attribute of the current program.
    pub fn bind(&self, device: &mut D, location: AttributeLocation) {
        device.bind_vertex_attribute(location, &self.buffer, self.layout);
    }
}

/// A static buffer of `u16` indices.
pub struct IndexBuffer<D: GraphicsDevice> {
    pub buffer: D::Buffer,
    pub index_count: u32,
}

impl<D: GraphicsDevice> IndexBuffer<D> {
    /// Make this the current index buffer.
    pub fn bind(&self, device: &mut D) {
        device.bind_index_buffer(&self.buffer);
    }

    /// Draw every index as a triangle list.
    pub fn draw(&self, device: &mut D) {
        device.draw_indexed(self.index_count);
    }
}

/// Buffer allocator for static vertex and index buffers.
pub struct BufferAllocator<'a, D: GraphicsDevice> {
    device: &'a mut D,
}

impl<'a, D: GraphicsDevice> BufferAllocator<'a, D> {
    /// Create a new buffer allocator with the given device.
    pub fn new(device: &'a mut D) -> Self {
        Self { device }
    }

    /// Upload `data` as a vertex buffer read with `layout`.
    ///
    /// `data` is a flat `f32` sequence; its length must be a multiple of
    /// `layout.components`.
    pub fn create_vertex_buffer(
        &mut self,
        label: &str,
        data: &[f32],
        layout: AttributeLayout,
    ) -> Result<VertexBuffer<D>, BufferError> {
        let components = usize::from(layout.components.max(1));
        debug_assert_eq!(data.len() % components, 0, "partial vertex in '{label}'");

        let buffer = self
            .device
            .create_buffer(label, BufferKind::Vertex, bytemuck::cast_slice(data))?;
        let vertex_count = (data.len() / components) as u32;
        debug!("Uploaded vertex buffer '{}' ({} vertices)", label, vertex_count);

        Ok(VertexBuffer {
            buffer,
            vertex_count,
            layout,
        })
    }

    /// Upload `u16` indices as an index buffer.
    pub fn create_index_buffer(
        &mut self,
        label: &str,
        indices: &[u16],
    ) -> Result<IndexBuffer<D>, BufferError> {
        let buffer = self
            .device
            .create_buffer(label, BufferKind::Index, bytemuck::cast_slice(indices))?;
        let index_count = indices.len() as u32;
        debug!("Uploaded index buffer '{}' ({} indices)", label, index_count);

        Ok(IndexBuffer {
            buffer,
            index_count,
        })
    }
}
