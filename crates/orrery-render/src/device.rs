//! Graphics device capability used by every renderable in the workspace.
//!
//! [`GraphicsDevice`] models an immediate-mode device with a single current
//! binding state: one program in use, one buffer per attribute location and
//! one index buffer. Callers pass the device explicitly; nothing here is
//! global. Resource handles release their GPU memory when dropped.

use std::fmt;

use glam::{Mat4, Vec3};

use crate::buffer::BufferError;
use crate::shader::ShaderError;

/// Programmable pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Binding slot of a per-vertex attribute in a linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeLocation(pub u32);

/// Binding slot of a uniform in a linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
}

/// How a vertex buffer feeds one attribute.
///
/// A `stride` of zero means tightly packed (`components * 4` bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeLayout {
    pub components: u8,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u64,
}

impl AttributeLayout {
    /// Three tightly packed `f32` per vertex.
    pub const FLOAT3: Self = Self {
        components: 3,
        normalized: false,
        stride: 0,
        offset: 0,
    };

    /// Four tightly packed `f32` per vertex.
    pub const FLOAT4: Self = Self {
        components: 4,
        normalized: false,
        stride: 0,
        offset: 0,
    };

    /// Byte distance between consecutive vertices.
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            u32::from(self.components) * 4
        } else {
            self.stride
        }
    }
}

/// Size in bytes of one index. Index buffers always hold `u16` indices.
pub const INDEX_SIZE: u64 = 2;

/// What a buffer is bound as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Handle to a device buffer.
pub trait DeviceBuffer {
    /// Size of the buffer contents in bytes.
    fn size(&self) -> u64;

    /// Binding target the buffer was created for.
    fn kind(&self) -> BufferKind;
}

/// Capability object for compiling programs, uploading buffers and issuing draws.
///
/// Binding state set through `use_program`, `bind_vertex_attribute` and
/// `bind_index_buffer` is shared by every caller of the same device and
/// persists until overwritten.
pub trait GraphicsDevice {
    /// A compiled, not yet linked, shader stage.
    type Shader;
    /// A linked program.
    type Program;
    /// A device buffer.
    type Buffer: DeviceBuffer;

    /// Compile one WGSL shader stage.
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<Self::Shader, ShaderError>;

    /// Link a vertex and a fragment stage into a program.
    fn link_program(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, ShaderError>;

    /// Location of a vertex input by name, if the program declares it.
    fn attribute_location(&self, program: &Self::Program, name: &str)
    -> Option<AttributeLocation>;

    /// Location of a uniform by name, if the program declares it.
    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<UniformLocation>;

    /// Allocate a static buffer initialized with `contents`.
    fn create_buffer(
        &mut self,
        label: &str,
        kind: BufferKind,
        contents: &[u8],
    ) -> Result<Self::Buffer, BufferError>;

    /// Make `program` the current program.
    fn use_program(&mut self, program: &Self::Program);

    /// Feed attribute `location` of the current program from `buffer`.
    fn bind_vertex_attribute(
        &mut self,
        location: AttributeLocation,
        buffer: &Self::Buffer,
        layout: AttributeLayout,
    );

    /// Set a `mat4x4<f32>` uniform of the current program.
    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4);

    /// Set a `vec3<f32>` uniform of the current program.
    fn set_uniform_vec3(&mut self, location: UniformLocation, value: Vec3);

    /// Make `buffer` the current index buffer. Its contents are `u16` indices.
    fn bind_index_buffer(&mut self, buffer: &Self::Buffer);

    /// Draw `index_count` indices of the current index buffer as a triangle list.
    fn draw_indexed(&mut self, index_count: u32);
}
