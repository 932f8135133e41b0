//! Rendering layer: a small immediate-binding device abstraction, shader
//! compilation with reflected bindings, static buffers, and two backends
//! (wgpu and a CPU-side recorder).

pub mod buffer;
pub mod device;
pub mod gpu;
pub mod headless;
pub mod pass;
pub mod shader;
pub mod wgpu_device;

pub use buffer::{BufferAllocator, BufferError, IndexBuffer, VertexBuffer};
pub use device::{
    AttributeLayout, AttributeLocation, BufferKind, DeviceBuffer, GraphicsDevice, INDEX_SIZE,
    ShaderStage, UniformLocation,
};
pub use gpu::{GpuContext, GpuContextError, init_gpu_context_blocking};
pub use headless::{DrawRecord, HeadlessBuffer, HeadlessDevice, HeadlessProgram, UniformValue};
pub use pass::{DepthAttachmentConfig, RenderPassBuilder, SPACE_BLACK};
pub use shader::{
    BindingKind, BindingResolver, CompiledStage, InterfaceType, LinkedInterface,
    ProgramBindings, ShaderError, ShaderProgram, build_program, compile_wgsl, link_stages,
};
pub use wgpu_device::{WgpuBuffer, WgpuDevice, WgpuProgram, WgpuShader};
