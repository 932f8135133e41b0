//! [`GraphicsDevice`] implementation on top of wgpu.
//!
//! wgpu has no implicit binding state, so [`WgpuDevice`] keeps one: the
//! program in use, the buffer bound to each attribute location and the
//! current index buffer. `draw_indexed` snapshots that state, uniform values
//! included, into a recorded draw; [`WgpuDevice::encode_frame`] gives each
//! recorded draw its own uniform bind group and replays them into a render
//! pass. A program drawn several times in one frame renders each draw with
//! the uniforms current at its `draw_indexed` call.
//!
//! Device calls that can fail run inside out-of-memory and validation error
//! scopes, so allocation and pipeline failures come back as errors instead of
//! reaching wgpu's uncaptured error handler.

use std::collections::BTreeMap;
use std::num::NonZeroU64;
use std::sync::{Arc, Mutex, PoisonError};

use glam::{Mat4, Vec3};
use log::{debug, error, warn};
use wgpu::util::DeviceExt;

use crate::buffer::BufferError;
use crate::device::{
    AttributeLayout, AttributeLocation, BufferKind, DeviceBuffer, GraphicsDevice, ShaderStage,
    UniformLocation,
};
use crate::pass::RenderPassBuilder;
use crate::shader::{
    CompiledStage, InterfaceType, LinkedInterface, ShaderError, compile_wgsl, link_stages,
};

/// A device buffer. Dropping the last handle releases it.
pub struct WgpuBuffer {
    raw: Arc<wgpu::Buffer>,
    kind: BufferKind,
    size: u64,
}

impl WgpuBuffer {
    /// Underlying wgpu buffer.
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }
}

impl DeviceBuffer for WgpuBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn kind(&self) -> BufferKind {
        self.kind
    }
}

/// A validated stage and its shader module.
pub struct WgpuShader {
    stage: CompiledStage,
    module: wgpu::ShaderModule,
}

struct UniformSlot {
    location: UniformLocation,
    ty: InterfaceType,
    /// Last written value, padded to `ty.uniform_size()`.
    value: Mutex<Vec<u8>>,
}

impl UniformSlot {
    fn snapshot(&self) -> Vec<u8> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct ProgramResources {
    id: u64,
    interface: LinkedInterface,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniforms: Vec<UniformSlot>,
}

/// A linked program: render pipeline, uniform layout and current uniform values.
pub struct WgpuProgram {
    resources: Arc<ProgramResources>,
}

impl WgpuProgram {
    /// Reflected program interface.
    pub fn interface(&self) -> &LinkedInterface {
        &self.resources.interface
    }
}

struct RecordedDraw {
    program: Arc<ProgramResources>,
    /// Uniform bytes at draw time, by binding.
    uniforms: Vec<(UniformLocation, Vec<u8>)>,
    vertex_buffers: Vec<(Arc<wgpu::Buffer>, u64)>,
    index_buffer: Arc<wgpu::Buffer>,
    index_count: u32,
}

#[derive(Default)]
struct BindingState {
    program: Option<Arc<ProgramResources>>,
    attributes: BTreeMap<AttributeLocation, (Arc<wgpu::Buffer>, AttributeLayout)>,
    index: Option<Arc<wgpu::Buffer>>,
}

/// wgpu-backed [`GraphicsDevice`] rendering into a fixed color/depth format.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    next_program_id: u64,
    state: BindingState,
    draws: Vec<RecordedDraw>,
}

impl WgpuDevice {
    /// Wrap a wgpu device; pipelines target `color_format` and optional `depth_format`.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        Self {
            device,
            queue,
            color_format,
            depth_format,
            next_program_id: 1,
            state: BindingState::default(),
            draws: Vec::new(),
        }
    }

    /// Underlying wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Underlying wgpu queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Color format pipelines are built for.
    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Depth format pipelines are built for.
    pub fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        self.depth_format
    }

    /// Number of draws waiting for [`encode_frame`](Self::encode_frame).
    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    /// Replay every recorded draw into one render pass and clear the recording.
    ///
    /// Returns the number of draws encoded. A draw whose uniform bind group
    /// cannot be created is logged and left out.
    pub fn encode_frame(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        pass: &RenderPassBuilder,
    ) -> usize {
        let draws = std::mem::take(&mut self.draws);
        let mut prepared = Vec::with_capacity(draws.len());
        for draw in &draws {
            match self.uniform_bind_group(draw) {
                Ok(bind_group) => prepared.push((draw, bind_group)),
                Err(err) => error!("skipping draw of program {}: {}", draw.program.id, err),
            }
        }

        let mut render_pass = pass.begin(encoder, color_view);
        for (draw, bind_group) in &prepared {
            render_pass.set_pipeline(&draw.program.pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            for (slot, (buffer, offset)) in draw.vertex_buffers.iter().enumerate() {
                render_pass.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
            }
            render_pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }

        prepared.len()
    }

    /// Upload a draw's uniform snapshot and bind it against its program's layout.
    fn uniform_bind_group(&self, draw: &RecordedDraw) -> Result<wgpu::BindGroup, wgpu::Error> {
        capture_errors(&self.device, || {
            let buffers: Vec<(u32, wgpu::Buffer)> = draw
                .uniforms
                .iter()
                .map(|(location, bytes)| {
                    let buffer =
                        self.device
                            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some("draw-uniform"),
                                contents: bytes,
                                usage: wgpu::BufferUsages::UNIFORM,
                            });
                    (location.binding, buffer)
                })
                .collect();
            let entries: Vec<wgpu::BindGroupEntry> = buffers
                .iter()
                .map(|(binding, buffer)| wgpu::BindGroupEntry {
                    binding: *binding,
                    resource: buffer.as_entire_binding(),
                })
                .collect();
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("draw-uniforms-bg"),
                layout: &draw.program.bind_group_layout,
                entries: &entries,
            })
        })
    }

    fn write_uniform(&mut self, location: UniformLocation, expected: InterfaceType, bytes: &[u8]) {
        let Some(program) = &self.state.program else {
            warn!("uniform write at binding {} with no program in use", location.binding);
            return;
        };
        match program.uniforms.iter().find(|slot| slot.location == location) {
            Some(slot) if slot.ty == expected => {
                let mut value = slot.value.lock().unwrap_or_else(PoisonError::into_inner);
                value[..bytes.len()].copy_from_slice(bytes);
            }
            Some(slot) => warn!(
                "uniform at binding {} is {:?}, ignoring {:?} write",
                location.binding, slot.ty, expected
            ),
            None => warn!(
                "program {} has no uniform at binding {}",
                program.id, location.binding
            ),
        }
    }

    fn snapshot_draw(&self, index_count: u32) -> Result<RecordedDraw, String> {
        let program = self
            .state
            .program
            .clone()
            .ok_or_else(|| "no program in use".to_string())?;

        let mut vertex_buffers = Vec::with_capacity(program.interface.attributes.len());
        for attribute in &program.interface.attributes {
            let (buffer, layout) = self
                .state
                .attributes
                .get(&AttributeLocation(attribute.location))
                .ok_or_else(|| format!("attribute `{}` has no buffer bound", attribute.name))?;
            let tight = u32::from(attribute.ty.components()) * 4;
            if layout.components != attribute.ty.components() || layout.effective_stride() != tight
            {
                return Err(format!(
                    "attribute `{}` needs {} tightly packed floats",
                    attribute.name,
                    attribute.ty.components()
                ));
            }
            vertex_buffers.push((buffer.clone(), layout.offset));
        }

        let index_buffer = self
            .state
            .index
            .clone()
            .ok_or_else(|| "no index buffer bound".to_string())?;

        let uniforms = program
            .uniforms
            .iter()
            .map(|slot| (slot.location, slot.snapshot()))
            .collect();

        Ok(RecordedDraw {
            program,
            uniforms,
            vertex_buffers,
            index_buffer,
            index_count,
        })
    }
}

/// Run `create` inside out-of-memory and validation error scopes.
///
/// Returns the first error either scope caught.
fn capture_errors<T>(device: &wgpu::Device, create: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
    let out_of_memory = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let validation = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let validation_error = pollster::block_on(validation.pop());
    let out_of_memory_error = pollster::block_on(out_of_memory.pop());
    match validation_error.or(out_of_memory_error) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

/// Each attribute gets its own vertex buffer slot.
fn check_vertex_limits(attributes: usize, limits: &wgpu::Limits) -> Result<(), ShaderError> {
    let attributes = attributes as u32;
    let allowed = limits.max_vertex_buffers.min(limits.max_vertex_attributes);
    if attributes > allowed {
        return Err(ShaderError::LinkFailed {
            message: format!(
                "program reads {attributes} vertex attributes, device allows {allowed}"
            ),
        });
    }
    Ok(())
}

fn wgpu_vertex_format(ty: InterfaceType) -> Option<wgpu::VertexFormat> {
    match ty {
        InterfaceType::Float => Some(wgpu::VertexFormat::Float32),
        InterfaceType::Vec2 => Some(wgpu::VertexFormat::Float32x2),
        InterfaceType::Vec3 => Some(wgpu::VertexFormat::Float32x3),
        InterfaceType::Vec4 => Some(wgpu::VertexFormat::Float32x4),
        InterfaceType::Mat4 => None,
    }
}

impl GraphicsDevice for WgpuDevice {
    type Shader = WgpuShader;
    type Program = WgpuProgram;
    type Buffer = WgpuBuffer;

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<Self::Shader, ShaderError> {
        let compiled = compile_wgsl(stage, source)?;
        let label = format!("{}-{}", stage, compiled.entry_point);
        let module = capture_errors(&self.device, || {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&label),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
        })
        .map_err(|err| ShaderError::CompileFailed {
            stage,
            message: err.to_string(),
        })?;
        Ok(WgpuShader {
            stage: compiled,
            module,
        })
    }

    fn link_program(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, ShaderError> {
        let interface = link_stages(&vertex.stage, &fragment.stage)?;
        check_vertex_limits(interface.attributes.len(), &self.device.limits())?;

        // One buffer slot per attribute, in location order.
        let mut vertex_attributes = Vec::with_capacity(interface.attributes.len());
        for attribute in &interface.attributes {
            let format = wgpu_vertex_format(attribute.ty).ok_or_else(|| {
                ShaderError::LinkFailed {
                    message: format!("`{}` cannot be a vertex attribute", attribute.name),
                }
            })?;
            vertex_attributes.push([wgpu::VertexAttribute {
                offset: 0,
                shader_location: attribute.location,
                format,
            }]);
        }
        let vertex_layouts: Vec<wgpu::VertexBufferLayout> = vertex_attributes
            .iter()
            .map(|attributes| wgpu::VertexBufferLayout {
                array_stride: attributes[0].format.size(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = interface
            .uniforms
            .iter()
            .map(|uniform| wgpu::BindGroupLayoutEntry {
                binding: uniform.location.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(uniform.ty.uniform_size()),
                },
                count: None,
            })
            .collect();

        let depth_stencil = self.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let (bind_group_layout, pipeline) = capture_errors(&self.device, || {
            let bind_group_layout =
                self.device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some("program-uniforms-bgl"),
                        entries: &layout_entries,
                    });
            let pipeline_layout =
                self.device
                    .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("program-pipeline-layout"),
                        bind_group_layouts: &[&bind_group_layout],
                        immediate_size: 0,
                    });
            let pipeline = self
                .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("program-pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &vertex.module,
                        entry_point: Some(&interface.vertex_entry),
                        buffers: &vertex_layouts,
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        strip_index_format: None,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: Some(wgpu::Face::Back),
                        unclipped_depth: false,
                        polygon_mode: wgpu::PolygonMode::Fill,
                        conservative: false,
                    },
                    depth_stencil,
                    multisample: wgpu::MultisampleState {
                        count: 1,
                        mask: !0,
                        alpha_to_coverage_enabled: false,
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &fragment.module,
                        entry_point: Some(&interface.fragment_entry),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: self.color_format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    multiview_mask: None,
                    cache: None,
                });
            (bind_group_layout, pipeline)
        })
        .map_err(|err| ShaderError::LinkFailed {
            message: err.to_string(),
        })?;

        let uniforms = interface
            .uniforms
            .iter()
            .map(|uniform| UniformSlot {
                location: uniform.location,
                ty: uniform.ty,
                value: Mutex::new(vec![0; uniform.ty.uniform_size() as usize]),
            })
            .collect();

        let id = self.next_program_id;
        self.next_program_id += 1;
        debug!(
            "Linked program {} ({} attributes, {} uniforms)",
            id,
            interface.attributes.len(),
            interface.uniforms.len()
        );

        Ok(WgpuProgram {
            resources: Arc::new(ProgramResources {
                id,
                interface,
                pipeline,
                bind_group_layout,
                uniforms,
            }),
        })
    }

    fn attribute_location(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Option<AttributeLocation> {
        program
            .interface()
            .attribute(name)
            .map(|var| AttributeLocation(var.location))
    }

    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<UniformLocation> {
        program.interface().uniform(name).map(|var| var.location)
    }

    fn create_buffer(
        &mut self,
        label: &str,
        kind: BufferKind,
        contents: &[u8],
    ) -> Result<Self::Buffer, BufferError> {
        if contents.is_empty() {
            return Err(BufferError::Empty {
                label: label.to_string(),
            });
        }
        let size = contents.len() as u64;
        let limit = self.device.limits().max_buffer_size;
        if size > limit {
            return Err(BufferError::TooLarge {
                label: label.to_string(),
                size,
                limit,
            });
        }

        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            BufferKind::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        };
        let raw = capture_errors(&self.device, || {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage,
                })
        })
        .map_err(|err| BufferError::Backend {
            label: label.to_string(),
            message: err.to_string(),
        })?;

        Ok(WgpuBuffer {
            raw: Arc::new(raw),
            kind,
            size,
        })
    }

    fn use_program(&mut self, program: &Self::Program) {
        self.state.program = Some(program.resources.clone());
    }

    fn bind_vertex_attribute(
        &mut self,
        location: AttributeLocation,
        buffer: &Self::Buffer,
        layout: AttributeLayout,
    ) {
        self.state
            .attributes
            .insert(location, (buffer.raw.clone(), layout));
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        let columns = value.to_cols_array();
        self.write_uniform(location, InterfaceType::Mat4, bytemuck::cast_slice(&columns));
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: Vec3) {
        let components = value.to_array();
        self.write_uniform(location, InterfaceType::Vec3, bytemuck::cast_slice(&components));
    }

    fn bind_index_buffer(&mut self, buffer: &Self::Buffer) {
        self.state.index = Some(buffer.raw.clone());
    }

    fn draw_indexed(&mut self, index_count: u32) {
        match self.snapshot_draw(index_count) {
            Ok(draw) => self.draws.push(draw),
            Err(reason) => error!("skipping draw: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
        @group(0) @binding(0) var<uniform> u_transform: mat4x4<f32>;

        @vertex
        fn vs_main(@location(0) a_position: vec3<f32>) -> @builtin(position) vec4<f32> {
            return u_transform * vec4<f32>(a_position, 1.0);
        }
    "#;

    const FRAGMENT: &str = r#"
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 0.0, 0.0, 1.0);
        }
    "#;

    const WIDE_VERTEX: &str = r#"
        @vertex
        fn vs_main(
            @location(0) a0: vec4<f32>,
            @location(1) a1: vec4<f32>,
            @location(2) a2: vec4<f32>,
            @location(3) a3: vec4<f32>,
            @location(4) a4: vec4<f32>,
            @location(5) a5: vec4<f32>,
            @location(6) a6: vec4<f32>,
            @location(7) a7: vec4<f32>,
            @location(8) a8: vec4<f32>,
        ) -> @builtin(position) vec4<f32> {
            return a0 + a1 + a2 + a3 + a4 + a5 + a6 + a7 + a8;
        }
    "#;

    fn create_test_device() -> Option<WgpuDevice> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok()?;

            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                    experimental_features: wgpu::ExperimentalFeatures::default(),
                    trace: wgpu::Trace::Off,
                })
                .await
                .ok()?;

            Some(WgpuDevice::new(
                device,
                queue,
                wgpu::TextureFormat::Rgba8UnormSrgb,
                Some(wgpu::TextureFormat::Depth32Float),
            ))
        })
    }

    fn triangle(device: &mut WgpuDevice) -> (WgpuProgram, WgpuBuffer, WgpuBuffer) {
        let vertex = device.compile_shader(ShaderStage::Vertex, VERTEX).unwrap();
        let fragment = device.compile_shader(ShaderStage::Fragment, FRAGMENT).unwrap();
        let program = device.link_program(&vertex, &fragment).unwrap();

        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices: [u16; 3] = [0, 1, 2];
        let vertices = device
            .create_buffer("positions", BufferKind::Vertex, bytemuck::cast_slice(&positions))
            .unwrap();
        let index = device
            .create_buffer("indices", BufferKind::Index, bytemuck::cast_slice(&indices))
            .unwrap();
        (program, vertices, index)
    }

    fn render_target(device: &WgpuDevice, format: wgpu::TextureFormat) -> wgpu::Texture {
        device.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("test-target"),
            size: wgpu::Extent3d {
                width: 4,
                height: 4,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    #[test]
    fn test_matrices_are_not_vertex_formats() {
        assert_eq!(
            wgpu_vertex_format(InterfaceType::Vec3),
            Some(wgpu::VertexFormat::Float32x3)
        );
        assert!(wgpu_vertex_format(InterfaceType::Mat4).is_none());
    }

    #[test]
    fn test_vertex_limits_reject_extra_attributes() {
        let limits = wgpu::Limits::default();
        let allowed = limits.max_vertex_buffers as usize;

        assert!(check_vertex_limits(allowed, &limits).is_ok());
        let err = check_vertex_limits(allowed + 1, &limits).unwrap_err();
        assert!(matches!(err, ShaderError::LinkFailed { .. }));
    }

    #[test]
    fn test_link_exposes_locations() {
        let Some(mut device) = create_test_device() else {
            return;
        };
        let vertex = device.compile_shader(ShaderStage::Vertex, VERTEX).unwrap();
        let fragment = device.compile_shader(ShaderStage::Fragment, FRAGMENT).unwrap();
        let program = device.link_program(&vertex, &fragment).unwrap();

        assert_eq!(
            device.attribute_location(&program, "a_position"),
            Some(AttributeLocation(0))
        );
        assert_eq!(
            device.uniform_location(&program, "u_transform"),
            Some(UniformLocation { group: 0, binding: 0 })
        );
        assert!(device.uniform_location(&program, "u_missing").is_none());
    }

    #[test]
    fn test_too_many_attributes_fails_to_link() {
        let Some(mut device) = create_test_device() else {
            return;
        };
        let vertex = device
            .compile_shader(ShaderStage::Vertex, WIDE_VERTEX)
            .unwrap();
        let fragment = device.compile_shader(ShaderStage::Fragment, FRAGMENT).unwrap();

        let result = device.link_program(&vertex, &fragment);

        assert!(matches!(result, Err(ShaderError::LinkFailed { .. })));
    }

    #[test]
    fn test_draw_is_recorded_until_encoded() {
        let Some(mut device) = create_test_device() else {
            return;
        };
        let (program, vertices, index) = triangle(&mut device);
        assert_eq!(index.size(), 6);

        device.use_program(&program);
        device.bind_vertex_attribute(AttributeLocation(0), &vertices, AttributeLayout::FLOAT3);
        device.set_uniform_mat4(UniformLocation { group: 0, binding: 0 }, &Mat4::IDENTITY);
        device.bind_index_buffer(&index);
        device.draw_indexed(3);
        assert_eq!(device.pending_draws(), 1);

        let texture = render_target(&device, wgpu::TextureFormat::Rgba8UnormSrgb);
        let depth = render_target(&device, wgpu::TextureFormat::Depth32Float);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let pass = RenderPassBuilder::new()
            .depth(depth.create_view(&wgpu::TextureViewDescriptor::default()));
        let mut encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        let encoded = device.encode_frame(&mut encoder, &view, &pass);
        device.queue().submit([encoder.finish()]);

        assert_eq!(encoded, 1);
        assert_eq!(device.pending_draws(), 0);
    }

    #[test]
    fn test_each_draw_keeps_its_own_uniforms() {
        let Some(mut device) = create_test_device() else {
            return;
        };
        let (program, vertices, index) = triangle(&mut device);
        let transform = UniformLocation { group: 0, binding: 0 };
        let moved = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));

        device.use_program(&program);
        device.bind_vertex_attribute(AttributeLocation(0), &vertices, AttributeLayout::FLOAT3);
        device.bind_index_buffer(&index);
        device.set_uniform_mat4(transform, &Mat4::IDENTITY);
        device.draw_indexed(3);
        device.set_uniform_mat4(transform, &moved);
        device.draw_indexed(3);

        assert_eq!(device.draws.len(), 2);
        let first: Vec<f32> = bytemuck::pod_collect_to_vec(&device.draws[0].uniforms[0].1);
        let second: Vec<f32> = bytemuck::pod_collect_to_vec(&device.draws[1].uniforms[0].1);
        assert_eq!(first, Mat4::IDENTITY.to_cols_array());
        assert_eq!(second, moved.to_cols_array());
    }

    #[test]
    fn test_empty_buffer_is_rejected() {
        let Some(mut device) = create_test_device() else {
            return;
        };
        let result = device.create_buffer("empty", BufferKind::Vertex, &[]);
        assert!(matches!(result, Err(BufferError::Empty { .. })));
    }
}
