//! CPU-side recording device.
//!
//! [`HeadlessDevice`] implements [`GraphicsDevice`] without a GPU: shaders
//! go through the same naga front end as the wgpu device, buffers keep
//! their uploaded bytes, and every draw is validated against the current
//! binding state and recorded as a [`DrawRecord`]. Used for offline runs
//! and for inspecting what a renderable submits.

use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use glam::{Mat4, Vec3};
use log::{error, warn};

use crate::buffer::BufferError;
use crate::device::{
    AttributeLayout, AttributeLocation, BufferKind, DeviceBuffer, GraphicsDevice, INDEX_SIZE,
    ShaderStage, UniformLocation,
};
use crate::shader::{CompiledStage, InterfaceType, LinkedInterface, ShaderError, compile_wgsl, link_stages};

/// Default maximum buffer size, matching `wgpu::Limits::default()`.
pub const DEFAULT_MAX_BUFFER_SIZE: u64 = 256 << 20;

struct BufferRecord {
    id: u64,
    label: String,
    kind: BufferKind,
    contents: Vec<u8>,
}

/// Buffer owned by a [`HeadlessDevice`]. Dropping it releases the buffer.
pub struct HeadlessBuffer {
    record: Rc<BufferRecord>,
}

impl HeadlessBuffer {
    /// Device-unique buffer id.
    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// Debug label given at creation.
    pub fn label(&self) -> &str {
        &self.record.label
    }

    /// Uploaded bytes.
    pub fn contents(&self) -> &[u8] {
        &self.record.contents
    }

    /// Contents read back as `f32` values.
    pub fn read_f32(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(&self.record.contents)
    }

    /// Contents read back as `u16` values.
    pub fn read_u16(&self) -> Vec<u16> {
        bytemuck::pod_collect_to_vec(&self.record.contents)
    }
}

impl DeviceBuffer for HeadlessBuffer {
    fn size(&self) -> u64 {
        self.record.contents.len() as u64
    }

    fn kind(&self) -> BufferKind {
        self.record.kind
    }
}

/// A compiled stage.
pub struct HeadlessShader {
    stage: CompiledStage,
}

struct ProgramRecord {
    id: u64,
    interface: LinkedInterface,
}

/// A linked program. Dropping it releases the program.
pub struct HeadlessProgram {
    record: Rc<ProgramRecord>,
}

impl HeadlessProgram {
    /// Device-unique program id.
    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// Reflected program interface.
    pub fn interface(&self) -> &LinkedInterface {
        &self.record.interface
    }
}

/// Value last written to a uniform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec3(Vec3),
}

/// A validated indexed draw.
#[derive(Clone, Debug)]
pub struct DrawRecord {
    pub program_id: u64,
    pub index_buffer_id: u64,
    pub index_count: u32,
    /// Buffer id and layout per attribute, sorted by location.
    pub attributes: Vec<(AttributeLocation, u64, AttributeLayout)>,
    /// Uniform values at draw time, keyed by uniform name.
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl DrawRecord {
    /// Matrix uniform value by name.
    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        match self.uniforms.get(name) {
            Some(UniformValue::Mat4(value)) => Some(*value),
            _ => None,
        }
    }

    /// Vector uniform value by name.
    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.uniforms.get(name) {
            Some(UniformValue::Vec3(value)) => Some(*value),
            _ => None,
        }
    }

    /// Buffer id bound to `location`.
    pub fn attribute_buffer(&self, location: AttributeLocation) -> Option<u64> {
        self.attributes
            .iter()
            .find(|(bound, _, _)| *bound == location)
            .map(|(_, id, _)| *id)
    }
}

struct BoundAttribute {
    buffer: Weak<BufferRecord>,
    layout: AttributeLayout,
}

#[derive(Default)]
struct BindingState {
    program: Option<Weak<ProgramRecord>>,
    attributes: BTreeMap<AttributeLocation, BoundAttribute>,
    index: Option<Weak<BufferRecord>>,
}

/// Recording [`GraphicsDevice`] with no GPU behind it.
pub struct HeadlessDevice {
    next_id: u64,
    max_buffer_size: u64,
    buffers_created: usize,
    buffers: Vec<Weak<BufferRecord>>,
    programs: Vec<Weak<ProgramRecord>>,
    uniforms: HashMap<(u64, UniformLocation), UniformValue>,
    state: BindingState,
    draws: Vec<DrawRecord>,
    rejected_draws: usize,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Create a device with the default buffer size limit.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            buffers_created: 0,
            buffers: Vec::new(),
            programs: Vec::new(),
            uniforms: HashMap::new(),
            state: BindingState::default(),
            draws: Vec::new(),
            rejected_draws: 0,
        }
    }

    /// Override the maximum size of a single buffer.
    pub fn with_max_buffer_size(mut self, limit: u64) -> Self {
        self.max_buffer_size = limit;
        self
    }

    /// Buffers created over the device's lifetime.
    pub fn buffers_created(&self) -> usize {
        self.buffers_created
    }

    /// Buffers whose handles are still alive.
    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|b| b.strong_count() > 0).count()
    }

    /// Programs whose handles are still alive.
    pub fn live_programs(&self) -> usize {
        self.programs.iter().filter(|p| p.strong_count() > 0).count()
    }

    /// Draws recorded since the last [`take_draws`](Self::take_draws).
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Drain the recorded draws.
    pub fn take_draws(&mut self) -> Vec<DrawRecord> {
        std::mem::take(&mut self.draws)
    }

    /// Draws dropped because the binding state was incomplete.
    pub fn rejected_draws(&self) -> usize {
        self.rejected_draws
    }

    /// Last value written to a uniform of `program`.
    pub fn uniform(&self, program: &HeadlessProgram, name: &str) -> Option<UniformValue> {
        let uniform = program.interface().uniform(name)?;
        self.uniforms.get(&(program.id(), uniform.location)).copied()
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Forget released buffers and programs, and the uniform values of
    /// released programs.
    fn prune_released(&mut self) {
        self.buffers.retain(|buffer| buffer.strong_count() > 0);
        self.programs.retain(|program| program.strong_count() > 0);
        let live: Vec<u64> = self
            .programs
            .iter()
            .filter_map(Weak::upgrade)
            .map(|program| program.id)
            .collect();
        self.uniforms
            .retain(|(program_id, _), _| live.contains(program_id));
    }

    fn current_program(&self) -> Option<Rc<ProgramRecord>> {
        self.state.program.as_ref().and_then(Weak::upgrade)
    }

    fn set_uniform(&mut self, location: UniformLocation, expected: InterfaceType, value: UniformValue) {
        let Some(program) = self.current_program() else {
            warn!("uniform write at binding {} with no program in use", location.binding);
            return;
        };
        match program.interface.uniform_at(location) {
            Some(uniform) if uniform.ty == expected => {
                self.uniforms.insert((program.id, location), value);
            }
            Some(uniform) => warn!(
                "uniform `{}` is {:?}, ignoring {:?} write",
                uniform.name, uniform.ty, expected
            ),
            None => warn!(
                "program {} has no uniform at binding {}",
                program.id, location.binding
            ),
        }
    }

    /// Check the binding state for an indexed draw and snapshot it.
    fn validate_draw(&self, index_count: u32) -> Result<DrawRecord, String> {
        let program = self
            .current_program()
            .ok_or_else(|| "no program in use".to_string())?;

        let mut attributes = Vec::with_capacity(program.interface.attributes.len());
        let mut vertex_limit = u64::MAX;
        for attribute in &program.interface.attributes {
            let location = AttributeLocation(attribute.location);
            let bound = self
                .state
                .attributes
                .get(&location)
                .ok_or_else(|| format!("attribute `{}` has no buffer bound", attribute.name))?;
            let buffer = bound
                .buffer
                .upgrade()
                .ok_or_else(|| format!("buffer bound to `{}` was released", attribute.name))?;
            if bound.layout.components != attribute.ty.components() {
                return Err(format!(
                    "attribute `{}` expects {} components, layout supplies {}",
                    attribute.name,
                    attribute.ty.components(),
                    bound.layout.components
                ));
            }
            let available = (buffer.contents.len() as u64).saturating_sub(bound.layout.offset);
            vertex_limit = vertex_limit.min(available / u64::from(bound.layout.effective_stride()));
            attributes.push((location, buffer.id, bound.layout));
        }

        let index_buffer = self
            .state
            .index
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| "no index buffer bound".to_string())?;
        let needed = u64::from(index_count) * INDEX_SIZE;
        if needed > index_buffer.contents.len() as u64 {
            return Err(format!(
                "draw of {} indices overruns index buffer '{}'",
                index_count, index_buffer.label
            ));
        }

        let indices: Vec<u16> =
            bytemuck::pod_collect_to_vec(&index_buffer.contents[..needed as usize]);
        if let Some(bad) = indices
            .iter()
            .find(|&&index| u64::from(index) >= vertex_limit)
        {
            return Err(format!(
                "index {} out of range for {} vertices",
                bad, vertex_limit
            ));
        }

        let uniforms = program
            .interface
            .uniforms
            .iter()
            .filter_map(|uniform| {
                self.uniforms
                    .get(&(program.id, uniform.location))
                    .map(|value| (uniform.name.clone(), *value))
            })
            .collect();

        Ok(DrawRecord {
            program_id: program.id,
            index_buffer_id: index_buffer.id,
            index_count,
            attributes,
            uniforms,
        })
    }
}

impl GraphicsDevice for HeadlessDevice {
    type Shader = HeadlessShader;
    type Program = HeadlessProgram;
    type Buffer = HeadlessBuffer;

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<Self::Shader, ShaderError> {
        Ok(HeadlessShader {
            stage: compile_wgsl(stage, source)?,
        })
    }

    fn link_program(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, ShaderError> {
        let interface = link_stages(&vertex.stage, &fragment.stage)?;
        self.prune_released();
        let record = Rc::new(ProgramRecord {
            id: self.allocate_id(),
            interface,
        });
        self.programs.push(Rc::downgrade(&record));
        Ok(HeadlessProgram { record })
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
        if size > self.max_buffer_size {
            return Err(BufferError::TooLarge {
                label: label.to_string(),
                size,
                limit: self.max_buffer_size,
            });
        }

        self.prune_released();
        self.buffers_created += 1;
        let record = Rc::new(BufferRecord {
            id: self.allocate_id(),
            label: label.to_string(),
            kind,
            contents: contents.to_vec(),
        });
        self.buffers.push(Rc::downgrade(&record));
        Ok(HeadlessBuffer { record })
    }

    fn use_program(&mut self, program: &Self::Program) {
        self.state.program = Some(Rc::downgrade(&program.record));
    }

    fn bind_vertex_attribute(
        &mut self,
        location: AttributeLocation,
        buffer: &Self::Buffer,
        layout: AttributeLayout,
    ) {
        if buffer.kind() != BufferKind::Vertex {
            warn!("buffer '{}' bound as a vertex attribute", buffer.label());
        }
        self.state.attributes.insert(
            location,
            BoundAttribute {
                buffer: Rc::downgrade(&buffer.record),
                layout,
            },
        );
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        self.set_uniform(location, InterfaceType::Mat4, UniformValue::Mat4(*value));
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: Vec3) {
        self.set_uniform(location, InterfaceType::Vec3, UniformValue::Vec3(value));
    }

    fn bind_index_buffer(&mut self, buffer: &Self::Buffer) {
        if buffer.kind() != BufferKind::Index {
            warn!("buffer '{}' bound as an index buffer", buffer.label());
        }
        self.state.index = Some(Rc::downgrade(&buffer.record));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        match self.validate_draw(index_count) {
            Ok(record) => self.draws.push(record),
            Err(reason) => {
                error!("skipping draw: {}", reason);
                self.rejected_draws += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
        @group(0) @binding(0) var<uniform> u_offset: vec3<f32>;
        @group(0) @binding(1) var<uniform> u_transform: mat4x4<f32>;

        @vertex
        fn vs_main(@location(0) a_position: vec3<f32>) -> @builtin(position) vec4<f32> {
            return u_transform * vec4<f32>(a_position + u_offset, 1.0);
        }
    "#;

    const FRAGMENT: &str = r#"
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 1.0, 1.0, 1.0);
        }
    "#;

    fn triangle_program(device: &mut HeadlessDevice) -> HeadlessProgram {
        let vertex = device.compile_shader(ShaderStage::Vertex, VERTEX).unwrap();
        let fragment = device.compile_shader(ShaderStage::Fragment, FRAGMENT).unwrap();
        device.link_program(&vertex, &fragment).unwrap()
    }

    fn upload(device: &mut HeadlessDevice) -> (HeadlessBuffer, HeadlessBuffer) {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices: [u16; 3] = [0, 1, 2];
        let vertices = device
            .create_buffer("positions", BufferKind::Vertex, bytemuck::cast_slice(&positions))
            .unwrap();
        let index = device
            .create_buffer("indices", BufferKind::Index, bytemuck::cast_slice(&indices))
            .unwrap();
        (vertices, index)
    }

    #[test]
    fn test_complete_draw_is_recorded() {
        let mut device = HeadlessDevice::new();
        let program = triangle_program(&mut device);
        let (vertices, index) = upload(&mut device);
        let transform = device.uniform_location(&program, "u_transform").unwrap();

        device.use_program(&program);
        device.bind_vertex_attribute(AttributeLocation(0), &vertices, AttributeLayout::FLOAT3);
        device.set_uniform_mat4(transform, &Mat4::IDENTITY);
        device.bind_index_buffer(&index);
        device.draw_indexed(3);

        assert_eq!(device.draws().len(), 1);
        let draw = &device.draws()[0];
        assert_eq!(draw.index_count, 3);
        assert_eq!(draw.mat4("u_transform"), Some(Mat4::IDENTITY));
        assert_eq!(draw.attribute_buffer(AttributeLocation(0)), Some(vertices.id()));
    }

    #[test]
    fn test_draw_without_program_is_rejected() {
        let mut device = HeadlessDevice::new();
        let (vertices, index) = upload(&mut device);
        device.bind_vertex_attribute(AttributeLocation(0), &vertices, AttributeLayout::FLOAT3);
        device.bind_index_buffer(&index);
        device.draw_indexed(3);

        assert!(device.draws().is_empty());
        assert_eq!(device.rejected_draws(), 1);
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut device = HeadlessDevice::new();
        let program = triangle_program(&mut device);
        let (vertices, _) = upload(&mut device);
        let bad: [u16; 3] = [0, 1, 7];
        let index = device
            .create_buffer("bad", BufferKind::Index, bytemuck::cast_slice(&bad))
            .unwrap();

        device.use_program(&program);
        device.bind_vertex_attribute(AttributeLocation(0), &vertices, AttributeLayout::FLOAT3);
        device.bind_index_buffer(&index);
        device.draw_indexed(3);

        assert_eq!(device.rejected_draws(), 1);
    }

    #[test]
    fn test_layout_component_mismatch_is_rejected() {
        let mut device = HeadlessDevice::new();
        let program = triangle_program(&mut device);
        let (vertices, index) = upload(&mut device);

        device.use_program(&program);
        device.bind_vertex_attribute(AttributeLocation(0), &vertices, AttributeLayout::FLOAT4);
        device.bind_index_buffer(&index);
        device.draw_indexed(3);

        assert_eq!(device.rejected_draws(), 1);
    }

    #[test]
    fn test_uniform_type_mismatch_is_ignored() {
        let mut device = HeadlessDevice::new();
        let program = triangle_program(&mut device);
        let offset = device.uniform_location(&program, "u_offset").unwrap();

        device.use_program(&program);
        device.set_uniform_mat4(offset, &Mat4::IDENTITY);
        assert_eq!(device.uniform(&program, "u_offset"), None);

        device.set_uniform_vec3(offset, Vec3::X);
        assert_eq!(device.uniform(&program, "u_offset"), Some(UniformValue::Vec3(Vec3::X)));
    }

    #[test]
    fn test_dropping_handles_releases_resources() {
        let mut device = HeadlessDevice::new();
        let program = triangle_program(&mut device);
        let (vertices, index) = upload(&mut device);
        assert_eq!(device.live_buffers(), 2);
        assert_eq!(device.live_programs(), 1);

        drop(vertices);
        drop(index);
        drop(program);

        assert_eq!(device.buffers_created(), 2);
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_released_program_state_is_forgotten() {
        let mut device = HeadlessDevice::new();
        let program = triangle_program(&mut device);
        let offset = device.uniform_location(&program, "u_offset").unwrap();
        device.use_program(&program);
        device.set_uniform_vec3(offset, Vec3::Y);
        let (vertices, index) = upload(&mut device);
        assert_eq!(device.uniforms.len(), 1);

        drop(program);
        drop(vertices);
        drop(index);
        let replacement = triangle_program(&mut device);

        assert!(device.uniforms.is_empty());
        assert_eq!(device.programs.len(), 1);
        assert_eq!(device.uniform(&replacement, "u_offset"), None);

        let _kept = device
            .create_buffer("kept", BufferKind::Vertex, &[0u8; 12])
            .unwrap();
        assert_eq!(device.buffers.len(), 1);
        assert_eq!(device.buffers_created(), 3);
    }

    #[test]
    fn test_buffer_size_limit() {
        let mut device = HeadlessDevice::new().with_max_buffer_size(8);
        let result = device.create_buffer("big", BufferKind::Vertex, &[0u8; 16]);
        assert!(matches!(result, Err(BufferError::TooLarge { size: 16, limit: 8, .. })));
    }

    #[test]
    fn test_buffer_readback() {
        let mut device = HeadlessDevice::new();
        let (vertices, index) = upload(&mut device);
        assert_eq!(vertices.read_f32()[3], 1.0);
        assert_eq!(index.read_u16(), vec![0, 1, 2]);
    }
}
