//! WGSL shader compilation, program linking and binding resolution.
//!
//! Stages are parsed and validated with naga, then reflected into a
//! [`StageInterface`] describing their vertex inputs, stage outputs and
//! uniforms. Linking checks the vertex/fragment interface and merges the
//! uniforms of both stages. [`build_program`] runs the whole sequence on a
//! [`GraphicsDevice`] and resolves a typed [`ProgramBindings`] struct so that
//! draw code never looks bindings up by name.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use thiserror::Error;

use crate::device::{AttributeLocation, GraphicsDevice, ShaderStage, UniformLocation};

/// Bind group every program uniform must live in.
pub const UNIFORM_GROUP: u32 = 0;

/// Error types for program construction.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile: {message}")]
    CompileFailed { stage: ShaderStage, message: String },

    #[error("program failed to link: {message}")]
    LinkFailed { message: String },

    #[error("{kind} `{symbol}` not found in linked program")]
    MissingBinding { kind: BindingKind, symbol: String },
}

/// Which binding table a symbol was looked up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Attribute,
    Uniform,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::Attribute => f.write_str("attribute"),
            BindingKind::Uniform => f.write_str("uniform"),
        }
    }
}

/// Shader interface value types the device layer understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl InterfaceType {
    /// Number of `f32` components.
    pub fn components(self) -> u8 {
        match self {
            InterfaceType::Float => 1,
            InterfaceType::Vec2 => 2,
            InterfaceType::Vec3 => 3,
            InterfaceType::Vec4 => 4,
            InterfaceType::Mat4 => 16,
        }
    }

    /// Size of a uniform buffer holding one value, including WGSL alignment padding.
    pub fn uniform_size(self) -> u64 {
        match self {
            InterfaceType::Float => 4,
            InterfaceType::Vec2 => 8,
            InterfaceType::Vec3 | InterfaceType::Vec4 => 16,
            InterfaceType::Mat4 => 64,
        }
    }
}

/// A located stage input or output.
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceVar {
    pub name: String,
    pub location: u32,
    pub ty: InterfaceType,
}

/// A uniform declared by a stage.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformVar {
    pub name: String,
    pub location: UniformLocation,
    pub ty: InterfaceType,
}

/// Reflected interface of one compiled stage.
#[derive(Clone, Debug, Default)]
pub struct StageInterface {
    pub inputs: Vec<InterfaceVar>,
    pub outputs: Vec<InterfaceVar>,
    pub uniforms: Vec<UniformVar>,
}

/// A validated WGSL module with its entry point and reflected interface.
#[derive(Debug)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub source: String,
    pub interface: StageInterface,
}

/// Parse, validate and reflect one WGSL stage.
pub fn compile_wgsl(stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
    let compile_error = |message: String| ShaderError::CompileFailed { stage, message };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| compile_error(err.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|err| compile_error(err.emit_to_string(source)))?;

    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga_stage)
        .ok_or_else(|| compile_error(format!("no @{stage} entry point")))?;

    let mut interface = StageInterface::default();
    for argument in &entry.function.arguments {
        collect_located(
            &module,
            argument.ty,
            argument.binding.as_ref(),
            argument.name.as_deref(),
            &mut interface.inputs,
        )
        .map_err(compile_error)?;
    }
    if let Some(result) = &entry.function.result {
        collect_located(
            &module,
            result.ty,
            result.binding.as_ref(),
            None,
            &mut interface.outputs,
        )
        .map_err(compile_error)?;
    }

    for (_, var) in module.global_variables.iter() {
        if !matches!(var.space, naga::AddressSpace::Uniform) {
            continue;
        }
        let (Some(name), Some(binding)) = (var.name.as_deref(), var.binding.as_ref()) else {
            continue;
        };
        let ty = interface_type(&module.types[var.ty].inner)
            .ok_or_else(|| compile_error(format!("uniform `{name}` has an unsupported type")))?;
        interface.uniforms.push(UniformVar {
            name: name.to_string(),
            location: UniformLocation {
                group: binding.group,
                binding: binding.binding,
            },
            ty,
        });
    }

    interface.inputs.sort_by_key(|var| var.location);
    interface.outputs.sort_by_key(|var| var.location);

    debug!(
        "Compiled {} stage '{}': {} inputs, {} outputs, {} uniforms",
        stage,
        entry.name,
        interface.inputs.len(),
        interface.outputs.len(),
        interface.uniforms.len()
    );

    Ok(CompiledStage {
        stage,
        entry_point: entry.name.clone(),
        source: source.to_string(),
        interface,
    })
}

/// Push the `@location` variables carried by a value of type `ty`.
///
/// Builtins are skipped; structs contribute their located members.
fn collect_located(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    name: Option<&str>,
    out: &mut Vec<InterfaceVar>,
) -> Result<(), String> {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            let name = name.unwrap_or("result");
            let ty = interface_type(&module.types[ty].inner)
                .ok_or_else(|| format!("`{name}` has an unsupported interface type"))?;
            out.push(InterfaceVar {
                name: name.to_string(),
                location: *location,
                ty,
            });
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_located(
                        module,
                        member.ty,
                        member.binding.as_ref(),
                        member.name.as_deref(),
                        out,
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn is_f32(scalar: naga::Scalar) -> bool {
    scalar.kind == naga::ScalarKind::Float && scalar.width == 4
}

fn interface_type(inner: &naga::TypeInner) -> Option<InterfaceType> {
    match *inner {
        naga::TypeInner::Scalar(scalar) if is_f32(scalar) => Some(InterfaceType::Float),
        naga::TypeInner::Vector {
            size: naga::VectorSize::Bi,
            scalar,
        } if is_f32(scalar) => Some(InterfaceType::Vec2),
        naga::TypeInner::Vector {
            size: naga::VectorSize::Tri,
            scalar,
        } if is_f32(scalar) => Some(InterfaceType::Vec3),
        naga::TypeInner::Vector {
            size: naga::VectorSize::Quad,
            scalar,
        } if is_f32(scalar) => Some(InterfaceType::Vec4),
        naga::TypeInner::Matrix {
            columns: naga::VectorSize::Quad,
            rows: naga::VectorSize::Quad,
            scalar,
        } if is_f32(scalar) => Some(InterfaceType::Mat4),
        _ => None,
    }
}

/// Interface of a linked program.
#[derive(Clone, Debug)]
pub struct LinkedInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    /// Vertex inputs, sorted by location.
    pub attributes: Vec<InterfaceVar>,
    /// Uniforms of both stages, sorted by location.
    pub uniforms: Vec<UniformVar>,
}

impl LinkedInterface {
    /// Look up a vertex input by name.
    pub fn attribute(&self, name: &str) -> Option<&InterfaceVar> {
        self.attributes.iter().find(|var| var.name == name)
    }

    /// Look up a uniform by name.
    pub fn uniform(&self, name: &str) -> Option<&UniformVar> {
        self.uniforms.iter().find(|var| var.name == name)
    }

    /// Look up a uniform by location.
    pub fn uniform_at(&self, location: UniformLocation) -> Option<&UniformVar> {
        self.uniforms.iter().find(|var| var.location == location)
    }
}

/// Check that `fragment` consumes only what `vertex` produces and merge uniforms.
pub fn link_stages(
    vertex: &CompiledStage,
    fragment: &CompiledStage,
) -> Result<LinkedInterface, ShaderError> {
    let link_error = |message: String| ShaderError::LinkFailed { message };

    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        return Err(link_error(format!(
            "expected vertex and fragment stages, got {} and {}",
            vertex.stage, fragment.stage
        )));
    }

    for input in &fragment.interface.inputs {
        let output = vertex
            .interface
            .outputs
            .iter()
            .find(|output| output.location == input.location)
            .ok_or_else(|| {
                link_error(format!(
                    "fragment input `{}` at location {} is not written by the vertex stage",
                    input.name, input.location
                ))
            })?;
        if output.ty != input.ty {
            return Err(link_error(format!(
                "location {} is {:?} in the vertex stage but {:?} in the fragment stage",
                input.location, output.ty, input.ty
            )));
        }
    }

    let mut uniforms: BTreeMap<UniformLocation, UniformVar> = BTreeMap::new();
    let declared = vertex
        .interface
        .uniforms
        .iter()
        .chain(&fragment.interface.uniforms);
    for uniform in declared {
        if uniform.location.group != UNIFORM_GROUP {
            return Err(link_error(format!(
                "uniform `{}` is in bind group {}, only group {} is supported",
                uniform.name, uniform.location.group, UNIFORM_GROUP
            )));
        }
        if let Some(existing) = uniforms.get(&uniform.location) {
            if existing.name != uniform.name || existing.ty != uniform.ty {
                return Err(link_error(format!(
                    "uniforms `{}` and `{}` disagree at binding {}",
                    existing.name, uniform.name, uniform.location.binding
                )));
            }
            continue;
        }
        if uniforms.values().any(|existing| existing.name == uniform.name) {
            return Err(link_error(format!(
                "uniform `{}` is declared at two different bindings",
                uniform.name
            )));
        }
        uniforms.insert(uniform.location, uniform.clone());
    }

    Ok(LinkedInterface {
        vertex_entry: vertex.entry_point.clone(),
        fragment_entry: fragment.entry_point.clone(),
        attributes: vertex.interface.inputs.clone(),
        uniforms: uniforms.into_values().collect(),
    })
}

/// Typed set of binding locations resolved once after linking.
pub trait ProgramBindings: Sized {
    /// Resolve every required symbol, failing on the first missing one.
    fn resolve<D: GraphicsDevice>(resolver: &BindingResolver<'_, D>) -> Result<Self, ShaderError>;
}

/// Name lookups against a freshly linked program.
pub struct BindingResolver<'a, D: GraphicsDevice> {
    device: &'a D,
    program: &'a D::Program,
}

impl<D: GraphicsDevice> BindingResolver<'_, D> {
    /// Location of a required vertex attribute.
    pub fn attribute(&self, name: &str) -> Result<AttributeLocation, ShaderError> {
        self.device
            .attribute_location(self.program, name)
            .ok_or_else(|| ShaderError::MissingBinding {
                kind: BindingKind::Attribute,
                symbol: name.to_string(),
            })
    }

    /// Location of a required uniform.
    pub fn uniform(&self, name: &str) -> Result<UniformLocation, ShaderError> {
        self.device
            .uniform_location(self.program, name)
            .ok_or_else(|| ShaderError::MissingBinding {
                kind: BindingKind::Uniform,
                symbol: name.to_string(),
            })
    }
}

/// A linked program together with its resolved bindings.
pub struct ShaderProgram<D: GraphicsDevice, B> {
    handle: D::Program,
    bindings: B,
}

impl<D: GraphicsDevice, B> ShaderProgram<D, B> {
    /// Device program handle.
    pub fn handle(&self) -> &D::Program {
        &self.handle
    }

    /// Resolved binding locations.
    pub fn bindings(&self) -> &B {
        &self.bindings
    }
}

/// Compile both stages, link them and resolve `B`.
pub fn build_program<D, B>(
    device: &mut D,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<ShaderProgram<D, B>, ShaderError>
where
    D: GraphicsDevice,
    B: ProgramBindings,
{
    let vertex = device.compile_shader(ShaderStage::Vertex, vertex_source)?;
    let fragment = device.compile_shader(ShaderStage::Fragment, fragment_source)?;
    let handle = device.link_program(&vertex, &fragment)?;

    let bindings = B::resolve(&BindingResolver {
        device: &*device,
        program: &handle,
    })?;

    Ok(ShaderProgram { handle, bindings })
}
