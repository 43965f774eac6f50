//! Command-recording backend
//!
//! [`HeadlessBackend`] implements [`GpuBackend`] without a GPU. Every call is
//! appended to a command log that tests and tools can inspect. Programs expose
//! the uniforms and attributes declared in their GLSL sources, so location
//! lookups behave like a real driver's reflection.
//!
//! Failure injection covers the degraded paths: allocation limits, compile and
//! link errors, and rejected draws. Textures whose pixel data does not match
//! their dimensions are rejected as a driver would.

use std::collections::HashMap;

use log::trace;

use super::backend::{
    AttributeLocation, BufferHandle, GpuBackend, GpuResult, IndexedDraw, ProgramBuild, ProgramHandle,
    SamplerState, ShaderDiagnostic, ShaderStage, TextureHandle, UniformLocation, UniformValue,
    VertexAttribute,
};
use super::error::GpuError;
use super::resources::ImageData;
use crate::document::{BufferTarget, PrimitiveMode};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    /// A buffer was allocated
    CreateBuffer {
        /// New handle
        handle: BufferHandle,
        /// Binding target
        target: BufferTarget,
        /// Uploaded size in bytes
        size: usize,
    },
    /// A texture was allocated
    CreateTexture {
        /// New handle
        handle: TextureHandle,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
        /// Sampling state
        sampler: SamplerState,
    },
    /// A program was built
    CreateProgram {
        /// New handle
        handle: ProgramHandle,
    },
    /// A program was made current
    UseProgram(ProgramHandle),
    /// A uniform of the current program was assigned
    SetUniform {
        /// Uniform name
        name: String,
        /// Assigned value
        value: UniformValue,
    },
    /// A texture was bound
    BindTexture {
        /// Texture unit
        unit: u32,
        /// Bound texture
        texture: TextureHandle,
    },
    /// Blending was switched
    SetBlending(bool),
    /// An attribute was pointed at a buffer
    BindAttribute {
        /// Attribute name
        name: String,
        /// Buffer region
        attribute: VertexAttribute,
    },
    /// An attribute was disabled
    DisableAttribute {
        /// Attribute name
        name: String,
    },
    /// An indexed draw was issued
    DrawIndexed(IndexedDraw),
    /// A non-indexed draw was issued
    DrawArrays {
        /// Topology
        mode: PrimitiveMode,
        /// First vertex
        first: usize,
        /// Vertex count
        count: usize,
    },
}

impl GpuCommand {
    /// Whether the command is a draw call
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawIndexed(_) | Self::DrawArrays { .. })
    }
}

/// Names a program exposes, indexed by location
#[derive(Debug, Default)]
struct ProgramReflection {
    uniforms: Vec<String>,
    attributes: Vec<String>,
}

/// GPU backend that records commands instead of executing them
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    commands: Vec<GpuCommand>,
    next_handle: u64,
    allocations: usize,
    allocation_limit: Option<usize>,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    textures: usize,
    programs: HashMap<ProgramHandle, ProgramReflection>,
    current_program: Option<ProgramHandle>,
    compile_errors: Vec<(ShaderStage, String)>,
    link_error: Option<String>,
    fail_draws: bool,
}

impl HeadlessBackend {
    /// Create a backend with no failure injection
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every buffer or texture allocation after the first `limit`
    pub fn with_allocation_limit(mut self, limit: usize) -> Self {
        self.allocation_limit = Some(limit);
        self
    }

    /// Report a compile error for `stage`; that stage's declarations are not exposed
    pub fn with_compile_error(mut self, stage: ShaderStage, log: impl Into<String>) -> Self {
        self.compile_errors.push((stage, log.into()));
        self
    }

    /// Report a link error; the program exposes nothing
    pub fn with_link_error(mut self, log: impl Into<String>) -> Self {
        self.link_error = Some(log.into());
        self
    }

    /// Reject every draw call
    pub fn with_failing_draws(mut self) -> Self {
        self.fail_draws = true;
        self
    }

    /// All recorded commands in call order
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// Drain the command log
    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded draw calls in call order
    pub fn draw_calls(&self) -> Vec<&GpuCommand> {
        self.commands.iter().filter(|c| c.is_draw()).collect()
    }

    /// Values assigned to the uniform `name`, in call order
    pub fn uniform_values(&self, name: &str) -> Vec<UniformValue> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                GpuCommand::SetUniform { name: n, value } if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Number of live buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures
    }

    /// Contents uploaded to a buffer
    pub fn buffer_data(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle).map(Vec::as_slice)
    }

    fn allocate(&mut self, what: &str) -> GpuResult<u64> {
        if self.allocation_limit.is_some_and(|limit| self.allocations >= limit) {
            return Err(GpuError::OutOfMemory(what.to_string()));
        }
        self.allocations += 1;
        Ok(self.next_id())
    }

    fn next_id(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn reflection(&self) -> Option<&ProgramReflection> {
        self.programs.get(&self.current_program?)
    }

    fn failed(&self, stage: ShaderStage) -> bool {
        self.compile_errors.iter().any(|(s, _)| *s == stage)
    }
}

/// Names declared with `keyword` in GLSL source, e.g. `uniform mat4 u_model;`
fn declared_names(source: &str, keyword: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let line = line.trim().strip_suffix(';')?;
            let mut tokens = line.split_whitespace();
            if tokens.next()? != keyword {
                return None;
            }
            tokens.last().map(str::to_string)
        })
        .collect()
}

impl GpuBackend for HeadlessBackend {
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> GpuResult<BufferHandle> {
        let handle = BufferHandle(self.allocate("buffer")?);
        self.buffers.insert(handle, data.to_vec());
        self.commands.push(GpuCommand::CreateBuffer {
            handle,
            target,
            size: data.len(),
        });
        trace!("Created buffer {} ({} bytes)", handle.0, data.len());
        Ok(handle)
    }

    fn create_texture(&mut self, image: &ImageData, sampler: &SamplerState) -> GpuResult<TextureHandle> {
        let expected = (image.width as usize)
            .checked_mul(image.height as usize)
            .and_then(|pixels| pixels.checked_mul(usize::from(image.channels)));
        if expected != Some(image.data.len()) {
            return Err(GpuError::InvalidResource(format!(
                "{}x{} image with {} channels has {} bytes of pixel data",
                image.width,
                image.height,
                image.channels,
                image.data.len()
            )));
        }
        let handle = TextureHandle(self.allocate("texture")?);
        self.textures += 1;
        self.commands.push(GpuCommand::CreateTexture {
            handle,
            width: image.width,
            height: image.height,
            sampler: *sampler,
        });
        Ok(handle)
    }

    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> GpuResult<ProgramBuild> {
        let handle = ProgramHandle(self.next_id());
        let mut diagnostics: Vec<ShaderDiagnostic> = self
            .compile_errors
            .iter()
            .map(|(stage, log)| ShaderDiagnostic::Compile {
                stage: *stage,
                log: log.clone(),
            })
            .collect();

        let mut reflection = ProgramReflection::default();
        if let Some(log) = &self.link_error {
            diagnostics.push(ShaderDiagnostic::Link { log: log.clone() });
        } else {
            if !self.failed(ShaderStage::Vertex) {
                reflection.uniforms.extend(declared_names(vertex_source, "uniform"));
                reflection.attributes.extend(declared_names(vertex_source, "attribute"));
            }
            if !self.failed(ShaderStage::Fragment) {
                for name in declared_names(fragment_source, "uniform") {
                    if !reflection.uniforms.contains(&name) {
                        reflection.uniforms.push(name);
                    }
                }
            }
        }

        self.programs.insert(handle, reflection);
        self.commands.push(GpuCommand::CreateProgram { handle });
        Ok(ProgramBuild {
            program: handle,
            diagnostics,
        })
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let reflection = self.programs.get(&program)?;
        let index = reflection.uniforms.iter().position(|n| n == name)?;
        Some(UniformLocation(index as u32))
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<AttributeLocation> {
        let reflection = self.programs.get(&program)?;
        let index = reflection.attributes.iter().position(|n| n == name)?;
        Some(AttributeLocation(index as u32))
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
        self.commands.push(GpuCommand::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let name = self
            .reflection()
            .and_then(|r| r.uniforms.get(location.0 as usize))
            .cloned()
            .unwrap_or_else(|| format!("#{}", location.0));
        self.commands.push(GpuCommand::SetUniform { name, value });
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.commands.push(GpuCommand::BindTexture { unit, texture });
    }

    fn set_blending(&mut self, enabled: bool) {
        self.commands.push(GpuCommand::SetBlending(enabled));
    }

    fn bind_attribute(&mut self, location: AttributeLocation, attribute: &VertexAttribute) {
        let name = self
            .reflection()
            .and_then(|r| r.attributes.get(location.0 as usize))
            .cloned()
            .unwrap_or_else(|| format!("#{}", location.0));
        self.commands.push(GpuCommand::BindAttribute {
            name,
            attribute: *attribute,
        });
    }

    fn disable_attribute(&mut self, location: AttributeLocation) {
        let name = self
            .reflection()
            .and_then(|r| r.attributes.get(location.0 as usize))
            .cloned()
            .unwrap_or_else(|| format!("#{}", location.0));
        self.commands.push(GpuCommand::DisableAttribute { name });
    }

    fn draw_indexed(&mut self, draw: &IndexedDraw) -> GpuResult<()> {
        if self.fail_draws {
            return Err(GpuError::DrawFailed("draws are disabled".to_string()));
        }
        self.commands.push(GpuCommand::DrawIndexed(*draw));
        Ok(())
    }

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: usize, count: usize) -> GpuResult<()> {
        if self.fail_draws {
            return Err(GpuError::DrawFailed("draws are disabled".to_string()));
        }
        self.commands.push(GpuCommand::DrawArrays { mode, first, count });
        Ok(())
    }
}
