//! # GPU Backend Abstraction
//!
//! The renderer never talks to a graphics API directly. It drives a
//! [`GpuBackend`], which owns the GPU context and turns these calls into
//! native API calls. The host must make the backend's context current on the
//! calling thread before building or rendering.
//!
//! ## Contract
//!
//! - **Build time**: buffers, textures and the shader program are created
//!   once. Allocation failures are returned as [`GpuError`] and abort the
//!   build.
//! - **Frame time**: state changes are infallible; only draw calls report
//!   errors, and the renderer treats those as per-item degradation.
//! - **Programs**: compile and link problems are not errors. They come back
//!   as diagnostics alongside a program handle whose missing uniforms and
//!   attributes simply have no location.

use crate::document::{BufferTarget, ComponentType, Filter, PrimitiveMode, Sampler, Wrap};
use crate::foundation::math::Mat4;

use super::error::GpuError;
use super::resources::ImageData;

/// Result type for backend operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Location of a uniform within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Location of a vertex attribute within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeLocation(pub u32);

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

/// Problem reported while building a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderDiagnostic {
    /// A stage failed to compile
    Compile {
        /// Failing stage
        stage: ShaderStage,
        /// Compiler output
        log: String,
    },
    /// Linking failed
    Link {
        /// Linker output
        log: String,
    },
}

/// Outcome of building a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramBuild {
    /// Program handle, usable even when diagnostics are present
    pub program: ProgramHandle,
    /// Compile and link problems
    pub diagnostics: Vec<ShaderDiagnostic>,
}

/// Filtering and wrapping applied to a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerState {
    /// Magnification filter
    pub mag_filter: Filter,
    /// Minification filter
    pub min_filter: Filter,
    /// Horizontal wrapping
    pub wrap_s: Wrap,
    /// Vertical wrapping
    pub wrap_t: Wrap,
}

impl Default for SamplerState {
    /// Nearest filtering with repeat wrapping
    fn default() -> Self {
        Self {
            mag_filter: Filter::Nearest,
            min_filter: Filter::Nearest,
            wrap_s: Wrap::Repeat,
            wrap_t: Wrap::Repeat,
        }
    }
}

impl SamplerState {
    /// State for a document sampler, or the default when there is none
    pub fn from_sampler(sampler: Option<&Sampler>) -> Self {
        match sampler {
            Some(sampler) => Self {
                mag_filter: sampler.mag_filter.unwrap_or_default(),
                min_filter: sampler.min_filter.unwrap_or_default(),
                wrap_s: sampler.wrap_s,
                wrap_t: sampler.wrap_t,
            },
            None => Self::default(),
        }
    }
}

/// How a vertex attribute is fetched from a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Source buffer
    pub buffer: BufferHandle,
    /// Components per vertex (1 to 4)
    pub components: usize,
    /// Scalar type of each component
    pub component_type: ComponentType,
    /// Map integer components to `[0, 1]` or `[-1, 1]`
    pub normalized: bool,
    /// Bytes between consecutive vertices; zero means tightly packed
    pub stride: usize,
    /// Byte offset of the first vertex within the buffer
    pub offset: usize,
}

/// Parameters of an indexed draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedDraw {
    /// Topology
    pub mode: PrimitiveMode,
    /// Buffer holding the indices
    pub buffer: BufferHandle,
    /// Number of indices to draw
    pub count: usize,
    /// Unsigned integer type of each index
    pub component_type: ComponentType,
    /// Byte offset of the first index within the buffer
    pub offset: usize,
}

/// Value assigned to a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// 4x4 matrix, column-major
    Mat4(Mat4),
    /// 4-component vector
    Vec4([f32; 4]),
    /// Float scalar
    Float(f32),
    /// Integer scalar, also used for booleans and sampler units
    Int(i32),
}

/// # GPU Backend Trait
///
/// The capability set the renderer needs from the GPU command layer.
pub trait GpuBackend {
    /// Allocate a buffer and upload `data`
    ///
    /// # Arguments
    /// * `target` - Binding target the buffer will be used with
    /// * `data` - Bytes to upload
    ///
    /// # Returns
    /// Handle to the new buffer, or an allocation error
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> GpuResult<BufferHandle>;

    /// Allocate a texture from decoded RGBA8 pixels
    ///
    /// # Arguments
    /// * `image` - Decoded pixels
    /// * `sampler` - Filtering and wrapping to apply
    fn create_texture(&mut self, image: &ImageData, sampler: &SamplerState) -> GpuResult<TextureHandle>;

    /// Compile and link a program from GLSL sources
    ///
    /// Compile and link failures are reported through
    /// [`ProgramBuild::diagnostics`]; only an allocation failure is an error.
    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> GpuResult<ProgramBuild>;

    /// Location of a uniform, or `None` if the program does not expose it
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Location of a vertex attribute, or `None` if the program does not expose it
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<AttributeLocation>;

    /// Make `program` current for subsequent uniform and draw calls
    fn use_program(&mut self, program: ProgramHandle);

    /// Assign a uniform of the current program
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Enable or disable alpha blending
    fn set_blending(&mut self, enabled: bool);

    /// Point an attribute location at a buffer region and enable it
    fn bind_attribute(&mut self, location: AttributeLocation, attribute: &VertexAttribute);

    /// Disable an attribute location
    fn disable_attribute(&mut self, location: AttributeLocation);

    /// Issue an indexed draw
    fn draw_indexed(&mut self, draw: &IndexedDraw) -> GpuResult<()>;

    /// Issue a non-indexed draw of `count` vertices starting at `first`
    fn draw_arrays(&mut self, mode: PrimitiveMode, first: usize, count: usize) -> GpuResult<()>;
}
