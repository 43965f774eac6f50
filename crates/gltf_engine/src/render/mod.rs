//! # Rendering System
//!
//! Forward rendering of a loaded document through a pluggable GPU backend.
//!
//! ## Architecture
//!
//! - **SceneRenderer**: builds GPU state once, then draws frames
//! - **GpuBackend**: the seam to a graphics API; [`HeadlessBackend`] records
//!   commands instead of drawing
//! - **GpuResources**: buffers and textures uploaded from the document
//! - **ShaderProgramManager**: the shared program and its resolved locations
//! - **RenderLists**: opaque and transparent items in scene order

pub mod backend;
pub mod error;
pub mod headless;
pub mod render_list;
pub mod renderer;
pub mod resources;
pub mod shader;

pub use backend::{
    AttributeLocation, BufferHandle, GpuBackend, GpuResult, IndexedDraw, ProgramBuild, ProgramHandle,
    SamplerState, ShaderDiagnostic, ShaderStage, TextureHandle, UniformLocation, UniformValue, VertexAttribute,
};
pub use error::{BuildError, GpuError, RenderWarning};
pub use headless::{GpuCommand, HeadlessBackend};
pub use render_list::{DrawCall, DrawFlags, ListKind, PreparedDraw, RenderItem, RenderLists};
pub use renderer::{FrameStats, SceneRenderer};
pub use resources::{GpuResources, ImageData};
pub use shader::{AttributeSlot, ProgramId, ShaderProgram, ShaderProgramManager};
