//! Render error handling
//!
//! Two severities exist. [`BuildError`] is fatal and aborts renderer
//! construction. [`RenderWarning`] describes a degraded resource: it is logged,
//! kept on the renderer for inspection, and the affected item draws without
//! the resource or not at all.

use crate::document::Semantic;
use crate::scene::SceneError;

use super::backend::ShaderStage;

/// Failure reported by a GPU backend
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// Out of GPU memory
    #[error("Out of GPU memory allocating {0}")]
    OutOfMemory(String),

    /// The backend rejected a resource description, such as pixel data that
    /// does not match the image dimensions
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// A draw call could not be issued
    #[error("Draw failed: {0}")]
    DrawFailed(String),
}

/// Fatal failure while building a renderer
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    /// A GPU allocation failed
    #[error("GPU allocation failed: {0}")]
    Gpu(#[from] GpuError),

    /// The configured scene does not exist
    #[error(transparent)]
    UnknownScene(#[from] SceneError),
}

/// Non-fatal problem found while building or drawing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderWarning {
    /// A shader stage failed to compile
    #[error("{stage:?} shader failed to compile: {log}")]
    ShaderCompile {
        /// Failing stage
        stage: ShaderStage,
        /// Compiler output
        log: String,
    },

    /// The program failed to link
    #[error("shader program failed to link: {log}")]
    ShaderLink {
        /// Linker output
        log: String,
    },

    /// A texture has no image payload, or a material refers to such a texture
    #[error("texture {texture} has no image data; sampling is disabled")]
    MissingTexture {
        /// Texture index
        texture: usize,
    },

    /// An image payload could not be decoded
    #[error("image {image} could not be decoded: {reason}")]
    UndecodableImage {
        /// Image index
        image: usize,
        /// Decoder message
        reason: String,
    },

    /// An attribute has no GPU buffer to read from
    #[error("mesh {mesh} primitive {primitive}: no GPU buffer for {semantic}")]
    MissingVertexBuffer {
        /// Mesh index
        mesh: usize,
        /// Primitive index within the mesh
        primitive: usize,
        /// Attribute without a buffer
        semantic: Semantic,
    },

    /// The index accessor has no GPU buffer to read from
    #[error("mesh {mesh} primitive {primitive}: no GPU buffer for indices")]
    MissingIndexBuffer {
        /// Mesh index
        mesh: usize,
        /// Primitive index within the mesh
        primitive: usize,
    },

    /// The index accessor has a component type that cannot index vertices
    #[error("mesh {mesh} primitive {primitive}: index accessor {accessor} has no usable component type")]
    UnsupportedIndexType {
        /// Mesh index
        mesh: usize,
        /// Primitive index within the mesh
        primitive: usize,
        /// Index accessor
        accessor: usize,
    },

    /// A primitive without a POSITION attribute cannot be drawn
    #[error("mesh {mesh} primitive {primitive} has no POSITION attribute")]
    MissingPositions {
        /// Mesh index
        mesh: usize,
        /// Primitive index within the mesh
        primitive: usize,
    },

    /// The backend rejected a draw call
    #[error("draw of node {node} failed: {reason}")]
    DrawFailed {
        /// Node being drawn
        node: usize,
        /// Backend message
        reason: String,
    },

    /// A buffer view declares a binding target code that is not recognised
    #[error("buffer view {view} has an unrecognised target; it is not uploaded")]
    InvalidBufferTarget {
        /// View index
        view: usize,
    },
}

/// Log a warning and keep it for later inspection
pub(crate) fn record(warnings: &mut Vec<RenderWarning>, warning: RenderWarning) {
    log::warn!("{warning}");
    warnings.push(warning);
}
