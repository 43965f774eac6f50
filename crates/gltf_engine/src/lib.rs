//! # glTF Engine
//!
//! Loads glTF 2.0 scenes, propagates node transforms and draws them with a
//! minimal forward renderer over a pluggable GPU backend.
//!
//! ## Features
//!
//! - **Loading**: JSON and binary (GLB) containers, embedded data URIs and
//!   external buffer and image files
//! - **Validation**: every cross-reference and byte range is checked at load
//! - **Transforms**: depth-first world matrix propagation with a selectable
//!   rotation convention
//! - **Rendering**: opaque and transparent render lists drawn through
//!   [`GpuBackend`](render::GpuBackend)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gltf_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let document = load_file("scene.gltf")?;
//!     let mut renderer = SceneRenderer::new(document, HeadlessBackend::new())?;
//!
//!     let projection = Mat4::perspective(1.0, 16.0 / 9.0, 0.1, 100.0);
//!     let stats = renderer.render(&Mat4::identity(), &Mat4::identity(), &projection, 1.0);
//!     println!("drew {} items", stats.drawn());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod document;
pub mod foundation;
pub mod render;
pub mod scene;

pub use document::{load, load_file, Document, LoadError};
pub use render::{FrameStats, SceneRenderer};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EngineConfig, LoaderConfig, RendererConfig},
        document::{load, load_file, load_file_with_config, load_with_config, Document, LoadError},
        foundation::{
            logging,
            math::{Mat4, Mat4Ext, Vec3},
            BoundingBox,
        },
        render::{BuildError, FrameStats, GpuBackend, HeadlessBackend, RenderWarning, SceneRenderer},
        scene::{scene_bounds, RotationConvention, TransformPropagator},
    };
}
