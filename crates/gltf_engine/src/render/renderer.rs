//! # Scene Renderer
//!
//! Draws a loaded [`Document`] through a [`GpuBackend`].
//!
//! ## Phases
//!
//! - **Build** ([`SceneRenderer::new`]): uploads buffer views and textures,
//!   builds the shared program, and walks the active scene to fill the
//!   opaque and transparent render lists. Runs once.
//! - **Render** ([`SceneRenderer::render`]): scales the caller's world
//!   transform, propagates world matrices, then draws the opaque list with
//!   blending disabled followed by the transparent list with blending enabled.
//!   Runs every frame and allocates only to record a new draw failure.
//!
//! ## Degradation
//!
//! Nothing in the render phase fails the frame. Items whose resources could not
//! be built are skipped, missing textures disable texturing, and a rejected
//! draw call is logged once and counted as skipped every frame it fails.

use std::collections::HashMap;

use log::{info, trace};

use super::backend::{GpuBackend, UniformLocation, UniformValue};
use super::error::{record, BuildError, GpuError, RenderWarning};
use super::render_list::{DrawCall, DrawFlags, PreparedDraw, RenderItem, RenderLists};
use super::resources::GpuResources;
use super::shader::{AttributeSlot, ShaderProgramManager};
use crate::config::RendererConfig;
use crate::document::{Document, Material, Primitive, Semantic};
use crate::foundation::math::{Mat4, Mat4Ext};
use crate::scene::TransformPropagator;

/// Texture unit the base color texture is bound to
const BASE_COLOR_UNIT: u32 = 0;

/// Counts from one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Opaque items drawn
    pub opaque_drawn: usize,
    /// Transparent items drawn
    pub transparent_drawn: usize,
    /// Items not drawn because of missing resources or rejected draws
    pub skipped: usize,
}

impl FrameStats {
    /// Items drawn from both lists
    pub fn drawn(&self) -> usize {
        self.opaque_drawn + self.transparent_drawn
    }
}

/// Per-frame camera and lighting inputs
struct FrameUniforms {
    view: Mat4,
    projection: Mat4,
    light_intensity: f32,
}

/// Renderer for one document, owning its GPU resources
pub struct SceneRenderer<B: GpuBackend> {
    document: Document,
    backend: B,
    config: RendererConfig,
    resources: GpuResources,
    programs: ShaderProgramManager,
    lists: RenderLists,
    roots: Vec<usize>,
    propagator: TransformPropagator,
    warnings: Vec<RenderWarning>,
}

impl<B: GpuBackend> SceneRenderer<B> {
    /// Build GPU resources and render lists with default settings
    ///
    /// # Errors
    /// Returns [`BuildError`] when a GPU allocation fails.
    pub fn new(document: Document, backend: B) -> Result<Self, BuildError> {
        Self::with_config(document, backend, RendererConfig::default())
    }

    /// Build GPU resources and render lists
    ///
    /// # Errors
    /// Returns [`BuildError`] when a GPU allocation fails or the configured scene
    /// does not exist.
    pub fn with_config(document: Document, mut backend: B, config: RendererConfig) -> Result<Self, BuildError> {
        let roots = document.scene_roots(config.scene)?;
        let mut warnings = Vec::new();

        let resources = GpuResources::upload(&document, &mut backend, &config, &mut warnings)?;
        let mut programs = ShaderProgramManager::new();
        let lists = build_lists(&document, &mut backend, &resources, &mut programs, &roots, &mut warnings)?;

        info!(
            "Built renderer: {} opaque items, {} transparent items, {} warnings",
            lists.opaque().len(),
            lists.transparent().len(),
            warnings.len()
        );

        Ok(Self {
            document,
            backend,
            propagator: TransformPropagator::new(config.rotation_convention)
                .with_descend_matrix_nodes(config.descend_matrix_nodes),
            config,
            resources,
            programs,
            lists,
            roots,
            warnings,
        })
    }

    /// Draw one frame
    ///
    /// `world` places the scene (for example an anchor pose); it is scaled by
    /// the configured uniform scale before propagation. All matrices are
    /// column-major.
    pub fn render(&mut self, world: &Mat4, view: &Mat4, projection: &Mat4, light_intensity: f32) -> FrameStats {
        let scaled = world.scaled_uniform(self.config.scale);
        self.propagator.propagate(&mut self.document.nodes, &self.roots, &scaled);

        let frame = FrameUniforms {
            view: *view,
            projection: *projection,
            light_intensity,
        };
        let mut stats = FrameStats::default();

        self.backend.set_blending(false);
        let (drawn, skipped) = draw_list(
            &mut self.backend,
            &self.document,
            &self.programs,
            self.lists.opaque(),
            &frame,
            &mut self.warnings,
        );
        stats.opaque_drawn = drawn;
        stats.skipped += skipped;

        self.backend.set_blending(true);
        let (drawn, skipped) = draw_list(
            &mut self.backend,
            &self.document,
            &self.programs,
            self.lists.transparent(),
            &frame,
            &mut self.warnings,
        );
        stats.transparent_drawn = drawn;
        stats.skipped += skipped;

        trace!(
            "Frame: {} opaque, {} transparent, {} skipped",
            stats.opaque_drawn,
            stats.transparent_drawn,
            stats.skipped
        );
        stats
    }

    /// Draw one frame with the configured light intensity
    pub fn render_default(&mut self, world: &Mat4, view: &Mat4, projection: &Mat4) -> FrameStats {
        let intensity = self.config.light_intensity;
        self.render(world, view, projection, intensity)
    }

    /// Uniform scale applied to the world transform
    pub fn scale(&self) -> f32 {
        self.config.scale
    }

    /// Change the uniform scale for later frames
    pub fn set_scale(&mut self, scale: f32) {
        self.config.scale = scale;
    }

    /// Settings the renderer was built with, including later scale changes
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The rendered document, with world matrices from the last frame
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Opaque and transparent render lists
    pub fn lists(&self) -> &RenderLists {
        &self.lists
    }

    /// GPU resources built for the document
    pub fn resources(&self) -> &GpuResources {
        &self.resources
    }

    /// Warnings raised while building, plus distinct draw failures
    pub fn warnings(&self) -> &[RenderWarning] {
        &self.warnings
    }

    /// Backend the renderer draws through
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Release the document and backend
    pub fn into_parts(self) -> (Document, B) {
        (self.document, self.backend)
    }
}

/// Walk the scene and collect one item per node primitive
fn build_lists<B: GpuBackend>(
    document: &Document,
    backend: &mut B,
    resources: &GpuResources,
    programs: &mut ShaderProgramManager,
    roots: &[usize],
    warnings: &mut Vec<RenderWarning>,
) -> Result<RenderLists, GpuError> {
    let default_material = Material::default();
    let mut prepared: HashMap<(usize, usize), Option<PreparedDraw>> = HashMap::new();
    let mut lists = RenderLists::new();

    for node in document.traversal_order(roots) {
        let Some(mesh) = document.nodes[node].mesh else { continue };
        let Some(primitives) = document.meshes.get(mesh).map(|m| &m.primitives) else {
            continue;
        };

        for (p, primitive) in primitives.iter().enumerate() {
            let material = document.material(primitive.material);
            let program = programs.program_for(backend, node, primitive, material, warnings)?;
            let material = material.unwrap_or(&default_material);

            // Nodes sharing a mesh share its prepared state and warnings
            let draw = *prepared
                .entry((mesh, p))
                .or_insert_with(|| prepare_draw(document, resources, material, mesh, p, primitive, warnings));

            let mut flags = DrawFlags::from_material(material);
            if let Some(draw) = &draw {
                flags.set(DrawFlags::TEXTURED, draw.base_color_texture.is_some());
                flags.set(DrawFlags::INDEXED, matches!(draw.call, DrawCall::Indexed(_)));
            }

            lists.add_item(RenderItem {
                node,
                mesh,
                primitive: p,
                material: primitive.material,
                program,
                flags,
                draw,
            });
        }
    }
    Ok(lists)
}

/// Resolve attribute buffers, the draw call and material state of a primitive
fn prepare_draw(
    document: &Document,
    resources: &GpuResources,
    material: &Material,
    mesh: usize,
    primitive_index: usize,
    primitive: &Primitive,
    warnings: &mut Vec<RenderWarning>,
) -> Option<PreparedDraw> {
    let Some(positions) = primitive.attribute(&Semantic::Position) else {
        record(
            warnings,
            RenderWarning::MissingPositions {
                mesh,
                primitive: primitive_index,
            },
        );
        return None;
    };

    let mut attributes = [None; AttributeSlot::COUNT];
    for slot in AttributeSlot::ALL {
        let semantic = slot.semantic();
        let Some(accessor) = primitive.attribute(&semantic) else { continue };

        attributes[slot.index()] = resources.vertex_attribute(document, accessor);
        if attributes[slot.index()].is_none() {
            record(
                warnings,
                RenderWarning::MissingVertexBuffer {
                    mesh,
                    primitive: primitive_index,
                    semantic,
                },
            );
            if slot == AttributeSlot::Position {
                return None;
            }
        }
    }

    let call = match primitive.indices {
        Some(indices) => match resources.indexed_draw(document, indices, primitive.mode) {
            Some(draw) => DrawCall::Indexed(draw),
            None => {
                let usable = document
                    .accessors
                    .get(indices)
                    .is_some_and(|a| a.component_type.is_index_type());
                let warning = if usable {
                    RenderWarning::MissingIndexBuffer {
                        mesh,
                        primitive: primitive_index,
                    }
                } else {
                    RenderWarning::UnsupportedIndexType {
                        mesh,
                        primitive: primitive_index,
                        accessor: indices,
                    }
                };
                record(warnings, warning);
                return None;
            }
        },
        None => DrawCall::Arrays {
            mode: primitive.mode,
            count: document.accessors.get(positions).map_or(0, |a| a.count),
        },
    };

    let pbr = &material.pbr_metallic_roughness;
    Some(PreparedDraw {
        attributes,
        call,
        base_color_factor: pbr.base_color_factor,
        base_color_texture: pbr.base_color_texture.and_then(|info| resources.texture(info.index)),
    })
}

fn set_uniform<B: GpuBackend>(backend: &mut B, location: Option<UniformLocation>, value: UniformValue) {
    if let Some(location) = location {
        backend.set_uniform(location, value);
    }
}

/// Draw every item of one list; returns the drawn and skipped counts
fn draw_list<B: GpuBackend>(
    backend: &mut B,
    document: &Document,
    programs: &ShaderProgramManager,
    items: &[RenderItem],
    frame: &FrameUniforms,
    warnings: &mut Vec<RenderWarning>,
) -> (usize, usize) {
    let mut drawn = 0;
    let mut skipped = 0;
    for item in items {
        match draw_item(backend, document, programs, item, frame) {
            Ok(true) => drawn += 1,
            Ok(false) => skipped += 1,
            Err(e) => {
                skipped += 1;
                let warning = RenderWarning::DrawFailed {
                    node: item.node,
                    reason: e.to_string(),
                };
                // Failures repeat every frame; keep one of each
                if warnings.contains(&warning) {
                    trace!("{warning}");
                } else {
                    record(warnings, warning);
                }
            }
        }
    }
    (drawn, skipped)
}

/// Issue the draw for one item; `Ok(false)` when it has nothing to draw
fn draw_item<B: GpuBackend>(
    backend: &mut B,
    document: &Document,
    programs: &ShaderProgramManager,
    item: &RenderItem,
    frame: &FrameUniforms,
) -> Result<bool, GpuError> {
    let (Some(draw), Some(program), Some(node)) =
        (&item.draw, programs.get(item.program), document.nodes.get(item.node))
    else {
        return Ok(false);
    };

    backend.use_program(program.handle());
    let uniforms = program.uniforms();
    set_uniform(backend, uniforms.projection, UniformValue::Mat4(frame.projection));
    set_uniform(backend, uniforms.view, UniformValue::Mat4(frame.view));
    set_uniform(backend, uniforms.model, UniformValue::Mat4(*node.world_matrix()));
    set_uniform(backend, uniforms.base_color_factor, UniformValue::Vec4(draw.base_color_factor));

    match draw.base_color_texture {
        Some(texture) => {
            backend.bind_texture(BASE_COLOR_UNIT, texture);
            set_uniform(backend, uniforms.base_color_texture, UniformValue::Int(BASE_COLOR_UNIT as i32));
            set_uniform(backend, uniforms.base_color_texture_enabled, UniformValue::Int(1));
        }
        None => set_uniform(backend, uniforms.base_color_texture_enabled, UniformValue::Int(0)),
    }
    set_uniform(backend, uniforms.light_intensity, UniformValue::Float(frame.light_intensity));

    for slot in AttributeSlot::ALL {
        let Some(location) = program.attribute(slot) else { continue };
        match draw.attribute(slot) {
            Some(attribute) => backend.bind_attribute(location, attribute),
            None => backend.disable_attribute(location),
        }
    }

    match &draw.call {
        DrawCall::Indexed(indexed) => backend.draw_indexed(indexed)?,
        DrawCall::Arrays { mode, count } => backend.draw_arrays(*mode, 0, *count)?,
    }
    Ok(true)
}
