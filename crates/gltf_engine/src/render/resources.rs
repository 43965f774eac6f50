//! GPU resources built from a document
//!
//! Uploads happen once, when the renderer is built:
//!
//! - one GPU buffer per buffer view that declares (or is inferred to have) a
//!   binding target,
//! - one tightly packed buffer per sparse or view-less accessor used for
//!   drawing, materialised through the accessor reader,
//! - one texture per texture whose image decodes.
//!
//! Resources that cannot be created from the document's data are left out and
//! reported as warnings. Backend allocation failures abort the build.

use std::collections::HashMap;

use log::{debug, info};

use super::backend::{BufferHandle, GpuBackend, IndexedDraw, SamplerState, TextureHandle, VertexAttribute};
use super::error::{record, BuildError, RenderWarning};
use super::shader::AttributeSlot;
use crate::config::RendererConfig;
use crate::document::{BufferTarget, ComponentType, Document, PrimitiveMode};

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels (always 4 for RGBA)
    pub channels: u8,
}

impl ImageData {
    /// Decode an encoded image (PNG, JPEG) into RGBA8 pixels
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();

        debug!("Decoded image {width}x{height}");

        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
            channels: 4,
        })
    }
}

/// GPU-side copies of a document's buffers and textures
#[derive(Debug, Default)]
pub struct GpuResources {
    view_buffers: Vec<Option<BufferHandle>>,
    accessor_buffers: HashMap<usize, BufferHandle>,
    textures: Vec<Option<TextureHandle>>,
}

impl GpuResources {
    /// Upload every buffer view and texture the document can supply
    pub fn upload<B: GpuBackend>(
        document: &Document,
        backend: &mut B,
        config: &RendererConfig,
        warnings: &mut Vec<RenderWarning>,
    ) -> Result<Self, BuildError> {
        let mut resources = Self::default();
        resources.upload_views(document, backend, config.infer_buffer_targets, warnings)?;
        resources.materialize_accessors(document, backend)?;
        resources.upload_textures(document, backend, warnings)?;

        info!(
            "Uploaded {} buffer views, {} materialised accessors, {} textures",
            resources.view_buffers.iter().flatten().count(),
            resources.accessor_buffers.len(),
            resources.textures.iter().flatten().count()
        );
        Ok(resources)
    }

    /// GPU buffer holding a buffer view
    pub fn view_buffer(&self, view: usize) -> Option<BufferHandle> {
        self.view_buffers.get(view).copied().flatten()
    }

    /// GPU texture for a document texture
    pub fn texture(&self, texture: usize) -> Option<TextureHandle> {
        self.textures.get(texture).copied().flatten()
    }

    /// Buffer region feeding an attribute accessor
    pub fn vertex_attribute(&self, document: &Document, accessor: usize) -> Option<VertexAttribute> {
        let source = document.accessors.get(accessor)?;
        if let Some(&buffer) = self.accessor_buffers.get(&accessor) {
            return Some(VertexAttribute {
                buffer,
                components: source.kind.components(),
                component_type: ComponentType::Float,
                normalized: false,
                stride: 0,
                offset: 0,
            });
        }

        let view = source.buffer_view?;
        Some(VertexAttribute {
            buffer: self.view_buffer(view)?,
            components: source.kind.components(),
            component_type: source.component_type,
            normalized: source.normalized,
            stride: document.buffer_views.get(view)?.byte_stride.unwrap_or(0),
            offset: source.byte_offset,
        })
    }

    /// Indexed draw reading an index accessor
    pub fn indexed_draw(&self, document: &Document, accessor: usize, mode: PrimitiveMode) -> Option<IndexedDraw> {
        let source = document.accessors.get(accessor)?;
        if !source.component_type.is_index_type() {
            return None;
        }
        if let Some(&buffer) = self.accessor_buffers.get(&accessor) {
            return Some(IndexedDraw {
                mode,
                buffer,
                count: source.count,
                component_type: ComponentType::UnsignedInt,
                offset: 0,
            });
        }

        Some(IndexedDraw {
            mode,
            buffer: self.view_buffer(source.buffer_view?)?,
            count: source.count,
            component_type: source.component_type,
            offset: source.byte_offset,
        })
    }

    fn upload_views<B: GpuBackend>(
        &mut self,
        document: &Document,
        backend: &mut B,
        infer_targets: bool,
        warnings: &mut Vec<RenderWarning>,
    ) -> Result<(), BuildError> {
        let inferred = if infer_targets {
            infer_view_targets(document)
        } else {
            vec![None; document.buffer_views.len()]
        };

        for (index, view) in document.buffer_views.iter().enumerate() {
            let target = match view.target.or(inferred[index]) {
                Some(BufferTarget::Invalid) => {
                    record(warnings, RenderWarning::InvalidBufferTarget { view: index });
                    None
                }
                target => target,
            };

            let handle = match (target, document.buffer_view_bytes(index)) {
                (Some(target), Some(bytes)) => Some(backend.create_buffer(target, bytes)?),
                (Some(_), None) => {
                    debug!("Buffer view {index} has no resolved data");
                    None
                }
                (None, _) => None,
            };
            self.view_buffers.push(handle);
        }
        Ok(())
    }

    /// Upload sparse and view-less accessors that primitives draw from
    fn materialize_accessors<B: GpuBackend>(&mut self, document: &Document, backend: &mut B) -> Result<(), BuildError> {
        let needs_copy = |index: usize| {
            document
                .accessors
                .get(index)
                .is_some_and(|a| a.buffer_view.is_none() || a.sparse.is_some())
        };

        for primitive in document.meshes.iter().flat_map(|m| &m.primitives) {
            for slot in AttributeSlot::ALL {
                let Some(index) = primitive.attribute(&slot.semantic()) else { continue };
                if !needs_copy(index) || self.accessor_buffers.contains_key(&index) {
                    continue;
                }
                match document.read_accessor(index) {
                    Ok(values) => {
                        let handle = backend.create_buffer(BufferTarget::ArrayBuffer, bytemuck::cast_slice(&values))?;
                        self.accessor_buffers.insert(index, handle);
                    }
                    Err(e) => debug!("Cannot materialise accessor {index}: {e}"),
                }
            }

            let Some(index) = primitive.indices else { continue };
            if !needs_copy(index) || self.accessor_buffers.contains_key(&index) {
                continue;
            }
            match document.read_indices(index) {
                Ok(values) => {
                    let handle = backend.create_buffer(BufferTarget::ElementArrayBuffer, bytemuck::cast_slice(&values))?;
                    self.accessor_buffers.insert(index, handle);
                }
                Err(e) => debug!("Cannot materialise index accessor {index}: {e}"),
            }
        }
        Ok(())
    }

    fn upload_textures<B: GpuBackend>(
        &mut self,
        document: &Document,
        backend: &mut B,
        warnings: &mut Vec<RenderWarning>,
    ) -> Result<(), BuildError> {
        for (index, texture) in document.textures.iter().enumerate() {
            let Some(bytes) = texture.source.and_then(|image| document.image_bytes(image)) else {
                record(warnings, RenderWarning::MissingTexture { texture: index });
                self.textures.push(None);
                continue;
            };

            let image = match ImageData::from_bytes(bytes) {
                Ok(image) => image,
                Err(e) => {
                    record(
                        warnings,
                        RenderWarning::UndecodableImage {
                            image: texture.source.unwrap_or_default(),
                            reason: e.to_string(),
                        },
                    );
                    self.textures.push(None);
                    continue;
                }
            };

            let sampler = SamplerState::from_sampler(texture.sampler.and_then(|s| document.samplers.get(s)));
            self.textures.push(Some(backend.create_texture(&image, &sampler)?));
        }
        Ok(())
    }
}

/// Binding targets implied by how accessors use each view
fn infer_view_targets(document: &Document) -> Vec<Option<BufferTarget>> {
    let mut targets = vec![None; document.buffer_views.len()];
    let mut mark = |accessor: usize, target: BufferTarget| {
        let view = document.accessors.get(accessor).and_then(|a| a.buffer_view);
        if let Some(slot) = view.and_then(|v| targets.get_mut(v)) {
            if slot.is_none() {
                *slot = Some(target);
            }
        }
    };

    for primitive in document.meshes.iter().flat_map(|m| &m.primitives) {
        if let Some(indices) = primitive.indices {
            mark(indices, BufferTarget::ElementArrayBuffer);
        }
        for &accessor in primitive.attributes.values() {
            mark(accessor, BufferTarget::ArrayBuffer);
        }
    }
    targets
}
