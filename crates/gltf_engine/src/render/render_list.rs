//! # Render Lists
//!
//! Drawable primitives collected once at build time and partitioned by
//! material transparency.
//!
//! ## Architecture
//!
//! - **RenderLists**: the opaque and transparent item sequences
//! - **RenderItem**: one primitive of one node, with everything needed to draw it
//! - **ListKind**: which list an item belongs to
//!
//! Items keep scene traversal order inside each list. There is no depth sort,
//! including for transparent items.

use bitflags::bitflags;

use super::backend::{IndexedDraw, TextureHandle, VertexAttribute};
use super::shader::{AttributeSlot, ProgramId};
use crate::document::{AlphaMode, Material, PrimitiveMode};

bitflags! {
    /// Per-item draw state summary
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DrawFlags: u32 {
        /// Drawn with alpha blending
        const BLEND = 1 << 0;
        /// Alpha tested against the material cutoff
        const ALPHA_MASK = 1 << 1;
        /// Back faces are visible
        const DOUBLE_SIDED = 1 << 2;
        /// Samples a base color texture
        const TEXTURED = 1 << 3;
        /// Uses an index buffer
        const INDEXED = 1 << 4;
    }
}

impl DrawFlags {
    /// Flags implied by a material
    pub fn from_material(material: &Material) -> Self {
        let mut flags = match material.alpha_mode {
            AlphaMode::Opaque => Self::empty(),
            AlphaMode::Mask => Self::ALPHA_MASK,
            AlphaMode::Blend => Self::BLEND,
        };
        flags.set(Self::DOUBLE_SIDED, material.double_sided);
        flags
    }
}

/// Which list an item is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Drawn first with blending disabled (OPAQUE and MASK materials)
    Opaque,
    /// Drawn second with blending enabled (BLEND materials)
    Transparent,
}

/// Draw call resolved at build time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCall {
    /// Indexed draw
    Indexed(IndexedDraw),
    /// Non-indexed draw of the POSITION accessor's element count
    Arrays {
        /// Topology
        mode: PrimitiveMode,
        /// Vertex count
        count: usize,
    },
}

/// GPU state for drawing one item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparedDraw {
    /// Attribute bindings by [`AttributeSlot::index`]
    pub attributes: [Option<VertexAttribute>; AttributeSlot::COUNT],
    /// Draw call
    pub call: DrawCall,
    /// Material base color
    pub base_color_factor: [f32; 4],
    /// Base color texture, when one was uploaded
    pub base_color_texture: Option<TextureHandle>,
}

impl PreparedDraw {
    /// Binding for an attribute slot
    pub fn attribute(&self, slot: AttributeSlot) -> Option<&VertexAttribute> {
        self.attributes[slot.index()].as_ref()
    }
}

/// One primitive of one node
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    /// Node whose world matrix places the primitive
    pub node: usize,
    /// Mesh of the node
    pub mesh: usize,
    /// Primitive within the mesh
    pub primitive: usize,
    /// Material, `None` for the default material
    pub material: Option<usize>,
    /// Program used to draw
    pub program: ProgramId,
    /// Draw state summary
    pub flags: DrawFlags,
    /// Resolved GPU state; `None` when the item cannot be drawn
    pub draw: Option<PreparedDraw>,
}

impl RenderItem {
    /// List this item belongs to
    pub fn kind(&self) -> ListKind {
        if self.flags.contains(DrawFlags::BLEND) {
            ListKind::Transparent
        } else {
            ListKind::Opaque
        }
    }

    /// Whether the item has everything it needs to be drawn
    pub fn is_drawable(&self) -> bool {
        self.draw.is_some()
    }
}

/// Opaque and transparent items in traversal order
#[derive(Debug, Clone, Default)]
pub struct RenderLists {
    opaque: Vec<RenderItem>,
    transparent: Vec<RenderItem>,
}

impl RenderLists {
    /// Create empty lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item to the list matching its kind
    pub fn add_item(&mut self, item: RenderItem) {
        match item.kind() {
            ListKind::Opaque => self.opaque.push(item),
            ListKind::Transparent => self.transparent.push(item),
        }
    }

    /// Items drawn with blending disabled
    pub fn opaque(&self) -> &[RenderItem] {
        &self.opaque
    }

    /// Items drawn with blending enabled
    pub fn transparent(&self) -> &[RenderItem] {
        &self.transparent
    }

    /// Total number of items
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    /// Whether both lists are empty
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }

    /// All items in draw order: opaque first, then transparent
    pub fn iter(&self) -> impl Iterator<Item = &RenderItem> {
        self.opaque.iter().chain(&self.transparent)
    }

    /// Remove all items
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.transparent.clear();
    }
}
