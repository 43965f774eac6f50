//! # Scene Document Model
//!
//! Typed representation of a scene document: accessors, buffer views,
//! buffers, materials, meshes, nodes, scenes, samplers, textures, images,
//! cameras, skins and animations.
//!
//! ## Ownership
//!
//! The [`Document`] owns every entity in flat sequences. Entities refer to one
//! another by index into those sequences, never by reference, so shared
//! targets (one accessor used by several primitives) and the node tree need
//! no reference counting. Indices are validated once at load time by
//! [`load`]; after that they are treated as safe keys.
//!
//! ## Lifecycle
//!
//! Everything is immutable after load except each [`Node`]'s derived world
//! matrix, which transform propagation overwrites in place every pass.
//!
//! ## Serialized form
//!
//! Field names are camelCase. Enumerations use the integer codes from
//! [`codes`]; optional fields equal to their default are omitted on write so
//! that `load(to_json(d))` reproduces `d`.

pub mod codes;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod resources;
pub mod validation;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, Mat4Ext};

pub use codes::{
    AccessorType, AlphaMode, BufferTarget, CameraType, ComponentType, Filter, Interpolation,
    PrimitiveMode, Wrap,
};
pub use decoder::{load, load_file, load_file_with_config, load_with_config};
pub use error::{AccessorError, LoadError, LoadResult};

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

fn default_one() -> f32 {
    1.0
}

fn is_one(value: &f32) -> bool {
    *value == 1.0
}

fn default_white() -> [f32; 4] {
    [1.0; 4]
}

fn is_white(value: &[f32; 4]) -> bool {
    *value == [1.0; 4]
}

fn default_alpha_cutoff() -> f32 {
    Material::DEFAULT_ALPHA_CUTOFF
}

fn is_default_alpha_cutoff(value: &f32) -> bool {
    *value == Material::DEFAULT_ALPHA_CUTOFF
}

/// Root aggregate of a loaded scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Extensions used somewhere in the document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
    /// Extensions a reader must support to load the document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_required: Vec<String>,
    /// Typed views into buffer views
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    /// Keyframe animations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<Animation>,
    /// Format metadata
    pub asset: Asset,
    /// Binary payloads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
    /// Byte ranges within buffers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    /// Camera projections
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cameras: Vec<Camera>,
    /// Image sources for textures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    /// Surface materials
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    /// Meshes made of primitives
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    /// Node arena; the hierarchy is expressed by child indices
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    /// Texture samplers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samplers: Vec<Sampler>,
    /// Default scene index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<usize>,
    /// Scenes made of root nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<Scene>,
    /// Skins binding meshes to joint hierarchies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skins: Vec<Skin>,
    /// Textures pairing an image with a sampler
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<Texture>,
    /// Extension payloads, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
    /// Application payloads, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
}

impl Document {
    /// Serialize the structural model back to JSON text
    ///
    /// Resolved payloads and derived world matrices are not written.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Bytes covered by a buffer view, if its buffer payload is resolved and long enough
    pub fn buffer_view_bytes(&self, view: usize) -> Option<&[u8]> {
        let view = self.buffer_views.get(view)?;
        let data = self.buffers.get(view.buffer)?.data.as_deref()?;
        data.get(view.byte_offset..view.byte_offset.checked_add(view.byte_length)?)
    }

    /// Encoded bytes of an image, from its resolved URI or its buffer view
    pub fn image_bytes(&self, image: usize) -> Option<&[u8]> {
        let image = self.images.get(image)?;
        match (&image.data, image.buffer_view) {
            (Some(data), _) => Some(data),
            (None, Some(view)) => self.buffer_view_bytes(view),
            (None, None) => None,
        }
    }

    /// Material at `index`, or `None` when the primitive uses the default material
    pub fn material(&self, index: Option<usize>) -> Option<&Material> {
        index.and_then(|i| self.materials.get(i))
    }
}

/// Format metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Format version, e.g. `"2.0"`
    pub version: String,
    /// Minimum format version a reader must support
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    /// Tool that produced the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    /// Copyright notice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: "2.0".to_string(),
            min_version: None,
            generator: None,
            copyright: None,
        }
    }
}

/// Typed interpretation of a region of a buffer view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    /// Source view; absent means all elements are zero before sparse overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    /// Offset of the first element within the view
    #[serde(default, skip_serializing_if = "is_default")]
    pub byte_offset: usize,
    /// Scalar type of each component
    pub component_type: ComponentType,
    /// Integer components map to `[0, 1]` or `[-1, 1]` when read
    #[serde(default, skip_serializing_if = "is_default")]
    pub normalized: bool,
    /// Number of elements
    pub count: usize,
    /// Element shape
    #[serde(rename = "type")]
    pub kind: AccessorType,
    /// Per-component maximum
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub max: Vec<f32>,
    /// Per-component minimum
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub min: Vec<f32>,
    /// Element overrides applied on top of the base data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse: Option<Sparse>,
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Accessor {
    /// Size in bytes of one tightly packed element
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.kind.components()
    }
}

/// Sparse override block of an accessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sparse {
    /// Number of overridden elements
    pub count: usize,
    /// Indices of the overridden elements
    pub indices: SparseIndices,
    /// Replacement element values
    pub values: SparseValues,
}

/// Location and type of sparse element indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndices {
    /// View holding the indices
    pub buffer_view: usize,
    /// Offset within the view
    #[serde(default, skip_serializing_if = "is_default")]
    pub byte_offset: usize,
    /// Unsigned integer type of each index
    pub component_type: ComponentType,
}

/// Location of sparse replacement values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValues {
    /// View holding the values, packed with the accessor's type
    pub buffer_view: usize,
    /// Offset within the view
    #[serde(default, skip_serializing_if = "is_default")]
    pub byte_offset: usize,
}

/// Byte range within a buffer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    /// Containing buffer
    pub buffer: usize,
    /// Start of the range
    #[serde(default, skip_serializing_if = "is_default")]
    pub byte_offset: usize,
    /// Length of the range
    pub byte_length: usize,
    /// Distance between consecutive elements; absent means tightly packed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<usize>,
    /// GPU binding target; views without one are not uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<BufferTarget>,
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Binary payload
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    /// Relative file path or `data:` URI; absent for the binary chunk of a container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Declared payload length
    pub byte_length: usize,
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resolved payload; `None` when the source could not be resolved
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("uri", &self.uri.as_deref().map(abbreviate_uri))
            .field("byte_length", &self.byte_length)
            .field("name", &self.name)
            .field("resolved", &self.data.as_ref().map(Vec::len))
            .finish()
    }
}

fn abbreviate_uri(uri: &str) -> &str {
    if uri.starts_with("data:") {
        uri.split(',').next().unwrap_or(uri)
    } else {
        uri
    }
}

/// Surface description of a primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Metallic-roughness parameters, including the base color
    #[serde(default, skip_serializing_if = "is_default")]
    pub pbr_metallic_roughness: PbrMetallicRoughness,
    /// Tangent-space normal map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_texture: Option<NormalTextureInfo>,
    /// Ambient occlusion map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occlusion_texture: Option<OcclusionTextureInfo>,
    /// Emissive color map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive_texture: Option<TextureInfo>,
    /// Emissive color
    #[serde(default, skip_serializing_if = "is_default")]
    pub emissive_factor: [f32; 3],
    /// Transparency classification
    #[serde(default, skip_serializing_if = "is_default")]
    pub alpha_mode: AlphaMode,
    /// Alpha threshold for [`AlphaMode::Mask`]
    #[serde(default = "default_alpha_cutoff", skip_serializing_if = "is_default_alpha_cutoff")]
    pub alpha_cutoff: f32,
    /// Disable back-face culling
    #[serde(default, skip_serializing_if = "is_default")]
    pub double_sided: bool,
}

impl Material {
    /// Alpha cutoff used when a material does not declare one
    pub const DEFAULT_ALPHA_CUTOFF: f32 = 0.5;

    /// Whether items with this material belong to the transparent list
    pub fn is_transparent(&self) -> bool {
        self.alpha_mode == AlphaMode::Blend
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            pbr_metallic_roughness: PbrMetallicRoughness::default(),
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
            emissive_factor: [0.0; 3],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: Self::DEFAULT_ALPHA_CUTOFF,
            double_sided: false,
        }
    }
}

/// Metallic-roughness material parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    /// Linear RGBA base color multiplier
    #[serde(default = "default_white", skip_serializing_if = "is_white")]
    pub base_color_factor: [f32; 4],
    /// Base color map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureInfo>,
    /// Metalness multiplier
    #[serde(default = "default_one", skip_serializing_if = "is_one")]
    pub metallic_factor: f32,
    /// Roughness multiplier
    #[serde(default = "default_one", skip_serializing_if = "is_one")]
    pub roughness_factor: f32,
    /// Combined metalness/roughness map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic_roughness_texture: Option<TextureInfo>,
}

impl Default for PbrMetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0; 4],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
        }
    }
}

/// Reference to a texture from a material slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    /// Texture index
    pub index: usize,
    /// Texture coordinate set, `TEXCOORD_n`
    #[serde(default, skip_serializing_if = "is_default")]
    pub tex_coord: u32,
}

/// Normal map slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalTextureInfo {
    /// Texture index
    pub index: usize,
    /// Texture coordinate set
    #[serde(default, skip_serializing_if = "is_default")]
    pub tex_coord: u32,
    /// Normal vector scale
    #[serde(default = "default_one", skip_serializing_if = "is_one")]
    pub scale: f32,
}

/// Occlusion map slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcclusionTextureInfo {
    /// Texture index
    pub index: usize,
    /// Texture coordinate set
    #[serde(default, skip_serializing_if = "is_default")]
    pub tex_coord: u32,
    /// Occlusion strength
    #[serde(default = "default_one", skip_serializing_if = "is_one")]
    pub strength: f32,
}

/// Ordered list of primitives drawn together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh {
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Drawable units
    pub primitives: Vec<Primitive>,
    /// Default morph target weights
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<f32>,
}

/// Vertex attribute semantic
///
/// Serialized as its name, e.g. `POSITION` or `TEXCOORD_1`. Names outside the
/// standard set are kept as [`Semantic::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Semantic {
    /// Vertex position
    Position,
    /// Vertex normal
    Normal,
    /// Vertex tangent
    Tangent,
    /// Texture coordinate set `n`
    TexCoord(u32),
    /// Vertex color set `n`
    Color(u32),
    /// Joint index set `n`
    Joints(u32),
    /// Joint weight set `n`
    Weights(u32),
    /// Application-specific attribute
    Custom(String),
}

impl From<String> for Semantic {
    fn from(name: String) -> Self {
        let indexed = |prefix: &str| -> Option<u32> { name.strip_prefix(prefix)?.parse().ok() };
        match name.as_str() {
            "POSITION" => Self::Position,
            "NORMAL" => Self::Normal,
            "TANGENT" => Self::Tangent,
            _ => {
                if let Some(set) = indexed("TEXCOORD_") {
                    Self::TexCoord(set)
                } else if let Some(set) = indexed("COLOR_") {
                    Self::Color(set)
                } else if let Some(set) = indexed("JOINTS_") {
                    Self::Joints(set)
                } else if let Some(set) = indexed("WEIGHTS_") {
                    Self::Weights(set)
                } else {
                    Self::Custom(name)
                }
            }
        }
    }
}

impl From<Semantic> for String {
    fn from(semantic: Semantic) -> Self {
        semantic.to_string()
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position => f.write_str("POSITION"),
            Self::Normal => f.write_str("NORMAL"),
            Self::Tangent => f.write_str("TANGENT"),
            Self::TexCoord(set) => write!(f, "TEXCOORD_{set}"),
            Self::Color(set) => write!(f, "COLOR_{set}"),
            Self::Joints(set) => write!(f, "JOINTS_{set}"),
            Self::Weights(set) => write!(f, "WEIGHTS_{set}"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// One drawable unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primitive {
    /// Vertex attribute accessors by semantic
    pub attributes: BTreeMap<Semantic, usize>,
    /// Index accessor; absent means non-indexed drawing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<usize>,
    /// Material; absent means the default material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,
    /// Draw topology
    #[serde(default, skip_serializing_if = "is_default")]
    pub mode: PrimitiveMode,
    /// Morph targets, each a set of attribute displacements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<BTreeMap<Semantic, usize>>,
}

impl Primitive {
    /// Accessor bound to `semantic`, if any
    pub fn attribute(&self, semantic: &Semantic) -> Option<usize> {
        self.attributes.get(semantic).copied()
    }
}

/// Entity in the scene hierarchy
///
/// A node carries either an explicit matrix or optional translation, rotation
/// and scale components. Children are indices into [`Document::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Attached camera
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<usize>,
    /// Child nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
    /// Skin applied to the mesh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin: Option<usize>,
    /// Local transform as 16 column-major floats; wins over TRS components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[f32; 16]>,
    /// Attached mesh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
    /// Rotation quaternion `(x, y, z, w)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 4]>,
    /// Non-uniform scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
    /// Translation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f32; 3]>,
    /// Morph target weights overriding the mesh defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<f32>,
    #[serde(skip, default = "Mat4::identity")]
    pub(crate) world_matrix: Mat4,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: None,
            camera: None,
            children: Vec::new(),
            skin: None,
            matrix: None,
            mesh: None,
            rotation: None,
            scale: None,
            translation: None,
            weights: Vec::new(),
            world_matrix: Mat4::identity(),
        }
    }
}

impl Node {
    /// World transform computed by the most recent propagation pass
    ///
    /// Identity until the node has been reached by a pass.
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }
}

/// Set of root nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Root node indices
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<usize>,
}

/// Texture filtering and wrapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sampler {
    /// Magnification filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag_filter: Option<Filter>,
    /// Minification filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_filter: Option<Filter>,
    /// Horizontal wrapping
    #[serde(default, skip_serializing_if = "is_default")]
    pub wrap_s: Wrap,
    /// Vertical wrapping
    #[serde(default, skip_serializing_if = "is_default")]
    pub wrap_t: Wrap,
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Image paired with a sampler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Texture {
    /// Sampler; absent means nearest filtering with repeat wrapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<usize>,
    /// Source image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Encoded image referenced by URI or buffer view
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Relative file path or `data:` URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// MIME type of the encoded bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// View holding the encoded bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resolved bytes of a URI source
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("uri", &self.uri.as_deref().map(abbreviate_uri))
            .field("mime_type", &self.mime_type)
            .field("buffer_view", &self.buffer_view)
            .field("name", &self.name)
            .field("resolved", &self.data.as_ref().map(Vec::len))
            .finish()
    }
}

/// Camera projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Which projection block applies
    #[serde(rename = "type")]
    pub kind: CameraType,
    /// Perspective parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perspective: Option<Perspective>,
    /// Orthographic parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orthographic: Option<Orthographic>,
}

impl Camera {
    /// Projection matrix for a viewport of the given aspect ratio
    ///
    /// A perspective camera's own aspect ratio wins over `aspect`; without a far
    /// plane the projection is infinite. Returns `None` when the block matching
    /// [`Camera::kind`] is missing.
    pub fn projection_matrix(&self, aspect: f32) -> Option<Mat4> {
        match self.kind {
            CameraType::Perspective => {
                let p = self.perspective.as_ref()?;
                let aspect = p.aspect_ratio.unwrap_or(aspect);
                Some(match p.zfar {
                    Some(zfar) => Mat4::perspective(p.yfov, aspect, p.znear, zfar),
                    None => Mat4::infinite_perspective(p.yfov, aspect, p.znear),
                })
            }
            CameraType::Orthographic => {
                let o = self.orthographic.as_ref()?;
                Some(Mat4::orthographic(-o.xmag, o.xmag, -o.ymag, o.ymag, o.znear, o.zfar))
            }
        }
    }
}

/// Perspective projection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Perspective {
    /// Width over height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f32>,
    /// Vertical field of view in radians
    pub yfov: f32,
    /// Far plane; absent means infinite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zfar: Option<f32>,
    /// Near plane
    pub znear: f32,
}

/// Orthographic projection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Orthographic {
    /// Horizontal half-extent
    pub xmag: f32,
    /// Vertical half-extent
    pub ymag: f32,
    /// Far plane
    pub zfar: f32,
    /// Near plane
    pub znear: f32,
}

/// Joint hierarchy used for skinning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skin {
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Accessor of MAT4 inverse bind matrices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_bind_matrices: Option<usize>,
    /// Common root of the joints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<usize>,
    /// Joint nodes
    pub joints: Vec<usize>,
}

/// Keyframe animation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Sampler-to-property bindings
    pub channels: Vec<Channel>,
    /// Keyframe sources
    pub samplers: Vec<AnimationSampler>,
}

/// Binds an animation sampler to a node property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Sampler within the same animation
    pub sampler: usize,
    /// Animated property
    pub target: ChannelTarget,
}

/// Animated node property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTarget {
    /// Animated node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<usize>,
    /// Animated property
    pub path: TargetPath,
}

/// Node property driven by an animation channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPath {
    /// Translation component
    Translation,
    /// Rotation component
    Rotation,
    /// Scale component
    Scale,
    /// Morph target weights
    Weights,
}

/// Keyframe times and values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSampler {
    /// Accessor of keyframe times
    pub input: usize,
    /// Interpolation between keyframes
    #[serde(default, skip_serializing_if = "is_default")]
    pub interpolation: Interpolation,
    /// Accessor of keyframe values
    pub output: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_minimal_document_defaults() {
        let doc: Document = serde_json::from_str(r#"{"asset":{"version":"2.0"}}"#).unwrap();
        assert!(doc.nodes.is_empty());
        assert!(doc.accessors.is_empty());
        assert_eq!(doc.scene, None);
    }

    #[test]
    fn test_missing_asset_is_rejected() {
        let err = serde_json::from_str::<Document>(r#"{"nodes":[]}"#).unwrap_err();
        assert!(err.to_string().contains("asset"));
    }

    #[test]
    fn test_material_defaults() {
        let material: Material = serde_json::from_str("{}").unwrap();
        assert_eq!(material, Material::default());
        assert_eq!(material.alpha_cutoff, 0.5);
        assert_eq!(material.pbr_metallic_roughness.base_color_factor, [1.0; 4]);
        assert!(!material.is_transparent());
        assert_eq!(serde_json::to_string(&material).unwrap(), "{}");
    }

    #[test]
    fn test_semantic_names() {
        let primitive: Primitive = serde_json::from_str(
            r#"{"attributes":{"POSITION":0,"TEXCOORD_1":1,"_BARYCENTRIC":2}}"#,
        )
        .unwrap();
        assert_eq!(primitive.attribute(&Semantic::Position), Some(0));
        assert_eq!(primitive.attribute(&Semantic::TexCoord(1)), Some(1));
        assert_eq!(primitive.attribute(&Semantic::Custom("_BARYCENTRIC".into())), Some(2));
        assert_eq!(primitive.mode, PrimitiveMode::Triangles);
        assert_eq!(Semantic::Color(0).to_string(), "COLOR_0");
    }

    #[test]
    fn test_node_world_matrix_not_serialized() {
        let node: Node = serde_json::from_str(r#"{"translation":[1,2,3]}"#).unwrap();
        assert_eq!(*node.world_matrix(), Mat4::identity());
        let json = serde_json::to_string(&node).unwrap();
        assert!(!json.contains("world"));
    }

    #[test]
    fn test_buffer_view_bytes() {
        let mut doc = Document::default();
        doc.buffers.push(Buffer {
            byte_length: 8,
            data: Some((0..8).collect()),
            ..Default::default()
        });
        doc.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: 2,
            byte_length: 4,
            ..Default::default()
        });
        doc.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: 6,
            byte_length: 4,
            ..Default::default()
        });

        assert_eq!(doc.buffer_view_bytes(0), Some(&[2, 3, 4, 5][..]));
        assert_eq!(doc.buffer_view_bytes(1), None);
        assert_eq!(doc.buffer_view_bytes(2), None);
    }

    #[test]
    fn test_camera_projection() {
        let camera: Camera = serde_json::from_str(
            r#"{"type":"perspective","perspective":{"yfov":1.5707964,"znear":1.0,"zfar":10.0}}"#,
        )
        .unwrap();
        let projection = camera.projection_matrix(2.0).unwrap();
        assert_relative_eq!(projection[(0, 0)], 0.5, epsilon = 1e-5);
        assert_relative_eq!(projection[(1, 1)], 1.0, epsilon = 1e-5);

        let broken = Camera {
            name: None,
            kind: CameraType::Orthographic,
            perspective: None,
            orthographic: None,
        };
        assert!(broken.projection_matrix(1.0).is_none());
    }

    #[test]
    fn test_buffer_debug_abbreviates_data_uri() {
        let buffer = Buffer {
            uri: Some("data:application/octet-stream;base64,AAAA".into()),
            byte_length: 3,
            ..Default::default()
        };
        let text = format!("{buffer:?}");
        assert!(text.contains("data:application/octet-stream;base64"));
        assert!(!text.contains("AAAA"));
    }
}
