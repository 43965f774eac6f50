//! Shader sources and program state
//!
//! Every primitive currently draws with one shared program: the base color,
//! optionally modulated by the base color texture, scaled by a camera-space
//! headlight term and the light intensity. Alpha is scaled along with color. [`ShaderProgramManager`] is the
//! seam where per-material program variants would be selected.

use log::{debug, warn};

use super::backend::{AttributeLocation, GpuBackend, GpuResult, ProgramHandle, ShaderDiagnostic, UniformLocation};
use super::error::{record, RenderWarning};
use crate::document::{Material, Primitive, Semantic};

/// Vertex stage of the shared program (GLSL ES 1.00)
pub const VERTEX_SHADER: &str = r"
uniform mat4 u_projection;
uniform mat4 u_view;
uniform mat4 u_model;

attribute vec3 a_position;
attribute vec3 a_normal;
attribute vec2 a_tex_coord0;

varying vec3 v_normal_camera;
varying vec2 v_tex_coord0;

void main() {
    v_normal_camera = vec3(u_view * u_model * vec4(a_normal, 0.0));
    v_tex_coord0 = a_tex_coord0;
    gl_Position = u_projection * u_view * u_model * vec4(a_position, 1.0);
}
";

/// Fragment stage of the shared program (GLSL ES 1.00)
pub const FRAGMENT_SHADER: &str = r"
precision mediump float;

uniform vec4 u_base_color_factor;
uniform sampler2D u_base_color_texture;
uniform int u_base_color_texture_enabled;
uniform float u_light_intensity;

varying vec3 v_normal_camera;
varying vec2 v_tex_coord0;

void main() {
    // Headlight: full brightness facing the camera, 0.55 at grazing angles
    float diffuse = 0.5 + max(dot(normalize(v_normal_camera), vec3(0.0, 0.0, 1.0)), 0.1) / 2.0;
    vec4 color = u_base_color_factor;
    if (u_base_color_texture_enabled != 0) {
        color *= texture2D(u_base_color_texture, v_tex_coord0);
    }
    gl_FragColor = u_light_intensity * diffuse * color;
}
";

/// Vertex attribute consumed by the shared program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeSlot {
    /// `POSITION`
    Position,
    /// `NORMAL`
    Normal,
    /// `TEXCOORD_0`
    TexCoord0,
}

impl AttributeSlot {
    /// Number of slots
    pub const COUNT: usize = 3;

    /// All slots in binding order
    pub const ALL: [Self; Self::COUNT] = [Self::Position, Self::Normal, Self::TexCoord0];

    /// Document semantic feeding this slot
    pub fn semantic(self) -> Semantic {
        match self {
            Self::Position => Semantic::Position,
            Self::Normal => Semantic::Normal,
            Self::TexCoord0 => Semantic::TexCoord(0),
        }
    }

    /// Attribute name in the shader sources
    pub fn shader_name(self) -> &'static str {
        match self {
            Self::Position => "a_position",
            Self::Normal => "a_normal",
            Self::TexCoord0 => "a_tex_coord0",
        }
    }

    /// Position within [`AttributeSlot::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Uniform locations of a program; `None` when the program does not expose one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramUniforms {
    /// Camera projection matrix
    pub projection: Option<UniformLocation>,
    /// Camera view matrix
    pub view: Option<UniformLocation>,
    /// Node world matrix
    pub model: Option<UniformLocation>,
    /// Material base color
    pub base_color_factor: Option<UniformLocation>,
    /// Base color sampler unit
    pub base_color_texture: Option<UniformLocation>,
    /// Whether the base color texture is sampled
    pub base_color_texture_enabled: Option<UniformLocation>,
    /// Light intensity multiplier
    pub light_intensity: Option<UniformLocation>,
}

/// A linked program with its resolved locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    handle: ProgramHandle,
    uniforms: ProgramUniforms,
    attributes: [Option<AttributeLocation>; AttributeSlot::COUNT],
}

impl ShaderProgram {
    /// Build a program and resolve its locations
    ///
    /// Compile and link diagnostics are recorded as warnings; the program is
    /// returned regardless and exposes whatever locations survived.
    pub fn build<B: GpuBackend>(
        backend: &mut B,
        vertex_source: &str,
        fragment_source: &str,
        warnings: &mut Vec<RenderWarning>,
    ) -> GpuResult<Self> {
        let build = backend.create_program(vertex_source, fragment_source)?;
        for diagnostic in build.diagnostics {
            record(
                warnings,
                match diagnostic {
                    ShaderDiagnostic::Compile { stage, log } => RenderWarning::ShaderCompile { stage, log },
                    ShaderDiagnostic::Link { log } => RenderWarning::ShaderLink { log },
                },
            );
        }

        let handle = build.program;
        let uniform = |name: &str| {
            let location = backend.uniform_location(handle, name);
            if location.is_none() {
                warn!("Program {} does not expose uniform {name}", handle.0);
            }
            location
        };
        let uniforms = ProgramUniforms {
            projection: uniform("u_projection"),
            view: uniform("u_view"),
            model: uniform("u_model"),
            base_color_factor: uniform("u_base_color_factor"),
            base_color_texture: uniform("u_base_color_texture"),
            base_color_texture_enabled: uniform("u_base_color_texture_enabled"),
            light_intensity: uniform("u_light_intensity"),
        };
        let attributes = AttributeSlot::ALL.map(|slot| backend.attribute_location(handle, slot.shader_name()));

        debug!("Built program {} ({uniforms:?})", handle.0);
        Ok(Self {
            handle,
            uniforms,
            attributes,
        })
    }

    /// Program handle
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Resolved uniform locations
    pub fn uniforms(&self) -> &ProgramUniforms {
        &self.uniforms
    }

    /// Location of an attribute slot
    pub fn attribute(&self, slot: AttributeSlot) -> Option<AttributeLocation> {
        self.attributes[slot.index()]
    }
}

/// Index of a program owned by a [`ShaderProgramManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub usize);

/// Builds and caches shader programs
#[derive(Debug, Default)]
pub struct ShaderProgramManager {
    programs: Vec<ShaderProgram>,
}

impl ShaderProgramManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Program for drawing `primitive` of `node` with `material`
    ///
    /// All combinations share one program, built on first request.
    pub fn program_for<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        _node: usize,
        _primitive: &Primitive,
        _material: Option<&Material>,
        warnings: &mut Vec<RenderWarning>,
    ) -> GpuResult<ProgramId> {
        if self.programs.is_empty() {
            let program = ShaderProgram::build(backend, VERTEX_SHADER, FRAGMENT_SHADER, warnings)?;
            self.programs.push(program);
        }
        Ok(ProgramId(0))
    }

    /// Program by id
    pub fn get(&self, id: ProgramId) -> Option<&ShaderProgram> {
        self.programs.get(id.0)
    }

    /// Number of built programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether no program has been built yet
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::ShaderStage;
    use crate::render::headless::HeadlessBackend;

    #[test]
    fn test_all_locations_resolved() {
        let mut backend = HeadlessBackend::new();
        let mut warnings = Vec::new();
        let program = ShaderProgram::build(&mut backend, VERTEX_SHADER, FRAGMENT_SHADER, &mut warnings).unwrap();

        assert!(warnings.is_empty());
        let u = program.uniforms();
        assert!(u.projection.is_some() && u.view.is_some() && u.model.is_some());
        assert!(u.base_color_factor.is_some() && u.base_color_texture.is_some());
        assert!(u.base_color_texture_enabled.is_some() && u.light_intensity.is_some());
        for slot in AttributeSlot::ALL {
            assert!(program.attribute(slot).is_some(), "{slot:?}");
        }
    }

    #[test]
    fn test_fragment_failure_is_a_warning() {
        let mut backend = HeadlessBackend::new().with_compile_error(ShaderStage::Fragment, "0:3: error");
        let mut warnings = Vec::new();
        let program = ShaderProgram::build(&mut backend, VERTEX_SHADER, FRAGMENT_SHADER, &mut warnings).unwrap();

        assert_eq!(
            warnings,
            vec![RenderWarning::ShaderCompile {
                stage: ShaderStage::Fragment,
                log: "0:3: error".to_string()
            }]
        );
        assert!(program.uniforms().model.is_some());
        assert!(program.uniforms().base_color_factor.is_none());
    }

    #[test]
    fn test_manager_shares_one_program() {
        let mut backend = HeadlessBackend::new();
        let mut manager = ShaderProgramManager::new();
        let mut warnings = Vec::new();
        let primitive = Primitive::default();

        let a = manager.program_for(&mut backend, 0, &primitive, None, &mut warnings).unwrap();
        let b = manager
            .program_for(&mut backend, 3, &primitive, Some(&Material::default()), &mut warnings)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get(a).map(ShaderProgram::handle), manager.get(b).map(ShaderProgram::handle));
    }

    #[test]
    fn test_headlight_scales_alpha_with_color() {
        let varying = "varying vec3 v_normal_camera;";
        assert!(VERTEX_SHADER.contains(varying) && FRAGMENT_SHADER.contains(varying));
        assert!(VERTEX_SHADER.contains("v_normal_camera = vec3(u_view * u_model * vec4(a_normal, 0.0));"));
        assert!(FRAGMENT_SHADER
            .contains("0.5 + max(dot(normalize(v_normal_camera), vec3(0.0, 0.0, 1.0)), 0.1) / 2.0"));
        assert!(FRAGMENT_SHADER.contains("gl_FragColor = u_light_intensity * diffuse * color;"));
    }

    #[test]
    fn test_slot_semantics() {
        assert_eq!(AttributeSlot::TexCoord0.semantic(), Semantic::TexCoord(0));
        assert_eq!(AttributeSlot::Normal.index(), 1);
    }
}
