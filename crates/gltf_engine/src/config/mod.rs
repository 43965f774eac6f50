//! Configuration system
//!
//! Settings for document loading and scene rendering. Any type implementing
//! [`Config`] can be read from or written to TOML or RON files, selected by
//! file extension.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

use crate::scene::RotationConvention;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        match extension(path) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension(path) {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Settings for resolving a document's binary payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Read buffers and images referenced by relative URI from the base path
    pub resolve_external_resources: bool,
    /// Decode `data:` URIs embedded in the document
    pub decode_data_uris: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            resolve_external_resources: true,
            decode_data_uris: true,
        }
    }
}

/// Settings for building and drawing a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Uniform scale applied to the world transform before propagation
    pub scale: f32,
    /// Scene to draw instead of the document's default scene
    pub scene: Option<usize>,
    /// How node rotations are folded into local transforms
    pub rotation_convention: RotationConvention,
    /// Propagate into the children of nodes that carry an explicit matrix
    pub descend_matrix_nodes: bool,
    /// Light intensity used by [`SceneRenderer::render_default`](crate::render::SceneRenderer::render_default)
    pub light_intensity: f32,
    /// Give target-less buffer views a binding target based on how accessors use them
    pub infer_buffer_targets: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            scene: None,
            rotation_convention: RotationConvention::default(),
            descend_matrix_nodes: false,
            light_intensity: 1.0,
            infer_buffer_targets: false,
        }
    }
}

impl RendererConfig {
    /// Set the uniform scale factor
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Select a scene other than the document default
    pub fn with_scene(mut self, scene: usize) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Set the rotation convention
    pub fn with_rotation_convention(mut self, convention: RotationConvention) -> Self {
        self.rotation_convention = convention;
        self
    }

    /// Enable or disable propagation below matrix nodes
    pub fn with_descend_matrix_nodes(mut self, descend: bool) -> Self {
        self.descend_matrix_nodes = descend;
        self
    }

    /// Set the default light intensity
    pub fn with_light_intensity(mut self, intensity: f32) -> Self {
        self.light_intensity = intensity;
        self
    }

    /// Enable or disable buffer target inference
    pub fn with_inferred_buffer_targets(mut self, enable: bool) -> Self {
        self.infer_buffer_targets = enable;
        self
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Document loading settings
    pub loader: LoaderConfig,
    /// Renderer settings
    pub renderer: RendererConfig,
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.loader.resolve_external_resources);
        assert!(config.loader.decode_data_uris);
        assert_eq!(config.renderer.scale, 1.0);
        assert_eq!(config.renderer.scene, None);
        assert_eq!(config.renderer.rotation_convention, RotationConvention::TransposedInverse);
        assert!(!config.renderer.descend_matrix_nodes);
        assert!(!config.renderer.infer_buffer_targets);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            "[renderer]\nscale = 17.5\nrotation_convention = \"Quaternion\"\n",
        )
        .unwrap();
        assert_eq!(config.renderer.scale, 17.5);
        assert_eq!(config.renderer.rotation_convention, RotationConvention::Quaternion);
        assert_eq!(config.renderer.light_intensity, 1.0);
        assert_eq!(config.loader, LoaderConfig::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let config = EngineConfig {
            renderer: RendererConfig::default().with_scale(2.0).with_scene(1),
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");

        let config = EngineConfig {
            loader: LoaderConfig {
                resolve_external_resources: false,
                decode_data_uris: true,
            },
            renderer: RendererConfig::default().with_inferred_buffer_targets(true),
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(EngineConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "scale: 1").unwrap();

        let err = EngineConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }
}
