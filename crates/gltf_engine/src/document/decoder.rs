//! Document decoding
//!
//! Turns serialized bytes into a validated [`Document`]. Two containers are
//! accepted: plain UTF-8 JSON text, and the binary container (`glTF` magic,
//! a JSON chunk followed by an optional binary chunk).
//!
//! Decoding runs in three steps: structural decode with `serde_json`,
//! cross-reference validation, then payload resolution. Only the first two can
//! fail; payload resolution degrades per resource.

use std::path::Path;

use log::{debug, info};

use super::error::{LoadError, LoadResult};
use super::{resources, validation, Document};
use crate::config::LoaderConfig;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const GLB_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode a document from JSON text or a binary container
///
/// External payloads are resolved relative to `base_path`. Without a base path
/// only embedded payloads are resolved and every external reference is left
/// without data.
///
/// # Errors
/// Returns [`LoadError`] when the document is malformed or a cross-reference
/// is invalid. Unreadable payloads are not errors.
pub fn load(source: impl AsRef<[u8]>, base_path: Option<&Path>) -> LoadResult<Document> {
    load_with_config(source, base_path, &LoaderConfig::default())
}

/// Decode a document with explicit loader settings
///
/// # Errors
/// See [`load`].
pub fn load_with_config(
    source: impl AsRef<[u8]>,
    base_path: Option<&Path>,
    config: &LoaderConfig,
) -> LoadResult<Document> {
    let source = source.as_ref();

    let (json, binary_chunk) = if source.starts_with(GLB_MAGIC) {
        let container = split_container(source)?;
        (container.json, container.binary.map(<[u8]>::to_vec))
    } else {
        (source, None)
    };
    let json = json.strip_prefix(UTF8_BOM).unwrap_or(json);

    let mut document: Document = serde_json::from_slice(json)?;
    debug!(
        "Decoded document structure: {} nodes, {} meshes, {} accessors",
        document.nodes.len(),
        document.meshes.len(),
        document.accessors.len()
    );

    validation::validate(&document)?;
    resources::resolve(&mut document, base_path, binary_chunk, config);

    info!(
        "Loaded document (version {}): {} scenes, {} nodes, {} meshes, {} materials, {} buffers",
        document.asset.version,
        document.scenes.len(),
        document.nodes.len(),
        document.meshes.len(),
        document.materials.len(),
        document.buffers.len()
    );
    Ok(document)
}

/// Read and decode a document file
///
/// The file's directory is used as the base path for external payloads.
///
/// # Errors
/// Returns [`LoadError::Io`] when the file cannot be read, otherwise see [`load`].
pub fn load_file(path: impl AsRef<Path>) -> LoadResult<Document> {
    load_file_with_config(path, &LoaderConfig::default())
}

/// Read and decode a document file with explicit loader settings
///
/// # Errors
/// See [`load_file`].
pub fn load_file_with_config(path: impl AsRef<Path>, config: &LoaderConfig) -> LoadResult<Document> {
    let path = path.as_ref();
    info!("Loading document from {}", path.display());

    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_with_config(bytes, path.parent(), config)
}

/// JSON and binary chunks of a binary container
struct Container<'a> {
    json: &'a [u8],
    binary: Option<&'a [u8]>,
}

fn split_container(bytes: &[u8]) -> LoadResult<Container<'_>> {
    let version = read_u32(bytes, 4)?;
    if version != GLB_VERSION {
        return Err(LoadError::InvalidContainer(format!("unsupported container version {version}")));
    }

    let declared = read_u32(bytes, 8)? as usize;
    if declared > bytes.len() {
        return Err(LoadError::InvalidContainer(format!(
            "header declares {declared} bytes but only {} are present",
            bytes.len()
        )));
    }
    let bytes = &bytes[..declared];

    let (kind, json, next) = read_chunk(bytes, GLB_HEADER_LEN)?;
    if kind != CHUNK_JSON {
        return Err(LoadError::InvalidContainer("first chunk is not JSON".to_string()));
    }

    let binary = if next < bytes.len() {
        let (kind, data, _) = read_chunk(bytes, next)?;
        if kind == CHUNK_BIN {
            Some(data)
        } else {
            debug!("Ignoring container chunk of type {kind:#010x}");
            None
        }
    } else {
        None
    };

    Ok(Container { json, binary })
}

/// Returns the chunk type, its payload and the offset of the next chunk
fn read_chunk(bytes: &[u8], offset: usize) -> LoadResult<(u32, &[u8], usize)> {
    let length = read_u32(bytes, offset)? as usize;
    let kind = read_u32(bytes, offset + 4)?;
    let start = offset + CHUNK_HEADER_LEN;
    let data = start
        .checked_add(length)
        .and_then(|end| bytes.get(start..end))
        .ok_or_else(|| {
            LoadError::InvalidContainer(format!("chunk at offset {offset} with length {length} is truncated"))
        })?;
    Ok((kind, data, start + length))
}

fn read_u32(bytes: &[u8], offset: usize) -> LoadResult<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|raw| <[u8; 4]>::try_from(raw).ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| LoadError::InvalidContainer(format!("unexpected end of data at offset {offset}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BufferTarget, ComponentType, PrimitiveMode};

    const TRIANGLE: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "mode": 4}]}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}],
        "bufferViews": [{"buffer": 0, "byteLength": 36, "target": 34962}],
        "buffers": [{"byteLength": 36}]
    }"#;

    fn glb(json: &str, bin: Option<&[u8]>) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut chunks = Vec::new();
        chunks.extend_from_slice(&(json.len() as u32).to_le_bytes());
        chunks.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        chunks.extend_from_slice(&json);
        if let Some(bin) = bin {
            chunks.extend_from_slice(&(bin.len() as u32).to_le_bytes());
            chunks.extend_from_slice(&CHUNK_BIN.to_le_bytes());
            chunks.extend_from_slice(bin);
        }

        let mut out = Vec::new();
        out.extend_from_slice(GLB_MAGIC);
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&((GLB_HEADER_LEN + chunks.len()) as u32).to_le_bytes());
        out.extend_from_slice(&chunks);
        out
    }

    #[test]
    fn test_load_json_text() {
        let doc = load(TRIANGLE, None).unwrap();
        assert_eq!(doc.accessors[0].component_type, ComponentType::Float);
        assert_eq!(doc.buffer_views[0].target, Some(BufferTarget::ArrayBuffer));
        assert_eq!(doc.meshes[0].primitives[0].mode, PrimitiveMode::Triangles);
        assert!(doc.buffers[0].data.is_none());
    }

    #[test]
    fn test_load_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(TRIANGLE.as_bytes());
        assert!(load(bytes, None).is_ok());
    }

    #[test]
    fn test_load_container_with_binary_chunk() {
        let bin: Vec<u8> = (0..36).collect();
        let doc = load(glb(TRIANGLE, Some(&bin)), None).unwrap();
        assert_eq!(doc.buffers[0].data.as_deref(), Some(&bin[..]));
    }

    #[test]
    fn test_container_errors() {
        let mut bytes = glb(TRIANGLE, None);
        bytes[4] = 1;
        assert!(matches!(load(&bytes, None), Err(LoadError::InvalidContainer(_))));

        let bytes = glb(TRIANGLE, None);
        assert!(matches!(load(&bytes[..20], None), Err(LoadError::InvalidContainer(_))));
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let err = load(r#"{"asset":{"version":"2.0"},"accessors":[{"componentType":5126,"type":"VEC3"}]}"#, None)
            .unwrap_err();
        match err {
            LoadError::Malformed(e) => assert!(e.to_string().contains("count")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_string_variant_is_malformed() {
        let err = load(
            r#"{"asset":{"version":"2.0"},"materials":[{"alphaMode":"GLOW"}]}"#,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn test_load_file_resolves_relative_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tri.bin"), vec![0u8; 36]).unwrap();
        let json = TRIANGLE.replace(r#""byteLength": 36}]"#, r#""byteLength": 36, "uri": "tri.bin"}]"#);
        let path = dir.path().join("tri.gltf");
        std::fs::write(&path, json).unwrap();

        let doc = load_file(&path).unwrap();
        assert_eq!(doc.buffers[0].data.as_ref().map(Vec::len), Some(36));
    }

    #[test]
    fn test_load_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(dir.path().join("absent.gltf")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
