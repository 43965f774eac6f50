//! Payload resolution for buffers and images
//!
//! A payload comes from one of three places: the binary chunk of a container,
//! an embedded `data:` URI, or a file relative to the document's base path.
//! Any failure leaves the entry's `data` as `None` and logs a warning; the
//! rest of the document loads normally.

use std::path::Path;

use base64::Engine as _;
use log::{debug, warn};

use super::Document;
use crate::config::LoaderConfig;

/// Resolve the payload of every buffer and URI-sourced image
pub(crate) fn resolve(
    document: &mut Document,
    base_path: Option<&Path>,
    mut binary_chunk: Option<Vec<u8>>,
    config: &LoaderConfig,
) {
    for (index, buffer) in document.buffers.iter_mut().enumerate() {
        buffer.data = match &buffer.uri {
            Some(uri) => load_uri(uri, base_path, config),
            // Only the first buffer may refer to the binary chunk
            None if index == 0 => binary_chunk.take(),
            None => None,
        };

        match &buffer.data {
            Some(data) if data.len() < buffer.byte_length => warn!(
                "Buffer {index} resolved to {} bytes but declares {}",
                data.len(),
                buffer.byte_length
            ),
            Some(data) => debug!("Buffer {index}: {} bytes", data.len()),
            None => warn!("Buffer {index} has no payload; dependent primitives will not be drawn"),
        }
    }

    for (index, image) in document.images.iter_mut().enumerate() {
        if let Some(uri) = &image.uri {
            image.data = load_uri(uri, base_path, config);
            if image.data.is_none() {
                warn!("Image {index} has no payload; textures using it are disabled");
            }
        }
    }
}

/// Bytes behind a URI, or `None` when they cannot be obtained
pub fn load_uri(uri: &str, base_path: Option<&Path>, config: &LoaderConfig) -> Option<Vec<u8>> {
    if let Some(data_uri) = uri.strip_prefix("data:") {
        if !config.decode_data_uris {
            debug!("Skipping embedded data URI");
            return None;
        }
        return decode_data_uri(data_uri);
    }

    if uri.contains("://") {
        warn!("Not fetching remote resource {uri}");
        return None;
    }

    if !config.resolve_external_resources {
        debug!("Skipping external resource {uri}");
        return None;
    }

    let Some(base) = base_path else {
        warn!("No base path to resolve {uri} against");
        return None;
    };

    let path = base.join(uri);
    match std::fs::read(&path) {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Some(bytes)
        }
        Err(e) => {
            warn!("Failed to read {}: {e}", path.display());
            None
        }
    }
}

/// Decode the part of a `data:` URI after the scheme
fn decode_data_uri(data_uri: &str) -> Option<Vec<u8>> {
    let Some((header, payload)) = data_uri.split_once(',') else {
        warn!("Data URI has no payload separator");
        return None;
    };

    if !header.ends_with(";base64") {
        warn!("Data URI with header {header:?} is not base64 encoded");
        return None;
    }

    match base64::engine::general_purpose::STANDARD.decode(payload) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Failed to decode base64 data URI: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_uri() {
        let bytes = load_uri(
            "data:application/octet-stream;base64,AAECAw==",
            None,
            &LoaderConfig::default(),
        );
        assert_eq!(bytes, Some(vec![0, 1, 2, 3]));
    }

    #[test]
    fn test_bad_data_uris_degrade() {
        let config = LoaderConfig::default();
        assert_eq!(load_uri("data:application/octet-stream;base64,@@@", None, &config), None);
        assert_eq!(load_uri("data:text/plain,hello", None, &config), None);
        assert_eq!(load_uri("data:nocomma", None, &config), None);
    }

    #[test]
    fn test_data_uris_can_be_disabled() {
        let config = LoaderConfig {
            decode_data_uris: false,
            ..Default::default()
        };
        assert_eq!(load_uri("data:;base64,AAAA", None, &config), None);
    }

    #[test]
    fn test_external_file_resolution() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mesh.bin"), [7u8; 4]).unwrap();
        let config = LoaderConfig::default();

        assert_eq!(load_uri("mesh.bin", Some(dir.path()), &config), Some(vec![7; 4]));
        assert_eq!(load_uri("missing.bin", Some(dir.path()), &config), None);
        assert_eq!(load_uri("mesh.bin", None, &config), None);
        assert_eq!(load_uri("https://example.com/mesh.bin", Some(dir.path()), &config), None);

        let offline = LoaderConfig {
            resolve_external_resources: false,
            ..Default::default()
        };
        assert_eq!(load_uri("mesh.bin", Some(dir.path()), &offline), None);
    }

    #[test]
    fn test_binary_chunk_only_for_first_buffer() {
        let mut doc: Document = serde_json::from_str(
            r#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":4},{"byteLength":4}]}"#,
        )
        .unwrap();
        resolve(&mut doc, None, Some(vec![1, 2, 3, 4]), &LoaderConfig::default());
        assert_eq!(doc.buffers[0].data, Some(vec![1, 2, 3, 4]));
        assert_eq!(doc.buffers[1].data, None);
    }
}
