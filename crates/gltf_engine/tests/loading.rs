//! Document loading from text, GLB containers and files

mod common;

use gltf_engine::document::{load, load_file, AlphaMode, ComponentType, LoadError, Semantic};
use gltf_engine::foundation::math::Mat4;

use common::{data_uri, glb, quad_bytes, quad_tables};

fn quad_json(uri: &str) -> String {
    format!(
        r#"{{
            "asset": {{"version": "2.0", "generator": "fixture"}},
            "scene": 0,
            "scenes": [{{"name": "main", "nodes": [0]}}],
            "nodes": [
                {{"name": "root", "children": [1], "translation": [1, 2, 3]}},
                {{"name": "quad", "mesh": 0, "rotation": [0, 0, 0, 1], "scale": [2, 2, 2]}}
            ],
            "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0}}]}}],
            "materials": [{{"name": "glass", "alphaMode": "BLEND", "doubleSided": true,
                            "pbrMetallicRoughness": {{"baseColorFactor": [1, 0, 0, 0.5]}}}}],
            {}
        }}"#,
        quad_tables(uri)
    )
}

#[test]
fn round_trip_preserves_structure() {
    let uri = format!("\"{}\"", data_uri(&quad_bytes()));
    let original = load(quad_json(&uri), None).unwrap();

    let reloaded = load(original.to_json().unwrap(), None).unwrap();
    assert_eq!(reloaded.accessors, original.accessors);
    assert_eq!(reloaded.nodes, original.nodes);
    assert_eq!(reloaded.materials, original.materials);
    assert_eq!(reloaded, original);
}

#[test]
fn serialized_form_omits_defaults() {
    let uri = format!("\"{}\"", data_uri(&quad_bytes()));
    let doc = load(quad_json(&uri), None).unwrap();
    let json = doc.to_json().unwrap();

    assert!(json.contains("\"alphaMode\": \"BLEND\""));
    assert!(!json.contains("alphaCutoff"));
    assert!(!json.contains("byteOffset\": 0"));
}

#[test]
fn data_uri_payload_is_readable() {
    let uri = format!("\"{}\"", data_uri(&quad_bytes()));
    let doc = load(quad_json(&uri), None).unwrap();

    let primitive = &doc.meshes[0].primitives[0];
    let positions = doc.read_accessor(primitive.attribute(&Semantic::Position).unwrap()).unwrap();
    assert_eq!(positions.len(), 12);
    assert_eq!(&positions[3..6], &[1.0, -1.0, 0.0]);
    assert_eq!(doc.read_indices(1).unwrap(), vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(doc.materials[0].alpha_mode, AlphaMode::Blend);
}

#[test]
fn glb_binary_chunk_backs_uriless_buffer() {
    let bytes = glb(&quad_json("null"), Some(&quad_bytes()));
    let doc = load(bytes, None).unwrap();

    assert_eq!(doc.buffers[0].data.as_deref(), Some(quad_bytes().as_slice()));
    assert_eq!(doc.accessors[1].component_type, ComponentType::UnsignedShort);
    assert_eq!(doc.read_indices(1).unwrap().len(), 6);
}

#[test]
fn truncated_glb_is_rejected() {
    let mut bytes = glb(&quad_json("null"), Some(&quad_bytes()));
    bytes.truncate(20);
    assert!(matches!(load(bytes, None), Err(LoadError::InvalidContainer(_))));
}

#[test]
fn external_buffer_resolves_against_file_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("quad.bin"), quad_bytes()).unwrap();
    let path = dir.path().join("quad.gltf");
    std::fs::write(&path, quad_json("\"quad.bin\"")).unwrap();

    let doc = load_file(&path).unwrap();
    assert_eq!(doc.buffers[0].data.as_ref().map(Vec::len), Some(60));
}

#[test]
fn missing_external_buffer_loads_without_payload() {
    let dir = tempfile::tempdir().unwrap();
    let doc = load(quad_json("\"missing.bin\""), Some(dir.path())).unwrap();

    assert!(doc.buffers[0].data.is_none());
    assert!(doc.read_accessor(0).is_err());
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.gltf");
    match load_file(&path) {
        Err(LoadError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn out_of_range_reference_is_rejected() {
    let json = r#"{"asset": {"version": "2.0"}, "nodes": [{"mesh": 3}]}"#;
    assert!(matches!(load(json, None), Err(LoadError::IndexOutOfRange { index: 3, .. })));
}

#[test]
fn missing_required_field_is_malformed() {
    let json = r#"{"asset": {"version": "2.0"}, "accessors": [{"componentType": 5126, "type": "VEC3"}]}"#;
    let err = load(json, None).unwrap_err();
    assert!(matches!(err, LoadError::Malformed(_)));
    assert!(err.to_string().contains("count"));
}

#[test]
fn nodes_start_with_identity_world_matrix() {
    let uri = format!("\"{}\"", data_uri(&quad_bytes()));
    let doc = load(quad_json(&uri), None).unwrap();
    assert_eq!(*doc.nodes[1].world_matrix(), Mat4::identity());
}
