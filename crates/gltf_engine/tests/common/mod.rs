//! Shared fixtures for integration tests

#![allow(dead_code)]

use base64::Engine as _;

/// Quad positions (4 x VEC3 float) followed by 6 u16 indices
pub fn quad_bytes() -> Vec<u8> {
    let positions: [f32; 12] = [
        -1.0, -1.0, 0.0, //
        1.0, -1.0, 0.0, //
        1.0, 1.0, 0.0, //
        -1.0, 1.0, 0.0,
    ];
    let indices: [u16; 6] = [0, 1, 2, 0, 2, 3];
    let mut bytes = bytemuck::cast_slice::<f32, u8>(&positions).to_vec();
    bytes.extend_from_slice(bytemuck::cast_slice(&indices));
    bytes
}

/// `data:` URI embedding `bytes`
pub fn data_uri(bytes: &[u8]) -> String {
    format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Buffer, view and accessor tables for the quad, with the buffer `uri` given
/// as a JSON value (`null` leaves it out for GLB payloads)
pub fn quad_tables(uri: &str) -> String {
    let uri = if uri == "null" {
        String::new()
    } else {
        format!(r#", "uri": {uri}"#)
    };
    format!(
        r#""accessors": [
            {{"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3",
              "min": [-1, -1, 0], "max": [1, 1, 0]}},
            {{"bufferView": 1, "componentType": 5123, "count": 6, "type": "SCALAR"}}
        ],
        "bufferViews": [
            {{"buffer": 0, "byteLength": 48, "target": 34962}},
            {{"buffer": 0, "byteOffset": 48, "byteLength": 12, "target": 34963}}
        ],
        "buffers": [{{"byteLength": 60{uri}}}]"#
    )
}

/// Wrap a JSON document and an optional binary payload in a GLB container
pub fn glb(json: &str, bin: Option<&[u8]>) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut chunks = Vec::new();
    chunks.extend_from_slice(&(json.len() as u32).to_le_bytes());
    chunks.extend_from_slice(b"JSON");
    chunks.extend_from_slice(&json);
    if let Some(bin) = bin {
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        chunks.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        chunks.extend_from_slice(b"BIN\0");
        chunks.extend_from_slice(&bin);
    }

    let mut out = b"glTF".to_vec();
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&((12 + chunks.len()) as u32).to_le_bytes());
    out.extend_from_slice(&chunks);
    out
}
