//! Structural validation of a decoded document
//!
//! Runs once at load time. After it succeeds every cross-reference is a valid
//! index, every buffer view fits its buffer, every accessor fits its view, and
//! the node graph is a forest, so later stages can index without re-checking.

use log::warn;

use super::error::{LoadError, LoadResult};
use super::{AccessorType, CameraType, ComponentType, Document, Primitive, TextureInfo};

/// Validate all cross-references, byte ranges and the node hierarchy
pub fn validate(document: &Document) -> LoadResult<()> {
    check_asset(document);
    check_scenes(document)?;
    check_nodes(document)?;
    check_hierarchy(document)?;
    check_meshes(document)?;
    check_accessors(document)?;
    check_buffer_views(document)?;
    check_materials(document)?;
    check_textures(document)?;
    check_cameras(document)?;
    check_skins(document)?;
    check_animations(document)?;
    Ok(())
}

fn check_index(index: usize, len: usize, path: impl FnOnce() -> String) -> LoadResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(LoadError::IndexOutOfRange {
            path: path(),
            index,
            len,
        })
    }
}

fn check_optional(index: Option<usize>, len: usize, path: impl FnOnce() -> String) -> LoadResult<()> {
    match index {
        Some(index) => check_index(index, len, path),
        None => Ok(()),
    }
}

fn check_asset(document: &Document) {
    let major = document.asset.version.split('.').next().unwrap_or_default();
    if major != "2" {
        warn!("Document declares format version {}; reading it as 2.x", document.asset.version);
    }
    for extension in &document.extensions_required {
        warn!("Required extension {extension} is not supported and will be ignored");
    }
}

fn check_scenes(document: &Document) -> LoadResult<()> {
    check_optional(document.scene, document.scenes.len(), || "scene".to_string())?;
    for (s, scene) in document.scenes.iter().enumerate() {
        for (i, &node) in scene.nodes.iter().enumerate() {
            check_index(node, document.nodes.len(), || format!("scenes[{s}].nodes[{i}]"))?;
        }
    }
    Ok(())
}

fn check_nodes(document: &Document) -> LoadResult<()> {
    for (n, node) in document.nodes.iter().enumerate() {
        for (i, &child) in node.children.iter().enumerate() {
            check_index(child, document.nodes.len(), || format!("nodes[{n}].children[{i}]"))?;
        }
        check_optional(node.mesh, document.meshes.len(), || format!("nodes[{n}].mesh"))?;
        check_optional(node.camera, document.cameras.len(), || format!("nodes[{n}].camera"))?;
        check_optional(node.skin, document.skins.len(), || format!("nodes[{n}].skin"))?;

        if let Some([x, y, z, w]) = node.rotation {
            if x * x + y * y + z * z + w * w == 0.0 {
                warn!("Node {n} has a zero rotation quaternion; it contributes no rotation");
            }
        }
    }
    Ok(())
}

/// Every node has at most one parent and every node is reachable from a root
fn check_hierarchy(document: &Document) -> LoadResult<()> {
    let count = document.nodes.len();
    let mut parent: Vec<Option<usize>> = vec![None; count];

    for (n, node) in document.nodes.iter().enumerate() {
        for &child in &node.children {
            if child == n {
                return Err(LoadError::InvalidHierarchy {
                    node: n,
                    reason: "node lists itself as a child".to_string(),
                });
            }
            if let Some(existing) = parent[child] {
                return Err(LoadError::InvalidHierarchy {
                    node: child,
                    reason: format!("node has two parents ({existing} and {n})"),
                });
            }
            parent[child] = Some(n);
        }
    }

    // With single parents, a node unreachable from any root sits on a cycle
    let mut reached = vec![false; count];
    let mut stack: Vec<usize> = (0..count).filter(|&n| parent[n].is_none()).collect();
    while let Some(n) = stack.pop() {
        reached[n] = true;
        stack.extend(&document.nodes[n].children);
    }
    if let Some(node) = reached.iter().position(|&r| !r) {
        return Err(LoadError::InvalidHierarchy {
            node,
            reason: "node is part of a cycle".to_string(),
        });
    }

    for (s, scene) in document.scenes.iter().enumerate() {
        for &root in &scene.nodes {
            if let Some(p) = parent[root] {
                warn!("Scene {s} lists node {root} as a root, but it is a child of node {p}");
            }
        }
    }
    Ok(())
}

fn check_meshes(document: &Document) -> LoadResult<()> {
    let accessors = document.accessors.len();
    for (m, mesh) in document.meshes.iter().enumerate() {
        for (p, primitive) in mesh.primitives.iter().enumerate() {
            check_primitive(document, primitive, accessors, m, p)?;
        }
    }
    Ok(())
}

fn check_primitive(
    document: &Document,
    primitive: &Primitive,
    accessors: usize,
    m: usize,
    p: usize,
) -> LoadResult<()> {
    for (semantic, &accessor) in &primitive.attributes {
        check_index(accessor, accessors, || {
            format!("meshes[{m}].primitives[{p}].attributes.{semantic}")
        })?;
    }
    for (t, target) in primitive.targets.iter().enumerate() {
        for (semantic, &accessor) in target {
            check_index(accessor, accessors, || {
                format!("meshes[{m}].primitives[{p}].targets[{t}].{semantic}")
            })?;
        }
    }
    check_optional(primitive.material, document.materials.len(), || {
        format!("meshes[{m}].primitives[{p}].material")
    })?;

    if let Some(indices) = primitive.indices {
        let path = || format!("meshes[{m}].primitives[{p}].indices");
        check_index(indices, accessors, path)?;

        let accessor = &document.accessors[indices];
        let component_type = accessor.component_type;
        if component_type == ComponentType::Invalid {
            warn!("meshes[{m}].primitives[{p}]: index accessor {indices} has an unknown component type");
        } else if accessor.kind != AccessorType::Scalar || !component_type.is_index_type() {
            return Err(LoadError::InvalidValue {
                path: path(),
                reason: format!(
                    "index accessor {indices} must be an unsigned SCALAR, found {:?} of {:?}",
                    accessor.kind, accessor.component_type
                ),
            });
        }
    }
    Ok(())
}

/// Reject `count` elements of `element_size` bytes at `offset` that overrun their view
fn check_extent(
    document: &Document,
    view: usize,
    offset: usize,
    element_size: usize,
    count: usize,
    path: impl FnOnce() -> String,
) -> LoadResult<()> {
    let Some(view) = document.buffer_views.get(view) else {
        return Ok(());
    };
    if count == 0 {
        return Ok(());
    }
    let stride = view.byte_stride.unwrap_or(element_size);
    let end = stride
        .checked_mul(count - 1)
        .and_then(|span| span.checked_add(element_size))
        .and_then(|span| span.checked_add(offset));
    match end {
        Some(end) if end <= view.byte_length => Ok(()),
        _ => Err(LoadError::RangeOutOfBounds {
            path: path(),
            offset,
            length: end.map_or(usize::MAX, |end| end - offset),
            available: view.byte_length,
        }),
    }
}

fn check_accessors(document: &Document) -> LoadResult<()> {
    let views = document.buffer_views.len();
    for (a, accessor) in document.accessors.iter().enumerate() {
        check_optional(accessor.buffer_view, views, || format!("accessors[{a}].bufferView"))?;
        if let Some(view) = accessor.buffer_view {
            check_extent(
                document,
                view,
                accessor.byte_offset,
                accessor.element_size(),
                accessor.count,
                || format!("accessors[{a}]"),
            )?;
        }

        if let Some(sparse) = &accessor.sparse {
            check_index(sparse.indices.buffer_view, views, || {
                format!("accessors[{a}].sparse.indices.bufferView")
            })?;
            check_index(sparse.values.buffer_view, views, || {
                format!("accessors[{a}].sparse.values.bufferView")
            })?;
            let index_type = sparse.indices.component_type;
            if index_type == ComponentType::Invalid {
                warn!("accessors[{a}]: sparse indices have an unknown component type");
            } else if !index_type.is_index_type() {
                return Err(LoadError::InvalidValue {
                    path: format!("accessors[{a}].sparse.indices.componentType"),
                    reason: format!("{:?} is not an unsigned integer type", sparse.indices.component_type),
                });
            }
            if sparse.count > accessor.count {
                return Err(LoadError::InvalidValue {
                    path: format!("accessors[{a}].sparse.count"),
                    reason: format!("{} overrides exceed {} elements", sparse.count, accessor.count),
                });
            }
            check_extent(
                document,
                sparse.indices.buffer_view,
                sparse.indices.byte_offset,
                index_type.size(),
                sparse.count,
                || format!("accessors[{a}].sparse.indices"),
            )?;
            check_extent(
                document,
                sparse.values.buffer_view,
                sparse.values.byte_offset,
                accessor.element_size(),
                sparse.count,
                || format!("accessors[{a}].sparse.values"),
            )?;
        }
    }
    Ok(())
}

fn check_buffer_views(document: &Document) -> LoadResult<()> {
    for (v, view) in document.buffer_views.iter().enumerate() {
        check_index(view.buffer, document.buffers.len(), || format!("bufferViews[{v}].buffer"))?;

        let available = document.buffers[view.buffer].byte_length;
        let fits = view
            .byte_offset
            .checked_add(view.byte_length)
            .is_some_and(|end| end <= available);
        if !fits {
            return Err(LoadError::RangeOutOfBounds {
                path: format!("bufferViews[{v}]"),
                offset: view.byte_offset,
                length: view.byte_length,
                available,
            });
        }
    }
    Ok(())
}

fn check_texture_slot(
    slot: Option<TextureInfo>,
    textures: usize,
    path: impl FnOnce() -> String,
) -> LoadResult<()> {
    check_optional(slot.map(|info| info.index), textures, path)
}

fn check_materials(document: &Document) -> LoadResult<()> {
    let textures = document.textures.len();
    for (m, material) in document.materials.iter().enumerate() {
        let pbr = &material.pbr_metallic_roughness;
        check_texture_slot(pbr.base_color_texture, textures, || {
            format!("materials[{m}].pbrMetallicRoughness.baseColorTexture")
        })?;
        check_texture_slot(pbr.metallic_roughness_texture, textures, || {
            format!("materials[{m}].pbrMetallicRoughness.metallicRoughnessTexture")
        })?;
        check_texture_slot(material.emissive_texture, textures, || {
            format!("materials[{m}].emissiveTexture")
        })?;
        check_optional(material.normal_texture.map(|t| t.index), textures, || {
            format!("materials[{m}].normalTexture")
        })?;
        check_optional(material.occlusion_texture.map(|t| t.index), textures, || {
            format!("materials[{m}].occlusionTexture")
        })?;
    }
    Ok(())
}

fn check_textures(document: &Document) -> LoadResult<()> {
    for (t, texture) in document.textures.iter().enumerate() {
        check_optional(texture.sampler, document.samplers.len(), || format!("textures[{t}].sampler"))?;
        check_optional(texture.source, document.images.len(), || format!("textures[{t}].source"))?;
    }
    for (i, image) in document.images.iter().enumerate() {
        check_optional(image.buffer_view, document.buffer_views.len(), || {
            format!("images[{i}].bufferView")
        })?;
    }
    Ok(())
}

fn check_cameras(document: &Document) -> LoadResult<()> {
    for (c, camera) in document.cameras.iter().enumerate() {
        let present = match camera.kind {
            CameraType::Perspective => camera.perspective.is_some(),
            CameraType::Orthographic => camera.orthographic.is_some(),
        };
        if !present {
            return Err(LoadError::InvalidValue {
                path: format!("cameras[{c}]"),
                reason: format!("{:?} camera has no matching projection block", camera.kind),
            });
        }
    }
    Ok(())
}

fn check_skins(document: &Document) -> LoadResult<()> {
    let nodes = document.nodes.len();
    for (s, skin) in document.skins.iter().enumerate() {
        check_optional(skin.inverse_bind_matrices, document.accessors.len(), || {
            format!("skins[{s}].inverseBindMatrices")
        })?;
        check_optional(skin.skeleton, nodes, || format!("skins[{s}].skeleton"))?;
        for (j, &joint) in skin.joints.iter().enumerate() {
            check_index(joint, nodes, || format!("skins[{s}].joints[{j}]"))?;
        }
    }
    Ok(())
}

fn check_animations(document: &Document) -> LoadResult<()> {
    let accessors = document.accessors.len();
    for (a, animation) in document.animations.iter().enumerate() {
        for (c, channel) in animation.channels.iter().enumerate() {
            check_index(channel.sampler, animation.samplers.len(), || {
                format!("animations[{a}].channels[{c}].sampler")
            })?;
            check_optional(channel.target.node, document.nodes.len(), || {
                format!("animations[{a}].channels[{c}].target.node")
            })?;
        }
        for (s, sampler) in animation.samplers.iter().enumerate() {
            check_index(sampler.input, accessors, || format!("animations[{a}].samplers[{s}].input"))?;
            check_index(sampler.output, accessors, || format!("animations[{a}].samplers[{s}].output"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Document {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_valid_document() {
        let doc = parse(
            r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],
                "nodes":[{"children":[1]},{}]}"#,
        );
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn test_out_of_range_mesh() {
        let doc = parse(r#"{"asset":{"version":"2.0"},"nodes":[{"mesh":3}]}"#);
        match validate(&doc).unwrap_err() {
            LoadError::IndexOutOfRange { path, index, len } => {
                assert_eq!(path, "nodes[0].mesh");
                assert_eq!(index, 3);
                assert_eq!(len, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_range_default_scene() {
        let doc = parse(r#"{"asset":{"version":"2.0"},"scene":1,"scenes":[{}]}"#);
        assert!(matches!(validate(&doc), Err(LoadError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_view_outside_buffer() {
        let doc = parse(
            r#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":16}],
                "bufferViews":[{"buffer":0,"byteOffset":8,"byteLength":12}]}"#,
        );
        match validate(&doc).unwrap_err() {
            LoadError::RangeOutOfBounds { offset, length, available, .. } => {
                assert_eq!((offset, length, available), (8, 12, 16));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_two_parents_rejected() {
        let doc = parse(
            r#"{"asset":{"version":"2.0"},"nodes":[{"children":[2]},{"children":[2]},{}]}"#,
        );
        assert!(matches!(validate(&doc), Err(LoadError::InvalidHierarchy { node: 2, .. })));
    }

    #[test]
    fn test_cycle_rejected() {
        let doc = parse(
            r#"{"asset":{"version":"2.0"},"nodes":[{},{"children":[2]},{"children":[1]}]}"#,
        );
        assert!(matches!(validate(&doc), Err(LoadError::InvalidHierarchy { node: 1, .. })));

        let doc = parse(r#"{"asset":{"version":"2.0"},"nodes":[{"children":[0]}]}"#);
        assert!(matches!(validate(&doc), Err(LoadError::InvalidHierarchy { node: 0, .. })));
    }

    #[test]
    fn test_float_indices_rejected() {
        let doc = parse(
            r#"{"asset":{"version":"2.0"},
                "accessors":[{"componentType":5126,"count":3,"type":"SCALAR"}],
                "meshes":[{"primitives":[{"attributes":{},"indices":0}]}]}"#,
        );
        match validate(&doc).unwrap_err() {
            LoadError::InvalidValue { path, .. } => assert_eq!(path, "meshes[0].primitives[0].indices"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_camera_without_projection_block() {
        let doc = parse(r#"{"asset":{"version":"2.0"},"cameras":[{"type":"orthographic"}]}"#);
        assert!(matches!(validate(&doc), Err(LoadError::InvalidValue { .. })));
    }

    #[test]
    fn test_sparse_indices_must_be_unsigned() {
        let doc = parse(
            r#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":8}],
                "bufferViews":[{"buffer":0,"byteLength":8}],
                "accessors":[{"componentType":5126,"count":2,"type":"SCALAR",
                  "sparse":{"count":1,"indices":{"bufferView":0,"componentType":5126},
                            "values":{"bufferView":0}}}]}"#,
        );
        assert!(matches!(validate(&doc), Err(LoadError::InvalidValue { .. })));
    }

    #[test]
    fn test_unknown_index_component_type_loads() {
        let doc = parse(
            r#"{"asset":{"version":"2.0"},
                "accessors":[{"componentType":5130,"count":3,"type":"SCALAR"}],
                "meshes":[{"primitives":[{"attributes":{},"indices":0}]}]}"#,
        );
        assert_eq!(doc.accessors[0].component_type, ComponentType::Invalid);
        assert!(validate(&doc).is_ok());

        let byte_indices = parse(
            r#"{"asset":{"version":"2.0"},
                "accessors":[{"componentType":5120,"count":3,"type":"SCALAR"}],
                "meshes":[{"primitives":[{"attributes":{},"indices":0}]}]}"#,
        );
        assert!(matches!(validate(&byte_indices), Err(LoadError::InvalidValue { .. })));
    }

    #[test]
    fn test_accessor_overruns_view() {
        let huge = parse(
            r#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":12}],
                "bufferViews":[{"buffer":0,"byteLength":12}],
                "accessors":[{"bufferView":0,"componentType":5126,"count":4611686018427387904,"type":"VEC3"}]}"#,
        );
        match validate(&huge).unwrap_err() {
            LoadError::RangeOutOfBounds { path, available, .. } => {
                assert_eq!(path, "accessors[0]");
                assert_eq!(available, 12);
            }
            other => panic!("unexpected error: {other}"),
        }

        let strided = parse(
            r#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":32}],
                "bufferViews":[{"buffer":0,"byteLength":32,"byteStride":16}],
                "accessors":[{"bufferView":0,"byteOffset":4,"componentType":5126,"count":2,"type":"VEC3"},
                             {"bufferView":0,"byteOffset":8,"componentType":5126,"count":2,"type":"VEC3"}]}"#,
        );
        match validate(&strided).unwrap_err() {
            LoadError::RangeOutOfBounds { path, offset, length, available } => {
                assert_eq!(path, "accessors[1]");
                assert_eq!((offset, length, available), (8, 28, 32));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sparse_values_overrun_view() {
        let doc = parse(
            r#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":8}],
                "bufferViews":[{"buffer":0,"byteLength":2},{"buffer":0,"byteOffset":4,"byteLength":4}],
                "accessors":[{"componentType":5126,"count":4,"type":"SCALAR",
                  "sparse":{"count":2,"indices":{"bufferView":0,"componentType":5121},
                            "values":{"bufferView":1}}}]}"#,
        );
        match validate(&doc).unwrap_err() {
            LoadError::RangeOutOfBounds { path, .. } => assert_eq!(path, "accessors[0].sparse.values"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
