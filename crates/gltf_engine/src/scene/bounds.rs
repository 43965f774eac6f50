//! World-space bounds of a scene

use super::SceneError;
use crate::document::{Document, Semantic};
use crate::foundation::math::Vec3;
use crate::foundation::BoundingBox;

/// Bounds of every mesh in the default scene under the current world matrices
///
/// Each primitive contributes the `min`/`max` box of its POSITION accessor,
/// transformed by its node's world matrix. Primitives whose accessor lacks
/// bounds are ignored.
pub fn scene_bounds(document: &Document) -> BoundingBox {
    scene_bounds_for(document, None).unwrap_or_default()
}

/// Bounds of a specific scene; see [`scene_bounds`]
///
/// # Errors
/// Returns [`SceneError::UnknownScene`] when `scene` is out of range.
pub fn scene_bounds_for(document: &Document, scene: Option<usize>) -> Result<BoundingBox, SceneError> {
    let roots = document.scene_roots(scene)?;
    let mut bounds = BoundingBox::empty();

    for index in document.traversal_order(&roots) {
        let node = &document.nodes[index];
        let Some(mesh) = node.mesh.and_then(|m| document.meshes.get(m)) else {
            continue;
        };

        for primitive in &mesh.primitives {
            let Some(accessor) = primitive
                .attribute(&Semantic::Position)
                .and_then(|a| document.accessors.get(a))
            else {
                continue;
            };
            if accessor.min.len() < 3 || accessor.max.len() < 3 {
                continue;
            }

            let local = BoundingBox::new(
                Vec3::new(accessor.min[0], accessor.min[1], accessor.min[2]),
                Vec3::new(accessor.max[0], accessor.max[1], accessor.max[2]),
            );
            bounds.expand_box(&local.transformed(node.world_matrix()));
        }
    }
    Ok(bounds)
}
