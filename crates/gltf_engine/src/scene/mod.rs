//! # Scene Transforms
//!
//! Computes world-space transforms for the nodes of a [`Document`].
//!
//! A pass starts at the roots of the active scene with a caller-supplied root
//! matrix and walks the node forest depth first, writing
//! `world = parent_world * local` into every node it reaches. Nothing is
//! cached between passes: any parent transform may change from one frame to
//! the next.
//!
//! ## Rotation convention
//!
//! By default a node rotation enters as the inverse of the transposed
//! quaternion matrix, `local = T * (Rᵀ)⁻¹ * S`. For a unit quaternion this is
//! the ordinary rotation. [`RotationConvention::Quaternion`] uses `R` directly
//! and [`RotationConvention::InverseQuaternion`] uses `R⁻¹`, which turns the
//! other way.
//!
//! ## Matrix nodes
//!
//! A node with an explicit matrix ends its branch: its children keep their
//! previous world matrix unless [`TransformPropagator::set_descend_matrix_nodes`]
//! is enabled.

mod bounds;
mod propagation;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::foundation::math::{Mat4, Mat4Ext};

pub use bounds::{scene_bounds, scene_bounds_for};
pub use propagation::TransformPropagator;

/// How a node's rotation quaternion enters its local transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationConvention {
    /// `T * (Rᵀ)⁻¹ * S`; equal to `T * R * S` for unit quaternions
    #[default]
    TransposedInverse,
    /// `T * R⁻¹ * S`
    InverseQuaternion,
    /// `T * R * S`
    Quaternion,
}

impl RotationConvention {
    /// Rotation contribution of the quaternion `(x, y, z, w)`
    ///
    /// A quaternion whose matrix cannot be inverted contributes no rotation.
    pub fn rotation_matrix(self, x: f32, y: f32, z: f32, w: f32) -> Mat4 {
        let rotation = Mat4::from_quaternion(x, y, z, w);
        match self {
            Self::Quaternion => rotation,
            Self::InverseQuaternion => rotation.try_inverse().unwrap_or_else(Mat4::identity),
            Self::TransposedInverse => rotation.transpose().try_inverse().unwrap_or_else(Mat4::identity),
        }
    }
}

/// Selection of a scene that does not exist
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The requested scene index is out of range
    #[error("scene {index} does not exist ({count} scenes)")]
    UnknownScene {
        /// Requested scene
        index: usize,
        /// Number of scenes in the document
        count: usize,
    },
}

impl Document {
    /// Scene used when `requested` is `None`: the document default, else the first
    ///
    /// Returns `Ok(None)` for a document without scenes.
    ///
    /// # Errors
    /// Returns [`SceneError::UnknownScene`] when `requested` is out of range.
    pub fn active_scene(&self, requested: Option<usize>) -> Result<Option<usize>, SceneError> {
        match requested {
            Some(index) if index >= self.scenes.len() => Err(SceneError::UnknownScene {
                index,
                count: self.scenes.len(),
            }),
            Some(index) => Ok(Some(index)),
            None if self.scenes.is_empty() => Ok(None),
            None => Ok(Some(self.scene.unwrap_or(0))),
        }
    }

    /// Root nodes that take part in a pass over the selected scene
    ///
    /// A document without scenes uses every node that has no parent.
    ///
    /// # Errors
    /// See [`Document::active_scene`].
    pub fn scene_roots(&self, requested: Option<usize>) -> Result<Vec<usize>, SceneError> {
        if let Some(scene) = self.active_scene(requested)? {
            return Ok(self.scenes.get(scene).map(|s| s.nodes.clone()).unwrap_or_default());
        }

        let mut has_parent = vec![false; self.nodes.len()];
        for node in &self.nodes {
            for &child in &node.children {
                if let Some(flag) = has_parent.get_mut(child) {
                    *flag = true;
                }
            }
        }
        Ok((0..self.nodes.len()).filter(|&n| !has_parent[n]).collect())
    }

    /// Nodes reachable from `roots` in depth-first pre-order
    pub fn traversal_order(&self, roots: &[usize]) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            let Some(node) = self.nodes.get(index) else { continue };
            if order.len() > self.nodes.len() {
                break;
            }
            order.push(index);
            stack.extend(node.children.iter().rev());
        }
        order
    }

    /// Recompute world matrices for the selected scene with the default convention
    ///
    /// # Errors
    /// See [`Document::active_scene`].
    pub fn update(&mut self, world: &Mat4, scene: Option<usize>) -> Result<(), SceneError> {
        let roots = self.scene_roots(scene)?;
        TransformPropagator::default().propagate(&mut self.nodes, &roots, world);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(json: &str) -> Document {
        crate::document::load(json, None).unwrap()
    }

    #[test]
    fn test_identity_quaternion_under_every_convention() {
        for convention in [
            RotationConvention::TransposedInverse,
            RotationConvention::InverseQuaternion,
            RotationConvention::Quaternion,
        ] {
            assert_relative_eq!(convention.rotation_matrix(0.0, 0.0, 0.0, 1.0), Mat4::identity());
        }
    }

    #[test]
    fn test_conventions_are_mutual_inverses() {
        let half = std::f32::consts::FRAC_PI_8;
        let (s, c) = half.sin_cos();
        let forward = RotationConvention::Quaternion.rotation_matrix(0.0, s, 0.0, c);
        let inverse = RotationConvention::InverseQuaternion.rotation_matrix(0.0, s, 0.0, c);
        assert_relative_eq!(forward * inverse, Mat4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_default_matches_forward_rotation_for_unit_quaternions() {
        let (s, c) = std::f32::consts::FRAC_PI_6.sin_cos();
        let norm = (3.0_f32).sqrt();
        let (x, y, z) = (s / norm, s / norm, s / norm);
        assert_relative_eq!(
            RotationConvention::default().rotation_matrix(x, y, z, c),
            RotationConvention::Quaternion.rotation_matrix(x, y, z, c),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_default_on_non_unit_quaternion() {
        // |q|² = 2 gives R with det 5 in the xy block; (Rᵀ)⁻¹ = R / 5 there
        let m = RotationConvention::default().rotation_matrix(0.0, 0.0, 1.0, 1.0);
        assert_relative_eq!(m[(0, 0)], -0.2, epsilon = 1e-6);
        assert_relative_eq!(m[(0, 1)], -0.4, epsilon = 1e-6);
        assert_relative_eq!(m[(1, 0)], 0.4, epsilon = 1e-6);
        assert_relative_eq!(m[(2, 2)], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_quaternion_contributes_nothing() {
        for convention in [RotationConvention::TransposedInverse, RotationConvention::InverseQuaternion] {
            assert_eq!(convention.rotation_matrix(0.0, 0.0, 0.0, 0.0), Mat4::identity());
        }
    }

    #[test]
    fn test_active_scene_selection() {
        let doc = parse(r#"{"asset":{"version":"2.0"},"scene":1,"scenes":[{},{}]}"#);
        assert_eq!(doc.active_scene(None), Ok(Some(1)));
        assert_eq!(doc.active_scene(Some(0)), Ok(Some(0)));
        assert_eq!(
            doc.active_scene(Some(2)),
            Err(SceneError::UnknownScene { index: 2, count: 2 })
        );

        let doc = parse(r#"{"asset":{"version":"2.0"},"scenes":[{}]}"#);
        assert_eq!(doc.active_scene(None), Ok(Some(0)));
    }

    #[test]
    fn test_sceneless_document_uses_parentless_nodes() {
        let doc = parse(r#"{"asset":{"version":"2.0"},"nodes":[{"children":[2]},{},{}]}"#);
        assert_eq!(doc.active_scene(None), Ok(None));
        assert_eq!(doc.scene_roots(None).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_traversal_is_preorder() {
        let doc = parse(
            r#"{"asset":{"version":"2.0"},"scenes":[{"nodes":[0,3]}],
                "nodes":[{"children":[1,2]},{},{},{}]}"#,
        );
        let roots = doc.scene_roots(None).unwrap();
        assert_eq!(doc.traversal_order(&roots), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_update_writes_world_matrices() {
        let mut doc = parse(
            r#"{"asset":{"version":"2.0"},"scenes":[{"nodes":[0]}],
                "nodes":[{"translation":[1,0,0],"children":[1]},{"translation":[0,2,0]}]}"#,
        );
        doc.update(&Mat4::identity(), None).unwrap();
        assert_relative_eq!(
            *doc.nodes[1].world_matrix(),
            Mat4::identity().translated(1.0, 2.0, 0.0),
            epsilon = 1e-6
        );
        assert!(doc.update(&Mat4::identity(), Some(4)).is_err());
    }
}
