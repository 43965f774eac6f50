//! Depth-first world matrix propagation

use log::warn;

use super::RotationConvention;
use crate::document::Node;
use crate::foundation::math::{Mat4, Mat4Ext};

impl Node {
    /// Local transform of this node
    ///
    /// An explicit matrix wins over TRS components. Missing components default
    /// to zero translation, no rotation and unit scale.
    pub fn local_matrix(&self, convention: RotationConvention) -> Mat4 {
        if let Some(matrix) = &self.matrix {
            return Mat4::from_column_array(matrix);
        }

        let mut local = Mat4::identity();
        if let Some([x, y, z]) = self.translation {
            local = local.translated(x, y, z);
        }
        if let Some([x, y, z, w]) = self.rotation {
            local *= convention.rotation_matrix(x, y, z, w);
        }
        if let Some([x, y, z]) = self.scale {
            local = local.scaled(x, y, z);
        }
        local
    }
}

/// Reusable state for world matrix passes
///
/// Keeps its traversal stack between passes so a per-frame pass does not
/// allocate once the stack has grown to the depth of the scene.
#[derive(Debug, Default)]
pub struct TransformPropagator {
    convention: RotationConvention,
    descend_matrix_nodes: bool,
    stack: Vec<(usize, Mat4)>,
}

impl TransformPropagator {
    /// Create a propagator using `convention` for node rotations
    pub fn new(convention: RotationConvention) -> Self {
        Self {
            convention,
            descend_matrix_nodes: false,
            stack: Vec::new(),
        }
    }

    /// Also visit the children of nodes that carry an explicit matrix
    pub fn with_descend_matrix_nodes(mut self, descend: bool) -> Self {
        self.descend_matrix_nodes = descend;
        self
    }

    /// Rotation convention in use
    pub fn convention(&self) -> RotationConvention {
        self.convention
    }

    /// Change the rotation convention for later passes
    pub fn set_convention(&mut self, convention: RotationConvention) {
        self.convention = convention;
    }

    /// Whether children of matrix nodes are visited
    pub fn descend_matrix_nodes(&self) -> bool {
        self.descend_matrix_nodes
    }

    /// Change whether children of matrix nodes are visited in later passes
    pub fn set_descend_matrix_nodes(&mut self, descend: bool) {
        self.descend_matrix_nodes = descend;
    }

    /// Write `world = parent_world * local` into every node reachable from `roots`
    ///
    /// Each root's parent matrix is `world`. A node with an explicit matrix ends
    /// its branch unless descending into matrix nodes is enabled. Nodes outside
    /// the traversal keep their previous world matrix. Indices that do not
    /// exist are skipped.
    pub fn propagate(&mut self, nodes: &mut [Node], roots: &[usize], world: &Mat4) {
        self.stack.clear();
        self.stack.extend(roots.iter().rev().map(|&root| (root, *world)));

        // A well-formed forest visits each node at most once per listed root
        let budget = nodes.len() * roots.len().max(1);
        let mut visited = 0;

        while let Some((index, parent)) = self.stack.pop() {
            let Some(node) = nodes.get_mut(index) else { continue };

            visited += 1;
            if visited > budget {
                warn!("Node graph contains a cycle; stopping propagation at node {index}");
                self.stack.clear();
                return;
            }

            let node_world = parent * node.local_matrix(self.convention);
            node.world_matrix = node_world;
            if node.matrix.is_some() && !self.descend_matrix_nodes {
                continue;
            }
            self.stack
                .extend(node.children.iter().rev().map(|&child| (child, node_world)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    fn node() -> Node {
        Node::default()
    }

    #[test]
    fn test_explicit_matrix_is_parent_times_matrix() {
        let local = Mat4::identity().translated(1.0, 2.0, 3.0).rotated(30.0, 1.0, 0.0, 0.0);
        let parent = Mat4::identity().scaled(2.0, 2.0, 2.0).rotated(45.0, 0.0, 1.0, 0.0);

        let mut nodes = vec![Node {
            matrix: Some(local.to_column_array()),
            translation: Some([100.0, 0.0, 0.0]),
            ..node()
        }];
        TransformPropagator::default().propagate(&mut nodes, &[0], &parent);

        assert_relative_eq!(*nodes[0].world_matrix(), parent * local, epsilon = EPSILON);
    }

    #[test]
    fn test_translation_only() {
        let mut nodes = vec![Node {
            translation: Some([3.0, -4.0, 5.0]),
            ..node()
        }];
        TransformPropagator::default().propagate(&mut nodes, &[0], &Mat4::identity());

        let world = nodes[0].world_matrix();
        assert_relative_eq!(world.column(3).into_owned(), crate::foundation::math::Vec4::new(3.0, -4.0, 5.0, 1.0));
        assert_relative_eq!(
            world.fixed_view::<3, 3>(0, 0).into_owned(),
            nalgebra::Matrix3::identity(),
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_trs_order() {
        // scale, then rotate, then translate
        let half = std::f32::consts::FRAC_PI_4;
        let mut nodes = vec![Node {
            translation: Some([10.0, 0.0, 0.0]),
            rotation: Some([0.0, 0.0, half.sin(), half.cos()]),
            scale: Some([2.0, 2.0, 2.0]),
            ..node()
        }];

        let mut propagator = TransformPropagator::new(RotationConvention::Quaternion);
        propagator.propagate(&mut nodes, &[0], &Mat4::identity());
        let p = nodes[0].world_matrix().project_point(&crate::foundation::math::Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, crate::foundation::math::Vec3::new(10.0, 2.0, 0.0), epsilon = 1e-5);

        propagator.set_convention(RotationConvention::InverseQuaternion);
        propagator.propagate(&mut nodes, &[0], &Mat4::identity());
        let p = nodes[0].world_matrix().project_point(&crate::foundation::math::Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, crate::foundation::math::Vec3::new(10.0, -2.0, 0.0), epsilon = 1e-5);

        TransformPropagator::default().propagate(&mut nodes, &[0], &Mat4::identity());
        let p = nodes[0].world_matrix().project_point(&crate::foundation::math::Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, crate::foundation::math::Vec3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
    }

    fn matrix_parent_with_children() -> Vec<Node> {
        vec![
            Node {
                matrix: Some(Mat4::identity().translated(5.0, 0.0, 0.0).to_column_array()),
                children: vec![1],
                ..node()
            },
            Node {
                translation: Some([0.0, 7.0, 0.0]),
                children: vec![2],
                ..node()
            },
            Node {
                scale: Some([3.0, 3.0, 3.0]),
                ..node()
            },
        ]
    }

    #[test]
    fn test_matrix_node_ends_branch() {
        let mut nodes = matrix_parent_with_children();
        let parent = Mat4::identity().translated(0.0, 0.0, 1.0);
        TransformPropagator::default().propagate(&mut nodes, &[0], &parent);

        assert_relative_eq!(
            *nodes[0].world_matrix(),
            Mat4::identity().translated(5.0, 0.0, 1.0),
            epsilon = EPSILON
        );
        assert_eq!(*nodes[1].world_matrix(), Mat4::identity());
        assert_eq!(*nodes[2].world_matrix(), Mat4::identity());
    }

    #[test]
    fn test_descend_matrix_nodes() {
        let mut nodes = matrix_parent_with_children();
        let mut propagator = TransformPropagator::default().with_descend_matrix_nodes(true);
        assert!(propagator.descend_matrix_nodes());
        propagator.propagate(&mut nodes, &[0], &Mat4::identity());

        let expected = Mat4::identity().translated(5.0, 7.0, 0.0).scaled(3.0, 3.0, 3.0);
        assert_relative_eq!(*nodes[2].world_matrix(), expected, epsilon = EPSILON);

        propagator.set_descend_matrix_nodes(false);
        assert!(!propagator.descend_matrix_nodes());
    }

    #[test]
    fn test_unreached_nodes_untouched_and_bad_indices_skipped() {
        let mut nodes = vec![
            Node {
                translation: Some([1.0, 0.0, 0.0]),
                ..node()
            },
            Node {
                translation: Some([5.0, 0.0, 0.0]),
                ..node()
            },
        ];
        TransformPropagator::default().propagate(&mut nodes, &[0, 9], &Mat4::identity());
        assert_eq!(*nodes[1].world_matrix(), Mat4::identity());
    }

    #[test]
    fn test_cycle_terminates() {
        let mut nodes = vec![
            Node {
                children: vec![1],
                ..node()
            },
            Node {
                children: vec![0],
                ..node()
            },
        ];
        TransformPropagator::default().propagate(&mut nodes, &[0], &Mat4::identity());
    }

    #[test]
    fn test_stack_reused_between_passes() {
        let mut nodes = vec![
            Node {
                children: vec![1, 2],
                ..node()
            },
            node(),
            node(),
        ];
        let mut propagator = TransformPropagator::default();
        propagator.propagate(&mut nodes, &[0], &Mat4::identity());
        let capacity = propagator.stack.capacity();
        propagator.propagate(&mut nodes, &[0], &Mat4::identity().translated(1.0, 0.0, 0.0));
        assert_eq!(propagator.stack.capacity(), capacity);
        assert_relative_eq!(nodes[2].world_matrix()[(0, 3)], 1.0);
    }
}
