//! Axis-aligned bounding box for spatial queries

use super::math::{Mat4, Mat4Ext, Vec3};

/// Axis-aligned bounding box that starts out empty and grows by expansion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min: Vec3,
    max: Vec3,
    empty: bool,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    /// Create an empty bounding box
    pub fn empty() -> Self {
        Self {
            min: Vec3::zeros(),
            max: Vec3::zeros(),
            empty: true,
        }
    }

    /// Create a bounding box from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        let mut bounds = Self::empty();
        bounds.expand_point(&min);
        bounds.expand_point(&max);
        bounds
    }

    /// Whether no point has been added yet
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Minimum corner
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Get the center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the box
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        !self.empty
            && point.x >= self.min.x && point.x <= self.max.x
            && point.y >= self.min.y && point.y <= self.max.y
            && point.z >= self.min.z && point.z <= self.max.z
    }

    /// Grow the box to include a point
    pub fn expand_point(&mut self, point: &Vec3) {
        if self.empty {
            self.min = *point;
            self.max = *point;
            self.empty = false;
        } else {
            self.min = self.min.inf(point);
            self.max = self.max.sup(point);
        }
    }

    /// Grow the box to include another box; empty boxes are ignored
    pub fn expand_box(&mut self, other: &BoundingBox) {
        if !other.empty {
            self.expand_point(&other.min);
            self.expand_point(&other.max);
        }
    }

    /// Grow every face outward by `margin`
    ///
    /// An empty box becomes a cube of half-size `margin` around the origin.
    pub fn expand_margin(&mut self, margin: f32) {
        let delta = Vec3::repeat(margin);
        self.min -= delta;
        self.max += delta;
        self.empty = false;
    }

    /// Bounding box of this box's 8 corners after transformation by `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> BoundingBox {
        let mut result = BoundingBox::empty();
        if self.empty {
            return result;
        }

        for corner in 0..8 {
            let point = Vec3::new(
                if corner & 1 == 0 { self.min.x } else { self.max.x },
                if corner & 2 == 0 { self.min.y } else { self.max.y },
                if corner & 4 == 0 { self.min.z } else { self.max.z },
            );
            result.expand_point(&matrix.project_point(&point));
        }
        result
    }
}
