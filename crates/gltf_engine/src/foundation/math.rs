//! Math utilities and types
//!
//! Provides the matrix and vector types used for scene transforms. Matrices
//! are `nalgebra` 4x4 matrices with column-major storage, which matches the
//! layout of the 16-float arrays found in scene documents and expected by the
//! GPU layer.
//!
//! Two flavours of operations live here:
//!
//! - **Typed** operations through [`Mat4Ext`] on fixed-size types. These
//!   cannot fail on dimensions.
//! - **Slice** operations (`product_into`, `dot`, `cross`, ...) over flat float
//!   data of runtime size. Mismatched sizes are programming errors and are
//!   reported as [`MathError::DimensionMismatch`].

use nalgebra::Unit;

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Errors raised by slice-based math operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    /// Operand sizes do not form a valid combination for the operation
    #[error("{operation}: incompatible operand sizes {lhs} and {rhs}")]
    DimensionMismatch {
        /// Name of the operation that was attempted
        operation: &'static str,
        /// Size of the left operand
        lhs: usize,
        /// Size of the right operand
        rhs: usize,
    },
}

/// Result type for slice-based math operations
pub type MathResult<T> = Result<T, MathError>;

/// Extension trait for Mat4 with construction and composition helpers
///
/// Composition helpers post-multiply, so `m.translated(..).scaled(..)` applies
/// the scale first when transforming a point.
pub trait Mat4Ext {
    /// Build a matrix from 16 column-major floats
    fn from_column_array(values: &[f32; 16]) -> Mat4;

    /// Flatten into 16 column-major floats
    fn to_column_array(&self) -> [f32; 16];

    /// OpenGL-style perspective projection (clip depth in [-1, 1])
    ///
    /// `fov_y` is the vertical field of view in radians.
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Perspective projection with the far plane at infinity
    fn infinite_perspective(fov_y: f32, aspect: f32, near: f32) -> Mat4;

    /// OpenGL-style orthographic projection
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Rotation matrix for the quaternion `(x, y, z, w)`
    ///
    /// The quaternion is used as given; a non-unit quaternion yields a
    /// non-orthogonal matrix.
    fn from_quaternion(x: f32, y: f32, z: f32, w: f32) -> Mat4;

    /// `self * translation(x, y, z)`
    fn translated(&self, x: f32, y: f32, z: f32) -> Mat4;

    /// `self * rotation(degrees about axis)`; a zero axis leaves the matrix unchanged
    fn rotated(&self, degrees: f32, x: f32, y: f32, z: f32) -> Mat4;

    /// `self * scaling(x, y, z)`
    fn scaled(&self, x: f32, y: f32, z: f32) -> Mat4;

    /// `self * scaling(s, s, s)`
    fn scaled_uniform(&self, s: f32) -> Mat4;

    /// Transform a point and divide by the resulting `w`
    fn project_point(&self, point: &Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn from_column_array(values: &[f32; 16]) -> Mat4 {
        Mat4::from_column_slice(values)
    }

    fn to_column_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.as_slice());
        out
    }

    #[rustfmt::skip]
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y * 0.5).tan();
        let range_inv = 1.0 / (near - far);

        Mat4::new(
            f / aspect, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, (far + near) * range_inv, 2.0 * far * near * range_inv,
            0.0, 0.0, -1.0, 0.0,
        )
    }

    #[rustfmt::skip]
    fn infinite_perspective(fov_y: f32, aspect: f32, near: f32) -> Mat4 {
        let f = 1.0 / (fov_y * 0.5).tan();

        Mat4::new(
            f / aspect, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, -1.0, -2.0 * near,
            0.0, 0.0, -1.0, 0.0,
        )
    }

    #[rustfmt::skip]
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;

        Mat4::new(
            2.0 / width, 0.0, 0.0, -(right + left) / width,
            0.0, 2.0 / height, 0.0, -(top + bottom) / height,
            0.0, 0.0, -2.0 / depth, -(far + near) / depth,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    #[rustfmt::skip]
    fn from_quaternion(x: f32, y: f32, z: f32, w: f32) -> Mat4 {
        Mat4::new(
            1.0 - 2.0 * y * y - 2.0 * z * z, 2.0 * x * y - 2.0 * z * w, 2.0 * x * z + 2.0 * y * w, 0.0,
            2.0 * x * y + 2.0 * z * w, 1.0 - 2.0 * x * x - 2.0 * z * z, 2.0 * y * z - 2.0 * x * w, 0.0,
            2.0 * x * z - 2.0 * y * w, 2.0 * y * z + 2.0 * x * w, 1.0 - 2.0 * x * x - 2.0 * y * y, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn translated(&self, x: f32, y: f32, z: f32) -> Mat4 {
        self * Mat4::new_translation(&Vec3::new(x, y, z))
    }

    fn rotated(&self, degrees: f32, x: f32, y: f32, z: f32) -> Mat4 {
        let axis = Vec3::new(x, y, z);
        if axis.norm_squared() == 0.0 {
            return *self;
        }
        self * Mat4::from_axis_angle(&Unit::new_normalize(axis), degrees.to_radians())
    }

    fn scaled(&self, x: f32, y: f32, z: f32) -> Mat4 {
        self * Mat4::new_nonuniform_scaling(&Vec3::new(x, y, z))
    }

    fn scaled_uniform(&self, s: f32) -> Mat4 {
        self.scaled(s, s, s)
    }

    fn project_point(&self, point: &Vec3) -> Vec3 {
        let h = self * Vec4::new(point.x, point.y, point.z, 1.0);
        Vec3::new(h.x / h.w, h.y / h.w, h.z / h.w)
    }
}

/// Multiply flat column-major data: `out = lhs * rhs`
///
/// Accepted shapes are 16x16 -> 16, 16x4 -> 4, and 16x3 -> 3. The last form
/// treats `rhs` as a point with `w = 1` and divides the result by its `w`.
pub fn product_into(out: &mut [f32], lhs: &[f32], rhs: &[f32]) -> MathResult<()> {
    let mismatch = MathError::DimensionMismatch {
        operation: "product",
        lhs: lhs.len(),
        rhs: rhs.len(),
    };
    if lhs.len() != 16 || out.len() != rhs.len() {
        return Err(mismatch);
    }
    let m = Mat4::from_column_slice(lhs);

    match rhs.len() {
        16 => {
            let r = m * Mat4::from_column_slice(rhs);
            out.copy_from_slice(r.as_slice());
        }
        4 => {
            let r = m * Vec4::from_column_slice(rhs);
            out.copy_from_slice(r.as_slice());
        }
        3 => {
            let r = m.project_point(&Vec3::from_column_slice(rhs));
            out.copy_from_slice(r.as_slice());
        }
        _ => return Err(mismatch),
    }
    Ok(())
}

fn check_same(operation: &'static str, a: &[f32], b: &[f32]) -> MathResult<()> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(MathError::DimensionMismatch {
            operation,
            lhs: a.len(),
            rhs: b.len(),
        })
    }
}

/// Dot product of two equally sized vectors
pub fn dot(a: &[f32], b: &[f32]) -> MathResult<f32> {
    check_same("dot", a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}

/// Cross product of two 3-vectors
pub fn cross(a: &[f32], b: &[f32]) -> MathResult<[f32; 3]> {
    if a.len() != 3 || b.len() != 3 {
        return Err(MathError::DimensionMismatch {
            operation: "cross",
            lhs: a.len(),
            rhs: b.len(),
        });
    }
    Ok([
        a[1] * b[2] - b[1] * a[2],
        a[2] * b[0] - b[2] * a[0],
        a[0] * b[1] - b[0] * a[1],
    ])
}

/// Component-wise `out = a + b`
pub fn add_into(out: &mut [f32], a: &[f32], b: &[f32]) -> MathResult<()> {
    check_same("add", a, b)?;
    check_same("add", out, a)?;
    for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
        *o = x + y;
    }
    Ok(())
}

/// Component-wise `out = a - b`
pub fn subtract_into(out: &mut [f32], a: &[f32], b: &[f32]) -> MathResult<()> {
    check_same("subtract", a, b)?;
    check_same("subtract", out, a)?;
    for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
        *o = x - y;
    }
    Ok(())
}

/// Widen a 3- or 4-component slice to a homogeneous vector (`w = 1` for points)
pub fn to_vec4(values: &[f32]) -> MathResult<Vec4> {
    match values.len() {
        3 => Ok(Vec4::new(values[0], values[1], values[2], 1.0)),
        4 => Ok(Vec4::from_column_slice(values)),
        n => Err(MathError::DimensionMismatch {
            operation: "to_vec4",
            lhs: n,
            rhs: 4,
        }),
    }
}

/// Widen a column-major 3x3 or 4x4 slice to a 4x4 matrix
pub fn to_mat4(values: &[f32]) -> MathResult<Mat4> {
    match values.len() {
        9 => Ok(Matrix3::from_column_slice(values).to_homogeneous()),
        16 => Ok(Mat4::from_column_slice(values)),
        n => Err(MathError::DimensionMismatch {
            operation: "to_mat4",
            lhs: n,
            rhs: 16,
        }),
    }
}
