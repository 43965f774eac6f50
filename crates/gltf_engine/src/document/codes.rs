//! Wire enumerations
//!
//! Scene documents encode several enumerations as integer codes taken from
//! the OpenGL constant space. Decoding is a total function: an unrecognised
//! code maps to a designated fallback variant instead of failing the load, so
//! documents written by newer tools still open.
//!
//! | Enum | Fallback |
//! |---|---|
//! | [`ComponentType`] | `Invalid` |
//! | [`BufferTarget`] | `Invalid` (the view is not uploaded) |
//! | [`PrimitiveMode`] | `Triangles` |
//! | [`Filter`] | `Nearest` |
//! | [`Wrap`] | `Repeat` |

use serde::{Deserialize, Serialize};

/// Declares a wire enum with its code table and a fallback arm.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, fallback = $fallback:ident, fallback_code = $fallback_code:expr,
        { $($(#[$vmeta:meta])* $variant:ident = $code:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "i64", into = "i64")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Map a wire code to a variant, falling back for unknown codes
            pub fn from_code(code: i64) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    _ => Self::$fallback,
                }
            }

            /// Wire code of this variant
            pub fn code(self) -> i64 {
                match self {
                    $(Self::$variant => $code,)+
                    #[allow(unreachable_patterns)]
                    _ => $fallback_code,
                }
            }
        }

        impl From<i64> for $name {
            fn from(code: i64) -> Self {
                Self::from_code(code)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.code()
            }
        }
    };
}

wire_enum! {
    /// Scalar type of each accessor component
    ComponentType, fallback = Invalid, fallback_code = -1, {
        /// Signed 8-bit integer
        Byte = 5120,
        /// Unsigned 8-bit integer
        UnsignedByte = 5121,
        /// Signed 16-bit integer
        Short = 5122,
        /// Unsigned 16-bit integer
        UnsignedShort = 5123,
        /// Unsigned 32-bit integer
        UnsignedInt = 5125,
        /// 32-bit IEEE float
        Float = 5126,
        /// Unrecognised code
        Invalid = -1,
    }
}

impl ComponentType {
    /// Size of one component in bytes; zero for `Invalid`
    pub fn size(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::UnsignedInt | Self::Float => 4,
            Self::Invalid => 0,
        }
    }

    /// Whether the type may be used for index data
    pub fn is_index_type(self) -> bool {
        matches!(self, Self::UnsignedByte | Self::UnsignedShort | Self::UnsignedInt)
    }
}

wire_enum! {
    /// GPU binding target declared by a buffer view
    BufferTarget, fallback = Invalid, fallback_code = -1, {
        /// Vertex attribute data
        ArrayBuffer = 34962,
        /// Index data
        ElementArrayBuffer = 34963,
        /// Unrecognised code
        Invalid = -1,
    }
}

wire_enum! {
    /// Draw topology of a primitive
    PrimitiveMode, fallback = Triangles, fallback_code = 4, {
        /// Point list
        Points = 0,
        /// Line list
        Lines = 1,
        /// Closed line loop
        LineLoop = 2,
        /// Line strip
        LineStrip = 3,
        /// Triangle list
        Triangles = 4,
        /// Triangle strip
        TriangleStrip = 5,
        /// Triangle fan
        TriangleFan = 6,
    }
}

impl Default for PrimitiveMode {
    fn default() -> Self {
        Self::Triangles
    }
}

wire_enum! {
    /// Texture minification/magnification filter
    Filter, fallback = Nearest, fallback_code = 9728, {
        /// Nearest texel
        Nearest = 9728,
        /// Bilinear
        Linear = 9729,
        /// Nearest texel, nearest mip level
        NearestMipmapNearest = 9984,
        /// Bilinear, nearest mip level
        LinearMipmapNearest = 9985,
        /// Nearest texel, blended mip levels
        NearestMipmapLinear = 9986,
        /// Trilinear
        LinearMipmapLinear = 9987,
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::Nearest
    }
}

wire_enum! {
    /// Texture coordinate wrapping mode
    Wrap, fallback = Repeat, fallback_code = 10497, {
        /// Clamp to the edge texel
        ClampToEdge = 33071,
        /// Mirror on every repeat
        MirroredRepeat = 33648,
        /// Tile
        Repeat = 10497,
    }
}

impl Default for Wrap {
    fn default() -> Self {
        Self::Repeat
    }
}

/// Element shape of an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessorType {
    /// Single component
    Scalar,
    /// 2-component vector
    Vec2,
    /// 3-component vector
    Vec3,
    /// 4-component vector
    Vec4,
    /// 2x2 matrix
    Mat2,
    /// 3x3 matrix
    Mat3,
    /// 4x4 matrix
    Mat4,
}

impl AccessorType {
    /// Number of components per element
    pub fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }
}

/// Material transparency classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlphaMode {
    /// Alpha is ignored
    #[default]
    Opaque,
    /// Alpha is compared against the material's cutoff
    Mask,
    /// Alpha blending
    Blend,
}

/// Projection type of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    /// Orthographic projection
    Orthographic,
    /// Perspective projection
    Perspective,
}

/// Keyframe interpolation of an animation sampler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interpolation {
    /// Linear interpolation
    #[default]
    Linear,
    /// Hold the previous keyframe
    Step,
    /// Cubic spline with tangents
    CubicSpline,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(ComponentType::from_code(5126), ComponentType::Float);
        assert_eq!(ComponentType::from_code(5123), ComponentType::UnsignedShort);
        assert_eq!(PrimitiveMode::from_code(4), PrimitiveMode::Triangles);
        assert_eq!(PrimitiveMode::from_code(0), PrimitiveMode::Points);
        assert_eq!(BufferTarget::from_code(34962), BufferTarget::ArrayBuffer);
        assert_eq!(Filter::from_code(9987), Filter::LinearMipmapLinear);
        assert_eq!(Wrap::from_code(33071), Wrap::ClampToEdge);
    }

    #[test]
    fn test_unknown_codes_fall_back() {
        assert_eq!(ComponentType::from_code(5124), ComponentType::Invalid);
        assert_eq!(BufferTarget::from_code(0), BufferTarget::Invalid);
        assert_eq!(PrimitiveMode::from_code(42), PrimitiveMode::Triangles);
        assert_eq!(Filter::from_code(-7), Filter::Nearest);
        assert_eq!(Wrap::from_code(1), Wrap::Repeat);
    }

    #[test]
    fn test_codes_round_trip() {
        for code in [5120, 5121, 5122, 5123, 5125, 5126] {
            assert_eq!(ComponentType::from_code(code).code(), code);
        }
        assert_eq!(ComponentType::Invalid.code(), -1);
        assert_eq!(Wrap::MirroredRepeat.code(), 33648);
    }

    #[test]
    fn test_serde_uses_codes() {
        let mode: PrimitiveMode = serde_json::from_str("1").unwrap();
        assert_eq!(mode, PrimitiveMode::Lines);
        assert_eq!(serde_json::to_string(&ComponentType::Float).unwrap(), "5126");

        let unknown: ComponentType = serde_json::from_str("9999").unwrap();
        assert_eq!(unknown, ComponentType::Invalid);
    }

    #[test]
    fn test_string_enums() {
        let ty: AccessorType = serde_json::from_str("\"VEC3\"").unwrap();
        assert_eq!(ty.components(), 3);
        assert_eq!(AccessorType::Mat3.components(), 9);

        let mode: AlphaMode = serde_json::from_str("\"BLEND\"").unwrap();
        assert_eq!(mode, AlphaMode::Blend);
        assert!(serde_json::from_str::<AlphaMode>("\"GLOW\"").is_err());

        let interp: Interpolation = serde_json::from_str("\"CUBICSPLINE\"").unwrap();
        assert_eq!(interp, Interpolation::CubicSpline);
    }
}
