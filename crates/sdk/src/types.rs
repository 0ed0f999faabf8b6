//! Attribute type tags
//!
//! Every attribute declared on a scene class carries one of these tags. The
//! set is closed: storage, comparison, and serialization all switch on it.

/// Number of motion blur samples stored for a blurrable attribute.
pub const NUM_TIMESTEPS: usize = 2;

/// Motion blur sample selector
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timestep {
    /// Shutter open sample (also the only sample of a non-blurrable attribute)
    #[default]
    Begin = 0,
    /// Shutter close sample
    End = 1,
}

impl Timestep {
    pub const ALL: [Timestep; NUM_TIMESTEPS] = [Timestep::Begin, Timestep::End];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Bool,
    Int,
    Long,
    Float,
    Double,
    String,
    Rgb,
    Rgba,
    Vec2f,
    Vec2d,
    Vec3f,
    Vec3d,
    Vec4f,
    Vec4d,
    Mat4f,
    Mat4d,
    SceneObject,
    BoolVector,
    IntVector,
    LongVector,
    FloatVector,
    DoubleVector,
    StringVector,
    RgbVector,
    RgbaVector,
    Vec2fVector,
    Vec2dVector,
    Vec3fVector,
    Vec3dVector,
    Vec4fVector,
    Vec4dVector,
    Mat4fVector,
    Mat4dVector,
    SceneObjectVector,
    SceneObjectIndexable,
}

impl AttributeType {
    /// Display name, as shown by inspection tools and error messages
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::Rgb => "Rgb",
            Self::Rgba => "Rgba",
            Self::Vec2f => "Vec2f",
            Self::Vec2d => "Vec2d",
            Self::Vec3f => "Vec3f",
            Self::Vec3d => "Vec3d",
            Self::Vec4f => "Vec4f",
            Self::Vec4d => "Vec4d",
            Self::Mat4f => "Mat4f",
            Self::Mat4d => "Mat4d",
            Self::SceneObject => "SceneObject*",
            Self::BoolVector => "BoolVector",
            Self::IntVector => "IntVector",
            Self::LongVector => "LongVector",
            Self::FloatVector => "FloatVector",
            Self::DoubleVector => "DoubleVector",
            Self::StringVector => "StringVector",
            Self::RgbVector => "RgbVector",
            Self::RgbaVector => "RgbaVector",
            Self::Vec2fVector => "Vec2fVector",
            Self::Vec2dVector => "Vec2dVector",
            Self::Vec3fVector => "Vec3fVector",
            Self::Vec3dVector => "Vec3dVector",
            Self::Vec4fVector => "Vec4fVector",
            Self::Vec4dVector => "Vec4dVector",
            Self::Mat4fVector => "Mat4fVector",
            Self::Mat4dVector => "Mat4dVector",
            Self::SceneObjectVector => "SceneObjectVector",
            Self::SceneObjectIndexable => "SceneObjectIndexable",
        }
    }

    /// Whether attributes of this type may be declared blurrable
    pub const fn can_blur(self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::Rgb
                | Self::Rgba
                | Self::Vec2f
                | Self::Vec2d
                | Self::Vec3f
                | Self::Vec3d
                | Self::Vec4f
                | Self::Vec4d
                | Self::Mat4f
                | Self::Mat4d
        )
    }

    /// Whether values of this type reference other scene objects
    pub const fn is_object_type(self) -> bool {
        matches!(
            self,
            Self::SceneObject | Self::SceneObjectVector | Self::SceneObjectIndexable
        )
    }

    /// Whether this is one of the vector (sequence) types
    pub const fn is_vector(self) -> bool {
        matches!(
            self,
            Self::BoolVector
                | Self::IntVector
                | Self::LongVector
                | Self::FloatVector
                | Self::DoubleVector
                | Self::StringVector
                | Self::RgbVector
                | Self::RgbaVector
                | Self::Vec2fVector
                | Self::Vec2dVector
                | Self::Vec3fVector
                | Self::Vec3dVector
                | Self::Vec4fVector
                | Self::Vec4dVector
                | Self::Mat4fVector
                | Self::Mat4dVector
                | Self::SceneObjectVector
                | Self::SceneObjectIndexable
        )
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(AttributeType::Float.name(), "Float");
        assert_eq!(AttributeType::SceneObject.to_string(), "SceneObject*");
        assert_eq!(AttributeType::SceneObjectIndexable.name(), "SceneObjectIndexable");
    }

    #[test]
    fn test_blurrable_types() {
        assert!(AttributeType::Mat4d.can_blur());
        assert!(AttributeType::Int.can_blur());
        assert!(!AttributeType::Bool.can_blur());
        assert!(!AttributeType::String.can_blur());
        assert!(!AttributeType::FloatVector.can_blur());
    }

    #[test]
    fn test_object_types() {
        assert!(AttributeType::SceneObjectVector.is_object_type());
        assert!(AttributeType::SceneObjectVector.is_vector());
        assert!(!AttributeType::StringVector.is_object_type());
    }

    #[test]
    fn test_timestep_index() {
        assert_eq!(Timestep::Begin.index(), 0);
        assert_eq!(Timestep::End.index(), 1);
        assert_eq!(Timestep::default(), Timestep::Begin);
    }
}
