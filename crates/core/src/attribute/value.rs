//! Type-erased attribute values
//!
//! Each attribute slot in an object's storage holds one [`AttributeValue`].
//! Typed access goes through [`AttributeValueType`], which maps a Rust type
//! to its variant; a key of type `T` can only ever reach the `T` variant.

use std::fmt;

use rdl2_sdk::{
    AttributeType, Mat4, Mat4d, Mat4f, Rgb, Rgba, Vec2, Vec2d, Vec2f, Vec3, Vec3d, Vec3f, Vec4, Vec4d,
    Vec4f,
};

use super::indexable::IndexableArray;
use crate::object::ObjectRef;

/// Nullable reference to another scene object
pub type SceneObjectRef = Option<ObjectRef>;
/// Ordered list of nullable object references
pub type SceneObjectVector = Vec<Option<ObjectRef>>;
/// Object list with a reverse lookup from object to positions
pub type SceneObjectIndexable = IndexableArray<ObjectRef>;

/// Rust types that can be stored in an attribute
pub trait AttributeValueType: Clone + PartialEq + Default + Send + Sync + 'static {
    const TYPE: AttributeType;

    fn from_value(value: &AttributeValue) -> Option<&Self>;
    fn from_value_mut(value: &mut AttributeValue) -> Option<&mut Self>;
    fn into_value(self) -> AttributeValue;
}

macro_rules! attribute_values {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        /// One stored attribute value
        #[derive(Debug, Clone, PartialEq)]
        pub enum AttributeValue {
            $($variant($ty)),*
        }

        impl AttributeValue {
            pub fn attribute_type(&self) -> AttributeType {
                match self {
                    $(Self::$variant(_) => AttributeType::$variant),*
                }
            }

            /// Default value for a type tag
            pub fn default_for(ty: AttributeType) -> Self {
                match ty {
                    $(AttributeType::$variant => Self::$variant(<$ty>::default())),*
                }
            }
        }

        impl fmt::Display for AttributeValue {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant(v) => v.show(f)),*
                }
            }
        }

        $(
            impl AttributeValueType for $ty {
                const TYPE: AttributeType = AttributeType::$variant;

                #[inline]
                fn from_value(value: &AttributeValue) -> Option<&Self> {
                    match value {
                        AttributeValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[inline]
                fn from_value_mut(value: &mut AttributeValue) -> Option<&mut Self> {
                    match value {
                        AttributeValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[inline]
                fn into_value(self) -> AttributeValue {
                    AttributeValue::$variant(self)
                }
            }
        )*
    };
}

attribute_values! {
    Bool => bool,
    Int => i32,
    Long => i64,
    Float => f32,
    Double => f64,
    String => String,
    Rgb => Rgb,
    Rgba => Rgba,
    Vec2f => Vec2f,
    Vec2d => Vec2d,
    Vec3f => Vec3f,
    Vec3d => Vec3d,
    Vec4f => Vec4f,
    Vec4d => Vec4d,
    Mat4f => Mat4f,
    Mat4d => Mat4d,
    SceneObject => SceneObjectRef,
    BoolVector => Vec<bool>,
    IntVector => Vec<i32>,
    LongVector => Vec<i64>,
    FloatVector => Vec<f32>,
    DoubleVector => Vec<f64>,
    StringVector => Vec<String>,
    RgbVector => Vec<Rgb>,
    RgbaVector => Vec<Rgba>,
    Vec2fVector => Vec<Vec2f>,
    Vec2dVector => Vec<Vec2d>,
    Vec3fVector => Vec<Vec3f>,
    Vec3dVector => Vec<Vec3d>,
    Vec4fVector => Vec<Vec4f>,
    Vec4dVector => Vec<Vec4d>,
    Mat4fVector => Vec<Mat4f>,
    Mat4dVector => Vec<Mat4d>,
    SceneObjectVector => SceneObjectVector,
    SceneObjectIndexable => SceneObjectIndexable,
}

impl AttributeValue {
    /// Visit every non-null object referenced by this value
    pub fn for_each_object(&self, mut f: impl FnMut(&ObjectRef)) {
        match self {
            Self::SceneObject(Some(obj)) => f(obj),
            Self::SceneObjectVector(objs) => objs.iter().flatten().for_each(f),
            Self::SceneObjectIndexable(objs) => objs.iter().for_each(f),
            _ => {}
        }
    }

    /// Drop every object reference held by this value
    pub(crate) fn clear_objects(&mut self) {
        match self {
            Self::SceneObject(obj) => *obj = None,
            Self::SceneObjectVector(objs) => objs.clear(),
            Self::SceneObjectIndexable(objs) => objs.clear(),
            _ => {}
        }
    }
}

/// Text rendering used by attribute listings
trait Show {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

macro_rules! show_display {
    ($($ty:ty),*) => {
        $(impl Show for $ty {
            fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self)
            }
        })*
    };
}

show_display!(bool, i32, i64, f32, f64);

impl Show for String {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Show for Rgb {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

impl Show for Rgba {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl<T: fmt::Display> Show for Vec2<T> {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl<T: fmt::Display> Show for Vec3<T> {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl<T: fmt::Display> Show for Vec4<T> {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, self.w)
    }
}

impl<T: fmt::Display> Show for Mat4<T> {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "({}, {}, {}, {})", row[0], row[1], row[2], row[3])?;
        }
        f.write_str(")")
    }
}

impl Show for ObjectRef {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Show for SceneObjectRef {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Some(obj) => obj.show(f),
            None => f.write_str("null"),
        }
    }
}

fn show_list<'a, T: Show + 'a>(
    items: impl IntoIterator<Item = &'a T>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.show(f)?;
    }
    f.write_str("]")
}

impl<T: Show> Show for Vec<T> {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        show_list(self.iter(), f)
    }
}

impl Show for SceneObjectIndexable {
    fn show(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        show_list(self.iter(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let mut value = 1.5f32.into_value();
        assert_eq!(value.attribute_type(), AttributeType::Float);
        assert_eq!(f32::from_value(&value), Some(&1.5));
        assert_eq!(f64::from_value(&value), None);

        *f32::from_value_mut(&mut value).unwrap() = 2.0;
        assert_eq!(value, AttributeValue::Float(2.0));
    }

    #[test]
    fn test_defaults_per_type() {
        assert_eq!(AttributeValue::default_for(AttributeType::Int), AttributeValue::Int(0));
        assert_eq!(
            AttributeValue::default_for(AttributeType::SceneObject),
            AttributeValue::SceneObject(None)
        );
        assert_eq!(
            AttributeValue::default_for(AttributeType::Mat4f),
            AttributeValue::Mat4f(Mat4f::default())
        );
        assert_eq!(<Vec<String>>::TYPE, AttributeType::StringVector);
        assert_eq!(SceneObjectIndexable::TYPE, AttributeType::SceneObjectIndexable);
    }

    #[test]
    fn test_display() {
        assert_eq!(AttributeValue::Bool(true).to_string(), "true");
        assert_eq!(AttributeValue::String("a b".into()).to_string(), "\"a b\"");
        assert_eq!(AttributeValue::Vec2f(Vec2f::new(1.0, 2.5)).to_string(), "(1, 2.5)");
        assert_eq!(AttributeValue::FloatVector(vec![-1.0, 0.0]).to_string(), "[-1, 0]");
        assert_eq!(AttributeValue::SceneObject(None).to_string(), "null");
        assert_eq!(AttributeValue::SceneObjectVector(vec![None]).to_string(), "[null]");
    }
}
