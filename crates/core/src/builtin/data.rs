//! Data-only kinds: joints, user data and image metadata
//!
//! None of these take part in rendering logic here; they carry values that
//! geometry procedurals and output drivers read.

use rdl2_macros::AttributeKeys;
use rdl2_sdk::{Mat4d, Mat4f, Rgb, Vec2f, Vec3f};

use super::{cached_keys, expect_interface};
use crate::attribute::{AttributeKey, AttributeValueType};
use crate::class::SceneClass;
use crate::error::{RdlError, RdlResult};
use crate::factory::SceneObjectKind;
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObjectBehavior};

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct JointKeys {
    #[attr(default = "Mat4d::identity()", blurrable, alias = "node xform")]
    pub node_xform: AttributeKey<Mat4d>,
}

impl JointKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

/// Skeleton joint, a transform node with no other data
#[derive(Debug, Default)]
pub struct Joint;

impl SceneObjectBehavior for Joint {}

impl SceneObjectKind for Joint {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = JointKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::NODE | SceneObjectInterface::JOINT)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(Joint)
    }
}

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct UserDataKeys {
    #[attr(
        default = "0",
        enumerable,
        enum_value(value = 0, description = "auto"),
        enum_value(value = 1, description = "constant"),
        enum_value(value = 2, description = "part"),
        enum_value(value = 3, description = "uniform"),
        enum_value(value = 4, description = "vertex"),
        enum_value(value = 5, description = "varying"),
        enum_value(value = 6, description = "face varying"),
        comment = "The rate of the data. Auto mode guesses the rate by comparing the number of values to component counts."
    )]
    pub rate: AttributeKey<i32>,

    #[attr(default = "\"\"", alias = "bool key", comment = "key name for bool type user data")]
    pub bool_key: AttributeKey<String>,
    #[attr(alias = "bool values")]
    pub bool_values: AttributeKey<Vec<bool>>,

    #[attr(default = "\"\"", alias = "int key", comment = "key name for integer type user data")]
    pub int_key: AttributeKey<String>,
    #[attr(alias = "int values")]
    pub int_values: AttributeKey<Vec<i32>>,

    #[attr(default = "\"\"", alias = "float key", comment = "key name for float type user data")]
    pub float_key: AttributeKey<String>,
    #[attr(alias = "float_values", alias = "float values", comment = "values for motion step 0")]
    pub float_values_0: AttributeKey<Vec<f32>>,
    #[attr(comment = "values for motion step 1")]
    pub float_values_1: AttributeKey<Vec<f32>>,

    #[attr(default = "\"\"", alias = "string key", comment = "key name for string type user data")]
    pub string_key: AttributeKey<String>,
    #[attr(alias = "string values")]
    pub string_values: AttributeKey<Vec<String>>,

    #[attr(default = "\"\"", alias = "color key", comment = "key name for color type user data")]
    pub color_key: AttributeKey<String>,
    #[attr(alias = "color_values", alias = "color values")]
    pub color_values_0: AttributeKey<Vec<Rgb>>,
    pub color_values_1: AttributeKey<Vec<Rgb>>,

    #[attr(default = "\"\"", alias = "vec2f key")]
    pub vec2f_key: AttributeKey<String>,
    #[attr(alias = "vec2f_values", alias = "vec2f values")]
    pub vec2f_values_0: AttributeKey<Vec<Vec2f>>,
    pub vec2f_values_1: AttributeKey<Vec<Vec2f>>,

    #[attr(default = "\"\"", alias = "vec3f key")]
    pub vec3f_key: AttributeKey<String>,
    #[attr(alias = "vec3f_values", alias = "vec3f values")]
    pub vec3f_values_0: AttributeKey<Vec<Vec3f>>,
    pub vec3f_values_1: AttributeKey<Vec<Vec3f>>,

    #[attr(default = "\"\"", alias = "mat4f key")]
    pub mat4f_key: AttributeKey<String>,
    #[attr(alias = "mat4f_values", alias = "mat4f values")]
    pub mat4f_values_0: AttributeKey<Vec<Mat4f>>,
    pub mat4f_values_1: AttributeKey<Vec<Mat4f>>,
}

impl UserDataKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

/// Named primitive attribute values attached to geometry
#[derive(Debug, Default)]
pub struct UserData;

impl SceneObjectBehavior for UserData {}

impl SceneObjectKind for UserData {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = UserDataKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::USERDATA)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(UserData)
    }
}

/// Typed access to a user data object
///
/// Each value type holds one key and up to two motion steps of values. A
/// type "has data" when both its key and its first step are non-empty.
pub struct UserDataView<'a> {
    object: &'a ObjectRef,
    keys: UserDataKeys,
}

impl<'a> UserDataView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::USERDATA)?;
        Ok(Self {
            keys: UserDataKeys::of(object.scene_class())?,
            object,
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.object
    }

    pub fn keys(&self) -> UserDataKeys {
        self.keys
    }

    pub fn rate(&self) -> i32 {
        self.object.get(self.keys.rate)
    }

    fn has<T>(&self, key: AttributeKey<String>, values: AttributeKey<Vec<T>>) -> bool
    where
        Vec<T>: AttributeValueType,
    {
        let has_key = !self.object.get_ref(key).is_empty();
        has_key && !self.object.get_ref(values).is_empty()
    }

    pub fn has_bool_data(&self) -> bool {
        self.has(self.keys.bool_key, self.keys.bool_values)
    }

    pub fn has_int_data(&self) -> bool {
        self.has(self.keys.int_key, self.keys.int_values)
    }

    pub fn has_float_data(&self) -> bool {
        self.has(self.keys.float_key, self.keys.float_values_0)
    }

    pub fn has_float_data_1(&self) -> bool {
        self.has(self.keys.float_key, self.keys.float_values_1)
    }

    pub fn has_string_data(&self) -> bool {
        self.has(self.keys.string_key, self.keys.string_values)
    }

    pub fn has_color_data(&self) -> bool {
        self.has(self.keys.color_key, self.keys.color_values_0)
    }

    pub fn has_vec2f_data(&self) -> bool {
        self.has(self.keys.vec2f_key, self.keys.vec2f_values_0)
    }

    pub fn has_vec3f_data(&self) -> bool {
        self.has(self.keys.vec3f_key, self.keys.vec3f_values_0)
    }

    pub fn has_mat4f_data(&self) -> bool {
        self.has(self.keys.mat4f_key, self.keys.mat4f_values_0)
    }

    pub fn set_bool_data(&self, key: &str, values: Vec<bool>) -> RdlResult<()> {
        self.object.set(self.keys.bool_key, key.to_string())?;
        self.object.set(self.keys.bool_values, values)
    }

    pub fn set_int_data(&self, key: &str, values: Vec<i32>) -> RdlResult<()> {
        self.object.set(self.keys.int_key, key.to_string())?;
        self.object.set(self.keys.int_values, values)
    }

    /// Set float data; `values_1` is the second motion step, if any
    pub fn set_float_data(&self, key: &str, values_0: Vec<f32>, values_1: Option<Vec<f32>>) -> RdlResult<()> {
        self.object.set(self.keys.float_key, key.to_string())?;
        self.object.set(self.keys.float_values_0, values_0)?;
        if let Some(values_1) = values_1 {
            self.object.set(self.keys.float_values_1, values_1)?;
        }
        Ok(())
    }

    pub fn set_string_data(&self, key: &str, values: Vec<String>) -> RdlResult<()> {
        self.object.set(self.keys.string_key, key.to_string())?;
        self.object.set(self.keys.string_values, values)
    }

    pub fn set_color_data(&self, key: &str, values_0: Vec<Rgb>, values_1: Option<Vec<Rgb>>) -> RdlResult<()> {
        self.object.set(self.keys.color_key, key.to_string())?;
        self.object.set(self.keys.color_values_0, values_0)?;
        if let Some(values_1) = values_1 {
            self.object.set(self.keys.color_values_1, values_1)?;
        }
        Ok(())
    }

    pub fn bool_data(&self) -> (String, Vec<bool>) {
        (self.object.get(self.keys.bool_key), self.object.get(self.keys.bool_values))
    }

    pub fn int_data(&self) -> (String, Vec<i32>) {
        (self.object.get(self.keys.int_key), self.object.get(self.keys.int_values))
    }

    pub fn float_data(&self) -> (String, Vec<f32>, Vec<f32>) {
        (
            self.object.get(self.keys.float_key),
            self.object.get(self.keys.float_values_0),
            self.object.get(self.keys.float_values_1),
        )
    }

    pub fn string_data(&self) -> (String, Vec<String>) {
        (self.object.get(self.keys.string_key), self.object.get(self.keys.string_values))
    }

    pub fn color_data(&self) -> (String, Vec<Rgb>, Vec<Rgb>) {
        (
            self.object.get(self.keys.color_key),
            self.object.get(self.keys.color_values_0),
            self.object.get(self.keys.color_values_1),
        )
    }
}

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct MetadataKeys {
    #[attr(comment = "Metadata name")]
    pub name: AttributeKey<Vec<String>>,

    #[attr(
        name = "type",
        comment = "Allowed types for exr headers: box2i, box2f, chromaticities, double, float, int, m33f, m44f, string, v2i, v2f, v3i, v3f"
    )]
    pub value_type: AttributeKey<Vec<String>>,

    #[attr(comment = "Metadata value")]
    pub value: AttributeKey<Vec<String>>,
}

impl MetadataKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

/// Image header entries written alongside render outputs
#[derive(Debug, Default)]
pub struct Metadata;

impl SceneObjectBehavior for Metadata {}

impl SceneObjectKind for Metadata {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = MetadataKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::METADATA)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(Metadata)
    }
}

/// One image header entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub name: String,
    pub value_type: String,
    pub value: String,
}

pub struct MetadataView<'a> {
    object: &'a ObjectRef,
    keys: MetadataKeys,
}

impl<'a> MetadataView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::METADATA)?;
        Ok(Self {
            keys: MetadataKeys::of(object.scene_class())?,
            object,
        })
    }

    /// Replace all entries; the three columns must have equal lengths
    pub fn set_attributes(&self, names: Vec<String>, types: Vec<String>, values: Vec<String>) -> RdlResult<()> {
        if names.len() != types.len() || names.len() != values.len() {
            return Err(RdlError::value_error(format!(
                "Metadata '{}' needs one type and one value per name ({} names, {} types, {} values).",
                self.object.name(),
                names.len(),
                types.len(),
                values.len()
            )));
        }
        self.object.set(self.keys.name, names)?;
        self.object.set(self.keys.value_type, types)?;
        self.object.set(self.keys.value, values)
    }

    /// Entries in declaration order; rows missing a type or value are skipped
    pub fn entries(&self) -> Vec<MetadataEntry> {
        let names = self.object.get(self.keys.name);
        let types = self.object.get(self.keys.value_type);
        let values = self.object.get(self.keys.value);
        names
            .into_iter()
            .zip(types)
            .zip(values)
            .map(|((name, value_type), value)| MetadataEntry { name, value_type, value })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::BuiltinFactory;
    use crate::testing::{declared_class, plain_object};

    #[test]
    fn test_joint_is_a_node() {
        let class = declared_class("Joint", BuiltinFactory::<Joint>::shared());
        let joint = plain_object(&class, "/joint");
        assert!(joint.is_a(SceneObjectInterface::NODE | SceneObjectInterface::JOINT));
        assert!(class.get_attribute("node xform").unwrap().is_blurrable());
    }

    #[test]
    fn test_user_data() {
        let class = declared_class("UserData", BuiltinFactory::<UserData>::shared());
        let data = plain_object(&class, "/data");
        let view = UserDataView::new(&data).unwrap();
        assert!(!view.has_float_data());
        assert_eq!(class.get_enum_value(view.keys().rate, "face varying").unwrap(), 6);

        data.begin_update();
        view.set_float_data("density", vec![0.5, 1.0], None).unwrap();
        view.set_int_data("", vec![1]).unwrap();
        data.end_update();

        assert!(view.has_float_data());
        assert!(!view.has_float_data_1());
        assert!(!view.has_int_data());
        assert_eq!(view.float_data().1, vec![0.5, 1.0]);
        assert_eq!(class.get_attribute("float values").unwrap().name(), "float_values_0");
    }

    #[test]
    fn test_metadata_entries() {
        let class = declared_class("Metadata", BuiltinFactory::<Metadata>::shared());
        let meta = plain_object(&class, "/meta");
        let view = MetadataView::new(&meta).unwrap();
        let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        meta.begin_update();
        assert!(matches!(
            view.set_attributes(strings(&["a", "b"]), strings(&["int"]), strings(&["1"])),
            Err(RdlError::Value(_))
        ));
        view.set_attributes(strings(&["artist"]), strings(&["string"]), strings(&["me"]))
            .unwrap();
        meta.end_update();

        assert_eq!(
            view.entries(),
            vec![MetadataEntry {
                name: "artist".to_string(),
                value_type: "string".to_string(),
                value: "me".to_string(),
            }]
        );
        assert!(class.has_attribute("type"));
    }
}
