//! Attribute declarations
//!
//! An [`Attribute`] is the per-class description of one named, typed field:
//! its storage slot, flags, default, object-type constraint, and the
//! free-form metadata and enum tables used by tools. Attributes are created
//! by [`SceneClass::declare_attribute_with`](crate::SceneClass::declare_attribute_with)
//! and never change layout afterwards.

mod indexable;
mod key;
mod value;

use std::collections::BTreeMap;
use std::fmt::Write as _;

use bitflags::bitflags;
use rdl2_sdk::AttributeType;

use crate::error::{RdlError, RdlResult};
use crate::interface::SceneObjectInterface;

pub use indexable::IndexableArray;
pub use key::AttributeKey;
pub use value::{AttributeValue, AttributeValueType, SceneObjectIndexable, SceneObjectRef, SceneObjectVector};

bitflags! {
    /// Behavior flags of a declared attribute
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttributeFlags: u32 {
        /// May carry a binding to another object in addition to its value
        const BINDABLE = 1 << 0;
        /// Stores a begin and an end sample for motion blur
        const BLURRABLE = 1 << 1;
        /// Int attribute restricted to a table of named values
        const ENUMERABLE = 1 << 2;
        /// String holds a file path
        const FILENAME = 1 << 3;
        /// Changing it does not force geometry to be reloaded
        const CAN_SKIP_GEOM_RELOAD = 1 << 4;
    }
}

/// Metadata key used for the attribute's human readable description
pub const COMMENT_KEY: &str = "comment";

/// Description of one declared attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    aliases: Vec<String>,
    attribute_type: AttributeType,
    index: usize,
    offset: usize,
    flags: AttributeFlags,
    object_type: SceneObjectInterface,
    default: AttributeValue,
    metadata: BTreeMap<String, String>,
    enum_values: BTreeMap<i32, String>,
}

impl Attribute {
    pub(crate) fn new(
        name: &str,
        aliases: &[&str],
        default: AttributeValue,
        index: usize,
        offset: usize,
        flags: AttributeFlags,
        object_type: SceneObjectInterface,
    ) -> RdlResult<Self> {
        let attribute = Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            attribute_type: default.attribute_type(),
            index,
            offset,
            flags,
            object_type,
            default,
            metadata: BTreeMap::new(),
            enum_values: BTreeMap::new(),
        };
        attribute.check_flags()?;
        Ok(attribute)
    }

    fn check_flags(&self) -> RdlResult<()> {
        let ty = self.attribute_type;
        if self.is_blurrable() && !ty.can_blur() {
            return Err(RdlError::type_error(format!(
                "Attribute '{}' of type '{}' cannot be blurred.",
                self.name, ty
            )));
        }
        if self.is_enumerable() && ty != AttributeType::Int {
            return Err(RdlError::type_error(format!(
                "Attribute '{}' of type '{}' cannot be enumerated.",
                self.name, ty
            )));
        }
        if self.is_filename() && !matches!(ty, AttributeType::String | AttributeType::StringVector) {
            return Err(RdlError::type_error(format!(
                "Attribute '{}' of type '{}' cannot be a filename.",
                self.name, ty
            )));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of this attribute in the class layout
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn flags(&self) -> AttributeFlags {
        self.flags
    }

    /// Interfaces an object must implement to be stored in or bound to this attribute
    pub fn object_type(&self) -> SceneObjectInterface {
        self.object_type
    }

    pub fn is_bindable(&self) -> bool {
        self.flags.contains(AttributeFlags::BINDABLE)
    }

    pub fn is_blurrable(&self) -> bool {
        self.flags.contains(AttributeFlags::BLURRABLE)
    }

    pub fn is_enumerable(&self) -> bool {
        self.flags.contains(AttributeFlags::ENUMERABLE)
    }

    pub fn is_filename(&self) -> bool {
        self.flags.contains(AttributeFlags::FILENAME)
    }

    pub fn update_requires_geom_reload(&self) -> bool {
        !self.flags.contains(AttributeFlags::CAN_SKIP_GEOM_RELOAD)
    }

    pub fn default_attribute_value(&self) -> &AttributeValue {
        &self.default
    }

    /// Default value as `T`
    pub fn default_value<T: AttributeValueType>(&self) -> RdlResult<&T> {
        T::from_value(&self.default).ok_or_else(|| {
            RdlError::type_error(format!(
                "Attribute::getDefaultValue() invoked with incorrect type '{}'. Attribute '{}' is of type '{}'.",
                T::TYPE,
                self.name,
                self.attribute_type
            ))
        })
    }

    // --- metadata ---

    pub fn metadata(&self, key: &str) -> RdlResult<&str> {
        self.metadata.get(key).map(String::as_str).ok_or_else(|| {
            RdlError::key_error(format!(
                "Attribute '{}' has no metadata with key '{}'.",
                self.name, key
            ))
        })
    }

    pub fn metadata_exists(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    pub fn metadata_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn metadata_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Shorthand for the `comment` metadata entry
    pub fn comment(&self) -> Option<&str> {
        self.metadata.get(COMMENT_KEY).map(String::as_str)
    }

    pub(crate) fn set_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    // --- enumerations ---

    fn require_enumerable(&self) -> RdlResult<()> {
        if self.is_enumerable() && self.attribute_type == AttributeType::Int {
            Ok(())
        } else {
            Err(RdlError::type_error(format!(
                "Attribute '{}' is of type '{}', not enumerable Int.",
                self.name, self.attribute_type
            )))
        }
    }

    pub fn enum_description(&self, value: i32) -> RdlResult<&str> {
        self.require_enumerable()?;
        self.enum_values.get(&value).map(String::as_str).ok_or_else(|| {
            RdlError::key_error(format!(
                "Attribute '{}' has no enum value '{}'.",
                self.name, value
            ))
        })
    }

    pub fn enum_value(&self, description: &str) -> RdlResult<i32> {
        self.require_enumerable()?;
        self.enum_values
            .iter()
            .find(|(_, d)| d.as_str() == description)
            .map(|(v, _)| *v)
            .ok_or_else(|| {
                RdlError::value_error(format!(
                    "Enum description '{}' not found for attribute '{}'",
                    description, self.name
                ))
            })
    }

    pub fn is_valid_enum_value(&self, value: i32) -> RdlResult<bool> {
        self.require_enumerable()?;
        Ok(self.enum_values.contains_key(&value))
    }

    pub fn enum_iter(&self) -> impl Iterator<Item = (i32, &str)> {
        self.enum_values.iter().map(|(v, d)| (*v, d.as_str()))
    }

    pub(crate) fn set_enum_value(&mut self, value: i32, description: &str) -> RdlResult<()> {
        self.require_enumerable()?;
        self.enum_values.insert(value, description.to_string());
        Ok(())
    }

    /// One line summary: type, name, default and flags
    pub fn show(&self) -> String {
        let mut out = format!("{} {} = {}", self.attribute_type, self.name, self.default);

        let flags: Vec<&str> = [
            (AttributeFlags::BINDABLE, "bindable"),
            (AttributeFlags::BLURRABLE, "blurrable"),
            (AttributeFlags::ENUMERABLE, "enumerable"),
            (AttributeFlags::FILENAME, "filename"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.flags.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        if !flags.is_empty() {
            let _ = write!(out, " [{}]", flags.join(", "));
        }
        if self.attribute_type.is_object_type() {
            let _ = write!(out, " <{}>", self.object_type);
        }
        if !self.aliases.is_empty() {
            let _ = write!(out, " (aliases: {})", self.aliases.join(", "));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(default: AttributeValue, flags: AttributeFlags) -> RdlResult<Attribute> {
        Attribute::new("test", &[], default, 0, 0, flags, SceneObjectInterface::GENERIC)
    }

    #[test]
    fn test_flag_sanity_checks() {
        let err = attr(AttributeValue::Bool(false), AttributeFlags::BLURRABLE).unwrap_err();
        assert_eq!(err.to_string(), "Attribute 'test' of type 'Bool' cannot be blurred.");

        let err = attr(AttributeValue::Float(0.0), AttributeFlags::ENUMERABLE).unwrap_err();
        assert_eq!(err.to_string(), "Attribute 'test' of type 'Float' cannot be enumerated.");

        let err = attr(AttributeValue::Int(0), AttributeFlags::FILENAME).unwrap_err();
        assert_eq!(err.to_string(), "Attribute 'test' of type 'Int' cannot be a filename.");

        assert!(attr(AttributeValue::Mat4d(Default::default()), AttributeFlags::BLURRABLE).is_ok());
        assert!(attr(AttributeValue::StringVector(vec![]), AttributeFlags::FILENAME).is_ok());
    }

    #[test]
    fn test_default_value_type_checked() {
        let a = attr(AttributeValue::Int(7), AttributeFlags::empty()).unwrap();
        assert_eq!(a.default_value::<i32>().unwrap(), &7);
        let err = a.default_value::<f32>().unwrap_err();
        assert!(matches!(err, RdlError::Type(_)));
        assert!(err.to_string().contains("incorrect type 'Float'"));
    }

    #[test]
    fn test_metadata() {
        let mut a = attr(AttributeValue::Float(1.0), AttributeFlags::empty()).unwrap();
        assert!(a.metadata_empty());
        a.set_metadata("comment", "near plane");
        a.set_metadata("label", "Near");
        assert_eq!(a.comment(), Some("near plane"));
        assert_eq!(a.metadata("label").unwrap(), "Near");
        assert!(a.metadata_exists("label"));
        assert!(matches!(a.metadata("missing"), Err(RdlError::Key(_))));
        assert_eq!(a.metadata_iter().count(), 2);
    }

    #[test]
    fn test_enum_values() {
        let mut a = attr(AttributeValue::Int(0), AttributeFlags::ENUMERABLE).unwrap();
        a.set_enum_value(0, "off").unwrap();
        a.set_enum_value(1, "on").unwrap();

        assert_eq!(a.enum_description(1).unwrap(), "on");
        assert_eq!(a.enum_value("off").unwrap(), 0);
        assert!(a.is_valid_enum_value(1).unwrap());
        assert!(!a.is_valid_enum_value(5).unwrap());
        assert!(matches!(a.enum_description(5), Err(RdlError::Key(_))));
        assert!(matches!(a.enum_value("maybe"), Err(RdlError::Value(_))));
        assert_eq!(a.enum_iter().collect::<Vec<_>>(), vec![(0, "off"), (1, "on")]);
    }

    #[test]
    fn test_enum_requires_enumerable_int() {
        let mut a = attr(AttributeValue::Int(0), AttributeFlags::empty()).unwrap();
        let err = a.set_enum_value(0, "off").unwrap_err();
        assert_eq!(err.to_string(), "Attribute 'test' is of type 'Int', not enumerable Int.");
    }

    #[test]
    fn test_geom_reload_flag() {
        let a = attr(AttributeValue::Float(0.0), AttributeFlags::empty()).unwrap();
        assert!(a.update_requires_geom_reload());
        let b = attr(AttributeValue::Float(0.0), AttributeFlags::CAN_SKIP_GEOM_RELOAD).unwrap();
        assert!(!b.update_requires_geom_reload());
    }

    #[test]
    fn test_show() {
        let a = Attribute::new(
            "mb_shutter_open",
            &["mb shutter open"],
            AttributeValue::Float(-0.25),
            0,
            0,
            AttributeFlags::BLURRABLE,
            SceneObjectInterface::GENERIC,
        )
        .unwrap();
        assert_eq!(
            a.show(),
            "Float mb_shutter_open = -0.25 [blurrable] (aliases: mb shutter open)"
        );
    }
}
