//! Scene classes
//!
//! A [`SceneClass`] is a runtime-declared type: an ordered list of attributes
//! filled in once by its factory's declare step, after which the class is
//! complete and its layout is frozen. Objects of the class get their storage
//! from [`SceneClass::create_storage`] and their behavior from the factory.

mod layout;
mod storage;

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::debug;

use crate::attribute::{Attribute, AttributeFlags, AttributeKey, AttributeValueType};
use crate::error::{RdlError, RdlResult};
use crate::factory::ObjectFactory;
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObject};

pub use layout::CACHE_LINE_SIZE;
pub(crate) use storage::AttributeStorage;

/// A dynamically declared scene object type
pub struct SceneClass {
    name: String,
    attributes: Vec<Attribute>,
    /// Names and aliases to attribute index
    lookup: HashMap<String, usize>,
    groups: Vec<String>,
    group_members: HashMap<String, Vec<usize>>,
    storage_size: usize,
    interface: SceneObjectInterface,
    complete: bool,
    data: Option<Box<dyn Any + Send + Sync>>,
    factory: Arc<dyn ObjectFactory>,
}

impl SceneClass {
    pub(crate) fn new(name: impl Into<String>, factory: Arc<dyn ObjectFactory>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            lookup: HashMap::new(),
            groups: Vec::new(),
            group_members: HashMap::new(),
            storage_size: 0,
            interface: SceneObjectInterface::GENERIC,
            complete: false,
            data: None,
            factory,
        }
    }

    /// Run the factory's declare step and freeze the class
    pub(crate) fn declare(&mut self) -> RdlResult<()> {
        let factory = Arc::clone(&self.factory);
        let declared = factory.declare(self)?;
        self.interface = declared | SceneObjectInterface::GENERIC;
        self.complete = true;
        debug!(
            class = %self.name,
            attributes = self.attributes.len(),
            storage_size = self.storage_size,
            "Declared scene class"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interfaces implemented by objects of this class
    pub fn declared_interface(&self) -> SceneObjectInterface {
        self.interface
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Size of the packed attribute layout in bytes
    pub fn storage_size(&self) -> usize {
        self.storage_size
    }

    /// File the class was loaded from, or empty for built-in classes
    pub fn source_path(&self) -> String {
        self.factory.source_path()
    }

    pub(crate) fn factory(&self) -> &Arc<dyn ObjectFactory> {
        &self.factory
    }

    // --- declaration ---

    /// Declare an attribute with the type's default value and no aliases
    pub fn declare_attribute<T: AttributeValueType>(
        &mut self,
        name: &str,
        flags: AttributeFlags,
    ) -> RdlResult<AttributeKey<T>> {
        self.declare_attribute_with(name, T::default(), flags, SceneObjectInterface::GENERIC, &[])
    }

    /// Declare an attribute
    ///
    /// `object_type` constrains the targets of object-valued attributes and
    /// bindings. Fails once the class is complete, when the name is not an
    /// identifier, or when the name or an alias is already taken.
    pub fn declare_attribute_with<T: AttributeValueType>(
        &mut self,
        name: &str,
        default: T,
        flags: AttributeFlags,
        object_type: SceneObjectInterface,
        aliases: &[&str],
    ) -> RdlResult<AttributeKey<T>> {
        if !is_valid_attribute_name(name) {
            return Err(RdlError::key_error(format!(
                "Attribute name '{}' does not conform to the format [a-zA-Z][a-zA-Z0-9_]*",
                name
            )));
        }

        if self.complete {
            return Err(RdlError::runtime_error(format!(
                "Cannot declare attributes on SceneClass '{}' after declarations are finished.",
                self.name
            )));
        }

        let mut names = Vec::with_capacity(aliases.len() + 1);
        names.push(name);
        names.extend_from_slice(aliases);
        for (i, candidate) in names.iter().enumerate() {
            if self.lookup.contains_key(*candidate) || names[..i].contains(candidate) {
                return Err(RdlError::key_error(format!(
                    "Duplicate declaration of Attribute '{}' in SceneClass '{}'.",
                    candidate, self.name
                )));
            }
        }

        let index = self.attributes.len();
        let mut size = std::mem::size_of::<T>();
        if flags.contains(AttributeFlags::BLURRABLE) {
            size *= 2;
        }
        let offset = layout::place(self.storage_size, size, std::mem::align_of::<T>());

        let attribute = Attribute::new(
            name,
            aliases,
            default.into_value(),
            index,
            offset,
            flags,
            object_type,
        )?;
        let key = AttributeKey::new(&attribute)?;

        self.storage_size = offset + size;
        for candidate in names {
            self.lookup.insert(candidate.to_string(), index);
        }
        self.attributes.push(attribute);
        Ok(key)
    }

    // --- lookup ---

    pub fn attributes(&self) -> impl ExactSizeIterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Look up an attribute by name or alias
    pub fn get_attribute(&self, name: &str) -> RdlResult<&Attribute> {
        self.lookup
            .get(name)
            .map(|&index| &self.attributes[index])
            .ok_or_else(|| {
                RdlError::key_error(format!(
                    "No Attribute named '{}' on SceneClass '{}'.",
                    name, self.name
                ))
            })
    }

    /// Attribute a key was made from
    ///
    /// The key must come from this class.
    pub fn attribute<T>(&self, key: AttributeKey<T>) -> &Attribute {
        &self.attributes[key.index()]
    }

    pub(crate) fn attribute_at(&self, index: usize) -> &Attribute {
        &self.attributes[index]
    }

    /// Typed key for an attribute name, checking the type
    pub fn get_attribute_key<T: AttributeValueType>(&self, name: &str) -> RdlResult<AttributeKey<T>> {
        AttributeKey::new(self.get_attribute(name)?)
    }

    // --- descriptive data ---

    pub fn set_metadata<T>(&mut self, key: AttributeKey<T>, meta_key: &str, value: &str) {
        self.attributes[key.index()].set_metadata(meta_key, value);
    }

    pub fn get_metadata<T>(&self, key: AttributeKey<T>, meta_key: &str) -> RdlResult<&str> {
        self.attributes[key.index()].metadata(meta_key)
    }

    pub fn set_enum_value(&mut self, key: AttributeKey<i32>, value: i32, description: &str) -> RdlResult<()> {
        self.attributes[key.index()].set_enum_value(value, description)
    }

    pub fn get_enum_value(&self, key: AttributeKey<i32>, description: &str) -> RdlResult<i32> {
        self.attributes[key.index()].enum_value(description)
    }

    pub fn get_enum_description(&self, key: AttributeKey<i32>, value: i32) -> RdlResult<&str> {
        self.attributes[key.index()].enum_description(value)
    }

    /// Add an attribute to a UI group, creating the group on first use
    pub fn set_group<T>(&mut self, group: &str, key: AttributeKey<T>) {
        if !self.group_members.contains_key(group) {
            self.groups.push(group.to_string());
        }
        self.group_members
            .entry(group.to_string())
            .or_default()
            .push(key.index());
    }

    /// Group names in first-use order
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Attributes in a group, empty for an unknown group
    pub fn attribute_group(&self, group: &str) -> Vec<&Attribute> {
        self.group_members
            .get(group)
            .map(|members| members.iter().map(|&i| &self.attributes[i]).collect())
            .unwrap_or_default()
    }

    /// Attach arbitrary per-class data, typically the class's key struct
    pub fn set_data<D: Any + Send + Sync>(&mut self, data: D) {
        self.data = Some(Box::new(data));
    }

    pub fn data<D: Any + Send + Sync>(&self) -> Option<&D> {
        self.data.as_ref().and_then(|d| d.downcast_ref::<D>())
    }

    /// One line per attribute, in declaration order
    pub fn show_all_attributes(&self) -> String {
        let mut out = String::new();
        for attr in &self.attributes {
            let _ = writeln!(out, "{}", attr.show());
        }
        out
    }

    // --- instances ---

    pub(crate) fn create_storage(&self) -> AttributeStorage {
        AttributeStorage::with_defaults(&self.attributes)
    }

    pub(crate) fn create_object(self: &Arc<Self>, name: &str) -> RdlResult<ObjectRef> {
        if !self.complete {
            return Err(RdlError::runtime_error(format!(
                "Cannot create SceneObject '{}' before SceneClass '{}' has finished declaring attributes.",
                name, self.name
            )));
        }
        let behavior = self.factory.create(self, name)?;
        Ok(SceneObject::new(Arc::clone(self), name, behavior))
    }

    /// Hand an object's behavior back to the factory that created it
    pub(crate) fn destroy_object(&self, object: &SceneObject) {
        object.clear_references();
        if let Some(behavior) = object.take_behavior() {
            self.factory.destroy(behavior);
        }
    }
}

impl std::fmt::Debug for SceneClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneClass")
            .field("name", &self.name)
            .field("interface", &self.interface)
            .field("attributes", &self.attributes.len())
            .field("complete", &self.complete)
            .finish()
    }
}

/// `[a-zA-Z][a-zA-Z0-9_]*`
fn is_valid_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}
