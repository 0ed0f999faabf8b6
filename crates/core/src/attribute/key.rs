//! Typed attribute keys

use std::fmt;
use std::marker::PhantomData;

use super::value::AttributeValueType;
use super::{Attribute, AttributeFlags};
use crate::error::{RdlError, RdlResult};
use crate::interface::SceneObjectInterface;

const INVALID: u32 = u32::MAX;

/// Typed handle for fast access to one attribute of a scene class
///
/// A key is only meaningful for objects of the class that declared it.
/// Comparing keys from different classes compares their indices and is not
/// checked.
pub struct AttributeKey<T> {
    index: u32,
    offset: u32,
    flags: AttributeFlags,
    object_type: SceneObjectInterface,
    _marker: PhantomData<fn() -> T>,
}

impl<T: AttributeValueType> AttributeKey<T> {
    /// Build a key for `attribute`, failing if it is not of type `T`
    pub fn new(attribute: &Attribute) -> RdlResult<Self> {
        if attribute.attribute_type() != T::TYPE {
            return Err(RdlError::type_error(format!(
                "Type mismatch between AttributeKey of type '{}' and Attribute '{}' of type '{}'.",
                T::TYPE,
                attribute.name(),
                attribute.attribute_type()
            )));
        }
        Ok(Self {
            index: attribute.index() as u32,
            offset: attribute.offset() as u32,
            flags: attribute.flags(),
            object_type: attribute.object_type(),
            _marker: PhantomData,
        })
    }
}

impl<T> AttributeKey<T> {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.index != INVALID && self.offset != INVALID
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    #[inline]
    pub fn flags(&self) -> AttributeFlags {
        self.flags
    }

    #[inline]
    pub fn object_type(&self) -> SceneObjectInterface {
        self.object_type
    }

    #[inline]
    pub fn is_bindable(&self) -> bool {
        self.flags.contains(AttributeFlags::BINDABLE)
    }

    #[inline]
    pub fn is_blurrable(&self) -> bool {
        self.flags.contains(AttributeFlags::BLURRABLE)
    }

    #[inline]
    pub fn is_enumerable(&self) -> bool {
        self.flags.contains(AttributeFlags::ENUMERABLE)
    }

    #[inline]
    pub fn is_filename(&self) -> bool {
        self.flags.contains(AttributeFlags::FILENAME)
    }
}

impl<T> Default for AttributeKey<T> {
    fn default() -> Self {
        Self {
            index: INVALID,
            offset: INVALID,
            flags: AttributeFlags::empty(),
            object_type: SceneObjectInterface::GENERIC,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for AttributeKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttributeKey<T> {}

// Invalid keys never compare equal, not even to themselves.
impl<T> PartialEq for AttributeKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.is_valid() && other.is_valid() && self.index == other.index
    }
}

impl<T> fmt::Debug for AttributeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeKey")
            .field("index", &self.index)
            .field("offset", &self.offset)
            .field("flags", &self.flags)
            .field("object_type", &self.object_type)
            .finish()
    }
}
