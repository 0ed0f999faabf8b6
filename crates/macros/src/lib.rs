//! RDL2 Proc Macros
//!
//! This crate provides proc macros for the RDL2 scene object framework:
//!
//! - `#[derive(AttributeKeys)]` - Declare a scene class's attributes from a struct of keys
//!
//! # Example
//!
//! ```ignore
//! use rdl2_core::{AttributeKey, AttributeKeys, SceneObjectRef};
//!
//! #[derive(AttributeKeys, Clone, Copy)]
//! pub struct CameraKeys {
//!     #[attr(default = "1.0", comment = "Near clipping plane")]
//!     pub near: AttributeKey<f32>,
//!
//!     #[attr(default = "-0.25", alias = "mb shutter open", group = "Motion Blur")]
//!     pub mb_shutter_open: AttributeKey<f32>,
//!
//!     #[attr(interface = "MATERIAL")]
//!     pub medium_material: AttributeKey<SceneObjectRef>,
//! }
//!
//! // In a class declare function:
//! let keys = CameraKeys::declare(class)?;
//! // Later, from any instance's class:
//! let keys = CameraKeys::lookup(object.scene_class())?;
//! ```
//!
//! # Field Attributes
//!
//! - `name = "..."` - Attribute name (defaults to the field name)
//! - `default = "<expr>"` - Default value expression; string literals become `String`
//! - `interface = "A | B"` - Allowed interfaces for object-valued attributes
//! - `bindable`, `blurrable`, `enumerable`, `filename`, `skip_geom_reload` - Attribute flags
//! - `alias = "..."` - Extra lookup name (repeatable)
//! - `group = "..."` - UI group
//! - `comment = "..."` - Shorthand for `metadata(key = "comment", value = "...")`
//! - `metadata(key = "...", value = "...")` - Free-form annotation (repeatable)
//! - `enum_value(value = 0, description = "...")` - Enumeration entry (repeatable)

mod attribute_keys;
mod parse;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for attribute key structs
///
/// Every field must be an `AttributeKey<T>`. The macro generates:
///
/// - `fn declare(class: &mut SceneClass) -> RdlResult<Self>` which declares
///   each attribute in field order, then applies its metadata, enum values,
///   and group
/// - `fn lookup(class: &SceneClass) -> RdlResult<Self>` which resolves each
///   key by name, failing on a missing attribute or a type mismatch
#[proc_macro_derive(AttributeKeys, attributes(attr))]
pub fn derive_attribute_keys(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    attribute_keys::derive_attribute_keys(input).into()
}
