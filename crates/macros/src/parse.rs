//! Attribute parsing for the AttributeKeys derive macro

use darling::{FromDeriveInput, FromField, FromMeta};
use syn::{DeriveInput, Ident, Type};

/// Parsed struct carrying `#[attr(...)]` fields
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(attr), supports(struct_named))]
pub struct AttributeKeysArgs {
    /// Struct identifier
    pub ident: Ident,

    /// Struct fields
    pub data: darling::ast::Data<(), AttributeFieldArgs>,
}

/// One `enum_value(value = 1, description = "...")` entry
#[derive(Debug, FromMeta)]
pub struct EnumValueArgs {
    pub value: i32,
    pub description: String,
}

/// One `metadata(key = "label", value = "...")` entry
#[derive(Debug, FromMeta)]
pub struct MetadataArgs {
    pub key: String,
    pub value: String,
}

/// Parsed `#[attr(...)]` attributes on a field
#[derive(Debug, FromField)]
#[darling(attributes(attr))]
pub struct AttributeFieldArgs {
    /// Field identifier
    pub ident: Option<Ident>,

    /// Field type, expected to be `AttributeKey<T>`
    pub ty: Type,

    /// Attribute name; defaults to the field name
    pub name: Option<String>,

    /// Default value as a Rust expression (e.g. `"1.0"` or `"vec![-1.0, 0.0]"`)
    pub default: Option<String>,

    /// Allowed interfaces for object-valued attributes (e.g. `"CAMERA | LIGHT"`)
    pub interface: Option<String>,

    #[darling(default)]
    pub bindable: bool,

    #[darling(default)]
    pub blurrable: bool,

    #[darling(default)]
    pub enumerable: bool,

    #[darling(default)]
    pub filename: bool,

    /// Changes to this attribute never force a geometry reload
    #[darling(default)]
    pub skip_geom_reload: bool,

    #[darling(multiple)]
    pub alias: Vec<String>,

    pub group: Option<String>,

    /// Shorthand for `metadata(key = "comment", value = ...)`
    pub comment: Option<String>,

    #[darling(multiple)]
    pub metadata: Vec<MetadataArgs>,

    #[darling(multiple)]
    pub enum_value: Vec<EnumValueArgs>,
}

impl AttributeFieldArgs {
    /// Attribute name used in the scene class
    pub fn attribute_name(&self) -> String {
        match (&self.name, &self.ident) {
            (Some(name), _) => name.clone(),
            (None, Some(ident)) => ident.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Parse a DeriveInput into AttributeKeysArgs
pub fn parse_attribute_keys(input: &DeriveInput) -> darling::Result<AttributeKeysArgs> {
    AttributeKeysArgs::from_derive_input(input)
}
