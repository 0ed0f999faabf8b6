//! RDL2 Core - Scene Description Runtime
//!
//! This crate holds the scene description data model: classes declaring
//! typed attributes, objects storing their values, and the context that
//! registers both and runs the incremental update pass.
//!
//! # Re-exports
//!
//! This crate re-exports the SDK and engine crates for convenience:
//! - [`sdk`] - Attribute value types and type tags
//! - [`engine`] - Plugin discovery and shared object loading

// Allow the crate to refer to itself as `rdl2_core` for proc macro compatibility
extern crate self as rdl2_core;

pub use rdl2_engine as engine;
pub use rdl2_sdk as sdk;

pub mod attribute;
pub mod builtin;
pub mod class;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod interface;
pub mod object;
pub mod update_helper;

#[cfg(test)]
mod testing;

pub use attribute::{
    Attribute, AttributeFlags, AttributeKey, AttributeValue, AttributeValueType, SceneObjectIndexable,
    SceneObjectRef, SceneObjectVector,
};
pub use class::SceneClass;
pub use config::{ConfigError, ConfigResult, ContextConfig};
pub use context::{CallbackKey, ObjectCallback, SceneContext};
pub use error::{RdlError, RdlResult};
pub use factory::{BuiltinFactory, DsoFactory, ObjectFactory, ProxyFactory, SceneObjectKind};
pub use interface::{interface_type_name, SceneObjectInterface};
pub use object::{ObjectRef, SceneObject, SceneObjectBehavior};
pub use update_helper::UpdateHelper;

// Re-export the attribute key derive
pub use rdl2_macros::AttributeKeys;

#[cfg(test)]
mod tests {
    #[test]
    fn test_sdk_types_exist() {
        use crate::sdk::{AttributeType, Timestep};
        assert_ne!(Timestep::Begin, Timestep::End);
        let _ = AttributeType::Bool;
    }
}
