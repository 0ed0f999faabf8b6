//! Built-in scene object kinds
//!
//! Two groups live here. The *context kinds* (sets, layers, render outputs,
//! scene variables and plain data holders) are registered by every
//! [`SceneContext`](crate::SceneContext) at construction. The *base kinds*
//! (cameras, geometry, lights and shaders) are never registered on their own:
//! plugin and static classes call their `declare` first and add their own
//! attributes, and proxy classes get a base kind as behavior through
//! [`base_behavior`].
//!
//! Each kind stores its key struct as class data, so a view such as
//! [`LayerView`] resolves its keys without name lookups. Classes that replaced
//! the class data fall back to resolving the keys by name.

mod camera;
mod data;
mod geometry;
mod layer;
mod light;
mod render_output;
mod scene_variables;
mod sets;
mod shader;

use std::any::Any;
use std::sync::Arc;

use crate::class::SceneClass;
use crate::error::{RdlError, RdlResult};
use crate::factory::{BuiltinFactory, ObjectFactory};
use crate::interface::{interface_type_name, SceneObjectInterface};
use crate::object::{ObjectRef, SceneObjectBehavior};

pub use camera::{Camera, CameraKeys, CameraView};
pub use data::{Joint, JointKeys, Metadata, MetadataEntry, MetadataKeys, MetadataView, UserData, UserDataKeys, UserDataView};
pub use geometry::{requires_geometry_update, Geometry, GeometryKeys, GeometryView};
pub use layer::{Layer, LayerAssignment, LayerKeys, LayerView, TraceSet, TraceSetKeys, TraceSetView};
pub use light::{Light, LightFilter, LightFilterKeys, LightKeys, LightView};
pub use render_output::{RenderOutput, RenderOutputKeys, RenderOutputView};
pub use scene_variables::{SceneVariables, SceneVariablesKeys, SceneVariablesView, SCENE_VARIABLES_NAME};
pub use sets::{
    GeometrySet, GeometrySetKeys, GeometrySetView, LightFilterSet, LightFilterSetKeys, LightFilterSetView, LightSet,
    LightSetKeys, LightSetView, ShadowReceiverSet, ShadowReceiverSetKeys, ShadowSet, ShadowSetKeys,
};
pub use shader::{
    shader_graph_prim_attributes, Displacement, DisplayFilter, EnvMap, Map, Material, MaterialKeys, NormalMap,
    VolumeShader, VolumeShaderKeys,
};

/// Class names and factories of the kinds every context starts with
pub(crate) fn context_classes() -> Vec<(&'static str, Arc<dyn ObjectFactory>)> {
    vec![
        ("GeometrySet", BuiltinFactory::<GeometrySet>::shared()),
        ("Joint", BuiltinFactory::<Joint>::shared()),
        ("TraceSet", BuiltinFactory::<TraceSet>::shared()),
        ("Layer", BuiltinFactory::<Layer>::shared()),
        ("LightFilterSet", BuiltinFactory::<LightFilterSet>::shared()),
        ("LightSet", BuiltinFactory::<LightSet>::shared()),
        ("RenderOutput", BuiltinFactory::<RenderOutput>::shared()),
        ("SceneVariables", BuiltinFactory::<SceneVariables>::shared()),
        ("ShadowSet", BuiltinFactory::<ShadowSet>::shared()),
        ("ShadowReceiverSet", BuiltinFactory::<ShadowReceiverSet>::shared()),
        ("UserData", BuiltinFactory::<UserData>::shared()),
        ("Metadata", BuiltinFactory::<Metadata>::shared()),
    ]
}

/// Behavior for an object of a declare-only class
///
/// Picks the base kind matching the most specific interface the class
/// declared. Classes with no matching base kind get an inert behavior.
pub fn base_behavior(interface: SceneObjectInterface) -> Box<dyn SceneObjectBehavior> {
    if interface.contains(SceneObjectInterface::GEOMETRY) {
        Box::new(Geometry::default())
    } else if interface.contains(SceneObjectInterface::CAMERA) {
        Box::new(Camera)
    } else if interface.contains(SceneObjectInterface::LIGHT) {
        Box::new(Light)
    } else if interface.contains(SceneObjectInterface::LIGHTFILTER) {
        Box::new(LightFilter)
    } else if interface.contains(SceneObjectInterface::MATERIAL) {
        Box::new(Material)
    } else if interface.contains(SceneObjectInterface::VOLUMESHADER) {
        Box::new(VolumeShader)
    } else if interface.contains(SceneObjectInterface::DISPLACEMENT) {
        Box::new(Displacement)
    } else if interface.contains(SceneObjectInterface::DISPLAYFILTER) {
        Box::new(DisplayFilter)
    } else if interface.contains(SceneObjectInterface::NORMALMAP) {
        Box::new(NormalMap)
    } else if interface.contains(SceneObjectInterface::MAP) {
        Box::new(Map)
    } else if interface.contains(SceneObjectInterface::ENVMAP) {
        Box::new(EnvMap)
    } else {
        Box::new(Inert)
    }
}

/// Behavior with no update work
struct Inert;

impl SceneObjectBehavior for Inert {}

/// Keys stored on the class by a built-in declare, or resolved by name
pub(crate) fn cached_keys<K>(class: &SceneClass, lookup: fn(&SceneClass) -> RdlResult<K>) -> RdlResult<K>
where
    K: Copy + Any + Send + Sync,
{
    match class.data::<K>() {
        Some(keys) => Ok(*keys),
        None => lookup(class),
    }
}

/// Fail unless `object` implements `interface`
pub(crate) fn expect_interface(object: &ObjectRef, interface: SceneObjectInterface) -> RdlResult<()> {
    if object.is_a(interface) {
        Ok(())
    } else {
        Err(RdlError::type_error(format!(
            "SceneObject '{}' of type '{}' is not a '{}'.",
            object.name(),
            interface_type_name(object.interfaces()),
            interface_type_name(interface)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::AsAny;

    #[test]
    fn test_base_behavior_follows_interface() {
        let geometry = base_behavior(SceneObjectInterface::GEOMETRY | SceneObjectInterface::NODE);
        assert!((*geometry).as_any().downcast_ref::<Geometry>().is_some());

        let material = base_behavior(
            SceneObjectInterface::SHADER | SceneObjectInterface::ROOTSHADER | SceneObjectInterface::MATERIAL,
        );
        assert!((*material).as_any().downcast_ref::<Material>().is_some());

        let normal_map = base_behavior(SceneObjectInterface::MAP | SceneObjectInterface::NORMALMAP);
        assert!((*normal_map).as_any().downcast_ref::<NormalMap>().is_some());

        let other = base_behavior(SceneObjectInterface::USERDATA);
        assert!((*other).as_any().downcast_ref::<Inert>().is_some());
    }

    #[test]
    fn test_context_classes_are_unique() {
        let classes = context_classes();
        assert_eq!(classes.len(), 12);
        let mut names: Vec<_> = classes.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 12);
    }
}
