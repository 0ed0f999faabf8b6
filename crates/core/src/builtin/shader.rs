//! Shader base kinds and shader graph queries

use std::collections::{BTreeSet, HashSet};

use rdl2_macros::AttributeKeys;

use super::cached_keys;
use crate::attribute::{AttributeKey, SceneObjectRef};
use crate::class::SceneClass;
use crate::error::RdlResult;
use crate::factory::SceneObjectKind;
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObjectBehavior};

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct MaterialKeys {
    #[attr(
        interface = "MAP",
        alias = "extra aovs",
        comment = "ListMap of ExtraAovMaps providing additional light aov outputs"
    )]
    pub extra_aovs: AttributeKey<SceneObjectRef>,

    #[attr(default = "\"\"", comment = "label used in material and light aovs")]
    pub label: AttributeKey<String>,

    #[attr(
        default = "0",
        comment = "Precedence for overlapping dielectrics; 0 ignores priority, lower numbers win"
    )]
    pub priority: AttributeKey<i32>,

    #[attr(default = "false", metadata(key = "label", value = "record reflected cryptomatte"))]
    pub record_reflected_cryptomatte: AttributeKey<bool>,

    #[attr(
        default = "false",
        alias = "invisible_refractive_cryptomatte",
        alias = "invisible refractive cryptomatte",
        metadata(key = "label", value = "record refracted cryptomatte")
    )]
    pub record_refracted_cryptomatte: AttributeKey<bool>,
}

impl MaterialKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct VolumeShaderKeys {
    #[attr(default = "\"\"")]
    pub label: AttributeKey<String>,

    #[attr(
        default = "0",
        enumerable,
        group = "Volume Baking",
        metadata(key = "label", value = "bake resolution mode"),
        enum_value(value = 0, description = "default"),
        enum_value(value = 1, description = "divisions"),
        enum_value(value = 2, description = "voxel size"),
        comment = "Method to specify grid resolution of the baked density grid"
    )]
    pub bake_resolution_mode: AttributeKey<i32>,

    #[attr(default = "100", group = "Volume Baking")]
    pub bake_divisions: AttributeKey<i32>,

    #[attr(default = "10.0", group = "Volume Baking")]
    pub bake_voxel_size: AttributeKey<f32>,

    #[attr(default = "0.5", alias = "surface opacity threshold")]
    pub surface_opacity_threshold: AttributeKey<f32>,
}

impl VolumeShaderKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

/// Unit kinds that only contribute an interface
macro_rules! shader_kind {
    ($(#[$doc:meta])* $name:ident => $interface:expr) => {
        $(#[$doc])*
        #[derive(Debug, Default)]
        pub struct $name;

        impl SceneObjectBehavior for $name {}

        impl SceneObjectKind for $name {
            fn declare(_class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
                Ok($interface)
            }

            fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
                Ok($name)
            }
        }
    };
}

shader_kind!(
    /// Root shader displacing geometry surfaces
    Displacement => SceneObjectInterface::SHADER | SceneObjectInterface::ROOTSHADER | SceneObjectInterface::DISPLACEMENT
);
shader_kind!(
    /// Post-process filter over render outputs
    DisplayFilter => SceneObjectInterface::DISPLAYFILTER
);
shader_kind!(Map => SceneObjectInterface::SHADER | SceneObjectInterface::MAP);
shader_kind!(NormalMap => SceneObjectInterface::SHADER | SceneObjectInterface::NORMALMAP);
shader_kind!(EnvMap => SceneObjectInterface::NODE | SceneObjectInterface::ENVMAP);

/// Base surface material kind
#[derive(Debug, Default)]
pub struct Material;

impl SceneObjectBehavior for Material {}

impl SceneObjectKind for Material {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = MaterialKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::SHADER | SceneObjectInterface::ROOTSHADER | SceneObjectInterface::MATERIAL)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(Material)
    }
}

/// Base volume shader kind
///
/// Plugins that bake density grids report stale bakes through
/// [`SceneObjectBehavior::update_bake_required`]; the base kind never does.
#[derive(Debug, Default)]
pub struct VolumeShader;

impl SceneObjectBehavior for VolumeShader {}

impl SceneObjectKind for VolumeShader {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = VolumeShaderKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::SHADER | SceneObjectInterface::ROOTSHADER | SceneObjectInterface::VOLUMESHADER)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(VolumeShader)
    }
}

/// Primitive attributes required anywhere in the shader graph under `root`
///
/// Follows object-valued attributes and bindings into other shaders. Each
/// shader is visited once, so shared subgraphs and cycles are harmless.
pub fn shader_graph_prim_attributes(root: &ObjectRef) -> BTreeSet<String> {
    let mut attributes = BTreeSet::new();
    let mut visited = HashSet::new();
    let mut pending = vec![root.clone()];
    while let Some(shader) = pending.pop() {
        if !visited.insert(shader.clone()) {
            continue;
        }
        attributes.extend(shader.required_prim_attributes());
        pending.extend(
            shader
                .referenced_objects()
                .into_iter()
                .filter(|obj| obj.is_a(SceneObjectInterface::SHADER) && !visited.contains(obj)),
        );
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeFlags;
    use crate::factory::BuiltinFactory;
    use crate::object::SceneObject;
    use crate::testing::{declared_class, plain_object};

    /// Map reading a fixed primitive attribute and chaining to another map
    struct AttributeMap;

    impl SceneObjectBehavior for AttributeMap {
        fn required_prim_attributes(&self, object: &SceneObject) -> Vec<String> {
            vec![object.get_by_name::<String>("primitive_attribute").unwrap_or_default()]
        }
    }

    impl SceneObjectKind for AttributeMap {
        fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
            class.declare_attribute::<String>("primitive_attribute", AttributeFlags::empty())?;
            class.declare_attribute_with::<SceneObjectRef>(
                "input",
                None,
                AttributeFlags::BINDABLE,
                SceneObjectInterface::MAP,
                &[],
            )?;
            Ok(SceneObjectInterface::SHADER | SceneObjectInterface::MAP)
        }

        fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
            Ok(AttributeMap)
        }
    }

    #[test]
    fn test_material_declarations() {
        let class = declared_class("DwaBaseMaterial", BuiltinFactory::<Material>::shared());
        assert!(class.declared_interface().contains(SceneObjectInterface::ROOTSHADER));
        let keys = MaterialKeys::of(&class).unwrap();
        assert_eq!(
            class.get_attribute("invisible refractive cryptomatte").unwrap().name(),
            "record_refracted_cryptomatte"
        );
        assert_eq!(
            class.get_metadata(keys.record_reflected_cryptomatte, "label").unwrap(),
            "record reflected cryptomatte"
        );
    }

    #[test]
    fn test_volume_shader_enum() {
        let class = declared_class("VdbVolume", BuiltinFactory::<VolumeShader>::shared());
        let keys = VolumeShaderKeys::of(&class).unwrap();
        assert_eq!(class.get_enum_value(keys.bake_resolution_mode, "voxel size").unwrap(), 2);
        assert_eq!(class.get_enum_description(keys.bake_resolution_mode, 1).unwrap(), "divisions");
        assert_eq!(class.attribute_group("Volume Baking").len(), 3);

        let volume = plain_object(&class, "/vol");
        assert_eq!(volume.get(keys.bake_divisions), 100);
        assert!(!volume.update_bake_required());
    }

    #[test]
    fn test_graph_prim_attributes_follow_values_and_bindings() {
        let maps = declared_class("AttributeMap", BuiltinFactory::<AttributeMap>::shared());
        let a = plain_object(&maps, "/a");
        let b = plain_object(&maps, "/b");
        let c = plain_object(&maps, "/c");

        for (map, attr) in [(&a, "uv"), (&b, "Cd"), (&c, "uv")] {
            map.begin_update();
            map.set_by_name("primitive_attribute", attr.to_string()).unwrap();
            map.end_update();
        }
        a.begin_update();
        a.set_by_name::<SceneObjectRef>("input", Some(b.clone())).unwrap();
        a.end_update();
        b.begin_update();
        b.set_binding_by_name("input", Some(&c)).unwrap();
        // Cycle back to the root.
        b.set_by_name::<SceneObjectRef>("input", Some(a.clone())).unwrap();
        b.end_update();

        let attrs = shader_graph_prim_attributes(&a);
        assert_eq!(attrs.into_iter().collect::<Vec<_>>(), vec!["Cd".to_string(), "uv".to_string()]);
        assert_eq!(shader_graph_prim_attributes(&c).len(), 1);
    }
}
