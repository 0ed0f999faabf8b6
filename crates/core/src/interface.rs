//! Scene object interface bitmask

use bitflags::bitflags;

bitflags! {
    /// Interfaces a scene class implements
    ///
    /// Object-valued attributes constrain their targets with these bits, and
    /// every object carries the set its class declared plus `GENERIC`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SceneObjectInterface: u32 {
        const GENERIC = 1 << 0;
        const GEOMETRYSET = 1 << 1;
        const LAYER = 1 << 2;
        const LIGHTSET = 1 << 3;
        const NODE = 1 << 4;
        const CAMERA = 1 << 5;
        const ENVMAP = 1 << 6;
        const GEOMETRY = 1 << 7;
        const LIGHT = 1 << 8;
        const SHADER = 1 << 9;
        const DISPLACEMENT = 1 << 10;
        const MAP = 1 << 11;
        const ROOTSHADER = 1 << 12;
        const MATERIAL = 1 << 13;
        const VOLUMESHADER = 1 << 14;
        const RENDEROUTPUT = 1 << 15;
        const USERDATA = 1 << 16;
        const DWABASELAYERABLE = 1 << 17;
        const DWABASEHAIRLAYERABLE = 1 << 18;
        const METADATA = 1 << 19;
        const LIGHTFILTER = 1 << 20;
        const TRACESET = 1 << 21;
        const JOINT = 1 << 22;
        const LIGHTFILTERSET = 1 << 23;
        const SHADOWSET = 1 << 24;
        const NORMALMAP = 1 << 25;
        const DISPLAYFILTER = 1 << 26;
        const SHADOWRECEIVERSET = 1 << 27;
    }
}

impl Default for SceneObjectInterface {
    fn default() -> Self {
        Self::GENERIC
    }
}

// Most specific interfaces first; grouping interfaces only when nothing
// more specific is present.
const LEAF_NAMES: &[(SceneObjectInterface, &str)] = &[
    (SceneObjectInterface::CAMERA, "Camera"),
    (SceneObjectInterface::DWABASELAYERABLE, "DwaBaseLayerable"),
    (SceneObjectInterface::DWABASEHAIRLAYERABLE, "DwaBaseHairLayerable"),
    (SceneObjectInterface::ENVMAP, "EnvMap"),
    (SceneObjectInterface::GEOMETRY, "Geometry"),
    (SceneObjectInterface::GEOMETRYSET, "GeometrySet"),
    (SceneObjectInterface::JOINT, "Joint"),
    (SceneObjectInterface::TRACESET, "TraceSet"),
    (SceneObjectInterface::LAYER, "Layer"),
    (SceneObjectInterface::LIGHT, "Light"),
    (SceneObjectInterface::LIGHTFILTER, "LightFilter"),
    (SceneObjectInterface::SHADOWSET, "ShadowSet"),
    (SceneObjectInterface::LIGHTSET, "LightSet"),
    (SceneObjectInterface::LIGHTFILTERSET, "LightFilterSet"),
    (SceneObjectInterface::MAP, "Map"),
    (SceneObjectInterface::NORMALMAP, "NormalMap"),
    (SceneObjectInterface::MATERIAL, "Material"),
    (SceneObjectInterface::DISPLACEMENT, "Displacement"),
    (SceneObjectInterface::VOLUMESHADER, "Volume"),
    (SceneObjectInterface::RENDEROUTPUT, "RenderOutput"),
    (SceneObjectInterface::USERDATA, "UserData"),
    (SceneObjectInterface::METADATA, "Metadata"),
    (SceneObjectInterface::DISPLAYFILTER, "DisplayFilter"),
    (SceneObjectInterface::SHADOWRECEIVERSET, "ShadowReceiverSet"),
    (SceneObjectInterface::NODE, "Node"),
    (SceneObjectInterface::ROOTSHADER, "RootShader"),
    (SceneObjectInterface::GENERIC, "SceneObject"),
];

/// Human readable name of the most specific interface in `interface`
pub fn interface_type_name(interface: SceneObjectInterface) -> &'static str {
    LEAF_NAMES
        .iter()
        .find(|(bit, _)| interface.intersects(*bit))
        .map(|(_, name)| *name)
        .unwrap_or("Not a SceneObject hierarchy type!")
}

impl SceneObjectInterface {
    /// Shorthand for [`interface_type_name`]
    pub fn type_name(self) -> &'static str {
        interface_type_name(self)
    }
}

impl std::fmt::Display for SceneObjectInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}
