//! Geometry base kind

use rdl2_macros::AttributeKeys;
use rdl2_sdk::Mat4d;

use super::{cached_keys, expect_interface};
use crate::attribute::{AttributeKey, SceneObjectVector};
use crate::class::SceneClass;
use crate::error::RdlResult;
use crate::factory::SceneObjectKind;
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObject, SceneObjectBehavior};

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct GeometryKeys {
    #[attr(default = "Mat4d::identity()", blurrable, skip_geom_reload, alias = "node xform")]
    pub node_xform: AttributeKey<Mat4d>,

    #[attr(default = "\"\"", skip_geom_reload, comment = "Label used in material and light AOV expressions")]
    pub label: AttributeKey<String>,

    #[attr(default = "true", skip_geom_reload, alias = "visible camera", group = "Visibility")]
    pub visible_camera: AttributeKey<bool>,

    #[attr(default = "true", skip_geom_reload, alias = "visible shadow", group = "Visibility")]
    pub visible_shadow: AttributeKey<bool>,

    #[attr(interface = "GEOMETRY", alias = "reference geometries")]
    pub reference_geometries: AttributeKey<SceneObjectVector>,

    #[attr(
        default = "false",
        skip_geom_reload,
        alias = "contains camera",
        comment = "Set by the layer when this geometry is the camera's medium geometry"
    )]
    pub contains_camera: AttributeKey<bool>,
}

impl GeometryKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

/// Base geometry kind
///
/// Tracks whether procedural data was deformed outside the attribute system,
/// which forces the geometry through the next update pass.
#[derive(Debug, Default)]
pub struct Geometry {
    deformed: bool,
}

impl Geometry {
    pub fn set_deformed(&mut self, deformed: bool) {
        self.deformed = deformed;
    }
}

impl SceneObjectBehavior for Geometry {
    fn is_deformed(&self) -> bool {
        self.deformed
    }

    fn reset_deformed(&mut self) {
        self.deformed = false;
    }
}

impl SceneObjectKind for Geometry {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = GeometryKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::NODE | SceneObjectInterface::GEOMETRY)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(Geometry::default())
    }
}

/// Whether the geometry must be regenerated rather than just re-posed
///
/// True when a binding changed anywhere below the geometry, or when its
/// attribute tree changed through a dependency or through one of its own
/// attributes that is not flagged `CAN_SKIP_GEOM_RELOAD`. Only meaningful
/// after `update_prep` ran on the geometry this pass.
pub fn requires_geometry_update(geometry: &SceneObject) -> bool {
    if geometry.binding_tree_changed() {
        return true;
    }
    if !geometry.attribute_tree_changed() {
        return false;
    }
    let own_change = geometry.any_attribute_changed(|_| true);
    !own_change || geometry.any_attribute_changed(|attr| attr.update_requires_geom_reload())
}

/// Typed access to any object implementing the geometry interface
pub struct GeometryView<'a> {
    object: &'a ObjectRef,
    keys: GeometryKeys,
}

impl<'a> GeometryView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::GEOMETRY)?;
        Ok(Self {
            keys: GeometryKeys::of(object.scene_class())?,
            object,
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.object
    }

    pub fn contains_camera(&self) -> bool {
        self.object.get(self.keys.contains_camera)
    }

    /// Flag this geometry as enclosing the render camera
    ///
    /// Written during the update prep walk, outside any transaction, so the
    /// change is not tracked.
    pub fn set_contains_camera(&self) {
        self.object
            .modify_untracked(self.keys.contains_camera, |contains| *contains = true);
    }

    pub fn reference_geometries(&self) -> SceneObjectVector {
        self.object.get(self.keys.reference_geometries)
    }

    pub fn requires_geometry_update(&self) -> bool {
        requires_geometry_update(self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::BuiltinFactory;
    use crate::testing::{declared_class, plain_object};
    use crate::update_helper::UpdateHelper;

    fn settled_geometry() -> ObjectRef {
        let class = declared_class("Box", BuiltinFactory::<Geometry>::shared());
        let geom = plain_object(&class, "/box");
        let mut helper = UpdateHelper::new();
        geom.update_prep(&mut helper, 0);
        geom.reset_update();
        geom
    }

    fn prep(object: &ObjectRef) {
        let mut helper = UpdateHelper::new();
        object.update_prep(&mut helper, 0);
    }

    #[test]
    fn test_pose_change_skips_reload() {
        let geom = settled_geometry();
        let keys = GeometryKeys::of(geom.scene_class()).unwrap();

        geom.begin_update();
        geom.set(keys.visible_camera, false).unwrap();
        geom.end_update();
        prep(&geom);
        assert!(geom.update_required());
        assert!(!requires_geometry_update(&geom));
    }

    #[test]
    fn test_shape_change_requires_reload() {
        let geom = settled_geometry();
        let keys = GeometryKeys::of(geom.scene_class()).unwrap();
        let other = plain_object(geom.scene_class(), "/other");

        geom.begin_update();
        geom.set(keys.reference_geometries, vec![Some(other)]).unwrap();
        geom.end_update();
        prep(&geom);
        assert!(GeometryView::new(&geom).unwrap().requires_geometry_update());
    }

    #[test]
    fn test_unchanged_geometry_needs_nothing() {
        let geom = settled_geometry();
        prep(&geom);
        assert!(!geom.update_required());
        assert!(!requires_geometry_update(&geom));
    }

    #[test]
    fn test_deformed_flag() {
        let geom = settled_geometry();
        assert!(!geom.is_deformed());
        geom.with_behavior_mut(|g: &mut Geometry| g.set_deformed(true)).unwrap();
        assert!(geom.is_deformed());
        geom.reset_deformed();
        assert!(!geom.is_deformed());
    }

    #[test]
    fn test_contains_camera_is_untracked() {
        let geom = settled_geometry();
        let view = GeometryView::new(&geom).unwrap();
        assert!(!view.contains_camera());
        view.set_contains_camera();
        assert!(view.contains_camera());
        assert!(!geom.has_changed(view.keys.contains_camera));
    }
}
