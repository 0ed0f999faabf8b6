//! Camera base kind

use rdl2_macros::AttributeKeys;
use rdl2_sdk::Mat4d;

use super::{cached_keys, expect_interface};
use crate::attribute::{AttributeKey, SceneObjectRef};
use crate::class::SceneClass;
use crate::error::RdlResult;
use crate::factory::SceneObjectKind;
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObjectBehavior};

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct CameraKeys {
    #[attr(default = "Mat4d::identity()", blurrable, alias = "node xform", comment = "Camera to world transform")]
    pub node_xform: AttributeKey<Mat4d>,

    #[attr(default = "1.0", comment = "Near clipping plane")]
    pub near: AttributeKey<f32>,

    #[attr(default = "10000.0", comment = "Far clipping plane")]
    pub far: AttributeKey<f32>,

    #[attr(default = "-0.25", alias = "mb shutter open", group = "Motion Blur", comment = "Frame-relative shutter open time")]
    pub mb_shutter_open: AttributeKey<f32>,

    #[attr(default = "0.25", alias = "mb shutter close", group = "Motion Blur", comment = "Frame-relative shutter close time")]
    pub mb_shutter_close: AttributeKey<f32>,

    #[attr(default = "0.0", alias = "mb shutter bias", group = "Motion Blur")]
    pub mb_shutter_bias: AttributeKey<f32>,

    #[attr(
        interface = "MATERIAL",
        alias = "medium material",
        group = "Medium",
        comment = "Material applied to the medium the camera sits in"
    )]
    pub medium_material: AttributeKey<SceneObjectRef>,

    #[attr(
        interface = "GEOMETRY",
        alias = "medium geometry",
        group = "Medium",
        comment = "Geometry enclosing the camera; requires medium_material"
    )]
    pub medium_geometry: AttributeKey<SceneObjectRef>,
}

impl CameraKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

/// Base camera kind
///
/// Camera plugins call [`Camera::declare`](SceneObjectKind::declare) before
/// declaring their projection attributes.
#[derive(Debug, Default)]
pub struct Camera;

impl SceneObjectBehavior for Camera {}

impl SceneObjectKind for Camera {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = CameraKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::NODE | SceneObjectInterface::CAMERA)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(Camera)
    }
}

/// Typed access to any object implementing the camera interface
pub struct CameraView<'a> {
    object: &'a ObjectRef,
    keys: CameraKeys,
}

impl<'a> CameraView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::CAMERA)?;
        Ok(Self {
            keys: CameraKeys::of(object.scene_class())?,
            object,
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.object
    }

    /// Shutter open and close times, relative to the frame
    pub fn shutter_interval(&self) -> (f32, f32) {
        (
            self.object.get(self.keys.mb_shutter_open),
            self.object.get(self.keys.mb_shutter_close),
        )
    }

    pub fn shutter_bias(&self) -> f32 {
        self.object.get(self.keys.mb_shutter_bias)
    }

    pub fn clipping_range(&self) -> (f32, f32) {
        (self.object.get(self.keys.near), self.object.get(self.keys.far))
    }

    pub fn medium_material(&self) -> SceneObjectRef {
        self.object.get(self.keys.medium_material)
    }

    pub fn medium_geometry(&self) -> SceneObjectRef {
        self.object.get(self.keys.medium_geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RdlError;
    use crate::factory::BuiltinFactory;
    use crate::testing::{declared_class, plain_class, plain_object};

    #[test]
    fn test_camera_defaults() {
        let class = declared_class("PerspectiveCamera", BuiltinFactory::<Camera>::shared());
        let camera = plain_object(&class, "/cam");
        assert!(camera.is_a(SceneObjectInterface::CAMERA));
        assert!(camera.is_a(SceneObjectInterface::NODE));

        let view = CameraView::new(&camera).unwrap();
        assert_eq!(view.shutter_interval(), (-0.25, 0.25));
        assert_eq!(view.clipping_range(), (1.0, 10000.0));
        assert!(view.medium_material().is_none());
        assert_eq!(camera.get(view.keys.node_xform), Mat4d::identity());
    }

    #[test]
    fn test_view_rejects_other_kinds() {
        let class = plain_class("Plain");
        let object = plain_object(&class, "p");
        let err = CameraView::new(&object).err().unwrap();
        assert!(matches!(err, RdlError::Type(_)));
        assert_eq!(
            err.to_string(),
            "SceneObject 'p' of type 'SceneObject' is not a 'Camera'."
        );
    }
}
