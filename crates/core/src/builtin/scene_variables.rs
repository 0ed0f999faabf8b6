//! Scene-wide settings singleton

use rdl2_macros::AttributeKeys;

use super::{cached_keys, expect_interface};
use crate::attribute::{AttributeKey, SceneObjectRef};
use crate::class::SceneClass;
use crate::error::RdlResult;
use crate::factory::SceneObjectKind;
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObjectBehavior};

/// Name of the one `SceneVariables` object in every context
pub const SCENE_VARIABLES_NAME: &str = "__SceneVariables__";

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct SceneVariablesKeys {
    #[attr(default = "0.0", group = "Frame", comment = "Current frame number")]
    pub frame: AttributeKey<f32>,

    #[attr(interface = "CAMERA", group = "Camera", comment = "Primary camera; the first camera created when unset")]
    pub camera: AttributeKey<SceneObjectRef>,

    #[attr(
        interface = "CAMERA",
        alias = "dicing camera",
        group = "Camera",
        comment = "Camera used for geometry dicing; the primary camera when unset"
    )]
    pub dicing_camera: AttributeKey<SceneObjectRef>,

    #[attr(interface = "LAYER", group = "Camera", comment = "Layer to render")]
    pub layer: AttributeKey<SceneObjectRef>,

    #[attr(default = "1920", alias = "image width", group = "Image Size")]
    pub image_width: AttributeKey<i32>,

    #[attr(default = "1080", alias = "image height", group = "Image Size")]
    pub image_height: AttributeKey<i32>,

    #[attr(
        default = "vec![-1.0, 0.0]",
        alias = "motion steps",
        group = "Motion and Scale",
        comment = "Frame-relative time offsets for motion sampling"
    )]
    pub motion_steps: AttributeKey<Vec<f32>>,

    #[attr(default = "24.0", group = "Motion and Scale", comment = "(Frames per second) Affects motion blur.")]
    pub fps: AttributeKey<f32>,

    #[attr(
        default = "true",
        alias = "enable motion blur",
        group = "Global Toggles",
        comment = "Enables or disables motion blur"
    )]
    pub enable_motion_blur: AttributeKey<bool>,
}

impl SceneVariablesKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

/// Kind of the `SceneVariables` class
#[derive(Debug, Default)]
pub struct SceneVariables;

impl SceneObjectBehavior for SceneVariables {}

impl SceneObjectKind for SceneVariables {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = SceneVariablesKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::GENERIC)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(SceneVariables)
    }
}

/// Typed read access to a `SceneVariables` object
pub struct SceneVariablesView<'a> {
    object: &'a ObjectRef,
    keys: SceneVariablesKeys,
}

impl<'a> SceneVariablesView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::GENERIC)?;
        Ok(Self {
            keys: SceneVariablesKeys::of(object.scene_class())?,
            object,
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.object
    }

    pub fn keys(&self) -> SceneVariablesKeys {
        self.keys
    }

    pub fn camera(&self) -> SceneObjectRef {
        self.object.get(self.keys.camera)
    }

    pub fn dicing_camera(&self) -> SceneObjectRef {
        self.object.get(self.keys.dicing_camera)
    }

    pub fn layer(&self) -> SceneObjectRef {
        self.object.get(self.keys.layer)
    }

    pub fn frame(&self) -> f32 {
        self.object.get(self.keys.frame)
    }

    pub fn image_size(&self) -> (i32, i32) {
        (self.object.get(self.keys.image_width), self.object.get(self.keys.image_height))
    }

    pub fn motion_steps(&self) -> Vec<f32> {
        self.object.get(self.keys.motion_steps)
    }

    pub fn fps(&self) -> f32 {
        self.object.get(self.keys.fps)
    }

    pub fn motion_blur_enabled(&self) -> bool {
        self.object.get(self.keys.enable_motion_blur)
    }
}
