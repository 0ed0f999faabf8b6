//! Render output kind

use rdl2_macros::AttributeKeys;

use super::{cached_keys, expect_interface};
use crate::attribute::{AttributeKey, SceneObjectRef};
use crate::class::SceneClass;
use crate::error::RdlResult;
use crate::factory::SceneObjectKind;
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObjectBehavior};

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct RenderOutputKeys {
    #[attr(default = "true", comment = "Enables or disables this output")]
    pub active: AttributeKey<bool>,

    #[attr(
        interface = "CAMERA",
        comment = "Camera rendering this output; the primary camera when unset"
    )]
    pub camera: AttributeKey<SceneObjectRef>,

    #[attr(
        default = "\"scene.exr\"",
        filename,
        alias = "file name",
        metadata(key = "label", value = "file name"),
        comment = "Image file this output is written to"
    )]
    pub file_name: AttributeKey<String>,

    #[attr(
        interface = "DISPLAYFILTER",
        alias = "display filter",
        metadata(key = "label", value = "display filter"),
        comment = "Display filter producing this output's values"
    )]
    pub display_filter: AttributeKey<SceneObjectRef>,
}

impl RenderOutputKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

#[derive(Debug, Default)]
pub struct RenderOutput;

impl SceneObjectBehavior for RenderOutput {}

impl SceneObjectKind for RenderOutput {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = RenderOutputKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::RENDEROUTPUT)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(RenderOutput)
    }
}

pub struct RenderOutputView<'a> {
    object: &'a ObjectRef,
    keys: RenderOutputKeys,
}

impl<'a> RenderOutputView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::RENDEROUTPUT)?;
        Ok(Self {
            keys: RenderOutputKeys::of(object.scene_class())?,
            object,
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.object
    }

    pub fn is_active(&self) -> bool {
        self.object.get(self.keys.active)
    }

    pub fn camera(&self) -> SceneObjectRef {
        self.object.get(self.keys.camera)
    }

    pub fn file_name(&self) -> String {
        self.object.get(self.keys.file_name)
    }

    pub fn display_filter(&self) -> SceneObjectRef {
        self.object.get(self.keys.display_filter)
    }
}
