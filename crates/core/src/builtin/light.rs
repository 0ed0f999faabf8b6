//! Light and light filter base kinds

use rdl2_macros::AttributeKeys;
use rdl2_sdk::{Mat4d, Rgb};

use super::{cached_keys, expect_interface};
use crate::attribute::{AttributeKey, SceneObjectVector};
use crate::class::SceneClass;
use crate::error::RdlResult;
use crate::factory::SceneObjectKind;
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObjectBehavior};

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct LightKeys {
    #[attr(default = "Mat4d::identity()", blurrable, alias = "node xform")]
    pub node_xform: AttributeKey<Mat4d>,

    #[attr(default = "true", comment = "Turns the light on and off")]
    pub on: AttributeKey<bool>,

    #[attr(default = "Rgb::new(1.0, 1.0, 1.0)", comment = "Color of the light")]
    pub color: AttributeKey<Rgb>,

    #[attr(default = "1.0", comment = "Multiplier on the light color")]
    pub intensity: AttributeKey<f32>,

    #[attr(default = "0.0", comment = "Power of 2 multiplier on the intensity")]
    pub exposure: AttributeKey<f32>,

    #[attr(interface = "LIGHTFILTER", alias = "light filters", comment = "Filters applied to this light")]
    pub light_filters: AttributeKey<SceneObjectVector>,

    #[attr(default = "\"\"")]
    pub label: AttributeKey<String>,
}

impl LightKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct LightFilterKeys {
    #[attr(default = "true")]
    pub on: AttributeKey<bool>,
}

/// Base light kind
#[derive(Debug, Default)]
pub struct Light;

impl SceneObjectBehavior for Light {}

impl SceneObjectKind for Light {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = LightKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::NODE | SceneObjectInterface::LIGHT)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(Light)
    }
}

/// Base light filter kind
#[derive(Debug, Default)]
pub struct LightFilter;

impl SceneObjectBehavior for LightFilter {}

impl SceneObjectKind for LightFilter {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = LightFilterKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::LIGHTFILTER)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(LightFilter)
    }
}

/// Typed access to any object implementing the light interface
pub struct LightView<'a> {
    object: &'a ObjectRef,
    keys: LightKeys,
}

impl<'a> LightView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::LIGHT)?;
        Ok(Self {
            keys: LightKeys::of(object.scene_class())?,
            object,
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.object
    }

    pub fn is_on(&self) -> bool {
        self.object.get(self.keys.on)
    }

    /// Color scaled by intensity and exposure
    pub fn radiance(&self) -> Rgb {
        let color = self.object.get(self.keys.color);
        let scale = self.object.get(self.keys.intensity) * self.object.get(self.keys.exposure).exp2();
        Rgb::new(color.r * scale, color.g * scale, color.b * scale)
    }

    pub fn light_filters(&self) -> SceneObjectVector {
        self.object.get(self.keys.light_filters)
    }

    /// Whether the filter list changed since the last update pass
    pub fn light_filters_changed(&self) -> bool {
        self.object.has_changed(self.keys.light_filters)
    }
}
