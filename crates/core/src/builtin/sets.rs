//! Geometry, light, light filter, shadow and shadow receiver sets
//!
//! Sets are edited through their views rather than by assigning whole
//! vectors, so membership checks stay cheap and the change masks record the
//! edit. Light and light filter sets keep their members sorted by name.

use rdl2_macros::AttributeKeys;

use super::{cached_keys, expect_interface};
use crate::attribute::{AttributeKey, SceneObjectIndexable, SceneObjectVector};
use crate::class::SceneClass;
use crate::error::{RdlError, RdlResult};
use crate::factory::SceneObjectKind;
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObject, SceneObjectBehavior};
use crate::update_helper::UpdateHelper;

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct GeometrySetKeys {
    #[attr(interface = "GEOMETRY", comment = "Geometries that belong to this set")]
    pub geometries: AttributeKey<SceneObjectIndexable>,
}

impl GeometrySetKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct ShadowReceiverSetKeys {
    #[attr(default = "false", comment = "Suppress shadows onto every geometry except the listed ones")]
    pub complement: AttributeKey<bool>,
}

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct LightSetKeys {
    #[attr(interface = "LIGHT", comment = "List of lights that belong to this LightSet")]
    pub lights: AttributeKey<SceneObjectVector>,
}

impl LightSetKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct ShadowSetKeys {
    #[attr(default = "false", comment = "Cast shadows only from lights outside the set")]
    pub complement: AttributeKey<bool>,
}

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct LightFilterSetKeys {
    #[attr(interface = "LIGHTFILTER", comment = "List of light filters that belong to this LightFilterSet")]
    pub lightfilters: AttributeKey<SceneObjectVector>,
}

impl LightFilterSetKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

#[derive(Debug, Default)]
pub struct GeometrySet;

impl SceneObjectBehavior for GeometrySet {}

impl SceneObjectKind for GeometrySet {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = GeometrySetKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::GEOMETRYSET)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(GeometrySet)
    }
}

/// Geometry set whose members have their shadows suppressed
#[derive(Debug, Default)]
pub struct ShadowReceiverSet;

impl SceneObjectBehavior for ShadowReceiverSet {}

impl SceneObjectKind for ShadowReceiverSet {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let interface = GeometrySet::declare(class)?;
        ShadowReceiverSetKeys::declare(class)?;
        Ok(interface | SceneObjectInterface::SHADOWRECEIVERSET)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(ShadowReceiverSet)
    }
}

fn sort_by_name(objects: &mut SceneObjectVector) {
    objects.sort_by(|a, b| name_of(a).cmp(name_of(b)));
}

fn name_of(object: &Option<ObjectRef>) -> &str {
    object.as_ref().map_or("", |obj| obj.name())
}

#[derive(Debug, Default)]
pub struct LightSet;

impl SceneObjectBehavior for LightSet {
    fn update(&mut self, object: &SceneObject) -> RdlResult<()> {
        let keys = LightSetKeys::of(object.scene_class())?;
        object.modify_untracked(keys.lights, sort_by_name);
        Ok(())
    }
}

impl SceneObjectKind for LightSet {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = LightSetKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::LIGHTSET)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(LightSet)
    }
}

/// Light set selecting which lights cast shadows
#[derive(Debug, Default)]
pub struct ShadowSet(LightSet);

impl SceneObjectBehavior for ShadowSet {
    fn update(&mut self, object: &SceneObject) -> RdlResult<()> {
        self.0.update(object)
    }
}

impl SceneObjectKind for ShadowSet {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let interface = LightSet::declare(class)?;
        ShadowSetKeys::declare(class)?;
        Ok(interface | SceneObjectInterface::SHADOWSET)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(ShadowSet(LightSet))
    }
}

#[derive(Debug, Default)]
pub struct LightFilterSet;

impl SceneObjectBehavior for LightFilterSet {
    fn update(&mut self, object: &SceneObject) -> RdlResult<()> {
        let keys = LightFilterSetKeys::of(object.scene_class())?;
        object.modify_untracked(keys.lightfilters, sort_by_name);
        Ok(())
    }
}

impl SceneObjectKind for LightFilterSet {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = LightFilterSetKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::LIGHTFILTERSET)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(LightFilterSet)
    }
}

/// Edits and queries on a geometry set or shadow receiver set
pub struct GeometrySetView<'a> {
    object: &'a ObjectRef,
    keys: GeometrySetKeys,
}

impl<'a> GeometrySetView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::GEOMETRYSET)?;
        Ok(Self {
            keys: GeometrySetKeys::of(object.scene_class())?,
            object,
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.object
    }

    pub fn geometries(&self) -> Vec<ObjectRef> {
        self.object.get_ref(self.keys.geometries).to_vec()
    }

    pub fn contains(&self, geometry: &ObjectRef) -> bool {
        self.object.get_ref(self.keys.geometries).contains(geometry)
    }

    /// Add a geometry; adding a member again is a no-op
    ///
    /// A newly added geometry is forced through the next update pass.
    pub fn add(&self, geometry: &ObjectRef) -> RdlResult<()> {
        if !self.object.is_update_active() {
            return Err(RdlError::runtime_error(format!(
                "Geometry '{}' can only be added to GeometrySet '{}' between beginUpdate() and endUpdate() calls.",
                geometry.name(),
                self.object.name()
            )));
        }
        expect_interface(geometry, SceneObjectInterface::GEOMETRY)?;
        if self.contains(geometry) {
            return Ok(());
        }
        self.object
            .modify(self.keys.geometries, |geometries| geometries.push(geometry.clone()))?;
        geometry.request_update();
        Ok(())
    }

    pub fn remove(&self, geometry: &ObjectRef) -> RdlResult<()> {
        if !self.object.is_update_active() {
            return Err(RdlError::runtime_error(format!(
                "Geometry '{}' can only be removed from GeometrySet '{}' between beginUpdate() and endUpdate() calls.",
                geometry.name(),
                self.object.name()
            )));
        }
        let index = self
            .object
            .get_ref(self.keys.geometries)
            .indices_of(geometry)
            .first()
            .copied();
        if let Some(index) = index {
            self.object
                .modify(self.keys.geometries, |geometries| geometries.remove(index))?;
        }
        Ok(())
    }

    pub fn clear(&self) -> RdlResult<()> {
        if !self.object.is_update_active() {
            return Err(RdlError::runtime_error(format!(
                "GeometrySet '{}' can only be cleared between beginUpdate() and endUpdate() calls.",
                self.object.name()
            )));
        }
        self.object
            .modify(self.keys.geometries, |geometries| geometries.clear())
    }

    /// Whether membership changed since the last update pass
    pub fn have_geometries_changed(&self) -> bool {
        self.object.has_changed(self.keys.geometries)
    }

    /// Schedule the set from its members' tree flags
    ///
    /// The members must have been walked earlier in this pass, normally by
    /// the layer. Returns whether the set needs an update.
    pub fn update_prep_fast(&self, helper: &mut UpdateHelper, depth: i32) -> bool {
        let (attribute_changed, binding_changed) = {
            let geometries = self.object.get_ref(self.keys.geometries);
            let mut flags = (false, false);
            for geometry in geometries.iter() {
                flags.0 |= geometry.attribute_tree_changed();
                flags.1 |= geometry.binding_tree_changed();
                if flags.0 && flags.1 {
                    break;
                }
            }
            flags
        };
        self.object
            .update_prep_fast(helper, depth, attribute_changed, binding_changed)
    }
}

/// Name-sorted membership edits shared by light and light filter sets
struct SortedSet<'a> {
    object: &'a ObjectRef,
    key: AttributeKey<SceneObjectVector>,
    set_kind: &'static str,
    member_kind: &'static str,
    member_interface: SceneObjectInterface,
}

impl SortedSet<'_> {
    fn not_in_update(&self, member: &ObjectRef, action: &str) -> RdlError {
        RdlError::runtime_error(format!(
            "{} '{}' can only be {} {} '{}' between beginUpdate() and endUpdate() calls.",
            self.member_kind,
            member.name(),
            action,
            self.set_kind,
            self.object.name()
        ))
    }

    /// Position of `member` if present, else where it would be inserted
    fn search(&self, member: &ObjectRef) -> Result<usize, usize> {
        let members = self.object.get_ref(self.key);
        let at = members.partition_point(|m| name_of(m) < member.name());
        match members.get(at) {
            Some(Some(found)) if found == member => Ok(at),
            _ => Err(at),
        }
    }

    fn add(&self, member: &ObjectRef) -> RdlResult<()> {
        if !self.object.is_update_active() {
            return Err(self.not_in_update(member, "added to"));
        }
        expect_interface(member, self.member_interface)?;
        if let Err(at) = self.search(member) {
            self.object
                .modify(self.key, |members| members.insert(at, Some(member.clone())))?;
        }
        Ok(())
    }

    fn remove(&self, member: &ObjectRef) -> RdlResult<()> {
        if !self.object.is_update_active() {
            return Err(self.not_in_update(member, "removed from"));
        }
        if let Ok(at) = self.search(member) {
            self.object.modify(self.key, |members| members.remove(at))?;
        }
        Ok(())
    }

    fn contains(&self, member: &ObjectRef) -> bool {
        self.object.get_ref(self.key).iter().flatten().any(|m| m == member)
    }

    fn clear(&self) -> RdlResult<()> {
        if !self.object.is_update_active() {
            return Err(RdlError::runtime_error(format!(
                "{} '{}' can only be cleared between beginUpdate() and endUpdate() calls.",
                self.set_kind,
                self.object.name()
            )));
        }
        self.object.modify(self.key, |members| members.clear())
    }
}

/// Edits and queries on a light set or shadow set
pub struct LightSetView<'a> {
    set: SortedSet<'a>,
}

impl<'a> LightSetView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::LIGHTSET)?;
        let keys = LightSetKeys::of(object.scene_class())?;
        Ok(Self {
            set: SortedSet {
                object,
                key: keys.lights,
                set_kind: "LightSet",
                member_kind: "Light",
                member_interface: SceneObjectInterface::LIGHT,
            },
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.set.object
    }

    pub fn lights(&self) -> Vec<ObjectRef> {
        self.set.object.get_ref(self.set.key).iter().flatten().cloned().collect()
    }

    /// Insert keeping the list sorted by name; adding a member again is a no-op
    pub fn add(&self, light: &ObjectRef) -> RdlResult<()> {
        self.set.add(light)
    }

    pub fn remove(&self, light: &ObjectRef) -> RdlResult<()> {
        self.set.remove(light)
    }

    pub fn contains(&self, light: &ObjectRef) -> bool {
        self.set.contains(light)
    }

    pub fn clear(&self) -> RdlResult<()> {
        self.set.clear()
    }

    pub fn have_lights_changed(&self) -> bool {
        self.set.object.has_changed(self.set.key)
    }
}

/// Edits and queries on a light filter set
pub struct LightFilterSetView<'a> {
    set: SortedSet<'a>,
}

impl<'a> LightFilterSetView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::LIGHTFILTERSET)?;
        let keys = LightFilterSetKeys::of(object.scene_class())?;
        Ok(Self {
            set: SortedSet {
                object,
                key: keys.lightfilters,
                set_kind: "LightFilterSet",
                member_kind: "LightFilter",
                member_interface: SceneObjectInterface::LIGHTFILTER,
            },
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.set.object
    }

    pub fn light_filters(&self) -> Vec<ObjectRef> {
        self.set.object.get_ref(self.set.key).iter().flatten().cloned().collect()
    }

    pub fn add(&self, filter: &ObjectRef) -> RdlResult<()> {
        self.set.add(filter)
    }

    pub fn remove(&self, filter: &ObjectRef) -> RdlResult<()> {
        self.set.remove(filter)
    }

    pub fn contains(&self, filter: &ObjectRef) -> bool {
        self.set.contains(filter)
    }

    pub fn clear(&self) -> RdlResult<()> {
        self.set.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{Geometry, Light, LightFilter};
    use crate::factory::BuiltinFactory;
    use crate::testing::{declared_class, plain_object};

    fn names(objects: &[ObjectRef]) -> Vec<&str> {
        objects.iter().map(|o| o.name()).collect()
    }

    #[test]
    fn test_geometry_set_membership() {
        let sets = declared_class("GeometrySet", BuiltinFactory::<GeometrySet>::shared());
        let geoms = declared_class("Box", BuiltinFactory::<Geometry>::shared());
        let set = plain_object(&sets, "/set");
        let a = plain_object(&geoms, "/a");
        let b = plain_object(&geoms, "/b");
        let view = GeometrySetView::new(&set).unwrap();

        let err = view.add(&a).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Geometry '/a' can only be added to GeometrySet '/set' between beginUpdate() and endUpdate() calls."
        );

        set.begin_update();
        view.add(&a).unwrap();
        view.add(&b).unwrap();
        view.add(&a).unwrap();
        assert!(matches!(view.add(&set), Err(RdlError::Type(_))));
        set.end_update();
        assert_eq!(names(&view.geometries()), vec!["/a", "/b"]);
        assert!(view.contains(&b));
        assert!(view.have_geometries_changed());

        set.begin_update();
        view.remove(&a).unwrap();
        set.end_update();
        assert!(!view.contains(&a));
        assert_eq!(set.get_ref(view.keys.geometries).indices_of(&b), &[0]);

        set.begin_update();
        view.clear().unwrap();
        set.end_update();
        assert!(view.geometries().is_empty());
    }

    #[test]
    fn test_added_geometry_is_updated() {
        let sets = declared_class("GeometrySet", BuiltinFactory::<GeometrySet>::shared());
        let geoms = declared_class("Box", BuiltinFactory::<Geometry>::shared());
        let set = plain_object(&sets, "/set");
        let geom = plain_object(&geoms, "/geom");

        let mut helper = UpdateHelper::new();
        geom.update_prep(&mut helper, 0);
        geom.reset_update();

        set.begin_update();
        GeometrySetView::new(&set).unwrap().add(&geom).unwrap();
        set.end_update();

        let mut helper = UpdateHelper::new();
        assert!(geom.update_prep(&mut helper, 1));
    }

    #[test]
    fn test_update_prep_fast_uses_member_flags() {
        let sets = declared_class("GeometrySet", BuiltinFactory::<GeometrySet>::shared());
        let geoms = declared_class("Box", BuiltinFactory::<Geometry>::shared());
        let set = plain_object(&sets, "/set");
        let geom = plain_object(&geoms, "/geom");
        let view = GeometrySetView::new(&set).unwrap();

        set.begin_update();
        view.add(&geom).unwrap();
        set.end_update();
        let mut helper = UpdateHelper::new();
        geom.update_prep(&mut helper, 1);
        assert!(view.update_prep_fast(&mut helper, 0));
        assert_eq!(helper.get_depth(&set), 0);
        set.reset_update();
        geom.reset_update();

        // Nothing changed: the set stays out of the pass.
        let mut helper = UpdateHelper::new();
        geom.update_prep(&mut helper, 1);
        assert!(!view.update_prep_fast(&mut helper, 0));
        assert!(helper.is_empty());
    }

    #[test]
    fn test_light_set_stays_sorted() {
        let sets = declared_class("LightSet", BuiltinFactory::<LightSet>::shared());
        let lights = declared_class("SpotLight", BuiltinFactory::<Light>::shared());
        let set = plain_object(&sets, "/lights");
        let view = LightSetView::new(&set).unwrap();
        let c = plain_object(&lights, "c");
        let a = plain_object(&lights, "a");
        let b = plain_object(&lights, "b");

        set.begin_update();
        view.add(&c).unwrap();
        view.add(&a).unwrap();
        view.add(&b).unwrap();
        view.add(&a).unwrap();
        set.end_update();
        assert_eq!(names(&view.lights()), vec!["a", "b", "c"]);

        set.begin_update();
        view.remove(&b).unwrap();
        set.end_update();
        assert_eq!(names(&view.lights()), vec!["a", "c"]);
        assert!(!view.contains(&b));

        let err = view.remove(&a).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Light 'a' can only be removed from LightSet '/lights' between beginUpdate() and endUpdate() calls."
        );
    }

    #[test]
    fn test_light_set_update_sorts_assigned_vector() {
        let sets = declared_class("LightSet", BuiltinFactory::<LightSet>::shared());
        let lights = declared_class("SpotLight", BuiltinFactory::<Light>::shared());
        let set = plain_object(&sets, "/lights");
        let keys = LightSetKeys::of(&sets).unwrap();
        let z = plain_object(&lights, "z");
        let m = plain_object(&lights, "m");

        set.begin_update();
        set.set(keys.lights, vec![Some(z), Some(m)]).unwrap();
        set.end_update();
        set.apply_updates().unwrap();
        assert_eq!(names(&LightSetView::new(&set).unwrap().lights()), vec!["m", "z"]);
    }

    #[test]
    fn test_shadow_sets_extend_their_parents() {
        let shadow_sets = declared_class("ShadowSet", BuiltinFactory::<ShadowSet>::shared());
        assert!(shadow_sets.declared_interface().contains(SceneObjectInterface::LIGHTSET));
        assert!(shadow_sets.declared_interface().contains(SceneObjectInterface::SHADOWSET));
        assert!(shadow_sets.has_attribute("complement"));

        let receivers = declared_class("ShadowReceiverSet", BuiltinFactory::<ShadowReceiverSet>::shared());
        let set = plain_object(&receivers, "/rcvr");
        assert!(set.is_a(SceneObjectInterface::SHADOWRECEIVERSET));
        assert!(GeometrySetView::new(&set).is_ok());
    }

    #[test]
    fn test_light_filter_set() {
        let sets = declared_class("LightFilterSet", BuiltinFactory::<LightFilterSet>::shared());
        let filters = declared_class("DecayLightFilter", BuiltinFactory::<LightFilter>::shared());
        let set = plain_object(&sets, "/filters");
        let f = plain_object(&filters, "/f");
        let view = LightFilterSetView::new(&set).unwrap();

        set.begin_update();
        view.add(&f).unwrap();
        set.end_update();
        assert!(view.contains(&f));
        assert_eq!(view.light_filters().len(), 1);

        assert_eq!(
            view.clear().unwrap_err().to_string(),
            "LightFilterSet '/filters' can only be cleared between beginUpdate() and endUpdate() calls."
        );
    }
}
