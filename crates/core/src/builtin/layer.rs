//! Trace sets and layers
//!
//! A trace set is a table of `(geometry, part)` assignments. A layer extends
//! it with one column per assigned look: material, light set, displacement,
//! volume shader, light filter set, shadow set and shadow receiver set. The
//! row index is the assignment ID renderers use to find a primitive's look.
//!
//! Layers take part in the update pass through
//! [`LayerView::update_prep_assignments`], which walks the assignment table
//! directly and records which geometries and root shaders changed. The
//! generic graph walk would reach the same objects, but assignment tables
//! are large and the layer needs the per-row results anyway.

use std::collections::{BTreeSet, HashMap, HashSet};

use rdl2_macros::AttributeKeys;
use rdl2_sdk::{AttributeType, Timestep};
use tracing::warn;

use super::camera::CameraView;
use super::geometry::{requires_geometry_update, GeometryView};
use super::light::LightView;
use super::sets::{GeometrySetView, LightSetView};
use super::shader::shader_graph_prim_attributes;
use super::{cached_keys, expect_interface};
use crate::attribute::{AttributeKey, AttributeValue, SceneObjectIndexable, SceneObjectVector};
use crate::class::SceneClass;
use crate::error::{RdlError, RdlResult};
use crate::factory::SceneObjectKind;
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObjectBehavior};
use crate::update_helper::UpdateHelper;

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct TraceSetKeys {
    #[attr(interface = "GEOMETRY", comment = "The geometry objects included in the set, one per assignment")]
    pub geometries: AttributeKey<SceneObjectIndexable>,

    #[attr(comment = "For each assignment, the part of its geometry; \"\" includes every part")]
    pub parts: AttributeKey<Vec<String>>,
}

impl TraceSetKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }
}

#[derive(AttributeKeys, Debug, Clone, Copy)]
pub struct LayerKeys {
    #[attr(
        interface = "MATERIAL",
        alias = "surface shaders",
        metadata(key = "label", value = "surface shaders"),
        comment = "The materials assigned to geometry objects in the layer, or to their specified parts"
    )]
    pub surface_shaders: AttributeKey<SceneObjectVector>,

    #[attr(interface = "LIGHTSET", comment = "The light sets assigned to geometry objects in the layer")]
    pub lightsets: AttributeKey<SceneObjectVector>,

    #[attr(interface = "DISPLACEMENT", comment = "The displacement shaders assigned to geometry objects in the layer")]
    pub displacements: AttributeKey<SceneObjectVector>,

    #[attr(
        interface = "VOLUMESHADER",
        alias = "volume shaders",
        metadata(key = "label", value = "volume shaders"),
        comment = "The volume shaders assigned to geometry objects in the layer"
    )]
    pub volume_shaders: AttributeKey<SceneObjectVector>,

    #[attr(interface = "LIGHTFILTERSET", comment = "The light filter sets assigned to geometry objects in the layer")]
    pub lightfiltersets: AttributeKey<SceneObjectVector>,

    #[attr(interface = "SHADOWSET", comment = "The shadow sets assigned to geometry objects in the layer")]
    pub shadowsets: AttributeKey<SceneObjectVector>,

    #[attr(
        interface = "SHADOWRECEIVERSET",
        comment = "The shadow receiver sets assigned to geometry objects in the layer"
    )]
    pub shadowreceiversets: AttributeKey<SceneObjectVector>,
}

impl LayerKeys {
    pub fn of(class: &SceneClass) -> RdlResult<Self> {
        cached_keys(class, Self::lookup)
    }

    /// Look columns in [`LayerAssignment::row`] order
    fn columns(&self) -> [AttributeKey<SceneObjectVector>; 7] {
        [
            self.surface_shaders,
            self.lightsets,
            self.displacements,
            self.volume_shaders,
            self.lightfiltersets,
            self.shadowsets,
            self.shadowreceiversets,
        ]
    }
}

/// The look assigned to one `(geometry, part)` row of a layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerAssignment {
    pub material: Option<ObjectRef>,
    pub light_set: Option<ObjectRef>,
    pub displacement: Option<ObjectRef>,
    pub volume_shader: Option<ObjectRef>,
    pub light_filter_set: Option<ObjectRef>,
    pub shadow_set: Option<ObjectRef>,
    pub shadow_receiver_set: Option<ObjectRef>,
}

impl LayerAssignment {
    pub fn new(material: Option<ObjectRef>, light_set: Option<ObjectRef>) -> Self {
        Self {
            material,
            light_set,
            ..Self::default()
        }
    }

    fn row(&self) -> [(&Option<ObjectRef>, SceneObjectInterface); 7] {
        [
            (&self.material, SceneObjectInterface::MATERIAL),
            (&self.light_set, SceneObjectInterface::LIGHTSET),
            (&self.displacement, SceneObjectInterface::DISPLACEMENT),
            (&self.volume_shader, SceneObjectInterface::VOLUMESHADER),
            (&self.light_filter_set, SceneObjectInterface::LIGHTFILTERSET),
            (&self.shadow_set, SceneObjectInterface::SHADOWSET),
            (&self.shadow_receiver_set, SceneObjectInterface::SHADOWRECEIVERSET),
        ]
    }

    fn from_row(mut row: impl Iterator<Item = Option<ObjectRef>>) -> Self {
        let mut next = || row.next().flatten();
        Self {
            material: next(),
            light_set: next(),
            displacement: next(),
            volume_shader: next(),
            light_filter_set: next(),
            shadow_set: next(),
            shadow_receiver_set: next(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TraceSet;

impl SceneObjectBehavior for TraceSet {}

impl SceneObjectKind for TraceSet {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let keys = TraceSetKeys::declare(class)?;
        class.set_data(keys);
        Ok(SceneObjectInterface::TRACESET)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(TraceSet)
    }
}

/// Layer kind, holding the results of the last assignment walk
#[derive(Debug, Default)]
pub struct Layer {
    changed_root_shaders: HashSet<ObjectRef>,
    changed_or_deformed: HashMap<ObjectRef, usize>,
    light_sets_changed: bool,
    light_filter_sets_changed: bool,
    shadow_sets_changed: bool,
    shadow_receiver_sets_changed: bool,
    prim_attributes: HashMap<ObjectRef, BTreeSet<String>>,
}

impl SceneObjectBehavior for Layer {}

impl SceneObjectKind for Layer {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        let interface = TraceSet::declare(class)?;
        let keys = LayerKeys::declare(class)?;
        class.set_data(keys);
        Ok(interface | SceneObjectInterface::LAYER)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(Layer::default())
    }
}

/// Assignment edits and lookups on a trace set or layer
pub struct TraceSetView<'a> {
    object: &'a ObjectRef,
    keys: TraceSetKeys,
}

impl<'a> TraceSetView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::TRACESET)?;
        Ok(Self {
            keys: TraceSetKeys::of(object.scene_class())?,
            object,
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.object
    }

    pub fn assignment_count(&self) -> usize {
        self.object.get_ref(self.keys.geometries).len()
    }

    pub fn geometries(&self) -> Vec<ObjectRef> {
        self.object.get_ref(self.keys.geometries).to_vec()
    }

    pub fn parts(&self) -> Vec<String> {
        self.object.get(self.keys.parts)
    }

    /// Row index of `(geometry, part)`, appending a row when it is new
    pub fn assign(&self, geometry: &ObjectRef, part: &str) -> RdlResult<usize> {
        self.assign_row(geometry, part, "TraceSet")
    }

    fn assign_row(&self, geometry: &ObjectRef, part: &str, kind: &str) -> RdlResult<usize> {
        if !self.object.is_update_active() {
            return Err(RdlError::runtime_error(format!(
                "Can only make assignment ('{}', '{}') in {} '{}' between beginUpdate() and endUpdate() calls.",
                geometry.name(),
                part,
                kind,
                self.object.name()
            )));
        }
        expect_interface(geometry, SceneObjectInterface::GEOMETRY)?;

        let candidates = self.object.get_ref(self.keys.geometries).indices_of(geometry).to_vec();
        {
            let parts = self.object.get_ref(self.keys.parts);
            if let Some(&index) = candidates.iter().find(|&&i| parts.get(i).is_some_and(|p| p == part)) {
                return Ok(index);
            }
        }

        let index = self.object.modify(self.keys.geometries, |geometries| {
            geometries.push(geometry.clone());
            geometries.len() - 1
        })?;
        self.object.modify(self.keys.parts, |parts| {
            parts.resize(index, String::new());
            parts.push(part.to_string());
        })?;
        Ok(index)
    }

    /// Geometry and part of an assignment
    pub fn lookup_geom_and_part(&self, assignment_id: usize) -> RdlResult<(ObjectRef, String)> {
        let geometries = self.geometries();
        match geometries.get(assignment_id) {
            Some(geometry) => {
                let part = self
                    .object
                    .get_ref(self.keys.parts)
                    .get(assignment_id)
                    .cloned()
                    .unwrap_or_default();
                Ok((geometry.clone(), part))
            }
            None => Err(RdlError::index_error(format!(
                "Assignment ID '{}' on trace set '{}' is out of range (contains {} assignments).",
                assignment_id,
                self.object.name(),
                geometries.len()
            ))),
        }
    }

    /// Assignment for `(geometry, part)`, falling back to the geometry's `""` row
    pub fn get_assignment_id(&self, geometry: &ObjectRef, part: &str) -> Option<usize> {
        let candidates = self.object.get_ref(self.keys.geometries).indices_of(geometry).to_vec();
        let parts = self.object.get_ref(self.keys.parts);
        let mut fallback = None;
        for index in candidates {
            match parts.get(index).map(String::as_str) {
                Some(p) if p == part => return Some(index),
                Some("") => fallback = Some(index),
                _ => {}
            }
        }
        fallback
    }

    pub fn contains(&self, geometry: &ObjectRef) -> bool {
        self.object.get_ref(self.keys.geometries).contains(geometry)
    }
}

/// Assignment edits, lookups and update bookkeeping on a layer
pub struct LayerView<'a> {
    trace_set: TraceSetView<'a>,
    keys: LayerKeys,
}

impl<'a> LayerView<'a> {
    pub fn new(object: &'a ObjectRef) -> RdlResult<Self> {
        expect_interface(object, SceneObjectInterface::LAYER)?;
        Ok(Self {
            trace_set: TraceSetView::new(object)?,
            keys: LayerKeys::of(object.scene_class())?,
        })
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.trace_set.object
    }

    pub fn trace_set(&self) -> &TraceSetView<'a> {
        &self.trace_set
    }

    pub fn keys(&self) -> LayerKeys {
        self.keys
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut Layer) -> R) -> RdlResult<R> {
        self.object().with_behavior_mut(f).ok_or_else(|| {
            RdlError::runtime_error(format!(
                "SceneObject '{}' has no layer state attached.",
                self.object().name()
            ))
        })
    }

    fn column(&self, key: AttributeKey<SceneObjectVector>) -> SceneObjectVector {
        self.object().get(key)
    }

    /// Flag every assignment column as set and changed
    fn dirty_assignments(&self) {
        let object = self.object();
        object.mark_attribute_changed(self.trace_set.keys.geometries);
        object.mark_attribute_changed(self.trace_set.keys.parts);
        for key in self.keys.columns() {
            object.mark_attribute_changed(key);
        }
    }

    /// Assign a look to `(geometry, part)` and return the assignment ID
    ///
    /// Volume shaders apply to whole geometries, so a volume assignment
    /// always lands on the geometry's `""` row. Reassigning an identical look
    /// leaves the layer untouched.
    pub fn assign(&self, geometry: &ObjectRef, part: &str, assignment: &LayerAssignment) -> RdlResult<usize> {
        let object = self.object();
        if !object.is_update_active() {
            return Err(RdlError::runtime_error(format!(
                "Can only make assignment ('{}', '{}') in Layer '{}' between beginUpdate() and endUpdate() calls.",
                geometry.name(),
                part,
                object.name()
            )));
        }
        let row = assignment.row();
        for (value, interface) in &row {
            if let Some(value) = value {
                expect_interface(value, *interface)?;
            }
        }

        let part = if assignment.volume_shader.is_some() { "" } else { part };
        let index = self.trace_set.assign_row(geometry, part, "Layer")?;

        let mut changed = false;
        for (key, (value, _)) in self.keys.columns().into_iter().zip(row) {
            changed |= object.modify_untracked(key, |column| {
                if column.len() <= index {
                    column.resize(index + 1, None);
                    column[index] = value.clone();
                    true
                } else if column[index] != *value {
                    column[index] = value.clone();
                    true
                } else {
                    false
                }
            });
        }
        if changed {
            self.dirty_assignments();
        }
        Ok(index)
    }

    /// Remove every assignment
    pub fn clear(&self) -> RdlResult<()> {
        let object = self.object();
        if !object.is_update_active() {
            return Err(RdlError::runtime_error(format!(
                "Layer '{}' can only be cleared between beginUpdate() and endUpdate() calls.",
                object.name()
            )));
        }
        self.with_state(|layer| layer.prim_attributes.clear())?;
        object.modify(self.trace_set.keys.geometries, |geometries| geometries.clear())?;
        object.modify(self.trace_set.keys.parts, Vec::clear)?;
        for key in self.keys.columns() {
            object.modify(key, Vec::clear)?;
        }
        self.dirty_assignments();
        Ok(())
    }

    fn lookup_column(&self, key: AttributeKey<SceneObjectVector>, assignment_id: usize) -> RdlResult<Option<ObjectRef>> {
        let column = self.object().get_ref(key);
        match column.get(assignment_id) {
            Some(value) => Ok(value.clone()),
            None => Err(RdlError::index_error(format!(
                "Assignment ID '{}' on layer '{}' is out of range (contains {} assignments).",
                assignment_id,
                self.object().name(),
                column.len()
            ))),
        }
    }

    pub fn lookup_material(&self, assignment_id: usize) -> RdlResult<Option<ObjectRef>> {
        self.lookup_column(self.keys.surface_shaders, assignment_id)
    }

    pub fn lookup_light_set(&self, assignment_id: usize) -> RdlResult<Option<ObjectRef>> {
        self.lookup_column(self.keys.lightsets, assignment_id)
    }

    pub fn lookup_displacement(&self, assignment_id: usize) -> RdlResult<Option<ObjectRef>> {
        self.lookup_column(self.keys.displacements, assignment_id)
    }

    pub fn lookup_volume_shader(&self, assignment_id: usize) -> RdlResult<Option<ObjectRef>> {
        self.lookup_column(self.keys.volume_shaders, assignment_id)
    }

    pub fn lookup_light_filter_set(&self, assignment_id: usize) -> RdlResult<Option<ObjectRef>> {
        self.lookup_column(self.keys.lightfiltersets, assignment_id)
    }

    pub fn lookup_shadow_set(&self, assignment_id: usize) -> RdlResult<Option<ObjectRef>> {
        self.lookup_column(self.keys.shadowsets, assignment_id)
    }

    pub fn lookup_shadow_receiver_set(&self, assignment_id: usize) -> RdlResult<Option<ObjectRef>> {
        self.lookup_column(self.keys.shadowreceiversets, assignment_id)
    }

    /// The full look of one assignment
    pub fn lookup(&self, assignment_id: usize) -> RdlResult<LayerAssignment> {
        let row = self
            .keys
            .columns()
            .into_iter()
            .map(|key| self.lookup_column(key, assignment_id))
            .collect::<RdlResult<Vec<_>>>()?;
        Ok(LayerAssignment::from_row(row.into_iter()))
    }

    pub fn get_assignment_id(&self, geometry: &ObjectRef, part: &str) -> Option<usize> {
        self.trace_set.get_assignment_id(geometry, part)
    }

    pub fn contains(&self, geometry: &ObjectRef) -> bool {
        self.trace_set.contains(geometry)
    }

    /// Walk the assignment table and schedule the layer
    ///
    /// Prepares every assigned material, volume shader, geometry and
    /// displacement at `depth + 1`, then the light, light filter, shadow and
    /// shadow receiver sets. Records which root shaders changed and which
    /// geometries were changed or deformed, for the scene context and for
    /// [`reset_assignment_updates`](Self::reset_assignment_updates).
    /// Returns whether the layer itself needs an update.
    ///
    /// # Panics
    ///
    /// If called inside an update transaction.
    pub fn update_prep_assignments(
        &self,
        helper: &mut UpdateHelper,
        depth: i32,
        camera: Option<&ObjectRef>,
    ) -> RdlResult<bool> {
        let object = self.object();
        assert!(
            !object.is_update_active(),
            "updatePrepAssignments() called on Layer '{}' while an update is active",
            object.name()
        );

        let mut light_sets_changed = object.has_changed(self.keys.lightsets);
        let mut light_filter_sets_changed = object.has_changed(self.keys.lightfiltersets);
        let mut shadow_sets_changed = object.has_changed(self.keys.shadowsets);
        let mut shadow_receiver_sets_changed = object.has_changed(self.keys.shadowreceiversets);
        let mut changed_root_shaders = HashSet::new();
        let mut changed_or_deformed = HashMap::new();
        let mut changed = false;

        let camera = camera.map(CameraView::new).transpose()?;
        let medium_geometry = camera.as_ref().and_then(|c| c.medium_geometry());

        let geometries = self.trace_set.geometries();
        let surface_shaders = self.column(self.keys.surface_shaders);
        let volume_shaders = self.column(self.keys.volume_shaders);
        let displacements = self.column(self.keys.displacements);

        for (index, geometry) in geometries.iter().enumerate() {
            if medium_geometry.as_ref() == Some(geometry) {
                GeometryView::new(geometry)?.set_contains_camera();
                if camera.as_ref().is_some_and(|c| c.medium_material().is_none()) {
                    warn!(
                        "You must also attach to the Camera the \"medium_material\" you wish to be applied to the medium_geometry."
                    );
                }
            }

            for shader in [surface_shaders.get(index), volume_shaders.get(index)].into_iter().flatten().flatten() {
                if shader.update_prep(helper, depth + 1) {
                    changed_root_shaders.insert(shader.clone());
                    changed_or_deformed.insert(geometry.clone(), index);
                    changed = true;
                }
            }

            if geometry.is_deformed() {
                changed_or_deformed.insert(geometry.clone(), index);
                changed = true;
            } else if geometry.update_prep(helper, depth + 1) {
                if requires_geometry_update(geometry) {
                    changed_or_deformed.insert(geometry.clone(), index);
                }
                changed = true;
            }

            if let Some(Some(displacement)) = displacements.get(index) {
                if displacement.update_prep(helper, depth + 1) {
                    changed_root_shaders.insert(displacement.clone());
                    changed_or_deformed.insert(geometry.clone(), index);
                    // Geometry must be re-tessellated even without its own changes.
                    geometry.request_update();
                    changed = true;
                }
            }
        }

        for light_set in self.column(self.keys.lightsets).iter().flatten() {
            if light_set.update_prep(helper, depth + 1) {
                light_sets_changed = true;
                changed = true;
            }
            for light in LightSetView::new(light_set)?.lights() {
                if LightView::new(&light)?.light_filters_changed() {
                    light_filter_sets_changed = true;
                    changed = true;
                }
            }
        }

        if !light_filter_sets_changed {
            for filter_set in self.column(self.keys.lightfiltersets).iter().flatten() {
                if filter_set.update_prep(helper, depth + 1) {
                    light_filter_sets_changed = true;
                    changed = true;
                }
            }
        }

        for shadow_set in self.column(self.keys.shadowsets).iter().flatten() {
            if LightSetView::new(shadow_set)?.have_lights_changed() {
                shadow_sets_changed = true;
                changed = true;
            }
        }

        for receiver_set in self.column(self.keys.shadowreceiversets).iter().flatten() {
            if GeometrySetView::new(receiver_set)?.have_geometries_changed() {
                shadow_receiver_sets_changed = true;
                changed = true;
            }
        }

        self.with_state(|layer| {
            layer.light_sets_changed = light_sets_changed;
            layer.light_filter_sets_changed = light_filter_sets_changed;
            layer.shadow_sets_changed = shadow_sets_changed;
            layer.shadow_receiver_sets_changed = shadow_receiver_sets_changed;
            layer.changed_root_shaders = changed_root_shaders;
            layer.changed_or_deformed = changed_or_deformed;
        })?;

        Ok(object.update_prep_fast(helper, depth, changed, false))
    }

    /// Forget the last walk's results and clear geometry deformation flags
    pub fn reset_assignment_updates(&self) -> RdlResult<()> {
        let geometries = self.with_state(|layer| {
            layer.prim_attributes.clear();
            layer.light_sets_changed = false;
            layer.changed_root_shaders.clear();
            std::mem::take(&mut layer.changed_or_deformed)
        })?;
        for geometry in geometries.keys().filter(|g| g.is_deformed()) {
            geometry.reset_deformed();
        }
        Ok(())
    }

    /// Geometries whose data or look changed in the last walk, with their
    /// assignment IDs
    pub fn changed_or_deformed_geometries(&self) -> Vec<(ObjectRef, usize)> {
        self.with_state(|layer| {
            layer
                .changed_or_deformed
                .iter()
                .map(|(geometry, &index)| (geometry.clone(), index))
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn changed_root_shaders(&self) -> Vec<ObjectRef> {
        self.with_state(|layer| layer.changed_root_shaders.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn light_sets_changed(&self) -> bool {
        self.with_state(|layer| layer.light_sets_changed).unwrap_or(false)
    }

    pub fn light_filter_sets_changed(&self) -> bool {
        self.with_state(|layer| layer.light_filter_sets_changed).unwrap_or(false)
    }

    pub fn shadow_sets_changed(&self) -> bool {
        self.with_state(|layer| layer.shadow_sets_changed).unwrap_or(false)
    }

    pub fn shadow_receiver_sets_changed(&self) -> bool {
        self.with_state(|layer| layer.shadow_receiver_sets_changed).unwrap_or(false)
    }

    /// Remember the shader graph primitive attributes of every material
    ///
    /// Must run before the pass calls `update()`, which may change them.
    pub fn cache_prim_attributes(&self) -> RdlResult<()> {
        let cache: HashMap<_, _> = self
            .all_materials()
            .into_iter()
            .map(|material| {
                let attributes = shader_graph_prim_attributes(&material);
                (material, attributes)
            })
            .collect();
        self.with_state(|layer| layer.prim_attributes = cache)
    }

    /// Whether `material`'s graph requests different primitive attributes
    /// than when the cache was filled; false for uncached materials
    pub fn prim_attributes_changed(&self, material: &ObjectRef) -> bool {
        let cached = self
            .with_state(|layer| layer.prim_attributes.get(material).cloned())
            .ok()
            .flatten();
        cached.is_some_and(|cached| cached != shader_graph_prim_attributes(material))
    }

    pub fn all_materials(&self) -> HashSet<ObjectRef> {
        self.column(self.keys.surface_shaders).into_iter().flatten().collect()
    }

    /// Every root shader assigned, plus root shaders they reference
    pub fn all_root_shaders(&self) -> HashSet<ObjectRef> {
        let mut shaders = HashSet::new();
        let mut pending: Vec<ObjectRef> = [self.keys.surface_shaders, self.keys.volume_shaders, self.keys.displacements]
            .into_iter()
            .flat_map(|key| self.column(key))
            .flatten()
            .collect();
        while let Some(shader) = pending.pop() {
            if !shaders.insert(shader.clone()) {
                continue;
            }
            for attr in shader.scene_class().attributes() {
                if attr.attribute_type() != AttributeType::SceneObject {
                    continue;
                }
                if let AttributeValue::SceneObject(Some(child)) = shader.get_value(attr, Timestep::Begin) {
                    if child.is_a(SceneObjectInterface::ROOTSHADER) {
                        pending.push(child);
                    }
                }
            }
        }
        shaders
    }

    pub fn all_light_sets(&self) -> HashSet<ObjectRef> {
        self.column(self.keys.lightsets).into_iter().flatten().collect()
    }

    pub fn all_geometries(&self) -> HashSet<ObjectRef> {
        self.trace_set.geometries().into_iter().collect()
    }
}
