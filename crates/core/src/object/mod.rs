//! Scene objects
//!
//! A [`SceneObject`] is one named instance of a [`SceneClass`]: attribute
//! storage laid out by the class, an optional binding per attribute, change
//! tracking masks, and a boxed [`SceneObjectBehavior`] supplied by the class
//! factory.
//!
//! # Change tracking
//!
//! Every object keeps four masks over its attributes:
//!
//! - *set* / *binding set*: written since the last [`SceneObject::commit_changes`],
//!   used by writers to decide what to persist
//! - *update* / *binding update*: changed since the last
//!   [`SceneObject::reset_update`], used by the update pass
//!
//! Attributes and bindings may only be written between
//! [`SceneObject::begin_update`] and [`SceneObject::end_update`].
//!
//! # Update pass
//!
//! [`ObjectRef::update_prep`] walks the object graph formed by object-valued
//! attributes and bindings, recording every object that needs an update in
//! an [`UpdateHelper`] at its deepest depth. The caller then runs
//! [`SceneObject::update`] on leaves first and then deepest level first.

mod behavior;
mod mask;

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard};
use rdl2_sdk::{AttributeType, Lerp, TimeRescalingCoeffs, Timestep};
use tracing::warn;

use crate::attribute::{Attribute, AttributeKey, AttributeValue, AttributeValueType};
use crate::class::{AttributeStorage, SceneClass};
use crate::error::{RdlError, RdlResult};
use crate::interface::{interface_type_name, SceneObjectInterface};
use crate::update_helper::UpdateHelper;

pub use behavior::{AsAny, SceneObjectBehavior};
use mask::AttributeMask;

/// Shared handle to a scene object
///
/// Equality and hashing use object identity, not attribute values.
#[derive(Clone)]
pub struct ObjectRef(Arc<SceneObject>);

impl ObjectRef {
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl Deref for ObjectRef {
    type Target = SceneObject;

    fn deref(&self) -> &SceneObject {
        &self.0
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.name())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) struct ObjectState {
    storage: AttributeStorage,
    bindings: Vec<Option<ObjectRef>>,
    set_mask: AttributeMask,
    binding_set_mask: AttributeMask,
    update_mask: AttributeMask,
    binding_update_mask: AttributeMask,
    update_active: bool,
    dirty: bool,
    update_prep_applied: bool,
    attribute_tree_changed: bool,
    binding_tree_changed: bool,
    update_requested: bool,
    prep_in_progress: bool,
}

impl ObjectState {
    fn update_required(&self) -> bool {
        self.attribute_tree_changed || self.binding_tree_changed || self.update_requested
    }

    fn mark_changed(&mut self, index: usize) {
        self.set_mask.set(index);
        self.update_mask.set(index);
        self.dirty = true;
    }
}

/// One instance of a scene class
pub struct SceneObject {
    // Declared before `class` so a plugin-supplied behavior is dropped while
    // the class (and the library behind its factory) is still alive.
    behavior: Mutex<Option<Box<dyn SceneObjectBehavior>>>,
    state: RwLock<ObjectState>,
    class: Arc<SceneClass>,
    name: String,
    interface: SceneObjectInterface,
}

impl SceneObject {
    pub(crate) fn new(class: Arc<SceneClass>, name: &str, behavior: Box<dyn SceneObjectBehavior>) -> ObjectRef {
        let count = class.attribute_count();
        let mut update_mask = AttributeMask::new(count);
        // Every attribute was just set to its default.
        update_mask.set_all();

        let state = ObjectState {
            storage: class.create_storage(),
            bindings: vec![None; count],
            set_mask: AttributeMask::new(count),
            binding_set_mask: AttributeMask::new(count),
            update_mask,
            binding_update_mask: AttributeMask::new(count),
            update_active: false,
            dirty: true,
            update_prep_applied: false,
            attribute_tree_changed: false,
            binding_tree_changed: false,
            update_requested: false,
            prep_in_progress: false,
        };

        ObjectRef(Arc::new(SceneObject {
            behavior: Mutex::new(Some(behavior)),
            state: RwLock::new(state),
            interface: class.declared_interface(),
            class,
            name: name.to_string(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scene_class(&self) -> &Arc<SceneClass> {
        &self.class
    }

    /// Interfaces this object implements
    pub fn interfaces(&self) -> SceneObjectInterface {
        self.interface
    }

    /// Whether this object implements any of the interfaces in `interface`
    pub fn is_a(&self, interface: SceneObjectInterface) -> bool {
        self.interface.intersects(interface)
    }

    // --- behavior ---
    //
    // Each accessor below locks the behavior. None of them may be called from
    // inside a behavior hook running on the same object.

    /// Borrow the behavior as its concrete type
    pub fn with_behavior<B: SceneObjectBehavior, R>(&self, f: impl FnOnce(&B) -> R) -> Option<R> {
        let guard = self.behavior.lock();
        let result = guard.as_deref().and_then(|b| b.as_any().downcast_ref::<B>()).map(f);
        result
    }

    /// Mutably borrow the behavior as its concrete type
    pub fn with_behavior_mut<B: SceneObjectBehavior, R>(&self, f: impl FnOnce(&mut B) -> R) -> Option<R> {
        let mut guard = self.behavior.lock();
        let result = guard
            .as_deref_mut()
            .and_then(|b| b.as_any_mut().downcast_mut::<B>())
            .map(f);
        result
    }

    /// Whether geometry data was deformed outside the attribute system
    pub fn is_deformed(&self) -> bool {
        self.behavior.lock().as_deref().is_some_and(|b| b.is_deformed())
    }

    pub fn reset_deformed(&self) {
        if let Some(b) = self.behavior.lock().as_deref_mut() {
            b.reset_deformed();
        }
    }

    pub fn update_bake_required(&self) -> bool {
        self.behavior
            .lock()
            .as_deref()
            .is_some_and(|b| b.update_bake_required(self))
    }

    pub fn required_prim_attributes(&self) -> Vec<String> {
        self.behavior
            .lock()
            .as_deref()
            .map(|b| b.required_prim_attributes(self))
            .unwrap_or_default()
    }

    /// Run the behavior's update hook
    ///
    /// Called by the update pass, not by general client code.
    pub fn update(&self) -> RdlResult<()> {
        let mut guard = self.behavior.lock();
        match guard.as_deref_mut() {
            Some(behavior) => behavior.update(self),
            None => Ok(()),
        }
    }

    pub(crate) fn take_behavior(&self) -> Option<Box<dyn SceneObjectBehavior>> {
        self.behavior.lock().take()
    }

    /// Drop every stored reference to other objects
    pub(crate) fn clear_references(&self) {
        let mut state = self.state.write();
        state.storage.clear_objects();
        state.bindings.iter_mut().for_each(|b| *b = None);
    }

    // --- reads ---

    fn typed<'a, T: AttributeValueType>(&self, index: usize, value: &'a AttributeValue) -> &'a T {
        match T::from_value(value) {
            Some(v) => v,
            None => panic!(
                "AttributeKey<{}> used with Attribute '{}' of type '{}' on SceneObject '{}'",
                T::TYPE,
                self.class.attribute_at(index).name(),
                value.attribute_type(),
                self.name
            ),
        }
    }

    /// Value of an attribute (the begin sample when blurrable)
    pub fn get<T: AttributeValueType>(&self, key: AttributeKey<T>) -> T {
        self.get_at(key, Timestep::Begin)
    }

    /// Value at a timestep; non-blurrable attributes ignore the timestep
    pub fn get_at<T: AttributeValueType>(&self, key: AttributeKey<T>, timestep: Timestep) -> T {
        let state = self.state.read();
        self.typed::<T>(key.index(), state.storage.get(key.index(), timestep))
            .clone()
    }

    /// Borrow a value in place, avoiding a clone of large vectors
    pub fn get_ref<T: AttributeValueType>(&self, key: AttributeKey<T>) -> MappedRwLockReadGuard<'_, T> {
        RwLockReadGuard::map(self.state.read(), |state| {
            self.typed::<T>(key.index(), state.storage.get(key.index(), Timestep::Begin))
        })
    }

    /// Motion blurred value at shutter-relative time `t`
    pub fn get_interpolated<T: AttributeValueType + Lerp>(
        &self,
        key: AttributeKey<T>,
        t: f32,
        coeffs: &TimeRescalingCoeffs,
    ) -> T {
        if !key.is_blurrable() {
            return self.get(key);
        }
        let state = self.state.read();
        let begin = self.typed::<T>(key.index(), state.storage.get(key.index(), Timestep::Begin));
        let end = self.typed::<T>(key.index(), state.storage.get(key.index(), Timestep::End));
        begin.lerp(end, coeffs.rescale(t))
    }

    pub fn get_by_name<T: AttributeValueType>(&self, name: &str) -> RdlResult<T> {
        Ok(self.get(self.class.get_attribute_key::<T>(name)?))
    }

    /// Type-erased value at a timestep
    pub fn get_value(&self, attribute: &Attribute, timestep: Timestep) -> AttributeValue {
        self.state.read().storage.get(attribute.index(), timestep).clone()
    }

    /// Objects referenced by object-valued attributes and bindings
    ///
    /// Duplicates are kept; an object bound and stored in the same attribute
    /// appears twice.
    pub fn referenced_objects(&self) -> Vec<ObjectRef> {
        let state = self.state.read();
        let (deps, _) = self.dependencies(&state);
        deps.into_iter().map(|(obj, _)| obj).collect()
    }

    // --- writes ---

    fn not_in_update(&self, index: usize) -> RdlError {
        RdlError::runtime_error(format!(
            "Attribute '{}' of SceneObject '{}' can only be set between beginUpdate() and endUpdate() calls.",
            self.class.attribute_at(index).name(),
            self.name
        ))
    }

    fn check_object_types(&self, index: usize, value: &AttributeValue) -> RdlResult<()> {
        let attr = self.class.attribute_at(index);
        let allowed = attr.object_type();
        let mismatch = |obj: &ObjectRef, in_vector: bool| {
            let what = if in_vector {
                format!("an element in the vector, SceneObject '{}'", obj.name())
            } else {
                format!("object '{}'", obj.name())
            };
            RdlError::type_error(format!(
                "Attribute '{}' only allows values of type '{}', but {} is type '{}'.",
                attr.name(),
                interface_type_name(allowed),
                what,
                interface_type_name(obj.interfaces())
            ))
        };

        match value {
            AttributeValue::SceneObject(Some(obj)) if !obj.is_a(allowed) => Err(mismatch(obj, false)),
            AttributeValue::SceneObjectVector(objs) => {
                match objs.iter().flatten().find(|obj| !obj.is_a(allowed)) {
                    Some(obj) => Err(mismatch(obj, true)),
                    None => Ok(()),
                }
            }
            AttributeValue::SceneObjectIndexable(objs) => match objs.iter().find(|obj| !obj.is_a(allowed)) {
                Some(obj) => Err(mismatch(obj, true)),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn set_value(&self, index: usize, timestep: Option<Timestep>, value: AttributeValue) -> RdlResult<()> {
        let mut state = self.state.write();
        if !state.update_active {
            return Err(self.not_in_update(index));
        }
        self.check_object_types(index, &value)?;
        if state.storage.set(index, timestep, value) {
            state.mark_changed(index);
        }
        Ok(())
    }

    /// Set every sample of an attribute
    ///
    /// Only marks the attribute changed when the stored value differs.
    pub fn set<T: AttributeValueType>(&self, key: AttributeKey<T>, value: T) -> RdlResult<()> {
        self.set_value(key.index(), None, value.into_value())
    }

    /// Set one sample of a blurrable attribute
    pub fn set_at<T: AttributeValueType>(&self, key: AttributeKey<T>, value: T, timestep: Timestep) -> RdlResult<()> {
        self.set_value(key.index(), Some(timestep), value.into_value())
    }

    pub fn set_by_name<T: AttributeValueType>(&self, name: &str, value: T) -> RdlResult<()> {
        self.set(self.class.get_attribute_key::<T>(name)?, value)
    }

    /// Set a type-erased value, checking it against the attribute's type
    pub fn set_attribute_value(&self, attribute: &Attribute, value: AttributeValue) -> RdlResult<()> {
        if value.attribute_type() != attribute.attribute_type() {
            return Err(RdlError::type_error(format!(
                "Cannot set Attribute '{}' of type '{}' from a value of type '{}'.",
                attribute.name(),
                attribute.attribute_type(),
                value.attribute_type()
            )));
        }
        self.set_value(attribute.index(), None, value)
    }

    /// Edit a value in place
    ///
    /// Like [`set`](Self::set), the attribute is only marked changed when the
    /// edit leaves a different value behind.
    pub fn modify<T: AttributeValueType, R>(&self, key: AttributeKey<T>, f: impl FnOnce(&mut T) -> R) -> RdlResult<R> {
        let mut state = self.state.write();
        if !state.update_active {
            return Err(self.not_in_update(key.index()));
        }
        let index = key.index();
        let before = self.typed::<T>(index, state.storage.get(index, Timestep::Begin)).clone();
        let result = self.edit_slot(&mut state, key, f);
        if *self.typed::<T>(index, state.storage.get(index, Timestep::Begin)) != before {
            state.mark_changed(index);
        }
        Ok(result)
    }

    /// Edit a value in place without transaction checks or change tracking
    ///
    /// For behaviors normalizing their own data during `update()`.
    pub(crate) fn modify_untracked<T: AttributeValueType, R>(&self, key: AttributeKey<T>, f: impl FnOnce(&mut T) -> R) -> R {
        let mut state = self.state.write();
        self.edit_slot(&mut state, key, f)
    }

    fn edit_slot<T: AttributeValueType, R>(&self, state: &mut ObjectState, key: AttributeKey<T>, f: impl FnOnce(&mut T) -> R) -> R {
        let value = state.storage.get_mut(key.index(), Timestep::Begin);
        let actual = value.attribute_type();
        match T::from_value_mut(value) {
            Some(v) => f(v),
            None => panic!(
                "AttributeKey<{}> used with Attribute '{}' of type '{}' on SceneObject '{}'",
                T::TYPE,
                self.class.attribute_at(key.index()).name(),
                actual,
                self.name
            ),
        }
    }

    /// Flag an attribute as changed without touching its value
    pub fn mark_attribute_changed<T>(&self, key: AttributeKey<T>) {
        self.state.write().mark_changed(key.index());
    }

    // --- bindings ---

    /// Bind `target` to a bindable attribute, or clear the binding with `None`
    pub fn set_binding<T>(&self, key: AttributeKey<T>, target: Option<&ObjectRef>) -> RdlResult<()> {
        self.set_binding_at(self.class.attribute(key), target)
    }

    pub fn set_binding_by_name(&self, name: &str, target: Option<&ObjectRef>) -> RdlResult<()> {
        self.set_binding_at(self.class.get_attribute(name)?, target)
    }

    fn set_binding_at(&self, attr: &Attribute, target: Option<&ObjectRef>) -> RdlResult<()> {
        let mut state = self.state.write();
        if !state.update_active {
            return Err(RdlError::runtime_error(format!(
                "Attribute '{}' of SceneObject '{}' can only be bound between beginUpdate() and endUpdate() calls.",
                attr.name(),
                self.name
            )));
        }
        if !attr.is_bindable() {
            return Err(RdlError::runtime_error(format!(
                "Cannot set binding for Attribute '{}' on SceneObject '{}' because it is not bindable.",
                attr.name(),
                self.name
            )));
        }
        if let Some(obj) = target {
            if !obj.is_a(attr.object_type()) {
                return Err(RdlError::type_error(format!(
                    "Cannot bind SceneObject '{}' (of type '{}') to Attribute '{}' on SceneObject '{}' because it expects bound objects of type '{}'.",
                    obj.name(),
                    interface_type_name(obj.interfaces()),
                    attr.name(),
                    self.name,
                    interface_type_name(attr.object_type())
                )));
            }
        }

        let index = attr.index();
        state.bindings[index] = target.cloned();
        state.binding_set_mask.set(index);
        state.binding_update_mask.set(index);
        state.dirty = true;
        Ok(())
    }

    pub fn get_binding<T>(&self, key: AttributeKey<T>) -> RdlResult<Option<ObjectRef>> {
        self.get_binding_at(self.class.attribute(key))
    }

    pub fn get_binding_by_name(&self, name: &str) -> RdlResult<Option<ObjectRef>> {
        self.get_binding_at(self.class.get_attribute(name)?)
    }

    fn get_binding_at(&self, attr: &Attribute) -> RdlResult<Option<ObjectRef>> {
        if !attr.is_bindable() {
            return Err(RdlError::runtime_error(format!(
                "Cannot get binding for Attribute '{}' on SceneObject '{}' because it is not bindable.",
                attr.name(),
                self.name
            )));
        }
        Ok(self.state.read().bindings[attr.index()].clone())
    }

    // --- defaults ---

    pub fn reset_to_default<T>(&self, key: AttributeKey<T>) -> RdlResult<()> {
        self.reset_attribute(self.class.attribute(key))
    }

    pub fn reset_to_default_by_name(&self, name: &str) -> RdlResult<()> {
        self.reset_attribute(self.class.get_attribute(name)?)
    }

    /// Restore every attribute's default value
    pub fn reset_all_to_default(&self) -> RdlResult<()> {
        for attr in self.class.attributes() {
            self.reset_attribute(attr)?;
        }
        Ok(())
    }

    fn reset_attribute(&self, attr: &Attribute) -> RdlResult<()> {
        self.set_value(attr.index(), None, attr.default_attribute_value().clone())
    }

    /// Whether every sample of the attribute holds its default
    pub fn is_default(&self, attr: &Attribute) -> bool {
        self.state
            .read()
            .storage
            .all_equal(attr.index(), attr.default_attribute_value())
    }

    pub fn is_default_and_unbound(&self, attr: &Attribute) -> bool {
        if attr.is_bindable() && self.state.read().bindings[attr.index()].is_some() {
            return false;
        }
        self.is_default(attr)
    }

    // --- transactions ---

    /// Open an update transaction
    ///
    /// # Panics
    ///
    /// If a transaction is already open on this object.
    pub fn begin_update(&self) {
        let mut state = self.state.write();
        assert!(
            !state.update_active,
            "beginUpdate() called on SceneObject '{}' while an update is already active",
            self.name
        );
        state.update_active = true;
    }

    /// Close the current update transaction
    ///
    /// # Panics
    ///
    /// If no transaction is open on this object.
    pub fn end_update(&self) {
        let mut state = self.state.write();
        assert!(
            state.update_active,
            "endUpdate() called on SceneObject '{}' without a matching beginUpdate()",
            self.name
        );
        state.update_active = false;
    }

    pub fn is_update_active(&self) -> bool {
        self.state.read().update_active
    }

    // --- change tracking ---

    /// Changed since the last update pass was reset
    pub fn has_changed<T>(&self, key: AttributeKey<T>) -> bool {
        self.state.read().update_mask.test(key.index())
    }

    pub fn has_binding_changed<T>(&self, key: AttributeKey<T>) -> bool {
        self.state.read().binding_update_mask.test(key.index())
    }

    /// Whether any changed attribute satisfies `pred`
    pub fn any_attribute_changed(&self, pred: impl Fn(&Attribute) -> bool) -> bool {
        let state = self.state.read();
        let changed = state
            .update_mask
            .iter_ones()
            .any(|index| pred(self.class.attribute_at(index)));
        changed
    }

    /// Written since the last commit
    pub fn is_attribute_set<T>(&self, key: AttributeKey<T>) -> bool {
        self.state.read().set_mask.test(key.index())
    }

    pub fn is_binding_set<T>(&self, key: AttributeKey<T>) -> bool {
        self.state.read().binding_set_mask.test(key.index())
    }

    /// Attributes written since the last commit, in declaration order
    pub fn attributes_set(&self) -> Vec<&Attribute> {
        let state = self.state.read();
        let attributes = state
            .set_mask
            .iter_ones()
            .map(|index| self.class.attribute_at(index))
            .collect();
        attributes
    }

    /// Attributes whose binding was written since the last commit
    pub fn bindings_set(&self) -> Vec<&Attribute> {
        let state = self.state.read();
        let attributes = state
            .binding_set_mask
            .iter_ones()
            .map(|index| self.class.attribute_at(index))
            .collect();
        attributes
    }

    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    /// Clear the written-since-commit masks and the dirty flag
    ///
    /// # Panics
    ///
    /// If called inside an update transaction.
    pub fn commit_changes(&self) {
        let mut state = self.state.write();
        assert!(
            !state.update_active,
            "Cannot commit changes while an update is active on SceneObject '{}'",
            self.name
        );
        state.set_mask.reset();
        state.binding_set_mask.reset();
        state.dirty = false;
    }

    /// Force the next update pass to include this object
    pub fn request_update(&self) {
        self.state.write().update_requested = true;
    }

    pub fn update_prep_applied(&self) -> bool {
        self.state.read().update_prep_applied
    }

    pub fn attribute_tree_changed(&self) -> bool {
        self.state.read().attribute_tree_changed
    }

    pub fn binding_tree_changed(&self) -> bool {
        self.state.read().binding_tree_changed
    }

    /// Whether this object needs an update in the current pass
    ///
    /// # Panics
    ///
    /// If `update_prep` has not run since the last reset.
    pub fn update_required(&self) -> bool {
        let state = self.state.read();
        assert!(
            state.update_prep_applied,
            "updateRequired() needs to be called after updatePrep() on SceneObject '{}'",
            self.name
        );
        state.update_required()
    }

    /// Clear per-pass state so the next `update_prep` starts fresh
    ///
    /// No-op when `update_prep` has not run since the last reset.
    ///
    /// # Panics
    ///
    /// If called inside an update transaction.
    pub fn reset_update(&self) {
        let mut state = self.state.write();
        assert!(
            !state.update_active,
            "resetUpdate() called on SceneObject '{}' while an update is active",
            self.name
        );
        if state.update_prep_applied {
            state.update_prep_applied = false;
            state.attribute_tree_changed = false;
            state.binding_tree_changed = false;
            state.update_requested = false;
            state.update_mask.reset();
            state.binding_update_mask.reset();
        }
    }

    // --- logging ---

    pub fn debug(&self, message: impl fmt::Display) {
        tracing::debug!(object = %self.name, class = %self.class.name(), "{}", message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        tracing::info!(object = %self.name, class = %self.class.name(), "{}", message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        tracing::warn!(object = %self.name, class = %self.class.name(), "{}", message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        tracing::error!(object = %self.name, class = %self.class.name(), "{}", message);
    }

    /// Objects referenced by object-valued attributes and bindings, with a
    /// flag marking bindings, plus whether the object is a leaf
    fn dependencies(&self, state: &ObjectState) -> (Vec<(ObjectRef, bool)>, bool) {
        let mut deps = Vec::new();
        let mut is_leaf = true;
        for attr in self.class.attributes() {
            let index = attr.index();
            match attr.attribute_type() {
                AttributeType::SceneObject => {
                    state.storage.get(index, Timestep::Begin).for_each_object(|obj| {
                        is_leaf = false;
                        deps.push((obj.clone(), false));
                    });
                }
                AttributeType::SceneObjectVector | AttributeType::SceneObjectIndexable => {
                    is_leaf = false;
                    state
                        .storage
                        .get(index, Timestep::Begin)
                        .for_each_object(|obj| deps.push((obj.clone(), false)));
                }
                _ => {}
            }
            if attr.is_bindable() {
                if let Some(bound) = &state.bindings[index] {
                    is_leaf = false;
                    deps.push((bound.clone(), true));
                }
            }
        }
        (deps, is_leaf)
    }
}

impl ObjectRef {
    /// Walk this object's dependencies and schedule it if anything changed
    ///
    /// Returns whether this object needs an update. Repeated visits at the
    /// same or a shallower depth return the cached answer. Re-entering an
    /// object whose walk is still in progress (a reference cycle) logs a
    /// warning and treats that edge as unchanged.
    ///
    /// # Panics
    ///
    /// If called inside an update transaction.
    pub fn update_prep(&self, helper: &mut UpdateHelper, depth: i32) -> bool {
        let (deps, is_leaf) = {
            let mut state = self.state.write();
            assert!(
                !state.update_active,
                "updatePrep() called on SceneObject '{}' while an update is active",
                self.name
            );
            if state.prep_in_progress {
                drop(state);
                warn!(object = %self.name, "Reference cycle detected during updatePrep(), ignoring back edge");
                return false;
            }
            if state.update_prep_applied && (helper.get_depth(self) >= depth || helper.is_leaf(self)) {
                return state.update_required();
            }
            state.update_prep_applied = true;
            state.attribute_tree_changed = state.update_mask.any();
            state.binding_tree_changed = state.binding_update_mask.any();

            let deps = self.dependencies(&state);
            state.prep_in_progress = true;
            deps
        };

        let mut attribute_changed = false;
        let mut binding_changed = false;
        for (dep, via_binding) in &deps {
            let changed = dep.update_prep(helper, depth + 1);
            if *via_binding {
                binding_changed |= changed;
            } else {
                attribute_changed |= changed;
            }
        }

        let required = {
            let mut state = self.state.write();
            state.prep_in_progress = false;
            state.attribute_tree_changed |= attribute_changed;
            state.binding_tree_changed |= binding_changed;
            state.update_required()
        };

        if required {
            if is_leaf {
                helper.insert_leaf(self.clone());
            } else {
                helper.insert(self.clone(), depth);
            }
        }
        required
    }

    /// Schedule this object from precomputed tree flags, without recursing
    ///
    /// Used by set-like objects whose dependencies were already walked.
    /// Returns whether this object needs an update.
    pub fn update_prep_fast(
        &self,
        helper: &mut UpdateHelper,
        depth: i32,
        attribute_tree_changed: bool,
        binding_tree_changed: bool,
    ) -> bool {
        let required = {
            let mut state = self.state.write();
            assert!(
                !state.update_active,
                "updatePrep() called on SceneObject '{}' while an update is active",
                self.name
            );
            if state.update_prep_applied && (helper.get_depth(self) >= depth || helper.is_leaf(self)) {
                return state.update_required();
            }
            state.update_prep_applied = true;
            state.attribute_tree_changed = attribute_tree_changed || state.update_mask.any();
            state.binding_tree_changed = binding_tree_changed || state.binding_update_mask.any();
            state.update_required()
        };
        if required {
            helper.insert(self.clone(), depth);
        }
        required
    }

    /// This object plus everything reachable through bindings
    ///
    /// An unbound `SceneObject` attribute is followed through its value.
    pub fn binding_transitive_closure(&self) -> HashSet<ObjectRef> {
        let mut result = HashSet::new();
        let mut pending = vec![self.clone()];
        while let Some(obj) = pending.pop() {
            if !result.insert(obj.clone()) {
                continue;
            }
            let state = obj.state.read();
            for attr in obj.class.attributes() {
                let index = attr.index();
                let child = state.bindings[index].clone().or_else(|| {
                    match state.storage.get(index, Timestep::Begin) {
                        AttributeValue::SceneObject(value) => value.clone(),
                        _ => None,
                    }
                });
                if let Some(child) = child {
                    if !result.contains(&child) {
                        pending.push(child);
                    }
                }
            }
        }
        result
    }

    /// Run a complete update pass rooted at this object
    ///
    /// Leaves are updated first, then each depth from deepest to shallowest.
    pub fn apply_updates(&self) -> RdlResult<()> {
        let mut helper = UpdateHelper::new();
        self.update_prep(&mut helper, 0);
        helper.run_updates(|objects| {
            for obj in objects {
                obj.debug("Updating");
                obj.update()?;
            }
            Ok(())
        })
    }
}

/// Scoped update transaction
///
/// Opens the transaction on construction and closes it on drop, including
/// when an error is propagated out of the scope.
pub struct UpdateGuard<'a> {
    object: &'a SceneObject,
}

impl<'a> UpdateGuard<'a> {
    pub fn new(object: &'a SceneObject) -> Self {
        object.begin_update();
        Self { object }
    }
}

impl Deref for UpdateGuard<'_> {
    type Target = SceneObject;

    fn deref(&self) -> &SceneObject {
        self.object
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.object.end_update();
    }
}

impl fmt::Debug for SceneObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneObject")
            .field("name", &self.name)
            .field("class", &self.class.name())
            .field("interface", &self.interface)
            .finish()
    }
}
