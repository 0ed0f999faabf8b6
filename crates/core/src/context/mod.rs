//! Scene context: class and object registries plus the per-frame update pass
//!
//! A [`SceneContext`] owns every [`SceneClass`] and [`SceneObject`] of one
//! scene. Classes and objects are looked up by name in concurrent maps, so
//! scene loaders may create objects from many threads at once. Creation of a
//! given name is serialized by the map's per-shard lock: the first caller
//! builds the class or object, and racing callers read back its result. A
//! failed declare or create leaves no entry behind, so the name stays usable.
//!
//! The context also keeps creation-ordered lists of cameras, geometries,
//! geometry sets and render outputs, which the update pass and renderers
//! iterate.
//!
//! # Example
//!
//! ```ignore
//! let context = SceneContext::new();
//! let camera = context.create_scene_object("PerspectiveCamera", "/cam")?;
//! let layer = context.create_scene_object("Layer", "/layer")?;
//!
//! // ... edit objects inside begin_update()/end_update() ...
//!
//! context.apply_updates(Some(&layer))?;
//! context.reset_updates(Some(&layer))?;
//! ```

mod update;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rdl2_engine::{class_name_from_file_name, find_dso_path, is_valid_dso};
use rdl2_sdk::TimeRescalingCoeffs;
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, info, warn};

use crate::builtin::{
    self, RenderOutputView, SceneVariables, SceneVariablesView, SCENE_VARIABLES_NAME,
};
use crate::class::SceneClass;
use crate::config::ContextConfig;
use crate::error::{RdlError, RdlResult};
use crate::factory::{BuiltinFactory, DsoFactory, ObjectFactory, ProxyFactory};
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObject};
use crate::update_helper::UpdateHelper;

new_key_type! {
    /// Key for registered object callbacks, used for removal
    pub struct CallbackKey;
}

/// Callback run on object creation or deletion
pub type ObjectCallback = Arc<dyn Fn(&ObjectRef) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CallbackKind {
    Create,
    Delete,
}

/// Objects of the interfaces the context tracks separately, in creation order
#[derive(Default)]
struct SideVectors {
    cameras: Vec<ObjectRef>,
    geometries: Vec<ObjectRef>,
    geometry_sets: Vec<ObjectRef>,
    render_outputs: Vec<ObjectRef>,
}

/// Registry and update orchestration for one scene
pub struct SceneContext {
    classes: DashMap<String, Arc<SceneClass>>,
    objects: DashMap<String, ObjectRef>,
    factories: DashMap<String, Arc<dyn ObjectFactory>>,
    side: Mutex<SideVectors>,
    scene_variables: ObjectRef,
    coeffs: Mutex<TimeRescalingCoeffs>,
    update_graph: Mutex<UpdateHelper>,
    callbacks: RwLock<SlotMap<CallbackKey, (CallbackKind, ObjectCallback)>>,
    dso_path: RwLock<String>,
    proxy_mode: RwLock<bool>,
    pool: Option<rayon::ThreadPool>,
}

/// Declare a class the context cannot run without
///
/// # Panics
///
/// If the kind fails to declare; built-in declarations are fixed at compile
/// time.
fn declare_builtin(name: &str, factory: Arc<dyn ObjectFactory>) -> Arc<SceneClass> {
    let mut class = SceneClass::new(name, factory);
    if let Err(e) = class.declare() {
        panic!("Built-in SceneClass '{}' failed to declare: {}", name, e);
    }
    Arc::new(class)
}

fn verify_matching_class(class_name: &str, object: &ObjectRef) -> RdlResult<()> {
    let existing = object.scene_class().name();
    if class_name == existing {
        Ok(())
    } else {
        Err(RdlError::type_error(format!(
            "Cannot create new SceneObject of SceneClass '{}' because '{}' of SceneClass '{}' already exists.",
            class_name,
            object.name(),
            existing
        )))
    }
}

impl SceneContext {
    /// Create a context holding the built-in classes and the scene variables
    pub fn new() -> Self {
        let classes = DashMap::new();
        let variables_class = declare_builtin("SceneVariables", BuiltinFactory::<SceneVariables>::shared());
        classes.insert("SceneVariables".to_string(), Arc::clone(&variables_class));
        for (name, factory) in builtin::context_classes() {
            classes
                .entry(name.to_string())
                .or_insert_with(|| declare_builtin(name, factory));
        }

        let scene_variables = match variables_class.create_object(SCENE_VARIABLES_NAME) {
            Ok(object) => object,
            Err(e) => panic!("Failed to create '{}': {}", SCENE_VARIABLES_NAME, e),
        };
        let objects = DashMap::new();
        objects.insert(SCENE_VARIABLES_NAME.to_string(), scene_variables.clone());

        let context = Self {
            classes,
            objects,
            factories: DashMap::new(),
            side: Mutex::new(SideVectors::default()),
            scene_variables,
            coeffs: Mutex::new(TimeRescalingCoeffs::default()),
            update_graph: Mutex::new(UpdateHelper::new()),
            callbacks: RwLock::new(SlotMap::with_key()),
            dso_path: RwLock::new(find_dso_path()),
            proxy_mode: RwLock::new(false),
            pool: None,
        };
        context.compute_time_rescaling_coeffs(0.0, 0.0);
        context
    }

    /// Create a context with the DSO path, proxy mode and worker pool from `config`
    pub fn with_config(config: &ContextConfig) -> RdlResult<Self> {
        let mut context = Self::new();
        if let Some(extra) = config.dso_path.as_deref().filter(|p| !p.is_empty()) {
            let found = context.dso_path();
            context.set_dso_path(format!("{}:{}", extra, found));
        }
        context.set_proxy_mode_enabled(config.proxy_mode);
        if config.update_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.update_threads)
                .thread_name(|i| format!("rdl2-update-{}", i))
                .build()
                .map_err(|e| RdlError::runtime_error(format!("Failed to build update thread pool: {}", e)))?;
            context.pool = Some(pool);
        }
        debug!(
            dso_path = %context.dso_path(),
            proxy_mode = config.proxy_mode,
            update_threads = config.update_threads,
            "Created SceneContext from config"
        );
        Ok(context)
    }

    // --- classes ---

    /// Install a statically linked factory for `class_name`
    ///
    /// Takes precedence over DSO lookup when the class is first created.
    pub fn register_scene_class_factory(&self, class_name: &str, factory: Arc<dyn ObjectFactory>) -> RdlResult<()> {
        if self.classes.contains_key(class_name) {
            return Err(RdlError::key_error(format!(
                "SceneClass '{}' already exists in the SceneContext.",
                class_name
            )));
        }
        self.factories.insert(class_name.to_string(), factory);
        Ok(())
    }

    fn factory_for(&self, class_name: &str) -> RdlResult<Arc<dyn ObjectFactory>> {
        if let Some(factory) = self.factories.get(class_name).map(|f| Arc::clone(f.value())) {
            return Ok(factory);
        }
        let dso_path = self.dso_path();
        // SAFETY: plugins are expected to be built with `rdl2_dso_class!`
        // against this crate; see `DsoFactory::load`.
        let factory: Arc<dyn ObjectFactory> = if self.proxy_mode_enabled() {
            Arc::new(unsafe { ProxyFactory::load(class_name, &dso_path)? })
        } else {
            Arc::new(unsafe { DsoFactory::load(class_name, &dso_path)? })
        };
        Ok(factory)
    }

    /// Return the class named `class_name`, declaring it first if needed
    ///
    /// The declare step runs under the registry's exclusive slot for this
    /// name and must not create the same class recursively.
    #[tracing::instrument(skip_all, fields(class = %class_name))]
    pub fn create_scene_class(&self, class_name: &str) -> RdlResult<Arc<SceneClass>> {
        if class_name.is_empty() {
            return Err(RdlError::value_error("Cannot create a SceneClass with an empty class name."));
        }

        if let Some(class) = self.classes.get(class_name).map(|c| Arc::clone(c.value())) {
            return Ok(class);
        }

        match self.classes.entry(class_name.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                // Dropping the vacant entry on error rolls back the reservation.
                let mut class = SceneClass::new(class_name, self.factory_for(class_name)?);
                class.declare()?;
                let class = Arc::new(class);
                entry.insert(Arc::clone(&class));
                info!(source = %class.source_path(), "Created SceneClass");
                Ok(class)
            }
        }
    }

    pub fn scene_class(&self, name: &str) -> RdlResult<Arc<SceneClass>> {
        self.classes
            .get(name)
            .map(|c| Arc::clone(c.value()))
            .ok_or_else(|| RdlError::key_error(format!("No SceneClass named '{}' in the SceneContext.", name)))
    }

    pub fn scene_class_exists(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Every class, sorted by name
    pub fn scene_classes(&self) -> Vec<Arc<SceneClass>> {
        let mut classes: Vec<_> = self.classes.iter().map(|c| Arc::clone(c.value())).collect();
        classes.sort_by(|a, b| a.name().cmp(b.name()));
        classes
    }

    /// Create a class for every valid plugin on the DSO path
    ///
    /// A plugin that fails to load or declare is logged and skipped.
    #[tracing::instrument(skip_all)]
    pub fn load_all_scene_classes(&self) {
        let proxy = self.proxy_mode_enabled();
        let dso_path = self.dso_path();
        for directory in dso_path.split(':').filter(|d| !d.is_empty()) {
            let Ok(entries) = std::fs::read_dir(directory) else {
                debug!(directory, "Skipping unreadable DSO directory");
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !is_valid_dso(&path, proxy) {
                    continue;
                }
                let Some(class_name) = class_name_from_file_name(&path) else {
                    continue;
                };
                if let Err(e) = self.create_scene_class(&class_name) {
                    warn!(class = %class_name, "Skipping SceneClass: {}", e);
                }
            }
        }
    }

    // --- objects ---

    /// Return the object named `object_name`, creating it first if needed
    ///
    /// Requests for a `SceneVariables` object under any other name return the
    /// context's one scene variables object. An existing object of a
    /// different class is a type error.
    #[tracing::instrument(skip_all, fields(class = %class_name, object = %object_name))]
    pub fn create_scene_object(&self, class_name: &str, object_name: &str) -> RdlResult<ObjectRef> {
        if class_name.is_empty() {
            return Err(RdlError::value_error("Cannot create a SceneObject with an empty class name."));
        }
        if object_name.is_empty() {
            return Err(RdlError::value_error("Cannot create a SceneObject with an empty object name."));
        }

        if class_name == "SceneVariables" && object_name != SCENE_VARIABLES_NAME {
            return Ok(self.scene_variables.clone());
        }

        if let Some(object) = self.objects.get(object_name).map(|o| o.value().clone()) {
            verify_matching_class(class_name, &object)?;
            return Ok(object);
        }

        let class = self.create_scene_class(class_name)?;

        let object = match self.objects.entry(object_name.to_string()) {
            Entry::Occupied(entry) => {
                let object = entry.get().clone();
                drop(entry);
                verify_matching_class(class_name, &object)?;
                return Ok(object);
            }
            Entry::Vacant(entry) => {
                let object = class.create_object(object_name)?;
                entry.insert(object.clone());
                object
            }
        };

        {
            let mut side = self.side.lock();
            if object.is_a(SceneObjectInterface::GEOMETRY) {
                side.geometries.push(object.clone());
            } else if object.is_a(SceneObjectInterface::GEOMETRYSET) {
                side.geometry_sets.push(object.clone());
            } else if object.is_a(SceneObjectInterface::CAMERA) {
                side.cameras.push(object.clone());
            } else if object.is_a(SceneObjectInterface::RENDEROUTPUT) {
                side.render_outputs.push(object.clone());
            }
        }

        self.run_callbacks(CallbackKind::Create, &object);
        Ok(object)
    }

    /// Look up an existing object; unlike `create_scene_object` this never
    /// creates one. Unknown names are a key error.
    pub fn scene_object(&self, name: &str) -> RdlResult<ObjectRef> {
        self.objects
            .get(name)
            .map(|o| o.value().clone())
            .ok_or_else(|| RdlError::key_error(format!("No SceneObject named '{}' in the SceneContext.", name)))
    }

    pub fn scene_object_exists(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Every object, sorted by name
    pub fn scene_objects(&self) -> Vec<ObjectRef> {
        let mut objects: Vec<_> = self.objects.iter().map(|o| o.value().clone()).collect();
        objects.sort_by(|a, b| a.name().cmp(b.name()));
        objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn scene_variables(&self) -> &ObjectRef {
        &self.scene_variables
    }

    fn variables(&self) -> SceneVariablesView<'_> {
        match SceneVariablesView::new(&self.scene_variables) {
            Ok(view) => view,
            Err(e) => panic!("'{}' is not a SceneVariables object: {}", SCENE_VARIABLES_NAME, e),
        }
    }

    // --- cameras and other tracked objects ---

    /// The scene variables' camera, or else the first camera created
    pub fn primary_camera(&self) -> Option<ObjectRef> {
        let side = self.side.lock();
        Self::primary_of(&side, self.variables().camera())
    }

    fn primary_of(side: &SideVectors, configured: Option<ObjectRef>) -> Option<ObjectRef> {
        let first = side.cameras.first()?;
        Some(configured.unwrap_or_else(|| first.clone()))
    }

    /// All cameras, primary first, then the rest in creation order
    pub fn cameras(&self) -> Vec<ObjectRef> {
        let configured = self.variables().camera();
        let side = self.side.lock();
        let Some(primary) = Self::primary_of(&side, configured) else {
            return Vec::new();
        };
        let rest = side.cameras.iter().filter(|c| **c != primary).cloned();
        std::iter::once(primary.clone()).chain(rest).collect()
    }

    /// The primary camera plus every other camera some render output uses
    pub fn active_cameras(&self) -> Vec<ObjectRef> {
        let configured = self.variables().camera();
        let side = self.side.lock();
        let Some(primary) = Self::primary_of(&side, configured) else {
            return Vec::new();
        };
        let output_cameras: Vec<ObjectRef> = side
            .render_outputs
            .iter()
            .filter_map(|output| RenderOutputView::new(output).ok()?.camera())
            .collect();
        let rest = side
            .cameras
            .iter()
            .filter(|c| **c != primary && output_cameras.contains(c))
            .cloned();
        std::iter::once(primary.clone()).chain(rest).collect()
    }

    pub fn dicing_camera(&self) -> Option<ObjectRef> {
        self.variables().dicing_camera()
    }

    pub fn geometries(&self) -> Vec<ObjectRef> {
        self.side.lock().geometries.clone()
    }

    pub fn geometry_sets(&self) -> Vec<ObjectRef> {
        self.side.lock().geometry_sets.clone()
    }

    pub fn render_outputs(&self) -> Vec<ObjectRef> {
        self.side.lock().render_outputs.clone()
    }

    // --- settings ---

    pub fn dso_path(&self) -> String {
        self.dso_path.read().clone()
    }

    pub fn set_dso_path(&self, dso_path: impl Into<String>) {
        *self.dso_path.write() = dso_path.into();
    }

    pub fn proxy_mode_enabled(&self) -> bool {
        *self.proxy_mode.read()
    }

    pub fn set_proxy_mode_enabled(&self, enabled: bool) {
        *self.proxy_mode.write() = enabled;
    }

    pub fn time_rescaling_coeffs(&self) -> TimeRescalingCoeffs {
        *self.coeffs.lock()
    }

    /// Recompute the coefficients from a shutter interval and the scene's
    /// motion steps
    fn compute_time_rescaling_coeffs(&self, shutter_open: f32, shutter_close: f32) {
        let steps = self.variables().motion_steps();
        let coeffs = TimeRescalingCoeffs::from_shutter(shutter_open, shutter_close, &steps).unwrap_or_else(|| {
            warn!(
                "Expected 1 or 2 motion steps, found {}; motion blur interpolation is disabled",
                steps.len()
            );
            TimeRescalingCoeffs::default()
        });
        *self.coeffs.lock() = coeffs;
    }

    // --- callbacks ---

    /// Run `callback` after each new object is created
    pub fn add_create_scene_object_callback(&self, callback: impl Fn(&ObjectRef) + Send + Sync + 'static) -> CallbackKey {
        let callback: ObjectCallback = Arc::new(callback);
        self.callbacks.write().insert((CallbackKind::Create, callback))
    }

    /// Run `callback` for each object when the context is dropped
    pub fn add_delete_scene_object_callback(&self, callback: impl Fn(&ObjectRef) + Send + Sync + 'static) -> CallbackKey {
        let callback: ObjectCallback = Arc::new(callback);
        self.callbacks.write().insert((CallbackKind::Delete, callback))
    }

    /// Returns `true` if the callback was found and removed
    pub fn remove_scene_object_callback(&self, key: CallbackKey) -> bool {
        self.callbacks.write().remove(key).is_some()
    }

    fn run_callbacks(&self, kind: CallbackKind, object: &ObjectRef) {
        // Snapshot so callbacks may register or remove callbacks themselves.
        let callbacks: Vec<ObjectCallback> = self
            .callbacks
            .read()
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(object);
        }
    }

    fn destroy(&self, object: &SceneObject) {
        object.scene_class().destroy_object(object);
    }
}

impl Default for SceneContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SceneContext {
    fn drop(&mut self) {
        let objects: Vec<ObjectRef> = self.objects.iter().map(|o| o.value().clone()).collect();
        debug!(objects = objects.len(), classes = self.classes.len(), "Tearing down SceneContext");
        for object in &objects {
            self.run_callbacks(CallbackKind::Delete, object);
            self.destroy(object);
        }
        *self.side.lock() = SideVectors::default();
        self.update_graph.lock().clear();
        self.objects.clear();
        self.classes.clear();
    }
}

impl std::fmt::Debug for SceneContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneContext")
            .field("classes", &self.classes.len())
            .field("objects", &self.objects.len())
            .field("dso_path", &self.dso_path())
            .field("proxy_mode", &self.proxy_mode_enabled())
            .finish()
    }
}
