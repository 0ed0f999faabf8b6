use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::*;
use crate::attribute::{AttributeFlags, SceneObjectRef};
use crate::builtin::{Camera, Geometry, GeometrySetView, LayerAssignment, LayerView, SceneVariablesKeys};
use crate::factory::SceneObjectKind;
use crate::object::SceneObjectBehavior;
use crate::testing::{Plain, RecordingFactory};

fn context_with_cameras() -> SceneContext {
    let context = SceneContext::new();
    context
        .register_scene_class_factory("PerspectiveCamera", BuiltinFactory::<Camera>::shared())
        .unwrap();
    context
        .register_scene_class_factory("BoxGeometry", BuiltinFactory::<Geometry>::shared())
        .unwrap();
    context
}

fn filter_factory(log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn ObjectFactory> {
    RecordingFactory::new(Arc::clone(log), |class| {
        class.declare_attribute_with::<SceneObjectRef>(
            "input",
            None,
            AttributeFlags::empty(),
            SceneObjectInterface::DISPLAYFILTER,
            &[],
        )?;
        Ok(SceneObjectInterface::DISPLAYFILTER)
    })
}

fn connect(object: &ObjectRef, input: &ObjectRef) {
    let key = object.scene_class().get_attribute_key::<SceneObjectRef>("input").unwrap();
    object.begin_update();
    object.set(key, Some(input.clone())).unwrap();
    object.end_update();
}

#[test]
fn test_new_context_has_builtins() {
    let context = SceneContext::new();
    for name in ["SceneVariables", "Layer", "TraceSet", "GeometrySet", "LightSet", "RenderOutput", "Metadata"] {
        assert!(context.scene_class_exists(name), "missing {}", name);
    }
    assert!(context.scene_object_exists(SCENE_VARIABLES_NAME));
    assert_eq!(context.object_count(), 1);
    assert!(context.primary_camera().is_none());
    assert!(context.cameras().is_empty());
}

#[test]
fn test_scene_variables_singleton() {
    let context = SceneContext::new();
    let a = context.create_scene_object("SceneVariables", "vars").unwrap();
    let b = context.create_scene_object("SceneVariables", SCENE_VARIABLES_NAME).unwrap();
    assert_eq!(a, b);
    assert_eq!(&a, context.scene_variables());
    assert!(!context.scene_object_exists("vars"));
}

#[test]
fn test_empty_names_rejected() {
    let context = SceneContext::new();
    assert!(matches!(context.create_scene_class(""), Err(RdlError::Value(_))));
    assert!(matches!(context.create_scene_object("", "/obj"), Err(RdlError::Value(_))));
    assert!(matches!(context.create_scene_object("Layer", ""), Err(RdlError::Value(_))));
}

#[test]
fn test_lookup_errors() {
    let context = SceneContext::new();
    assert!(matches!(context.scene_class("Nope"), Err(RdlError::Key(_))));
    assert!(matches!(context.scene_object("/nope"), Err(RdlError::Key(_))));
}

#[test]
fn test_unknown_class_is_not_registered() {
    let context = SceneContext::new();
    context.set_dso_path("/nonexistent/rdl2/dso");
    assert!(matches!(context.create_scene_class("Widget"), Err(RdlError::Dso(_))));
    assert!(!context.scene_class_exists("Widget"));

    context
        .register_scene_class_factory("Widget", BuiltinFactory::<Plain>::shared())
        .unwrap();
    let class = context.create_scene_class("Widget").unwrap();
    assert_eq!(class.name(), "Widget");
    assert!(Arc::ptr_eq(&class, &context.create_scene_class("Widget").unwrap()));
    assert!(context
        .register_scene_class_factory("Widget", BuiltinFactory::<Plain>::shared())
        .is_err());
}

#[test]
fn test_existing_object_class_mismatch() {
    let context = SceneContext::new();
    let layer = context.create_scene_object("Layer", "/thing").unwrap();
    assert_eq!(context.create_scene_object("Layer", "/thing").unwrap(), layer);

    let err = context.create_scene_object("GeometrySet", "/thing").unwrap_err();
    assert!(matches!(err, RdlError::Type(_)));
    assert!(err.to_string().contains("of SceneClass 'Layer' already exists"));
}

#[test]
fn test_failed_declare_leaves_no_class() {
    let context = SceneContext::new();
    let log = Arc::default();
    let factory = RecordingFactory::new(log, |class| {
        class.declare_attribute::<f32>("value", AttributeFlags::empty())?;
        class.declare_attribute::<f32>("value", AttributeFlags::empty())?;
        Ok(SceneObjectInterface::GENERIC)
    });
    context.register_scene_class_factory("Broken", factory).unwrap();

    assert!(context.create_scene_class("Broken").is_err());
    assert!(!context.scene_class_exists("Broken"));
    assert!(context.create_scene_object("Broken", "/b").is_err());
    assert!(!context.scene_object_exists("/b"));
}

struct Unbuildable;

impl SceneObjectBehavior for Unbuildable {}

impl SceneObjectKind for Unbuildable {
    fn declare(_class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        Ok(SceneObjectInterface::GEOMETRY)
    }

    fn create(_class: &SceneClass, name: &str) -> RdlResult<Self> {
        Err(RdlError::runtime_error(format!("cannot build '{}'", name)))
    }
}

#[test]
fn test_failed_create_leaves_no_object() {
    let context = context_with_cameras();
    context
        .register_scene_class_factory("Unbuildable", BuiltinFactory::<Unbuildable>::shared())
        .unwrap();
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    context.add_create_scene_object_callback(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let count = context.object_count();

    let err = context.create_scene_object("Unbuildable", "/x").unwrap_err();
    assert!(matches!(err, RdlError::Runtime(_)));
    assert!(context.scene_class_exists("Unbuildable"));
    assert!(!context.scene_object_exists("/x"));
    assert!(matches!(context.scene_object("/x"), Err(RdlError::Key(_))));
    assert_eq!(context.object_count(), count);
    assert!(context.geometries().is_empty());
    assert!(context.cameras().is_empty());
    assert_eq!(created.load(Ordering::SeqCst), 0);

    // The name stays free for a class that can build it.
    let geometry = context.create_scene_object("BoxGeometry", "/x").unwrap();
    assert_eq!(context.geometries(), vec![geometry]);
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_create_callbacks() {
    let context = context_with_cameras();
    let created = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&created);
    let key = context.add_create_scene_object_callback(move |object| sink.lock().push(object.name().to_string()));

    context.create_scene_object("PerspectiveCamera", "/cam").unwrap();
    // Returning an existing object is not a creation.
    context.create_scene_object("PerspectiveCamera", "/cam").unwrap();
    assert_eq!(*created.lock(), vec!["/cam".to_string()]);

    assert!(context.remove_scene_object_callback(key));
    assert!(!context.remove_scene_object_callback(key));
    context.create_scene_object("PerspectiveCamera", "/cam2").unwrap();
    assert_eq!(created.lock().len(), 1);
}

#[test]
fn test_drop_runs_delete_callbacks() {
    let deleted = Arc::new(AtomicUsize::new(0));
    {
        let context = SceneContext::new();
        context.create_scene_object("Layer", "/layer").unwrap();
        context.create_scene_object("LightSet", "/lights").unwrap();
        let counter = Arc::clone(&deleted);
        context.add_delete_scene_object_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }
    // Both objects plus the scene variables.
    assert_eq!(deleted.load(Ordering::SeqCst), 3);
}

#[test]
fn test_primary_camera_selection() {
    let context = context_with_cameras();
    let first = context.create_scene_object("PerspectiveCamera", "/cam1").unwrap();
    let second = context.create_scene_object("PerspectiveCamera", "/cam2").unwrap();
    assert_eq!(context.primary_camera(), Some(first.clone()));
    assert_eq!(context.cameras(), vec![first.clone(), second.clone()]);

    let vars = context.scene_variables();
    let keys = SceneVariablesKeys::of(vars.scene_class()).unwrap();
    vars.begin_update();
    vars.set(keys.camera, Some(second.clone())).unwrap();
    vars.end_update();

    assert_eq!(context.primary_camera(), Some(second.clone()));
    assert_eq!(context.cameras(), vec![second.clone(), first.clone()]);
    assert_eq!(context.active_cameras(), vec![second]);
}

#[test]
fn test_active_cameras_follow_render_outputs() {
    let context = context_with_cameras();
    let main = context.create_scene_object("PerspectiveCamera", "/main").unwrap();
    let witness = context.create_scene_object("PerspectiveCamera", "/witness").unwrap();
    context.create_scene_object("PerspectiveCamera", "/unused").unwrap();
    let output = context.create_scene_object("RenderOutput", "/out").unwrap();

    let key = output.scene_class().get_attribute_key::<SceneObjectRef>("camera").unwrap();
    output.begin_update();
    output.set(key, Some(witness.clone())).unwrap();
    output.end_update();

    assert_eq!(context.render_outputs(), vec![output]);
    assert_eq!(context.active_cameras(), vec![main, witness]);
}

#[test]
fn test_side_vectors_track_interfaces() {
    let context = context_with_cameras();
    let geometry = context.create_scene_object("BoxGeometry", "/box").unwrap();
    let set = context.create_scene_object("GeometrySet", "/set").unwrap();
    context.create_scene_object("Layer", "/layer").unwrap();

    assert_eq!(context.geometries(), vec![geometry]);
    assert_eq!(context.geometry_sets(), vec![set]);
    assert!(context.cameras().is_empty());

    let names: Vec<String> = context.scene_objects().iter().map(|o| o.name().to_string()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_apply_updates_runs_dependencies_first() {
    let context = SceneContext::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    context.register_scene_class_factory("Filter", filter_factory(&log)).unwrap();

    let a = context.create_scene_object("Filter", "/a").unwrap();
    let b = context.create_scene_object("Filter", "/b").unwrap();
    let c = context.create_scene_object("Filter", "/c").unwrap();
    connect(&a, &b);
    connect(&b, &c);

    context.apply_updates(None).unwrap();
    assert_eq!(*log.lock(), vec!["/c", "/b", "/a"]);

    let counts = context.dso_counts();
    assert_eq!(counts.get("Filter"), Some(&2));

    context.reset_updates(None).unwrap();
    context.apply_updates(None).unwrap();
    assert_eq!(log.lock().len(), 3);
}

#[test]
fn test_apply_updates_with_worker_pool() {
    let config = ContextConfig {
        update_threads: 2,
        ..ContextConfig::default()
    };
    let context = SceneContext::with_config(&config).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    context.register_scene_class_factory("Filter", filter_factory(&log)).unwrap();
    for i in 0..8 {
        context.create_scene_object("Filter", &format!("/f{}", i)).unwrap();
    }

    context.apply_updates(None).unwrap();
    let mut names = log.lock().clone();
    names.sort();
    assert_eq!(names.len(), 8);
    assert_eq!(names.first().map(String::as_str), Some("/f0"));
}

#[test]
fn test_with_config_prepends_dso_path() {
    let config = ContextConfig {
        dso_path: Some("/opt/plugins".to_string()),
        proxy_mode: true,
        ..ContextConfig::default()
    };
    let context = SceneContext::with_config(&config).unwrap();
    assert!(context.dso_path().starts_with("/opt/plugins:"));
    assert!(context.proxy_mode_enabled());
}

#[test]
fn test_time_rescaling_coeffs() {
    let context = context_with_cameras();
    context.create_scene_object("PerspectiveCamera", "/cam").unwrap();

    context.apply_updates(None).unwrap();
    let blurred = context.time_rescaling_coeffs();
    let expected = TimeRescalingCoeffs::from_shutter(-0.25, 0.25, &[-1.0, 0.0]).unwrap();
    assert_eq!(blurred, expected);
    context.reset_updates(None).unwrap();

    let vars = context.scene_variables();
    let keys = SceneVariablesKeys::of(vars.scene_class()).unwrap();
    vars.begin_update();
    vars.set(keys.enable_motion_blur, false).unwrap();
    vars.end_update();

    context.apply_updates(None).unwrap();
    let still = TimeRescalingCoeffs::from_shutter(0.0, 0.0, &[-1.0, 0.0]).unwrap();
    assert_eq!(context.time_rescaling_coeffs(), still);
}

#[test]
fn test_layer_geometry_sets() {
    let context = context_with_cameras();
    let inside = context.create_scene_object("BoxGeometry", "/inside").unwrap();
    let outside = context.create_scene_object("BoxGeometry", "/outside").unwrap();
    let used = context.create_scene_object("GeometrySet", "/used").unwrap();
    let unused = context.create_scene_object("GeometrySet", "/unused").unwrap();
    let layer = context.create_scene_object("Layer", "/layer").unwrap();

    used.begin_update();
    GeometrySetView::new(&used).unwrap().add(&inside).unwrap();
    used.end_update();
    unused.begin_update();
    GeometrySetView::new(&unused).unwrap().add(&outside).unwrap();
    unused.end_update();
    layer.begin_update();
    LayerView::new(&layer)
        .unwrap()
        .assign(&inside, "", &LayerAssignment::new(None, None))
        .unwrap();
    layer.end_update();

    assert_eq!(context.geometry_sets_for_layer(&layer).unwrap(), vec![used.clone()]);

    context.apply_updates(Some(&layer)).unwrap();
    // Everything is new, so both sets were prepared this pass.
    assert_eq!(context.updated_or_deformed_geometry_sets(&layer).unwrap(), vec![used, unused]);

    context.reset_updates(Some(&layer)).unwrap();
    assert!(LayerView::new(&layer).unwrap().changed_or_deformed_geometries().is_empty());
    assert!(context.geometry_sets_for_layer(&context.scene_variables().clone()).is_err());
}

#[test]
fn test_reset_updates_clears_every_object() {
    let context = context_with_cameras();
    let log = Arc::new(Mutex::new(Vec::new()));
    context.register_scene_class_factory("Filter", filter_factory(&log)).unwrap();
    context.create_scene_object("PerspectiveCamera", "/cam").unwrap();
    for i in 0..4 {
        context.create_scene_object("Filter", &format!("/f{}", i)).unwrap();
    }

    context.apply_updates(None).unwrap();
    assert!(context.scene_objects().iter().any(|o| o.update_prep_applied()));

    context.reset_updates(None).unwrap();
    for object in context.scene_objects() {
        assert!(!object.update_prep_applied(), "{} still prepared", object.name());
    }
    assert!(context.dso_counts().is_empty());
}

#[test]
fn test_commit_all_changes() {
    let context = SceneContext::new();
    let layer = context.create_scene_object("Layer", "/layer").unwrap();
    assert!(layer.is_dirty());
    let camera = context_with_cameras();
    let cam = camera.create_scene_object("PerspectiveCamera", "/cam").unwrap();
    context.commit_all_changes();
    assert!(!layer.is_dirty());
    assert!(!context.scene_variables().is_dirty());
    assert!(layer.attributes_set().is_empty());
    // Only this context's objects are committed.
    assert!(cam.is_dirty());
    camera.commit_all_changes();
    assert!(!cam.is_dirty());
}

#[test]
fn test_load_all_scene_classes_skips_missing_directories() {
    let context = SceneContext::new();
    let directory = std::env::temp_dir().join(format!("rdl2-context-test-{}", std::process::id()));
    std::fs::create_dir_all(&directory).unwrap();
    std::fs::write(directory.join("NotAPlugin.txt"), b"text").unwrap();

    let classes = context.scene_classes().len();
    context.set_dso_path(format!("/nonexistent/rdl2:{}", directory.display()));
    context.load_all_scene_classes();
    assert_eq!(context.scene_classes().len(), classes);

    let _ = std::fs::remove_dir_all(&directory);
}

#[test]
fn test_concurrent_creation_returns_one_object() {
    let context = SceneContext::new();
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    context.add_create_scene_object_callback(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let objects: Vec<ObjectRef> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| context.create_scene_object("Layer", "/shared").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(objects.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(created.load(Ordering::SeqCst), 1);
}
