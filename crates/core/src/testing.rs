//! Shared fixtures for unit tests

use std::sync::Arc;

use parking_lot::Mutex;

use crate::class::SceneClass;
use crate::error::RdlResult;
use crate::factory::{BuiltinFactory, ObjectFactory, SceneObjectKind};
use crate::interface::SceneObjectInterface;
use crate::object::{ObjectRef, SceneObject, SceneObjectBehavior};

/// Kind with no attributes and no behavior
#[derive(Default)]
pub(crate) struct Plain;

impl SceneObjectBehavior for Plain {}

impl SceneObjectKind for Plain {
    fn declare(_class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        Ok(SceneObjectInterface::GENERIC)
    }

    fn create(_class: &SceneClass, _name: &str) -> RdlResult<Self> {
        Ok(Plain)
    }
}

/// Declare a class through `factory`
pub(crate) fn declared_class(name: &str, factory: Arc<dyn ObjectFactory>) -> Arc<SceneClass> {
    let mut class = SceneClass::new(name, factory);
    class.declare().unwrap();
    Arc::new(class)
}

pub(crate) fn plain_class(name: &str) -> Arc<SceneClass> {
    declared_class(name, BuiltinFactory::<Plain>::shared())
}

pub(crate) fn plain_object(class: &Arc<SceneClass>, name: &str) -> ObjectRef {
    class.create_object(name).unwrap()
}

type DeclareFn = dyn Fn(&mut SceneClass) -> RdlResult<SceneObjectInterface> + Send + Sync;

/// Factory declaring through a closure and recording every `update()` call
pub(crate) struct RecordingFactory {
    declare: Box<DeclareFn>,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingFactory {
    pub(crate) fn new(
        log: Arc<Mutex<Vec<String>>>,
        declare: impl Fn(&mut SceneClass) -> RdlResult<SceneObjectInterface> + Send + Sync + 'static,
    ) -> Arc<dyn ObjectFactory> {
        Arc::new(Self {
            declare: Box::new(declare),
            log,
        })
    }
}

struct Recording {
    log: Arc<Mutex<Vec<String>>>,
}

impl SceneObjectBehavior for Recording {
    fn update(&mut self, object: &SceneObject) -> RdlResult<()> {
        self.log.lock().push(object.name().to_string());
        Ok(())
    }
}

impl ObjectFactory for RecordingFactory {
    fn declare(&self, class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        (self.declare)(class)
    }

    fn create(&self, _class: &SceneClass, _name: &str) -> RdlResult<Box<dyn SceneObjectBehavior>> {
        Ok(Box::new(Recording {
            log: Arc::clone(&self.log),
        }))
    }
}
