//! Object factories
//!
//! Every [`SceneClass`] owns one [`ObjectFactory`], which declares the
//! class's attributes and builds the behavior for each new object. The core
//! treats all three sources alike once wrapped:
//!
//! - [`BuiltinFactory`] - a [`SceneObjectKind`] compiled into the process
//! - [`DsoFactory`] - a plugin shared object exporting the three entry points
//! - [`ProxyFactory`] - a `.so.proxy` plugin that only declares; objects get
//!   the base behavior matching the declared interface
//!
//! Plugins export their entry points with [`rdl2_dso_class!`](crate::rdl2_dso_class).

use std::marker::PhantomData;
use std::sync::Arc;

use rdl2_engine::{Dso, CREATE_SYMBOL, DECLARE_SYMBOL, DESTROY_SYMBOL};

use crate::class::SceneClass;
use crate::error::RdlResult;
use crate::interface::SceneObjectInterface;
use crate::object::SceneObjectBehavior;

/// Signature of the exported `rdl2_declare` entry point
#[allow(improper_ctypes_definitions)]
pub type ClassDeclareFn = unsafe extern "C" fn(&mut SceneClass) -> RdlResult<SceneObjectInterface>;

/// Signature of the exported `rdl2_create` entry point
#[allow(improper_ctypes_definitions)]
pub type ObjectCreateFn = unsafe extern "C" fn(&SceneClass, &str) -> RdlResult<Box<dyn SceneObjectBehavior>>;

/// Signature of the exported `rdl2_destroy` entry point
#[allow(improper_ctypes_definitions)]
pub type ObjectDestroyFn = unsafe extern "C" fn(Box<dyn SceneObjectBehavior>);

/// Declares a scene class and builds behaviors for its objects
pub trait ObjectFactory: Send + Sync {
    /// Declare the class's attributes and return the interfaces it implements
    ///
    /// Runs exactly once, with exclusive access to the class.
    fn declare(&self, class: &mut SceneClass) -> RdlResult<SceneObjectInterface>;

    /// Build the behavior for a new object named `name`
    fn create(&self, class: &SceneClass, name: &str) -> RdlResult<Box<dyn SceneObjectBehavior>>;

    /// Release a behavior created by this factory
    fn destroy(&self, behavior: Box<dyn SceneObjectBehavior>) {
        drop(behavior);
    }

    /// File the class was loaded from, empty for built-in classes
    fn source_path(&self) -> String {
        String::new()
    }
}

/// A scene object kind known at compile time
pub trait SceneObjectKind: SceneObjectBehavior + Sized {
    fn declare(class: &mut SceneClass) -> RdlResult<SceneObjectInterface>;

    fn create(class: &SceneClass, name: &str) -> RdlResult<Self>;
}

/// Factory for a statically linked [`SceneObjectKind`]
pub struct BuiltinFactory<K> {
    _kind: PhantomData<fn() -> K>,
}

impl<K: SceneObjectKind> BuiltinFactory<K> {
    pub fn new() -> Self {
        Self { _kind: PhantomData }
    }

    pub fn shared() -> Arc<dyn ObjectFactory> {
        Arc::new(Self::new())
    }
}

impl<K: SceneObjectKind> Default for BuiltinFactory<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SceneObjectKind> ObjectFactory for BuiltinFactory<K> {
    fn declare(&self, class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        K::declare(class)
    }

    fn create(&self, class: &SceneClass, name: &str) -> RdlResult<Box<dyn SceneObjectBehavior>> {
        Ok(Box::new(K::create(class, name)?))
    }
}

/// Factory backed by a scene class plugin
pub struct DsoFactory {
    declare: ClassDeclareFn,
    create: ObjectCreateFn,
    destroy: ObjectDestroyFn,
    // Declared last: the entry points above are only valid while it is loaded.
    dso: Dso,
}

impl DsoFactory {
    /// Open `<class_name>.so` on `search_path` and resolve its entry points
    ///
    /// # Safety
    ///
    /// Loading runs the plugin's initializers, and the exported symbols must
    /// have the signatures of [`ClassDeclareFn`], [`ObjectCreateFn`] and
    /// [`ObjectDestroyFn`]. Plugins built with [`rdl2_dso_class!`](crate::rdl2_dso_class)
    /// against the same crate version satisfy this.
    pub unsafe fn load(class_name: &str, search_path: &str) -> RdlResult<Self> {
        let dso = Dso::open(class_name, search_path, false)?;
        Ok(Self {
            declare: dso.symbol::<ClassDeclareFn>(DECLARE_SYMBOL)?,
            create: dso.symbol::<ObjectCreateFn>(CREATE_SYMBOL)?,
            destroy: dso.symbol::<ObjectDestroyFn>(DESTROY_SYMBOL)?,
            dso,
        })
    }
}

impl ObjectFactory for DsoFactory {
    fn declare(&self, class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        // SAFETY: signature checked by the caller of `load`; `dso` outlives the call.
        unsafe { (self.declare)(class) }
    }

    fn create(&self, class: &SceneClass, name: &str) -> RdlResult<Box<dyn SceneObjectBehavior>> {
        // SAFETY: as above.
        unsafe { (self.create)(class, name) }
    }

    fn destroy(&self, behavior: Box<dyn SceneObjectBehavior>) {
        // SAFETY: `behavior` came from this plugin's `create`.
        unsafe { (self.destroy)(behavior) }
    }

    fn source_path(&self) -> String {
        self.dso.path().display().to_string()
    }
}

/// Factory backed by a declare-only `.so.proxy` plugin
///
/// Tools use proxies to inspect classes without their render-time code.
/// Objects receive the base behavior of the most specific declared interface.
pub struct ProxyFactory {
    declare: ClassDeclareFn,
    dso: Dso,
}

impl ProxyFactory {
    /// Open `<class_name>.so.proxy` on `search_path`
    ///
    /// # Safety
    ///
    /// Same as [`DsoFactory::load`], for the declare entry point only.
    pub unsafe fn load(class_name: &str, search_path: &str) -> RdlResult<Self> {
        let dso = Dso::open(class_name, search_path, true)?;
        Ok(Self {
            declare: dso.symbol::<ClassDeclareFn>(DECLARE_SYMBOL)?,
            dso,
        })
    }
}

impl ObjectFactory for ProxyFactory {
    fn declare(&self, class: &mut SceneClass) -> RdlResult<SceneObjectInterface> {
        // SAFETY: signature checked by the caller of `load`.
        unsafe { (self.declare)(class) }
    }

    fn create(&self, class: &SceneClass, _name: &str) -> RdlResult<Box<dyn SceneObjectBehavior>> {
        Ok(crate::builtin::base_behavior(class.declared_interface()))
    }

    fn source_path(&self) -> String {
        self.dso.path().display().to_string()
    }
}

/// Export a [`SceneObjectKind`] as a scene class plugin
///
/// Expands to the `rdl2_declare`, `rdl2_create` and `rdl2_destroy` entry
/// points. Use once per plugin crate, built as a `cdylib` named after the
/// class.
///
/// ```ignore
/// rdl2_core::rdl2_dso_class!(MyCamera);
/// ```
#[macro_export]
macro_rules! rdl2_dso_class {
    ($kind:ty) => {
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn rdl2_declare(
            class: &mut $crate::SceneClass,
        ) -> $crate::RdlResult<$crate::SceneObjectInterface> {
            <$kind as $crate::SceneObjectKind>::declare(class)
        }

        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn rdl2_create(
            class: &$crate::SceneClass,
            name: &str,
        ) -> $crate::RdlResult<::std::boxed::Box<dyn $crate::SceneObjectBehavior>> {
            let object = <$kind as $crate::SceneObjectKind>::create(class, name)?;
            Ok(::std::boxed::Box::new(object))
        }

        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn rdl2_destroy(behavior: ::std::boxed::Box<dyn $crate::SceneObjectBehavior>) {
            drop(behavior);
        }
    };
}
