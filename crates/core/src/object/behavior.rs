//! Pluggable per-object behavior

use std::any::Any;

use super::SceneObject;
use crate::error::RdlResult;

/// Upcast helper so behaviors can be downcast to their concrete kind
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// What a scene class does beyond storing attributes
///
/// One boxed behavior lives beside each object's attribute storage. The
/// update engine only ever calls [`update`](Self::update); the remaining hooks
/// are queried by layers and scene contexts for geometry and shader kinds.
/// Every method has a no-op default so plain data classes need no code.
///
/// The object's behavior lock is held for the duration of every hook. A hook
/// must not reach back into its own behavior through the owning object:
/// `with_behavior`, `with_behavior_mut`, `update`, `is_deformed`,
/// `reset_deformed`, `update_bake_required` and `required_prim_attributes`
/// on that same `SceneObject` deadlock. Attribute reads and writes on the
/// object are fine.
pub trait SceneObjectBehavior: AsAny + Send + Sync {
    /// React to changes flagged since the last update pass
    ///
    /// Called once per pass after every object this one depends on has been
    /// updated. Objects at the same depth may run concurrently.
    fn update(&mut self, _object: &SceneObject) -> RdlResult<()> {
        Ok(())
    }

    /// Geometry only: procedural data changed outside the attribute system
    fn is_deformed(&self) -> bool {
        false
    }

    fn reset_deformed(&mut self) {}

    /// Volume shaders only: baked data must be regenerated
    fn update_bake_required(&self, _object: &SceneObject) -> bool {
        false
    }

    /// Shaders only: primitive attributes this node reads from geometry
    fn required_prim_attributes(&self, _object: &SceneObject) -> Vec<String> {
        Vec::new()
    }
}
