//! The per-frame update pass over a context's objects

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, info_span};

use super::SceneContext;
use crate::builtin::{CameraView, GeometrySetView, LayerView};
use crate::error::RdlResult;
use crate::interface::SceneObjectInterface;
use crate::object::ObjectRef;
use crate::update_helper::UpdateHelper;

/// Interfaces counted by [`SceneContext::dso_counts`]
const COUNTED_INTERFACES: [SceneObjectInterface; 9] = [
    SceneObjectInterface::MATERIAL,
    SceneObjectInterface::MAP,
    SceneObjectInterface::NORMALMAP,
    SceneObjectInterface::VOLUMESHADER,
    SceneObjectInterface::DISPLAYFILTER,
    SceneObjectInterface::GEOMETRY,
    SceneObjectInterface::DISPLACEMENT,
    SceneObjectInterface::LIGHTFILTER,
    SceneObjectInterface::LIGHT,
];

impl SceneContext {
    /// Prepare and run `update()` on every object whose inputs changed
    ///
    /// Walks the scene variables, every camera, the layer's assignments,
    /// every geometry set and every display filter, recording what must be
    /// updated in the context's update graph. Leaves are updated first, then
    /// each dependency level deepest first, each batch in parallel.
    /// Geometries whose material now needs other primitive attributes, or
    /// whose volume shader needs a rebake, are flagged for the renderer.
    ///
    /// Call [`reset_updates`](Self::reset_updates) once the renderer has
    /// consumed the results.
    pub fn apply_updates(&self, layer: Option<&ObjectRef>) -> RdlResult<()> {
        let _span = info_span!("apply_updates").entered();

        let primary = self.primary_camera();
        self.refresh_time_rescaling_coeffs(primary.as_ref())?;

        let layer = layer.map(LayerView::new).transpose()?;
        if let Some(layer) = &layer {
            layer.cache_prim_attributes()?;
        }

        let mut graph = self.update_graph.lock();
        self.scene_variables.update_prep(&mut graph, 0);
        for camera in self.cameras() {
            camera.update_prep(&mut graph, 0);
        }
        if let Some(layer) = &layer {
            layer.update_prep_assignments(&mut graph, 0, primary.as_ref())?;
        }
        for set in self.geometry_sets() {
            GeometrySetView::new(&set)?.update_prep_fast(&mut graph, 0);
        }
        for object in self.scene_objects() {
            if object.is_a(SceneObjectInterface::DISPLAYFILTER) {
                object.update_prep(&mut graph, 0);
            }
        }

        self.run_graph(&graph)?;
        drop(graph);

        if let Some(layer) = &layer {
            Self::flag_geometry_updates(layer, true)?;
        }
        Ok(())
    }

    /// Update pass limited to one layer's assignments, for mesh lights
    ///
    /// Cameras, scene variables and geometry sets are not visited.
    pub fn apply_updates_to_mesh_light_layer(&self, layer: &ObjectRef) -> RdlResult<()> {
        let _span = info_span!("apply_updates_to_mesh_light_layer", layer = %layer.name()).entered();

        let layer = LayerView::new(layer)?;
        layer.cache_prim_attributes()?;

        let mut graph = self.update_graph.lock();
        layer.update_prep_assignments(&mut graph, 0, None)?;
        self.run_graph(&graph)?;
        drop(graph);

        Self::flag_geometry_updates(&layer, false)
    }

    fn run_graph(&self, graph: &UpdateHelper) -> RdlResult<()> {
        let run = || {
            graph.run_updates(|batch| {
                batch.par_iter().try_for_each(|object| {
                    object.debug("Updating");
                    object.update()
                })
            })
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    /// Request updates on geometries whose shading inputs changed shape
    fn flag_geometry_updates(layer: &LayerView<'_>, check_volumes: bool) -> RdlResult<()> {
        for (geometry, assignment_id) in layer.changed_or_deformed_geometries() {
            if let Some(material) = layer.lookup_material(assignment_id)? {
                if layer.prim_attributes_changed(&material) {
                    geometry.debug("Material primitive attributes changed");
                    geometry.request_update();
                }
            }
            if !check_volumes {
                continue;
            }
            if let Some(volume) = layer.lookup_volume_shader(assignment_id)? {
                if volume.update_bake_required() {
                    geometry.debug("Volume shader requires a rebake");
                    geometry.request_update();
                }
            }
        }
        Ok(())
    }

    /// Recompute the time rescaling coefficients for this pass
    ///
    /// Uses the primary camera's shutter interval when motion blur is on, and
    /// a zero interval otherwise.
    fn refresh_time_rescaling_coeffs(&self, primary: Option<&ObjectRef>) -> RdlResult<()> {
        let (open, close) = match primary {
            Some(camera) if self.variables().motion_blur_enabled() => CameraView::new(camera)?.shutter_interval(),
            _ => (0.0, 0.0),
        };
        self.compute_time_rescaling_coeffs(open, close);
        Ok(())
    }

    /// Number of objects per class updated in the last pass, for the kinds
    /// that come from plugins
    ///
    /// Leaves are not counted.
    pub fn dso_counts(&self) -> HashMap<String, usize> {
        let graph = self.update_graph.lock();
        let mut counts = HashMap::new();
        for depth in 0..graph.max_depth() {
            for object in graph.level(depth) {
                if COUNTED_INTERFACES.iter().any(|&i| object.is_a(i)) {
                    *counts.entry(object.scene_class().name().to_string()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Clear every object's per-pass flags and the update graph
    pub fn reset_updates(&self, layer: Option<&ObjectRef>) -> RdlResult<()> {
        for entry in self.objects.iter() {
            entry.value().reset_update();
        }
        if let Some(layer) = layer {
            LayerView::new(layer)?.reset_assignment_updates()?;
        }
        self.update_graph.lock().clear();
        debug!("Reset scene object updates");
        Ok(())
    }

    /// Commit pending changes on every object
    pub fn commit_all_changes(&self) {
        for entry in self.objects.iter() {
            entry.value().commit_changes();
        }
    }

    /// Geometry sets updated in the last pass or holding a geometry the
    /// layer saw change
    pub fn updated_or_deformed_geometry_sets(&self, layer: &ObjectRef) -> RdlResult<Vec<ObjectRef>> {
        let changed: Vec<ObjectRef> = LayerView::new(layer)?
            .changed_or_deformed_geometries()
            .into_iter()
            .map(|(geometry, _)| geometry)
            .collect();
        let mut sets = Vec::new();
        for set in self.geometry_sets() {
            let view = GeometrySetView::new(&set)?;
            if set.update_prep_applied() || changed.iter().any(|g| view.contains(g)) {
                sets.push(set);
            }
        }
        Ok(sets)
    }

    /// Geometry sets holding at least one geometry the layer assigns
    pub fn geometry_sets_for_layer(&self, layer: &ObjectRef) -> RdlResult<Vec<ObjectRef>> {
        let layer = LayerView::new(layer)?;
        let mut sets = Vec::new();
        for set in self.geometry_sets() {
            let view = GeometrySetView::new(&set)?;
            if view.geometries().iter().any(|g| layer.contains(g)) {
                sets.push(set);
            }
        }
        Ok(sets)
    }
}
