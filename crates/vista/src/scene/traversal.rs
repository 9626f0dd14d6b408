use super::{
    graph::{LoadState, SceneGraph},
    SceneError, DEFAULT_LOG_TARGET,
};
use crate::{
    assets::SharedAssetCache,
    graphics::{
        camera::{projection_matrix, rotation_matrix, view_matrix, CameraError},
        Canvas, DrawItem, GeometryCache, LightList, RenderPass,
    },
    nodes::{
        params::{LightSource, Material},
        validate_name, NamePath, NodeKind,
    },
    picking::{pick_id, NameRegistry},
};
use glam::Mat4;
use log::*;
use std::{mem, sync::Arc, time::Instant};
use vista_utils::PoolHandle;

/// A `load` node seen for the first time, with no cached content.
pub(crate) struct LoadRequest {
    pub node: PoolHandle,
    pub uri: String,
    pub log_target: Option<Arc<str>>,
}

/// A `load` node nested below another `load` of the same URI.
pub(crate) struct LoadCycle {
    pub uri: String,
    /// URIs of the enclosing `load` nodes, outermost first.
    pub chain: Vec<String>,
    pub log_target: Option<Arc<str>>,
}

pub(crate) struct TraversalOutput {
    pub passes: Vec<RenderPass>,
    pub names: NameRegistry,
    pub requests: Vec<LoadRequest>,
    pub cycles: Vec<LoadCycle>,
}

/// State inherited by the children of a node.
struct State {
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    material: Material,
    lights: LightList,
    name: NamePath,
    pass: Option<usize>,
    log_target: Option<Arc<str>>,
    /// URIs of the enclosing `load` nodes.
    assets: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            material: Material::default(),
            lights: LightList::new(),
            name: NamePath::new(),
            pass: None,
            log_target: None,
            assets: vec![],
        }
    }
}

impl State {
    fn log_target(&self) -> &str {
        self.log_target.as_deref().unwrap_or(DEFAULT_LOG_TARGET)
    }
}

/// Depth-first walk over the scene graph, collecting one frame.
pub(crate) struct Traversal<'a> {
    graph: &'a mut SceneGraph,
    geometry: &'a mut GeometryCache,
    cache: &'a SharedAssetCache,
    canvas: &'a Canvas,
    now: Instant,

    passes: Vec<RenderPass>,
    names: NameRegistry,
    requests: Vec<LoadRequest>,
    cycles: Vec<LoadCycle>,
    /// Type names from the root to the current node, for error messages.
    path: Vec<&'static str>,
}

impl<'a> Traversal<'a> {
    pub fn new(
        graph: &'a mut SceneGraph,
        geometry: &'a mut GeometryCache,
        cache: &'a SharedAssetCache,
        canvas: &'a Canvas,
        now: Instant,
    ) -> Self {
        Self {
            graph,
            geometry,
            cache,
            canvas,
            now,
            passes: vec![],
            names: NameRegistry::default(),
            requests: vec![],
            cycles: vec![],
            path: vec![],
        }
    }

    pub fn run(mut self) -> Result<TraversalOutput, SceneError> {
        let root = self.graph.root();
        self.visit(root, &mut State::default())?;

        Ok(TraversalOutput {
            passes: self.passes,
            names: self.names,
            requests: self.requests,
            cycles: self.cycles,
        })
    }

    fn node_path(&self) -> String {
        self.path.join("/")
    }

    fn camera_error(&self, source: CameraError) -> SceneError {
        SceneError::Camera {
            path: self.node_path(),
            source,
        }
    }

    fn visit(&mut self, handle: PoolHandle, state: &mut State) -> Result<(), SceneError> {
        let Some(node) = self.graph.get(handle) else {
            return Ok(());
        };
        let kind = node.kind.clone();

        self.path.push(kind.type_name());
        let result = self.visit_kind(handle, &kind, state);
        self.path.pop();
        result
    }

    fn visit_children(&mut self, handle: PoolHandle, state: &mut State) -> Result<(), SceneError> {
        let children = match self.graph.get(handle) {
            Some(node) => node.children.clone(),
            None => return Ok(()),
        };
        for child in children {
            self.visit(child, state)?;
        }
        Ok(())
    }

    fn visit_kind(
        &mut self,
        handle: PoolHandle,
        kind: &NodeKind,
        state: &mut State,
    ) -> Result<(), SceneError> {
        match kind {
            NodeKind::Group => self.visit_children(handle, state),

            NodeKind::Renderer(renderer) => {
                let index = self.passes.len();
                self.passes.push(RenderPass {
                    clear_color: renderer.clear_color,
                    clear: renderer.clear,
                    viewport: renderer
                        .viewport
                        .unwrap_or_else(|| self.canvas.full_viewport()),
                    draws: vec![],
                });

                let outer = state.pass.replace(index);
                let result = self.visit_children(handle, state);
                state.pass = outer;
                result
            }

            NodeKind::Lights(sources) => {
                let outer = state.lights.len();
                let model = state.model;
                state.lights.extend(sources.iter().map(|source| LightSource {
                    pos: model.transform_point3(source.pos),
                    dir: model.transform_vector3(source.dir).normalize_or_zero(),
                    ..source.clone()
                }));

                let result = self.visit_children(handle, state);
                state.lights.truncate(outer);
                result
            }

            NodeKind::Perspective(perspective) => {
                let projection =
                    projection_matrix(perspective).map_err(|e| self.camera_error(e))?;
                let outer = mem::replace(&mut state.projection, projection);
                let result = self.visit_children(handle, state);
                state.projection = outer;
                result
            }

            NodeKind::LookAt(look_at) => {
                let view = view_matrix(look_at).map_err(|e| self.camera_error(e))?;
                let outer = mem::replace(&mut state.view, view);
                let result = self.visit_children(handle, state);
                state.view = outer;
                result
            }

            NodeKind::Translate(offset) => {
                self.transformed(handle, state, Mat4::from_translation(*offset))
            }
            NodeKind::Rotate(rotate) => {
                let rotation = rotation_matrix(rotate).map_err(|e| self.camera_error(e))?;
                self.transformed(handle, state, rotation)
            }
            NodeKind::Scale(factors) => self.transformed(handle, state, Mat4::from_scale(*factors)),

            NodeKind::Material(material) => {
                let outer = mem::replace(&mut state.material, *material);
                let result = self.visit_children(handle, state);
                state.material = outer;
                result
            }

            NodeKind::Name(name) => {
                validate_name(name).map_err(|source| SceneError::InvalidName {
                    path: self.node_path(),
                    source,
                })?;

                state.name.push(name.clone());
                self.names.declare(&state.name, state.pass);
                let result = self.visit_children(handle, state);
                state.name.pop();
                result
            }

            NodeKind::Geometry(geometry) => {
                let Some(pass) = state.pass else {
                    return Err(SceneError::OutsideRenderer {
                        path: self.node_path(),
                    });
                };
                let mesh = self
                    .geometry
                    .mesh(geometry)
                    .map_err(|source| SceneError::Geometry {
                        path: self.node_path(),
                        source,
                    })?;

                let name = (!state.name.is_empty()).then(|| state.name.clone());
                let draw = DrawItem {
                    mesh,
                    model: state.model,
                    view: state.view,
                    projection: state.projection,
                    material: state.material,
                    lights: state.lights.clone(),
                    pick_id: name.as_ref().map(pick_id),
                    name,
                };

                if let Some(name) = &draw.name {
                    self.names.add_bounds(name, draw.world_bounds());
                }
                trace!(
                    target: state.log_target(),
                    "Drawing {} ({} triangles) in pass {pass}",
                    kind.type_name(),
                    draw.mesh.triangle_count()
                );
                self.passes[pass].draws.push(draw);

                self.visit_children(handle, state)
            }

            NodeKind::Load(uri) => {
                if state.assets.contains(uri) {
                    // Grafting would include the asset in itself, over and over
                    if let Some(LoadState::Unrequested) = self.graph.load_state(handle) {
                        self.graph.set_load_state(handle, LoadState::Failed);
                        self.cycles.push(LoadCycle {
                            uri: uri.clone(),
                            chain: state.assets.clone(),
                            log_target: state.log_target.clone(),
                        });
                    }
                    return Ok(());
                }

                match self.graph.load_state(handle) {
                    Some(LoadState::Unrequested) => {
                        let cached = self.cache.lock().get(uri, self.now);
                        match cached {
                            Some(fragment) => {
                                info!(target: state.log_target(), "Using cached asset `{uri}`");
                                self.graph.graft(handle, &fragment);
                                self.graph.set_load_state(handle, LoadState::Loaded);
                            }
                            None => self.requests.push(LoadRequest {
                                node: handle,
                                uri: uri.clone(),
                                log_target: state.log_target.clone(),
                            }),
                        }
                    }
                    Some(LoadState::Loaded) => self.cache.lock().touch(uri, self.now),
                    _ => {}
                }

                state.assets.push(uri.clone());
                let result = self.visit_children(handle, state);
                state.assets.pop();
                result
            }

            NodeKind::Logging(element_id) => {
                let outer = state.log_target.replace(Arc::from(element_id.as_str()));
                let result = self.visit_children(handle, state);
                state.log_target = outer;
                result
            }
        }
    }

    fn transformed(
        &mut self,
        handle: PoolHandle,
        state: &mut State,
        transform: Mat4,
    ) -> Result<(), SceneError> {
        let outer = state.model;
        state.model = outer * transform;
        let result = self.visit_children(handle, state);
        state.model = outer;
        result
    }
}
