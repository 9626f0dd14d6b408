//! Scenes and their render loop
//!
//! A [`Scene`] owns a copy of a node tree, and draws it with [`Scene::render`]. Rendering is
//! synchronous and never waits for assets: `load` nodes start their fetches during a render,
//! and the fetched content shows up during one of the following renders.
//!
//! Every outstanding fetch is tracked as a [`Process`]. The process count only drops during
//! [`Scene::render`] (or all at once, on [`Scene::destroy`]), so a caller can tell that a scene
//! is fully loaded once [`Scene::num_processes`] is zero after a render. Instead of polling for
//! that, callers can:
//!  * block on [`Scene::run_until_idle`], which renders whenever a fetch completes,
//!  * block on [`Scene::wait_for_fetches`] between their own renders,
//!  * await [`Scene::idle`], or register an [`Scene::on_idle`] callback.
//!
//! ```
//! use vista::{assets::StaticFetcher, nodes::{Node, params::*}, scene::{Scene, SceneOptions}};
//! use std::time::Duration;
//!
//! let fetcher = StaticFetcher::new().with("cube.js", r#"{ "type": "cube" }"#);
//! let root = Node::renderer(RendererState::default(), [Node::load("cube.js")]);
//!
//! let mut scene = Scene::builder(SceneOptions::default())
//!     .root(root)
//!     .fetcher(fetcher)
//!     .build();
//!
//! scene.render().unwrap();
//! assert_eq!(scene.num_processes(), 1);
//!
//! scene.run_until_idle(Duration::from_secs(10)).unwrap();
//! assert_eq!(scene.num_processes(), 0);
//! assert_eq!(scene.last_frame().unwrap().draw_count(), 1);
//!
//! scene.destroy();
//! ```

use crate::{
    assets::{AssetLoader, FetchCompletion, FetchJob, FetchRequest, Fragment, SharedAssetCache},
    graphics::{camera::CameraError, Canvas, Frame, GeometryCache, MeshError, RenderBackend},
    nodes::{NameError, NamePath, Node, NodeKind},
    picking::{self, NamedEntry, PickHit},
};
use graph::{LoadState, SceneGraph};
use itertools::Itertools;
use log::*;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use traversal::{LoadCycle, LoadRequest, Traversal};
use url::Url;
use vista_utils::PoolHandle;

#[doc(inline)]
pub use builder::*;
mod builder;

#[doc(inline)]
pub use process::*;
mod process;

mod graph;
mod traversal;


/// Log target used outside of `logging` nodes.
pub const DEFAULT_LOG_TARGET: &str = "vista::scene";

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("the scene was destroyed")]
    Destroyed,
    #[error("at `{path}`: {source}")]
    Camera { path: String, source: CameraError },
    #[error("at `{path}`: {source}")]
    InvalidName { path: String, source: NameError },
    #[error("geometry at `{path}` isn't inside of a renderer node")]
    OutsideRenderer { path: String },
    #[error("invalid geometry at `{path}`: {source}")]
    Geometry { path: String, source: MeshError },
    #[error("couldn't present the frame: {0:#}")]
    Backend(anyhow::Error),
    #[error("timed out with {pending} processes left")]
    Timeout { pending: usize },
}

/// A `load` node that failed for good.
///
/// `attempts` is zero for loads that were never fetched, like an asset nested in itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub uri: String,
    pub error: String,
    pub attempts: u32,
    pub frame: u64,
}

/// A renderable scene. See the [module docs](self) for an overview.
pub struct Scene {
    id: u64,
    options: SceneOptions,
    canvas: Canvas,
    graph: SceneGraph,
    processes: ProcessTracker,
    loader: AssetLoader,
    cache: SharedAssetCache,
    geometry: GeometryCache,
    backend: Box<dyn RenderBackend>,
    last_frame: Option<Frame>,
    frame_number: u64,
    failures: Vec<LoadFailure>,
    destroyed: bool,
    proxy: Option<Url>,
}

impl Scene {
    pub fn builder(options: SceneOptions) -> SceneBuilder {
        SceneBuilder::new(options)
    }

    /// Creates a scene with the default fetcher, backend and cache.
    pub fn new(root: Node, options: SceneOptions) -> Scene {
        Self::builder(options).root(root).build()
    }

    /// Unique identifier of this scene within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn options(&self) -> &SceneOptions {
        &self.options
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Number of the last rendered frame, zero before the first render.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Draws a single frame.
    ///
    /// Fetches that completed since the previous render are grafted first, then the tree is
    /// traversed, starting fetches for newly seen `load` nodes, and the frame is presented.
    /// Never waits for outstanding fetches.
    pub fn render(&mut self) -> Result<&Frame, SceneError> {
        if self.destroyed {
            return Err(SceneError::Destroyed);
        }

        let now = Instant::now();
        let frame_number = self.frame_number + 1;

        for completion in self.loader.drain() {
            self.complete_fetch(completion, frame_number, now);
        }

        let output = Traversal::new(
            &mut self.graph,
            &mut self.geometry,
            &self.cache,
            &self.canvas,
            now,
        )
        .run()?;

        for request in output.requests {
            self.start_fetch(request, frame_number);
        }
        for cycle in output.cycles {
            self.reject_cycle(cycle, frame_number);
        }

        let frame = Frame {
            number: frame_number,
            canvas: self.canvas.clone(),
            passes: output.passes,
            names: output.names,
        };
        self.frame_number = frame_number;

        self.backend.present(&frame).map_err(SceneError::Backend)?;

        let evicted = self.cache.lock().evict(now);
        if evicted > 0 {
            debug!("Evicted {evicted} inactive assets");
        }
        self.geometry.prune();

        Ok(self.last_frame.insert(frame))
    }

    /// Number of unresolved asynchronous operations. Only changes during [`Scene::render`] and
    /// [`Scene::destroy`].
    pub fn num_processes(&self) -> usize {
        self.processes.count()
    }

    /// Snapshot of all unresolved asynchronous operations.
    pub fn processes(&self) -> Vec<(ProcessId, Process)> {
        self.processes.list()
    }

    /// Returns a future resolving once no processes are left, or the scene is destroyed.
    ///
    /// Processes are only retired by renders, so something has to keep rendering the scene for
    /// this future to resolve.
    pub fn idle(&self) -> Idle {
        self.processes.idle()
    }

    /// Registers a callback, invoked every time the process count drops to zero.
    pub fn on_idle(&self, callback: impl FnMut() + Send + 'static) {
        self.processes.on_idle(callback);
    }

    /// Blocks until a fetch completes, so that the next render has something new to graft.
    /// Returns false on timeout, or if there's nothing to wait for.
    pub fn wait_for_fetches(&mut self, timeout: Duration) -> bool {
        !self.destroyed && self.loader.wait(timeout)
    }

    /// Renders, and keeps rendering whenever a fetch completes, until no processes are left.
    /// Returns the amount of rendered frames. Timeouts past the range of [`Instant`] never
    /// expire.
    pub fn run_until_idle(&mut self, timeout: Duration) -> Result<u64, SceneError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut frames = 0;

        loop {
            self.render()?;
            frames += 1;

            if self.num_processes() == 0 {
                return Ok(frames);
            }

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if remaining.is_zero() || !self.wait_for_fetches(remaining) {
                return Err(SceneError::Timeout {
                    pending: self.num_processes(),
                });
            }
        }
    }

    /// Releases all resources. In-flight fetches are abandoned, and any later render fails
    /// with [`SceneError::Destroyed`]. Destroying a scene twice does nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            warn!("Scene #{} was already destroyed", self.id);
            return;
        }
        trace!("Destroying scene #{}", self.id);
        self.release();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn release(&mut self) {
        self.destroyed = true;
        self.loader.shutdown();
        self.processes.close();
        self.backend.release();
        self.last_frame = None;
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    /// Finds the named geometry under a canvas pixel of the last frame.
    pub fn pick(&self, x: f32, y: f32) -> Option<PickHit> {
        picking::pick(self.last_frame.as_ref()?, x, y)
    }

    /// Qualified names of all `name` nodes in the last frame.
    pub fn names(&self) -> Vec<NamePath> {
        self.last_frame
            .as_ref()
            .map(|frame| frame.names.paths().cloned().collect())
            .unwrap_or_default()
    }

    /// Looks up a qualified name, like `spheres/blueGroup/left`, in the last frame.
    pub fn lookup(&self, path: &str) -> Option<&NamedEntry> {
        let path: NamePath = path.parse().ok()?;
        self.last_frame.as_ref()?.names.get(&path)
    }

    /// `load` nodes that failed for good.
    pub fn load_failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    /// The current node tree, including grafted asset content.
    pub fn snapshot(&self) -> Node {
        self.graph.snapshot()
    }

    fn start_fetch(&mut self, request: LoadRequest, frame: u64) {
        let process = self.processes.create(Process::asset_load(&request.uri, frame));
        let target = request.log_target.as_deref().unwrap_or(DEFAULT_LOG_TARGET);
        info!(target: target, "Loading asset `{}`", request.uri);

        let job = FetchJob {
            node: request.node,
            process,
            attempt: 0,
            request: FetchRequest::new(&request.uri, self.proxy.as_ref()),
        };

        match self.loader.submit(job) {
            Ok(()) => self.graph.set_load_state(
                request.node,
                LoadState::Pending {
                    process,
                    attempt: 0,
                    log_target: request.log_target,
                },
            ),
            Err(e) => {
                error!(target: target, "Couldn't start loading `{}`: {e}", request.uri);
                self.fail_load(request.node, process, &request.uri, e.to_string(), 1, frame);
            }
        }
    }

    fn complete_fetch(&mut self, completion: FetchCompletion, frame: u64, now: Instant) {
        let FetchCompletion { job, result } = completion;

        let log_target = match self.graph.load_state(job.node) {
            Some(LoadState::Pending {
                process,
                attempt,
                log_target,
            }) if *process == job.process && *attempt == job.attempt => log_target.clone(),
            _ => {
                trace!("Dropping stale fetch result of `{}`", job.request.uri);
                return;
            }
        };
        let target = log_target.as_deref().unwrap_or(DEFAULT_LOG_TARGET);

        match result {
            Ok(nodes) => {
                let fragment: Fragment = Arc::from(nodes);
                if let Err(e) = self.check_geometry(&fragment) {
                    let error = format!("invalid geometry in `{}`: {e}", job.request.uri);
                    error!(target: target, "{error}");
                    let attempts = job.attempt + 1;
                    self.fail_load(job.node, job.process, &job.request.uri, error, attempts, frame);
                    return;
                }

                info!(
                    target: target,
                    "Loaded asset `{}` ({} nodes)",
                    job.request.uri,
                    fragment.iter().map(Node::count).sum::<usize>()
                );

                self.graph.graft(job.node, &fragment);
                self.graph.set_load_state(job.node, LoadState::Loaded);
                debug!(target: target, "Scene #{} has {} nodes", self.id, self.graph.len());
                self.cache
                    .lock()
                    .insert(job.request.uri.clone(), fragment, now);
                self.processes.retire(job.process);
            }
            Err(e) if job.attempt < self.options.retries => {
                warn!(target: target, "{e}, retrying");
                let retry = FetchJob {
                    attempt: job.attempt + 1,
                    ..job.clone()
                };
                match self.loader.submit(retry) {
                    Ok(()) => self.graph.set_load_state(
                        job.node,
                        LoadState::Pending {
                            process: job.process,
                            attempt: job.attempt + 1,
                            log_target,
                        },
                    ),
                    Err(e) => {
                        error!(target: target, "{e}");
                        let attempts = job.attempt + 1;
                        let uri = job.request.uri;
                        self.fail_load(job.node, job.process, &uri, e.to_string(), attempts, frame);
                    }
                }
            }
            Err(e) => {
                error!(target: target, "{e}");
                let attempts = job.attempt + 1;
                let uri = job.request.uri;
                self.fail_load(job.node, job.process, &uri, e.to_string(), attempts, frame);
            }
        }
    }

    /// Generates the meshes of a fetched fragment, so that bad geometry fails its load instead
    /// of every following render.
    fn check_geometry(&mut self, fragment: &[Node]) -> Result<(), MeshError> {
        for node in fragment.iter().flat_map(Node::iter) {
            if let NodeKind::Geometry(geometry) = &node.kind {
                self.geometry.mesh(geometry)?;
            }
        }
        Ok(())
    }

    fn reject_cycle(&mut self, cycle: LoadCycle, frame: u64) {
        let target = cycle.log_target.as_deref().unwrap_or(DEFAULT_LOG_TARGET);
        let start = cycle
            .chain
            .iter()
            .position(|uri| *uri == cycle.uri)
            .unwrap_or_default();
        let chain = cycle.chain[start..]
            .iter()
            .chain([&cycle.uri])
            .join(" -> ");

        let error = format!("asset `{}` includes itself ({chain})", cycle.uri);
        error!(target: target, "{error}");
        self.failures.push(LoadFailure {
            uri: cycle.uri,
            error,
            attempts: 0,
            frame,
        });
    }

    fn fail_load(
        &mut self,
        node: PoolHandle,
        process: ProcessId,
        uri: &str,
        error: String,
        attempts: u32,
        frame: u64,
    ) {
        self.graph.set_load_state(node, LoadState::Failed);
        self.processes.retire(process);
        self.failures.push(LoadFailure {
            uri: uri.to_string(),
            error,
            attempts,
            frame,
        });
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        if !self.destroyed {
            self.release();
        }
    }
}
