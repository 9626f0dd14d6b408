use super::{graph::SceneGraph, ProcessTracker, Scene};
use crate::{
    assets::{AssetCache, AssetFetcher, AssetLoader, FetchRequest, SharedAssetCache},
    config::*,
    graphics::{Canvas, GeometryCache, RecordingBackend, RenderBackend},
    nodes::Node,
};
use anyhow::bail;
use derive_builder::Builder;
use log::*;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use url::Url;
use vista_utils::AnyResult;

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Scene settings.
///
/// ```
/// use vista::scene::SceneOptions;
///
/// let options = SceneOptions::builder()
///     .canvas_id("theCanvas")
///     .proxy("http://scenejs.org/cgi-bin/jsonp_wrapper.pl")
///     .build()
///     .unwrap();
/// assert_eq!(options.width, 1030);
/// assert!(SceneOptions::builder().width(0u32).build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(pattern = "owned", setter(into), build_fn(validate = "Self::validate"))]
pub struct SceneOptions {
    #[builder(default = "String::from(DEFAULT_CANVAS_ID)")]
    pub canvas_id: String,
    #[builder(default = "DEFAULT_CANVAS_WIDTH")]
    pub width: u32,
    #[builder(default = "DEFAULT_CANVAS_HEIGHT")]
    pub height: u32,
    /// Proxy for cross-domain fetches.
    #[builder(default, setter(into, strip_option))]
    pub proxy: Option<String>,
    /// Extra attempts for failed fetches.
    #[builder(default)]
    pub retries: u32,
    #[builder(default = "DEFAULT_FETCH_WORKERS")]
    pub fetch_workers: usize,
    /// Used when the scene creates its own asset cache.
    #[builder(default = "Duration::from_secs(DEFAULT_CACHE_MAX_INACTIVE_SECS)")]
    pub cache_max_inactive: Duration,
}

impl SceneOptions {
    pub fn builder() -> SceneOptionsBuilder {
        SceneOptionsBuilder::default()
    }

    pub fn from_config(config: &EngineConfig) -> SceneOptions {
        SceneOptions {
            canvas_id: config.canvas.id.clone(),
            width: config.canvas.width,
            height: config.canvas.height,
            proxy: config.assets.proxy.clone(),
            retries: config.assets.retries,
            fetch_workers: config.assets.fetch_workers,
            cache_max_inactive: config.assets.cache_max_inactive(),
        }
    }
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl SceneOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.width == Some(0) || self.height == Some(0) {
            return Err(String::from("canvas size can't be zero"));
        }
        if self.fetch_workers == Some(0) {
            return Err(String::from("at least one fetch worker is needed"));
        }
        if matches!(&self.canvas_id, Some(id) if id.is_empty()) {
            return Err(String::from("canvas id can't be empty"));
        }
        if let Some(Some(proxy)) = &self.proxy {
            Url::parse(proxy).map_err(|e| format!("invalid proxy `{proxy}`: {e}"))?;
        }
        Ok(())
    }
}

/// Fetcher used when none is given, every fetch fails.
fn no_fetcher(request: &FetchRequest) -> AnyResult<String> {
    bail!("no asset fetcher configured, can't fetch `{}`", request.uri)
}

/// Assembles a [`Scene`] from its options and collaborators.
///
/// Unless set otherwise, the scene has an empty root group, renders into a
/// [`RecordingBackend`], has its own [`AssetCache`], and fails every fetch.
pub struct SceneBuilder {
    options: SceneOptions,
    root: Option<Node>,
    backend: Option<Box<dyn RenderBackend>>,
    fetcher: Option<Arc<dyn AssetFetcher>>,
    cache: Option<SharedAssetCache>,
}

impl SceneBuilder {
    pub fn new(options: SceneOptions) -> Self {
        Self {
            options,
            root: None,
            backend: None,
            fetcher: None,
            cache: None,
        }
    }

    pub fn root(mut self, root: Node) -> Self {
        self.root = Some(root);
        self
    }

    pub fn backend(mut self, backend: impl RenderBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn fetcher(mut self, fetcher: impl AssetFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn shared_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Uses a cache shared with other scenes.
    pub fn cache(mut self, cache: SharedAssetCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Scene {
        let options = self.options;
        let root = self.root.unwrap_or_else(|| Node::group([]));
        let fetcher = self.fetcher.unwrap_or_else(|| Arc::new(no_fetcher));
        let cache = self
            .cache
            .unwrap_or_else(|| AssetCache::shared(options.cache_max_inactive));
        let backend = self
            .backend
            .unwrap_or_else(|| Box::new(RecordingBackend::new()));

        let id = NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed);
        let proxy = options
            .proxy
            .as_deref()
            .and_then(|proxy| match Url::parse(proxy) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Ignoring invalid proxy `{proxy}` of scene #{id}: {e}");
                    None
                }
            });
        trace!(
            "Creating scene #{id} on canvas `{}` ({} nodes)",
            options.canvas_id,
            root.count()
        );

        Scene {
            id,
            canvas: Canvas {
                id: options.canvas_id.clone(),
                width: options.width,
                height: options.height,
            },
            graph: SceneGraph::new(&root),
            processes: ProcessTracker::new(),
            loader: AssetLoader::new(fetcher, options.fetch_workers),
            cache,
            geometry: GeometryCache::new(),
            backend,
            last_frame: None,
            frame_number: 0,
            failures: vec![],
            destroyed: false,
            proxy,
            options,
        }
    }
}
