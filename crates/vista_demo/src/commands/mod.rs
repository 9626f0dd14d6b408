use clap::Args;
use log::*;
use std::{fs, path::PathBuf, time::Duration};
use vista::{
    assets::{FileFetcher, Url},
    config::EngineConfig,
    graphics::{RecordingBackend, RecordingHandle},
    nodes::parse_scene_toml,
    Scene, SceneOptions,
};
use vista_utils::{AnyResult, AnyhowResultExt};

pub mod load;
pub mod names;
pub mod pick;

/// Scene selection, shared by all commands
#[derive(Args)]
pub struct SceneArgs {
    /// Scene file (TOML)
    pub scene: PathBuf,
    /// Directory served in place of remote asset hosts, `http://host/path` maps to
    /// `<dir>/host/path`
    #[arg(long, short = 'a', default_value = "assets")]
    pub assets_dir: PathBuf,
    /// Proxy for cross-domain asset requests, overrides the configuration
    #[arg(long)]
    pub proxy: Option<String>,
    /// Time to wait for assets, in seconds
    #[arg(long, short = 't', default_value_t = 30)]
    pub timeout: u64,
}

impl SceneArgs {
    /// Creates the scene, without rendering it.
    pub fn open(&self, config: &EngineConfig) -> AnyResult<(Scene, RecordingHandle)> {
        let text = fs::read_to_string(&self.scene)
            .otherwise(format!("couldn't read scene `{}`", self.scene.display()))?;
        let root = parse_scene_toml(&text)
            .otherwise(format!("couldn't parse scene `{}`", self.scene.display()))?;

        let mut options = SceneOptions::from_config(config);
        if let Some(proxy) = &self.proxy {
            Url::parse(proxy).otherwise(format!("invalid proxy `{proxy}`"))?;
            options.proxy = Some(proxy.clone());
        }

        let backend = RecordingBackend::new();
        let stats = backend.handle();
        let scene = Scene::builder(options)
            .root(root)
            .fetcher(FileFetcher::new(&self.assets_dir))
            .backend(backend)
            .build();

        Ok((scene, stats))
    }

    /// Renders the scene until all of its assets are loaded, returning the amount of frames.
    pub fn load(&self, scene: &mut Scene) -> AnyResult<u64> {
        let frames = scene
            .run_until_idle(Duration::from_secs(self.timeout))
            .otherwise(format!("couldn't load `{}`", self.scene.display()))?;

        for failure in scene.load_failures() {
            warn!(
                "Asset `{}` failed after {} attempts: {}",
                failure.uri, failure.attempts, failure.error
            );
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    pub(crate) fn demo_scene(name: &str) -> SceneArgs {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        SceneArgs {
            scene: root.join("scenes").join(name),
            assets_dir: root.join("assets"),
            proxy: None,
            timeout: 10,
        }
    }

    #[test]
    fn teapot_scene_loads() {
        let args = demo_scene("teapot.toml");
        let (mut scene, stats) = args.open(&EngineConfig::default()).unwrap();

        let frames = args.load(&mut scene).unwrap();
        assert!(frames >= 2);
        assert_eq!(scene.num_processes(), 0);
        assert!(scene.load_failures().is_empty());
        assert!(scene.lookup("teapot").is_some());

        let stats = stats.stats();
        assert_eq!(stats.draws, 3);
        assert!(stats.named_draws.iter().all(|name| name == "teapot"));

        scene.destroy();
        assert!(scene.render().is_err());
    }

    #[test]
    fn longest_timeout_waits_for_assets() {
        let mut args = demo_scene("teapot.toml");
        args.timeout = u64::MAX;
        let (mut scene, _) = args.open(&EngineConfig::default()).unwrap();

        assert!(args.load(&mut scene).unwrap() >= 2);
        assert_eq!(scene.num_processes(), 0);
    }

    #[test]
    fn invalid_proxies_are_rejected() {
        let mut args = demo_scene("teapot.toml");
        args.proxy = Some(String::from("jsonp_wrapper.pl"));
        let error = args.open(&EngineConfig::default()).err().unwrap();
        assert!(error.to_string().contains("jsonp_wrapper.pl"));
    }

    #[test]
    fn missing_assets_are_reported_not_fatal() {
        let mut args = demo_scene("teapot.toml");
        args.assets_dir = PathBuf::from("does/not/exist");
        let (mut scene, stats) = args.open(&EngineConfig::default()).unwrap();

        args.load(&mut scene).unwrap();
        assert_eq!(scene.load_failures().len(), 1);
        assert_eq!(stats.stats().draws, 0);
    }

    #[test]
    fn picking_scene_has_six_leaves() {
        let args = demo_scene("picking.toml");
        let (mut scene, _) = args.open(&EngineConfig::default()).unwrap();
        assert_eq!(args.load(&mut scene).unwrap(), 1);

        let leaves: Vec<_> = scene
            .last_frame()
            .unwrap()
            .names
            .leaves()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            leaves,
            [
                "spheres/blueGroup/left",
                "spheres/blueGroup/right",
                "spheres/greenGroup/left",
                "spheres/greenGroup/right",
                "spheres/redGroup/back",
                "spheres/redGroup/front",
            ]
        );
    }
}
