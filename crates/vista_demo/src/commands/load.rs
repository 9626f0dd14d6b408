use super::SceneArgs;
use clap::Args;
use log::*;
use vista::config::EngineConfig;
use vista_utils::{ok, AnyResult};

#[derive(Args)]
pub struct LoadCommand {
    #[command(flatten)]
    pub scene: SceneArgs,
    /// Keeps the scene alive for this many frames after loading, instead of destroying it
    #[arg(long, default_value_t = 0)]
    pub extra_frames: u32,
}

impl crate::Command for LoadCommand {
    fn run(self, config: &EngineConfig) -> AnyResult {
        let (mut scene, stats) = self.scene.open(config)?;
        println!("Loading {}...", self.scene.scene.display());

        scene.on_idle(|| info!("No scene processes left"));

        scene.render()?;
        for (_, process) in scene.processes() {
            println!("  - Fetching {}...", process.description);
        }

        let frames = self.scene.load(&mut scene)?;
        for _ in 0..self.extra_frames {
            scene.render()?;
        }

        let stats = stats.stats();
        println!(
            " : Loaded in {frames} frames, {} passes, {} draws, {} triangles",
            stats.passes, stats.draws, stats.triangles
        );
        for failure in scene.load_failures() {
            println!("    Warning: couldn't load {}", failure.uri);
        }

        scene.destroy();
        ok()
    }
}
