use super::SceneArgs;
use clap::Args;
use itertools::Itertools;
use vista::config::EngineConfig;
use vista_utils::{ok, AnyResult};

#[derive(Args)]
pub struct NamesCommand {
    #[command(flatten)]
    pub scene: SceneArgs,
    /// Only lists names without nested names
    #[arg(long)]
    pub leaves: bool,
}

impl crate::Command for NamesCommand {
    fn run(self, config: &EngineConfig) -> AnyResult {
        let (mut scene, _) = self.scene.open(config)?;
        self.scene.load(&mut scene)?;

        let Some(frame) = scene.last_frame() else {
            return ok();
        };
        let names = &frame.names;
        let paths = if self.leaves {
            names.leaves().collect_vec()
        } else {
            names.paths().collect_vec()
        };

        for path in paths {
            let Some(entry) = names.get(path) else {
                continue;
            };
            println!(
                "{path} (pick id {:08x}, {} objects)",
                entry.pick_id,
                entry.bounds.len()
            );
        }

        scene.destroy();
        ok()
    }
}
