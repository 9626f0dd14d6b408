use super::SceneArgs;
use clap::Args;
use vista::config::EngineConfig;
use vista_utils::{ok, AnyResult};

#[derive(Args)]
pub struct PickCommand {
    #[command(flatten)]
    pub scene: SceneArgs,
    /// Canvas pixel to pick at, like `400,300`. Can be repeated.
    #[arg(long = "at", value_parser = parse_point, required = true)]
    pub points: Vec<(f32, f32)>,
}

/// Parses an `x,y` pixel position.
pub fn parse_point(s: &str) -> Result<(f32, f32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let coordinate = |v: &str| {
        v.trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid coordinate `{v}`"))
    };
    Ok((coordinate(x)?, coordinate(y)?))
}

impl crate::Command for PickCommand {
    fn run(self, config: &EngineConfig) -> AnyResult {
        let (mut scene, _) = self.scene.open(config)?;
        self.scene.load(&mut scene)?;

        for (x, y) in self.points {
            match scene.pick(x, y) {
                Some(hit) => println!(
                    "{x},{y}: picked {} (pass {}, distance {:.2})",
                    hit.name, hit.pass, hit.distance
                ),
                None => println!("{x},{y}: nothing"),
            }
        }

        scene.destroy();
        ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::demo_scene;

    #[test]
    fn points_parse() {
        assert_eq!(parse_point("400,300"), Ok((400.0, 300.0)));
        assert_eq!(parse_point(" 1.5 , 2"), Ok((1.5, 2.0)));
        assert!(parse_point("400").is_err());
        assert!(parse_point("a,1").is_err());
        assert!(parse_point("NaN,1").is_err());
    }

    #[test]
    fn picks_nearest_sphere() {
        let args = demo_scene("picking.toml");
        let (mut scene, _) = args.open(&EngineConfig::default()).unwrap();
        args.load(&mut scene).unwrap();

        // Straight below the view center, closest to the camera
        let hit = scene.pick(400.0, 399.0).unwrap();
        assert_eq!(hit.name.to_string(), "spheres/redGroup/front");
        assert_eq!(hit.pass, 0);

        // Above the horizon, and outside of the viewport
        assert!(scene.pick(1.0, 1.0).is_none());
        assert!(scene.pick(900.0, 300.0).is_none());
    }
}
