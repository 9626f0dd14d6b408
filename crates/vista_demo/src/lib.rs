//! Vista demo driver
//!
//! Loads TOML scene files into headless scenes, serving remote assets from a local directory.
//! It can wait for all assets to load, list the names declared by a scene, and pick named
//! objects at canvas coordinates.

use clap::{ArgAction, Parser, Subcommand};
use commands::{load::LoadCommand, names::NamesCommand, pick::PickCommand};
use log::LevelFilter;
use std::path::PathBuf;
use vista::config::EngineConfig;
use vista_utils::{ok, AnyResult, AnyhowResultExt};

pub mod commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,
    /// Increases log verbosity, can be repeated
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: CliCommand,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn engine_config(&self) -> AnyResult<EngineConfig> {
        match &self.config {
            Some(path) => EngineConfig::load(path)
                .otherwise(format!("couldn't load configuration `{}`", path.display())),
            None => Ok(EngineConfig::default()),
        }
    }
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Renders a scene until all of its assets are loaded
    Load(LoadCommand),
    /// Picks named objects at canvas coordinates
    Pick(PickCommand),
    /// Lists the qualified names declared by a scene
    Names(NamesCommand),
}

pub trait Command {
    fn run(self, config: &EngineConfig) -> AnyResult;
}

/// Runs `vista_demo` as if it was ran from the command line.
pub fn run(cli: Cli) -> AnyResult {
    let config = cli.engine_config()?;
    match cli.command {
        CliCommand::Load(c) => c.run(&config)?,
        CliCommand::Pick(c) => c.run(&config)?,
        CliCommand::Names(c) => c.run(&config)?,
    }
    ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_commands() {
        let cli = Cli::try_parse_from(["vista_demo", "names", "scene.toml", "-vv"]).unwrap();
        assert_eq!(cli.log_level(), LevelFilter::Debug);
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, CliCommand::Names(_)));
    }

    #[test]
    fn missing_config_is_reported() {
        let cli = Cli::try_parse_from([
            "vista_demo",
            "--config",
            "does/not/exist.toml",
            "load",
            "scene.toml",
        ])
        .unwrap();
        let error = cli.engine_config().unwrap_err();
        assert!(error.to_string().contains("does/not/exist.toml"));
    }
}
