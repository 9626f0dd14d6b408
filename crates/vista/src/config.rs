//! Engine configuration file
//!
//! Settings are read from a TOML file, usually called `vista.toml`. Every field is optional:
//! ```toml
//! [canvas]
//! id = "theCanvas"
//! width = 1030
//! height = 800
//!
//! [assets]
//! proxy = "http://scenejs.org/cgi-bin/jsonp_wrapper.pl"
//! fetch_workers = 4
//! retries = 1
//! cache_max_inactive_secs = 300
//! ```

use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use url::Url;

pub const DEFAULT_CANVAS_ID: &str = "canvas";
pub const DEFAULT_CANVAS_WIDTH: u32 = 1030;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 800;
pub const DEFAULT_FETCH_WORKERS: usize = 4;
pub const DEFAULT_CACHE_MAX_INACTIVE_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid setting: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            id: String::from(DEFAULT_CANVAS_ID),
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetConfig {
    /// Proxy for cross-domain fetches.
    pub proxy: Option<String>,
    pub fetch_workers: usize,
    /// Extra attempts for failed fetches.
    pub retries: u32,
    pub cache_max_inactive_secs: u64,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            fetch_workers: DEFAULT_FETCH_WORKERS,
            retries: 0,
            cache_max_inactive_secs: DEFAULT_CACHE_MAX_INACTIVE_SECS,
        }
    }
}

impl AssetConfig {
    pub fn cache_max_inactive(&self) -> Duration {
        Duration::from_secs(self.cache_max_inactive_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub canvas: CanvasConfig,
    pub assets: AssetConfig,
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::Invalid("canvas size can't be zero"));
        }
        if self.canvas.id.is_empty() {
            return Err(ConfigError::Invalid("canvas id can't be empty"));
        }
        if self.assets.fetch_workers == 0 {
            return Err(ConfigError::Invalid("at least one fetch worker is needed"));
        }
        if let Some(proxy) = &self.assets.proxy {
            Url::parse(proxy).map_err(|_| ConfigError::Invalid("proxy must be an absolute URL"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_use_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [assets]
            proxy = "http://localhost/proxy"
            retries = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.canvas, CanvasConfig::default());
        assert_eq!(config.assets.proxy.as_deref(), Some("http://localhost/proxy"));
        assert_eq!(config.assets.retries, 2);
        assert_eq!(config.assets.fetch_workers, DEFAULT_FETCH_WORKERS);
        assert_eq!(
            config.assets.cache_max_inactive(),
            Duration::from_secs(DEFAULT_CACHE_MAX_INACTIVE_SECS)
        );
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn invalid_files() {
        assert!(matches!(
            EngineConfig::from_toml_str("[canvas]\nwidth = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[assets]\nfetch_workers = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[canvas]\ncolour = 1"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[assets]\nproxy = \"cgi-bin/jsonp_wrapper.pl\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::load("/definitely/not/here/vista.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
