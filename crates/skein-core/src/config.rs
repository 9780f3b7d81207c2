use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{debug, info, warn};

pub const APP_DIR: &str = "skein";
pub const DATA_ENV: &str = "SKEIN_DATA";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_LIST_WIDTH: usize = 60;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub list_width: Option<usize>,
}

impl Config {
    #[tracing::instrument]
    pub fn load() -> anyhow::Result<Self> {
        let Some(dir) = dirs::config_dir() else {
            warn!("no config directory; using defaults");
            return Ok(Self::default());
        };
        Self::load_from(&dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", path.display()));
            }
        };

        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!(file = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn list_width(&self) -> usize {
        self.list_width.unwrap_or(DEFAULT_LIST_WIDTH)
    }
}

#[tracing::instrument(skip(config))]
pub fn resolve_base_dir(config: &Config) -> anyhow::Result<PathBuf> {
    let dir = if let Ok(env_dir) = std::env::var(DATA_ENV) {
        expand_tilde(Path::new(&env_dir))
    } else if let Some(config_dir) = &config.data_dir {
        expand_tilde(config_dir)
    } else {
        default_base_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
    }
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    Ok(dir)
}

fn default_base_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| anyhow!("cannot determine the config directory"))?;
    Ok(base.join(APP_DIR))
}

pub(crate) fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if text == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_config_file_yields_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = Config::load_from(&temp.path().join("config.toml")).expect("load");
        assert!(config.data_dir.is_none());
        assert_eq!(config.list_width(), DEFAULT_LIST_WIDTH);
    }

    #[test]
    fn config_file_overrides_are_read() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "data_dir = \"/tmp/elsewhere\"\nlist_width = 40\n").expect("write");

        let config = Config::load_from(&path).expect("load");
        assert_eq!(config.data_dir.as_deref(), Some(Path::new("/tmp/elsewhere")));
        assert_eq!(config.list_width(), 40);
    }

    #[test]
    fn malformed_config_is_an_error_not_a_default() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "list_width = \"wide\"\n").expect("write");

        assert!(Config::load_from(&path).is_err());
    }
}
