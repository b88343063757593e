use std::path::{Path, PathBuf};

use schemaver_common::{Error, Result};
use tracing::info;

use crate::model::MigratorConfig;

/// Loads a [`MigratorConfig`] from a YAML or TOML file.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read `path`, choosing the format from its extension.
    pub fn load(path: &Path) -> Result<MigratorConfig> {
        let contents = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = Self::parse(&contents, ext)?;
        info!(
            "loaded config from {} ({} migrations)",
            path.display(),
            config.migrations.len()
        );
        Ok(config)
    }

    /// Parse config text. `format` is a file extension: `yml`, `yaml`, or `toml`.
    pub fn parse(contents: &str, format: &str) -> Result<MigratorConfig> {
        match format {
            "yml" | "yaml" => serde_yaml::from_str(contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}"))),
            "toml" => {
                toml::from_str(contents).map_err(|e| Error::Config(format!("TOML parse error: {e}")))
            }
            other => Err(Error::Config(format!(
                "unsupported config extension: {other}"
            ))),
        }
    }

    /// Directory that relative script paths in `config_path` resolve against.
    pub fn base_dir(config_path: &Path) -> PathBuf {
        config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf()
    }
}
