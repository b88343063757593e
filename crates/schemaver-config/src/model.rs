use std::path::{Path, PathBuf};

use schemaver_common::{Error, Result};
use schemaver_core::{Migration, MigrationBuilder};
use serde::{Deserialize, Serialize};

pub const DEFAULT_VERSION_TABLE: &str = "schema_version";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigratorConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Version to migrate to; the latest migration when absent.
    #[serde(default)]
    pub target_version: Option<u32>,

    #[serde(default)]
    pub migrations: Vec<MigrationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file. An in-memory database is used when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_version_table")]
    pub version_table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            version_table: default_version_table(),
        }
    }
}

fn default_version_table() -> String {
    DEFAULT_VERSION_TABLE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One migration as written in a config file. Scripts are given inline
/// (`up`/`down`) or as paths relative to the config file (`up_file`/`down_file`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationEntry {
    pub version: u32,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub up: Option<String>,

    #[serde(default)]
    pub up_file: Option<PathBuf>,

    #[serde(default)]
    pub down: Option<String>,

    #[serde(default)]
    pub down_file: Option<PathBuf>,
}

impl MigrationEntry {
    pub fn to_migration(&self, base_dir: &Path) -> Result<Migration> {
        let up = match (&self.up, &self.up_file) {
            (Some(sql), None) => sql.clone(),
            (None, Some(file)) => read_script(base_dir, file)?,
            (Some(_), Some(_)) => {
                return Err(Error::Config(format!(
                    "migration {}: set either `up` or `up_file`, not both",
                    self.version
                )));
            }
            (None, None) => {
                return Err(Error::Config(format!(
                    "migration {}: missing `up` script",
                    self.version
                )));
            }
        };

        let down = match (&self.down, &self.down_file) {
            (Some(sql), None) => Some(sql.clone()),
            (None, Some(file)) => Some(read_script(base_dir, file)?),
            (None, None) => None,
            (Some(_), Some(_)) => {
                return Err(Error::Config(format!(
                    "migration {}: set either `down` or `down_file`, not both",
                    self.version
                )));
            }
        };

        let mut migration = Migration::new(self.version, up);
        if let Some(down) = down {
            migration = migration.with_rollback(down);
        }
        if let Some(name) = &self.name {
            migration = migration.with_name(name.clone());
        }
        Ok(migration)
    }
}

fn read_script(base_dir: &Path, file: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(base_dir.join(file))?)
}

impl MigratorConfig {
    /// Resolve every configured migration, reading script files relative to
    /// `base_dir`.
    pub fn migrations(&self, base_dir: &Path) -> Result<Vec<Migration>> {
        self.migrations
            .iter()
            .map(|entry| entry.to_migration(base_dir))
            .collect()
    }

    pub fn builder(&self, base_dir: &Path) -> Result<MigrationBuilder> {
        let mut builder = MigrationBuilder::new();
        builder.add_migrations(self.migrations(base_dir)?);
        Ok(builder)
    }
}
