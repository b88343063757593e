use rusqlite::{Connection, OptionalExtension, params};
use schemaver_common::{Error, Result};
use schemaver_config::model::DEFAULT_VERSION_TABLE;
use tracing::debug;

const MAX_NAME_LEN: usize = 64;

/// The single-row table holding the persisted schema version.
///
/// The name is interpolated into SQL, so it is restricted to a plain
/// identifier: ASCII letters, digits and `_`, not starting with a digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTable {
    name: String,
}

impl VersionTable {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create the table if missing and seed it with version 0 when empty.
    pub(crate) fn ensure(&self, conn: &Connection) -> Result<()> {
        let name = &self.name;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {name} (version INTEGER PRIMARY KEY);
             INSERT INTO {name} (version) SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM {name});"
        ))
        .map_err(|e| Error::Database(format!("failed to initialize {name}: {e}")))
    }

    pub(crate) fn read(&self, conn: &Connection) -> Result<Option<u32>> {
        let name = &self.name;
        let version = conn
            .query_row(&format!("SELECT version FROM {name} LIMIT 1"), [], |row| {
                row.get::<_, u32>(0)
            })
            .optional()
            .map_err(|e| Error::Database(format!("failed to read {name}: {e}")))?;
        debug!("read version {version:?} from {name}");
        Ok(version)
    }

    pub(crate) fn write(&self, conn: &Connection, version: u32) -> Result<()> {
        let name = &self.name;
        let updated = conn
            .execute(&format!("UPDATE {name} SET version = ?1"), params![version])
            .map_err(|e| Error::Database(format!("failed to update {name}: {e}")))?;

        if updated == 0 {
            conn.execute(
                &format!("INSERT INTO {name} (version) VALUES (?1)"),
                params![version],
            )
            .map_err(|e| Error::Database(format!("failed to insert into {name}: {e}")))?;
        }
        Ok(())
    }
}

impl Default for VersionTable {
    fn default() -> Self {
        Self {
            name: DEFAULT_VERSION_TABLE.to_string(),
        }
    }
}

fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Config("version table name cannot be empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::Config(format!(
            "version table name longer than {MAX_NAME_LEN} characters"
        )));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Error::Config(format!(
            "version table name {name:?} cannot start with a digit"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Config(format!(
            "version table name {name:?} may only contain letters, digits and '_'"
        )));
    }
    Ok(())
}
