use schemaver_common::{Error, Result};

use crate::manager::MigrationManager;
use crate::migration::{Migration, MigrationSet};
use crate::splitter::StatementSplitter;

/// Accumulates migrations and validates them into a [`MigrationSet`].
///
/// The builder keeps its accumulator after `build`, so it can be built again
/// or extended with further migrations.
#[derive(Debug, Default)]
pub struct MigrationBuilder {
    migrations: Vec<Migration>,
}

impl MigrationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_migration(&mut self, migration: Migration) -> &mut Self {
        self.migrations.push(migration);
        self
    }

    pub fn add_migrations(&mut self, migrations: impl IntoIterator<Item = Migration>) -> &mut Self {
        self.migrations.extend(migrations);
        self
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Sort the accumulated migrations by version and validate them.
    pub fn build(&mut self) -> Result<MigrationSet> {
        self.migrations.sort_by_key(Migration::version);

        let versions: Vec<u32> = self.migrations.iter().map(Migration::version).collect();
        if versions.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::DuplicateVersion { versions });
        }

        for migration in &self.migrations {
            if migration.version() == 0 {
                return Err(Error::InvalidMigration(
                    "version 0 is reserved for the empty schema".into(),
                ));
            }
            if StatementSplitter::split(migration.forward_script()).is_empty() {
                return Err(Error::InvalidMigration(format!(
                    "migration {migration} has an empty forward script"
                )));
            }
        }

        Ok(MigrationSet::from_sorted(self.migrations.clone()))
    }

    pub fn build_manager(&mut self) -> Result<MigrationManager> {
        self.build().map(MigrationManager::new)
    }
}
