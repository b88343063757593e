use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;

use schemaver_common::{Error, Result};
use tracing::{debug, error, info, warn};

use crate::executor::{Executor, Transaction};
use crate::migration::{Migration, MigrationSet};
use crate::report::{Direction, MigrationReport};
use crate::splitter::StatementSplitter;

/// Walks a database between schema versions using a validated
/// [`MigrationSet`].
///
/// The manager keeps no state between calls: the only state is the version
/// persisted through the [`Executor`]. Each migration step runs its script
/// and its version write in one transaction, so a step either fully happens
/// or leaves no trace. There is no transaction spanning several steps.
///
/// Callers must not run two migrations against the same database at once.
/// Taking the executor by `&mut` enforces this for a single handle; shared
/// handles serialise through their own lock (see the SQLite `SchemaStore`).
pub struct MigrationManager {
    migrations: MigrationSet,
    cancel: Option<Arc<AtomicBool>>,
}

impl MigrationManager {
    pub fn new(migrations: MigrationSet) -> Self {
        Self {
            migrations,
            cancel: None,
        }
    }

    /// Stop between steps once `flag` is set. A step already in progress
    /// always runs to commit or rollback.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn migrations(&self) -> &MigrationSet {
        &self.migrations
    }

    pub fn latest_version(&self) -> u32 {
        self.migrations.latest_version()
    }

    /// Migrations a forward run from `current` to the latest version would apply.
    pub fn pending(&self, current: u32) -> Vec<&Migration> {
        self.migrations
            .forward_path(current, self.latest_version())
            .collect()
    }

    /// Move the schema from `current` to `target`.
    ///
    /// Forward runs apply `(current, target]` ascending and persist each
    /// step's version. Backward runs undo `(target, current]` descending and
    /// persist `version - 1` after each step, then `target` itself if gaps
    /// left the marker above it. Irreversible steps on the way down run no
    /// script but still move the marker.
    pub fn migrate<E: Executor + ?Sized>(
        &self,
        executor: &mut E,
        current: u32,
        target: u32,
    ) -> Result<MigrationReport> {
        let started = Instant::now();
        let mut report = match current.cmp(&target) {
            Ordering::Equal => {
                info!("database is already at version {current}, no migration needed");
                return Ok(MigrationReport::new(Direction::None, current, current));
            }
            Ordering::Less => self.apply_forward(executor, current, target)?,
            Ordering::Greater => self.roll_back(executor, current, target)?,
        };
        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Read the persisted version and migrate from it to `target`.
    pub fn migrate_to<E: Executor + ?Sized>(
        &self,
        executor: &mut E,
        target: u32,
    ) -> Result<MigrationReport> {
        let current = self.current_version(executor)?;
        self.migrate(executor, current, target)
    }

    pub fn migrate_to_latest<E: Executor + ?Sized>(
        &self,
        executor: &mut E,
    ) -> Result<MigrationReport> {
        self.migrate_to(executor, self.latest_version())
    }

    /// Roll back from the persisted version to `target`, which must be lower.
    pub fn rollback_to_version<E: Executor + ?Sized>(
        &self,
        executor: &mut E,
        target: u32,
    ) -> Result<MigrationReport> {
        let current = self.current_version(executor)?;
        if target >= current {
            return Err(Error::InvalidRollbackTarget { target, current });
        }

        let started = Instant::now();
        let mut report = self.roll_back(executor, current, target)?;
        report.elapsed = started.elapsed();
        Ok(report)
    }

    pub fn current_version<E: Executor + ?Sized>(&self, executor: &mut E) -> Result<u32> {
        self.initialize_version_table(executor)?;
        let version = match executor.read_version()? {
            Some(version) => version,
            None => {
                warn!("no rows found in the version table, assuming version 0");
                0
            }
        };
        debug!("current schema version: {version}");
        Ok(version)
    }

    pub fn update_version<E: Executor + ?Sized>(&self, executor: &mut E, version: u32) -> Result<()> {
        self.initialize_version_table(executor)?;
        let mut tx = Transaction::begin(executor)?;
        tx.write_version(version)?;
        tx.commit()?;
        debug!("updated schema version to {version}");
        Ok(())
    }

    pub fn initialize_version_table<E: Executor + ?Sized>(&self, executor: &mut E) -> Result<()> {
        executor.ensure_version_store_exists()
    }

    fn apply_forward<E: Executor + ?Sized>(
        &self,
        executor: &mut E,
        current: u32,
        target: u32,
    ) -> Result<MigrationReport> {
        self.initialize_version_table(executor)?;

        let mut report = MigrationReport::new(Direction::Up, current, current);
        for migration in self.migrations.forward_path(current, target) {
            self.check_cancelled(report.to)?;
            run_step(executor, migration, migration.forward_script(), migration.version())?;
            info!("migrated to version {migration}");
            report.applied.push(migration.version());
            report.to = migration.version();
        }
        Ok(report)
    }

    /// The one backward walk shared by `migrate` and `rollback_to_version`.
    fn roll_back<E: Executor + ?Sized>(
        &self,
        executor: &mut E,
        current: u32,
        target: u32,
    ) -> Result<MigrationReport> {
        self.initialize_version_table(executor)?;

        let mut report = MigrationReport::new(Direction::Down, current, current);
        for migration in self.migrations.rollback_path(target, current) {
            self.check_cancelled(report.to)?;
            let version = migration.version() - 1;
            match migration.rollback_script() {
                Some(script) => {
                    run_step(executor, migration, script, version)?;
                    info!("rolled back migration {migration}, now at version {version}");
                    report.applied.push(migration.version());
                }
                None => {
                    warn!("migration {migration} is irreversible, moving to version {version} without a rollback script");
                    run_step(executor, migration, "", version)?;
                    report.skipped.push(migration.version());
                }
            }
            report.to = version;
        }

        // Gaps below the last undone migration, or a persisted version above
        // the whole set, leave the marker above the target.
        if report.to != target {
            self.check_cancelled(report.to)?;
            apply_script(executor, "", target)?;
            info!(
                "no migrations between version {target} and {}, recorded version {target}",
                report.to
            );
            report.to = target;
        }
        Ok(report)
    }

    fn check_cancelled(&self, version: u32) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(AtomicOrdering::SeqCst) => {
                info!("migration cancelled at version {version}");
                Err(Error::Cancelled { version })
            }
            _ => Ok(()),
        }
    }
}

/// Run `script` and persist `version` as one transaction.
fn run_step<E: Executor + ?Sized>(
    executor: &mut E,
    migration: &Migration,
    script: &str,
    version: u32,
) -> Result<()> {
    apply_script(executor, script, version).map_err(|e| {
        error!("migration {migration} failed: {e}");
        Error::MigrationExecution {
            version: migration.version(),
            script: script.to_string(),
            source: Box::new(e),
        }
    })
}

fn apply_script<E: Executor + ?Sized>(executor: &mut E, script: &str, version: u32) -> Result<()> {
    let mut tx = Transaction::begin(executor)?;
    for statement in StatementSplitter::split(script) {
        debug!("executing statement: {statement}");
        tx.execute(statement)?;
    }
    tx.write_version(version)?;
    tx.commit()
}
