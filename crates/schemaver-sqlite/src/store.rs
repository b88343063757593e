use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use schemaver_common::{Error, Result};
use schemaver_config::DatabaseConfig;
use schemaver_core::{Executor, MigrationManager, MigrationReport};
use tracing::{info, warn};

use crate::executor;
use crate::version_table::VersionTable;

/// A managed SQLite database whose schema is versioned by schemaver.
///
/// The connection lives behind a mutex. [`SchemaStore::executor`] holds the
/// lock for as long as the returned executor lives, so two migration runs
/// through the same store never interleave.
pub struct SchemaStore {
    conn: Mutex<Connection>,
    table: VersionTable,
}

impl SchemaStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening schema store at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        Ok(Self::from_connection(conn))
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let table = VersionTable::new(config.version_table.clone())?;
        let store = match &config.path {
            Some(path) => Self::open(path)?,
            None => Self::in_memory()?,
        };
        Ok(store.with_version_table(table))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            table: VersionTable::default(),
        }
    }

    pub fn with_version_table(mut self, table: VersionTable) -> Self {
        self.table = table;
        self
    }

    pub fn version_table(&self) -> &VersionTable {
        &self.table
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("schema store lock poisoned".into()))
    }

    /// Lock the store and hand out an executor bound to the lock.
    pub fn executor(&self) -> Result<StoreExecutor<'_>> {
        Ok(StoreExecutor {
            conn: self.connection()?,
            table: &self.table,
        })
    }

    /// Run `f` against the connection while holding the store lock.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let conn = self.connection()?;
        f(&conn).map_err(|e| Error::Database(format!("query failed: {e}")))
    }

    pub fn current_version(&self, manager: &MigrationManager) -> Result<u32> {
        manager.current_version(&mut self.executor()?)
    }

    /// Migrate from the persisted version to `target`, or to the latest
    /// migration when `target` is `None`.
    pub fn migrate(&self, manager: &MigrationManager, target: Option<u32>) -> Result<MigrationReport> {
        let mut executor = self.executor()?;
        match target {
            Some(target) => manager.migrate_to(&mut executor, target),
            None => manager.migrate_to_latest(&mut executor),
        }
    }

    pub fn rollback(&self, manager: &MigrationManager, target: u32) -> Result<MigrationReport> {
        manager.rollback_to_version(&mut self.executor()?, target)
    }
}

/// Executor borrowed from a [`SchemaStore`]; the store stays locked until it
/// is dropped.
pub struct StoreExecutor<'s> {
    conn: MutexGuard<'s, Connection>,
    table: &'s VersionTable,
}

impl Executor for StoreExecutor<'_> {
    fn begin_transaction(&mut self) -> Result<()> {
        executor::begin(&self.conn)
    }

    fn execute(&mut self, statement: &str) -> Result<()> {
        executor::execute(&self.conn, statement)
    }

    fn commit(&mut self) -> Result<()> {
        executor::commit(&self.conn)
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        executor::rollback(&self.conn)
    }

    fn ensure_version_store_exists(&mut self) -> Result<()> {
        self.table.ensure(&self.conn)
    }

    fn read_version(&mut self) -> Result<Option<u32>> {
        self.table.read(&self.conn)
    }

    fn write_version(&mut self, version: u32) -> Result<()> {
        self.table.write(&self.conn, version)
    }
}

impl Drop for StoreExecutor<'_> {
    fn drop(&mut self) {
        // Never hand the connection back to other store users mid-transaction.
        if !self.conn.is_autocommit() {
            warn!("store executor released with an open transaction, rolling back");
            if let Err(e) = executor::rollback(&self.conn) {
                warn!("{e}");
            }
        }
    }
}
