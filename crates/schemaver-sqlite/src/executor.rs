use rusqlite::Connection;
use schemaver_common::{Error, Result};
use schemaver_core::Executor;
use tracing::debug;

use crate::version_table::VersionTable;

/// Executor over a caller-owned `rusqlite` connection.
///
/// Transactions start with `BEGIN IMMEDIATE`, which takes SQLite's write
/// lock up front, so writers in other processes wait for each step instead
/// of interleaving with it.
pub struct SqliteExecutor<'c> {
    conn: &'c Connection,
    table: VersionTable,
}

impl<'c> SqliteExecutor<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self::with_version_table(conn, VersionTable::default())
    }

    pub fn with_version_table(conn: &'c Connection, table: VersionTable) -> Self {
        Self { conn, table }
    }

    pub fn version_table(&self) -> &VersionTable {
        &self.table
    }
}

impl Executor for SqliteExecutor<'_> {
    fn begin_transaction(&mut self) -> Result<()> {
        begin(self.conn)
    }

    fn execute(&mut self, statement: &str) -> Result<()> {
        execute(self.conn, statement)
    }

    fn commit(&mut self) -> Result<()> {
        commit(self.conn)
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        rollback(self.conn)
    }

    fn ensure_version_store_exists(&mut self) -> Result<()> {
        self.table.ensure(self.conn)
    }

    fn read_version(&mut self) -> Result<Option<u32>> {
        self.table.read(self.conn)
    }

    fn write_version(&mut self, version: u32) -> Result<()> {
        self.table.write(self.conn, version)
    }
}

pub(crate) fn begin(conn: &Connection) -> Result<()> {
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| Error::Database(format!("failed to begin transaction: {e}")))
}

pub(crate) fn execute(conn: &Connection, statement: &str) -> Result<()> {
    debug!("executing: {statement}");
    // execute_batch tolerates statements that return rows (PRAGMA, CREATE TABLE AS).
    conn.execute_batch(statement)
        .map_err(|e| Error::Database(format!("{e}, while executing: {statement}")))
}

pub(crate) fn commit(conn: &Connection) -> Result<()> {
    conn.execute_batch("COMMIT")
        .map_err(|e| Error::Database(format!("failed to commit transaction: {e}")))
}

pub(crate) fn rollback(conn: &Connection) -> Result<()> {
    if conn.is_autocommit() {
        // SQLite already rolled back (some errors abort the transaction).
        return Ok(());
    }
    conn.execute_batch("ROLLBACK")
        .map_err(|e| Error::Database(format!("failed to roll back transaction: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaver_core::{Migration, MigrationBuilder, MigrationManager};

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    fn manager() -> MigrationManager {
        MigrationBuilder::new()
            .add_migrations([
                Migration::new(1, "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
                    .with_rollback("DROP TABLE IF EXISTS users;"),
                Migration::new(2, "CREATE TABLE posts (id INTEGER PRIMARY KEY); CREATE INDEX idx_posts ON posts(id);")
                    .with_rollback("DROP INDEX idx_posts; DROP TABLE posts;"),
            ])
            .build_manager()
            .unwrap()
    }

    #[test]
    fn single_migration_creates_table_and_records_version() {
        let conn = Connection::open_in_memory().unwrap();
        let mut executor = SqliteExecutor::new(&conn);

        manager().migrate(&mut executor, 0, 1).unwrap();

        assert!(table_exists(&conn, "users"));
        assert_eq!(manager().current_version(&mut executor).unwrap(), 1);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn custom_version_table_is_used() {
        let conn = Connection::open_in_memory().unwrap();
        let table = VersionTable::new("app_schema").unwrap();
        let mut executor = SqliteExecutor::with_version_table(&conn, table);

        manager().migrate(&mut executor, 0, 2).unwrap();

        assert!(table_exists(&conn, "app_schema"));
        assert!(!table_exists(&conn, "schema_version"));
        assert_eq!(executor.version_table().name(), "app_schema");
    }

    #[test]
    fn failed_statement_leaves_no_partial_step() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = MigrationBuilder::new()
            .add_migrations([
                Migration::new(1, "CREATE TABLE users (id INTEGER PRIMARY KEY)"),
                Migration::new(2, "CREATE TABLE posts (id INTEGER); INVALID MIGRATION SCRIPT"),
            ])
            .build_manager()
            .unwrap();
        let mut executor = SqliteExecutor::new(&conn);

        let err = manager.migrate(&mut executor, 0, 2).unwrap_err();

        assert!(matches!(err, Error::MigrationExecution { version: 2, .. }));
        assert!(err.to_string().contains("INVALID MIGRATION SCRIPT"));
        assert!(table_exists(&conn, "users"));
        assert!(!table_exists(&conn, "posts"));
        assert_eq!(manager.current_version(&mut executor).unwrap(), 1);
        assert!(conn.is_autocommit());
    }
}
