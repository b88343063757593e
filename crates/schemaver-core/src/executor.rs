use std::ops::{Deref, DerefMut};

use schemaver_common::Result;
use tracing::warn;

/// The database capability a [`MigrationManager`](crate::MigrationManager)
/// drives.
///
/// Implementations run statements inside explicit transactions and keep the
/// persisted schema version in a single-row store. The manager never opens
/// or owns a database handle itself.
pub trait Executor {
    fn begin_transaction(&mut self) -> Result<()>;

    /// Run one statement inside the open transaction.
    fn execute(&mut self, statement: &str) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback_transaction(&mut self) -> Result<()>;

    /// Create the version store if missing and seed it with 0 when empty.
    /// Must be idempotent.
    fn ensure_version_store_exists(&mut self) -> Result<()>;

    /// The stored version, or `None` when the store holds no row.
    fn read_version(&mut self) -> Result<Option<u32>>;

    fn write_version(&mut self, version: u32) -> Result<()>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn begin_transaction(&mut self) -> Result<()> {
        (**self).begin_transaction()
    }

    fn execute(&mut self, statement: &str) -> Result<()> {
        (**self).execute(statement)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        (**self).rollback_transaction()
    }

    fn ensure_version_store_exists(&mut self) -> Result<()> {
        (**self).ensure_version_store_exists()
    }

    fn read_version(&mut self) -> Result<Option<u32>> {
        (**self).read_version()
    }

    fn write_version(&mut self, version: u32) -> Result<()> {
        (**self).write_version(version)
    }
}

/// An open transaction on an executor.
///
/// Dropping the guard without calling [`commit`](Transaction::commit) rolls
/// the transaction back, so an early return through `?` never leaves it open.
pub struct Transaction<'e, E: Executor + ?Sized> {
    executor: &'e mut E,
    finished: bool,
}

impl<'e, E: Executor + ?Sized> Transaction<'e, E> {
    pub fn begin(executor: &'e mut E) -> Result<Self> {
        executor.begin_transaction()?;
        Ok(Self {
            executor,
            finished: false,
        })
    }

    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        match self.executor.commit() {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Err(rollback_err) = self.executor.rollback_transaction() {
                    warn!("rollback after failed commit also failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.executor.rollback_transaction()
    }
}

impl<E: Executor + ?Sized> Deref for Transaction<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        &*self.executor
    }
}

impl<E: Executor + ?Sized> DerefMut for Transaction<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut *self.executor
    }
}

impl<E: Executor + ?Sized> Drop for Transaction<'_, E> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.executor.rollback_transaction() {
                warn!("failed to roll back transaction: {e}");
            }
        }
    }
}
