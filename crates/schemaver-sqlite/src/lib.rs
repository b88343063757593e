pub mod executor;
pub mod store;
pub mod version_table;

pub use executor::SqliteExecutor;
pub use store::{SchemaStore, StoreExecutor};
pub use version_table::VersionTable;
