pub mod builder;
pub mod executor;
pub mod manager;
pub mod migration;
pub mod report;
pub mod splitter;

pub use builder::MigrationBuilder;
pub use executor::{Executor, Transaction};
pub use manager::MigrationManager;
pub use migration::{Migration, MigrationSet};
pub use report::{Direction, MigrationReport};
pub use splitter::StatementSplitter;
