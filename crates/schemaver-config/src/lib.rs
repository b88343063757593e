pub mod loader;
pub mod logging;
pub mod model;

pub use loader::ConfigLoader;
pub use logging::init_tracing;
pub use model::{DatabaseConfig, LoggingConfig, MigrationEntry, MigratorConfig};
