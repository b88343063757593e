use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Two or more migrations share a version. Carries every version of the
    /// sorted input, duplicates included.
    #[error("duplicate migration versions found: {versions:?}")]
    DuplicateVersion { versions: Vec<u32> },

    #[error("invalid migration: {0}")]
    InvalidMigration(String),

    /// A step failed and its transaction was rolled back. Steps completed
    /// before it stay committed.
    #[error("migration {version} failed: {source}")]
    MigrationExecution {
        version: u32,
        script: String,
        #[source]
        source: Box<Error>,
    },

    #[error("rollback target {target} must be less than the current version {current}")]
    InvalidRollbackTarget { target: u32, current: u32 },

    #[error("migration cancelled at version {version}")]
    Cancelled { version: u32 },

    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The script that was running when a step failed, if any.
    pub fn failed_script(&self) -> Option<&str> {
        match self {
            Error::MigrationExecution { script, .. } => Some(script),
            _ => None,
        }
    }
}
