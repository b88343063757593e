use std::fmt;

/// A single versioned schema change.
///
/// Each migration has a version number, a forward script, and optionally a
/// rollback script. A migration without a rollback script is irreversible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    version: u32,
    name: Option<String>,
    forward_script: String,
    rollback_script: Option<String>,
}

impl Migration {
    pub fn new(version: u32, forward_script: impl Into<String>) -> Self {
        Self {
            version,
            name: None,
            forward_script: forward_script.into(),
            rollback_script: None,
        }
    }

    pub fn with_rollback(mut self, rollback_script: impl Into<String>) -> Self {
        self.rollback_script = Some(rollback_script.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn forward_script(&self) -> &str {
        &self.forward_script
    }

    pub fn rollback_script(&self) -> Option<&str> {
        self.rollback_script.as_deref()
    }

    pub fn is_reversible(&self) -> bool {
        self.rollback_script.is_some()
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({name})", self.version),
            None => write!(f, "{}", self.version),
        }
    }
}

/// Migrations sorted ascending by version, with no version repeated.
///
/// Only [`MigrationBuilder`](crate::MigrationBuilder) constructs one, so the
/// ordering and uniqueness hold for the lifetime of the set.
#[derive(Debug, Clone, Default)]
pub struct MigrationSet {
    migrations: Vec<Migration>,
}

impl MigrationSet {
    pub(crate) fn from_sorted(migrations: Vec<Migration>) -> Self {
        debug_assert!(migrations.windows(2).all(|w| w[0].version < w[1].version));
        Self { migrations }
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Migration> {
        self.migrations.iter()
    }

    pub fn versions(&self) -> Vec<u32> {
        self.migrations.iter().map(Migration::version).collect()
    }

    pub fn get(&self, version: u32) -> Option<&Migration> {
        self.migrations
            .binary_search_by_key(&version, Migration::version)
            .ok()
            .map(|idx| &self.migrations[idx])
    }

    /// Highest version in the set, or 0 when the set is empty.
    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map_or(0, Migration::version)
    }

    /// Migrations with a version in `(current, target]`, ascending.
    pub fn forward_path(&self, current: u32, target: u32) -> impl Iterator<Item = &Migration> {
        self.range(current, target)
    }

    /// Migrations with a version in `(target, current]`, descending.
    pub fn rollback_path(&self, target: u32, current: u32) -> impl Iterator<Item = &Migration> {
        self.range(target, current).rev()
    }

    fn range(&self, lower_exclusive: u32, upper_inclusive: u32) -> std::slice::Iter<'_, Migration> {
        let start = self
            .migrations
            .partition_point(|m| m.version <= lower_exclusive);
        let end = self
            .migrations
            .partition_point(|m| m.version <= upper_inclusive)
            .max(start);
        self.migrations[start..end].iter()
    }
}

impl<'a> IntoIterator for &'a MigrationSet {
    type Item = &'a Migration;
    type IntoIter = std::slice::Iter<'a, Migration>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
