use std::time::Duration;

/// Direction a migration run moved the schema in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Forward scripts ran, ascending.
    Up,
    /// Rollback scripts ran, descending.
    Down,
    /// The database was already at the target version.
    None,
}

/// Outcome of a successful `migrate` or `rollback_to_version` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub direction: Direction,
    pub from: u32,
    pub to: u32,
    /// Versions whose script ran, in execution order.
    pub applied: Vec<u32>,
    /// Irreversible versions passed over while rolling back.
    pub skipped: Vec<u32>,
    pub elapsed: Duration,
}

impl MigrationReport {
    pub(crate) fn new(direction: Direction, from: u32, to: u32) -> Self {
        Self {
            direction,
            from,
            to,
            applied: Vec::new(),
            skipped: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.direction == Direction::None
    }

    /// Number of steps that changed the persisted version.
    pub fn steps(&self) -> usize {
        self.applied.len() + self.skipped.len()
    }
}
