//! The trigger ledger: which effects already fired during the current pass.

use crate::common::Position;
use std::collections::HashSet;

/// Set of effect timestamps that have fired since the session started or the
/// clock last moved backward.
///
/// The ledger is owned exclusively by one scheduler, so plain `&mut` access is
/// enough to keep `record` at-most-once.
#[derive(Debug, Clone, Default)]
pub struct TriggerLedger {
    fired: HashSet<Position>,
}

impl TriggerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, timestamp: Position) -> bool {
        self.fired.contains(&timestamp)
    }

    /// Marks `timestamp` as fired.
    ///
    /// Returns `true` if it was not already present. Recording twice is a no-op.
    pub fn record(&mut self, timestamp: Position) -> bool {
        self.fired.insert(timestamp)
    }

    /// Forgets every fired effect.
    pub fn clear(&mut self) {
        self.fired.clear();
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}
