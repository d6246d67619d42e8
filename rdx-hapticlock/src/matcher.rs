//! The trigger matcher: decides which effects a poll window makes due.
//!
//! Matching is a pure function of the catalog, the ledger and the window
//! between two consecutive clock observations:
//!
//! - **Forward window** (`current >= last`): every effect whose timestamp lies
//!   in `[last, current]` and has not fired yet is due. All of them are
//!   returned in ascending timestamp order, so a window spanning several
//!   effects (after a stall or a forward seek) still yields each one once.
//! - **Backward window** (`current < last`): the clock was rewound. The ledger
//!   is cleared so effects ahead of the new position can fire again, and
//!   nothing is matched on this step.

use crate::catalog::{Catalog, EffectDescriptor};
use crate::common::{Position, PositionWindow};
use crate::ledger::TriggerLedger;

/// The result of matching one poll window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome<'a> {
    /// Due effects in ascending timestamp order.
    pub due: Vec<&'a EffectDescriptor>,
    /// Set when the window was a rewind and the ledger was cleared.
    pub resync: bool,
}

impl MatchOutcome<'_> {
    pub fn is_empty(&self) -> bool {
        self.due.is_empty()
    }
}

/// Matches the window `[last, current]` against the catalog.
///
/// The ledger is only written on a rewind. Recording the returned effects as
/// fired is the caller's job, and must happen before the next call.
pub fn match_due<'a>(
    catalog: &'a Catalog,
    ledger: &mut TriggerLedger,
    last: Position,
    current: Position,
) -> MatchOutcome<'a> {
    let window = PositionWindow::new(last, current);
    if window.is_rewind() {
        ledger.clear();
        return MatchOutcome {
            due: Vec::new(),
            resync: true,
        };
    }

    let effects = catalog.as_slice();
    let start = effects.partition_point(|effect| effect.timestamp < window.last);
    let end = effects.partition_point(|effect| effect.timestamp <= window.current);
    let due = effects[start..end]
        .iter()
        .filter(|effect| !ledger.contains(effect.timestamp))
        .collect();

    MatchOutcome { due, resync: false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EffectRecord, NO_REPEAT};

    fn catalog(timestamps: &[i64]) -> Catalog {
        let records: Vec<EffectRecord> = timestamps
            .iter()
            .map(|&timestamp| EffectRecord {
                timestamp: Some(timestamp),
                duration: Some(50),
                repeat: NO_REPEAT,
                pattern: Some(vec![0, 50]),
                amplitudes: Some(vec![0, 255]),
            })
            .collect();
        Catalog::load(&records).expect("valid records")
    }

    fn timestamps(outcome: &MatchOutcome<'_>) -> Vec<Position> {
        outcome.due.iter().map(|effect| effect.timestamp).collect()
    }

    #[test]
    fn catch_up_returns_every_skipped_effect_in_order() {
        let catalog = catalog(&[30, 10, 20]);
        let mut ledger = TriggerLedger::new();
        let outcome = match_due(&catalog, &mut ledger, 0, 35);
        assert_eq!(timestamps(&outcome), vec![10, 20, 30]);
        assert!(!outcome.resync);
    }

    #[test]
    fn effect_at_zero_matches_on_first_poll() {
        let catalog = catalog(&[0, 40]);
        let mut ledger = TriggerLedger::new();
        let outcome = match_due(&catalog, &mut ledger, 0, 0);
        assert_eq!(timestamps(&outcome), vec![0]);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let catalog = catalog(&[20, 40, 41]);
        let mut ledger = TriggerLedger::new();
        let outcome = match_due(&catalog, &mut ledger, 20, 40);
        assert_eq!(timestamps(&outcome), vec![20, 40]);
    }

    #[test]
    fn already_fired_effects_are_skipped() {
        let catalog = catalog(&[20, 40]);
        let mut ledger = TriggerLedger::new();
        ledger.record(40);
        let outcome = match_due(&catalog, &mut ledger, 40, 60);
        assert!(outcome.is_empty());

        ledger.record(20);
        let outcome = match_due(&catalog, &mut ledger, 0, 60);
        assert!(outcome.is_empty());
    }

    #[test]
    fn rewind_clears_ledger_and_matches_nothing() {
        let catalog = catalog(&[10, 20]);
        let mut ledger = TriggerLedger::new();
        ledger.record(10);
        ledger.record(20);

        let outcome = match_due(&catalog, &mut ledger, 30, 5);
        assert!(outcome.resync);
        assert!(outcome.is_empty());
        assert!(ledger.is_empty());

        let outcome = match_due(&catalog, &mut ledger, 5, 15);
        assert_eq!(timestamps(&outcome), vec![10]);
        assert!(!outcome.resync);
    }

    #[test]
    fn empty_catalog_never_matches() {
        let catalog = Catalog::default();
        let mut ledger = TriggerLedger::new();
        assert!(match_due(&catalog, &mut ledger, 0, u64::MAX).is_empty());
    }
}
