//! The owned scheduler state that ties catalog, ledger and sampler together.

use crate::catalog::{Catalog, EffectDescriptor};
use crate::common::{Position, PositionWindow};
use crate::ledger::TriggerLedger;
use crate::matcher::match_due;
use std::sync::Arc;
use tracing::{debug, trace};

/// What a single [`HapticScheduler::tick`] decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome<'a> {
    /// The window this tick covered.
    pub window: PositionWindow,
    /// Effects to fire now, in ascending timestamp order. Already recorded in
    /// the ledger.
    pub due: Vec<&'a EffectDescriptor>,
    /// Set when the clock moved backward and the ledger was reset.
    pub resync: bool,
}

/// A playback-synchronised trigger scheduler.
///
/// Holds the shared catalog, its own ledger and the last observed position.
/// [`tick`](Self::tick) is a synchronous step function: feed it each new clock
/// observation and it returns the effects that became due. It has no timer of
/// its own, so it can be driven by the polling loop in
/// [`engine`](crate::engine), a push-based clock callback, or a test.
#[derive(Debug, Clone)]
pub struct HapticScheduler {
    catalog: Arc<Catalog>,
    ledger: TriggerLedger,
    last_position: Position,
}

impl HapticScheduler {
    /// Creates a scheduler whose first window starts at `start_position`.
    pub fn new(catalog: Arc<Catalog>, start_position: Position) -> Self {
        Self {
            catalog,
            ledger: TriggerLedger::new(),
            last_position: start_position,
        }
    }

    /// Advances the scheduler to `current_position`.
    ///
    /// The returned effects are recorded as fired before this returns, and
    /// the next window starts at `current_position` whether or not a resync
    /// happened.
    pub fn tick(&mut self, current_position: Position) -> TickOutcome<'_> {
        let window = PositionWindow::new(self.last_position, current_position);
        let outcome = match_due(
            &self.catalog,
            &mut self.ledger,
            window.last,
            window.current,
        );
        for effect in &outcome.due {
            self.ledger.record(effect.timestamp);
        }
        self.last_position = current_position;

        if outcome.resync {
            debug!(
                from = window.last,
                to = window.current,
                "clock moved backward, trigger ledger reset"
            );
        } else {
            trace!(
                last = window.last,
                current = window.current,
                due = outcome.due.len(),
                "poll window matched"
            );
        }

        TickOutcome {
            window,
            due: outcome.due,
            resync: outcome.resync,
        }
    }

    pub fn ledger(&self) -> &TriggerLedger {
        &self.ledger
    }

    pub fn last_position(&self) -> Position {
        self.last_position
    }
}
