//! Contains common, primitive types shared by the scheduler components.
//!
//! Positions and effect timestamps live on the same axis: whatever unit the
//! Clock Source reports (milliseconds for the bundled clocks). Keeping them as
//! one alias makes it impossible to compare a position against a timestamp
//! measured in some other unit by accident.

/// A point on the playback clock, in the same unit as effect timestamps.
pub type Position = u64;

/// The span of clock time covered by a single poll.
///
/// `last` is the position observed on the previous poll and `current` the one
/// observed now. A window whose `current` lies before `last` is a rewind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionWindow {
    pub last: Position,
    pub current: Position,
}

impl PositionWindow {
    /// Creates a window from the previous and the current observation.
    pub fn new(last: Position, current: Position) -> Self {
        Self { last, current }
    }

    /// Returns `true` if the clock moved backward (a seek or rewind).
    pub fn is_rewind(&self) -> bool {
        self.current < self.last
    }

    /// Returns `true` if `timestamp` lies inside the window, both ends inclusive.
    ///
    /// A rewind window contains nothing.
    pub fn contains(&self, timestamp: Position) -> bool {
        self.last <= timestamp && timestamp <= self.current
    }
}
