//! Defines all public event types broadcast by a Hapticlock session.
//!
//! Listeners subscribe to these strongly-typed streams to observe a running
//! session without touching its scheduler state.

use crate::common::Position;
use tokio::time::Instant;

/// Events related to the lifecycle of the session itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    /// Fired once when the polling loop begins.
    SessionStarted { timestamp: Instant },
    /// Fired once when the polling loop has exited and the actuator is stopped.
    SessionStopped,
}

/// Events describing what the scheduler did on a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectEvent {
    /// An effect was handed to the actuator.
    EffectFired {
        /// The effect's scheduled timestamp.
        timestamp: Position,
        /// The clock position observed on the poll that fired it.
        position: Position,
    },
    /// The clock moved backward and the trigger ledger was reset.
    Resync { from: Position, to: Position },
    /// The actuator refused an effect. The session keeps running.
    ActuatorFailed { timestamp: Position, message: String },
}
