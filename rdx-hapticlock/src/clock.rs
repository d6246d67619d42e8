//! Clock sources: where the playback position comes from.
//!
//! The scheduler only ever asks a clock for its current position. Playing,
//! pausing and seeking are the clock owner's business and happen independently
//! of the polling loop.

use crate::common::Position;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::time::Instant;

/// Supplies the current playback position on demand.
pub trait ClockSource: Send {
    fn current_position(&self) -> Position;
}

impl<F> ClockSource for F
where
    F: Fn() -> Position + Send,
{
    fn current_position(&self) -> Position {
        self()
    }
}

#[derive(Debug)]
struct ClockState {
    /// Position at the moment `anchor` was taken.
    anchor_position: Position,
    /// Set while playing.
    anchor: Option<Instant>,
    /// Playback never advances past this position, if set.
    length: Option<Position>,
}

impl ClockState {
    fn position(&self) -> Position {
        let position = match self.anchor {
            Some(anchor) => {
                let elapsed = anchor.elapsed().as_millis();
                self.anchor_position
                    .saturating_add(u64::try_from(elapsed).unwrap_or(u64::MAX))
            }
            None => self.anchor_position,
        };
        match self.length {
            Some(length) => position.min(length),
            None => position,
        }
    }
}

/// A controllable media clock that advances in milliseconds of wall time
/// while playing.
///
/// Cloning yields another handle to the same clock: hand one clone to the
/// session and keep another for transport control.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    state: Arc<Mutex<ClockState>>,
}

impl PlaybackClock {
    /// Creates a paused clock at `position`.
    pub fn new(position: Position) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                anchor_position: position,
                anchor: None,
                length: None,
            })),
        }
    }

    /// Limits playback to `length`. The clock holds there once it arrives.
    pub fn with_length(self, length: Position) -> Self {
        self.lock().length = Some(length);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn play(&self) {
        let mut state = self.lock();
        if state.anchor.is_none() {
            state.anchor = Some(Instant::now());
        }
    }

    pub fn pause(&self) {
        let mut state = self.lock();
        let position = state.position();
        state.anchor_position = position;
        state.anchor = None;
    }

    /// Jumps to `position`, keeping the play/pause state.
    pub fn seek(&self, position: Position) {
        let mut state = self.lock();
        state.anchor_position = match state.length {
            Some(length) => position.min(length),
            None => position,
        };
        if state.anchor.is_some() {
            state.anchor = Some(Instant::now());
        }
    }

    pub fn is_playing(&self) -> bool {
        self.lock().anchor.is_some()
    }

    pub fn position(&self) -> Position {
        self.lock().position()
    }
}

impl ClockSource for PlaybackClock {
    fn current_position(&self) -> Position {
        self.position()
    }
}

/// A push-based clock: reads the latest position published on a watch channel.
///
/// Useful when the media framework reports position changes through callbacks
/// rather than answering queries.
#[derive(Debug, Clone)]
pub struct WatchClock {
    receiver: watch::Receiver<Position>,
}

impl WatchClock {
    /// Creates a clock together with the sender that feeds it.
    pub fn channel(initial: Position) -> (watch::Sender<Position>, Self) {
        let (sender, receiver) = watch::channel(initial);
        (sender, Self { receiver })
    }
}

impl ClockSource for WatchClock {
    fn current_position(&self) -> Position {
        *self.receiver.borrow()
    }
}
