//! Dispatch: hands due effects to the device that renders them.

use crate::catalog::{EffectDescriptor, Intensity};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failures reported by an [`Actuator`].
///
/// The scheduler never retries. A failed actuation is logged and the poll
/// loop moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActuatorError {
    #[error("haptic device is unavailable: {0}")]
    Unavailable(String),
    #[error("haptic device rejected the waveform: {0}")]
    Rejected(String),
}

/// A device that renders haptic waveforms.
///
/// Implementations own the physical (or simulated) motor. `play` is expected
/// to return once playback has *started*; rendering happens in the background
/// until the waveform ends or `cancel` is called.
pub trait Actuator: Send {
    /// Stops whatever the device is currently playing.
    fn cancel(&mut self) -> Result<(), ActuatorError>;

    /// Starts a waveform of alternating pause/pulse segments.
    ///
    /// `repeat` is the segment index to loop back to, or `None` to play once.
    fn play(
        &mut self,
        waveform: &[u64],
        intensities: &[Intensity],
        repeat: Option<usize>,
    ) -> Result<(), ActuatorError>;
}

/// Fires effects against a single actuator, one at a time.
///
/// Every `fire` cancels the running actuation before starting the next one,
/// so when one poll yields several effects the last of them is what the user
/// ends up feeling.
#[derive(Debug)]
pub struct Dispatcher<A> {
    actuator: A,
}

impl<A: Actuator> Dispatcher<A> {
    pub fn new(actuator: A) -> Self {
        Self { actuator }
    }

    /// Cancels the current actuation and starts `effect`.
    ///
    /// A failed cancel is logged and `play` is still attempted; only the play
    /// result decides whether the effect fired.
    pub fn fire(&mut self, effect: &EffectDescriptor) -> Result<(), ActuatorError> {
        self.cancel();
        self.actuator
            .play(&effect.waveform, &effect.intensities, effect.repeat)?;
        debug!(
            timestamp = effect.timestamp,
            segments = effect.waveform.len(),
            "haptic effect started"
        );
        Ok(())
    }

    /// Stops the actuator. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if let Err(err) = self.actuator.cancel() {
            warn!("failed to cancel haptic actuation: {}", err);
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn into_inner(self) -> A {
        self.actuator
    }
}

/// An actuator with no device behind it that logs every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingActuator;

impl Actuator for LoggingActuator {
    fn cancel(&mut self) -> Result<(), ActuatorError> {
        debug!("actuator cancel");
        Ok(())
    }

    fn play(
        &mut self,
        waveform: &[u64],
        intensities: &[Intensity],
        repeat: Option<usize>,
    ) -> Result<(), ActuatorError> {
        info!(
            "Vibrate waveform={:?} intensities={:?} repeat={:?}",
            waveform, intensities, repeat
        );
        Ok(())
    }
}
