//! The engine that runs Hapticlock playback sessions.

use crate::catalog::Catalog;
use crate::clock::ClockSource;
use crate::common::Position;
use crate::config::HapticlockConfig;
use crate::dispatch::{Actuator, Dispatcher};
use crate::events::{EffectEvent, SystemEvent};
use crate::scheduler::HapticScheduler;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, trace, warn};

/// The main Hapticlock engine.
///
/// Holds the configuration and the effect catalog, and owns the event
/// streams every session publishes on. The engine is cheap to clone; each
/// clone is a handle to the same streams.
#[derive(Clone)]
pub struct HapticlockEngine {
    config: Arc<HapticlockConfig>,
    catalog: Arc<Catalog>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    effect_event_sender: broadcast::Sender<EffectEvent>,
}

/// Control handle for a running session.
///
/// Dropping the handle stops the session as well, but without waiting for
/// the polling loop to finish.
#[derive(Debug)]
pub struct SessionHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Stops polling and cancels any in-flight actuation.
    ///
    /// Returns once the polling loop has exited. Calling it again, or after
    /// the loop already ended, does nothing.
    pub async fn stop(&mut self) {
        self.shutdown_tx.send(()).ok();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                error!("Haptic session task ended abnormally: {}", err);
            }
        }
    }

    /// Returns `true` while the polling loop is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown_tx.send(()).ok();
    }
}

// Core implementation block for internal logic.
impl HapticlockEngine {
    /// Creates a new `HapticlockEngine` for a loaded catalog.
    pub fn new(config: HapticlockConfig, catalog: Arc<Catalog>) -> Self {
        let capacity = config.events.channel_capacity.max(1);
        let (system_event_sender, _) = broadcast::channel(capacity);
        let (effect_event_sender, _) = broadcast::channel(capacity);
        Self {
            config: Arc::new(config),
            catalog,
            system_event_sender,
            effect_event_sender,
        }
    }

    /// Starts a playback session against `clock` and `actuator`.
    ///
    /// The first poll window starts at the configured
    /// `session.start_position`. The polling loop runs on its own task until
    /// the returned handle is stopped or dropped. Must be called from within a
    /// Tokio runtime.
    pub fn start<C, A>(&self, clock: C, actuator: A) -> SessionHandle
    where
        C: ClockSource + 'static,
        A: Actuator + 'static,
    {
        self.start_at(clock, actuator, self.config.session.start_position)
    }

    /// Like [`start`](Self::start), but the first poll window starts at
    /// `start_position`. Effects before it are treated as already passed.
    pub fn start_at<C, A>(
        &self,
        clock: C,
        actuator: A,
        start_position: Position,
    ) -> SessionHandle
    where
        C: ClockSource + 'static,
        A: Actuator + 'static,
    {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let engine = self.clone();
        let task = tokio::spawn(async move {
            engine
                .poll_loop(clock, Dispatcher::new(actuator), start_position, shutdown_rx)
                .await
        });
        SessionHandle {
            shutdown_tx,
            task: Some(task),
        }
    }

    /// Runs a session until a Ctrl+C signal is received.
    pub async fn run<C, A>(&self, clock: C, actuator: A) -> anyhow::Result<()>
    where
        C: ClockSource + 'static,
        A: Actuator + 'static,
    {
        let mut session = self.start(clock, actuator);
        info!(
            "Haptic session running every {:?}. Press Ctrl+C to shut down.",
            self.config.cadence.interval()
        );
        let signal = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received. Stopping haptic session...");
        session.stop().await;
        signal?;
        info!("Haptic session has shut down.");
        Ok(())
    }

    #[doc(hidden)]
    async fn poll_loop<C, A>(
        self,
        clock: C,
        mut dispatcher: Dispatcher<A>,
        start_position: Position,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) where
        C: ClockSource,
        A: Actuator,
    {
        let mut scheduler = HapticScheduler::new(self.catalog.clone(), start_position);
        let mut ticker = tokio::time::interval(self.config.cadence.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Haptic session started with {} effects at position {}",
            self.catalog.len(),
            scheduler.last_position()
        );
        self.system_event_sender
            .send(SystemEvent::SessionStarted {
                timestamp: tokio::time::Instant::now(),
            })
            .ok();

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    let position = clock.current_position();
                    self.process_poll(&mut scheduler, &mut dispatcher, position);
                }
            }
        }

        dispatcher.cancel();
        self.system_event_sender
            .send(SystemEvent::SessionStopped)
            .ok();
        info!("Haptic session stopped at position {}", scheduler.last_position());
    }

    #[doc(hidden)]
    fn process_poll<A: Actuator>(
        &self,
        scheduler: &mut HapticScheduler,
        dispatcher: &mut Dispatcher<A>,
        position: Position,
    ) {
        let outcome = scheduler.tick(position);
        if outcome.resync {
            info!(
                "Playback moved back from {} to {}; effects will fire again",
                outcome.window.last, outcome.window.current
            );
            self.effect_event_sender
                .send(EffectEvent::Resync {
                    from: outcome.window.last,
                    to: outcome.window.current,
                })
                .ok();
            return;
        }

        if outcome.due.len() > 1 {
            trace!(
                count = outcome.due.len(),
                "catching up on several effects in one poll"
            );
        }
        for effect in outcome.due {
            match dispatcher.fire(effect) {
                Ok(()) => {
                    self.effect_event_sender
                        .send(EffectEvent::EffectFired {
                            timestamp: effect.timestamp,
                            position,
                        })
                        .ok();
                }
                Err(err) => {
                    warn!(
                        "Haptic effect at {} could not be played: {}",
                        effect.timestamp, err
                    );
                    self.effect_event_sender
                        .send(EffectEvent::ActuatorFailed {
                            timestamp: effect.timestamp,
                            message: err.to_string(),
                        })
                        .ok();
                }
            }
        }
    }
}

// Public API implementation block.
impl HapticlockEngine {
    pub fn config(&self) -> &HapticlockConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// Subscribes to the `EffectEvent` stream.
    pub fn subscribe_effect_events(&self) -> broadcast::Receiver<EffectEvent> {
        self.effect_event_sender.subscribe()
    }
}
