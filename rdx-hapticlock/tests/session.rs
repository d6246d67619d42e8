//! Drives whole playback sessions with a scripted clock and a recording actuator.

use hapticlock::catalog::JsonDescriptor;
use hapticlock::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Cancel,
    Play(Vec<u64>),
}

#[derive(Clone, Default)]
struct RecordingActuator {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_plays: bool,
}

impl RecordingActuator {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn plays(&self) -> Vec<Vec<u64>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Play(waveform) => Some(waveform),
                Call::Cancel => None,
            })
            .collect()
    }
}

impl Actuator for RecordingActuator {
    fn cancel(&mut self) -> Result<(), ActuatorError> {
        self.calls.lock().expect("calls lock").push(Call::Cancel);
        Ok(())
    }

    fn play(
        &mut self,
        waveform: &[u64],
        _intensities: &[Intensity],
        _repeat: Option<usize>,
    ) -> Result<(), ActuatorError> {
        if self.fail_plays {
            return Err(ActuatorError::Unavailable("vibrator service gone".into()));
        }
        self.calls
            .lock()
            .expect("calls lock")
            .push(Call::Play(waveform.to_vec()));
        Ok(())
    }
}

/// Each effect's waveform is `[timestamp]`, so plays identify their effect.
fn engine(timestamps: &[u64]) -> HapticlockEngine {
    let records: Vec<String> = timestamps
        .iter()
        .map(|t| {
            format!(
                r#"{{ "timestamp": {t}, "duration": 10, "pattern": [{t}], "amplitudes": [255] }}"#
            )
        })
        .collect();
    let json = format!(r#"{{ "haptics": [{}] }}"#, records.join(","));
    let catalog = Catalog::load(&JsonDescriptor(&json)).expect("valid descriptor");
    HapticlockEngine::new(HapticlockConfig::default(), Arc::new(catalog))
}

fn drain(rx: &mut broadcast::Receiver<EffectEvent>) -> Vec<EffectEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
}

fn fired(events: &[EffectEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|event| match event {
            EffectEvent::EffectFired { timestamp, .. } => Some(*timestamp),
            _ => None,
        })
        .collect()
}

/// Publishes `position` and lets at least one poll observe it.
async fn move_clock(sender: &watch::Sender<Position>, position: Position) {
    sender.send_replace(position);
    tokio::time::sleep(Duration::from_millis(25)).await;
}

#[tokio::test(start_paused = true)]
async fn catch_up_fires_every_skipped_effect_in_order() {
    let engine = engine(&[30, 10, 20]);
    let mut effect_rx = engine.subscribe_effect_events();
    let actuator = RecordingActuator::default();
    let (sender, clock) = WatchClock::channel(35);

    let mut session = engine.start(clock, actuator.clone());
    move_clock(&sender, 35).await;
    session.stop().await;

    let events = drain(&mut effect_rx);
    assert_eq!(fired(&events), vec![10, 20, 30]);
    assert_eq!(actuator.plays(), vec![vec![10], vec![20], vec![30]]);
    // Every play is preceded by a cancel; the final cancel is teardown.
    assert_eq!(
        actuator.calls(),
        vec![
            Call::Cancel,
            Call::Play(vec![10]),
            Call::Cancel,
            Call::Play(vec![20]),
            Call::Cancel,
            Call::Play(vec![30]),
            Call::Cancel,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn each_effect_fires_once_per_forward_pass() {
    let engine = engine(&[0, 40, 80]);
    let mut effect_rx = engine.subscribe_effect_events();
    let actuator = RecordingActuator::default();
    let (sender, clock) = WatchClock::channel(0);

    let mut session = engine.start(clock, actuator.clone());
    for position in [0, 0, 20, 40, 40, 60, 80, 100, 100] {
        move_clock(&sender, position).await;
    }
    session.stop().await;

    assert_eq!(fired(&drain(&mut effect_rx)), vec![0, 40, 80]);
    assert_eq!(actuator.plays().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn rewind_resyncs_and_replays_effects() {
    let engine = engine(&[10, 20]);
    let mut effect_rx = engine.subscribe_effect_events();
    let actuator = RecordingActuator::default();
    let (sender, clock) = WatchClock::channel(0);

    let mut session = engine.start(clock, actuator.clone());
    move_clock(&sender, 30).await;
    move_clock(&sender, 5).await;
    move_clock(&sender, 15).await;
    session.stop().await;

    let events = drain(&mut effect_rx);
    assert_eq!(
        events,
        vec![
            EffectEvent::EffectFired {
                timestamp: 10,
                position: 30
            },
            EffectEvent::EffectFired {
                timestamp: 20,
                position: 30
            },
            EffectEvent::Resync { from: 30, to: 5 },
            EffectEvent::EffectFired {
                timestamp: 10,
                position: 15
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn actuator_failures_do_not_stop_the_loop() {
    let engine = engine(&[10, 50]);
    let mut effect_rx = engine.subscribe_effect_events();
    let actuator = RecordingActuator {
        fail_plays: true,
        ..Default::default()
    };
    let (sender, clock) = WatchClock::channel(0);

    let mut session = engine.start(clock, actuator.clone());
    move_clock(&sender, 20).await;
    assert!(session.is_running());
    move_clock(&sender, 60).await;
    assert!(session.is_running());
    session.stop().await;

    let failed: Vec<u64> = drain(&mut effect_rx)
        .into_iter()
        .filter_map(|event| match event {
            EffectEvent::ActuatorFailed { timestamp, .. } => Some(timestamp),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![10, 50]);
}

#[tokio::test(start_paused = true)]
async fn stopped_session_never_fires_again() {
    let engine = engine(&[100]);
    let mut effect_rx = engine.subscribe_effect_events();
    let actuator = RecordingActuator::default();
    let (sender, clock) = WatchClock::channel(0);

    let mut session = engine.start(clock, actuator.clone());
    move_clock(&sender, 50).await;
    session.stop().await;

    move_clock(&sender, 150).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    session.stop().await;

    assert!(fired(&drain(&mut effect_rx)).is_empty());
    assert!(actuator.plays().is_empty());
    assert!(!session.is_running());
}

#[tokio::test(start_paused = true)]
async fn playback_clock_drives_a_session_end_to_end() {
    let engine = engine(&[0, 100, 250]);
    let mut effect_rx = engine.subscribe_effect_events();
    let actuator = RecordingActuator::default();
    let clock = PlaybackClock::new(0);
    let transport = clock.clone();
    transport.play();

    let mut session = engine.start(clock, actuator.clone());
    tokio::time::sleep(Duration::from_millis(300)).await;
    transport.seek(50);
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.stop().await;

    let events = drain(&mut effect_rx);
    assert_eq!(fired(&events), vec![0, 100, 250, 100]);
    assert!(events
        .iter()
        .any(|event| matches!(event, EffectEvent::Resync { .. })));
}
