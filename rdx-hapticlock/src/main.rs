use anyhow::{Context, Result};
use colored::Colorize;
use hapticlock::prelude::*;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_EFFECTS_PATH: &str = "assets/haptics.json";

/// Extra playback after the last effect before the simulated media ends.
const TAIL_MS: u64 = 1_000;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // 2. Load configuration: `hapticdev [CONFIG.toml] [EFFECTS.json]`.
    let mut args = env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let config = HapticlockConfig::load(config_path.as_deref())
        .context("failed to load hapticlock configuration")?;

    // 3. Load the effect catalog. A malformed descriptor aborts here.
    let effects_path = args
        .next()
        .map(PathBuf::from)
        .or_else(|| config.session.effects_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EFFECTS_PATH));
    let catalog = Catalog::from_path(&effects_path)
        .with_context(|| format!("failed to load effects from {}", effects_path.display()))?;

    // 4. Create the engine and its listeners.
    let length = catalog.last_timestamp().unwrap_or(0).saturating_add(TAIL_MS);
    let engine = HapticlockEngine::new(config, Arc::new(catalog));
    spawn_event_listeners(&engine);

    // 5. Play a simulated media clock against a logging actuator.
    let clock = PlaybackClock::new(engine.config().session.start_position).with_length(length);
    clock.play();
    info!("Simulated playback runs to {} ms", length);
    engine.run(clock, LoggingActuator).await?;

    Ok(())
}

/// Spawns one task per event stream that prints what the session does.
fn spawn_event_listeners(engine: &HapticlockEngine) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });

    let mut effect_rx = engine.subscribe_effect_events();
    tokio::spawn(async move {
        while let Ok(event) = effect_rx.recv().await {
            match event {
                EffectEvent::EffectFired { timestamp, position } => {
                    info!(
                        "{} effect @{} (clock {})",
                        "[FIRE]".green().bold(),
                        timestamp,
                        position
                    );
                }
                EffectEvent::Resync { from, to } => {
                    info!("{} {} -> {}", "[RESYNC]".yellow().bold(), from, to);
                }
                EffectEvent::ActuatorFailed { timestamp, message } => {
                    info!("{} effect @{}: {}", "[FAILED]".red().bold(), timestamp, message);
                }
            }
        }
    });
}
