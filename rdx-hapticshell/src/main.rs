use anyhow::Result;
use colored::Colorize;
use hapticlock::prelude::*;
use hapticlock::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct ShellHighlighter;

impl Highlighter for ShellHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// Widest bar drawn for a single segment, in terminal cells.
const MAX_SEGMENT_CELLS: u64 = 40;

/// Renders haptic waveforms as bars on the terminal.
///
/// Segments alternate pause/pulse starting with a pause, so odd segments are
/// drawn with a bar whose weight follows the segment intensity.
struct ConsoleActuator;

/// Draws one waveform: one cell per 20 ms, at most `MAX_SEGMENT_CELLS` per segment.
fn render_waveform(waveform: &[u64], intensities: &[Intensity]) -> String {
    let mut rendered = String::new();
    for (index, (&length, &intensity)) in waveform.iter().zip(intensities).enumerate() {
        let cells = (length / 20).clamp(1, MAX_SEGMENT_CELLS) as usize;
        let segment = if index % 2 == 0 || intensity.is_off() {
            " ".repeat(cells)
        } else {
            match intensity {
                Intensity::Level(level) if level > 170 => {
                    "█".repeat(cells).magenta().bold().to_string()
                }
                Intensity::Level(level) if level <= 85 => {
                    "░".repeat(cells).magenta().dimmed().to_string()
                }
                _ => "▓".repeat(cells).magenta().to_string(),
            }
        };
        rendered.push_str(&segment);
    }
    rendered
}

impl Actuator for ConsoleActuator {
    fn cancel(&mut self) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn play(
        &mut self,
        waveform: &[u64],
        intensities: &[Intensity],
        repeat: Option<usize>,
    ) -> Result<(), ActuatorError> {
        let looping = match repeat {
            Some(index) => format!(" ↻{}", index),
            None => String::new(),
        };
        println!(
            "<-- [BUZZ] |{}|{}",
            render_waveform(waveform, intensities),
            looping.dimmed()
        );
        Ok(())
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    // Embedded at compile time from the crate root.
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    let rule = "-".repeat(64);
    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";

    println!("{}", rule.dimmed());
    println!("{}", version_string);
    println!("{}", license_blurb.dimmed());
    println!("{}", rule.dimmed());
}

/// Spawns tasks that print a session's event streams.
///
/// Fired effects are only printed while `watching` is set.
fn spawn_event_listeners(engine: &HapticlockEngine, watching: Arc<AtomicBool>) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            println!("\n<-- [SYSTEM EVENT] {:?}", event);
        }
    });

    let mut effect_rx = engine.subscribe_effect_events();
    tokio::spawn(async move {
        while let Ok(event) = effect_rx.recv().await {
            match event {
                EffectEvent::EffectFired { timestamp, position } => {
                    if watching.load(Ordering::Relaxed) {
                        println!("<-- [FIRED] effect @{} ms (clock {} ms)", timestamp, position);
                    }
                }
                EffectEvent::Resync { from, to } => {
                    println!("<-- [RESYNC] clock moved back {} -> {} ms", from, to);
                }
                EffectEvent::ActuatorFailed { timestamp, message } => {
                    println!("<-- [FAILED] effect @{} ms: {}", timestamp, message.red());
                }
            }
        }
    });
}

/// Everything the shell keeps between commands.
struct ShellState {
    config: HapticlockConfig,
    clock: PlaybackClock,
    engine: Option<HapticlockEngine>,
    session: Option<SessionHandle>,
    watching: Arc<AtomicBool>,
}

impl ShellState {
    async fn stop_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop().await;
            println!("--> Session stopped.");
        }
    }

    async fn load(&mut self, path: &str) {
        match Catalog::from_path(path) {
            Ok(catalog) => {
                self.stop_session().await;
                println!("--> Loaded {} effects from {}", catalog.len(), path);
                let engine = HapticlockEngine::new(self.config.clone(), Arc::new(catalog));
                spawn_event_listeners(&engine, self.watching.clone());
                self.engine = Some(engine);
            }
            Err(err) => println!("Error: {}", err),
        }
    }

    fn list_effects(&self) {
        let Some(engine) = &self.engine else {
            println!("No effects loaded. Use 'load <PATH>'.");
            return;
        };
        println!("Effects:");
        for effect in engine.catalog().iter() {
            let repeat = effect
                .repeat
                .map_or_else(|| "once".to_string(), |index| format!("loop@{}", index));
            println!(
                "  @{:>8} ms  {:>5} ms  {:>2} segments  {}",
                effect.timestamp,
                effect.duration,
                effect.waveform.len(),
                repeat
            );
        }
    }

    fn start_session(&mut self) {
        if self.session.as_ref().is_some_and(SessionHandle::is_running) {
            println!("A session is already running. Use 'stop' first.");
            return;
        }
        let Some(engine) = &self.engine else {
            println!("No effects loaded. Use 'load <PATH>'.");
            return;
        };
        // Effects behind the clock count as already passed.
        let position = self.clock.position();
        self.session = Some(engine.start_at(self.clock.clone(), ConsoleActuator, position));
        println!(
            "--> Session started at {} ms ({}).",
            position,
            if self.clock.is_playing() { "playing" } else { "paused" }
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let config = HapticlockConfig::load(None)?;
    info!("Polling every {:?}", config.cadence.interval());

    let mut state = ShellState {
        clock: PlaybackClock::new(config.session.start_position),
        config,
        engine: None,
        session: None,
        watching: Arc::new(AtomicBool::new(true)),
    };
    if let Some(path) = state.config.session.effects_path.clone() {
        state.load(&path.to_string_lossy()).await;
    }

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ShellHighlighter));

    println!("{} shell is ready. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.split_whitespace().collect::<Vec<_>>();
                let Some(command) = args.first() else {
                    continue;
                };
                match *command {
                    "load" => match args.get(1) {
                        Some(path) => state.load(path).await,
                        None => println!("Usage: load <PATH>"),
                    },
                    "effects" => state.list_effects(),
                    "start" => state.start_session(),
                    "stop" => state.stop_session().await,
                    "play" => {
                        state.clock.play();
                        println!("--> Playing from {} ms.", state.clock.position());
                    }
                    "pause" => {
                        state.clock.pause();
                        println!("--> Paused at {} ms.", state.clock.position());
                    }
                    "seek" => match args.get(1).map(|ms| ms.parse::<u64>()) {
                        Some(Ok(position)) => {
                            state.clock.seek(position);
                            println!("--> Seeked to {} ms.", position);
                        }
                        Some(Err(_)) => println!("Error: position must be a number of milliseconds."),
                        None => println!("Usage: seek <MS>"),
                    },
                    "pos" => println!(
                        "--> Clock at {} ms ({}).",
                        state.clock.position(),
                        if state.clock.is_playing() { "playing" } else { "paused" }
                    ),
                    "watch" => match args.get(1) {
                        Some(&"on") => {
                            state.watching.store(true, Ordering::Relaxed);
                            println!("--> Printing fired effects.");
                        }
                        Some(&"off") => {
                            state.watching.store(false, Ordering::Relaxed);
                            println!("--> Fired effects muted.");
                        }
                        _ => println!("Usage: watch on|off"),
                    },
                    "help" => {
                        println!("Available commands:");
                        println!("  load <PATH>     - Loads a haptics JSON descriptor.");
                        println!("  effects         - Lists the loaded effects.");
                        println!("  start           - Starts a session against the shell clock.");
                        println!("  stop            - Stops the running session.");
                        println!("  play | pause    - Controls the shell clock.");
                        println!("  seek <MS>       - Moves the shell clock.");
                        println!("  pos             - Shows the clock position.");
                        println!("  watch on|off    - Toggles printing of fired effects.");
                        println!("  exit            - Quits the shell.");
                    }
                    "exit" => break,
                    _ => println!("Unknown command: '{}'. Type 'help'.", line),
                }
            }
            Err(_) => {
                println!("Exiting hapticshell...");
                break;
            }
        }
    }

    state.stop_session().await;
    Ok(())
}
