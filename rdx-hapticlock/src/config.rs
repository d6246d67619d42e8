//! Defines all configuration structures for a Hapticlock session.
//!
//! These structs are designed to be deserialized with `serde`, layered by the
//! `config` crate from an optional TOML file and `HAPTICLOCK_*` environment
//! variables. Every field has a default, so an empty configuration is valid.
//!
//! ```toml
//! cadence = "standard"
//!
//! [session]
//! start_position = 0
//! effects_path = "assets/haptics.json"
//!
//! [events]
//! channel_capacity = 64
//! ```

use crate::common::Position;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `HAPTICLOCK_CADENCE=fine` or
/// `HAPTICLOCK_SESSION__START_POSITION=1500`.
pub const ENV_PREFIX: &str = "HAPTICLOCK";

/// The top-level configuration for a `HapticlockEngine`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HapticlockConfig {
    /// How often the playback clock is sampled.
    pub cadence: PollCadence,

    /// Playback session settings.
    pub session: SessionConfig,

    /// Event stream settings.
    pub events: EventConfig,
}

/// Defines how often the position sampler polls the clock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollCadence {
    /// Every 10 ms.
    Fine,
    /// Every 20 ms. Short enough to stay under what people notice as haptic
    /// lag without waking up constantly.
    #[default]
    Standard,
    /// Every 50 ms. For low-power playback where loose sync is acceptable.
    Coarse,
    /// A user-defined interval in milliseconds.
    Custom { interval_ms: u64 },
}

impl PollCadence {
    /// The polling period. Never zero.
    pub fn interval(&self) -> Duration {
        let millis = match self {
            PollCadence::Fine => 10,
            PollCadence::Standard => 20,
            PollCadence::Coarse => 50,
            PollCadence::Custom { interval_ms } => (*interval_ms).max(1),
        };
        Duration::from_millis(millis)
    }
}

/// Settings for a single playback session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Clock position the first poll window starts from.
    pub start_position: Position,
    /// Descriptor file to load the effect catalog from.
    pub effects_path: Option<PathBuf>,
}

/// Settings for the broadcast event streams.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Capacity of each broadcast channel. Slow subscribers lag beyond this.
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

impl HapticlockConfig {
    /// Loads configuration from `path` (if given) and the environment.
    ///
    /// A missing file is an error only when a path was explicitly passed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
