//! # Hapticlock
//!
//! Fires timestamped haptic effects in step with an external playback clock.
//!
//! Hapticlock samples a playback position (a video or audio player's clock) at
//! a fixed cadence and fires every effect whose timestamp the clock has crossed
//! since the previous sample, exactly once, even when the clock stalls, jumps
//! ahead or is rewound.
//!
//! ## Core Concepts
//!
//! - **Catalog**: The immutable, timestamp-ordered list of effects for a
//!   session, validated once at load time from a JSON descriptor.
//! - **Ledger**: The set of effects already fired during the current pass over
//!   the media. It is cleared whenever the clock moves backward.
//! - **Scheduler**: Matches each poll window `[last, current]` against the
//!   catalog and ledger. [`scheduler::HapticScheduler::tick`] is a plain step
//!   function, so it can be driven by the bundled polling loop or by any other
//!   source of clock observations.
//! - **Dispatch**: Hands each due effect to an [`dispatch::Actuator`],
//!   cancelling whatever was playing before.
//! - **Engine**: Runs the poll loop on a Tokio task and broadcasts what it does
//!   as strongly-typed events (`SystemEvent`, `EffectEvent`).
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hapticlock::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Load the effect catalog.
//!     let catalog = Catalog::from_path("assets/haptics.json")?;
//!
//!     // 2. Create the engine with the default 20 ms cadence.
//!     let engine = HapticlockEngine::new(HapticlockConfig::default(), Arc::new(catalog));
//!
//!     // 3. Subscribe to an event stream before starting the session.
//!     let mut effects = engine.subscribe_effect_events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = effects.recv().await {
//!             println!("Received Effect Event: {:?}", event);
//!         }
//!     });
//!
//!     // 4. Start the media clock.
//!     let clock = PlaybackClock::new(0);
//!     clock.play();
//!
//!     // 5. Run the session. It will shut down on Ctrl+C.
//!     engine.run(clock, LoggingActuator).await?;
//!
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Hapticlock";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod catalog;
pub mod clock;
pub mod common;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod matcher;
pub mod scheduler;

/// A prelude module for easy importing of the most common Hapticlock types.
pub mod prelude {
    pub use crate::catalog::{Catalog, EffectDescriptor, Intensity, LoadError};
    pub use crate::clock::{ClockSource, PlaybackClock, WatchClock};
    pub use crate::common::{Position, PositionWindow};
    pub use crate::config::{HapticlockConfig, PollCadence};
    pub use crate::dispatch::{Actuator, ActuatorError, LoggingActuator};
    pub use crate::engine::{HapticlockEngine, SessionHandle};
    pub use crate::events::{EffectEvent, SystemEvent};
    pub use crate::scheduler::HapticScheduler;
}
