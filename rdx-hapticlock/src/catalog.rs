//! The effect catalog: every haptic effect of a playback session, validated and
//! ordered by timestamp.
//!
//! A catalog is built exactly once from an [`EffectSource`] and never changes
//! afterwards. Sessions share it behind an `Arc`. All validation happens here,
//! so the matcher and dispatcher can treat every descriptor they see as
//! well-formed.

use crate::common::Position;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Descriptor value for `repeat` meaning "play the waveform once".
pub const NO_REPEAT: i64 = -1;

/// Descriptor amplitude meaning "use the device's default strength".
pub const DEFAULT_AMPLITUDE: i64 = -1;

/// Strength of one waveform segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intensity {
    /// Whatever strength the device plays at when none is given.
    Default,
    /// An explicit level from 0 (off) to 255 (strongest).
    Level(u8),
}

impl Intensity {
    /// Returns `true` for a segment that produces no vibration.
    pub fn is_off(self) -> bool {
        self == Intensity::Level(0)
    }
}

/// A single scheduled haptic effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectDescriptor {
    /// Clock position at which the effect becomes due.
    pub timestamp: Position,
    /// Informational only. Handed through to the actuator untouched.
    pub duration: u64,
    /// Alternating pause/pulse segment lengths.
    pub waveform: Vec<u64>,
    /// One intensity per waveform segment.
    pub intensities: Vec<Intensity>,
    /// Segment index the waveform loops back to, if it loops at all.
    pub repeat: Option<usize>,
}

/// One effect record as it appears in a descriptor document.
///
/// Every field is optional at this level so that a missing field can be
/// reported against the record that lacks it instead of failing the whole
/// document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EffectRecord {
    pub timestamp: Option<i64>,
    pub duration: Option<i64>,
    #[serde(default = "default_repeat")]
    pub repeat: i64,
    pub pattern: Option<Vec<i64>>,
    pub amplitudes: Option<Vec<i64>>,
}

fn default_repeat() -> i64 {
    NO_REPEAT
}

/// The top-level shape of a descriptor document.
#[derive(Debug, Deserialize)]
struct EffectDocument {
    haptics: Vec<EffectRecord>,
}

/// Why a single effect record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectDefect {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` must not be negative")]
    Negative(&'static str),
    #[error("pattern is empty")]
    EmptyPattern,
    #[error("pattern has {pattern} segments but amplitudes has {amplitudes}")]
    LengthMismatch { pattern: usize, amplitudes: usize },
    #[error("repeat index {repeat} is outside a pattern of {len} segments")]
    InvalidRepeat { repeat: i64, len: usize },
    #[error("amplitude {0} is neither -1 nor within 0..=255")]
    AmplitudeOutOfRange(i64),
}

/// Errors that prevent a catalog from being built.
///
/// Any of these is fatal to session start: a session never begins with a
/// partially loaded catalog.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read effect descriptor {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("effect descriptor is not valid: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("malformed effect at index {index}: {defect}")]
    MalformedEffect { index: usize, defect: EffectDefect },
    #[error("effects at index {first} and {second} share timestamp {timestamp}")]
    DuplicateTimestamp {
        timestamp: Position,
        first: usize,
        second: usize,
    },
}

/// Anything that can hand over the raw effect records of a session.
pub trait EffectSource {
    fn records(&self) -> Result<Vec<EffectRecord>, LoadError>;
}

/// A descriptor document held in memory as JSON text.
#[derive(Debug, Clone, Copy)]
pub struct JsonDescriptor<'a>(pub &'a str);

impl EffectSource for JsonDescriptor<'_> {
    fn records(&self) -> Result<Vec<EffectRecord>, LoadError> {
        let document: EffectDocument = serde_json::from_str(self.0)?;
        Ok(document.haptics)
    }
}

/// A descriptor document stored on disk.
#[derive(Debug, Clone)]
pub struct DescriptorFile(pub PathBuf);

impl EffectSource for DescriptorFile {
    fn records(&self) -> Result<Vec<EffectRecord>, LoadError> {
        let text = fs::read_to_string(&self.0).map_err(|source| LoadError::Io {
            path: self.0.clone(),
            source,
        })?;
        JsonDescriptor(&text).records()
    }
}

impl EffectSource for Vec<EffectRecord> {
    fn records(&self) -> Result<Vec<EffectRecord>, LoadError> {
        Ok(self.clone())
    }
}

/// The immutable, timestamp-ordered set of effects for one playback session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    effects: Vec<EffectDescriptor>,
}

impl Catalog {
    /// Builds a catalog from any effect source.
    ///
    /// Records are validated in document order, and the first defect aborts the
    /// load. The resulting catalog is sorted by timestamp regardless of the
    /// order the source listed them in.
    pub fn load<S: EffectSource + ?Sized>(source: &S) -> Result<Self, LoadError> {
        let records = source.records()?;
        let mut indexed = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let effect = validate(record)
                .map_err(|defect| LoadError::MalformedEffect { index, defect })?;
            indexed.push((index, effect));
        }

        indexed.sort_by_key(|(_, effect)| effect.timestamp);
        for pair in indexed.windows(2) {
            let (first, a) = &pair[0];
            let (second, b) = &pair[1];
            if a.timestamp == b.timestamp {
                return Err(LoadError::DuplicateTimestamp {
                    timestamp: a.timestamp,
                    first: *first.min(second),
                    second: *first.max(second),
                });
            }
        }

        let effects: Vec<EffectDescriptor> =
            indexed.into_iter().map(|(_, effect)| effect).collect();
        debug!(count = effects.len(), "effect catalog validated");
        Ok(Self { effects })
    }

    /// Loads a catalog from a JSON descriptor file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let catalog = Self::load(&DescriptorFile(path.to_path_buf()))?;
        info!(
            "Loaded {} haptic effects from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Loads a catalog from JSON descriptor text.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Self::load(&JsonDescriptor(json))
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EffectDescriptor> {
        self.effects.get(index)
    }

    /// Iterates over the effects in ascending timestamp order.
    pub fn iter(&self) -> std::slice::Iter<'_, EffectDescriptor> {
        self.effects.iter()
    }

    /// The effects as an ascending, read-only slice.
    pub fn as_slice(&self) -> &[EffectDescriptor] {
        &self.effects
    }

    /// Timestamp of the last effect, if there is one.
    pub fn last_timestamp(&self) -> Option<Position> {
        self.effects.last().map(|effect| effect.timestamp)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a EffectDescriptor;
    type IntoIter = std::slice::Iter<'a, EffectDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate(record: EffectRecord) -> Result<EffectDescriptor, EffectDefect> {
    let timestamp = record
        .timestamp
        .ok_or(EffectDefect::MissingField("timestamp"))?;
    let duration = record
        .duration
        .ok_or(EffectDefect::MissingField("duration"))?;
    let pattern = record.pattern.ok_or(EffectDefect::MissingField("pattern"))?;
    let amplitudes = record
        .amplitudes
        .ok_or(EffectDefect::MissingField("amplitudes"))?;

    let timestamp = u64::try_from(timestamp).map_err(|_| EffectDefect::Negative("timestamp"))?;
    let duration = u64::try_from(duration).map_err(|_| EffectDefect::Negative("duration"))?;

    if pattern.is_empty() {
        return Err(EffectDefect::EmptyPattern);
    }
    if pattern.len() != amplitudes.len() {
        return Err(EffectDefect::LengthMismatch {
            pattern: pattern.len(),
            amplitudes: amplitudes.len(),
        });
    }

    let repeat = match record.repeat {
        NO_REPEAT => None,
        index if index >= 0 && (index as usize) < pattern.len() => Some(index as usize),
        repeat => {
            return Err(EffectDefect::InvalidRepeat {
                repeat,
                len: pattern.len(),
            })
        }
    };

    let waveform = pattern
        .into_iter()
        .map(|segment| u64::try_from(segment).map_err(|_| EffectDefect::Negative("pattern")))
        .collect::<Result<Vec<_>, _>>()?;
    let intensities = amplitudes
        .into_iter()
        .map(|amplitude| match amplitude {
            DEFAULT_AMPLITUDE => Ok(Intensity::Default),
            level => u8::try_from(level)
                .map(Intensity::Level)
                .map_err(|_| EffectDefect::AmplitudeOutOfRange(level)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EffectDescriptor {
        timestamp,
        duration,
        waveform,
        intensities,
        repeat,
    })
}
