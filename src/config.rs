//! Configuration boundary.
//!
//! Everything a caller supplies before a run (speed, algorithm key, batch
//! sizing) is repaired here: out-of-range numbers are clamped and unknown
//! keys defaulted, with a warning, so the engine and controller never see a
//! degenerate setting.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bridge::{DefaultRouter, ForegroundOnly, RunRouter};
use crate::engine::Algorithm;
use crate::error::{ConfigurationError, SortraceResult};

/// Default number of steps per background batch.
pub const DEFAULT_CHUNK_SIZE: usize = 96;

/// Default cap on undelivered background batches.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Playback speed in `1..=100`.
///
/// Construction clamps, so a `Speed` is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Speed(u32);

impl Speed {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(100);
    pub const DEFAULT: Self = Self(50);

    /// Clamps `raw` into `1..=100`.
    #[must_use]
    pub fn new(raw: u32) -> Self {
        let clamped = raw.clamp(Self::MIN.0, Self::MAX.0);
        if clamped != raw {
            warn!(requested = raw, clamped, "speed out of range, clamped");
        }
        Self(clamped)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// How fast the controller pulls at this speed.
    ///
    /// - 1..=20: one step per tick, `50 - 2 * (speed - 1)` ms apart;
    /// - 21..=50: one step per tick, `10 - (speed - 21) / 3` ms apart;
    /// - 51..=100: no delay, `(speed - 50) / 2 + 1` steps per tick.
    #[must_use]
    pub const fn cadence(self) -> Cadence {
        let s = self.0;
        if s <= 20 {
            Cadence::paced(50 - 2 * (s - 1))
        } else if s <= 50 {
            Cadence::paced(10 - (s - 21) / 3)
        } else {
            Cadence {
                delay: Duration::ZERO,
                steps_per_tick: ((s - 50) / 2 + 1) as usize,
            }
        }
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for Speed {
    fn from(raw: u32) -> Self {
        Self::new(raw)
    }
}

impl From<Speed> for u32 {
    fn from(speed: Speed) -> Self {
        speed.0
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pull rhythm derived from a [`Speed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    /// Pause after each tick.
    pub delay: Duration,
    /// Steps delivered per tick.
    pub steps_per_tick: usize,
}

impl Cadence {
    const fn paced(delay_ms: u32) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms as u64),
            steps_per_tick: 1,
        }
    }
}

/// Controller settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    pub speed: Speed,
}

/// Background bridge settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Steps per delivered batch.
    pub chunk_size: usize,
    /// Undelivered batches the producer may queue before it blocks.
    pub max_in_flight: usize,
}

impl BridgeConfig {
    /// Replaces a zero chunk size with the default and raises the queue
    /// depth to at least one.
    #[must_use]
    pub fn normalized(self) -> Self {
        let chunk_size = if self.chunk_size == 0 {
            warn!(default = DEFAULT_CHUNK_SIZE, "chunk_size of 0, using default");
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        };
        let max_in_flight = if self.max_in_flight == 0 {
            warn!("max_in_flight of 0, raised to 1");
            1
        } else {
            self.max_in_flight
        };
        Self {
            chunk_size,
            max_in_flight,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// A full session as supplied by the configuration collaborator.
///
/// # Examples
///
/// ```
/// use sortrace::{Algorithm, SessionConfig};
///
/// let config = SessionConfig::from_json(r#"{"algorithm": "pdq", "speed": 250}"#)
///     .unwrap()
///     .validated();
/// assert_eq!(config.algorithm(), Algorithm::Pdq);
/// assert_eq!(config.speed, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub algorithm: String,
    pub speed: u32,
    pub chunk_size: usize,
    pub max_in_flight: usize,
    /// Route background-eligible algorithms through the bridge.
    pub background: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Bubble.key().to_string(),
            speed: Speed::DEFAULT.get(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            background: true,
        }
    }
}

impl SessionConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> SortraceResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            ConfigurationError::InvalidConfig {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Reads and parses a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> SortraceResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigurationError::ConfigRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Clamps every numeric field into its accepted range.
    #[must_use]
    pub fn validated(self) -> Self {
        let speed = Speed::new(self.speed).get();
        let bridge = BridgeConfig {
            chunk_size: self.chunk_size,
            max_in_flight: self.max_in_flight,
        }
        .normalized();
        Self {
            speed,
            chunk_size: bridge.chunk_size,
            max_in_flight: bridge.max_in_flight,
            ..self
        }
    }

    /// The selected algorithm; an unknown key selects bubble sort.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm.parse().unwrap_or_else(|_| {
            warn!(key = %self.algorithm, "unknown algorithm, using bubble");
            Algorithm::Bubble
        })
    }

    #[must_use]
    pub fn playback(&self) -> PlaybackConfig {
        PlaybackConfig {
            speed: Speed::new(self.speed),
        }
    }

    #[must_use]
    pub fn bridge(&self) -> BridgeConfig {
        BridgeConfig {
            chunk_size: self.chunk_size,
            max_in_flight: self.max_in_flight,
        }
        .normalized()
    }

    /// Router honouring the `background` switch.
    #[must_use]
    pub fn router(&self) -> Box<dyn RunRouter> {
        if self.background {
            Box::new(DefaultRouter)
        } else {
            Box::new(ForegroundOnly)
        }
    }
}
