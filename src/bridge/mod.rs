//! Background execution bridge.
//!
//! A background-eligible run executes on its own named thread over a private
//! copy of the input. Steps travel back in batches over a bounded channel;
//! the producer blocks once `max_in_flight` batches are undelivered, so a
//! slow consumer never forces unbounded buffering. Every job ends in exactly
//! one `Done` or one `Error` message, unless it is cancelled first.

mod stream;
mod worker;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::engine::Algorithm;
use crate::error::{ConfigurationError, SortraceResult};
use crate::step::Step;

pub use stream::BackgroundStream;
pub use worker::BackgroundJob;

use worker::Job;

/// Where a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPath {
    /// Pulled directly by the controller.
    Foreground,
    /// Streamed from a bridge thread.
    Background,
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Foreground => write!(f, "foreground"),
            Self::Background => write!(f, "background"),
        }
    }
}

/// Chooses the execution path for an algorithm.
pub trait RunRouter: Send + Sync {
    /// Selects the execution path for `algorithm`.
    fn route(&self, algorithm: Algorithm) -> ExecutionPath;
}

impl<R: RunRouter + ?Sized> RunRouter for Box<R> {
    fn route(&self, algorithm: Algorithm) -> ExecutionPath {
        (**self).route(algorithm)
    }
}

/// Routes background-eligible algorithms to the bridge.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRouter;

impl RunRouter for DefaultRouter {
    fn route(&self, algorithm: Algorithm) -> ExecutionPath {
        if algorithm.info().background_eligible {
            ExecutionPath::Background
        } else {
            ExecutionPath::Foreground
        }
    }
}

/// Keeps every run on the foreground path.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForegroundOnly;

impl RunRouter for ForegroundOnly {
    fn route(&self, _algorithm: Algorithm) -> ExecutionPath {
        ExecutionPath::Foreground
    }
}

/// Unique identifier for a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a new random job ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message from a bridge thread to its consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    /// Steps in production order.
    Steps {
        batch: Vec<Step>,
    },
    /// The run completed; every batch has been sent.
    Done,
    /// The run failed.
    Error {
        message: String,
    },
}

impl BridgeMessage {
    /// Returns true for `Done` and `Error`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

/// Starts background jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackgroundBridge {
    config: BridgeConfig,
}

impl BackgroundBridge {
    /// Creates a bridge; zero sizes in `config` are normalized.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config: config.normalized(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> BridgeConfig {
        self.config
    }

    /// Runs `algorithm` over a copy of `input` on a new thread.
    ///
    /// # Errors
    ///
    /// `NotBackgroundEligible` for algorithms that are not marked
    /// background-eligible, or an internal error if the thread cannot be
    /// spawned.
    pub fn spawn(&self, algorithm: Algorithm, input: &[i64]) -> SortraceResult<BackgroundJob> {
        if !algorithm.info().background_eligible {
            return Err(ConfigurationError::NotBackgroundEligible {
                algorithm: algorithm.key().to_string(),
            }
            .into());
        }
        BackgroundJob::start(
            Job::Trace {
                algorithm,
                input: input.to_vec(),
            },
            self.config,
        )
    }

    /// Like [`BackgroundBridge::spawn`], wrapped as a step source.
    pub fn stream(&self, algorithm: Algorithm, input: &[i64]) -> SortraceResult<BackgroundStream> {
        self.spawn(algorithm, input).map(BackgroundStream::new)
    }

    #[cfg(test)]
    pub(crate) fn spawn_failing(&self, input: &[i64], after: usize) -> SortraceResult<BackgroundJob> {
        BackgroundJob::start(
            Job::FailAfter {
                input: input.to_vec(),
                after,
            },
            self.config,
        )
    }
}
