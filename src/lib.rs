//! # sortrace - Instrumented Sorting Algorithms
//!
//! sortrace runs sorting algorithms as lazy producers of [`Step`]s: snapshots
//! of the array annotated with the indices just compared, just written, and
//! already settled. The traces are deterministic, so a run can be replayed,
//! paced, paused, or streamed from a background thread without changing what
//! a consumer sees.
//!
//! ## Core Concepts
//!
//! - **Step**: one snapshot of sort progress
//! - **Algorithm**: one of 32 procedures, each traced lazily via [`Algorithm::trace`]
//! - **Controller**: pulls steps at a cadence derived from a speed in `1..=100`
//! - **Bridge**: runs background-eligible algorithms on a separate thread and
//!   streams batches back under backpressure
//!
//! ## Usage
//!
//! ```rust
//! use sortrace::Algorithm;
//!
//! let steps: Vec<_> = Algorithm::Insertion.trace(&[5_i64, 3, 8, 1]).collect();
//! let last = steps.last().unwrap();
//! assert_eq!(last.array, vec![1, 3, 5, 8]);
//! assert_eq!(last.sorted, vec![0, 1, 2, 3]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod playback;
pub mod step;

pub use bridge::{
    BackgroundBridge, BackgroundJob, BackgroundStream, BridgeMessage, DefaultRouter, ExecutionPath, ForegroundOnly,
    JobId, RunRouter,
};
pub use config::{BridgeConfig, Cadence, PlaybackConfig, SessionConfig, Speed};
pub use engine::{Algorithm, AlgorithmInfo, DigestBuilder, Family, Trace, TraceDigest, TraceSummary};
pub use error::{ConfigurationError, ExecutionError, SortraceError, SortraceResult};
pub use playback::{
    Controller, NullObserver, PlaybackState, PlaybackStats, RunId, StepObserver, StepSource, TickOutcome,
};
pub use step::{SortValue, Step};
