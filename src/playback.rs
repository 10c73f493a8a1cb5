//! Playback controller.
//!
//! The controller owns at most one active run and pulls its steps at a pace
//! derived from [`Speed`]. Each tick delivers one cadence's worth of steps to
//! the registered [`StepObserver`], synchronously and in order, and tells the
//! caller how long to wait before the next tick. Completion is detected with
//! one step of lookahead, so `on_complete` fires on the tick that delivers the
//! terminal step, exactly once.

use std::fmt;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge::{BackgroundBridge, DefaultRouter, ExecutionPath, RunRouter};
use crate::config::{BridgeConfig, PlaybackConfig, SessionConfig, Speed};
use crate::engine::{Algorithm, Trace};
use crate::error::{ExecutionError, SortraceError, SortraceResult};
use crate::step::Step;

/// Anything the controller can pull steps from.
pub trait StepSource: Send {
    /// The next step, `None` once the run is over.
    fn pull(&mut self) -> SortraceResult<Option<Step>>;
}

impl StepSource for Trace {
    fn pull(&mut self) -> SortraceResult<Option<Step>> {
        Ok(self.next())
    }
}

/// Receives every delivered step.
pub trait StepObserver {
    fn on_step(&mut self, step: &Step, stats: &PlaybackStats);

    /// Called once, right after the terminal step.
    fn on_complete(&mut self, _stats: &PlaybackStats) {}

    /// Called once when a run fails.
    fn on_error(&mut self, _error: &SortraceError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl StepObserver for NullObserver {
    fn on_step(&mut self, _step: &Step, _stats: &PlaybackStats) {}
}

/// Unique identifier for a controller run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new random run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// No run.
    Idle,
    Running,
    Paused,
    /// The terminal step was delivered.
    Completed,
    /// The run failed; it is never retried.
    Failed,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one [`Controller::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Paused,
    /// Steps were delivered; tick again after `delay`.
    Continue { delay: Duration },
    Completed,
    Failed,
}

/// Counters for the active run.
///
/// Elapsed time is wall clock since start and includes paused intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStats {
    pub steps: usize,
    /// Steps with a non-empty `comparing` set.
    pub comparisons: usize,
    /// Steps with a non-empty `swapping` set.
    pub swaps: usize,
    /// `None` until a run starts.
    pub started_at: Option<DateTime<Utc>>,
    /// Set once when the run completes or fails.
    pub finished_at: Option<DateTime<Utc>>,
}

impl PlaybackStats {
    fn started() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    fn record(&mut self, step: &Step) {
        self.steps += 1;
        self.comparisons += usize::from(step.is_comparison());
        self.swaps += usize::from(step.is_swap());
    }

    fn freeze(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
    }

    /// Time since start, frozen once the run ends. Zero before a start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        let Some(started) = self.started_at else {
            return Duration::ZERO;
        };
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - started).to_std().unwrap_or_default()
    }
}

/// One run's step source plus a single step of lookahead.
struct Cursor {
    run: RunId,
    algorithm: Algorithm,
    path: ExecutionPath,
    source: Box<dyn StepSource>,
    lookahead: Option<Step>,
    stashed: Option<SortraceError>,
    primed: bool,
}

impl Cursor {
    fn new(algorithm: Algorithm, path: ExecutionPath, source: Box<dyn StepSource>) -> Self {
        Self {
            run: RunId::new(),
            algorithm,
            path,
            source,
            lookahead: None,
            stashed: None,
            primed: false,
        }
    }

    fn fill(&mut self) {
        match self.source.pull() {
            Ok(step) => self.lookahead = step,
            Err(err) => self.stashed = Some(err),
        }
    }

    /// The next step and whether it is the last one. An error pulled while
    /// looking ahead is returned on the following call.
    fn advance(&mut self) -> SortraceResult<Option<(Step, bool)>> {
        if !self.primed {
            self.primed = true;
            self.fill();
        }
        let Some(step) = self.lookahead.take() else {
            return match self.stashed.take() {
                Some(err) => Err(err),
                None => Ok(None),
            };
        };
        self.fill();
        let last = self.lookahead.is_none() && self.stashed.is_none();
        Ok(Some((step, last)))
    }
}

/// Paced consumer of one algorithm run at a time.
pub struct Controller<O: StepObserver, R: RunRouter = DefaultRouter> {
    observer: O,
    router: R,
    bridge: BackgroundBridge,
    speed: Speed,
    state: PlaybackState,
    stats: PlaybackStats,
    cursor: Option<Cursor>,
}

impl<O: StepObserver> Controller<O> {
    /// Create a controller with the default router.
    pub fn new(observer: O, playback: PlaybackConfig, bridge: BridgeConfig) -> Self {
        Self::with_router(observer, DefaultRouter, playback, bridge)
    }
}

impl<O: StepObserver> Controller<O, Box<dyn RunRouter>> {
    /// Create a controller from a session; the router honours its
    /// `background` switch.
    pub fn from_session(observer: O, session: &SessionConfig) -> Self {
        Self::with_router(observer, session.router(), session.playback(), session.bridge())
    }
}

impl<O: StepObserver, R: RunRouter> Controller<O, R> {
    /// Create a controller with a custom router.
    pub fn with_router(observer: O, router: R, playback: PlaybackConfig, bridge: BridgeConfig) -> Self {
        Self {
            observer,
            router,
            bridge: BackgroundBridge::new(bridge),
            speed: playback.speed,
            state: PlaybackState::Idle,
            stats: PlaybackStats::default(),
            cursor: None,
        }
    }

    /// Starts a new run over a copy of `input`, discarding any current one.
    ///
    /// # Errors
    ///
    /// Fails if the router sends an algorithm the bridge refuses, or if the
    /// bridge thread cannot be spawned. The controller is left idle.
    pub fn start(&mut self, algorithm: Algorithm, input: &[i64]) -> SortraceResult<RunId> {
        self.reset();
        let path = self.router.route(algorithm);
        let source: Box<dyn StepSource> = match path {
            ExecutionPath::Foreground => Box::new(algorithm.trace(input)),
            ExecutionPath::Background => Box::new(self.bridge.stream(algorithm, input)?),
        };
        Ok(self.open(algorithm, path, source))
    }

    fn open(&mut self, algorithm: Algorithm, path: ExecutionPath, source: Box<dyn StepSource>) -> RunId {
        let cursor = Cursor::new(algorithm, path, source);
        let run = cursor.run;
        info!(run = %run, algorithm = algorithm.key(), %path, speed = self.speed.get(), "run started");
        self.cursor = Some(cursor);
        self.stats = PlaybackStats::started();
        self.state = PlaybackState::Running;
        run
    }

    /// Delivers one cadence's worth of steps.
    ///
    /// # Errors
    ///
    /// Returns the run's error on the tick that hits it; the controller is
    /// then `Failed` and later ticks return `Ok(TickOutcome::Failed)`.
    pub fn tick(&mut self) -> SortraceResult<TickOutcome> {
        match self.state {
            PlaybackState::Idle => return Ok(TickOutcome::Idle),
            PlaybackState::Paused => return Ok(TickOutcome::Paused),
            PlaybackState::Completed => return Ok(TickOutcome::Completed),
            PlaybackState::Failed => return Ok(TickOutcome::Failed),
            PlaybackState::Running => {}
        }

        let cadence = self.speed.cadence();
        let Some(cursor) = self.cursor.as_mut() else {
            return Err(ExecutionError::NoActiveRun.into());
        };
        for _ in 0..cadence.steps_per_tick {
            match cursor.advance() {
                Ok(Some((step, last))) => {
                    self.stats.record(&step);
                    self.observer.on_step(&step, &self.stats);
                    if last {
                        self.complete();
                        return Ok(TickOutcome::Completed);
                    }
                }
                Ok(None) => {
                    self.complete();
                    return Ok(TickOutcome::Completed);
                }
                Err(err) => {
                    self.fail(&err);
                    return Err(err);
                }
            }
        }
        Ok(TickOutcome::Continue { delay: cadence.delay })
    }

    fn complete(&mut self) {
        self.stats.freeze();
        self.state = PlaybackState::Completed;
        if let Some(cursor) = self.cursor.take() {
            debug!(
                run = %cursor.run,
                algorithm = cursor.algorithm.key(),
                steps = self.stats.steps,
                elapsed = ?self.stats.elapsed(),
                "run completed"
            );
        }
        self.observer.on_complete(&self.stats);
    }

    fn fail(&mut self, err: &SortraceError) {
        self.stats.freeze();
        self.state = PlaybackState::Failed;
        if let Some(cursor) = self.cursor.take() {
            warn!(run = %cursor.run, algorithm = cursor.algorithm.key(), error = %err, "run failed");
        }
        self.observer.on_error(err);
    }

    /// Stops pulling; the position is kept.
    ///
    /// # Errors
    ///
    /// `NoActiveRun` unless running or already paused.
    pub fn pause(&mut self) -> SortraceResult<()> {
        match self.state {
            PlaybackState::Running | PlaybackState::Paused => {
                self.state = PlaybackState::Paused;
                Ok(())
            }
            _ => Err(ExecutionError::NoActiveRun.into()),
        }
    }

    /// Continues from the retained position.
    ///
    /// # Errors
    ///
    /// `NoActiveRun` unless paused or already running.
    pub fn resume(&mut self) -> SortraceResult<()> {
        match self.state {
            PlaybackState::Running | PlaybackState::Paused => {
                self.state = PlaybackState::Running;
                Ok(())
            }
            _ => Err(ExecutionError::NoActiveRun.into()),
        }
    }

    /// Discards the run, tears down any bridge job and zeroes the stats.
    pub fn reset(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            debug!(run = %cursor.run, algorithm = cursor.algorithm.key(), "run discarded");
        }
        self.stats = PlaybackStats::default();
        self.state = PlaybackState::Idle;
    }

    /// Changes speed; out-of-range values are clamped. Applies from the next
    /// tick.
    pub fn set_speed(&mut self, speed: u32) {
        self.speed = Speed::new(speed);
    }

    /// Ticks until the run is paused, completed or failed, sleeping between
    /// ticks per the cadence.
    pub fn run_to_completion(&mut self) -> SortraceResult<TickOutcome> {
        loop {
            match self.tick()? {
                TickOutcome::Continue { delay } => {
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                outcome => return Ok(outcome),
            }
        }
    }

    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub const fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    #[must_use]
    pub const fn speed(&self) -> Speed {
        self.speed
    }

    /// Id of the active run.
    #[must_use]
    pub fn run_id(&self) -> Option<RunId> {
        self.cursor.as_ref().map(|c| c.run)
    }

    /// Path of the active run.
    #[must_use]
    pub fn path(&self) -> Option<ExecutionPath> {
        self.cursor.as_ref().map(|c| c.path)
    }

    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}

impl<O: StepObserver + fmt::Debug, R: RunRouter> fmt::Debug for Controller<O, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("observer", &self.observer)
            .field("speed", &self.speed)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .field("run", &self.run_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        steps: Vec<Step>,
        completions: usize,
        errors: Vec<String>,
    }

    impl StepObserver for Recorder {
        fn on_step(&mut self, step: &Step, _stats: &PlaybackStats) {
            self.steps.push(step.clone());
        }

        fn on_complete(&mut self, _stats: &PlaybackStats) {
            self.completions += 1;
        }

        fn on_error(&mut self, error: &SortraceError) {
            self.errors.push(error.to_string());
        }
    }

    /// Yields `steps` steps, then fails.
    struct Failing {
        steps: usize,
    }

    impl StepSource for Failing {
        fn pull(&mut self) -> SortraceResult<Option<Step>> {
            if self.steps == 0 {
                return Err(ExecutionError::Worker {
                    message: "boom".to_string(),
                }
                .into());
            }
            self.steps -= 1;
            Ok(Some(Step::plain(vec![1, 2], vec![])))
        }
    }

    fn controller(speed: u32) -> Controller<Recorder> {
        Controller::new(
            Recorder::default(),
            PlaybackConfig { speed: Speed::new(speed) },
            BridgeConfig::default(),
        )
    }

    #[test]
    fn idle_controller_ticks_idle() {
        let mut c = controller(100);
        assert_eq!(c.tick().unwrap(), TickOutcome::Idle);
        assert!(c.pause().is_err());
        assert!(c.resume().is_err());
        assert_eq!(c.stats().elapsed(), Duration::ZERO);
    }

    #[test]
    fn completion_fires_on_terminal_tick() {
        let mut c = controller(1);
        c.start(Algorithm::Insertion, &[2, 1]).unwrap();
        let mut ticks = 0;
        loop {
            ticks += 1;
            match c.tick().unwrap() {
                TickOutcome::Continue { delay } => assert_eq!(delay, Duration::from_millis(50)),
                TickOutcome::Completed => break,
                other => panic!("unexpected {other:?}"),
            }
        }
        let total = c.observer().steps.len();
        // one step per tick at speed 1
        assert_eq!(ticks, total);
        assert_eq!(c.observer().completions, 1);
        assert_eq!(c.tick().unwrap(), TickOutcome::Completed);
        assert_eq!(c.observer().completions, 1);
        assert!(c.observer().steps.last().unwrap().is_settled());
    }

    #[test]
    fn fast_speed_batches_steps_per_tick() {
        let input: Vec<i64> = (0..20).rev().collect();
        let total = Algorithm::Bubble.trace(&input).count();

        let mut c = controller(60);
        c.start(Algorithm::Bubble, &input).unwrap();
        assert_eq!(
            c.tick().unwrap(),
            TickOutcome::Continue {
                delay: Duration::ZERO
            }
        );
        assert_eq!(c.stats().steps, 6);
        assert_eq!(c.run_to_completion().unwrap(), TickOutcome::Completed);
        assert_eq!(c.stats().steps, total);
        assert_eq!(c.observer().completions, 1);
    }

    #[test]
    fn pause_retains_position() {
        let mut c = controller(100);
        c.start(Algorithm::Selection, &[4, 3, 2, 1]).unwrap();
        c.tick().unwrap();
        let before = c.stats().steps;
        c.pause().unwrap();
        assert_eq!(c.tick().unwrap(), TickOutcome::Paused);
        assert_eq!(c.stats().steps, before);
        c.resume().unwrap();
        c.run_to_completion().unwrap();

        let expected: Vec<Step> = Algorithm::Selection.trace(&[4, 3, 2, 1]).collect();
        assert_eq!(c.observer().steps, expected);
    }

    #[test]
    fn run_to_completion_stops_when_paused() {
        let mut c = controller(100);
        c.start(Algorithm::Bubble, &[3, 2, 1]).unwrap();
        c.pause().unwrap();
        assert_eq!(c.run_to_completion().unwrap(), TickOutcome::Paused);
        assert_eq!(c.stats().steps, 0);
    }

    #[test]
    fn reset_discards_run_and_stats() {
        let mut c = controller(100);
        let run = c.start(Algorithm::Bubble, &[3, 2, 1]).unwrap();
        assert_eq!(c.run_id(), Some(run));
        c.tick().unwrap();
        c.reset();
        assert_eq!(c.state(), PlaybackState::Idle);
        assert_eq!(c.stats(), &PlaybackStats::default());
        assert_eq!(c.run_id(), None);
        assert_eq!(c.observer().completions, 0);
    }

    #[test]
    fn start_replaces_previous_run() {
        let mut c = controller(100);
        let first = c.start(Algorithm::Bubble, &[3, 2, 1]).unwrap();
        c.tick().unwrap();
        let second = c.start(Algorithm::Insertion, &[2, 1]).unwrap();
        assert_ne!(first, second);
        assert_eq!(c.stats().steps, 0);
        assert_eq!(c.run_to_completion().unwrap(), TickOutcome::Completed);
    }

    #[test]
    fn counts_comparison_and_swap_steps() {
        let input = [3_i64, 1, 2];
        let summary = Algorithm::Bubble.summarize(&input);
        let mut c = controller(100);
        c.start(Algorithm::Bubble, &input).unwrap();
        c.run_to_completion().unwrap();
        assert_eq!(c.stats().comparisons, summary.comparisons);
        assert_eq!(c.stats().swaps, summary.swaps);
        assert!(c.stats().finished_at.is_some());
    }

    #[test]
    fn source_error_fails_run_after_delivered_steps() {
        let mut c = controller(100);
        c.open(Algorithm::Quick, ExecutionPath::Background, Box::new(Failing { steps: 3 }));
        let err = c.tick().unwrap_err();
        assert!(err.is_execution());
        assert_eq!(c.state(), PlaybackState::Failed);
        assert_eq!(c.observer().steps.len(), 3);
        assert_eq!(c.observer().errors.len(), 1);
        assert_eq!(c.observer().completions, 0);
        assert_eq!(c.tick().unwrap(), TickOutcome::Failed);
        assert_eq!(c.observer().errors.len(), 1);
    }

    #[test]
    fn timestamps_follow_run_lifecycle() {
        let mut c = controller(100);
        assert_eq!(c.stats().started_at, None);
        assert_eq!(c.stats().finished_at, None);

        c.start(Algorithm::Insertion, &[3, 1, 2]).unwrap();
        assert!(c.stats().started_at.is_some());
        assert_eq!(c.stats().finished_at, None);

        c.run_to_completion().unwrap();
        let stats = c.stats().clone();
        let (Some(started), Some(finished)) = (stats.started_at, stats.finished_at) else {
            panic!("expected both timestamps, got {stats:?}");
        };
        assert!(finished >= started);
        // frozen once the run ends
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(c.stats().elapsed(), stats.elapsed());
    }

    #[test]
    fn set_speed_clamps() {
        let mut c = controller(10);
        c.set_speed(0);
        assert_eq!(c.speed(), Speed::MIN);
        c.set_speed(500);
        assert_eq!(c.speed(), Speed::MAX);
    }

    #[test]
    fn background_run_delivers_synchronous_sequence() {
        let input: Vec<i64> = (0..30).map(|i| (i * 11) % 17).collect();
        let mut c = controller(100);
        c.start(Algorithm::QuickMt, &input).unwrap();
        assert_eq!(c.path(), Some(ExecutionPath::Background));
        assert_eq!(c.run_to_completion().unwrap(), TickOutcome::Completed);

        let expected: Vec<Step> = Algorithm::Quick.trace(&input).collect();
        assert_eq!(c.observer().steps, expected);
        assert_eq!(c.observer().completions, 1);
    }

    #[test]
    fn foreground_only_router_keeps_quick_mt_local() {
        let mut c = Controller::with_router(
            Recorder::default(),
            crate::bridge::ForegroundOnly,
            PlaybackConfig::default(),
            BridgeConfig::default(),
        );
        c.start(Algorithm::QuickMt, &[2, 1]).unwrap();
        assert_eq!(c.path(), Some(ExecutionPath::Foreground));
    }
}
