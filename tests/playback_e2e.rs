use std::time::Duration;

use sortrace::{
    Algorithm, BridgeConfig, Controller, PlaybackConfig, PlaybackState, PlaybackStats, SessionConfig,
    SortraceError, Speed, Step, StepObserver, TickOutcome,
};

#[derive(Debug, Default)]
struct Recorder {
    steps: Vec<Step>,
    observed_counts: Vec<usize>,
    completions: usize,
    errors: usize,
}

impl StepObserver for Recorder {
    fn on_step(&mut self, step: &Step, stats: &PlaybackStats) {
        self.steps.push(step.clone());
        self.observed_counts.push(stats.steps);
    }

    fn on_complete(&mut self, _stats: &PlaybackStats) {
        self.completions += 1;
    }

    fn on_error(&mut self, _error: &SortraceError) {
        self.errors += 1;
    }
}

fn controller(speed: u32, bridge: BridgeConfig) -> Controller<Recorder> {
    Controller::new(
        Recorder::default(),
        PlaybackConfig {
            speed: Speed::new(speed),
        },
        bridge,
    )
}

#[test]
fn every_step_is_delivered_once_in_order() {
    let input: Vec<i64> = (0..25).map(|i| (i * 13) % 29).collect();
    for algorithm in [Algorithm::Merge, Algorithm::Tim, Algorithm::BitonicMt, Algorithm::Spread] {
        let mut c = controller(100, BridgeConfig::default());
        c.start(algorithm, &input).unwrap();
        assert_eq!(c.run_to_completion().unwrap(), TickOutcome::Completed);

        let expected: Vec<Step> = algorithm.trace(&input).collect();
        let observer = c.observer();
        assert_eq!(observer.steps, expected, "{algorithm}");
        // stats are updated before the observer sees each step
        assert_eq!(observer.observed_counts, (1..=expected.len()).collect::<Vec<_>>());
        assert_eq!(observer.completions, 1);
        assert_eq!(observer.errors, 0);
    }
}

#[test]
fn speed_change_mid_run_takes_effect_next_tick() {
    let input: Vec<i64> = (0..30).rev().collect();
    let mut c = controller(1, BridgeConfig::default());
    c.start(Algorithm::Bubble, &input).unwrap();

    assert_eq!(
        c.tick().unwrap(),
        TickOutcome::Continue {
            delay: Duration::from_millis(50)
        }
    );
    assert_eq!(c.stats().steps, 1);

    c.set_speed(100);
    assert_eq!(
        c.tick().unwrap(),
        TickOutcome::Continue {
            delay: Duration::ZERO
        }
    );
    assert_eq!(c.stats().steps, 27);
}

#[test]
fn medium_speed_paces_single_steps() {
    let mut c = controller(35, BridgeConfig::default());
    c.start(Algorithm::Gnome, &[3, 1, 2]).unwrap();
    assert_eq!(
        c.tick().unwrap(),
        TickOutcome::Continue {
            delay: Duration::from_millis(6)
        }
    );
    assert_eq!(c.stats().steps, 1);
}

#[test]
fn elapsed_is_frozen_after_completion() {
    let mut c = controller(100, BridgeConfig::default());
    c.start(Algorithm::Insertion, &[2, 1]).unwrap();
    c.run_to_completion().unwrap();
    assert_eq!(c.state(), PlaybackState::Completed);
    let first = c.stats().elapsed();
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(c.stats().elapsed(), first);
}

#[test]
fn background_run_streams_through_controller() {
    let input: Vec<i64> = (0..120).map(|i| (i * 71) % 113).collect();
    let mut c = controller(
        100,
        BridgeConfig {
            chunk_size: 5,
            max_in_flight: 2,
        },
    );
    c.start(Algorithm::QuickMt, &input).unwrap();
    assert_eq!(c.run_to_completion().unwrap(), TickOutcome::Completed);

    let expected: Vec<Step> = Algorithm::QuickMt.trace(&input).collect();
    assert_eq!(c.observer().steps, expected);
    assert_eq!(c.observer().completions, 1);
}

#[test]
fn reset_tears_down_background_run() {
    let input: Vec<i64> = (0..400).rev().collect();
    let mut c = controller(
        51,
        BridgeConfig {
            chunk_size: 1,
            max_in_flight: 1,
        },
    );
    c.start(Algorithm::QuickMt, &input).unwrap();
    c.tick().unwrap();
    c.reset();
    assert_eq!(c.state(), PlaybackState::Idle);
    assert_eq!(c.tick().unwrap(), TickOutcome::Idle);

    // a new run starts cleanly after the teardown
    c.start(Algorithm::Insertion, &[2, 1]).unwrap();
    assert_eq!(c.run_to_completion().unwrap(), TickOutcome::Completed);
    assert_eq!(c.observer().completions, 1);
}

#[test]
fn session_config_builds_foreground_controller() {
    let session = SessionConfig {
        algorithm: "quick-mt".to_string(),
        background: false,
        ..SessionConfig::default()
    };
    let mut c = Controller::from_session(Recorder::default(), &session);
    c.start(session.algorithm(), &[3, 1, 2]).unwrap();
    assert_eq!(c.path(), Some(sortrace::ExecutionPath::Foreground));
    assert_eq!(c.speed(), Speed::DEFAULT);
    assert_eq!(c.run_to_completion().unwrap(), TickOutcome::Completed);
}
