use std::time::Duration;

use sortrace::{
    Algorithm, BackgroundBridge, BridgeConfig, BridgeMessage, ConfigurationError, ExecutionError, SortraceError,
    Step, StepSource,
};

const WAIT: Duration = Duration::from_secs(5);

fn bridge(chunk_size: usize, max_in_flight: usize) -> BackgroundBridge {
    BackgroundBridge::new(BridgeConfig {
        chunk_size,
        max_in_flight,
    })
}

#[test]
fn concatenated_batches_match_synchronous_trace_for_many_chunk_sizes() {
    let input: Vec<i64> = (0..90).map(|i| (i * 47) % 61 - 30).collect();
    let expected: Vec<Step> = Algorithm::QuickMt.trace(&input).collect();

    for chunk_size in [1, 2, 7, 96, 10_000] {
        let job = bridge(chunk_size, 3).spawn(Algorithm::QuickMt, &input).unwrap();
        let mut received = Vec::new();
        let mut terminals = 0;
        loop {
            match job.recv_timeout(WAIT).unwrap() {
                BridgeMessage::Steps { batch } => {
                    assert!(!batch.is_empty() && batch.len() <= chunk_size);
                    received.extend(batch);
                }
                BridgeMessage::Done => {
                    terminals += 1;
                    break;
                }
                BridgeMessage::Error { message } => panic!("unexpected error: {message}"),
            }
        }
        assert_eq!(terminals, 1);
        assert_eq!(received, expected, "chunk size {chunk_size}");
        // the channel closes after the terminal message
        assert!(job.recv_timeout(WAIT).is_err());
    }
}

#[test]
fn ineligible_algorithms_are_refused() {
    for algorithm in Algorithm::ALL.into_iter().filter(|a| !a.info().background_eligible) {
        let err = bridge(8, 1).spawn(algorithm, &[2, 1]).unwrap_err();
        assert!(matches!(
            err,
            SortraceError::Configuration(ConfigurationError::NotBackgroundEligible { .. })
        ));
    }
}

#[test]
fn backpressure_bounds_undelivered_batches() {
    let input: Vec<i64> = (0..300).rev().collect();
    let mut stream = bridge(4, 2).stream(Algorithm::QuickMt, &input).unwrap();
    let first = stream.pull().unwrap();
    assert!(first.is_some());
    // give the producer time to fill the channel
    std::thread::sleep(Duration::from_millis(50));
    // one batch unpacked locally, at most two queued behind it
    assert_eq!(stream.buffered(), 3);
    assert!(stream.queued() <= 2);
    stream.cancel();
}

#[test]
fn cancelled_job_delivers_nothing_more() {
    let input: Vec<i64> = (0..500).rev().collect();
    let mut job = bridge(2, 1).spawn(Algorithm::QuickMt, &input).unwrap();
    let BridgeMessage::Steps { batch } = job.recv_timeout(WAIT).unwrap() else {
        panic!("expected a batch first");
    };
    assert_eq!(batch.len(), 2);

    job.cancel();
    let err = job.recv_timeout(Duration::from_millis(10)).unwrap_err();
    assert!(matches!(
        err,
        SortraceError::Execution(ExecutionError::Disconnected { .. })
    ));
}

#[test]
fn zero_sizes_are_normalized() {
    let bridge = bridge(0, 0);
    assert_eq!(bridge.config().chunk_size, 96);
    assert_eq!(bridge.config().max_in_flight, 1);
}

#[test]
fn dropping_a_blocked_job_does_not_hang() {
    let input: Vec<i64> = (0..1_000).rev().collect();
    let job = bridge(1, 1).spawn(Algorithm::QuickMt, &input).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    drop(job);
}
