use std::collections::VecDeque;

use tracing::trace;

use super::{BackgroundJob, BridgeMessage, JobId};
use crate::error::{ExecutionError, SortraceError, SortraceResult};
use crate::playback::StepSource;
use crate::step::Step;

/// A background job read one step at a time.
///
/// Batches are unpacked in arrival order. `Done` ends the stream; `Error`
/// surfaces once as [`ExecutionError::Worker`] and also ends it. Dropping the
/// stream cancels the job.
#[derive(Debug)]
pub struct BackgroundStream {
    job: BackgroundJob,
    buffered: VecDeque<Step>,
    finished: bool,
}

impl BackgroundStream {
    #[must_use]
    pub fn new(job: BackgroundJob) -> Self {
        Self {
            job,
            buffered: VecDeque::new(),
            finished: false,
        }
    }

    /// The job backing this stream.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job.id()
    }

    /// Steps received but not yet pulled.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffered.len()
    }

    /// Batches waiting in the channel.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.job.queued()
    }

    /// Cancels the job and discards buffered steps.
    pub fn cancel(&mut self) {
        self.job.cancel();
        self.buffered.clear();
        self.finished = true;
    }
}

impl StepSource for BackgroundStream {
    fn pull(&mut self) -> SortraceResult<Option<Step>> {
        loop {
            if let Some(step) = self.buffered.pop_front() {
                return Ok(Some(step));
            }
            if self.finished {
                return Ok(None);
            }
            match self.job.recv() {
                Ok(BridgeMessage::Steps { batch }) => {
                    trace!(job = %self.job.id(), len = batch.len(), "batch received");
                    self.buffered.extend(batch);
                }
                Ok(BridgeMessage::Done) => {
                    self.finished = true;
                }
                Ok(BridgeMessage::Error { message }) => {
                    self.finished = true;
                    return Err(SortraceError::Execution(ExecutionError::Worker { message }));
                }
                Err(err) => {
                    self.finished = true;
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BackgroundBridge;
    use crate::config::BridgeConfig;
    use crate::engine::Algorithm;

    fn drain(stream: &mut BackgroundStream) -> SortraceResult<Vec<Step>> {
        let mut steps = Vec::new();
        while let Some(step) = stream.pull()? {
            steps.push(step);
        }
        Ok(steps)
    }

    #[test]
    fn stream_yields_synchronous_sequence() {
        let input = [5_i64, 9, 1, 4, 4, 8, 0, 2];
        let bridge = BackgroundBridge::new(BridgeConfig {
            chunk_size: 3,
            max_in_flight: 1,
        });
        let mut stream = bridge.stream(Algorithm::QuickMt, &input).unwrap();
        let steps = drain(&mut stream).unwrap();
        let expected: Vec<Step> = Algorithm::Quick.trace(&input).collect();
        assert_eq!(steps, expected);
        // exhausted streams stay exhausted
        assert!(stream.pull().unwrap().is_none());
    }

    #[test]
    fn worker_error_surfaces_once() {
        let input: Vec<i64> = (0..32).rev().collect();
        let bridge = BackgroundBridge::new(BridgeConfig {
            chunk_size: 2,
            max_in_flight: 4,
        });
        let mut stream = BackgroundStream::new(bridge.spawn_failing(&input, 5).unwrap());
        let err = drain(&mut stream).unwrap_err();
        assert!(matches!(
            err,
            SortraceError::Execution(ExecutionError::Worker { ref message }) if message.contains("injected")
        ));
        assert!(stream.pull().unwrap().is_none());
    }

    #[test]
    fn cancel_discards_buffered_steps() {
        let input: Vec<i64> = (0..200).rev().collect();
        let bridge = BackgroundBridge::new(BridgeConfig {
            chunk_size: 16,
            max_in_flight: 1,
        });
        let mut stream = bridge.stream(Algorithm::QuickMt, &input).unwrap();
        assert!(stream.pull().unwrap().is_some());
        assert_eq!(stream.buffered(), 15);
        stream.cancel();
        assert_eq!(stream.buffered(), 0);
        assert!(stream.pull().unwrap().is_none());
    }
}
