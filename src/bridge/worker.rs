use std::any::Any;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{info, trace, warn};

use super::{BridgeMessage, JobId};
use crate::config::BridgeConfig;
use crate::engine::Algorithm;
use crate::error::{ExecutionError, SortraceError, SortraceResult};
use crate::step::Step;

const PATH: &str = "bridge";

pub(crate) enum Job {
    Trace {
        algorithm: Algorithm,
        input: Vec<i64>,
    },

    #[cfg(test)]
    FailAfter { input: Vec<i64>, after: usize },
}

impl Job {
    const fn algorithm(&self) -> Algorithm {
        match self {
            Self::Trace { algorithm, .. } => *algorithm,
            #[cfg(test)]
            Self::FailAfter { .. } => Algorithm::QuickMt,
        }
    }

    fn steps(self) -> Box<dyn Iterator<Item = Step> + Send> {
        match self {
            Self::Trace { algorithm, input } => Box::new(algorithm.trace(&input)),
            #[cfg(test)]
            Self::FailAfter { input, after } => {
                Box::new(Algorithm::Quick.trace(&input).enumerate().map(move |(i, step)| {
                    assert!(i < after, "injected failure at step {i}");
                    step
                }))
            }
        }
    }
}

/// How a producer loop ended.
enum Exit {
    Done { steps: usize },
    Cancelled,
}

/// Handle to one background run.
///
/// Dropping the handle cancels the run.
#[derive(Debug)]
pub struct BackgroundJob {
    id: JobId,
    algorithm: Algorithm,
    rx: Option<Receiver<BridgeMessage>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundJob {
    pub(crate) fn start(job: Job, config: BridgeConfig) -> SortraceResult<Self> {
        let id = JobId::new();
        let algorithm = job.algorithm();
        let (tx, rx) = bounded::<BridgeMessage>(config.max_in_flight);
        let stop = Arc::new(AtomicBool::new(false));

        let worker_stop = Arc::clone(&stop);
        let chunk_size = config.chunk_size;
        let handle = thread::Builder::new()
            .name(format!("sortrace-bridge-{}", algorithm.key()))
            .spawn(move || run(id, job, chunk_size, &tx, &worker_stop))
            .map_err(|e| SortraceError::internal(format!("failed to spawn bridge thread: {e}")))?;

        info!(
            job = %id,
            algorithm = algorithm.key(),
            chunk_size,
            max_in_flight = config.max_in_flight,
            "background job spawned"
        );

        Ok(Self {
            id,
            algorithm,
            rx: Some(rx),
            stop,
            handle: Some(handle),
        })
    }

    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns true once [`BackgroundJob::cancel`] has run.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.rx.is_none()
    }

    /// Messages sent but not yet received; never above `max_in_flight`.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.rx.as_ref().map_or(0, Receiver::len)
    }

    /// Waits for the next message.
    ///
    /// After the terminal message, or after cancellation, this reports
    /// `Disconnected`.
    pub fn recv(&self) -> SortraceResult<BridgeMessage> {
        let rx = self.receiver()?;
        rx.recv().map_err(|_| disconnected())
    }

    /// Waits for the next message with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> SortraceResult<BridgeMessage> {
        let rx = self.receiver()?;
        rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => SortraceError::Execution(ExecutionError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            }),
            RecvTimeoutError::Disconnected => disconnected(),
        })
    }

    /// Stops the run and joins its thread.
    ///
    /// Undelivered batches are discarded. Idempotent.
    pub fn cancel(&mut self) {
        let Some(rx) = self.rx.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);
        // a producer blocked on a full channel wakes up disconnected
        drop(rx);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        info!(job = %self.id, algorithm = self.algorithm.key(), "background job cancelled");
    }

    fn receiver(&self) -> SortraceResult<&Receiver<BridgeMessage>> {
        self.rx.as_ref().ok_or_else(disconnected)
    }
}

impl Drop for BackgroundJob {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn disconnected() -> SortraceError {
    SortraceError::Execution(ExecutionError::Disconnected {
        path: PATH.to_string(),
    })
}

fn run(id: JobId, job: Job, chunk_size: usize, tx: &Sender<BridgeMessage>, stop: &AtomicBool) {
    let produced = panic::catch_unwind(AssertUnwindSafe(|| produce(job, chunk_size, tx, stop)));
    match produced {
        Ok(Exit::Done { steps }) => {
            if tx.send(BridgeMessage::Done).is_ok() {
                info!(job = %id, steps, "background job finished");
            }
        }
        Ok(Exit::Cancelled) => {}
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(job = %id, %message, "background job failed");
            let _ = tx.send(BridgeMessage::Error { message });
        }
    }
}

fn produce(job: Job, chunk_size: usize, tx: &Sender<BridgeMessage>, stop: &AtomicBool) -> Exit {
    let mut batch = Vec::with_capacity(chunk_size);
    let mut steps = 0;
    for step in job.steps() {
        if stop.load(Ordering::Acquire) {
            return Exit::Cancelled;
        }
        batch.push(step);
        steps += 1;
        if batch.len() >= chunk_size && !flush(&mut batch, tx) {
            return Exit::Cancelled;
        }
    }
    if !batch.is_empty() && !flush(&mut batch, tx) {
        return Exit::Cancelled;
    }
    Exit::Done { steps }
}

/// Sends the pending batch; false once the consumer is gone.
fn flush(batch: &mut Vec<Step>, tx: &Sender<BridgeMessage>) -> bool {
    let batch = mem::take(batch);
    trace!(len = batch.len(), "batch sent");
    tx.send(BridgeMessage::Steps { batch }).is_ok()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "background run panicked".to_string()
    }
}
