use crate::common::error::PipelineError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Caps concurrent transcodes at `workers`, lets up to `queue_depth`
/// further callers wait, and turns everyone else away.
#[derive(Clone, Debug)]
pub struct TranscodePool {
    slots: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
    workers: usize,
    queue_depth: usize,
}

/// Holding this is the right to run one transcode.
#[derive(Debug)]
pub struct TranscodeSlot {
    _permit: OwnedSemaphorePermit,
}

struct WaitGuard(Arc<AtomicUsize>);

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl TranscodePool {
    pub fn new(workers: usize, queue_depth: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(workers)),
            waiting: Arc::new(AtomicUsize::new(0)),
            workers,
            queue_depth,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }

    pub async fn acquire(&self) -> Result<TranscodeSlot, PipelineError> {
        if let Ok(permit) = self.slots.clone().try_acquire_owned() {
            return Ok(TranscodeSlot { _permit: permit });
        }

        let queued = self.waiting.fetch_add(1, Ordering::AcqRel);
        let _guard = WaitGuard(self.waiting.clone());
        if queued >= self.queue_depth {
            warn!(
                workers = self.workers,
                queue_depth = self.queue_depth,
                "Transcode pool saturated, rejecting job"
            );
            return Err(PipelineError::Busy);
        }

        debug!(position = queued + 1, "Waiting for a transcode slot");
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Busy)?;

        Ok(TranscodeSlot { _permit: permit })
    }
}
