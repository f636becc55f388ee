//! Background summary jobs: the queue contract, its channel-backed implementation, and the
//! worker pool that drains it.

mod worker;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::storage::DocumentId;

pub use worker::{JobOutcome, SummaryJobExecutor, SummaryWorkerPool};

/// Errors raised when handing a job to the queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// No consumer is listening anymore.
    #[error("Job queue is closed")]
    Closed,
}

/// Fire-and-forget queue of summary jobs keyed by document.
pub trait JobQueue: Send + Sync {
    /// Schedule a summary job for `document_id`. Returns as soon as the job is accepted.
    fn enqueue(&self, document_id: DocumentId) -> Result<(), QueueError>;
}

/// Receiving half of a [`ChannelJobQueue`], consumed by [`SummaryWorkerPool`].
pub type JobReceiver = mpsc::UnboundedReceiver<DocumentId>;

/// In-process queue backed by an unbounded tokio channel.
#[derive(Clone)]
pub struct ChannelJobQueue {
    sender: mpsc::UnboundedSender<DocumentId>,
}

impl ChannelJobQueue {
    /// Create a queue and the receiver its worker pool should drain.
    pub fn new() -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl JobQueue for ChannelJobQueue {
    fn enqueue(&self, document_id: DocumentId) -> Result<(), QueueError> {
        self.sender
            .send(document_id)
            .map_err(|_| QueueError::Closed)?;
        tracing::debug!(document_id = %document_id, "Summary job enqueued");
        Ok(())
    }
}
