use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use super::JobReceiver;
use crate::metrics::PipelineMetrics;
use crate::storage::{DocumentId, DocumentStore, SummaryStatus, SummaryUpdate, Transition};
use crate::summarization::{SummarizationEngine, SummaryMode, SummaryOutput};

/// What a single job execution did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The summary was missing or not `pending`; nothing was touched.
    Skipped,
    /// The summary moved to `complete`.
    Completed,
    /// The summary moved to `failed`.
    Failed,
}

/// Runs one summary job: claim, generate, record.
///
/// Only a `pending` summary is ever claimed, and the claim itself is a compare-and-set, so
/// redelivered or duplicated jobs are harmless.
pub struct SummaryJobExecutor {
    store: Arc<dyn DocumentStore>,
    engine: Arc<SummarizationEngine>,
    metrics: Arc<PipelineMetrics>,
    timeout: Duration,
}

impl SummaryJobExecutor {
    /// Create an executor that gives each generation at most `timeout` to finish.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        engine: Arc<SummarizationEngine>,
        metrics: Arc<PipelineMetrics>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            engine,
            metrics,
            timeout,
        }
    }

    /// Execute the job for `document_id`. Never panics and never returns an error; every
    /// failure is either recorded on the summary or logged.
    pub async fn execute(&self, document_id: DocumentId) -> JobOutcome {
        let span = tracing::info_span!("summary_job", document_id = %document_id);
        self.run(document_id).instrument(span).await
    }

    async fn run(&self, document_id: DocumentId) -> JobOutcome {
        match self.store.get_summary(document_id).await {
            Ok(Some(summary)) if summary.status == SummaryStatus::Pending => {}
            Ok(Some(summary)) => {
                tracing::debug!(status = %summary.status, "Summary not pending; skipping job");
                return JobOutcome::Skipped;
            }
            Ok(None) => {
                tracing::debug!("Summary missing; skipping job");
                return JobOutcome::Skipped;
            }
            Err(error) => {
                tracing::warn!(error = %error, "Failed to load summary; skipping job");
                return JobOutcome::Skipped;
            }
        }

        match self
            .store
            .transition(document_id, SummaryStatus::Pending, SummaryUpdate::processing())
            .await
        {
            Ok(Transition::Applied(_)) => {}
            Ok(Transition::Rejected(status)) => {
                tracing::debug!(status = %status, "Summary claimed elsewhere; skipping job");
                return JobOutcome::Skipped;
            }
            Err(error) => {
                tracing::warn!(error = %error, "Failed to claim summary; skipping job");
                return JobOutcome::Skipped;
            }
        }

        let update = match self.generate(document_id).await {
            Ok(output) => SummaryUpdate::complete(output),
            Err(reason) => {
                tracing::warn!(reason = %reason, "Summary generation failed");
                SummaryUpdate::failed(reason)
            }
        };
        let outcome = if update.status == SummaryStatus::Complete {
            JobOutcome::Completed
        } else {
            JobOutcome::Failed
        };

        match self
            .store
            .transition(document_id, SummaryStatus::Processing, update)
            .await
        {
            Ok(Transition::Applied(_)) => {}
            Ok(Transition::Rejected(status)) => {
                tracing::error!(status = %status, "Summary left processing state during generation");
                return JobOutcome::Failed;
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to record summary result");
                return JobOutcome::Failed;
            }
        }

        match outcome {
            JobOutcome::Completed => {
                self.metrics.record_completed();
                tracing::info!("Summary completed");
            }
            _ => self.metrics.record_failed(),
        }
        outcome
    }

    async fn generate(&self, document_id: DocumentId) -> Result<SummaryOutput, String> {
        let document = match self.store.get_document(document_id).await {
            Ok(Some(document)) => document,
            Ok(None) => return Err(format!("Document {document_id} not found")),
            Err(error) => return Err(error.to_string()),
        };

        let generation =
            AssertUnwindSafe(self.engine.summarize(&document.text_content, SummaryMode::Both))
                .catch_unwind();

        match tokio::time::timeout(self.timeout, generation).await {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(error))) => Err(error.to_string()),
            Ok(Err(panic)) => Err(format!(
                "Summarization panicked: {}",
                panic_message(panic.as_ref())
            )),
            Err(_) => Err(format!(
                "Summary generation timed out after {:?}",
                self.timeout
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Drains the job channel, running up to `workers` jobs at once.
pub struct SummaryWorkerPool {
    executor: Arc<SummaryJobExecutor>,
    workers: usize,
}

impl SummaryWorkerPool {
    /// Create a pool; `workers` is clamped to at least one.
    pub fn new(executor: Arc<SummaryJobExecutor>, workers: usize) -> Self {
        Self {
            executor,
            workers: workers.max(1),
        }
    }

    /// Run the pool on a background task.
    pub fn spawn(self, receiver: JobReceiver) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }

    /// Consume jobs until every sender is dropped, then wait for in-flight jobs.
    pub async fn run(self, mut receiver: JobReceiver) {
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        tracing::info!(workers = self.workers, "Summary worker pool started");

        loop {
            tokio::select! {
                Some(result) = tasks.join_next(), if !tasks.is_empty() => log_join(result),
                message = receiver.recv() => {
                    let Some(document_id) = message else { break };
                    let Ok(permit) = permits.clone().acquire_owned().await else { break };
                    let executor = self.executor.clone();
                    tasks.spawn(async move {
                        let _permit = permit;
                        executor.execute(document_id).await
                    });
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            log_join(result);
        }
        tracing::info!("Summary worker pool stopped");
    }
}

fn log_join(result: Result<JobOutcome, JoinError>) {
    if let Err(error) = result {
        tracing::error!(error = %error, "Summary job task aborted");
    }
}
