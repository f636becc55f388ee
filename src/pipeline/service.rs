use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;

use super::types::{PipelineError, StatusView, Submission};
use crate::config::Config;
use crate::extraction::{ExtractionError, Extractor};
use crate::jobs::JobQueue;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::storage::{
    Document, DocumentId, DocumentStore, StoreError, Summary, SummaryStatus, SummaryUpdate,
    Transition,
};
use crate::summarization::{SummarizationEngine, SummaryMode, SummaryOutput};

/// Operations exposed to the HTTP layer. Abstracted so routers can be tested with stubs.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Extract, persist, and summarize an upload.
    async fn submit_upload(
        &self,
        owner_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Submission, PipelineError>;

    /// Current summary state for an owner's document.
    async fn retrieve_status(
        &self,
        document_id: DocumentId,
        owner_id: &str,
    ) -> Result<StatusView, PipelineError>;

    /// Re-queue a failed summary.
    async fn retry(
        &self,
        document_id: DocumentId,
        owner_id: &str,
    ) -> Result<Summary, PipelineError>;

    /// An owner's documents, newest first.
    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>, PipelineError>;

    /// Remove an owner's document and its summary.
    async fn delete_document(
        &self,
        document_id: DocumentId,
        owner_id: &str,
    ) -> Result<(), PipelineError>;

    /// Summarize raw text without persisting anything.
    async fn summarize_text(
        &self,
        text: &str,
        mode: SummaryMode,
    ) -> Result<SummaryOutput, PipelineError>;

    /// Current pipeline counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Largest upload body the pipeline accepts, in bytes.
    fn max_upload_bytes(&self) -> usize;
}

/// Orchestrates extraction, persistence, and sync/async summary generation.
pub struct SummaryPipeline {
    store: Arc<dyn DocumentStore>,
    engine: Arc<SummarizationEngine>,
    queue: Arc<dyn JobQueue>,
    extractor: Extractor,
    auto_summary_max_chars: usize,
    metrics: Arc<PipelineMetrics>,
}

impl SummaryPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        engine: Arc<SummarizationEngine>,
        queue: Arc<dyn JobQueue>,
        extractor: Extractor,
        auto_summary_max_chars: usize,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            store,
            engine,
            queue,
            extractor,
            auto_summary_max_chars,
            metrics,
        }
    }

    /// Assemble a pipeline using limits and thresholds from `config`.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        engine: Arc<SummarizationEngine>,
        queue: Arc<dyn JobQueue>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self::new(
            store,
            engine,
            queue,
            Extractor::new(config.extraction_limits()),
            config.auto_summary_max_chars,
            metrics,
        )
    }

    /// Extract text from an upload, persist the document, then summarize it.
    ///
    /// Extraction runs on the blocking pool; nothing is persisted when it fails.
    pub async fn submit_upload(
        &self,
        owner_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Submission, PipelineError> {
        let extractor = self.extractor;
        let name = filename.to_string();
        let text = tokio::task::spawn_blocking(move || {
            let size_bytes = bytes.len() as u64;
            extractor.extract(&bytes, &name, size_bytes)
        })
        .await
        .map_err(|error| {
            ExtractionError::CorruptDocument(format!("extraction aborted: {error}"))
        })??;

        let document = Document::new(owner_id, filename, text);
        self.store.insert_document(document.clone()).await?;
        self.metrics.record_submission();
        tracing::info!(
            document_id = %document.id,
            filename,
            chars = document.text_len(),
            "Document stored"
        );

        let summary = self.submit(&document).await?;
        Ok(Submission { document, summary })
    }

    /// Create the document's summary, inline when the text is short enough, otherwise queued.
    ///
    /// Generation failures on the inline path are recorded on the summary, never returned.
    pub async fn submit(&self, document: &Document) -> Result<Summary, PipelineError> {
        let length = document.text_len();
        if length <= self.auto_summary_max_chars {
            let summary = Summary::new(document.id, self.summarize_inline(document).await);
            self.store.insert_summary(summary.clone()).await?;
            self.metrics.record_inline();
            match summary.status {
                SummaryStatus::Complete => self.metrics.record_completed(),
                _ => self.metrics.record_failed(),
            }
            tracing::info!(
                document_id = %document.id,
                status = %summary.status,
                chars = length,
                "Summary generated inline"
            );
            return Ok(summary);
        }

        let summary = Summary::new(document.id, SummaryUpdate::pending());
        self.store.insert_summary(summary.clone()).await?;
        tracing::info!(
            document_id = %document.id,
            chars = length,
            threshold = self.auto_summary_max_chars,
            "Summary deferred to background job"
        );
        self.dispatch(summary).await
    }

    async fn summarize_inline(&self, document: &Document) -> SummaryUpdate {
        let generation =
            AssertUnwindSafe(self.engine.summarize(&document.text_content, SummaryMode::Both))
                .catch_unwind()
                .await;
        match generation {
            Ok(Ok(output)) => SummaryUpdate::complete(output),
            Ok(Err(error)) => {
                tracing::warn!(document_id = %document.id, error = %error, "Inline summary failed");
                SummaryUpdate::failed(error.to_string())
            }
            Err(_) => {
                tracing::error!(document_id = %document.id, "Inline summary panicked");
                SummaryUpdate::failed("Summarization panicked")
            }
        }
    }

    /// Enqueue a job for a `pending` summary. A closed queue moves it to `failed`.
    async fn dispatch(&self, summary: Summary) -> Result<Summary, PipelineError> {
        let document_id = summary.document_id;
        let error = match self.queue.enqueue(document_id) {
            Ok(()) => {
                self.metrics.record_enqueued();
                return Ok(summary);
            }
            Err(error) => error,
        };

        tracing::error!(document_id = %document_id, error = %error, "Failed to enqueue summary job");
        let update = SummaryUpdate::failed(format!("Failed to enqueue summary job: {error}"));
        match self
            .store
            .transition(document_id, SummaryStatus::Pending, update)
            .await?
        {
            Transition::Applied(failed) => {
                self.metrics.record_failed();
                Ok(failed)
            }
            Transition::Rejected(_) => self
                .store
                .get_summary(document_id)
                .await?
                .ok_or(PipelineError::NotFound),
        }
    }

    async fn owned_document(
        &self,
        document_id: DocumentId,
        owner_id: &str,
    ) -> Result<Document, PipelineError> {
        self.store
            .get_document(document_id)
            .await?
            .filter(|document| document.owner_id == owner_id)
            .ok_or(PipelineError::NotFound)
    }

    /// Summary state plus a caller-facing message for non-complete states.
    pub async fn retrieve_status(
        &self,
        document_id: DocumentId,
        owner_id: &str,
    ) -> Result<StatusView, PipelineError> {
        self.owned_document(document_id, owner_id).await?;
        let summary = self
            .store
            .get_summary(document_id)
            .await?
            .ok_or(PipelineError::NotFound)?;
        Ok(StatusView::from(summary))
    }

    /// Move a `failed` summary back to `pending` and enqueue exactly one job for it.
    pub async fn retry(
        &self,
        document_id: DocumentId,
        owner_id: &str,
    ) -> Result<Summary, PipelineError> {
        self.owned_document(document_id, owner_id).await?;
        let transition = self
            .store
            .transition(document_id, SummaryStatus::Failed, SummaryUpdate::pending())
            .await
            .map_err(|error| match error {
                StoreError::SummaryNotFound(_) => PipelineError::NotFound,
                other => PipelineError::Storage(other),
            })?;

        match transition {
            Transition::Applied(summary) => {
                self.metrics.record_retry();
                tracing::info!(document_id = %document_id, "Summary retry accepted");
                self.dispatch(summary).await
            }
            Transition::Rejected(status) => {
                tracing::debug!(document_id = %document_id, status = %status, "Retry rejected");
                Err(PipelineError::InvalidState { status })
            }
        }
    }

    /// An owner's documents, newest first.
    pub async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>, PipelineError> {
        Ok(self.store.list_documents(owner_id).await?)
    }

    /// Remove an owner's document and its summary.
    pub async fn delete_document(
        &self,
        document_id: DocumentId,
        owner_id: &str,
    ) -> Result<(), PipelineError> {
        self.owned_document(document_id, owner_id).await?;
        if !self.store.delete_document(document_id).await? {
            return Err(PipelineError::NotFound);
        }
        tracing::info!(document_id = %document_id, "Document deleted");
        Ok(())
    }

    /// Summarize raw text in the requested mode without persisting anything.
    pub async fn summarize_text(
        &self,
        text: &str,
        mode: SummaryMode,
    ) -> Result<SummaryOutput, PipelineError> {
        Ok(self.engine.summarize(text, mode).await?)
    }

    /// Current pipeline counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl PipelineApi for SummaryPipeline {
    async fn submit_upload(
        &self,
        owner_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Submission, PipelineError> {
        SummaryPipeline::submit_upload(self, owner_id, filename, bytes).await
    }

    async fn retrieve_status(
        &self,
        document_id: DocumentId,
        owner_id: &str,
    ) -> Result<StatusView, PipelineError> {
        SummaryPipeline::retrieve_status(self, document_id, owner_id).await
    }

    async fn retry(
        &self,
        document_id: DocumentId,
        owner_id: &str,
    ) -> Result<Summary, PipelineError> {
        SummaryPipeline::retry(self, document_id, owner_id).await
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>, PipelineError> {
        SummaryPipeline::list_documents(self, owner_id).await
    }

    async fn delete_document(
        &self,
        document_id: DocumentId,
        owner_id: &str,
    ) -> Result<(), PipelineError> {
        SummaryPipeline::delete_document(self, document_id, owner_id).await
    }

    async fn summarize_text(
        &self,
        text: &str,
        mode: SummaryMode,
    ) -> Result<SummaryOutput, PipelineError> {
        SummaryPipeline::summarize_text(self, text, mode).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummaryPipeline::metrics_snapshot(self)
    }

    fn max_upload_bytes(&self) -> usize {
        let limit_mb = self.extractor.limits().max_document_size_mb;
        usize::try_from(limit_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}
