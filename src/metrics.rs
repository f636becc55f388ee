use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_submitted: AtomicU64,
    summaries_inline: AtomicU64,
    jobs_enqueued: AtomicU64,
    summaries_completed: AtomicU64,
    summaries_failed: AtomicU64,
    retries: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document accepted by the pipeline.
    pub fn record_submission(&self) {
        self.documents_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summary produced on the synchronous path.
    pub fn record_inline(&self) {
        self.summaries_inline.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job handed to the queue.
    pub fn record_enqueued(&self) {
        self.jobs_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summary reaching `complete`.
    pub fn record_completed(&self) {
        self.summaries_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summary reaching `failed`.
    pub fn record_failed(&self) {
        self.summaries_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an accepted retry.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_submitted: self.documents_submitted.load(Ordering::Relaxed),
            summaries_inline: self.summaries_inline.load(Ordering::Relaxed),
            jobs_enqueued: self.jobs_enqueued.load(Ordering::Relaxed),
            summaries_completed: self.summaries_completed.load(Ordering::Relaxed),
            summaries_failed: self.summaries_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents accepted since startup.
    pub documents_submitted: u64,
    /// Summaries generated inline during submission.
    pub summaries_inline: u64,
    /// Jobs handed to the asynchronous queue, retries included.
    pub jobs_enqueued: u64,
    /// Summaries that reached `complete`.
    pub summaries_completed: u64,
    /// Summaries that reached `failed`.
    pub summaries_failed: u64,
    /// Retries accepted from callers.
    pub retries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_pipeline_events() {
        let metrics = PipelineMetrics::new();
        metrics.record_submission();
        metrics.record_submission();
        metrics.record_inline();
        metrics.record_enqueued();
        metrics.record_completed();
        metrics.record_failed();
        metrics.record_retry();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_submitted, 2);
        assert_eq!(snapshot.summaries_inline, 1);
        assert_eq!(snapshot.jobs_enqueued, 1);
        assert_eq!(snapshot.summaries_completed, 1);
        assert_eq!(snapshot.summaries_failed, 1);
        assert_eq!(snapshot.retries, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(PipelineMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
