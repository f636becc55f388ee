use serde::Serialize;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::storage::{Document, StoreError, Summary, SummaryStatus};
use crate::summarization::SummarizationError;

/// Errors surfaced by pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upload could not be turned into text; nothing was persisted.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// The document or its summary does not exist for this owner.
    #[error("Summary not found")]
    NotFound,
    /// The requested transition is not allowed from the summary's current status.
    #[error("Summary status is {status}; only failed summaries can be retried")]
    InvalidState {
        /// Status observed when the request was rejected.
        status: SummaryStatus,
    },
    /// Direct summarization failed.
    #[error(transparent)]
    Summarization(#[from] SummarizationError),
    /// The store rejected an operation.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Result of accepting an upload.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The persisted document.
    pub document: Document,
    /// Its summary, either terminal (sync path) or `pending` (async path).
    pub summary: Summary,
}

/// Guidance shown to callers polling a non-complete summary.
pub fn status_message(status: SummaryStatus) -> Option<&'static str> {
    match status {
        SummaryStatus::Pending => Some("Summary generation queued. Please check back shortly."),
        SummaryStatus::Processing => {
            Some("Summary is being generated. Please check back in a moment.")
        }
        SummaryStatus::Failed => Some("Summary generation failed. You can retry the request."),
        SummaryStatus::Complete => None,
    }
}

/// Summary record plus the caller-facing status message.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    /// Owning document.
    pub document_id: String,
    /// Current status.
    pub status: SummaryStatus,
    /// Brief overview; empty unless complete.
    pub short_summary: String,
    /// Bullet notes, or the failure description.
    pub detailed_notes: String,
    /// Failure reason when `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Guidance for non-complete states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last transition.
    pub updated_at: String,
}

impl From<Summary> for StatusView {
    fn from(summary: Summary) -> Self {
        Self {
            document_id: summary.document_id.to_string(),
            status: summary.status,
            message: status_message(summary.status),
            short_summary: summary.short_summary,
            detailed_notes: summary.detailed_notes,
            error_message: summary.error_message,
            created_at: rfc3339(summary.created_at),
            updated_at: rfc3339(summary.updated_at),
        }
    }
}

pub(crate) fn rfc3339(timestamp: time::OffsetDateTime) -> String {
    timestamp
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DocumentId, SummaryUpdate};

    #[test]
    fn complete_summaries_carry_no_message() {
        let view = StatusView::from(Summary::new(
            DocumentId::new(),
            SummaryUpdate::complete(Default::default()),
        ));
        assert_eq!(view.status, SummaryStatus::Complete);
        assert_eq!(view.message, None);
    }

    #[test]
    fn non_complete_states_explain_themselves() {
        assert_eq!(
            status_message(SummaryStatus::Pending),
            Some("Summary generation queued. Please check back shortly.")
        );
        assert_eq!(
            status_message(SummaryStatus::Processing),
            Some("Summary is being generated. Please check back in a moment.")
        );
        assert_eq!(
            status_message(SummaryStatus::Failed),
            Some("Summary generation failed. You can retry the request.")
        );
    }

    #[test]
    fn view_serializes_lowercase_status() {
        let view = StatusView::from(Summary::new(
            DocumentId::new(),
            SummaryUpdate::failed("boom"),
        ));
        let json = serde_json::to_value(&view).expect("json");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_message"], "boom");
        assert_eq!(json["detailed_notes"], "Generation failed: boom");
    }
}
