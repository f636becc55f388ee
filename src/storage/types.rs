//! Document and summary records persisted by the store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::summarization::SummaryOutput;

/// Prefix written into `detailed_notes` when generation fails.
pub const GENERATION_FAILED_PREFIX: &str = "Generation failed: ";

/// Identifier of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One uploaded artifact and its extracted text.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identifier assigned at creation.
    pub id: DocumentId,
    /// Opaque identity of the uploading owner.
    pub owner_id: String,
    /// Filename supplied with the upload.
    pub original_filename: String,
    /// Extracted, trimmed, length-bounded text.
    pub text_content: String,
    /// Creation timestamp (UTC).
    pub created_at: OffsetDateTime,
}

impl Document {
    /// Build a new document record stamped with the current time.
    pub fn new(
        owner_id: impl Into<String>,
        original_filename: impl Into<String>,
        text_content: String,
    ) -> Self {
        Self {
            id: DocumentId::new(),
            owner_id: owner_id.into(),
            original_filename: original_filename.into(),
            text_content,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Character length of the extracted text.
    pub fn text_len(&self) -> usize {
        self.text_content.chars().count()
    }
}

/// Processing state of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    /// Waiting for a worker.
    Pending,
    /// Claimed by a worker; generation in flight.
    Processing,
    /// Both halves generated.
    Complete,
    /// Generation failed; retry is allowed.
    Failed,
}

impl SummaryStatus {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Pending => "pending",
            SummaryStatus::Processing => "processing",
            SummaryStatus::Complete => "complete",
            SummaryStatus::Failed => "failed",
        }
    }

    /// `complete` and `failed` are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SummaryStatus::Complete | SummaryStatus::Failed)
    }
}

impl FromStr for SummaryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SummaryStatus::Pending),
            "processing" => Ok(SummaryStatus::Processing),
            "complete" => Ok(SummaryStatus::Complete),
            "failed" => Ok(SummaryStatus::Failed),
            _ => Err(format!("Invalid summary status: {}", s)),
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The processing record for exactly one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Owning document.
    pub document_id: DocumentId,
    /// Brief overview; empty unless `complete`.
    pub short_summary: String,
    /// Bullet notes when `complete`; failure description when `failed`.
    pub detailed_notes: String,
    /// Current state.
    pub status: SummaryStatus,
    /// Failure reason, kept apart from `detailed_notes`.
    pub error_message: Option<String>,
    /// Creation timestamp (UTC).
    pub created_at: OffsetDateTime,
    /// Timestamp of the last transition (UTC).
    pub updated_at: OffsetDateTime,
}

impl Summary {
    /// Build a summary record from its initial state.
    pub fn new(document_id: DocumentId, update: SummaryUpdate) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            document_id,
            short_summary: update.short_summary,
            detailed_notes: update.detailed_notes,
            status: update.status,
            error_message: update.error_message,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn apply(&mut self, update: SummaryUpdate) {
        self.status = update.status;
        self.short_summary = update.short_summary;
        self.detailed_notes = update.detailed_notes;
        self.error_message = update.error_message;
        self.updated_at = OffsetDateTime::now_utc();
    }
}

/// Full replacement of a summary's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryUpdate {
    /// New status.
    pub status: SummaryStatus,
    /// New short summary.
    pub short_summary: String,
    /// New detailed notes.
    pub detailed_notes: String,
    /// New failure reason.
    pub error_message: Option<String>,
}

impl SummaryUpdate {
    /// Empty `pending` state, used for new async summaries and retries.
    pub fn pending() -> Self {
        Self::empty(SummaryStatus::Pending)
    }

    /// Empty `processing` state, written when a worker claims the job.
    pub fn processing() -> Self {
        Self::empty(SummaryStatus::Processing)
    }

    /// `complete` state carrying the generated text.
    pub fn complete(output: SummaryOutput) -> Self {
        Self {
            status: SummaryStatus::Complete,
            short_summary: output.short_summary,
            detailed_notes: output.detailed_notes,
            error_message: None,
        }
    }

    /// `failed` state; the reason is recorded in both `detailed_notes` and `error_message`.
    pub fn failed(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            status: SummaryStatus::Failed,
            short_summary: String::new(),
            detailed_notes: format!("{GENERATION_FAILED_PREFIX}{reason}"),
            error_message: Some(reason),
        }
    }

    fn empty(status: SummaryStatus) -> Self {
        Self {
            status,
            short_summary: String::new(),
            detailed_notes: String::new(),
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_wire_names() {
        for status in [
            SummaryStatus::Pending,
            SummaryStatus::Processing,
            SummaryStatus::Complete,
            SummaryStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<SummaryStatus>(), Ok(status));
        }
        assert!("done".parse::<SummaryStatus>().is_err());
    }

    #[test]
    fn only_complete_and_failed_are_terminal() {
        assert!(SummaryStatus::Complete.is_terminal());
        assert!(SummaryStatus::Failed.is_terminal());
        assert!(!SummaryStatus::Pending.is_terminal());
        assert!(!SummaryStatus::Processing.is_terminal());
    }

    #[test]
    fn failed_update_annotates_notes_and_error() {
        let update = SummaryUpdate::failed("model offline");
        assert_eq!(update.short_summary, "");
        assert_eq!(update.detailed_notes, "Generation failed: model offline");
        assert_eq!(update.error_message.as_deref(), Some("model offline"));
    }

    #[test]
    fn document_length_counts_characters() {
        let document = Document::new("owner", "a.txt", "ünï".to_string());
        assert_eq!(document.text_len(), 3);
    }

    #[test]
    fn document_id_parses_its_display_form() {
        let id = DocumentId::new();
        assert_eq!(id.to_string().parse::<DocumentId>().expect("uuid"), id);
        assert!("not-a-uuid".parse::<DocumentId>().is_err());
    }
}
