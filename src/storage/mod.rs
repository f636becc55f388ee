//! Persistence contract for documents and their summaries.
//!
//! The store enforces the one-summary-per-document constraint and performs every status change
//! as a compare-and-set, so concurrent retries and duplicate job deliveries cannot both win.

mod memory;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryStore;
pub use types::{
    Document, DocumentId, GENERATION_FAILED_PREFIX, Summary, SummaryStatus, SummaryUpdate,
};

/// Errors raised by [`DocumentStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A summary already exists for the document.
    #[error("Summary already exists for document {0}")]
    DuplicateSummary(DocumentId),
    /// A document with this identifier already exists.
    #[error("Document {0} already exists")]
    DuplicateDocument(DocumentId),
    /// The referenced document does not exist.
    #[error("Document {0} not found")]
    DocumentNotFound(DocumentId),
    /// No summary exists for the referenced document.
    #[error("Summary for document {0} not found")]
    SummaryNotFound(DocumentId),
}

/// Result of a compare-and-set status transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The expected status matched; the update was written.
    Applied(Summary),
    /// The summary was in a different status; nothing changed.
    Rejected(SummaryStatus),
}

impl Transition {
    /// Whether the update was written.
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }
}

/// Storage backend for documents and summaries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document.
    async fn insert_document(&self, document: Document) -> Result<(), StoreError>;

    /// Fetch a document by identifier.
    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>, StoreError>;

    /// List an owner's documents, newest first.
    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>, StoreError>;

    /// Delete a document and its summary. Returns whether the document existed.
    async fn delete_document(&self, id: DocumentId) -> Result<bool, StoreError>;

    /// Persist the summary for a document, rejecting a second summary for the same document.
    async fn insert_summary(&self, summary: Summary) -> Result<(), StoreError>;

    /// Fetch the summary of a document.
    async fn get_summary(&self, document_id: DocumentId) -> Result<Option<Summary>, StoreError>;

    /// Apply `update` only if the summary is currently in `expected` status.
    async fn transition(
        &self,
        document_id: DocumentId,
        expected: SummaryStatus,
        update: SummaryUpdate,
    ) -> Result<Transition, StoreError>;
}
