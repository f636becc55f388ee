use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    Document, DocumentId, DocumentStore, StoreError, Summary, SummaryStatus, SummaryUpdate,
    Transition,
};

#[derive(Default)]
struct StoreState {
    documents: HashMap<DocumentId, Document>,
    summaries: HashMap<DocumentId, Summary>,
}

/// Process-local store guarded by a single `RwLock`.
///
/// Uniqueness checks and compare-and-set transitions run under the write lock, so they are
/// atomic with respect to every other writer.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert_document(&self, document: Document) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state.documents.entry(document.id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateDocument(document.id)),
            Entry::Vacant(slot) => {
                slot.insert(document);
                Ok(())
            }
        }
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.state.read().await.documents.get(&id).cloned())
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>, StoreError> {
        let state = self.state.read().await;
        let mut documents: Vec<Document> = state
            .documents
            .values()
            .filter(|document| document.owner_id == owner_id)
            .cloned()
            .collect();
        documents.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(documents)
    }

    async fn delete_document(&self, id: DocumentId) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        state.summaries.remove(&id);
        Ok(state.documents.remove(&id).is_some())
    }

    async fn insert_summary(&self, summary: Summary) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let document_id = summary.document_id;
        if !state.documents.contains_key(&document_id) {
            return Err(StoreError::DocumentNotFound(document_id));
        }
        match state.summaries.entry(document_id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateSummary(document_id)),
            Entry::Vacant(slot) => {
                slot.insert(summary);
                Ok(())
            }
        }
    }

    async fn get_summary(&self, document_id: DocumentId) -> Result<Option<Summary>, StoreError> {
        Ok(self.state.read().await.summaries.get(&document_id).cloned())
    }

    async fn transition(
        &self,
        document_id: DocumentId,
        expected: SummaryStatus,
        update: SummaryUpdate,
    ) -> Result<Transition, StoreError> {
        let mut state = self.state.write().await;
        let summary = state
            .summaries
            .get_mut(&document_id)
            .ok_or(StoreError::SummaryNotFound(document_id))?;

        if summary.status != expected {
            return Ok(Transition::Rejected(summary.status));
        }

        summary.apply(update);
        Ok(Transition::Applied(summary.clone()))
    }
}
