//! In-memory document store
//!
//! This implementation is primarily intended for testing and development purposes.

use docflow_core::{ComponentError, Document};
use docflow_filter::{filter_documents, FilterError, FilterPredicate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// What to do when a written document's id is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Replace the stored copy in place
    Overwrite,
    /// Keep the stored copy
    Skip,
    /// Reject the whole batch
    #[default]
    Fail,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::Overwrite => write!(f, "overwrite"),
            DuplicatePolicy::Skip => write!(f, "skip"),
            DuplicatePolicy::Fail => write!(f, "fail"),
        }
    }
}

/// Errors raised by the document store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// A document id is already present and the policy is `fail`
    #[error("Document '{0}' already exists")]
    DuplicateDocument(String),

    /// The filter could not be evaluated
    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl From<DocumentStoreError> for ComponentError {
    fn from(err: DocumentStoreError) -> Self {
        match err {
            DocumentStoreError::Filter(err) => err.into(),
            other => ComponentError::StoreError(other.to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct Documents {
    ordered: Vec<Document>,
    positions: HashMap<String, usize>,
}

/// Documents kept in memory, in insertion order
///
/// Clones share the same underlying storage, so a writer and a retriever
/// built from clones of one store see each other's documents.
/// All data is lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<Documents>>,
}

impl InMemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Write documents, returning how many were added or replaced
    ///
    /// With [`DuplicatePolicy::Fail`] nothing is written when any id clashes,
    /// including clashes inside the batch itself.
    pub async fn write_documents(
        &self,
        documents: Vec<Document>,
        policy: DuplicatePolicy,
    ) -> Result<usize, DocumentStoreError> {
        let mut store = self.documents.write().await;

        if policy == DuplicatePolicy::Fail {
            let mut seen = HashSet::new();
            for document in &documents {
                if store.positions.contains_key(&document.id) || !seen.insert(document.id.as_str()) {
                    return Err(DocumentStoreError::DuplicateDocument(document.id.clone()));
                }
            }
        }

        let mut written = 0;
        for document in documents {
            match store.positions.get(&document.id).copied() {
                Some(position) => {
                    if policy == DuplicatePolicy::Overwrite {
                        store.ordered[position] = document;
                        written += 1;
                    }
                }
                None => {
                    let position = store.ordered.len();
                    store.positions.insert(document.id.clone(), position);
                    store.ordered.push(document);
                    written += 1;
                }
            }
        }

        debug!(written, %policy, total = store.ordered.len(), "Wrote documents");
        Ok(written)
    }

    /// Documents matching `filter` (all documents when `None`), in insertion order
    pub async fn filter_documents(
        &self,
        filter: Option<&FilterPredicate>,
    ) -> Result<Vec<Document>, DocumentStoreError> {
        let store = self.documents.read().await;
        let documents = store.ordered.iter().cloned();
        match filter {
            Some(predicate) => Ok(filter_documents(documents, predicate)?),
            None => Ok(documents.collect()),
        }
    }

    /// Number of stored documents
    pub async fn count(&self) -> usize {
        self.documents.read().await.ordered.len()
    }

    /// Remove documents by id, returning how many existed
    pub async fn delete_documents(&self, ids: &[String]) -> usize {
        let mut store = self.documents.write().await;
        let before = store.ordered.len();
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        store.ordered.retain(|document| !doomed.contains(document.id.as_str()));
        let positions = store
            .ordered
            .iter()
            .enumerate()
            .map(|(position, document)| (document.id.clone(), position))
            .collect();
        store.positions = positions;
        before - store.ordered.len()
    }
}
