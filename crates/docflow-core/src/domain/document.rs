//! The unit of data passed on every document-carrying socket.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// A piece of content plus metadata flowing through a pipeline
///
/// The `id` is derived from content, blob and metadata, so writing the
/// same source twice with an overwrite policy is idempotent. Components
/// may attach an `embedding` or a `score` without changing the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier (content hash unless assigned explicitly)
    pub id: String,

    /// Text payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Binary payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<Vec<u8>>,

    /// Scalar or date metadata, keyed by name
    #[serde(default)]
    pub meta: Map<String, Value>,

    /// Fixed-length vector attached by an embedder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Rank attached by a retriever or ranker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Document {
    /// Create a text document with metadata
    pub fn new(content: impl Into<String>, meta: Map<String, Value>) -> Self {
        let mut doc = Self {
            id: String::new(),
            content: Some(content.into()),
            blob: None,
            meta,
            embedding: None,
            score: None,
        };
        doc.id = doc.content_hash();
        doc
    }

    /// Create a text document without metadata
    pub fn from_text(content: impl Into<String>) -> Self {
        Self::new(content, Map::new())
    }

    /// Create a binary document with metadata
    pub fn from_blob(blob: Vec<u8>, meta: Map<String, Value>) -> Self {
        let mut doc = Self {
            id: String::new(),
            content: None,
            blob: Some(blob),
            meta,
            embedding: None,
            score: None,
        };
        doc.id = doc.content_hash();
        doc
    }

    /// Replace the derived id with an assigned one
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach an embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Attach a score
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Hex SHA-256 of the canonical JSON of content, blob and metadata
    pub fn content_hash(&self) -> String {
        // serde_json maps are ordered by key, so the encoding is canonical
        let canonical = json!({
            "content": self.content,
            "blob": self.blob,
            "meta": self.meta,
        });
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Look up a metadata value by dotted path, e.g. `"author.name"`
    pub fn meta_value(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.meta.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Serialize to a JSON value
    pub fn to_value(&self) -> Value {
        // Serializing a Document cannot fail: all fields are plain data
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
