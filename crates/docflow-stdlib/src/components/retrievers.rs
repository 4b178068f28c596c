use crate::store::InMemoryDocumentStore;
use async_trait::async_trait;
use docflow_core::{
    Component, ComponentBase, ComponentError, DataPacket, Document, InputSocket, SocketSchema,
    SocketType, SocketValues,
};
use docflow_filter::FilterPredicate;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Default number of documents returned
pub const DEFAULT_TOP_K: usize = 10;

/// Keyword retriever over an [`InMemoryDocumentStore`]
///
/// A document scores the fraction of distinct query terms its content
/// contains. Documents sharing no term with the query are not returned.
/// Filters given at run time replace the configured ones.
#[derive(Debug, Clone)]
pub struct InMemoryRetriever {
    store: InMemoryDocumentStore,
    top_k: usize,
    filters: Option<FilterPredicate>,
}

impl InMemoryRetriever {
    /// Create a retriever for `store`
    pub fn new(store: InMemoryDocumentStore) -> Self {
        Self {
            store,
            top_k: DEFAULT_TOP_K,
            filters: None,
        }
    }

    /// Return at most `top_k` documents
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Filter applied when none is supplied at run time
    pub fn with_filters(mut self, filters: FilterPredicate) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Rank stored documents against `query`
    pub async fn retrieve(
        &self,
        query: &str,
        filters: Option<&FilterPredicate>,
        top_k: usize,
    ) -> Result<Vec<Document>, ComponentError> {
        let terms = terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.store.filter_documents(filters).await?;
        let mut ranked: Vec<Document> = candidates
            .into_iter()
            .filter_map(|document| {
                let content = terms_of(document.content.as_deref()?);
                let matched = terms.iter().filter(|term| content.contains(*term)).count();
                (matched > 0).then(|| {
                    let score = matched as f64 / terms.len() as f64;
                    document.with_score(score)
                })
            })
            .collect();

        // Stable: ties keep store order
        ranked.sort_by(|a, b| b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)));
        ranked.truncate(top_k);
        debug!(query, results = ranked.len(), "Retrieved documents");
        Ok(ranked)
    }
}

fn terms_of(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

impl ComponentBase for InMemoryRetriever {
    fn component_type(&self) -> &str {
        "InMemoryRetriever"
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("query", SocketType::String))
            .with_input(InputSocket::optional("filters", SocketType::Mapping))
            .with_input(InputSocket::optional("top_k", SocketType::Number))
            .with_output("documents", SocketType::documents())
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("top_k".to_string(), json!(self.top_k));
        params.insert(
            "filters".to_string(),
            self.filters.as_ref().map(FilterPredicate::to_value).unwrap_or(Value::Null),
        );
        params
    }
}

#[async_trait]
impl Component for InMemoryRetriever {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let query = inputs
            .get("query")
            .and_then(DataPacket::as_str)
            .ok_or_else(|| ComponentError::MissingInput("query".to_string()))?;

        let runtime_filters = match inputs.get("filters").map(DataPacket::as_value) {
            None | Some(Value::Null) => None,
            Some(value) => Some(FilterPredicate::from_value(value)?),
        };
        let filters = runtime_filters.as_ref().or(self.filters.as_ref());

        let top_k = match inputs.get("top_k").map(DataPacket::as_value) {
            None | Some(Value::Null) => self.top_k,
            Some(value) => value
                .as_u64()
                .map(|k| k as usize)
                .ok_or_else(|| ComponentError::InvalidInput(format!("top_k must be a non-negative integer, got {}", value)))?,
        };

        let documents = self.retrieve(query, filters, top_k).await?;
        let mut outputs = HashMap::new();
        outputs.insert("documents".to_string(), DataPacket::from_documents(&documents));
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DuplicatePolicy;

    async fn seeded_store() -> InMemoryDocumentStore {
        let store = InMemoryDocumentStore::new();
        let docs = vec![
            Document::new("Rust is a systems language", json!({"lang": "en"}).as_object().cloned().unwrap()),
            Document::new("Rust has a borrow checker and a systems focus", json!({"lang": "en"}).as_object().cloned().unwrap()),
            Document::new("Python is dynamic", json!({"lang": "en"}).as_object().cloned().unwrap()),
            Document::new("Rust ist eine Systemsprache", json!({"lang": "de"}).as_object().cloned().unwrap()),
        ];
        store.write_documents(docs, DuplicatePolicy::Fail).await.unwrap();
        store
    }

    fn query(text: &str) -> SocketValues {
        let mut inputs = HashMap::new();
        inputs.insert("query".to_string(), DataPacket::from_string(text));
        inputs
    }

    fn contents(outputs: &SocketValues) -> Vec<(String, f64)> {
        outputs["documents"]
            .to_documents()
            .unwrap()
            .into_iter()
            .map(|d| (d.content.unwrap_or_default(), d.score.unwrap_or_default()))
            .collect()
    }

    #[tokio::test]
    async fn test_ranks_by_term_overlap() {
        let retriever = InMemoryRetriever::new(seeded_store().await);
        let outputs = retriever.run(query("Rust systems")).await.unwrap();
        assert_eq!(
            contents(&outputs),
            vec![
                ("Rust is a systems language".to_string(), 1.0),
                ("Rust has a borrow checker and a systems focus".to_string(), 1.0),
                ("Rust ist eine Systemsprache".to_string(), 0.5),
            ]
        );
    }

    #[tokio::test]
    async fn test_runtime_filters_and_top_k() {
        let retriever = InMemoryRetriever::new(seeded_store().await)
            .with_filters(FilterPredicate::from_value(&json!({"field": "meta.lang", "operator": "==", "value": "en"})).unwrap());

        let outputs = retriever.run(query("rust")).await.unwrap();
        assert_eq!(contents(&outputs).len(), 2);

        let mut inputs = query("rust");
        inputs.insert(
            "filters".to_string(),
            DataPacket::new(json!({"field": "meta.lang", "operator": "==", "value": "de"})),
        );
        inputs.insert("top_k".to_string(), DataPacket::new(json!(1)));
        let outputs = retriever.run(inputs).await.unwrap();
        assert_eq!(contents(&outputs), vec![("Rust ist eine Systemsprache".to_string(), 1.0)]);
    }

    #[tokio::test]
    async fn test_malformed_filters_fail() {
        let retriever = InMemoryRetriever::new(seeded_store().await);
        let mut inputs = query("rust");
        inputs.insert("filters".to_string(), DataPacket::new(json!({"operator": "XOR"})));
        let err = retriever.run(inputs).await.unwrap_err();
        assert!(matches!(err, ComponentError::FilterError(_)));
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        let retriever = InMemoryRetriever::new(seeded_store().await);
        let outputs = retriever.run(query("  ?! ")).await.unwrap();
        assert!(contents(&outputs).is_empty());
    }
}
