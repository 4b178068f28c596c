//!
//! Standard library of components for Docflow pipelines
//!
//! Routers, a joiner, text preprocessing, prompt building, and an
//! in-memory document store with its writer and retriever. Every
//! component is an ordinary [`docflow_core::Component`]; [`registry`]
//! makes them loadable from YAML.

pub mod components;
pub mod store;

pub use components::*;
pub use factory::registry;
pub use store::{DocumentStoreError, DuplicatePolicy, InMemoryDocumentStore};

/// Factory module for creating Standard Library components
pub mod factory {
    use crate::components::*;
    use crate::store::{DuplicatePolicy, InMemoryDocumentStore};
    use docflow_core::ComponentError;
    use docflow_dsl::{param, param_or, ComponentRegistry};
    use docflow_filter::FilterPredicate;
    use serde_json::{Map, Value};

    /// Default window for [`DocumentSplitter`]
    pub const DEFAULT_SPLIT_LENGTH: usize = 200;

    /// Build a registry with every standard component type
    ///
    /// Writers and retrievers created from the registry all share `store`.
    pub fn registry(store: InMemoryDocumentStore) -> ComponentRegistry {
        let writer_store = store.clone();
        let retriever_store = store;

        ComponentRegistry::new()
            .with("FileTypeRouter", |params| {
                FileTypeRouter::new(param::<Vec<String>>(params, "mime_types")?)
            })
            .with("MetadataRouter", |params| {
                MetadataRouter::from_rules(&param::<Map<String, Value>>(params, "rules")?)
            })
            .with("DocumentJoiner", |params| {
                let joiner = DocumentJoiner::new(param_or(params, "join_mode", JoinMode::default())?)
                    .with_sort_by_score(param_or(params, "sort_by_score", true)?);
                Ok(match param_or::<Option<usize>>(params, "top_k", None)? {
                    Some(top_k) => joiner.with_top_k(top_k),
                    None => joiner,
                })
            })
            .with("TextFileToDocument", |_| Ok(TextFileToDocument::new()))
            .with("DocumentCleaner", |params| {
                Ok(DocumentCleaner::new()
                    .with_remove_empty_lines(param_or(params, "remove_empty_lines", true)?)
                    .with_remove_extra_whitespaces(param_or(params, "remove_extra_whitespaces", true)?)
                    .with_remove_repeated_substrings(param_or(
                        params,
                        "remove_repeated_substrings",
                        false,
                    )?))
            })
            .with("DocumentSplitter", |params| {
                DocumentSplitter::new(
                    param_or(params, "split_by", SplitBy::Word)?,
                    param_or(params, "split_length", DEFAULT_SPLIT_LENGTH)?,
                    param_or(params, "split_overlap", 0)?,
                )
            })
            .with("PromptBuilder", |params| {
                PromptBuilder::new(param::<String>(params, "template")?)
                    .with_required_variables(param_or(params, "required_variables", Vec::new())?)
            })
            .with("DocumentWriter", move |params| {
                Ok(DocumentWriter::new(
                    writer_store.clone(),
                    param_or(params, "policy", DuplicatePolicy::default())?,
                ))
            })
            .with("InMemoryRetriever", move |params| {
                let retriever = InMemoryRetriever::new(retriever_store.clone())
                    .with_top_k(param_or(params, "top_k", DEFAULT_TOP_K)?);
                match param_or::<Option<Value>>(params, "filters", None)? {
                    Some(filters) => {
                        let predicate = FilterPredicate::from_value(&filters).map_err(|e| {
                            ComponentError::ConfigurationError(format!("init parameter 'filters': {}", e))
                        })?;
                        Ok(retriever.with_filters(predicate))
                    }
                    None => Ok(retriever),
                }
            })
    }
}
