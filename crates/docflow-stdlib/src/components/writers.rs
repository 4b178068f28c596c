use crate::store::{DuplicatePolicy, InMemoryDocumentStore};
use async_trait::async_trait;
use docflow_core::{
    Component, ComponentBase, ComponentError, DataPacket, InputSocket, SocketSchema, SocketType,
    SocketValues,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::info;

/// Writes documents into a document store
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    store: InMemoryDocumentStore,
    policy: DuplicatePolicy,
}

impl DocumentWriter {
    /// Create a writer for `store`
    pub fn new(store: InMemoryDocumentStore, policy: DuplicatePolicy) -> Self {
        Self { store, policy }
    }
}

impl ComponentBase for DocumentWriter {
    fn component_type(&self) -> &str {
        "DocumentWriter"
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("documents", SocketType::documents()))
            .with_output("documents_written", SocketType::Number)
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("policy".to_string(), json!(self.policy));
        params
    }
}

#[async_trait]
impl Component for DocumentWriter {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let documents = inputs
            .get("documents")
            .ok_or_else(|| ComponentError::MissingInput("documents".to_string()))?
            .to_documents()?;

        let written = self.store.write_documents(documents, self.policy).await?;
        info!(written, policy = %self.policy, "Documents written");

        let mut outputs = HashMap::new();
        outputs.insert("documents_written".to_string(), DataPacket::new(json!(written)));
        Ok(outputs)
    }
}
