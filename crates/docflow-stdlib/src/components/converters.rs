use async_trait::async_trait;
use docflow_core::{
    Component, ComponentBase, ComponentError, DataPacket, Document, InputSocket, SocketSchema,
    SocketType, SocketValues,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Reads UTF-8 text files into documents
///
/// Each document carries `meta.file_path`; metadata passed on the optional
/// `meta` socket is merged into every document.
#[derive(Debug, Clone, Default)]
pub struct TextFileToDocument;

impl TextFileToDocument {
    /// Create a converter
    pub fn new() -> Self {
        Self
    }

    async fn convert(path: &str, extra: &Map<String, Value>) -> Result<Document, ComponentError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ComponentError::IOError(format!("cannot read '{}': {}", path, e)))?;
        let mut meta = extra.clone();
        meta.insert("file_path".to_string(), json!(path));
        Ok(Document::new(content, meta))
    }
}

impl ComponentBase for TextFileToDocument {
    fn component_type(&self) -> &str {
        "TextFileToDocument"
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("sources", SocketType::list(SocketType::String)))
            .with_input(InputSocket::optional("meta", SocketType::Mapping))
            .with_output("documents", SocketType::documents())
    }
}

#[async_trait]
impl Component for TextFileToDocument {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let sources = inputs
            .get("sources")
            .ok_or_else(|| ComponentError::MissingInput("sources".to_string()))?
            .to_strings()?;
        let extra = match inputs.get("meta").map(DataPacket::as_value) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(meta)) => meta.clone(),
            Some(other) => {
                return Err(ComponentError::InvalidInput(format!(
                    "meta must be a mapping, got {}",
                    other
                )))
            }
        };

        let mut documents = Vec::with_capacity(sources.len());
        for source in &sources {
            documents.push(Self::convert(source, &extra).await?);
        }
        debug!(documents = documents.len(), "Converted text files");

        let mut outputs = HashMap::new();
        outputs.insert("documents".to_string(), DataPacket::from_documents(&documents));
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn inputs(paths: &[&str], meta: Option<Value>) -> SocketValues {
        let mut inputs = HashMap::new();
        inputs.insert("sources".to_string(), DataPacket::new(json!(paths)));
        if let Some(meta) = meta {
            inputs.insert("meta".to_string(), DataPacket::new(meta));
        }
        inputs
    }

    #[tokio::test]
    async fn test_reads_files_with_path_metadata() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Release notes for 2.0").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let outputs = TextFileToDocument::new()
            .run(inputs(&[&path], Some(json!({"source": "docs"}))))
            .await
            .unwrap();
        let documents = outputs["documents"].to_documents().unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].content.as_deref(), Some("Release notes for 2.0"));
        assert_eq!(documents[0].meta["file_path"], json!(path));
        assert_eq!(documents[0].meta["source"], json!("docs"));
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let err = TextFileToDocument::new()
            .run(inputs(&["/definitely/not/here.txt"], None))
            .await
            .unwrap_err();
        assert!(matches!(err, ComponentError::IOError(ref msg) if msg.contains("/definitely/not/here.txt")));
    }

    #[tokio::test]
    async fn test_meta_must_be_a_mapping() {
        let err = TextFileToDocument::new()
            .run(inputs(&[], Some(json!(["not", "a", "map"]))))
            .await
            .unwrap_err();
        assert!(matches!(err, ComponentError::InvalidInput(_)));
    }
}
