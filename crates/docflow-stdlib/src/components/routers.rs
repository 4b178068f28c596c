use async_trait::async_trait;
use docflow_core::{
    Component, ComponentBase, ComponentError, DataPacket, InputSocket, SocketSchema, SocketType,
    SocketValues,
};
use docflow_filter::{evaluate, FilterPredicate};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Output socket for paths whose type matches no configured MIME type
pub const UNCLASSIFIED: &str = "unclassified";

/// Output socket for documents no rule selects
pub const UNMATCHED: &str = "unmatched";

/// Routes file paths by MIME type, guessed from the file extension
///
/// Each configured MIME type becomes an output socket of the same name,
/// e.g. `file_type_router.text/plain`. A configured type may end in `/*`
/// to match a whole family.
#[derive(Debug, Clone)]
pub struct FileTypeRouter {
    mime_types: Vec<String>,
}

impl FileTypeRouter {
    /// Create a router for the given MIME types
    pub fn new<S: Into<String>>(mime_types: impl IntoIterator<Item = S>) -> Result<Self, ComponentError> {
        let mime_types: Vec<String> = mime_types.into_iter().map(Into::into).collect();
        if mime_types.is_empty() {
            return Err(ComponentError::ConfigurationError(
                "FileTypeRouter needs at least one MIME type".to_string(),
            ));
        }
        if let Some(bad) = mime_types.iter().find(|m| !m.contains('/') || m.as_str() == UNCLASSIFIED) {
            return Err(ComponentError::ConfigurationError(format!(
                "'{}' is not a MIME type",
                bad
            )));
        }
        Ok(Self { mime_types })
    }

    fn classify(&self, path: &str) -> Option<&str> {
        let guessed = mime_guess::from_path(path).first()?;
        let essence = guessed.essence_str();
        self.mime_types
            .iter()
            .find(|configured| match configured.strip_suffix("/*") {
                Some(family) => guessed.type_().as_str() == family,
                None => configured.as_str() == essence,
            })
            .map(String::as_str)
    }
}

impl ComponentBase for FileTypeRouter {
    fn component_type(&self) -> &str {
        "FileTypeRouter"
    }

    fn sockets(&self) -> SocketSchema {
        let mut schema = SocketSchema::new()
            .with_input(InputSocket::required("sources", SocketType::list(SocketType::String)));
        for mime_type in &self.mime_types {
            schema = schema.with_output(mime_type.clone(), SocketType::list(SocketType::String));
        }
        schema.with_output(UNCLASSIFIED, SocketType::list(SocketType::String))
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("mime_types".to_string(), json!(self.mime_types));
        params
    }
}

#[async_trait]
impl Component for FileTypeRouter {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let sources = inputs
            .get("sources")
            .ok_or_else(|| ComponentError::MissingInput("sources".to_string()))?
            .to_strings()?;

        let mut routed: HashMap<String, Vec<String>> = HashMap::new();
        for source in sources {
            let socket = self.classify(&source).unwrap_or(UNCLASSIFIED).to_string();
            routed.entry(socket).or_default().push(source);
        }

        debug!(branches = routed.len(), "Routed files by type");
        Ok(routed
            .into_iter()
            .map(|(socket, paths)| (socket, DataPacket::new(json!(paths))))
            .collect())
    }
}

/// Routes documents to every rule whose filter predicate selects them
///
/// A document may leave on several sockets; documents no rule selects
/// leave on `unmatched`.
#[derive(Debug, Clone)]
pub struct MetadataRouter {
    rules: Vec<(String, FilterPredicate)>,
}

impl MetadataRouter {
    /// Create a router from named rules
    pub fn new(rules: Vec<(String, FilterPredicate)>) -> Result<Self, ComponentError> {
        if let Some((name, _)) = rules.iter().find(|(name, _)| name.is_empty() || name == UNMATCHED) {
            return Err(ComponentError::ConfigurationError(format!(
                "'{}' cannot be used as a rule name",
                name
            )));
        }
        Ok(Self { rules })
    }

    /// Parse rules from a `{name: predicate}` mapping
    pub fn from_rules(rules: &Map<String, Value>) -> Result<Self, ComponentError> {
        let parsed = rules
            .iter()
            .map(|(name, predicate)| {
                FilterPredicate::from_value(predicate)
                    .map(|predicate| (name.clone(), predicate))
                    .map_err(|e| ComponentError::ConfigurationError(format!("rule '{}': {}", name, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }
}

impl ComponentBase for MetadataRouter {
    fn component_type(&self) -> &str {
        "MetadataRouter"
    }

    fn sockets(&self) -> SocketSchema {
        let mut schema =
            SocketSchema::new().with_input(InputSocket::required("documents", SocketType::documents()));
        for (name, _) in &self.rules {
            schema = schema.with_output(name.clone(), SocketType::documents());
        }
        schema.with_output(UNMATCHED, SocketType::documents())
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let rules: Map<String, Value> = self
            .rules
            .iter()
            .map(|(name, predicate)| (name.clone(), predicate.to_value()))
            .collect();
        let mut params = Map::new();
        params.insert("rules".to_string(), Value::Object(rules));
        params
    }
}

#[async_trait]
impl Component for MetadataRouter {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let documents = inputs
            .get("documents")
            .ok_or_else(|| ComponentError::MissingInput("documents".to_string()))?
            .to_documents()?;

        let mut routed: HashMap<&str, Vec<_>> = HashMap::new();
        for document in documents {
            let mut matched = false;
            for (name, predicate) in &self.rules {
                if evaluate(predicate, &document)? {
                    routed.entry(name.as_str()).or_default().push(document.clone());
                    matched = true;
                }
            }
            if !matched {
                routed.entry(UNMATCHED).or_default().push(document);
            }
        }

        Ok(routed
            .into_iter()
            .map(|(socket, documents)| (socket.to_string(), DataPacket::from_documents(&documents)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_core::Document;

    fn sources(paths: &[&str]) -> SocketValues {
        let mut inputs = HashMap::new();
        inputs.insert("sources".to_string(), DataPacket::new(json!(paths)));
        inputs
    }

    #[tokio::test]
    async fn test_routes_by_extension() {
        let router = FileTypeRouter::new(["text/plain", "application/pdf", "text/html"]).unwrap();
        let outputs = router
            .run(sources(&["notes.txt", "index.html", "paper.pdf", "diagram.svg", "more.txt"]))
            .await
            .unwrap();

        assert_eq!(outputs["text/plain"].to_strings().unwrap(), vec!["notes.txt", "more.txt"]);
        assert_eq!(outputs["text/html"].to_strings().unwrap(), vec!["index.html"]);
        assert_eq!(outputs["application/pdf"].to_strings().unwrap(), vec!["paper.pdf"]);
        assert_eq!(outputs[UNCLASSIFIED].to_strings().unwrap(), vec!["diagram.svg"]);
    }

    #[tokio::test]
    async fn test_only_non_empty_branches_are_emitted() {
        let router = FileTypeRouter::new(["text/plain", "application/pdf"]).unwrap();
        let outputs = router.run(sources(&["a.txt"])).await.unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(outputs.contains_key("text/plain"));
    }

    #[tokio::test]
    async fn test_wildcard_family_and_unknown_extension() {
        let router = FileTypeRouter::new(["image/*"]).unwrap();
        let outputs = router.run(sources(&["photo.png", "LICENSE"])).await.unwrap();
        assert_eq!(outputs["image/*"].to_strings().unwrap(), vec!["photo.png"]);
        assert_eq!(outputs[UNCLASSIFIED].to_strings().unwrap(), vec!["LICENSE"]);
    }

    #[test]
    fn test_file_type_router_configuration() {
        assert!(FileTypeRouter::new(Vec::<String>::new()).is_err());
        assert!(FileTypeRouter::new(["plain"]).is_err());

        let router = FileTypeRouter::new(["text/plain"]).unwrap();
        let schema = router.sockets();
        let outputs: Vec<_> = schema.outputs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(outputs, vec!["text/plain", UNCLASSIFIED]);
        assert_eq!(router.init_parameters()["mime_types"], json!(["text/plain"]));
    }

    #[tokio::test]
    async fn test_metadata_router_fans_out() {
        let rules = json!({
            "english": {"field": "meta.language", "operator": "==", "value": "en"},
            "recent": {"field": "meta.year", "operator": ">=", "value": 2023}
        });
        let router = MetadataRouter::from_rules(rules.as_object().unwrap()).unwrap();

        let docs = vec![
            Document::new("a", json!({"language": "en", "year": 2024}).as_object().cloned().unwrap()),
            Document::new("b", json!({"language": "de", "year": 2020}).as_object().cloned().unwrap()),
            Document::new("c", json!({"language": "en", "year": 2019}).as_object().cloned().unwrap()),
        ];
        let mut inputs = HashMap::new();
        inputs.insert("documents".to_string(), DataPacket::from_documents(&docs));
        let outputs = router.run(inputs).await.unwrap();

        let contents = |socket: &str| -> Vec<String> {
            outputs[socket]
                .to_documents()
                .unwrap()
                .into_iter()
                .filter_map(|d| d.content)
                .collect()
        };
        assert_eq!(contents("english"), vec!["a", "c"]);
        assert_eq!(contents("recent"), vec!["a"]);
        assert_eq!(contents(UNMATCHED), vec!["b"]);
    }

    #[tokio::test]
    async fn test_metadata_router_surfaces_filter_errors() {
        let router = MetadataRouter::new(vec![(
            "newer".to_string(),
            FilterPredicate::from_value(&json!({"field": "meta.year", "operator": ">", "value": 2020})).unwrap(),
        )])
        .unwrap();
        let docs = vec![Document::new("a", json!({"year": "unknown"}).as_object().cloned().unwrap())];
        let mut inputs = HashMap::new();
        inputs.insert("documents".to_string(), DataPacket::from_documents(&docs));

        let err = router.run(inputs).await.unwrap_err();
        assert!(matches!(err, ComponentError::FilterError(_)));
    }

    #[test]
    fn test_metadata_router_rejects_reserved_rule_name() {
        let rules = json!({"unmatched": {"field": "meta.x", "operator": "==", "value": 1}});
        assert!(MetadataRouter::from_rules(rules.as_object().unwrap()).is_err());
    }
}
