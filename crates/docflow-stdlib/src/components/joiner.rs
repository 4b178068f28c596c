use async_trait::async_trait;
use docflow_core::{
    Component, ComponentBase, ComponentError, DataPacket, Document, InputSocket, SocketSchema,
    SocketType, SocketValues,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;

/// How duplicate documents (same id) are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Keep the highest-scored copy; ties keep the earlier producer's copy
    #[default]
    Concatenate,
    /// Keep the earlier producer's copy
    KeepFirst,
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinMode::Concatenate => write!(f, "concatenate"),
            JoinMode::KeepFirst => write!(f, "keep_first"),
        }
    }
}

/// Merges document lists from several producers into one
///
/// The `documents` socket is joinable: every connected producer delivers
/// a list, and the lists are concatenated in connection order before
/// duplicates are resolved.
#[derive(Debug, Clone)]
pub struct DocumentJoiner {
    join_mode: JoinMode,
    top_k: Option<usize>,
    sort_by_score: bool,
}

impl DocumentJoiner {
    /// Create a joiner with the given duplicate resolution
    pub fn new(join_mode: JoinMode) -> Self {
        Self {
            join_mode,
            top_k: None,
            sort_by_score: true,
        }
    }

    /// Keep at most `top_k` documents
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Whether to order the result by descending score
    pub fn with_sort_by_score(mut self, sort_by_score: bool) -> Self {
        self.sort_by_score = sort_by_score;
        self
    }

    /// Resolve duplicates, keeping each id at the position it first appeared
    pub fn join(&self, documents: Vec<Document>) -> Vec<Document> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut joined: Vec<Document> = Vec::with_capacity(documents.len());

        for document in documents {
            match positions.get(&document.id) {
                Some(&position) => {
                    let replace = self.join_mode == JoinMode::Concatenate
                        && score_of(&document) > score_of(&joined[position]);
                    if replace {
                        joined[position] = document;
                    }
                }
                None => {
                    positions.insert(document.id.clone(), joined.len());
                    joined.push(document);
                }
            }
        }

        if self.sort_by_score {
            // Stable: equal scores keep arrival order, unscored documents go last
            joined.sort_by(|a, b| score_of(b).total_cmp(&score_of(a)));
        }
        if let Some(top_k) = self.top_k {
            joined.truncate(top_k);
        }
        joined
    }
}

impl Default for DocumentJoiner {
    fn default() -> Self {
        Self::new(JoinMode::default())
    }
}

fn score_of(document: &Document) -> f64 {
    document.score.unwrap_or(f64::NEG_INFINITY)
}

impl ComponentBase for DocumentJoiner {
    fn component_type(&self) -> &str {
        "DocumentJoiner"
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("documents", SocketType::documents()).joinable())
            .with_output("documents", SocketType::documents())
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("join_mode".to_string(), json!(self.join_mode));
        params.insert("top_k".to_string(), json!(self.top_k));
        params.insert("sort_by_score".to_string(), json!(self.sort_by_score));
        params
    }
}

#[async_trait]
impl Component for DocumentJoiner {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let documents = inputs
            .get("documents")
            .ok_or_else(|| ComponentError::MissingInput("documents".to_string()))?
            .to_documents()?;

        let mut outputs = HashMap::new();
        outputs.insert(
            "documents".to_string(),
            DataPacket::from_documents(&self.join(documents)),
        );
        Ok(outputs)
    }

    /// Flatten the delivered lists instead of nesting them
    fn join_inputs(&self, socket: &str, values: Vec<DataPacket>) -> Result<DataPacket, ComponentError> {
        let mut flattened = Vec::new();
        for value in values {
            match value.into_value() {
                Value::Array(items) => flattened.extend(items),
                other => {
                    return Err(ComponentError::InvalidInput(format!(
                        "socket '{}' expects lists of documents, got {}",
                        socket, other
                    )))
                }
            }
        }
        Ok(DataPacket::new(Value::Array(flattened)))
    }
}
