use async_trait::async_trait;
use docflow_core::{
    Component, ComponentBase, ComponentError, DataPacket, Document, InputSocket, SocketSchema,
    SocketType, SocketValues,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

lazy_static! {
    // Horizontal whitespace; newlines and form feeds are structure
    static ref HORIZONTAL_WHITESPACE: Regex = Regex::new(r"[^\S\n\x0C]+").unwrap();
    static ref SENTENCE: Regex = Regex::new(r"[^.!?]*[.!?]+\s*|[^.!?]+").unwrap();
}

const PAGE_BREAK: &str = "\x0C";

fn documents_input(inputs: &SocketValues) -> Result<Vec<Document>, ComponentError> {
    inputs
        .get("documents")
        .ok_or_else(|| ComponentError::MissingInput("documents".to_string()))?
        .to_documents()
}

fn documents_output(documents: &[Document]) -> SocketValues {
    let mut outputs = HashMap::new();
    outputs.insert("documents".to_string(), DataPacket::from_documents(documents));
    outputs
}

/// Normalises document text
#[derive(Debug, Clone)]
pub struct DocumentCleaner {
    remove_empty_lines: bool,
    remove_extra_whitespaces: bool,
    remove_repeated_substrings: bool,
}

impl Default for DocumentCleaner {
    fn default() -> Self {
        Self {
            remove_empty_lines: true,
            remove_extra_whitespaces: true,
            remove_repeated_substrings: false,
        }
    }
}

impl DocumentCleaner {
    /// Create a cleaner with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop lines that are empty or whitespace-only
    pub fn with_remove_empty_lines(mut self, enabled: bool) -> Self {
        self.remove_empty_lines = enabled;
        self
    }

    /// Collapse runs of spaces and tabs, trimming every line
    pub fn with_remove_extra_whitespaces(mut self, enabled: bool) -> Self {
        self.remove_extra_whitespaces = enabled;
        self
    }

    /// Drop lines repeated on every page, such as headers and footers
    pub fn with_remove_repeated_substrings(mut self, enabled: bool) -> Self {
        self.remove_repeated_substrings = enabled;
        self
    }

    /// Clean one text
    pub fn clean(&self, text: &str) -> String {
        let text = if self.remove_repeated_substrings {
            remove_page_furniture(text)
        } else {
            text.to_string()
        };

        let mut lines: Vec<String> = text
            .split('\n')
            .map(|line| {
                if self.remove_extra_whitespaces {
                    HORIZONTAL_WHITESPACE.replace_all(line, " ").trim_matches(' ').to_string()
                } else {
                    line.to_string()
                }
            })
            .collect();
        if self.remove_empty_lines {
            lines.retain(|line| !line.trim().is_empty());
        }

        let cleaned = lines.join("\n");
        if self.remove_extra_whitespaces {
            cleaned.trim().to_string()
        } else {
            cleaned
        }
    }
}

/// Remove lines that occur on every page of a multi-page text
fn remove_page_furniture(text: &str) -> String {
    let pages: Vec<&str> = text.split(PAGE_BREAK).collect();
    if pages.len() < 2 {
        return text.to_string();
    }

    let line_set = |page: &str| -> HashSet<String> {
        page.lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    };
    let mut repeated = line_set(pages[0]);
    for &page in &pages[1..] {
        let lines = line_set(page);
        repeated.retain(|line| lines.contains(line));
    }
    if repeated.is_empty() {
        return text.to_string();
    }

    pages
        .iter()
        .map(|page| {
            page.split('\n')
                .filter(|line| !repeated.contains(line.trim()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join(PAGE_BREAK)
}

impl ComponentBase for DocumentCleaner {
    fn component_type(&self) -> &str {
        "DocumentCleaner"
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("documents", SocketType::documents()))
            .with_output("documents", SocketType::documents())
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("remove_empty_lines".to_string(), json!(self.remove_empty_lines));
        params.insert("remove_extra_whitespaces".to_string(), json!(self.remove_extra_whitespaces));
        params.insert("remove_repeated_substrings".to_string(), json!(self.remove_repeated_substrings));
        params
    }
}

#[async_trait]
impl Component for DocumentCleaner {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let cleaned: Vec<Document> = documents_input(&inputs)?
            .into_iter()
            .map(|document| match document.content.as_deref() {
                // The id follows the new content
                Some(content) => {
                    let mut cleaned = Document::new(self.clean(content), document.meta.clone());
                    cleaned.score = document.score;
                    cleaned.embedding = document.embedding.clone();
                    cleaned
                }
                None => document,
            })
            .collect();
        Ok(documents_output(&cleaned))
    }
}

/// Unit a [`DocumentSplitter`] counts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitBy {
    /// Space-separated words
    Word,
    /// Runs ending in `.`, `!` or `?`
    Sentence,
    /// Blocks separated by a blank line
    Passage,
    /// Form-feed separated pages
    Page,
}

impl fmt::Display for SplitBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitBy::Word => write!(f, "word"),
            SplitBy::Sentence => write!(f, "sentence"),
            SplitBy::Passage => write!(f, "passage"),
            SplitBy::Page => write!(f, "page"),
        }
    }
}

impl SplitBy {
    /// Split keeping separators attached, so units concatenate back to the text
    fn units(self, text: &str) -> Vec<&str> {
        match self {
            SplitBy::Word => text.split_inclusive(' ').collect(),
            SplitBy::Sentence => SENTENCE.find_iter(text).map(|m| m.as_str()).collect(),
            SplitBy::Passage => text.split_inclusive("\n\n").collect(),
            SplitBy::Page => text.split_inclusive(PAGE_BREAK).collect(),
        }
    }
}

/// Splits documents into overlapping windows of words, sentences or passages
///
/// Every split keeps the source metadata and adds `source_id` and `split_id`.
#[derive(Debug, Clone)]
pub struct DocumentSplitter {
    split_by: SplitBy,
    split_length: usize,
    split_overlap: usize,
}

impl DocumentSplitter {
    /// Create a splitter; `split_overlap` must be smaller than `split_length`
    pub fn new(split_by: SplitBy, split_length: usize, split_overlap: usize) -> Result<Self, ComponentError> {
        if split_length == 0 {
            return Err(ComponentError::ConfigurationError(
                "split_length must be greater than 0".to_string(),
            ));
        }
        if split_overlap >= split_length {
            return Err(ComponentError::ConfigurationError(format!(
                "split_overlap ({}) must be smaller than split_length ({})",
                split_overlap, split_length
            )));
        }
        Ok(Self {
            split_by,
            split_length,
            split_overlap,
        })
    }

    /// Split one text into windows
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let units = self.split_by.units(text);
        let step = self.split_length - self.split_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.split_length).min(units.len());
            let chunk = units[start..end].concat();
            if !chunk.trim().is_empty() {
                chunks.push(chunk);
            }
            if end == units.len() {
                break;
            }
            start += step;
        }
        chunks
    }

    fn split_document(&self, document: &Document) -> Result<Vec<Document>, ComponentError> {
        let content = document.content.as_deref().ok_or_else(|| {
            ComponentError::InvalidInput(format!(
                "document '{}' has no text content to split",
                document.id
            ))
        })?;

        Ok(self
            .split_text(content)
            .into_iter()
            .enumerate()
            .map(|(split_id, chunk)| {
                let mut meta = document.meta.clone();
                meta.insert("source_id".to_string(), json!(document.id));
                meta.insert("split_id".to_string(), json!(split_id));
                Document::new(chunk, meta)
            })
            .collect())
    }
}

impl ComponentBase for DocumentSplitter {
    fn component_type(&self) -> &str {
        "DocumentSplitter"
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("documents", SocketType::documents()))
            .with_output("documents", SocketType::documents())
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("split_by".to_string(), json!(self.split_by));
        params.insert("split_length".to_string(), json!(self.split_length));
        params.insert("split_overlap".to_string(), json!(self.split_overlap));
        params
    }
}

#[async_trait]
impl Component for DocumentSplitter {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let documents = documents_input(&inputs)?;
        let mut splits = Vec::new();
        for document in &documents {
            splits.extend(self.split_document(document)?);
        }
        debug!(
            documents = documents.len(),
            splits = splits.len(),
            split_by = %self.split_by,
            "Split documents"
        );
        Ok(documents_output(&splits))
    }
}
