//! Generators for sample documents and pipeline definitions.

use docflow_core::Document;
use serde_json::{json, Map, Value};

fn meta(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Three release notes with `version` and `date` metadata.
///
/// Versions are 1.15, 1.22 and 2.0; dates are 2023-03-30, 2023-11-07 and
/// 2023-12-04, in that order.
pub fn release_notes() -> Vec<Document> {
    vec![
        Document::new(
            "Release 1.15 adds the document splitter",
            meta(json!({"version": 1.15, "date": "2023-03-30"})),
        ),
        Document::new(
            "Release 1.22 adds metadata routing",
            meta(json!({"version": 1.22, "date": "2023-11-07"})),
        ),
        Document::new(
            "Release 2.0 reworks pipelines around typed sockets",
            meta(json!({"version": 2.0, "date": "2023-12-04"})),
        ),
    ]
}

/// A minimal serialized pipeline with two passthrough components.
pub fn minimal_pipeline_yaml() -> String {
    r#"
components:
  first:
    type: Passthrough
    init_parameters: {}
  second:
    type: Passthrough
    init_parameters: {}
connections:
  - sender: first.value
    receiver: second.value
max_loops_allowed: 100
metadata: {}
"#
    .to_string()
}
