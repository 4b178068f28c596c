use docflow_runner::{run, RunnerConfig, RunnerError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SPLIT_YAML: &str = r#"
components:
  splitter:
    type: DocumentSplitter
    init_parameters:
      split_by: word
      split_length: 3
      split_overlap: 0
  prompt_builder:
    type: PromptBuilder
    init_parameters:
      template: "{% for d in documents %}[{{ d.content }}]{% endfor %}"
connections:
  - sender: splitter.documents
    receiver: prompt_builder.documents
"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn config(pipeline: PathBuf, inputs: Option<PathBuf>) -> RunnerConfig {
    RunnerConfig {
        pipeline: Some(pipeline),
        inputs,
        parallel: false,
        ..RunnerConfig::default()
    }
}

#[tokio::test]
async fn test_runs_pipeline_file_with_inputs_file() {
    let dir = TempDir::new().unwrap();
    let pipeline = write(&dir, "pipeline.yaml", SPLIT_YAML);
    let inputs = write(
        &dir,
        "inputs.json",
        &json!({
            "splitter": {
                "documents": [{"id": "notes", "content": "one two three four five", "meta": {}}]
            }
        })
        .to_string(),
    );

    let outputs = run(&config(pipeline, Some(inputs))).await.unwrap();

    assert_eq!(
        outputs["prompt_builder"]["prompt"],
        json!("[one two three ][four five]")
    );
    assert_eq!(outputs["splitter"]["documents"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_pipeline_is_a_config_error() {
    let err = run(&RunnerConfig::default()).await.unwrap_err();
    assert!(matches!(err, RunnerError::ConfigError(_)));
}

#[tokio::test]
async fn test_unreadable_pipeline_names_the_path() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.yaml");
    let err = run(&config(missing.clone(), None)).await.unwrap_err();
    match err {
        RunnerError::ReadError { path, .. } => assert_eq!(path, missing.display().to_string()),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_inputs_are_rejected() {
    let dir = TempDir::new().unwrap();
    let pipeline = write(&dir, "pipeline.yaml", SPLIT_YAML);
    let inputs = write(&dir, "inputs.json", "[1, 2");
    let err = run(&config(pipeline, Some(inputs))).await.unwrap_err();
    assert!(matches!(err, RunnerError::InputsError(_)));
}

#[tokio::test]
async fn test_unknown_component_type_is_a_dsl_error() {
    let dir = TempDir::new().unwrap();
    let pipeline = write(
        &dir,
        "pipeline.yaml",
        "components:\n  mystery:\n    type: Teleporter\nconnections: []\n",
    );
    let err = run(&config(pipeline, None)).await.unwrap_err();
    assert!(matches!(err, RunnerError::DslError(_)));
}

#[tokio::test]
async fn test_missing_required_input_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let pipeline = write(&dir, "pipeline.yaml", SPLIT_YAML);
    let err = run(&config(pipeline, None)).await.unwrap_err();
    assert!(matches!(err, RunnerError::PipelineError(_)));
}
