use crate::document::{ComponentDocument, ConnectionDocument, PipelineDocument};
use crate::error::DslError;
use crate::registry::ComponentRegistry;
use docflow_core::{Pipeline, PipelineError, ValidationIssue};
use serde_yaml::Value as YamlValue;
use tracing::{debug, info};

/// Capture a pipeline as a declarative document
pub fn dump(pipeline: &Pipeline) -> PipelineDocument {
    let components = pipeline
        .component_names()
        .filter_map(|name| {
            pipeline.component(name).map(|component| {
                (
                    name.to_string(),
                    ComponentDocument {
                        component_type: component.component_type().to_string(),
                        init_parameters: component.init_parameters(),
                    },
                )
            })
        })
        .collect();

    let connections = pipeline
        .connections()
        .iter()
        .map(|connection| ConnectionDocument {
            sender: connection.sender_path(),
            receiver: connection.receiver_path(),
            is_loop: connection.is_loop,
        })
        .collect();

    PipelineDocument {
        components,
        connections,
        max_loops_allowed: pipeline.max_loop_iterations(),
        metadata: pipeline.metadata().clone(),
    }
}

/// Serialize a pipeline to YAML
pub fn dumps(pipeline: &Pipeline) -> Result<String, DslError> {
    Ok(serde_yaml::to_string(&dump(pipeline))?)
}

/// Serialize a pipeline to JSON
pub fn to_json(pipeline: &Pipeline) -> Result<String, DslError> {
    Ok(serde_json::to_string_pretty(&dump(pipeline))?)
}

/// Rebuild a pipeline from a declarative document
///
/// Either the complete pipeline is returned or nothing is: wiring errors
/// and structural validation issues are collected and reported together.
pub fn load(document: &PipelineDocument, registry: &ComponentRegistry) -> Result<Pipeline, DslError> {
    let mut pipeline = Pipeline::new()
        .with_max_loop_iterations(document.max_loops_allowed)
        .with_metadata(document.metadata.clone());

    for (name, entry) in &document.components {
        let component = registry.create(name, &entry.component_type, &entry.init_parameters)?;
        debug!(component = %name, component_type = %entry.component_type, "Created component");
        pipeline.add_shared_component(name.clone(), component)?;
    }

    let mut issues: Vec<ValidationIssue> = Vec::new();
    for connection in &document.connections {
        let result = if connection.is_loop {
            pipeline.connect_loop(&connection.sender, &connection.receiver)
        } else {
            pipeline.connect(&connection.sender, &connection.receiver)
        };
        if let Err(err) = result {
            issues.push(err.into_issue());
        }
    }

    if let Err(err) = pipeline.validate() {
        issues.extend(err.issues().iter().cloned());
    }

    if !issues.is_empty() {
        return Err(PipelineError::GraphValidation(issues).into());
    }

    info!(
        components = pipeline.len(),
        connections = pipeline.connections().len(),
        "Pipeline loaded"
    );
    Ok(pipeline)
}

/// Parse YAML into a document, refusing tags
pub fn parse_yaml(yaml: &str) -> Result<PipelineDocument, DslError> {
    let raw: YamlValue = serde_yaml::from_str(yaml)?;
    reject_tags(&raw, "$")?;
    Ok(serde_yaml::from_value(raw)?)
}

/// Rebuild a pipeline from YAML
pub fn loads(yaml: &str, registry: &ComponentRegistry) -> Result<Pipeline, DslError> {
    load(&parse_yaml(yaml)?, registry)
}

/// Rebuild a pipeline from JSON
pub fn from_json(json: &str, registry: &ComponentRegistry) -> Result<Pipeline, DslError> {
    let document: PipelineDocument = serde_json::from_str(json)?;
    load(&document, registry)
}

fn reject_tags(value: &YamlValue, path: &str) -> Result<(), DslError> {
    match value {
        YamlValue::Tagged(tagged) => Err(DslError::ExecutableContent {
            tag: tagged.tag.to_string(),
            path: path.to_string(),
        }),
        YamlValue::Sequence(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| reject_tags(item, &format!("{}[{}]", path, i))),
        YamlValue::Mapping(map) => map.iter().try_for_each(|(key, item)| {
            let segment = key.as_str().map(str::to_string).unwrap_or_else(|| format!("{:?}", key));
            reject_tags(key, path)?;
            reject_tags(item, &format!("{}.{}", path, segment))
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_refused() {
        let yaml = r#"
components:
  evil:
    type: Passthrough
    init_parameters:
      payload: !!python/object/apply:os.system ["rm -rf /"]
"#;
        let err = parse_yaml(yaml).unwrap_err();
        match err {
            DslError::ExecutableContent { path, .. } => {
                assert_eq!(path, "$.components.evil.init_parameters.payload")
            }
            other => panic!("Expected ExecutableContent, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_yaml_syntax() {
        let err = parse_yaml("components: [unclosed").unwrap_err();
        assert_eq!(err.error_code(), "ERR_DSL_YAML_PARSE");
    }

    #[test]
    fn test_unknown_component_type() {
        let yaml = r#"
components:
  llm:
    type: OpenAIGenerator
"#;
        let err = loads(yaml, &ComponentRegistry::new()).unwrap_err();
        assert!(matches!(
            err,
            DslError::UnknownComponentType { ref component, ref component_type }
                if component == "llm" && component_type == "OpenAIGenerator"
        ));
    }

    #[test]
    fn test_empty_document_loads() {
        let pipeline = loads("{}", &ComponentRegistry::new()).unwrap();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.max_loop_iterations(), 100);
    }
}
