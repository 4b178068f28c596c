use crate::error::DslError;
use docflow_core::{Component, ComponentError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Factory function to create components from their init parameters
pub type ComponentFactory =
    Arc<dyn Fn(&Map<String, Value>) -> Result<Arc<dyn Component>, ComponentError> + Send + Sync>;

/// Maps type identifiers to component factories
///
/// The registry is an explicit value handed to the loader; nothing is
/// registered globally.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, ComponentFactory>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("component_types", &self.component_types())
            .finish()
    }
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `component_type`, replacing any previous one
    pub fn register<F, C>(&mut self, component_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Map<String, Value>) -> Result<C, ComponentError> + Send + Sync + 'static,
        C: Component + 'static,
    {
        let factory: ComponentFactory = Arc::new(move |params: &Map<String, Value>| {
            factory(params).map(|component| Arc::new(component) as Arc<dyn Component>)
        });
        self.factories.insert(component_type.into(), factory);
        self
    }

    /// Builder form of [`ComponentRegistry::register`]
    pub fn with<F, C>(mut self, component_type: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<C, ComponentError> + Send + Sync + 'static,
        C: Component + 'static,
    {
        self.register(component_type, factory);
        self
    }

    /// Merge another registry into this one; entries from `other` win
    pub fn extend(&mut self, other: ComponentRegistry) {
        self.factories.extend(other.factories);
    }

    /// Whether a factory exists for `component_type`
    pub fn contains(&self, component_type: &str) -> bool {
        self.factories.contains_key(component_type)
    }

    /// Registered type identifiers, sorted
    pub fn component_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Build the component named `component` of type `component_type`
    pub fn create(
        &self,
        component: &str,
        component_type: &str,
        params: &Map<String, Value>,
    ) -> Result<Arc<dyn Component>, DslError> {
        let factory = self
            .factories
            .get(component_type)
            .ok_or_else(|| DslError::UnknownComponentType {
                component: component.to_string(),
                component_type: component_type.to_string(),
            })?;
        factory(params).map_err(|cause| DslError::from_factory(component, cause))
    }
}

/// Read an optional init parameter, falling back to a default
pub fn param_or<T>(params: &Map<String, Value>, key: &str, default: T) -> Result<T, ComponentError>
where
    T: serde::de::DeserializeOwned,
{
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            ComponentError::ConfigurationError(format!("init parameter '{}': {}", key, e))
        }),
    }
}

/// Read a required init parameter
pub fn param<T>(params: &Map<String, Value>, key: &str) -> Result<T, ComponentError>
where
    T: serde::de::DeserializeOwned,
{
    let value = params.get(key).ok_or_else(|| {
        ComponentError::ConfigurationError(format!("missing init parameter '{}'", key))
    })?;
    serde_json::from_value(value.clone())
        .map_err(|e| ComponentError::ConfigurationError(format!("init parameter '{}': {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_helpers() {
        let params = json!({"split_length": 150, "split_by": "word", "missing": null})
            .as_object()
            .cloned()
            .unwrap();

        assert_eq!(param::<usize>(&params, "split_length").unwrap(), 150);
        assert_eq!(param_or(&params, "split_overlap", 0usize).unwrap(), 0);
        assert_eq!(param_or(&params, "missing", 7usize).unwrap(), 7);
        assert!(matches!(
            param::<usize>(&params, "split_by"),
            Err(ComponentError::ConfigurationError(_))
        ));
        assert!(param::<String>(&params, "absent").is_err());
    }

    #[test]
    fn test_unknown_type() {
        let registry = ComponentRegistry::new();
        let err = registry.create("llm", "Generator", &Map::new()).err().unwrap();
        assert_eq!(err.error_code(), "ERR_DSL_UNKNOWN_COMPONENT_TYPE");
        assert!(registry.component_types().is_empty());
    }
}
