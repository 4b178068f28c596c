use async_trait::async_trait;
use docflow_core::{
    Component, ComponentBase, ComponentError, DataPacket, InputSocket, SocketSchema, SocketType,
    SocketValues,
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashMap};

lazy_static! {
    // {% for item in items %} ... {% endfor %}, not nested
    static ref FOR_BLOCK: Regex = Regex::new(
        r"(?s)\{%-?\s*for\s+([A-Za-z_]\w*)\s+in\s+([A-Za-z_]\w*(?:\.\w+)*)\s*-?%\}(.*?)\{%-?\s*endfor\s*-?%\}"
    ).unwrap();

    // {{ name }} or {{ name.field }}
    static ref VARIABLE: Regex = Regex::new(
        r"\{\{\s*([A-Za-z_]\w*(?:\.\w+)*)\s*\}\}"
    ).unwrap();
}

/// Renders a prompt from a template
///
/// Supports `{{ var }}` substitution with dotted field access and
/// non-nested `{% for item in items %}...{% endfor %}` blocks. Every
/// top-level template variable becomes an optional input socket; missing
/// variables render as empty text.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
    variables: BTreeSet<String>,
    required_variables: Vec<String>,
}

impl PromptBuilder {
    /// Create a builder for `template`
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let variables = template_variables(&template);
        Self {
            template,
            variables,
            required_variables: Vec::new(),
        }
    }

    /// Make some template variables required inputs
    pub fn with_required_variables(mut self, required: Vec<String>) -> Result<Self, ComponentError> {
        if let Some(unknown) = required.iter().find(|name| !self.variables.contains(*name)) {
            return Err(ComponentError::ConfigurationError(format!(
                "required variable '{}' does not appear in the template",
                unknown
            )));
        }
        self.required_variables = required;
        Ok(self)
    }

    /// Variables the template reads, sorted
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(String::as_str)
    }

    /// Render the template against `context`
    pub fn render(&self, context: &Map<String, Value>) -> String {
        let mut rendered = String::with_capacity(self.template.len());
        let mut last = 0;
        for block in FOR_BLOCK.captures_iter(&self.template) {
            let (start, end) = match block.get(0) {
                Some(m) => (m.start(), m.end()),
                None => continue,
            };
            rendered.push_str(&substitute(&self.template[last..start], context));
            rendered.push_str(&render_loop(&block, context));
            last = end;
        }
        rendered.push_str(&substitute(&self.template[last..], context));
        rendered
    }
}

fn render_loop(block: &Captures<'_>, context: &Map<String, Value>) -> String {
    let (item_name, iterable, body) = (&block[1], &block[2], &block[3]);
    let items = match lookup(context, iterable) {
        Some(Value::Array(items)) => items.clone(),
        _ => return String::new(),
    };

    let mut scope = context.clone();
    items
        .into_iter()
        .map(|item| {
            scope.insert(item_name.to_string(), item);
            substitute(body, &scope)
        })
        .collect()
}

fn substitute(text: &str, context: &Map<String, Value>) -> String {
    VARIABLE
        .replace_all(text, |caps: &Captures<'_>| {
            lookup(context, &caps[1]).map(to_text).unwrap_or_default()
        })
        .into_owned()
}

fn lookup<'a>(context: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Top-level names the template reads; loop variables are bound inside their block
fn template_variables(template: &str) -> BTreeSet<String> {
    let root = |path: &str| path.split('.').next().unwrap_or(path).to_string();
    let mut variables = BTreeSet::new();

    let outside = FOR_BLOCK.replace_all(template, "");
    for caps in VARIABLE.captures_iter(&outside) {
        variables.insert(root(&caps[1]));
    }

    for block in FOR_BLOCK.captures_iter(template) {
        variables.insert(root(&block[2]));
        for caps in VARIABLE.captures_iter(&block[3]) {
            let name = root(&caps[1]);
            if name != block[1] {
                variables.insert(name);
            }
        }
    }
    variables
}

impl ComponentBase for PromptBuilder {
    fn component_type(&self) -> &str {
        "PromptBuilder"
    }

    fn sockets(&self) -> SocketSchema {
        let mut schema = SocketSchema::new();
        for name in &self.variables {
            let socket = if self.required_variables.contains(name) {
                InputSocket::required(name.clone(), SocketType::Any)
            } else {
                InputSocket::optional(name.clone(), SocketType::Any)
            };
            schema = schema.with_input(socket);
        }
        schema.with_output("prompt", SocketType::String)
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("template".to_string(), json!(self.template));
        if !self.required_variables.is_empty() {
            params.insert("required_variables".to_string(), json!(self.required_variables));
        }
        params
    }
}

#[async_trait]
impl Component for PromptBuilder {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        if let Some(missing) = self.required_variables.iter().find(|name| !inputs.contains_key(*name)) {
            return Err(ComponentError::MissingInput(missing.clone()));
        }

        let context: Map<String, Value> = inputs
            .into_iter()
            .map(|(name, packet)| (name, packet.into_value()))
            .collect();

        let mut outputs = HashMap::new();
        outputs.insert("prompt".to_string(), DataPacket::new(Value::String(self.render(&context))));
        Ok(outputs)
    }
}
