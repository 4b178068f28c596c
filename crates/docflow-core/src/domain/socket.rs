use crate::types::DataPacket;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared type of a socket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketType {
    /// Accepts or produces anything
    Any,
    /// UTF-8 text
    String,
    /// Integer or float
    Number,
    /// true / false
    Boolean,
    /// Free-form key/value mapping
    Mapping,
    /// A single document
    Document,
    /// A numeric vector
    Embedding,
    /// Homogeneous list
    List(Box<SocketType>),
}

impl SocketType {
    /// Shorthand for `List(inner)`
    pub fn list(inner: SocketType) -> Self {
        SocketType::List(Box::new(inner))
    }

    /// Shorthand for `List(Document)`, the most common socket type
    pub fn documents() -> Self {
        SocketType::list(SocketType::Document)
    }

    /// Whether a receiver of this type accepts values produced as `sender`
    pub fn accepts(&self, sender: &SocketType) -> bool {
        match (self, sender) {
            (SocketType::Any, _) | (_, SocketType::Any) => true,
            (SocketType::List(receiver), SocketType::List(sender)) => receiver.accepts(sender),
            (receiver, sender) => receiver == sender,
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketType::Any => write!(f, "Any"),
            SocketType::String => write!(f, "String"),
            SocketType::Number => write!(f, "Number"),
            SocketType::Boolean => write!(f, "Boolean"),
            SocketType::Mapping => write!(f, "Mapping"),
            SocketType::Document => write!(f, "Document"),
            SocketType::Embedding => write!(f, "Embedding"),
            SocketType::List(inner) => write!(f, "List[{}]", inner),
        }
    }
}

impl FromStr for SocketType {
    type Err = String;

    /// Parse the [`fmt::Display`] form, e.g. `"List[Document]"`
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if let Some(inner) = raw.strip_prefix("List[").and_then(|r| r.strip_suffix(']')) {
            return inner.parse().map(SocketType::list);
        }
        match raw {
            "Any" => Ok(SocketType::Any),
            "String" => Ok(SocketType::String),
            "Number" => Ok(SocketType::Number),
            "Boolean" => Ok(SocketType::Boolean),
            "Mapping" => Ok(SocketType::Mapping),
            "Document" => Ok(SocketType::Document),
            "Embedding" => Ok(SocketType::Embedding),
            other => Err(format!("unknown socket type '{}'", other)),
        }
    }
}

/// An input port on a component
#[derive(Debug, Clone, PartialEq)]
pub struct InputSocket {
    /// Socket name, unique among the component's inputs
    pub name: String,

    /// Declared type
    pub socket_type: SocketType,

    /// Whether a value must arrive before the component may run
    pub required: bool,

    /// Value used when nothing is delivered
    pub default: Option<DataPacket>,

    /// Accepts several producers; the component merges their values
    pub joinable: bool,
}

impl InputSocket {
    /// A required input with no default
    pub fn required(name: impl Into<String>, socket_type: SocketType) -> Self {
        Self {
            name: name.into(),
            socket_type,
            required: true,
            default: None,
            joinable: false,
        }
    }

    /// An optional input; absent from the run inputs when nothing arrives
    pub fn optional(name: impl Into<String>, socket_type: SocketType) -> Self {
        Self {
            required: false,
            ..Self::required(name, socket_type)
        }
    }

    /// Use `value` when nothing is delivered; the socket becomes optional
    pub fn with_default(mut self, value: DataPacket) -> Self {
        self.default = Some(value);
        self.required = false;
        self
    }

    /// Allow several producers on this socket
    pub fn joinable(mut self) -> Self {
        self.joinable = true;
        self
    }
}

/// An output port on a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSocket {
    /// Socket name, unique among the component's outputs
    pub name: String,

    /// Declared type
    pub socket_type: SocketType,
}

/// The static socket declaration of a component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocketSchema {
    /// Input sockets in declaration order
    pub inputs: Vec<InputSocket>,

    /// Output sockets in declaration order
    pub outputs: Vec<OutputSocket>,
}

impl SocketSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input socket
    pub fn with_input(mut self, socket: InputSocket) -> Self {
        self.inputs.push(socket);
        self
    }

    /// Add an output socket
    pub fn with_output(mut self, name: impl Into<String>, socket_type: SocketType) -> Self {
        self.outputs.push(OutputSocket {
            name: name.into(),
            socket_type,
        });
        self
    }

    /// Look up an input socket
    pub fn input(&self, name: &str) -> Option<&InputSocket> {
        self.inputs.iter().find(|s| s.name == name)
    }

    /// Look up an output socket
    pub fn output(&self, name: &str) -> Option<&OutputSocket> {
        self.outputs.iter().find(|s| s.name == name)
    }
}

/// A `"component"` or `"component.socket"` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketPath {
    /// Component name
    pub component: String,
    /// Socket name, if given
    pub socket: Option<String>,
}

impl SocketPath {
    /// Parse a socket path
    ///
    /// Only the first '.' separates the component from the socket, so
    /// socket names such as `text/plain` or `a.b` survive intact.
    pub fn parse(path: &str) -> Self {
        match path.split_once('.') {
            Some((component, socket)) => Self {
                component: component.to_string(),
                socket: Some(socket.to_string()),
            },
            None => Self {
                component: path.to_string(),
                socket: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_display_form() {
        for ty in [
            SocketType::Any,
            SocketType::Number,
            SocketType::documents(),
            SocketType::list(SocketType::list(SocketType::String)),
        ] {
            assert_eq!(ty.to_string().parse::<SocketType>(), Ok(ty));
        }
        assert!("Text".parse::<SocketType>().is_err());
    }

    #[test]
    fn test_type_compatibility() {
        assert!(SocketType::String.accepts(&SocketType::String));
        assert!(!SocketType::String.accepts(&SocketType::Number));
        assert!(SocketType::Any.accepts(&SocketType::documents()));
        assert!(SocketType::documents().accepts(&SocketType::Any));
        assert!(SocketType::list(SocketType::Any).accepts(&SocketType::documents()));
        assert!(!SocketType::documents().accepts(&SocketType::list(SocketType::String)));
    }

    #[test]
    fn test_type_display() {
        assert_eq!(SocketType::documents().to_string(), "List[Document]");
        assert_eq!(
            SocketType::list(SocketType::list(SocketType::Number)).to_string(),
            "List[List[Number]]"
        );
    }

    #[test]
    fn test_default_makes_socket_optional() {
        let socket = InputSocket::required("top_k", SocketType::Number)
            .with_default(DataPacket::new(json!(10)));
        assert!(!socket.required);
        assert_eq!(socket.default, Some(DataPacket::new(json!(10))));
    }

    #[test]
    fn test_socket_path_parse() {
        assert_eq!(
            SocketPath::parse("router.text/plain"),
            SocketPath {
                component: "router".to_string(),
                socket: Some("text/plain".to_string())
            }
        );
        assert_eq!(SocketPath::parse("llm").socket, None);
        assert_eq!(SocketPath::parse("a.b.c").socket.as_deref(), Some("b.c"));
    }

    #[test]
    fn test_schema_lookup() {
        let schema = SocketSchema::new()
            .with_input(InputSocket::required("query", SocketType::String))
            .with_output("documents", SocketType::documents());
        assert!(schema.input("query").is_some());
        assert!(schema.input("documents").is_none());
        assert!(schema.output("documents").is_some());
    }
}
