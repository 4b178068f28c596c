use crate::domain::document::Document;
use crate::error::ComponentError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a value travelling over a socket
///
/// This is a wrapper around a JSON value with helpers for the
/// payload shapes pipelines pass around most (documents, text, numbers).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DataPacket {
    /// The inner JSON value
    pub value: serde_json::Value,
}

/// Values keyed by socket name, as passed into and out of `Component::run`
pub type SocketValues = HashMap<String, DataPacket>;

/// Run-time inputs keyed by component name, then socket name
pub type RunInputs = HashMap<String, SocketValues>;

/// Run results keyed by component name, then output socket name
pub type PipelineOutputs = HashMap<String, SocketValues>;

impl DataPacket {
    /// Create a new data packet from a JSON value
    #[inline]
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Create a null data packet
    #[inline]
    pub fn null() -> Self {
        Self {
            value: serde_json::Value::Null,
        }
    }

    /// Get the inner JSON value
    #[inline]
    pub fn as_value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Take ownership of the inner JSON value
    #[inline]
    pub fn into_value(self) -> serde_json::Value {
        self.value
    }

    /// Check if the data packet is null
    #[inline]
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Try to convert the data packet to a string
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Try to convert the data packet to a number
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }

    /// Try to convert the data packet to a boolean
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }

    /// Try to convert the data packet to an array
    #[inline]
    pub fn as_array(&self) -> Option<&Vec<serde_json::Value>> {
        self.value.as_array()
    }

    /// Try to convert the data packet to a specific type
    pub fn to<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(self.value.clone())
    }

    /// Create a data packet from a serializable value
    pub fn from<T>(value: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize,
    {
        Ok(Self::new(serde_json::to_value(value)?))
    }

    /// Create a data packet from a string
    #[inline]
    pub fn from_string(s: &str) -> Self {
        Self::new(serde_json::Value::String(s.to_string()))
    }

    /// Create a data packet from a number
    #[inline]
    pub fn from_f64(n: f64) -> Self {
        match serde_json::Number::from_f64(n) {
            Some(num) => Self::new(serde_json::Value::Number(num)),
            None => Self::new(serde_json::Value::Null),
        }
    }

    /// Create a data packet holding a list of documents
    pub fn from_documents(documents: &[Document]) -> Self {
        Self::new(serde_json::Value::Array(
            documents.iter().map(Document::to_value).collect(),
        ))
    }

    /// Read the packet as a list of documents
    pub fn to_documents(&self) -> Result<Vec<Document>, ComponentError> {
        self.to::<Vec<Document>>()
            .map_err(|e| ComponentError::InvalidInput(format!("expected a list of documents: {}", e)))
    }

    /// Read the packet as a list of strings
    pub fn to_strings(&self) -> Result<Vec<String>, ComponentError> {
        self.to::<Vec<String>>()
            .map_err(|e| ComponentError::InvalidInput(format!("expected a list of strings: {}", e)))
    }
}

impl From<serde_json::Value> for DataPacket {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_packet_creation() {
        let packet = DataPacket::new(json!({"name": "test"}));
        assert_eq!(packet.as_value()["name"], "test");
    }

    #[test]
    fn test_data_packet_from_number() {
        let packet = DataPacket::from_f64(42.0);
        assert_eq!(packet.as_f64().unwrap(), 42.0);
        assert!(DataPacket::from_f64(f64::NAN).is_null());
    }

    #[test]
    fn test_data_packet_is_transparent_on_the_wire() {
        let packet = DataPacket::from_string("hello");
        assert_eq!(serde_json::to_string(&packet).unwrap(), "\"hello\"");
    }

    #[test]
    fn test_documents_packet() {
        let docs = vec![Document::from_text("one"), Document::from_text("two")];
        let packet = DataPacket::from_documents(&docs);
        assert_eq!(packet.to_documents().unwrap(), docs);
    }

    #[test]
    fn test_documents_packet_rejects_wrong_shape() {
        let packet = DataPacket::new(json!(42));
        let err = packet.to_documents().unwrap_err();
        assert!(matches!(err, ComponentError::InvalidInput(_)));
    }
}
