//! Typed access to tool call arguments.

use crate::error::AgentError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Parse arguments as the model emits them (a JSON string, possibly empty).
    pub fn from_json_str(raw: &str) -> Result<Self, AgentError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(serde_json::json!({})));
        }
        let value = serde_json::from_str(trimmed).map_err(|e| {
            AgentError::InvalidArgument(format!("Tool arguments must be valid JSON: {e}"))
        })?;
        Ok(Self::new(value))
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn into_raw(self) -> serde_json::Value {
        self.value
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an optional float argument.
    pub fn get_f64_opt(&self, key: &str) -> Option<f64> {
        self.value.get(key).and_then(|v| v.as_f64())
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, AgentError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            AgentError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_string_parses_as_empty_object() {
        let args = ToolArguments::from_json_str("  ").unwrap();
        assert_eq!(args.raw(), &json!({}));
    }

    #[test]
    fn malformed_json_is_invalid_argument() {
        let err = ToolArguments::from_json_str(r#"{"a":"#).expect_err("should reject");
        assert!(matches!(err, AgentError::InvalidArgument(message) if message.contains("valid JSON")));
    }

    #[test]
    fn typed_accessors_read_fields() {
        let args = ToolArguments::new(json!({"name": "x", "n": 2.5}));
        assert_eq!(args.get_str_opt("name"), Some("x"));
        assert_eq!(args.get_f64_opt("n"), Some(2.5));
        assert_eq!(args.get_str_opt("n"), None);
    }

    #[test]
    fn deserialize_into_struct() {
        #[derive(serde::Deserialize)]
        struct Params {
            query: String,
        }
        let params: Params = ToolArguments::new(json!({"query": "rust"}))
            .deserialize()
            .unwrap();
        assert_eq!(params.query, "rust");
    }
}
