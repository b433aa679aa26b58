//! Tool definition types.
//!
//! A [`ToolDefinition`] describes a tool to the LLM: its name, a natural
//! language description, and a JSON Schema for its parameters. Execution is
//! delegated to an injected capability; this crate only owns the shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a tool exposed to the LLM.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (unique within a registry).
    pub name: String,
    /// Natural-language description shown to the model.
    pub description: String,
    /// JSON Schema for the tool arguments.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definition_serde_roundtrip() {
        let def = ToolDefinition::new(
            "search",
            "Search the docs",
            json!({"type": "object", "properties": {"q": {"type": "string"}}}),
        );
        let json = serde_json::to_string(&def).unwrap();
        let back: ToolDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(def, back);
    }

    #[test]
    fn parameters_carry_schema() {
        let def = ToolDefinition::new("read", "Read a file", json!({"type": "object"}));
        assert_eq!(def.parameters["type"], "object");
    }
}
