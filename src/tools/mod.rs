//! Tool registry for the response generator
//!
//! Tools are registered once at bootstrap and advertised to the model on
//! every completion. Execution errors are returned as typed errors; the
//! agent converts them to feedback text for the model, never letting them
//! reach the pipeline.

mod contact_tech;
mod scheduling;

pub use contact_tech::ContactTechnician;
pub use scheduling::{BookingIntent, CalendarService, ScheduleVisit};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::ToolSpec;
use crate::{Error, Result};

/// A callable tool exposed to the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable name the model calls the tool by
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// JSON Schema of the tool's arguments
    fn parameters(&self) -> Value;

    /// Run the tool with model-supplied arguments.
    ///
    /// # Errors
    ///
    /// Returns `Error::Tool` on execution failure; the caller feeds the
    /// message back to the model as text.
    async fn execute(&self, args: Value) -> Result<String>;
}

/// Name-keyed collection of tools
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Declarations for every registered tool, for the model request
    #[must_use]
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .values()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Execute a tool by name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Tool` for an unknown name or a failing execution.
    pub async fn execute(&self, name: &str, args: Value) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::Tool(format!("unknown tool: {name}")))?;
        tool.execute(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "repeats its input"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn execute(&self, args: Value) -> Result<String> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[tokio::test]
    async fn executes_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let out = registry.execute("echo", json!({"text": "oi"})).await.unwrap();
        assert_eq!(out, "oi");
    }

    #[tokio::test]
    async fn unknown_tool_is_a_typed_error() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn specs_are_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
    }
}
