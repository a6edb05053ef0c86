//! Tool trait definition

use async_trait::async_trait;
use serde_json::{Value, json};

use super::context::ToolContext;

/// A read-only lookup an agent may call before submitting
///
/// Tools never change run state; they only read from the `ToolContext`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model calls the tool by
    fn name(&self) -> &'static str;

    /// Shown to the model next to the name
    fn description(&self) -> &'static str;

    /// JSON Schema for the tool input; lookups take no arguments by default
    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult;
}

/// What a tool call hands back to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// A result the model sees as a failed call
    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}
