//! Dispatch of tool calls to the tools an agent is offered

use tracing::debug;

use crate::llm::{ToolCall, ToolDefinition};

use super::builtin::ProjectContextTool;
use super::{Tool, ToolContext, ToolResult};

/// The lookup tools offered alongside an agent's submit tool
pub struct ToolExecutor {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Every agent gets the same read-only set
    pub fn standard() -> Self {
        Self::with_tools(vec![Box::new(ProjectContextTool)])
    }

    pub fn with_tools(mut tools: Vec<Box<dyn Tool>>) -> Self {
        tools.sort_by_key(|t| t.name());
        Self { tools }
    }

    fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// Definitions in name order, so requests are stable across runs
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.input_schema()))
            .collect()
    }

    /// Unknown names come back as an error result for the model to see
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        debug!(tool = %call.name, run_id = %ctx.run_id, "ToolExecutor::execute: called");
        match self.find(&call.name) {
            Some(tool) => tool.execute(call.input.clone(), ctx).await,
            None => ToolResult::failure(format!("Unknown tool: {}", call.name)),
        }
    }
}
