//! ProjectContext tool - read-only access to the run's project context

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolResult};

/// Returns the free-text project context supplied with the run
pub struct ProjectContextTool;

#[async_trait]
impl Tool for ProjectContextTool {
    fn name(&self) -> &'static str {
        "get_project_context"
    }

    fn description(&self) -> &'static str {
        "Get the project context (product, users, constraints) to ground user stories, acceptance criteria and tasks."
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(run_id = %ctx.run_id, "ProjectContextTool::execute: called");
        if ctx.project_context.trim().is_empty() {
            return ToolResult::text("No project context was provided for this run.");
        }
        ToolResult::text(ctx.project_context.clone())
    }
}
