//! ToolContext - execution context for tools

use tracing::debug;

/// Execution context for tools - scoped to a single run
///
/// Holds the run's immutable inputs. Tools only read from it.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Free-text project context supplied with the run
    pub project_context: String,

    /// Run id, for log correlation
    pub run_id: String,
}

impl ToolContext {
    /// Create a new tool context
    pub fn new(project_context: impl Into<String>, run_id: impl Into<String>) -> Self {
        let project_context = project_context.into();
        let run_id = run_id.into();
        debug!(%run_id, context_len = project_context.len(), "ToolContext::new: called");
        Self {
            project_context,
            run_id,
        }
    }
}
