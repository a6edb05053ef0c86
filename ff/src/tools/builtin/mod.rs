//! Built-in tools for pipeline agents

mod project_context;

pub use project_context::ProjectContextTool;
