//! Tool system for pipeline agents
//!
//! Tools are read-only lookups an agent may call mid-reasoning. Each
//! capability invocation gets a `ToolContext` carrying the run's immutable
//! inputs; the orchestrator itself never calls a tool.

mod context;
mod executor;
mod traits;

pub mod builtin;

pub use context::ToolContext;
pub use executor::ToolExecutor;
pub use traits::{Tool, ToolResult};
