//! FeatureForge - feature breakdown pipeline
//!
//! Turns a free-text feature description into a `Feature` → `UserStory` →
//! {acceptance criteria, `Task`} hierarchy. A fixed graph of generation,
//! verification, selection, completion and finalization stages runs with
//! bounded revision loops; an LLM does the writing.
//!
//! # Modules
//!
//! - [`pipeline`] - Stage graph, routing table and orchestrator
//! - [`capability`] - Agent tool-use loop, output schemas and decoding
//! - [`domain`] - Work items and the exchange document
//! - [`llm`] - LLM client trait with Anthropic and OpenAI implementations
//! - [`prompts`] - Handlebars prompt templates
//! - [`tools`] - Read-only context tools offered to agents
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod capability;
pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod tools;

// Re-export commonly used types
pub use config::{Config, LlmConfig, PipelineConfig};
pub use domain::{Feature, Task, UnitId, UserStory};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, create_client};
pub use pipeline::{Orchestrator, PipelineError, PipelineState};
