//! Generation and verification capability
//!
//! An `Agent` turns a rendered prompt into either structured output (the
//! model called the stage's submit tool) or free text. Along the way it
//! may run read-only context tools. Every LLM turn and tool call draws
//! from the run's shared `StepBudget`.

mod agent;
mod budget;
mod decode;
mod schemas;

pub use agent::{Agent, AgentOutput, AgentRequest};
pub use budget::{StepBudget, StepBudgetExceeded};
pub use decode::{DecodeError, decode};
pub use schemas::{
    AcceptanceCriteriaOutput, OutputSchema, ReviewOutput, StoryDraft, TasksOutput, UserStoriesOutput,
};

use thiserror::Error;

use crate::llm::LlmError;

/// Failures of a capability invocation; all of them end the run
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Budget(#[from] StepBudgetExceeded),
}
