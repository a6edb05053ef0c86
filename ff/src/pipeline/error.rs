//! Fatal pipeline errors

use thiserror::Error;

use crate::capability::{CapabilityError, StepBudgetExceeded};
use crate::llm::LlmError;

use super::signal::{Node, SignalTag};

/// Errors that abort a run
///
/// Malformed capability output is not here: it is a `DecodeError` carried
/// by `StageOutcome::Error` and only becomes fatal as
/// `DecodeRetriesExhausted`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("capability call failed: {0}")]
    Capability(#[from] LlmError),

    #[error("step budget of {limit} exhausted")]
    StepBudgetExceeded { limit: u32 },

    #[error("{node} produced malformed output {attempts} times in a row")]
    DecodeRetriesExhausted { node: Node, attempts: u32 },

    #[error("{node} has no route for signal {signal}")]
    InvalidTransition { node: Node, signal: SignalTag },

    #[error("pipeline invariant violated: {0}")]
    Invariant(String),

    #[error("prompt error: {0}")]
    Prompt(String),
}

impl From<StepBudgetExceeded> for PipelineError {
    fn from(e: StepBudgetExceeded) -> Self {
        PipelineError::StepBudgetExceeded { limit: e.limit }
    }
}

impl From<CapabilityError> for PipelineError {
    fn from(e: CapabilityError) -> Self {
        match e {
            CapabilityError::Llm(e) => PipelineError::Capability(e),
            CapabilityError::Budget(e) => e.into(),
        }
    }
}
