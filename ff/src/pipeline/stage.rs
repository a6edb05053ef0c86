//! Stage trait and the pieces every stage shares

use async_trait::async_trait;
use tracing::debug;

use crate::capability::{OutputSchema, StepBudget};
use crate::llm::Message;
use crate::prompts::{PromptContext, PromptLoader};
use crate::tools::ToolContext;

use super::error::PipelineError;
use super::signal::{Node, StageOutcome};
use super::state::PipelineState;

/// Per-run resources handed to every stage
pub struct RunContext {
    pub steps: StepBudget,
    pub tools: ToolContext,
}

impl RunContext {
    pub fn new(recursion_limit: u32, project_context: &str, run_id: &str) -> Self {
        Self {
            steps: StepBudget::new(recursion_limit),
            tools: ToolContext::new(project_context, run_id),
        }
    }
}

/// One node of the graph
///
/// Stages never mutate state; they return an outcome whose patch the
/// orchestrator applies.
#[async_trait]
pub trait Stage: Send + Sync {
    fn node(&self) -> Node;

    async fn run(&self, state: &PipelineState, run: &RunContext) -> Result<StageOutcome, PipelineError>;
}

/// The three artifact kinds with a generate/review pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    UserStories,
    AcceptanceCriteria,
    Tasks,
}

impl ArtifactKind {
    pub fn generation_node(&self) -> Node {
        match self {
            ArtifactKind::UserStories => Node::GenerateUserStories,
            ArtifactKind::AcceptanceCriteria => Node::GenerateAcceptanceCriteria,
            ArtifactKind::Tasks => Node::GenerateTasks,
        }
    }

    pub fn verification_node(&self) -> Node {
        match self {
            ArtifactKind::UserStories => Node::ReviewUserStories,
            ArtifactKind::AcceptanceCriteria => Node::ReviewAcceptanceCriteria,
            ArtifactKind::Tasks => Node::ReviewTasks,
        }
    }

    /// Template (and config section) name of the generation stage
    pub fn generation_template(&self) -> &'static str {
        match self {
            ArtifactKind::UserStories => "user-story-creation",
            ArtifactKind::AcceptanceCriteria => "acceptance-criteria-creation",
            ArtifactKind::Tasks => "tasks-creation",
        }
    }

    /// Template (and config section) name of the verification stage
    pub fn verification_template(&self) -> &'static str {
        match self {
            ArtifactKind::UserStories => "check-user-story-quality",
            ArtifactKind::AcceptanceCriteria => "check-acceptance-criteria-quality",
            ArtifactKind::Tasks => "check-tasks-quality",
        }
    }

    pub fn output_schema(&self) -> OutputSchema {
        match self {
            ArtifactKind::UserStories => OutputSchema::user_stories(),
            ArtifactKind::AcceptanceCriteria => OutputSchema::acceptance_criteria(),
            ArtifactKind::Tasks => OutputSchema::tasks(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::UserStories => "user stories",
            ArtifactKind::AcceptanceCriteria => "acceptance criteria",
            ArtifactKind::Tasks => "tasks",
        }
    }
}

/// Render a stage prompt, mapping template failures to a fatal error
pub(crate) fn render_prompt(
    prompts: &PromptLoader,
    template: &str,
    inline: Option<&str>,
    context: &PromptContext,
) -> Result<String, PipelineError> {
    debug!(%template, "render_prompt: called");
    prompts
        .render(template, inline, context)
        .map_err(|e| PipelineError::Prompt(e.to_string()))
}

/// User message closing every capability request
pub(crate) fn instruction_message(state: Option<&PipelineState>, tool_name: &str) -> Message {
    match state {
        Some(state) if !state.transcript.is_empty() => Message::user(format!(
            "Conversation so far:\n\n{}\n\nReturn the output using the {} tool.",
            state.transcript_text(),
            tool_name
        )),
        _ => Message::user(format!("Return the output using the {} tool.", tool_name)),
    }
}
