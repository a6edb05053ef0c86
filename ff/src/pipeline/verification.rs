//! VerificationStage - critique the current artifact

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::capability::{Agent, AgentRequest, OutputSchema, ReviewOutput, decode};
use crate::config::CheckConfig;
use crate::domain::{render_criteria, render_stories, render_tasks};
use crate::prompts::{PromptContext, PromptLoader};

use super::error::PipelineError;
use super::signal::{Node, StageOutcome};
use super::stage::{ArtifactKind, RunContext, Stage, instruction_message, render_prompt};
use super::state::{PipelineState, StatePatch};

/// Reviews one artifact kind and either accepts it or asks for a revision
pub struct VerificationStage {
    kind: ArtifactKind,
    agent: Arc<Agent>,
    prompts: Arc<PromptLoader>,
    config: CheckConfig,
}

impl VerificationStage {
    pub fn new(kind: ArtifactKind, agent: Arc<Agent>, prompts: Arc<PromptLoader>, config: CheckConfig) -> Self {
        debug!(?kind, enabled = config.enabled, "VerificationStage::new: called");
        Self {
            kind,
            agent,
            prompts,
            config,
        }
    }

    /// Whether the artifact is accepted without asking the verifier
    fn skip(&self, state: &PipelineState) -> bool {
        !self.config.enabled || state.verification_attempts >= self.config.max_verification_attempts
    }

    fn prompt_context(&self, state: &PipelineState) -> Result<PromptContext, PipelineError> {
        let schema = OutputSchema::review();
        let mut ctx = PromptContext::new(&state.feature_description, &state.project_context, schema.tool_name)
            .with_feedback(&state.feedback);

        if self.kind == ArtifactKind::UserStories {
            ctx.user_stories = Some(render_stories(&state.user_stories));
            return Ok(ctx);
        }

        let story = state
            .current_story()
            .ok_or_else(|| PipelineError::Invariant("no current user story selected".to_string()))?;
        ctx.user_story = Some(story.summary());

        let criteria = state
            .acceptance_criteria
            .current(&story.id)
            .ok_or_else(|| PipelineError::Invariant(format!("no acceptance criteria recorded for {}", story.id)))?;
        ctx.acceptance_criteria = Some(render_criteria(criteria));

        if self.kind == ArtifactKind::Tasks {
            let tasks = state
                .tasks
                .current(&story.id)
                .ok_or_else(|| PipelineError::Invariant(format!("no tasks recorded for {}", story.id)))?;
            ctx.tasks = Some(render_tasks(tasks));
        }

        Ok(ctx)
    }
}

#[async_trait]
impl Stage for VerificationStage {
    fn node(&self) -> Node {
        self.kind.verification_node()
    }

    async fn run(&self, state: &PipelineState, run: &RunContext) -> Result<StageOutcome, PipelineError> {
        debug!(
            node = %self.node(),
            attempts = state.verification_attempts,
            "VerificationStage::run: called"
        );
        if self.skip(state) {
            debug!(node = %self.node(), "VerificationStage::run: accepting without review");
            return Ok(StageOutcome::Continue(StatePatch::accepted()));
        }

        let ctx = self.prompt_context(state)?;
        let system_prompt = render_prompt(
            &self.prompts,
            self.kind.verification_template(),
            self.config.prompt.as_deref(),
            &ctx,
        )?;
        let output = OutputSchema::review();
        let request = AgentRequest {
            name: self.node().name(),
            system_prompt,
            messages: vec![instruction_message(Some(state), output.tool_name)],
            output,
            model: self.config.model.clone(),
        };

        let result = self.agent.invoke(request, &run.tools, &run.steps).await?;
        let review: ReviewOutput = match decode(result) {
            Ok(review) => review,
            Err(e) => {
                warn!(node = %self.node(), error = %e, "Review output could not be decoded");
                return Ok(StageOutcome::Error(e));
            }
        };

        if review.needs_review {
            let attempts = state.verification_attempts + 1;
            info!(node = %self.node(), %attempts, "Revision requested for {}", self.kind.label());
            return Ok(StageOutcome::Review {
                feedback: review.feedback,
                patch: StatePatch {
                    verification_attempts: Some(attempts),
                    ..Default::default()
                },
            });
        }

        info!(node = %self.node(), "Accepted {}", self.kind.label());
        Ok(StageOutcome::Continue(StatePatch::accepted()))
    }
}
