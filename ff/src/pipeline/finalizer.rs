//! Finalizer - synthesize the feature header and assemble the result

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::capability::{Agent, AgentRequest, OutputSchema, decode};
use crate::config::AgentConfig;
use crate::domain::{Feature, FeatureHeader, render_stories};
use crate::prompts::{PromptContext, PromptLoader};

use super::error::PipelineError;
use super::signal::{Node, StageOutcome};
use super::stage::{RunContext, Stage, instruction_message, render_prompt};
use super::state::{PipelineState, StatePatch, TranscriptEntry, TranscriptRole};

const TEMPLATE: &str = "feature-creation";

pub struct Finalizer {
    agent: Arc<Agent>,
    prompts: Arc<PromptLoader>,
    config: AgentConfig,
}

impl Finalizer {
    pub fn new(agent: Arc<Agent>, prompts: Arc<PromptLoader>, config: AgentConfig) -> Self {
        debug!("Finalizer::new: called");
        Self { agent, prompts, config }
    }
}

/// Attach each story's current acceptance criteria and tasks
///
/// Artifacts are looked up by unit id, never by position. Every story must
/// be processed and have both artifacts. Running it twice on the same
/// state gives the same feature.
pub fn assemble_feature(header: FeatureHeader, state: &PipelineState) -> Result<Feature, PipelineError> {
    debug!(stories = state.user_stories.len(), "assemble_feature: called");
    let mut user_stories = Vec::with_capacity(state.user_stories.len());

    for story in &state.user_stories {
        if !story.processed {
            return Err(PipelineError::Invariant(format!(
                "user story {} reached finalization unprocessed",
                story.id
            )));
        }
        let criteria = state
            .acceptance_criteria
            .current(&story.id)
            .ok_or_else(|| PipelineError::Invariant(format!("no acceptance criteria recorded for {}", story.id)))?;
        let tasks = state
            .tasks
            .current(&story.id)
            .ok_or_else(|| PipelineError::Invariant(format!("no tasks recorded for {}", story.id)))?;

        let mut story = story.clone();
        story.acceptance_criteria = criteria.clone();
        story.tasks = tasks.clone();
        user_stories.push(story);
    }

    Ok(Feature {
        title: header.title,
        description: header.description,
        user_stories,
    })
}

#[async_trait]
impl Stage for Finalizer {
    fn node(&self) -> Node {
        Node::Finalize
    }

    async fn run(&self, state: &PipelineState, run: &RunContext) -> Result<StageOutcome, PipelineError> {
        debug!(stories = state.user_stories.len(), "Finalizer::run: called");
        let output = OutputSchema::feature();
        let mut ctx = PromptContext::new(&state.feature_description, &state.project_context, output.tool_name);
        ctx.user_stories = Some(render_stories(&state.user_stories));
        let system_prompt = render_prompt(&self.prompts, TEMPLATE, self.config.prompt.as_deref(), &ctx)?;

        let request = AgentRequest {
            name: self.node().name(),
            system_prompt,
            messages: vec![instruction_message(None, output.tool_name)],
            output,
            model: self.config.model.clone(),
        };
        let result = self.agent.invoke(request, &run.tools, &run.steps).await?;
        let header: FeatureHeader = match decode(result) {
            Ok(header) => header,
            Err(e) => {
                warn!(error = %e, "Feature header could not be decoded");
                return Ok(StageOutcome::Error(e));
            }
        };

        let feature = assemble_feature(header, state)?;
        info!(title = %feature.title, stories = feature.user_stories.len(), "Assembled feature");

        Ok(StageOutcome::Finish(StatePatch {
            transcript: vec![TranscriptEntry::new(
                TranscriptRole::Ai,
                format!("Created feature '{}'", feature.title),
            )],
            final_output: Some(feature),
            ..Default::default()
        }))
    }
}
