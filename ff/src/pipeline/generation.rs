//! GenerationStage - produce or revise an artifact and merge it

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::capability::{
    AcceptanceCriteriaOutput, Agent, AgentOutput, AgentRequest, DecodeError, TasksOutput, UserStoriesOutput, decode,
};
use crate::config::AgentConfig;
use crate::domain::{UnitId, UserStory, render_criteria, render_stories, render_tasks};
use crate::prompts::{PromptContext, PromptLoader};

use super::error::PipelineError;
use super::signal::{Node, StageOutcome};
use super::stage::{ArtifactKind, RunContext, Stage, instruction_message, render_prompt};
use super::state::{PipelineState, StatePatch, TranscriptEntry, TranscriptRole, UnitArtifact};

/// Generates user stories, acceptance criteria or tasks
pub struct GenerationStage {
    kind: ArtifactKind,
    agent: Arc<Agent>,
    prompts: Arc<PromptLoader>,
    config: AgentConfig,
}

impl GenerationStage {
    pub fn new(kind: ArtifactKind, agent: Arc<Agent>, prompts: Arc<PromptLoader>, config: AgentConfig) -> Self {
        debug!(?kind, "GenerationStage::new: called");
        Self {
            kind,
            agent,
            prompts,
            config,
        }
    }

    /// Build the prompt inputs for this kind from state
    fn prompt_context(&self, state: &PipelineState) -> Result<PromptContext, PipelineError> {
        let schema = self.kind.output_schema();
        let mut ctx = PromptContext::new(&state.feature_description, &state.project_context, schema.tool_name)
            .with_feedback(&state.feedback);
        // the prior attempt is only shown while revising
        let revising = !state.feedback.trim().is_empty();

        match self.kind {
            ArtifactKind::UserStories => {
                if revising && !state.user_stories.is_empty() {
                    ctx.previous_attempt = Some(render_stories(&state.user_stories));
                }
            }
            ArtifactKind::AcceptanceCriteria => {
                let story = current_story(state)?;
                ctx.user_story = Some(story.summary());
                if revising {
                    ctx.previous_attempt = state.acceptance_criteria.current(&story.id).map(|ac| render_criteria(ac));
                }
            }
            ArtifactKind::Tasks => {
                let story = current_story(state)?;
                let criteria = state.acceptance_criteria.current(&story.id).ok_or_else(|| {
                    PipelineError::Invariant(format!("no acceptance criteria recorded for {}", story.id))
                })?;
                ctx.user_story = Some(story.summary());
                ctx.acceptance_criteria = Some(render_criteria(criteria));
                if revising {
                    ctx.previous_attempt = state.tasks.current(&story.id).map(|t| render_tasks(t));
                }
            }
        }

        Ok(ctx)
    }

    /// Decode the output and turn it into a patch
    fn merge(&self, state: &PipelineState, output: AgentOutput) -> Result<StageOutcome, PipelineError> {
        let patch = match self.kind {
            ArtifactKind::UserStories => {
                let out: UserStoriesOutput = match decode(output) {
                    Ok(out) => out,
                    Err(e) => return Ok(StageOutcome::Error(e)),
                };
                if out.user_stories.is_empty() {
                    return Ok(StageOutcome::Error(DecodeError::Empty("user stories")));
                }

                let stories: Vec<UserStory> = out
                    .user_stories
                    .into_iter()
                    .enumerate()
                    .map(|(i, draft)| {
                        let mut story = UserStory::new(UnitId::new(i + 1, &draft.title), draft.title, draft.description);
                        story.story_points = draft.story_points;
                        story
                    })
                    .collect();
                info!(count = stories.len(), "Generated user stories");

                StatePatch {
                    transcript: vec![TranscriptEntry::new(
                        TranscriptRole::Ai,
                        format!("Created user stories:\n{}", render_stories(&stories)),
                    )],
                    user_stories: Some(stories),
                    ..Default::default()
                }
            }
            ArtifactKind::AcceptanceCriteria => {
                let out: AcceptanceCriteriaOutput = match decode(output) {
                    Ok(out) => out,
                    Err(e) => return Ok(StageOutcome::Error(e)),
                };
                if out.acceptance_criteria.is_empty() {
                    return Ok(StageOutcome::Error(DecodeError::Empty("acceptance criteria")));
                }

                let story = current_story(state)?;
                info!(unit = %story.id, count = out.acceptance_criteria.len(), "Generated acceptance criteria");
                StatePatch {
                    transcript: vec![TranscriptEntry::new(
                        TranscriptRole::Ai,
                        format!(
                            "Created acceptance criteria for '{}':\n{}",
                            story.title,
                            render_criteria(&out.acceptance_criteria)
                        ),
                    )],
                    acceptance_criteria: Some(UnitArtifact {
                        unit: story.id.clone(),
                        value: out.acceptance_criteria,
                    }),
                    ..Default::default()
                }
            }
            ArtifactKind::Tasks => {
                let out: TasksOutput = match decode(output) {
                    Ok(out) => out,
                    Err(e) => return Ok(StageOutcome::Error(e)),
                };
                if out.tasks.is_empty() {
                    return Ok(StageOutcome::Error(DecodeError::Empty("tasks")));
                }

                let story = current_story(state)?;
                info!(unit = %story.id, count = out.tasks.len(), "Generated tasks");
                StatePatch {
                    transcript: vec![TranscriptEntry::new(
                        TranscriptRole::Ai,
                        format!("Created tasks for '{}':\n{}", story.title, render_tasks(&out.tasks)),
                    )],
                    tasks: Some(UnitArtifact {
                        unit: story.id.clone(),
                        value: out.tasks,
                    }),
                    ..Default::default()
                }
            }
        };

        Ok(StageOutcome::Continue(patch))
    }
}

fn current_story(state: &PipelineState) -> Result<&UserStory, PipelineError> {
    state
        .current_story()
        .ok_or_else(|| PipelineError::Invariant("no current user story selected".to_string()))
}

#[async_trait]
impl Stage for GenerationStage {
    fn node(&self) -> Node {
        self.kind.generation_node()
    }

    async fn run(&self, state: &PipelineState, run: &RunContext) -> Result<StageOutcome, PipelineError> {
        debug!(node = %self.node(), "GenerationStage::run: called");
        let template = self.kind.generation_template();
        let ctx = self.prompt_context(state)?;
        let system_prompt = render_prompt(&self.prompts, template, self.config.prompt.as_deref(), &ctx)?;
        let output = self.kind.output_schema();

        let request = AgentRequest {
            name: self.node().name(),
            system_prompt,
            messages: vec![instruction_message(Some(state), output.tool_name)],
            output,
            model: self.config.model.clone(),
        };

        let result = self.agent.invoke(request, &run.tools, &run.steps).await?;
        let outcome = self.merge(state, result)?;
        if let StageOutcome::Error(ref e) = outcome {
            warn!(node = %self.node(), error = %e, "Generation output could not be decoded");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;
    use crate::llm::CompletionResponse;
    use crate::llm::client::mock::MockLlmClient;
    use serde_json::json;

    fn stage(kind: ArtifactKind, responses: Vec<CompletionResponse>) -> (GenerationStage, Arc<MockLlmClient>) {
        let mock = Arc::new(MockLlmClient::new(responses));
        let agent = Arc::new(Agent::new(mock.clone(), 4, 1000));
        let stage = GenerationStage::new(
            kind,
            agent,
            Arc::new(PromptLoader::embedded_only()),
            AgentConfig::default(),
        );
        (stage, mock)
    }

    fn run_ctx() -> RunContext {
        RunContext::new(50, "Banking app", "run-test")
    }

    fn state_with_selected_story() -> PipelineState {
        let mut state = PipelineState::new("Add login page", "Banking app", "start");
        state.user_stories = vec![
            UserStory::new(UnitId::new(1, "Login"), "Login", "Sign in with email"),
            UserStory::new(UnitId::new(2, "Logout"), "Logout", "Sign out"),
        ];
        state.current_unit = Some(UnitId::new(2, "Logout"));
        state
    }

    #[tokio::test]
    async fn test_user_stories_replace_and_get_positional_ids() {
        let (stage, _) = stage(
            ArtifactKind::UserStories,
            vec![CompletionResponse::tool_call(
                "tu_1",
                "submit_user_stories",
                json!({ "user_stories": [
                    { "title": "Login", "description": "d1" },
                    { "title": "Login", "description": "d2", "story_points": 3 }
                ]}),
            )],
        );
        let state = PipelineState::new("Add login page", "", "start");

        let outcome = stage.run(&state, &run_ctx()).await.unwrap();

        let StageOutcome::Continue(patch) = outcome else {
            panic!("expected CONTINUE");
        };
        let stories = patch.user_stories.unwrap();
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].id.as_str(), "us-1-login");
        assert_eq!(stories[1].id.as_str(), "us-2-login");
        assert_eq!(stories[1].story_points, Some(3));
        assert!(stories.iter().all(|s| !s.processed));
    }

    #[tokio::test]
    async fn test_empty_story_list_is_decode_error() {
        let (stage, _) = stage(
            ArtifactKind::UserStories,
            vec![CompletionResponse::tool_call("tu_1", "submit_user_stories", json!({ "user_stories": [] }))],
        );
        let state = PipelineState::new("Add login page", "", "");

        let outcome = stage.run(&state, &run_ctx()).await.unwrap();
        assert!(matches!(outcome, StageOutcome::Error(DecodeError::Empty("user stories"))));
    }

    #[tokio::test]
    async fn test_malformed_output_is_error_without_patch() {
        let (stage, _) = stage(
            ArtifactKind::AcceptanceCriteria,
            vec![CompletionResponse::text("I think the criteria should cover logins.")],
        );

        let outcome = stage.run(&state_with_selected_story(), &run_ctx()).await.unwrap();
        assert!(matches!(outcome, StageOutcome::Error(DecodeError::NotStructured(_))));
    }

    #[tokio::test]
    async fn test_acceptance_criteria_keyed_by_current_unit() {
        let (stage, mock) = stage(
            ArtifactKind::AcceptanceCriteria,
            vec![CompletionResponse::tool_call(
                "tu_1",
                "submit_acceptance_criteria",
                json!({ "acceptance_criteria": ["Session ends", "User sees login page"] }),
            )],
        );

        let outcome = stage.run(&state_with_selected_story(), &run_ctx()).await.unwrap();

        let StageOutcome::Continue(patch) = outcome else {
            panic!("expected CONTINUE");
        };
        let artifact = patch.acceptance_criteria.unwrap();
        assert_eq!(artifact.unit, UnitId::new(2, "Logout"));
        assert_eq!(artifact.value.len(), 2);

        let prompt = &mock.requests()[0].system_prompt;
        assert!(prompt.contains("User Story 'Logout'"));
        assert!(prompt.contains("No feedback received, this is the first iteration."));
        assert!(!prompt.contains("Previously created acceptance criteria"));
    }

    #[tokio::test]
    async fn test_revision_prompt_shows_previous_attempt() {
        let (stage, mock) = stage(
            ArtifactKind::AcceptanceCriteria,
            vec![CompletionResponse::tool_call(
                "tu_1",
                "submit_acceptance_criteria",
                json!({ "acceptance_criteria": ["v2"] }),
            )],
        );
        let mut state = state_with_selected_story();
        state
            .acceptance_criteria
            .record(&UnitId::new(2, "Logout"), vec!["v1 criterion".to_string()]);
        state.feedback = "add edge case".to_string();

        stage.run(&state, &run_ctx()).await.unwrap();

        let prompt = &mock.requests()[0].system_prompt;
        assert!(prompt.contains("add edge case"));
        assert!(prompt.contains("v1 criterion"));
    }

    #[tokio::test]
    async fn test_tasks_need_acceptance_criteria() {
        let (stage, mock) = stage(ArtifactKind::Tasks, vec![]);

        let err = stage.run(&state_with_selected_story(), &run_ctx()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Invariant(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tasks_generated_for_unit() {
        let (stage, mock) = stage(
            ArtifactKind::Tasks,
            vec![CompletionResponse::tool_call(
                "tu_1",
                "submit_tasks",
                json!({ "tasks": [{ "title": "Clear session", "description": "Drop the cookie" }] }),
            )],
        );
        let mut state = state_with_selected_story();
        state
            .acceptance_criteria
            .record(&UnitId::new(2, "Logout"), vec!["Session ends".to_string()]);

        let StageOutcome::Continue(patch) = stage.run(&state, &run_ctx()).await.unwrap() else {
            panic!("expected CONTINUE");
        };

        let artifact = patch.tasks.unwrap();
        assert_eq!(artifact.value, vec![Task::new("Clear session", "Drop the cookie")]);
        assert!(mock.requests()[0].system_prompt.contains("-  Session ends"));
    }

    #[tokio::test]
    async fn test_no_current_unit_is_invariant_violation() {
        let (stage, _) = stage(ArtifactKind::AcceptanceCriteria, vec![]);
        let state = PipelineState::new("Add login page", "", "");

        let err = stage.run(&state, &run_ctx()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Invariant(_)));
    }

    #[tokio::test]
    async fn test_stage_model_config_is_used() {
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::tool_call(
            "tu_1",
            "submit_user_stories",
            json!({ "user_stories": [{ "title": "Login", "description": "d" }] }),
        )]));
        let agent = Arc::new(Agent::new(mock.clone(), 4, 1000));
        let mut config = AgentConfig::default();
        config.model.name = Some("gpt-4o-mini".to_string());
        config.model.temperature = Some(0.7);
        config.prompt = Some("Stories for: {{feature_description}}".to_string());
        let stage = GenerationStage::new(
            ArtifactKind::UserStories,
            agent,
            Arc::new(PromptLoader::embedded_only()),
            config,
        );

        stage
            .run(&PipelineState::new("Add login page", "", ""), &run_ctx())
            .await
            .unwrap();

        let request = &mock.requests()[0];
        assert_eq!(request.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.system_prompt, "Stories for: Add login page");
    }
}
