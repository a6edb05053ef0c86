//! Orchestrator - drives the stage graph for one feature
//!
//! Dispatch is strictly sequential. Every dispatch takes a step from the
//! run's budget, the stage's patch is applied, then `route` picks the next
//! node. Malformed output re-enters the same stage with exponential
//! backoff until `max-decode-retries` is spent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capability::Agent;
use crate::config::{GraphConfig, PipelineConfig};
use crate::domain::Feature;
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;

use super::completion::ItemCompletion;
use super::error::PipelineError;
use super::finalizer::Finalizer;
use super::generation::GenerationStage;
use super::selector::Selector;
use super::signal::{Node, StageOutcome, Transition, route};
use super::stage::{ArtifactKind, RunContext, Stage};
use super::state::PipelineState;
use super::verification::VerificationStage;

/// Longest backoff exponent; keeps the shift from overflowing
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Runs the feature breakdown graph
pub struct Orchestrator {
    stages: HashMap<Node, Box<dyn Stage>>,
    graph: GraphConfig,
}

impl Orchestrator {
    /// Build every stage with its own slice of the configuration
    pub fn new(config: &PipelineConfig, llm: Arc<dyn LlmClient>) -> Self {
        debug!(
            recursion_limit = config.graph.recursion_limit,
            max_decode_retries = config.graph.max_decode_retries,
            "Orchestrator::new: called"
        );
        let agent = Arc::new(Agent::new(llm, config.graph.max_tool_turns, config.max_tokens));
        let prompts = Arc::new(PromptLoader::new(config.prompts_dir.clone()));
        let agents = &config.agents;

        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        for (kind, generation, check) in [
            (
                ArtifactKind::UserStories,
                &agents.user_story_creation,
                &agents.check_user_story_quality,
            ),
            (
                ArtifactKind::AcceptanceCriteria,
                &agents.acceptance_criteria_creation,
                &agents.check_acceptance_criteria_quality,
            ),
            (ArtifactKind::Tasks, &agents.tasks_creation, &agents.check_tasks_quality),
        ] {
            stages.push(Box::new(GenerationStage::new(
                kind,
                agent.clone(),
                prompts.clone(),
                generation.clone(),
            )));
            stages.push(Box::new(VerificationStage::new(
                kind,
                agent.clone(),
                prompts.clone(),
                check.clone(),
            )));
        }
        stages.push(Box::new(Selector));
        stages.push(Box::new(ItemCompletion));
        stages.push(Box::new(Finalizer::new(agent, prompts, agents.feature_creation.clone())));

        Self {
            stages: stages.into_iter().map(|s| (s.node(), s)).collect(),
            graph: config.graph.clone(),
        }
    }

    /// Break a feature description down into a finished `Feature`
    pub async fn run(&self, feature_description: &str, project_context: &str) -> Result<Feature, PipelineError> {
        let state = self.run_with_state(feature_description, project_context).await?;
        state
            .final_output
            .ok_or_else(|| PipelineError::Invariant("run ended without a final feature".to_string()))
    }

    /// Like `run`, but hands back the whole final state
    pub async fn run_with_state(
        &self,
        feature_description: &str,
        project_context: &str,
    ) -> Result<PipelineState, PipelineError> {
        let run_id = Uuid::now_v7().to_string();
        info!(%run_id, "Starting feature breakdown");

        let run = RunContext::new(self.graph.recursion_limit, project_context, &run_id);
        let mut state = PipelineState::new(feature_description, project_context, &self.graph.initial_message);
        let mut node = Node::GenerateUserStories;

        loop {
            run.steps.consume(node.name())?;
            let stage = self
                .stages
                .get(&node)
                .ok_or_else(|| PipelineError::Invariant(format!("no stage registered for {}", node)))?;
            debug!(%node, step = run.steps.used(), "Orchestrator::run_with_state: dispatching");

            let outcome = stage.run(&state, &run).await?;
            let signal = outcome.tag();
            let next = match route(node, signal) {
                Transition::To(next) => Some(next),
                Transition::End => None,
                Transition::Invalid => return Err(PipelineError::InvalidTransition { node, signal }),
            };

            match outcome {
                StageOutcome::Error(e) => {
                    state.decode_failures += 1;
                    if state.decode_failures > self.graph.max_decode_retries {
                        return Err(PipelineError::DecodeRetriesExhausted {
                            node,
                            attempts: state.decode_failures,
                        });
                    }
                    let delay = self.backoff(state.decode_failures);
                    warn!(
                        %node,
                        error = %e,
                        attempt = state.decode_failures,
                        delay_ms = delay.as_millis() as u64,
                        "Malformed output, retrying stage"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                StageOutcome::Review { feedback, patch } => {
                    state.decode_failures = 0;
                    state.apply(patch);
                    state.feedback = feedback;
                }
                StageOutcome::Continue(patch) | StageOutcome::Finish(patch) => {
                    state.decode_failures = 0;
                    state.apply(patch);
                }
            }
            state.last_signal = Some(signal);

            let Some(next) = next else {
                break;
            };
            info!(from = %node, to = %next, %signal, "Stage transition");
            node = next;
        }

        info!(%run_id, steps = run.steps.used(), "Feature breakdown finished");
        if let Some(feature) = &state.final_output
            && let Ok(json) = serde_json::to_string(feature)
        {
            debug!(%json, "Orchestrator::run_with_state: final feature");
        }
        Ok(state)
    }

    /// Delay before the `failures`-th re-entry
    fn backoff(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        Duration::from_millis(self.graph.decode_retry_backoff_ms.saturating_mul(1u64 << shift))
    }
}
