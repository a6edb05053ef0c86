//! Selector - pick the next unprocessed user story

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::PipelineError;
use super::signal::{Node, StageOutcome};
use super::stage::{RunContext, Stage};
use super::state::{PipelineState, StatePatch, TranscriptEntry};

pub struct Selector;

#[async_trait]
impl Stage for Selector {
    fn node(&self) -> Node {
        Node::SelectUserStory
    }

    async fn run(&self, state: &PipelineState, _run: &RunContext) -> Result<StageOutcome, PipelineError> {
        debug!(stories = state.user_stories.len(), "Selector::run: called");
        let Some(story) = state.user_stories.iter().find(|us| !us.processed) else {
            info!("All user stories processed");
            return Ok(StageOutcome::Finish(StatePatch::default()));
        };

        info!(unit = %story.id, title = %story.title, "Selected user story");
        Ok(StageOutcome::Continue(StatePatch {
            transcript: vec![TranscriptEntry::system(format!("Process new user story: {}", story.title))],
            current_unit: Some(story.id.clone()),
            ..Default::default()
        }))
    }
}
