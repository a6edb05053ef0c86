//! ItemCompletion - close out the current user story

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::PipelineError;
use super::signal::{Node, StageOutcome};
use super::stage::{RunContext, Stage};
use super::state::{PipelineState, StatePatch, TranscriptEntry};

pub struct ItemCompletion;

#[async_trait]
impl Stage for ItemCompletion {
    fn node(&self) -> Node {
        Node::CompleteUserStory
    }

    async fn run(&self, state: &PipelineState, _run: &RunContext) -> Result<StageOutcome, PipelineError> {
        debug!(current_unit = ?state.current_unit, "ItemCompletion::run: called");
        let unit = state
            .current_unit
            .as_ref()
            .ok_or_else(|| PipelineError::Invariant("completion reached with no current unit".to_string()))?;

        let mut stories = state.user_stories.clone();
        let story = stories
            .iter_mut()
            .find(|us| &us.id == unit)
            .ok_or_else(|| PipelineError::Invariant(format!("current unit {} is not in the story list", unit)))?;
        if story.processed {
            return Err(PipelineError::Invariant(format!("user story {} was already processed", unit)));
        }

        let criteria = state
            .acceptance_criteria
            .current(unit)
            .ok_or_else(|| PipelineError::Invariant(format!("no acceptance criteria recorded for {}", unit)))?;
        let tasks = state
            .tasks
            .current(unit)
            .ok_or_else(|| PipelineError::Invariant(format!("no tasks recorded for {}", unit)))?;

        story.processed = true;

        // render with the artifacts attached, the stored list keeps them detached
        let mut rendered = story.clone();
        rendered.acceptance_criteria = criteria.clone();
        rendered.tasks = tasks.clone();
        let summary = format!(
            "User story has been processed successfully. The user story, the acceptance criteria and the tasks are:\n{}",
            rendered
        );
        info!(%unit, "Completed user story");

        Ok(StageOutcome::Continue(StatePatch {
            transcript: vec![TranscriptEntry::system(summary)],
            user_stories: Some(stories),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Task, UnitId, UserStory};

    fn run_ctx() -> RunContext {
        RunContext::new(10, "", "run-test")
    }

    fn state() -> PipelineState {
        let mut state = PipelineState::new("f", "", "");
        state.user_stories = vec![
            UserStory::new(UnitId::new(1, "Login"), "Login", "d"),
            UserStory::new(UnitId::new(2, "Logout"), "Logout", "d"),
        ];
        state
    }

    #[tokio::test]
    async fn test_marks_current_unit_processed() {
        let mut state = state();
        let unit = UnitId::new(2, "Logout");
        state.current_unit = Some(unit.clone());
        state.acceptance_criteria.record(&unit, vec!["Session ends".to_string()]);
        state.tasks.record(&unit, vec![Task::new("Clear cookie", "d")]);

        let outcome = ItemCompletion.run(&state, &run_ctx()).await.unwrap();

        let StageOutcome::Continue(patch) = outcome else {
            panic!("expected CONTINUE");
        };
        let stories = patch.user_stories.unwrap();
        assert!(!stories[0].processed);
        assert!(stories[1].processed);
        assert!(patch.transcript[0].content.starts_with("User story has been processed successfully."));
        assert!(patch.transcript[0].content.contains("-  Session ends"));
        assert!(patch.transcript[0].content.contains("Task 'Clear cookie'"));
    }

    #[tokio::test]
    async fn test_duplicate_titles_resolved_by_id() {
        let mut state = PipelineState::new("f", "", "");
        let first = UnitId::new(1, "Login");
        let second = UnitId::new(2, "Login");
        state.user_stories = vec![
            UserStory::new(first.clone(), "Login", "email"),
            UserStory::new(second.clone(), "Login", "sso"),
        ];
        state.current_unit = Some(second.clone());
        state.acceptance_criteria.record(&second, vec!["ac".to_string()]);
        state.tasks.record(&second, vec![Task::new("t", "d")]);

        let StageOutcome::Continue(patch) = ItemCompletion.run(&state, &run_ctx()).await.unwrap() else {
            panic!("expected CONTINUE");
        };

        let stories = patch.user_stories.unwrap();
        assert!(!stories[0].processed);
        assert!(stories[1].processed);
    }

    #[tokio::test]
    async fn test_missing_unit_is_invariant_violation() {
        let err = ItemCompletion.run(&state(), &run_ctx()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Invariant(_)));
    }

    #[tokio::test]
    async fn test_missing_tasks_is_invariant_violation() {
        let mut state = state();
        let unit = UnitId::new(1, "Login");
        state.current_unit = Some(unit.clone());
        state.acceptance_criteria.record(&unit, vec!["ac".to_string()]);

        let err = ItemCompletion.run(&state, &run_ctx()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Invariant(ref m) if m.contains("no tasks")));
    }
}
