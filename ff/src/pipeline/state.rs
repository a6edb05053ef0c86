//! PipelineState - the single record threaded through every stage
//!
//! The orchestrator owns it. Stages read it and return a `StatePatch`;
//! only the orchestrator applies patches.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::{Feature, Task, UnitId, UserStory};

use super::batch::ArtifactBatches;
use super::signal::SignalTag;

/// Who a transcript entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    Human,
    System,
    Ai,
}

/// One entry of the run transcript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(role: TranscriptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(TranscriptRole::Human, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TranscriptRole::System, content)
    }
}

/// A generated artifact destined for one unit's slot
#[derive(Debug, Clone, PartialEq)]
pub struct UnitArtifact<T> {
    pub unit: UnitId,
    pub value: T,
}

/// Field-wise update returned by a stage
///
/// `Some` fields overwrite, transcript entries append, unit artifacts are
/// merged into their batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub transcript: Vec<TranscriptEntry>,
    pub user_stories: Option<Vec<UserStory>>,
    pub current_unit: Option<UnitId>,
    pub acceptance_criteria: Option<UnitArtifact<Vec<String>>>,
    pub tasks: Option<UnitArtifact<Vec<Task>>>,
    pub feedback: Option<String>,
    pub verification_attempts: Option<u32>,
    pub final_output: Option<Feature>,
}

impl StatePatch {
    /// Patch for an accepted verification: clear feedback and attempts
    pub fn accepted() -> Self {
        Self {
            feedback: Some(String::new()),
            verification_attempts: Some(0),
            ..Default::default()
        }
    }
}

/// Shared state of one run
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub transcript: Vec<TranscriptEntry>,
    pub feature_description: String,
    pub project_context: String,
    pub user_stories: Vec<UserStory>,
    pub current_unit: Option<UnitId>,
    pub acceptance_criteria: ArtifactBatches<Vec<String>>,
    pub tasks: ArtifactBatches<Vec<Task>>,
    pub feedback: String,
    pub verification_attempts: u32,
    /// Consecutive ERROR signals; reset by any other signal
    pub decode_failures: u32,
    pub last_signal: Option<SignalTag>,
    pub final_output: Option<Feature>,
}

impl PipelineState {
    /// Fresh state for a run, seeded with the initial human message
    pub fn new(feature_description: &str, project_context: &str, initial_message: &str) -> Self {
        debug!(
            feature_len = feature_description.len(),
            context_len = project_context.len(),
            "PipelineState::new: called"
        );
        let mut transcript = Vec::new();
        if !initial_message.trim().is_empty() {
            transcript.push(TranscriptEntry::human(initial_message));
        }

        Self {
            transcript,
            feature_description: feature_description.to_string(),
            project_context: project_context.to_string(),
            user_stories: Vec::new(),
            current_unit: None,
            acceptance_criteria: ArtifactBatches::new(),
            tasks: ArtifactBatches::new(),
            feedback: String::new(),
            verification_attempts: 0,
            decode_failures: 0,
            last_signal: None,
            final_output: None,
        }
    }

    /// Merge a stage's patch
    pub fn apply(&mut self, patch: StatePatch) {
        debug!(
            transcript_entries = patch.transcript.len(),
            has_stories = patch.user_stories.is_some(),
            has_criteria = patch.acceptance_criteria.is_some(),
            has_tasks = patch.tasks.is_some(),
            "PipelineState::apply: called"
        );
        self.transcript.extend(patch.transcript);

        if let Some(stories) = patch.user_stories {
            self.user_stories = stories;
        }
        if let Some(unit) = patch.current_unit {
            self.current_unit = Some(unit);
        }
        if let Some(artifact) = patch.acceptance_criteria {
            self.acceptance_criteria.record(&artifact.unit, artifact.value);
        }
        if let Some(artifact) = patch.tasks {
            self.tasks.record(&artifact.unit, artifact.value);
        }
        if let Some(feedback) = patch.feedback {
            self.feedback = feedback;
        }
        if let Some(attempts) = patch.verification_attempts {
            self.verification_attempts = attempts;
        }
        if let Some(feature) = patch.final_output {
            self.final_output = Some(feature);
        }
    }

    /// The story currently being elaborated
    pub fn current_story(&self) -> Option<&UserStory> {
        let unit = self.current_unit.as_ref()?;
        self.user_stories.iter().find(|us| &us.id == unit)
    }

    /// Transcript rendered as plain text for prompts
    pub fn transcript_text(&self) -> String {
        self.transcript
            .iter()
            .map(|e| {
                let role = match e.role {
                    TranscriptRole::Human => "human",
                    TranscriptRole::System => "system",
                    TranscriptRole::Ai => "ai",
                };
                format!("[{}] {}", role, e.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
