//! Work items: Feature → UserStory → {acceptance criteria, Task}
//!
//! These are the exchange document. Serialization writes the camelCase
//! layout with a `type` tag on every item; deserialization ignores the tag,
//! so model output (which never carries it) and saved documents share the
//! same types.

use eyre::{Context, Result};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use super::UnitId;

/// A single task of a user story
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Task {
    pub title: String,
    pub description: String,
}

impl Task {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

impl Serialize for Task {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Task", 3)?;
        s.serialize_field("type", "Task")?;
        s.serialize_field("title", &self.title)?;
        s.serialize_field("description", &self.description)?;
        s.end()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- Task '{}'\n\tDescription: {}", self.title, self.description)
    }
}

/// A user story, the unit the pipeline elaborates one at a time
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStory {
    #[serde(default)]
    pub id: UnitId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub processed: bool,
    #[serde(default, alias = "story_points")]
    pub story_points: Option<u32>,
    #[serde(default, alias = "acceptance_criteria")]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl UserStory {
    /// A freshly generated, unprocessed story with no artifacts yet
    pub fn new(id: UnitId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            processed: false,
            story_points: None,
            acceptance_criteria: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// One-entry rendering used in prompts and story lists
    pub fn summary(&self) -> String {
        format!("- User Story '{}'\n\tDescription: {}", self.title, self.description)
    }
}

impl Serialize for UserStory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.story_points.is_some() { 8 } else { 7 };
        let mut s = serializer.serialize_struct("UserStory", len)?;
        s.serialize_field("type", "User Story")?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("title", &self.title)?;
        s.serialize_field("description", &self.description)?;
        s.serialize_field("processed", &self.processed)?;
        if let Some(points) = self.story_points {
            s.serialize_field("storyPoints", &points)?;
        }
        s.serialize_field("acceptanceCriteria", &self.acceptance_criteria)?;
        s.serialize_field("tasks", &self.tasks)?;
        s.end()
    }
}

impl fmt::Display for UserStory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\t\tUser Story '{}'\n\t\t\tDescription: {}", self.title, self.description)?;
        write!(f, "\n\t\t\tAcceptance Criteria:")?;
        for criterion in &self.acceptance_criteria {
            write!(f, "\n\t\t\t-  {}", criterion)?;
        }
        write!(f, "\n\t\t\tTasks:")?;
        for task in &self.tasks {
            write!(f, "\n\t\t\t- Task '{}'\n\t\t\t\tDescription: {}", task.title, task.description)?;
        }
        Ok(())
    }
}

/// Top-level title and description synthesized for the finished feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureHeader {
    pub title: String,
    pub description: String,
}

/// The composite result of a run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub title: String,
    pub description: String,
    #[serde(default, alias = "user_stories")]
    pub user_stories: Vec<UserStory>,
}

impl Feature {
    /// Parse a feature document
    ///
    /// Accepts a bare `Feature` or a `{ "items": [Feature, ...] }` envelope,
    /// with camelCase or snake_case keys.
    /// Stories saved without ids get positional ones.
    pub fn load_all(content: &str) -> Result<Vec<Feature>> {
        let value: serde_json::Value = serde_json::from_str(content).context("Feature document is not valid JSON")?;

        let mut features = if value.get("items").is_some() {
            serde_json::from_value::<WorkItems>(value)
                .context("Failed to parse work items envelope")?
                .items
        } else {
            vec![serde_json::from_value::<Feature>(value).context("Failed to parse feature document")?]
        };

        for feature in &mut features {
            feature.assign_missing_ids();
        }
        Ok(features)
    }

    /// Fill in ids for stories that came without one
    pub fn assign_missing_ids(&mut self) {
        for (i, story) in self.user_stories.iter_mut().enumerate() {
            if story.id.as_str().is_empty() {
                story.id = UnitId::new(i + 1, &story.title);
            }
        }
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Feature", 4)?;
        s.serialize_field("type", "Feature")?;
        s.serialize_field("title", &self.title)?;
        s.serialize_field("description", &self.description)?;
        s.serialize_field("userStories", &self.user_stories)?;
        s.end()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Feature '{}'\n\tDescription: {}\n\tUser Stories:", self.title, self.description)?;
        let stories: Vec<String> = self.user_stories.iter().map(|us| us.to_string()).collect();
        write!(f, "{}", stories.join("\n"))
    }
}

/// Envelope holding several features
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkItems {
    pub items: Vec<Feature>,
}

/// Render a story list the way prompts and the transcript show it
pub fn render_stories(stories: &[UserStory]) -> String {
    stories.iter().map(|us| us.summary()).collect::<Vec<_>>().join("\n")
}

/// Render acceptance criteria as a bullet list
pub fn render_criteria(criteria: &[String]) -> String {
    criteria.iter().map(|ac| format!("-  {}", ac)).collect::<Vec<_>>().join("\n")
}

/// Render tasks as a bullet list
pub fn render_tasks(tasks: &[Task]) -> String {
    tasks.iter().map(|t| t.to_string()).collect::<Vec<_>>().join("\n")
}
