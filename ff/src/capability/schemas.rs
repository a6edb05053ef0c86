//! Submit tools and the shapes they return
//!
//! Each stage offers the model exactly one submit tool. The tool's input
//! schema is the stage's output schema; calling it ends the agent loop.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::Task;
use crate::llm::ToolDefinition;

/// The structured output a stage asks the model for
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub tool_name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

impl OutputSchema {
    pub fn tool_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.tool_name, self.description, self.input_schema.clone())
    }

    pub fn user_stories() -> Self {
        Self {
            tool_name: "submit_user_stories",
            description: "Submit the complete list of user stories for the feature. Call this once with all stories.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "user_stories": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": {
                                    "type": "string",
                                    "description": "As a <type of user>, I want <some goal> so that <some reason>."
                                },
                                "description": {
                                    "type": "string",
                                    "description": "Everything needed to understand the user story"
                                },
                                "story_points": {
                                    "type": "integer",
                                    "description": "Optional effort estimate, e.g. 1, 2, 3, 5, 8, 13"
                                }
                            },
                            "required": ["title", "description"]
                        }
                    }
                },
                "required": ["user_stories"]
            }),
        }
    }

    pub fn acceptance_criteria() -> Self {
        Self {
            tool_name: "submit_acceptance_criteria",
            description: "Submit the acceptance criteria for the user story. Call this once with all criteria.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "acceptance_criteria": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Testable conditions the user story must satisfy"
                    }
                },
                "required": ["acceptance_criteria"]
            }),
        }
    }

    pub fn tasks() -> Self {
        Self {
            tool_name: "submit_tasks",
            description: "Submit the development tasks for the user story. Call this once with all tasks.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tasks": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": {
                                    "type": "string",
                                    "description": "Descriptive task title, e.g. Create new user"
                                },
                                "description": {
                                    "type": "string",
                                    "description": "Everything needed to carry out the task"
                                }
                            },
                            "required": ["title", "description"]
                        }
                    }
                },
                "required": ["tasks"]
            }),
        }
    }

    pub fn review() -> Self {
        Self {
            tool_name: "submit_review",
            description: "Submit feedback on the work under review.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "feedback": {
                        "type": "string",
                        "description": "Feedback provided on the work done"
                    },
                    "needs_review": {
                        "type": "boolean",
                        "description": "True if the work must be revised using the feedback"
                    }
                },
                "required": ["feedback"]
            }),
        }
    }

    pub fn feature() -> Self {
        Self {
            tool_name: "submit_feature",
            description: "Submit the feature title and description.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Short, descriptive feature title"
                    },
                    "description": {
                        "type": "string",
                        "description": "Goal, audience and expected outcome of the feature"
                    }
                },
                "required": ["title", "description"]
            }),
        }
    }
}

/// One generated story before it is given an id
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoryDraft {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub story_points: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserStoriesOutput {
    pub user_stories: Vec<StoryDraft>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcceptanceCriteriaOutput {
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksOutput {
    pub tasks: Vec<Task>,
}

/// Verifier decision
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewOutput {
    pub feedback: String,
    #[serde(default)]
    pub needs_review: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_are_distinct() {
        let names = [
            OutputSchema::user_stories().tool_name,
            OutputSchema::acceptance_criteria().tool_name,
            OutputSchema::tasks().tool_name,
            OutputSchema::review().tool_name,
            OutputSchema::feature().tool_name,
        ];
        let mut sorted = names.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
    }

    #[test]
    fn test_review_needs_review_defaults_false() {
        let review: ReviewOutput = serde_json::from_value(json!({ "feedback": "Looks good" })).unwrap();
        assert!(!review.needs_review);
    }

    #[test]
    fn test_story_draft_points_optional() {
        let out: UserStoriesOutput = serde_json::from_value(json!({
            "user_stories": [
                { "title": "Login", "description": "d" },
                { "title": "Logout", "description": "d", "story_points": 3 }
            ]
        }))
        .unwrap();
        assert_eq!(out.user_stories[0].story_points, None);
        assert_eq!(out.user_stories[1].story_points, Some(3));
    }

    #[test]
    fn test_tool_definition_carries_schema() {
        let def = OutputSchema::tasks().tool_definition();
        assert_eq!(def.name, "submit_tasks");
        assert_eq!(def.input_schema["required"][0], "tasks");
    }
}
