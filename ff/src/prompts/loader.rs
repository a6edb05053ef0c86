//! Prompt Loader
//!
//! Loads prompt templates from config, files, or embedded defaults.

use std::path::PathBuf;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// Placeholder shown when there is no feedback yet
pub const NO_FEEDBACK: &str = "No feedback received, this is the first iteration.";

/// Context for rendering prompt templates
///
/// Every field is pre-rendered text; templates only interpolate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    pub feature_description: String,
    pub project_context: String,
    /// The unit being elaborated (acceptance criteria and task stages)
    pub user_story: Option<String>,
    /// Current story list (user-story review and feature synthesis)
    pub user_stories: Option<String>,
    pub acceptance_criteria: Option<String>,
    pub tasks: Option<String>,
    /// Latest review feedback, or the first-iteration placeholder
    pub feedback: String,
    /// The artifact being revised; only set when feedback is present
    pub previous_attempt: Option<String>,
    /// Name of the tool the model must call to return its result
    pub submit_tool: String,
}

impl PromptContext {
    /// Create a context for the given run inputs
    pub fn new(feature_description: &str, project_context: &str, submit_tool: &str) -> Self {
        debug!(%submit_tool, "PromptContext::new: called");
        Self {
            feature_description: feature_description.to_string(),
            project_context: project_context.to_string(),
            feedback: NO_FEEDBACK.to_string(),
            submit_tool: submit_tool.to_string(),
            ..Default::default()
        }
    }

    /// Set the feedback, falling back to the first-iteration placeholder
    pub fn with_feedback(mut self, feedback: &str) -> Self {
        self.feedback = if feedback.trim().is_empty() {
            NO_FEEDBACK.to_string()
        } else {
            feedback.to_string()
        };
        self
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader
    ///
    /// `user_dir` is only used if it exists.
    pub fn new(user_dir: Option<PathBuf>) -> Self {
        debug!(?user_dir, "PromptLoader::new: called");
        let user_dir = user_dir.filter(|dir| {
            let exists = dir.exists();
            if !exists {
                debug!(?dir, "PromptLoader::new: prompts directory does not exist, ignoring");
            }
            exists
        });

        Self {
            hbs: Self::engine(),
            user_dir,
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. Inline override from config
    /// 2. User override: `{user_dir}/{name}.pmt`
    /// 3. Embedded fallback
    fn load_template(&self, name: &str, inline: Option<&str>) -> Result<String> {
        debug!(%name, has_inline = inline.is_some(), "PromptLoader::load_template: called");
        if let Some(template) = inline {
            debug!("PromptLoader::load_template: using inline template from config");
            return Ok(template.to_string());
        }

        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, inline: Option<&str>, context: &PromptContext) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name, inline)?;
        info!("Rendering template '{}'", template_name);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
