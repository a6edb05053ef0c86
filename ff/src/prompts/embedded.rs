//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// User story generation prompt
pub const USER_STORY_CREATION: &str = include_str!("../../prompts/user-story-creation.pmt");

/// Acceptance criteria generation prompt
pub const ACCEPTANCE_CRITERIA_CREATION: &str = include_str!("../../prompts/acceptance-criteria-creation.pmt");

/// Task generation prompt
pub const TASKS_CREATION: &str = include_str!("../../prompts/tasks-creation.pmt");

/// User story review prompt
pub const CHECK_USER_STORY_QUALITY: &str = include_str!("../../prompts/check-user-story-quality.pmt");

/// Acceptance criteria review prompt
pub const CHECK_ACCEPTANCE_CRITERIA_QUALITY: &str = include_str!("../../prompts/check-acceptance-criteria-quality.pmt");

/// Task review prompt
pub const CHECK_TASKS_QUALITY: &str = include_str!("../../prompts/check-tasks-quality.pmt");

/// Feature title/description synthesis prompt
pub const FEATURE_CREATION: &str = include_str!("../../prompts/feature-creation.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let prompt = match name {
        "user-story-creation" => USER_STORY_CREATION,
        "acceptance-criteria-creation" => ACCEPTANCE_CRITERIA_CREATION,
        "tasks-creation" => TASKS_CREATION,
        "check-user-story-quality" => CHECK_USER_STORY_QUALITY,
        "check-acceptance-criteria-quality" => CHECK_ACCEPTANCE_CRITERIA_QUALITY,
        "check-tasks-quality" => CHECK_TASKS_QUALITY,
        "feature-creation" => FEATURE_CREATION,
        _ => {
            debug!("get_embedded: no match found");
            return None;
        }
    };
    Some(prompt)
}
