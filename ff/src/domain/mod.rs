//! Domain types for FeatureForge
//!
//! The work-item hierarchy a run produces (Feature → UserStory →
//! acceptance criteria and tasks) and the stable ids that key per-unit
//! artifacts.

mod id;
mod items;

pub use id::{UnitId, slugify};
pub use items::{Feature, FeatureHeader, Task, UserStory, WorkItems, render_criteria, render_stories, render_tasks};
