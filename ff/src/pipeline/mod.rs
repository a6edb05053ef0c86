//! Feature breakdown pipeline
//!
//! Nine stages connected by a fixed routing table:
//!
//! ```text
//! generate-user-stories <-> review-user-stories
//!         -> select-user-story -> generate-acceptance-criteria <-> review-acceptance-criteria
//!         -> generate-tasks <-> review-tasks -> complete-user-story -> select-user-story
//! select-user-story (none left) -> finalize -> end
//! ```

mod batch;
mod completion;
mod error;
mod finalizer;
mod generation;
mod orchestrator;
mod selector;
mod signal;
mod stage;
mod state;
mod verification;

pub use batch::{ArtifactBatches, Recorded, UnitSlot};
pub use completion::ItemCompletion;
pub use error::PipelineError;
pub use finalizer::{Finalizer, assemble_feature};
pub use generation::GenerationStage;
pub use orchestrator::Orchestrator;
pub use selector::Selector;
pub use signal::{Node, SignalTag, StageOutcome, Transition, route};
pub use stage::{ArtifactKind, RunContext, Stage};
pub use state::{PipelineState, StatePatch, TranscriptEntry, TranscriptRole, UnitArtifact};
pub use verification::VerificationStage;
