//! Stage outcomes and the routing table
//!
//! A stage returns a `StageOutcome`; its `SignalTag` plus the node that
//! produced it select the next node through `route`, a total function over
//! every (node, signal) pair.

use std::fmt;

use crate::capability::DecodeError;

use super::state::StatePatch;

/// The nine stages of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    GenerateUserStories,
    ReviewUserStories,
    SelectUserStory,
    GenerateAcceptanceCriteria,
    ReviewAcceptanceCriteria,
    GenerateTasks,
    ReviewTasks,
    CompleteUserStory,
    Finalize,
}

impl Node {
    pub const ALL: [Node; 9] = [
        Node::GenerateUserStories,
        Node::ReviewUserStories,
        Node::SelectUserStory,
        Node::GenerateAcceptanceCriteria,
        Node::ReviewAcceptanceCriteria,
        Node::GenerateTasks,
        Node::ReviewTasks,
        Node::CompleteUserStory,
        Node::Finalize,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Node::GenerateUserStories => "generate-user-stories",
            Node::ReviewUserStories => "review-user-stories",
            Node::SelectUserStory => "select-user-story",
            Node::GenerateAcceptanceCriteria => "generate-acceptance-criteria",
            Node::ReviewAcceptanceCriteria => "review-acceptance-criteria",
            Node::GenerateTasks => "generate-tasks",
            Node::ReviewTasks => "review-tasks",
            Node::CompleteUserStory => "complete-user-story",
            Node::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Discriminant of a `StageOutcome`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalTag {
    Continue,
    Review,
    Error,
    Finish,
}

impl SignalTag {
    pub const ALL: [SignalTag; 4] = [SignalTag::Continue, SignalTag::Review, SignalTag::Error, SignalTag::Finish];
}

impl fmt::Display for SignalTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalTag::Continue => "CONTINUE",
            SignalTag::Review => "REVIEW",
            SignalTag::Error => "ERROR",
            SignalTag::Finish => "FINISH",
        };
        write!(f, "{}", s)
    }
}

/// What a stage hands back to the orchestrator
#[derive(Debug, Clone)]
pub enum StageOutcome {
    /// Accepted; apply the patch and move on
    Continue(StatePatch),
    /// The verifier wants a revision with this feedback
    Review { feedback: String, patch: StatePatch },
    /// Capability output could not be decoded; nothing to apply
    Error(DecodeError),
    /// Terminal for this part of the graph
    Finish(StatePatch),
}

impl StageOutcome {
    pub fn tag(&self) -> SignalTag {
        match self {
            StageOutcome::Continue(_) => SignalTag::Continue,
            StageOutcome::Review { .. } => SignalTag::Review,
            StageOutcome::Error(_) => SignalTag::Error,
            StageOutcome::Finish(_) => SignalTag::Finish,
        }
    }
}

/// Where the graph goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(Node),
    End,
    Invalid,
}

/// The routing table
pub fn route(node: Node, signal: SignalTag) -> Transition {
    use Node::*;
    use SignalTag::*;

    match (node, signal) {
        (GenerateUserStories, Continue) => Transition::To(ReviewUserStories),
        (ReviewUserStories, Review) => Transition::To(GenerateUserStories),
        (ReviewUserStories, Continue) => Transition::To(SelectUserStory),

        (SelectUserStory, Continue) => Transition::To(GenerateAcceptanceCriteria),
        (SelectUserStory, Finish) => Transition::To(Finalize),

        (GenerateAcceptanceCriteria, Continue) => Transition::To(ReviewAcceptanceCriteria),
        (ReviewAcceptanceCriteria, Review) => Transition::To(GenerateAcceptanceCriteria),
        (ReviewAcceptanceCriteria, Continue) => Transition::To(GenerateTasks),

        (GenerateTasks, Continue) => Transition::To(ReviewTasks),
        (ReviewTasks, Review) => Transition::To(GenerateTasks),
        (ReviewTasks, Continue) => Transition::To(CompleteUserStory),

        (CompleteUserStory, Continue) => Transition::To(SelectUserStory),

        (Finalize, Finish) => Transition::End,

        // malformed output re-enters the stage that produced it
        (
            GenerateUserStories | ReviewUserStories | GenerateAcceptanceCriteria | ReviewAcceptanceCriteria
            | GenerateTasks | ReviewTasks | Finalize,
            Error,
        ) => Transition::To(node),

        _ => Transition::Invalid,
    }
}
