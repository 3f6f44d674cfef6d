//! Workflow state and checkpoint records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Question put to the human at the approval step
pub const FEEDBACK_ACTION: &str = "Do you like this prompt? (y/n)";

/// Data threaded through the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Set when the thread starts, never changed afterwards
    pub topic: String,
    /// Latest generated prompt
    #[serde(default)]
    pub prompt: String,
    /// Latest human answer, consumed by the routing decision
    #[serde(default)]
    pub feedback: String,
    /// Only set once the thread is completed
    #[serde(default)]
    pub artifact_ref: String,
}

impl WorkflowState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }
}

/// Where a thread is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    GeneratingPrompt,
    AwaitingFeedback,
    GeneratingArtifact,
    Completed,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::GeneratingPrompt => "generating_prompt",
            Position::AwaitingFeedback => "awaiting_feedback",
            Position::GeneratingArtifact => "generating_artifact",
            Position::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Position::Completed)
    }

    /// Whether `next` may directly follow `self` in a thread's history
    pub fn can_transition_to(&self, next: Position) -> bool {
        matches!(
            (self, next),
            (Position::GeneratingPrompt, Position::AwaitingFeedback)
                | (Position::AwaitingFeedback, Position::GeneratingPrompt)
                | (Position::AwaitingFeedback, Position::GeneratingArtifact)
                | (Position::GeneratingArtifact, Position::Completed)
        )
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Position {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "generating_prompt" => Ok(Position::GeneratingPrompt),
            "awaiting_feedback" => Ok(Position::AwaitingFeedback),
            "generating_artifact" => Ok(Position::GeneratingArtifact),
            "completed" => Ok(Position::Completed),
            _ => Err(anyhow::anyhow!("Unknown position: {}", s)),
        }
    }
}

/// The question a suspended thread is waiting on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuestion {
    #[serde(default)]
    pub topic: String,
    pub prompt: String,
    pub action: String,
}

impl PendingQuestion {
    pub fn for_state(state: &WorkflowState) -> Self {
        Self {
            topic: state.topic.clone(),
            prompt: state.prompt.clone(),
            action: FEEDBACK_ACTION.to_string(),
        }
    }
}

/// Immutable snapshot of a thread at one step boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    /// Starts at 1 and grows by one per checkpoint
    pub sequence: i64,
    pub position: Position,
    pub state: WorkflowState,
    /// Present only while parked at [`Position::AwaitingFeedback`]
    pub pending_question: Option<PendingQuestion>,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// First checkpoint of a fresh thread
    pub fn initial(thread_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            sequence: 1,
            position: Position::GeneratingPrompt,
            state: WorkflowState::new(topic),
            pending_question: None,
            created_at: Utc::now(),
        }
    }

    /// The checkpoint that follows this one
    pub fn next(
        &self,
        position: Position,
        state: WorkflowState,
        pending_question: Option<PendingQuestion>,
    ) -> Self {
        Self {
            thread_id: self.thread_id.clone(),
            sequence: self.sequence + 1,
            position,
            state,
            pending_question,
            created_at: Utc::now(),
        }
    }
}
