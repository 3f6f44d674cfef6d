//! Resume driver
//!
//! The single entry point callers use. Given a thread id it loads the latest
//! checkpoint and decides whether to start a fresh run, resume a parked one,
//! or just report where the thread stands.

use serde::Serialize;

use crate::error::PipelineError;

use super::engine::{Halt, WorkflowEngine};

/// Broad class of a failed run attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request itself was unusable, e.g. a new thread without a topic
    InvalidRequest,
    /// A generation tool failed; resuming the thread retries the step
    ToolInvocation,
    /// The checkpoint store failed
    Persistence,
}

impl FailureKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::ToolInvocation)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::ToolInvocation => write!(f, "tool invocation"),
            FailureKind::Persistence => write!(f, "persistence"),
        }
    }
}

/// What one run attempt achieved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed {
        thread_id: String,
        artifact_ref: String,
    },
    PendingFeedback {
        thread_id: String,
        sequence: i64,
        topic: String,
        prompt: String,
        action: String,
    },
    Failed {
        thread_id: String,
        kind: FailureKind,
        reason: String,
    },
}

impl RunOutcome {
    pub fn thread_id(&self) -> &str {
        match self {
            RunOutcome::Completed { thread_id, .. }
            | RunOutcome::PendingFeedback { thread_id, .. }
            | RunOutcome::Failed { thread_id, .. } => thread_id,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }

    fn from_halt(halt: Halt) -> Self {
        match halt {
            Halt::Completed(checkpoint) => RunOutcome::Completed {
                thread_id: checkpoint.thread_id,
                artifact_ref: checkpoint.state.artifact_ref,
            },
            Halt::Suspended {
                checkpoint,
                question,
            } => RunOutcome::PendingFeedback {
                thread_id: checkpoint.thread_id,
                sequence: checkpoint.sequence,
                topic: question.topic,
                prompt: question.prompt,
                action: question.action,
            },
        }
    }

    fn from_error(thread_id: &str, err: PipelineError) -> Self {
        let kind = match err {
            PipelineError::InvalidRequest(_) | PipelineError::Argument(_) => {
                FailureKind::InvalidRequest
            }
            PipelineError::Tool(_) => FailureKind::ToolInvocation,
            PipelineError::Persistence(_) => FailureKind::Persistence,
        };
        RunOutcome::Failed {
            thread_id: thread_id.to_string(),
            kind,
            reason: err.to_string(),
        }
    }
}

pub struct ResumeDriver {
    engine: WorkflowEngine,
}

impl ResumeDriver {
    pub fn new(engine: WorkflowEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    /// Fresh id for a thread the caller did not name
    pub fn new_thread_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Start, resume, or inspect a thread
    ///
    /// `topic` is only read when the thread has no checkpoint yet, and
    /// `feedback` only when it is parked awaiting an answer.
    pub async fn run(
        &self,
        thread_id: &str,
        topic: Option<&str>,
        feedback: Option<&str>,
    ) -> RunOutcome {
        match self.try_run(thread_id, topic, feedback).await {
            Ok(halt) => RunOutcome::from_halt(halt),
            Err(e) => {
                let outcome = RunOutcome::from_error(thread_id, e);
                if let RunOutcome::Failed { kind, reason, .. } = &outcome {
                    tracing::warn!(thread_id = %thread_id, kind = %kind, "Run failed: {}", reason);
                }
                outcome
            }
        }
    }

    async fn try_run(
        &self,
        thread_id: &str,
        topic: Option<&str>,
        feedback: Option<&str>,
    ) -> Result<Halt, PipelineError> {
        if thread_id.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "thread id must not be empty".to_string(),
            ));
        }

        match self.engine.store().load_latest(thread_id)? {
            Some(checkpoint) => {
                tracing::debug!(
                    thread_id = %thread_id,
                    sequence = checkpoint.sequence,
                    position = %checkpoint.position,
                    "Resuming thread"
                );
                self.engine
                    .advance(checkpoint, feedback.map(str::to_string))
                    .await
            }
            None => {
                let topic = topic.map(str::trim).filter(|t| !t.is_empty()).ok_or_else(|| {
                    PipelineError::InvalidRequest(format!(
                        "thread '{}' does not exist and no topic was given",
                        thread_id
                    ))
                })?;
                self.engine.start(thread_id, topic).await
            }
        }
    }
}
