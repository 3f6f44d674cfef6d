//! Workflow execution engine
//!
//! Moves a thread through
//! `generating_prompt -> awaiting_feedback -> (generating_prompt | generating_artifact) -> completed`.
//!
//! A checkpoint is appended after every transition. A failed tool call
//! appends nothing, so the thread stays where its last checkpoint left it and
//! can be resumed again.

use std::sync::Arc;

use crate::error::PipelineError;
use crate::mcp::{ToolArguments, ToolCall, ToolName, ToolSession};
use crate::store::CheckpointStore;

use super::state::{Checkpoint, PendingQuestion, Position};

/// Argument carrying the topic to the prompt tool
const TOPIC_ARG: &str = "topic";

/// Argument carrying the approved prompt to the artifact tool
const PROMPT_ARG: &str = "prompt";

/// Approval rule for human feedback
///
/// Blank input counts as approval, as does anything starting with `y`/`Y`
/// once surrounding whitespace is removed.
pub fn is_approved(feedback: &str) -> bool {
    match feedback.trim().chars().next() {
        None => true,
        Some(first) => first.eq_ignore_ascii_case(&'y'),
    }
}

/// The tool behind one generation step
#[derive(Debug, Clone, PartialEq)]
pub struct StepTool {
    pub server: String,
    pub tool: ToolName,
    /// Fixed arguments sent with every call
    pub arguments: ToolArguments,
}

impl StepTool {
    pub fn new(server: impl Into<String>, tool: ToolName) -> Self {
        Self {
            server: server.into(),
            tool,
            arguments: ToolArguments::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: ToolArguments) -> Self {
        self.arguments = arguments;
        self
    }

    /// Build the call, with the step's own argument taking precedence
    fn call(&self, name: &str, value: &str) -> Result<ToolCall, PipelineError> {
        let mut arguments = self.arguments.clone();
        arguments.insert(name, value)?;
        Ok(ToolCall::new(self.server.clone(), self.tool.clone(), arguments))
    }
}

/// Tools used by the two generation steps
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSteps {
    pub prompt: StepTool,
    pub artifact: StepTool,
}

/// Where a run attempt stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// Parked at the approval step
    Suspended {
        checkpoint: Checkpoint,
        question: PendingQuestion,
    },
    /// Reached the terminal position
    Completed(Checkpoint),
}

impl Halt {
    pub fn checkpoint(&self) -> &Checkpoint {
        match self {
            Halt::Suspended { checkpoint, .. } => checkpoint,
            Halt::Completed(checkpoint) => checkpoint,
        }
    }
}

/// Workflow execution engine
pub struct WorkflowEngine {
    store: Arc<dyn CheckpointStore>,
    tools: Arc<dyn ToolSession>,
    steps: PipelineSteps,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        tools: Arc<dyn ToolSession>,
        steps: PipelineSteps,
    ) -> Self {
        Self {
            store,
            tools,
            steps,
        }
    }

    pub fn store(&self) -> &dyn CheckpointStore {
        self.store.as_ref()
    }

    pub fn steps(&self) -> &PipelineSteps {
        &self.steps
    }

    /// Start a new thread and run it until it suspends or completes
    pub async fn start(&self, thread_id: &str, topic: &str) -> Result<Halt, PipelineError> {
        let checkpoint = Checkpoint::initial(thread_id, topic);
        self.commit(&checkpoint)?;
        tracing::info!(thread_id = %thread_id, "Started thread");
        self.advance(checkpoint, None).await
    }

    /// Continue a thread from its latest checkpoint
    ///
    /// `feedback` is only consumed when the thread is awaiting it. Without
    /// feedback a parked thread is reported as-is and nothing is written.
    pub async fn advance(
        &self,
        mut current: Checkpoint,
        mut feedback: Option<String>,
    ) -> Result<Halt, PipelineError> {
        if feedback.is_some() && current.position != Position::AwaitingFeedback {
            tracing::debug!(
                thread_id = %current.thread_id,
                position = %current.position,
                "Ignoring feedback, thread is not awaiting any"
            );
            feedback = None;
        }

        loop {
            match current.position {
                Position::GeneratingPrompt => {
                    let call = self.steps.prompt.call(TOPIC_ARG, &current.state.topic)?;
                    let prompt = self.tools.invoke(&call).await?;

                    let mut state = current.state.clone();
                    state.prompt = prompt;
                    state.feedback.clear();
                    let question = PendingQuestion::for_state(&state);
                    let next =
                        current.next(Position::AwaitingFeedback, state, Some(question.clone()));
                    self.commit(&next)?;

                    return Ok(Halt::Suspended {
                        checkpoint: next,
                        question,
                    });
                }

                Position::AwaitingFeedback => {
                    let Some(answer) = feedback.take() else {
                        let question = current
                            .pending_question
                            .clone()
                            .unwrap_or_else(|| PendingQuestion::for_state(&current.state));
                        return Ok(Halt::Suspended {
                            checkpoint: current,
                            question,
                        });
                    };

                    let approved = is_approved(&answer);
                    tracing::info!(
                        thread_id = %current.thread_id,
                        approved,
                        "Received feedback"
                    );

                    let mut state = current.state.clone();
                    state.feedback = answer;
                    let position = if approved {
                        Position::GeneratingArtifact
                    } else {
                        Position::GeneratingPrompt
                    };
                    let next = current.next(position, state, None);
                    self.commit(&next)?;
                    current = next;
                }

                Position::GeneratingArtifact => {
                    let call = self.steps.artifact.call(PROMPT_ARG, &current.state.prompt)?;
                    let artifact_ref = self.tools.invoke(&call).await?;

                    let mut state = current.state.clone();
                    state.artifact_ref = artifact_ref;
                    let next = current.next(Position::Completed, state, None);
                    self.commit(&next)?;
                    current = next;
                }

                Position::Completed => return Ok(Halt::Completed(current)),
            }
        }
    }

    fn commit(&self, checkpoint: &Checkpoint) -> Result<(), PipelineError> {
        self.store.append(checkpoint)?;
        tracing::debug!(
            thread_id = %checkpoint.thread_id,
            sequence = checkpoint.sequence,
            position = %checkpoint.position,
            "Checkpoint committed"
        );
        Ok(())
    }
}
