//! Resumable human-in-the-loop generation pipeline
//!
//! Generates a prompt for a topic through an MCP tool, parks the run until a
//! human approves or rejects it, and finally asks a second tool for the
//! artifact. Every step boundary is checkpointed so a run can be resumed from
//! another process.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod output;
pub mod store;
pub mod workflow;

pub use error::{PersistenceError, PipelineError, ToolErrorKind, ToolInvocationError};
pub use store::{CheckpointStore, MemoryCheckpointStore};
pub use workflow::{
    Checkpoint, FailureKind, PendingQuestion, PipelineSteps, Position, ResumeDriver, RunOutcome,
    StepTool, WorkflowEngine, WorkflowState,
};
