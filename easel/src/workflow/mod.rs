//! Resumable prompt/approval/artifact workflow
//!
//! This module provides:
//! - The workflow state and checkpoint records
//! - The engine that moves a thread from one position to the next
//! - The resume driver that decides whether to start, resume, or report
//!
//! # Example
//!
//! ```rust,ignore
//! use easel::{ResumeDriver, WorkflowEngine};
//!
//! let engine = WorkflowEngine::new(store, tools, steps);
//! let driver = ResumeDriver::new(engine);
//!
//! let outcome = driver.run("T1", Some("a red bicycle"), None).await;
//! // later, possibly from another process
//! let outcome = driver.run("T1", None, Some("y")).await;
//! ```

pub mod driver;
pub mod engine;
pub mod state;

pub use driver::{FailureKind, ResumeDriver, RunOutcome};
pub use engine::{is_approved, Halt, PipelineSteps, StepTool, WorkflowEngine};
pub use state::{Checkpoint, PendingQuestion, Position, WorkflowState, FEEDBACK_ACTION};
