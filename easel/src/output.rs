//! Human-readable rendering for the CLI

use std::fmt::Write;

use crate::db::ThreadSummary;
use crate::workflow::{Checkpoint, RunOutcome};

/// Print an artifact reference for display
///
/// ComfyUI view URLs (`http...` ending in `type=output`) become a markdown
/// image so terminals and notebooks that render markdown show the picture.
pub fn render_artifact(artifact_ref: &str) -> String {
    if artifact_ref.starts_with("http") && artifact_ref.ends_with("type=output") {
        format!("![image]({})", artifact_ref)
    } else {
        artifact_ref.to_string()
    }
}

pub fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Completed { artifact_ref, .. } => {
            format!("Completed\n{}", render_artifact(artifact_ref))
        }
        RunOutcome::PendingFeedback {
            prompt, action, ..
        } => format!("Generated prompt:\n{}\n\n{}", prompt, action),
        RunOutcome::Failed { kind, reason, .. } => {
            let hint = if kind.is_retryable() {
                " (run again to retry)"
            } else {
                ""
            };
            format!("Failed [{}]{}: {}", kind, hint, reason)
        }
    }
}

/// One block per checkpoint, oldest first
pub fn render_history(history: &[Checkpoint]) -> String {
    let mut out = String::new();
    for checkpoint in history {
        let _ = writeln!(
            out,
            "#{} {} {}",
            checkpoint.sequence,
            checkpoint.position,
            checkpoint.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        let state = &checkpoint.state;
        let _ = writeln!(out, "  topic:    {}", state.topic);
        if !state.prompt.is_empty() {
            let _ = writeln!(out, "  prompt:   {}", state.prompt);
        }
        if !state.feedback.is_empty() {
            let _ = writeln!(out, "  feedback: {}", state.feedback);
        }
        if !state.artifact_ref.is_empty() {
            let _ = writeln!(out, "  artifact: {}", render_artifact(&state.artifact_ref));
        }
    }
    out
}

pub fn render_threads(threads: &[ThreadSummary]) -> String {
    let mut out = String::new();
    for thread in threads {
        let _ = writeln!(
            out,
            "{:<36}  {:<19}  #{:<3}  {}  {}",
            thread.thread_id,
            thread.position,
            thread.sequence,
            thread.updated_at.format("%Y-%m-%d %H:%M"),
            thread.topic
        );
    }
    out
}
