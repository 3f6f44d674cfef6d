//! Error types shared across the pipeline
//!
//! Tool and store failures stay typed up to the resume driver, which is the
//! only place that turns them into a caller-facing outcome.

use std::fmt;

use crate::mcp::ArgumentError;

/// Why a tool invocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// The server process could not be launched
    Spawn,
    /// The MCP initialize exchange failed
    Handshake,
    /// The connection dropped or answered out of protocol mid-call
    Transport,
    /// Startup or the call itself exceeded its timeout
    Timeout,
    /// The tool executed but reported a failure
    ToolReported,
    /// The response carried no usable text content
    MalformedResponse,
    /// The call named a server that is not configured
    ServerNotConfigured,
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolErrorKind::Spawn => write!(f, "spawn failed"),
            ToolErrorKind::Handshake => write!(f, "handshake failed"),
            ToolErrorKind::Transport => write!(f, "transport error"),
            ToolErrorKind::Timeout => write!(f, "timed out"),
            ToolErrorKind::ToolReported => write!(f, "tool error"),
            ToolErrorKind::MalformedResponse => write!(f, "malformed response"),
            ToolErrorKind::ServerNotConfigured => write!(f, "server not configured"),
        }
    }
}

/// A failed tool invocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tool '{tool}' on server '{server}': {kind}: {message}")]
pub struct ToolInvocationError {
    pub server: String,
    pub tool: String,
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolInvocationError {
    pub fn new(
        server: impl Into<String>,
        tool: impl Into<String>,
        kind: ToolErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            tool: tool.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Checkpoint store failures
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("checkpoint store unavailable: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("corrupt checkpoint for thread '{thread_id}' at sequence {sequence}: {message}")]
    Corrupt {
        thread_id: String,
        sequence: i64,
        message: String,
    },
}

/// Anything that can stop a run attempt
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid tool arguments: {0}")]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Tool(#[from] ToolInvocationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
