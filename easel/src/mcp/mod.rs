//! MCP tool sessions
//!
//! Tools are reached through the [`ToolSession`] trait. [`McpToolSession`]
//! spawns the configured server for every call; [`ScriptedToolSession`]
//! replays canned answers in-process.

mod scripted;
mod session;
mod types;

pub use scripted::ScriptedToolSession;
pub use session::{
    McpToolSession, SessionTimeouts, ToolSession, DEFAULT_STARTUP_TIMEOUT, DEFAULT_TOOL_TIMEOUT,
};
pub use types::{ArgValue, ArgumentError, ToolArguments, ToolCall, ToolName};
