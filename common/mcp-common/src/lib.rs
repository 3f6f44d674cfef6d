//! MCP Common - Shared utilities for the MCP crates
//!
//! - **Initialization**: tracing setup for servers and clients, and the
//!   `serve_stdio!` macro for server binaries
//! - **Results**: helpers for building `CallToolResult` responses
//! - **Errors**: shorthand constructors for MCP error data
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{invalid_params, serve_stdio, text_success};
//!
//! // In main.rs
//! serve_stdio!(MyServer, "my_mcp");
//!
//! // In a tool
//! fn my_tool(&self, topic: &str) -> McpResult<CallToolResult> {
//!     if topic.is_empty() {
//!         return Err(invalid_params("topic cannot be empty"));
//!     }
//!     Ok(text_success(topic))
//! }
//! ```

pub mod error;
pub mod init;
pub mod result;

pub use error::{invalid_params, McpResult};
pub use init::{init_tracing, init_tracing_with_level};
pub use result::text_success;

pub use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
