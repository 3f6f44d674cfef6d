//! Error helpers for MCP tools

use rmcp::ErrorData as McpError;

/// Type alias for MCP tool results
pub type McpResult<T> = Result<T, McpError>;

/// Invalid params error, for arguments the tool cannot work with
///
/// ```rust,ignore
/// if topic.trim().is_empty() {
///     return Err(invalid_params("topic cannot be empty"));
/// }
/// ```
pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}
