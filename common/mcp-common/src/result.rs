//! Result helpers for MCP tool responses

use rmcp::model::{CallToolResult, Content};

/// Successful response carrying a single text item
///
/// ```rust,ignore
/// use mcp_common::text_success;
///
/// fn my_tool(&self) -> McpResult<CallToolResult> {
///     Ok(text_success("a red bicycle, studio lighting"))
/// }
/// ```
pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_success() {
        let result = text_success("hello world");
        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(result.content.len(), 1);
        assert_eq!(
            result.content[0].as_text().map(|t| t.text.as_str()),
            Some("hello world")
        );
    }
}
