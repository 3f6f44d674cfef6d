//! Prompt MCP Server
//!
//! Expands a short topic into a richer image-generation prompt.

use prompt_mcp::PromptMcpServer;

mcp_common::serve_stdio!(PromptMcpServer, "prompt_mcp");
