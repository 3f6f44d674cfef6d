//! Image MCP Server
//!
//! Generates images with the OpenAI images API and keeps them on disk.

use image_mcp::ImageMcpServer;

mcp_common::serve_stdio!(ImageMcpServer, "image_mcp");
