//! Prompt MCP Library
//!
//! Keyword-driven prompt enhancement exposed as the `generate_prompt` tool.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use prompt_mcp::enhance_prompt;
//!
//! assert_eq!(
//!     enhance_prompt("a robot"),
//!     "a robot, futuristic design, sleek metallic surfaces, LED details, cinematic lighting"
//! );
//! ```

pub mod server;

pub use server::{enhance_prompt, GeneratePromptParams, PromptMcpServer};
