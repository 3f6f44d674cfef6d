//! MCP Server implementation for prompt generation

use mcp_common::{invalid_params, text_success, McpResult};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Style suffixes keyed by subject, checked in order
const STYLES: &[(&str, &str)] = &[
    (
        "cat",
        "highly detailed, photorealistic, professional photography, studio lighting",
    ),
    (
        "robot",
        "futuristic design, sleek metallic surfaces, LED details, cinematic lighting",
    ),
    (
        "landscape",
        "breathtaking vista, golden hour lighting, ultra-wide angle, 8K quality",
    ),
    (
        "portrait",
        "professional portrait, soft natural lighting, shallow depth of field",
    ),
    (
        "abstract",
        "abstract art style, vibrant colors, dynamic composition, modern art",
    ),
];

const DEFAULT_STYLE: &str = "high quality, detailed, professional, artistic";

/// Append the style for the first keyword found in `topic`
pub fn enhance_prompt(topic: &str) -> String {
    let lowered = topic.to_lowercase();
    let style = STYLES
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, style)| *style)
        .unwrap_or(DEFAULT_STYLE);
    format!("{}, {}", topic, style)
}

/// The Prompt MCP Server
#[derive(Clone)]
pub struct PromptMcpServer {
    tool_router: ToolRouter<Self>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GeneratePromptParams {
    #[schemars(description = "Subject of the image, e.g. 'a red bicycle'")]
    pub topic: String,
}

#[tool_router]
impl PromptMcpServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Turn a short topic into a detailed image-generation prompt. Returns the prompt as plain text."
    )]
    async fn generate_prompt(
        &self,
        Parameters(params): Parameters<GeneratePromptParams>,
    ) -> McpResult<CallToolResult> {
        let topic = params.topic.trim();
        if topic.is_empty() {
            return Err(invalid_params("topic cannot be empty"));
        }

        let prompt = enhance_prompt(topic);
        tracing::info!(topic = %topic, "Generated prompt");
        Ok(text_success(prompt))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for PromptMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Prompt generation server. Call generate_prompt with a topic to get \
                 an image-generation prompt back."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

impl Default for PromptMcpServer {
    fn default() -> Self {
        Self::new()
    }
}
