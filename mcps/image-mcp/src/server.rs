//! MCP Server implementation for image generation

use std::path::PathBuf;

use base64::Engine;
use mcp_common::{invalid_params, text_success, McpResult};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::files::{image_filename, image_info, list_images};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Where to reach the images API and where to keep the results
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub output_dir: PathBuf,
}

impl ImageConfig {
    pub fn from_env() -> Self {
        let output_dir = std::env::var_os("IMAGE_OUTPUT_DIR")
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            output_dir,
        }
    }
}

/// The Image MCP Server
#[derive(Clone)]
pub struct ImageMcpServer {
    config: ImageConfig,
    http_client: reqwest::Client,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Parameter Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GenerateImageParams {
    #[schemars(description = "Text description of the image to generate")]
    pub prompt: String,

    #[schemars(description = "Model to use: 'dall-e-2' or 'dall-e-3' (default)")]
    #[serde(default = "default_model")]
    pub model: String,

    #[schemars(
        description = "Image size: 256x256, 512x512, 1024x1024 (default), or 1792x1024 / 1024x1792 for dall-e-3"
    )]
    #[serde(default = "default_size")]
    pub size: String,

    #[schemars(description = "Image quality: 'standard' (default) or 'hd' (dall-e-3 only)")]
    #[serde(default = "default_quality")]
    pub quality: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ImageInfoParams {
    #[schemars(description = "Name of the image file, relative to the output directory")]
    pub filename: String,
}

fn default_model() -> String {
    "dall-e-3".to_string()
}

fn default_size() -> String {
    "1024x1024".to_string()
}

fn default_quality() -> String {
    "standard".to_string()
}

// ============================================================================
// Images API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    quality: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
    b64_json: Option<String>,
}

/// `hd` and friends only exist for dall-e-3
fn effective_quality<'a>(model: &str, quality: &'a str) -> &'a str {
    if model == "dall-e-3" {
        quality
    } else {
        "standard"
    }
}

fn internal(message: impl Into<String>) -> McpError {
    McpError::internal_error(message.into(), None)
}

// ============================================================================
// Tool Router Implementation
// ============================================================================

#[tool_router]
impl ImageMcpServer {
    pub fn new() -> Self {
        let config = ImageConfig::from_env();
        if config.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, generate_image will fail");
        }
        Self::with_config(config)
    }

    pub fn with_config(config: ImageConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            tool_router: Self::tool_router(),
        }
    }

    async fn request_image(&self, params: &GenerateImageParams) -> McpResult<Vec<u8>> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| internal("OPENAI_API_KEY not configured"))?;

        let request = GenerationRequest {
            model: &params.model,
            prompt: &params.prompt,
            n: 1,
            size: &params.size,
            quality: effective_quality(&params.model, &params.quality),
        };

        let url = format!(
            "{}/images/generations",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| internal(format!("Failed to reach images API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(internal(format!(
                "Images API error ({}): {}",
                status, error_text
            )));
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| internal(format!("Invalid images API response: {}", e)))?;
        let image = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| internal("Images API returned no images"))?;

        match (image.b64_json, image.url) {
            (Some(encoded), _) => base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| internal(format!("Invalid base64 image data: {}", e))),
            (None, Some(url)) => self.download(&url).await,
            (None, None) => Err(internal("Images API response has neither url nor b64_json")),
        }
    }

    async fn download(&self, url: &str) -> McpResult<Vec<u8>> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| internal(format!("Failed to download image: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(internal(format!("Image download failed ({})", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| internal(format!("Failed to read image body: {}", e)))?;
        Ok(bytes.to_vec())
    }

    #[tool(
        description = "Generate an image from a prompt with the OpenAI images API and save it as generated_<prompt>.png. Returns the absolute path of the saved file."
    )]
    async fn generate_image(
        &self,
        Parameters(params): Parameters<GenerateImageParams>,
    ) -> McpResult<CallToolResult> {
        if params.prompt.trim().is_empty() {
            return Err(invalid_params("prompt cannot be empty"));
        }

        let data = self.request_image(&params).await?;

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| internal(format!("Failed to create output directory: {}", e)))?;
        let path = self.config.output_dir.join(image_filename(&params.prompt));
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| internal(format!("Failed to save image: {}", e)))?;
        let path = std::path::absolute(&path).unwrap_or(path);

        tracing::info!(
            path = %path.display(),
            model = %params.model,
            size = %params.size,
            bytes = data.len(),
            "Image saved"
        );
        Ok(text_success(path.display().to_string()))
    }

    #[tool(description = "List the generated_*.png images in the output directory with their sizes")]
    async fn list_generated_images(&self) -> McpResult<CallToolResult> {
        let listing = list_images(&self.config.output_dir)
            .map_err(|e| internal(format!("Error listing images: {}", e)))?;
        Ok(text_success(listing))
    }

    #[tool(description = "Show path, size, dimensions and color mode of an image file")]
    async fn get_image_info(
        &self,
        Parameters(params): Parameters<ImageInfoParams>,
    ) -> McpResult<CallToolResult> {
        if params.filename.trim().is_empty() {
            return Err(invalid_params("filename cannot be empty"));
        }

        let info = image_info(&self.config.output_dir, &params.filename)
            .map_err(|e| internal(format!("Error getting image info: {}", e)))?;
        Ok(text_success(info))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for ImageMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Image generation server. Call generate_image with a prompt to create and \
                 save an image; the result is the saved file path. list_generated_images \
                 and get_image_info inspect saved images."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

impl Default for ImageMcpServer {
    fn default() -> Self {
        Self::new()
    }
}
