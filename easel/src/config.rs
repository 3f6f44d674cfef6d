//! Configuration loading
//!
//! Two files are read:
//! - `.mcp.json`: how to launch each MCP server
//! - `.easel.toml`: which server and tool each pipeline step uses, session
//!   timeouts, and where checkpoints live

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mcp::{SessionTimeouts, ToolArguments, ToolName};
use crate::workflow::{PipelineSteps, StepTool};

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/easel/
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("easel").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

// ============================================================================
// MCP server launch configuration (.mcp.json)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct McpConfig {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: HashMap<String, McpServerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Values may reference the parent environment as `$VAR` or `${VAR}`
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Working directory for the server process
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl McpConfig {
    /// Load MCP config from .mcp.json
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .mcp.json
    /// 2. Check ~/.config/easel/.mcp.json (global fallback)
    pub fn load() -> Result<Option<Self>> {
        if let Some(config_path) = find_config_file(".mcp.json") {
            tracing::debug!("Loading MCP config from: {}", config_path.display());
            return Self::load_from_path(&config_path).map(Some);
        }

        tracing::debug!("No .mcp.json found");
        Ok(None)
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: McpConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid MCP config in {}", path.display()))?;
        Ok(config)
    }
}

// ============================================================================
// Pipeline configuration (.easel.toml)
// ============================================================================

/// Top-level pipeline configuration (from .easel.toml)
#[derive(Debug, Default, Deserialize)]
pub struct EaselFileConfig {
    #[serde(default)]
    pub steps: StepsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Tool bindings for the two generation steps
#[derive(Debug, Deserialize)]
pub struct StepsConfig {
    #[serde(default = "default_prompt_step")]
    pub prompt: StepConfig,
    #[serde(default = "default_artifact_step")]
    pub artifact: StepConfig,
}

/// One generation step: which tool to call and any fixed arguments
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    #[serde(default = "default_server")]
    pub server: String,
    pub tool: ToolName,
    /// Sent with every call; the step's own argument wins on a name clash
    #[serde(default)]
    pub arguments: ToolArguments,
}

/// Tool session timeouts
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

/// Checkpoint database location
#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    /// `~` and environment variables are expanded
    pub path: Option<String>,
}

fn default_server() -> String {
    "comfy".to_string()
}

fn default_prompt_step() -> StepConfig {
    StepConfig {
        server: default_server(),
        tool: ToolName::builtin("generate_prompt"),
        arguments: ToolArguments::new(),
    }
}

fn default_artifact_step() -> StepConfig {
    StepConfig {
        server: default_server(),
        tool: ToolName::builtin("generate_image"),
        arguments: ToolArguments::new(),
    }
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_tool_timeout_secs() -> u64 {
    300
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt_step(),
            artifact: default_artifact_step(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            startup_timeout_secs: default_startup_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl StepConfig {
    pub fn to_step_tool(&self) -> StepTool {
        StepTool::new(self.server.clone(), self.tool.clone()).with_arguments(self.arguments.clone())
    }
}

impl StepsConfig {
    pub fn to_pipeline_steps(&self) -> PipelineSteps {
        PipelineSteps {
            prompt: self.prompt.to_step_tool(),
            artifact: self.artifact.to_step_tool(),
        }
    }
}

impl SessionConfig {
    pub fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            startup: Duration::from_secs(self.startup_timeout_secs),
            tool: Duration::from_secs(self.tool_timeout_secs),
        }
    }
}

impl StoreConfig {
    /// Expanded database path, if one is configured
    pub fn resolved_path(&self) -> Result<Option<PathBuf>> {
        match self.path {
            Some(ref raw) => {
                let expanded = shellexpand::full(raw)
                    .with_context(|| format!("Cannot expand store path '{}'", raw))?;
                Ok(Some(PathBuf::from(expanded.as_ref())))
            }
            None => Ok(None),
        }
    }
}

impl EaselFileConfig {
    /// Load config from .easel.toml
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .easel.toml
    /// 2. Check ~/.config/easel/.easel.toml (global fallback)
    /// 3. Fall back to defaults
    pub fn load() -> Result<Self> {
        if let Some(config_path) = find_config_file(".easel.toml") {
            tracing::debug!("Loading config from: {}", config_path.display());
            return Self::load_from_path(&config_path);
        }

        tracing::debug!("No .easel.toml found, using defaults");
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
