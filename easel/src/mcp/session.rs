//! Spawn-per-call MCP tool session
//!
//! Every invocation launches the configured server, performs the MCP
//! initialize handshake, sends a single `tools/call` and shuts the child down
//! again. No process or connection outlives the call that created it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, CallToolResult, RawContent},
    transport::TokioChildProcess,
    ServiceError, ServiceExt,
};
use tokio::process::Command;

use super::types::ToolCall;
use crate::config::{McpConfig, McpServerConfig};
use crate::error::{ToolErrorKind, ToolInvocationError};

/// Default timeout for spawning a server and completing the handshake
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for a single tool call (image generation is slow)
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// Capability to run one named tool and get its text back
#[async_trait]
pub trait ToolSession: Send + Sync {
    async fn invoke(&self, call: &ToolCall) -> Result<String, ToolInvocationError>;
}

/// Timeouts applied to each session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// Spawn plus handshake
    pub startup: Duration,
    /// The `tools/call` round trip
    pub tool: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            startup: DEFAULT_STARTUP_TIMEOUT,
            tool: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

/// Tool session backed by MCP servers launched over stdio
#[derive(Debug, Clone)]
pub struct McpToolSession {
    config: McpConfig,
    timeouts: SessionTimeouts,
}

impl McpToolSession {
    pub fn new(config: McpConfig) -> Self {
        Self {
            config,
            timeouts: SessionTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: SessionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn build_command(config: &McpServerConfig) -> Command {
        let mut cmd = Command::new(&config.command);
        if !config.args.is_empty() {
            cmd.args(&config.args);
        }
        if let Some(ref cwd) = config.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &config.env {
            let expanded = shellexpand::env(value).unwrap_or_else(|_| value.clone().into());
            cmd.env(key, expanded.as_ref());
        }
        cmd
    }
}

#[async_trait]
impl ToolSession for McpToolSession {
    async fn invoke(&self, call: &ToolCall) -> Result<String, ToolInvocationError> {
        let fail = |kind: ToolErrorKind, message: String| {
            ToolInvocationError::new(&call.server, call.tool.as_str(), kind, message)
        };

        let server = self.config.mcp_servers.get(&call.server).ok_or_else(|| {
            fail(
                ToolErrorKind::ServerNotConfigured,
                "server missing from .mcp.json".to_string(),
            )
        })?;

        let started = Instant::now();
        tracing::debug!(server = %call.server, tool = %call.tool, "Spawning MCP server");

        let transport = TokioChildProcess::new(Self::build_command(server))
            .map_err(|e| fail(ToolErrorKind::Spawn, format!("{} ({})", e, server.command)))?;

        let service = tokio::time::timeout(self.timeouts.startup, ().serve(transport))
            .await
            .map_err(|_| {
                fail(
                    ToolErrorKind::Timeout,
                    format!("startup timed out after {:?}", self.timeouts.startup),
                )
            })?
            .map_err(|e| fail(ToolErrorKind::Handshake, e.to_string()))?;

        let request = CallToolRequestParam {
            name: call.tool.as_str().to_string().into(),
            arguments: Some(call.arguments.to_json_object()),
            task: None,
        };
        let outcome = tokio::time::timeout(self.timeouts.tool, service.call_tool(request)).await;

        // The child is torn down whatever the call produced
        if let Err(e) = service.cancel().await {
            tracing::warn!(server = %call.server, "MCP server did not shut down cleanly: {}", e);
        }

        let result = match outcome {
            Err(_) => {
                return Err(fail(
                    ToolErrorKind::Timeout,
                    format!("call timed out after {:?}", self.timeouts.tool),
                ))
            }
            Ok(Err(ServiceError::McpError(err))) => {
                return Err(fail(ToolErrorKind::ToolReported, err.message.to_string()))
            }
            Ok(Err(e)) => return Err(fail(ToolErrorKind::Transport, e.to_string())),
            Ok(Ok(result)) => result,
        };

        tracing::debug!(
            server = %call.server,
            tool = %call.tool,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool call finished"
        );

        response_text(&result).map_err(|(kind, message)| fail(kind, message))
    }
}

/// Pull the text payload out of a tool result
///
/// Text items are joined with newlines. A result flagged `is_error` becomes a
/// tool-reported failure carrying that text.
pub(crate) fn response_text(result: &CallToolResult) -> Result<String, (ToolErrorKind, String)> {
    let text = result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error.unwrap_or(false) {
        let message = if text.trim().is_empty() {
            "tool reported an error without details".to_string()
        } else {
            text
        };
        return Err((ToolErrorKind::ToolReported, message));
    }

    if text.trim().is_empty() {
        return Err((
            ToolErrorKind::MalformedResponse,
            format!(
                "no text content in response ({} content items)",
                result.content.len()
            ),
        ));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{ToolArguments, ToolName};
    use rmcp::model::Content;
    use std::collections::HashMap;

    #[test]
    fn test_response_text_single_item() {
        let result = CallToolResult::success(vec![Content::text("file:///out/img1.png")]);
        assert_eq!(response_text(&result).unwrap(), "file:///out/img1.png");
    }

    #[test]
    fn test_response_text_joins_items() {
        let result = CallToolResult::success(vec![Content::text("line one"), Content::text("line two")]);
        assert_eq!(response_text(&result).unwrap(), "line one\nline two");
    }

    #[test]
    fn test_response_text_empty_is_malformed() {
        let result = CallToolResult::success(vec![]);
        let (kind, _) = response_text(&result).unwrap_err();
        assert_eq!(kind, ToolErrorKind::MalformedResponse);

        let result = CallToolResult::success(vec![Content::text("  \n")]);
        let (kind, _) = response_text(&result).unwrap_err();
        assert_eq!(kind, ToolErrorKind::MalformedResponse);
    }

    #[test]
    fn test_response_text_error_flag() {
        let result = CallToolResult::error(vec![Content::text("COMFY_URL not set")]);
        let (kind, message) = response_text(&result).unwrap_err();
        assert_eq!(kind, ToolErrorKind::ToolReported);
        assert_eq!(message, "COMFY_URL not set");
    }

    #[tokio::test]
    async fn test_unknown_server_is_reported() {
        let session = McpToolSession::new(McpConfig {
            mcp_servers: HashMap::new(),
        });
        let call = ToolCall::new(
            "missing",
            ToolName::new("generate_prompt").unwrap(),
            ToolArguments::new(),
        );

        let err = session.invoke(&call).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::ServerNotConfigured);
        assert_eq!(err.server, "missing");
    }

    /// Session with a single server "broken" launched as `command args...`
    fn session_running(command: &str, args: &[&str]) -> McpToolSession {
        let mut servers = HashMap::new();
        servers.insert(
            "broken".to_string(),
            McpServerConfig {
                command: command.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                env: HashMap::new(),
                cwd: None,
            },
        );
        McpToolSession::new(McpConfig {
            mcp_servers: servers,
        })
    }

    fn broken_call() -> ToolCall {
        ToolCall::new(
            "broken",
            ToolName::new("generate_prompt").unwrap(),
            ToolArguments::new(),
        )
    }

    #[tokio::test]
    async fn test_unlaunchable_command_is_spawn_error() {
        let session = session_running("/nonexistent/easel-test-binary", &[]);

        let err = session.invoke(&broken_call()).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Spawn);
    }

    #[tokio::test]
    async fn test_process_exiting_before_initialize_is_handshake_error() {
        // `true` exits at once without speaking MCP
        let session = session_running("true", &[]);

        let err = session.invoke(&broken_call()).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Handshake);
        assert_eq!(err.server, "broken");
        assert_eq!(err.tool, "generate_prompt");
    }

    #[tokio::test]
    async fn test_silent_process_hits_startup_timeout() {
        // `sleep` never answers the initialize request
        let session = session_running("sleep", &["30"]).with_timeouts(SessionTimeouts {
            startup: Duration::from_millis(200),
            tool: Duration::from_secs(30),
        });

        let started = Instant::now();
        let err = session.invoke(&broken_call()).await.unwrap_err();

        assert_eq!(err.kind, ToolErrorKind::Timeout);
        assert!(err.message.contains("startup"), "{}", err.message);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_default_timeouts() {
        let timeouts = SessionTimeouts::default();
        assert_eq!(timeouts.startup, Duration::from_secs(30));
        assert_eq!(timeouts.tool, Duration::from_secs(300));
    }
}
