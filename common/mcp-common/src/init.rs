//! Tracing setup and the `serve_stdio!` macro
//!
//! Logs always go to stderr. For servers stdout carries the MCP protocol,
//! for the CLI it carries user-facing output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for an MCP server crate at `info`
///
/// ```rust,ignore
/// mcp_common::init_tracing("prompt_mcp")?;
/// ```
pub fn init_tracing(crate_name: &str) -> anyhow::Result<()> {
    init_tracing_with_level(crate_name, "info")
}

/// Initialize tracing with an explicit default level for `crate_name`
///
/// `RUST_LOG` directives are honoured on top of the default. Set
/// `LOG_FORMAT=json` for JSON lines instead of human-readable text.
pub fn init_tracing_with_level(crate_name: &str, level: &str) -> anyhow::Result<()> {
    let directive = format!("{}={}", crate_name, level);
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}

/// Generate `main` for a stdio MCP server
///
/// `$server_type` must provide `new()`. The calling crate needs `tokio`,
/// `rmcp`, `tracing` and `anyhow` as dependencies.
///
/// ```rust,ignore
/// mcp_common::serve_stdio!(PromptMcpServer, "prompt_mcp");
/// ```
#[macro_export]
macro_rules! serve_stdio {
    ($server_type:ty, $crate_name:expr) => {
        #[tokio::main]
        async fn main() -> anyhow::Result<()> {
            use rmcp::ServiceExt;

            $crate::init_tracing($crate_name)?;

            tracing::info!(concat!("Starting ", $crate_name, " MCP Server"));

            let server = <$server_type>::new();
            let service = server.serve(rmcp::transport::stdio()).await?;

            service.waiting().await?;

            tracing::info!("Server shutting down");
            Ok(())
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_level_rejected() {
        // Directive parsing fails before any global subscriber is touched
        assert!(init_tracing_with_level("easel", "not a level!").is_err());
    }
}
