use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use easel::config::{EaselFileConfig, McpConfig};
use easel::db::Database;
use easel::mcp::McpToolSession;
use easel::output::{render_history, render_outcome, render_threads};
use easel::{CheckpointStore, ResumeDriver, RunOutcome, WorkflowEngine};

#[derive(Parser)]
#[command(name = "easel")]
#[command(about = "Resumable prompt -> approval -> image pipeline over MCP tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Checkpoint database path
    #[arg(long, global = true, env = "EASEL_DB")]
    db: Option<PathBuf>,

    /// Pipeline config (.easel.toml)
    #[arg(long, global = true, env = "EASEL_CONFIG")]
    config: Option<PathBuf>,

    /// MCP server config (.mcp.json)
    #[arg(long, global = true, env = "EASEL_MCP_CONFIG")]
    mcp_config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start, resume, or inspect a thread (one step per call)
    Run {
        /// Thread to act on (a new id is generated when omitted)
        #[arg(long)]
        thread_id: Option<String>,
        /// Topic for a new thread
        #[arg(long)]
        topic: Option<String>,
        /// Answer to the pending question
        #[arg(long)]
        feedback: Option<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a thread to completion, asking for feedback on stdin
    Interactive {
        #[arg(long)]
        thread_id: Option<String>,
        #[arg(long)]
        topic: Option<String>,
    },
    /// Show every checkpoint of a thread
    History {
        thread_id: String,
    },
    /// List known threads
    Threads {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    mcp_common::init_tracing_with_level("easel", "warn")?;

    let cli = Cli::parse();
    let config = match cli.config {
        Some(ref path) => EaselFileConfig::load_from_path(path)?,
        None => EaselFileConfig::load()?,
    };
    let db = open_database(cli.db.clone(), &config)?;

    match cli.command {
        Commands::Run {
            thread_id,
            topic,
            feedback,
            json,
        } => {
            let driver = build_driver(db, &config, cli.mcp_config.as_deref())?;
            let thread_id = thread_id.unwrap_or_else(ResumeDriver::new_thread_id);
            let outcome = driver
                .run(&thread_id, topic.as_deref(), feedback.as_deref())
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("Thread: {}", outcome.thread_id());
                println!("{}", render_outcome(&outcome));
            }

            if outcome.is_failed() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Interactive { thread_id, topic } => {
            let driver = build_driver(db, &config, cli.mcp_config.as_deref())?;
            let thread_id = thread_id.unwrap_or_else(ResumeDriver::new_thread_id);
            let outcome = run_interactive(&driver, &thread_id, topic).await?;
            if outcome.is_failed() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::History { thread_id } => {
            let history = db.history(&thread_id)?;
            if history.is_empty() {
                println!("No checkpoints for thread '{}'.", thread_id);
            } else {
                print!("{}", render_history(&history));
            }
        }
        Commands::Threads { limit } => {
            let threads = db.list_threads(limit)?;
            if threads.is_empty() {
                println!("No threads yet.");
            } else {
                print!("{}", render_threads(&threads));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// CLI flag, then `[store] path`, then ~/.easel/checkpoints.db
fn open_database(flag: Option<PathBuf>, config: &EaselFileConfig) -> Result<Database> {
    match flag {
        Some(path) => Database::open_at(path),
        None => match config.store.resolved_path()? {
            Some(path) => Database::open_at(path),
            None => Database::open(),
        },
    }
}

fn build_driver(
    db: Database,
    config: &EaselFileConfig,
    mcp_config: Option<&std::path::Path>,
) -> Result<ResumeDriver> {
    let servers = match mcp_config {
        Some(path) => McpConfig::load_from_path(path)?,
        None => McpConfig::load()?.unwrap_or_else(|| {
            tracing::warn!("No .mcp.json found, every tool call will fail");
            McpConfig::default()
        }),
    };

    let tools = McpToolSession::new(servers).with_timeouts(config.session.timeouts());
    let engine = WorkflowEngine::new(
        Arc::new(db),
        Arc::new(tools),
        config.steps.to_pipeline_steps(),
    );
    Ok(ResumeDriver::new(engine))
}

async fn run_interactive(
    driver: &ResumeDriver,
    thread_id: &str,
    topic: Option<String>,
) -> Result<RunOutcome> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let topic = match topic {
        Some(topic) => Some(topic),
        None if driver.engine().store().load_latest(thread_id)?.is_none() => {
            print!("Topic: ");
            stdout.flush()?;
            let mut line = String::new();
            stdin.lock().read_line(&mut line)?;
            Some(line.trim().to_string())
        }
        None => None,
    };

    println!("Thread: {}", thread_id);
    let mut outcome = driver.run(thread_id, topic.as_deref(), None).await;

    loop {
        println!("\n{}", render_outcome(&outcome));

        if !matches!(outcome, RunOutcome::PendingFeedback { .. }) {
            return Ok(outcome);
        }

        print!("> ");
        stdout.flush()?;
        let mut answer = String::new();
        let read = stdin
            .lock()
            .read_line(&mut answer)
            .context("Failed to read feedback")?;
        if read == 0 {
            // stdin closed, the thread stays parked
            println!();
            return Ok(outcome);
        }

        let answer = match answer.trim() {
            "" => "y",
            other => other,
        };
        outcome = driver.run(thread_id, None, Some(answer)).await;
    }
}
