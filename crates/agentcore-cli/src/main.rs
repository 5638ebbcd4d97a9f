//! CLI entry point for the agent runtime core.
//!
//! Provides the `agentcore` command with subcommands for running a turn
//! loop, inspecting session transcripts, and reporting runtime status. The
//! LLM wire protocol, individual tool implementations, and MCP client are
//! out of scope for this crate; `run` wires everything else into a live
//! [`AgentHost`] and surfaces `chat_disabled` until a real provider adapter
//! is plugged in.

mod chat_disabled;
mod cli;
mod helpers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use agentcore_agent::{AgentHost, AutoApprove, LoopOutcome};
use agentcore_kernel::{CancellationHandle, PermissionMode};
use agentcore_store::SessionStore;

use crate::chat_disabled::DisabledChatService;
use crate::cli::{Cli, Commands, SessionAction};
use crate::helpers::{init_tracing, load_runtime_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { session, config } => cmd_run(session, config).await,
        Commands::Status => cmd_status().await,
        Commands::Sessions { action } => cmd_sessions(action).await,
    }
}

fn project_dir() -> Result<PathBuf> {
    std::env::current_dir().context("failed to get current directory")
}

async fn cmd_run(session: Option<String>, config_path: Option<String>) -> Result<()> {
    init_tracing("info");

    let config = load_runtime_config(config_path.as_deref())?;
    let project_dir = project_dir()?;
    let session_id = session.unwrap_or_else(|| uuid::Uuid::now_v7().to_string());

    info!(session_id = %session_id, "starting agent turn loop");

    let host = AgentHost::new(
        &config,
        Arc::new(DisabledChatService),
        Arc::new(AutoApprove),
        agentcore_store::default_storage_root(),
        project_dir,
        session_id.clone(),
        PermissionMode::Default,
    );

    host.resume().await.context("failed to resume session")?;

    let result = host.run(&session_id, CancellationHandle::new(), None, None).await;
    match result.outcome {
        LoopOutcome::Success { final_message } => {
            println!("{final_message}");
            Ok(())
        }
        LoopOutcome::Aborted => {
            eprintln!("  turn loop aborted");
            std::process::exit(1);
        }
        LoopOutcome::MaxTurnsExceeded { turn, max_turns } => {
            eprintln!("  turn limit exceeded: {turn} > {max_turns}");
            std::process::exit(1);
        }
        LoopOutcome::LlmError(message) => {
            eprintln!("  chat service error: {message}");
            eprintln!("  (no LLM provider is wired into this build; agentcore-cli only exercises the runtime plumbing)");
            std::process::exit(1);
        }
    }
}

async fn cmd_status() -> Result<()> {
    init_tracing("warn");

    let config = load_runtime_config(None)?;
    let project_dir = project_dir()?;
    let storage_root = agentcore_store::default_storage_root();

    println!();
    println!("  Agent Runtime Core Status");
    println!("  =========================");
    println!();
    println!("  Project directory: {}", project_dir.display());
    println!("  Session storage:   {}", storage_root.display());
    println!("  Max turns:         {}", config.limits.max_turns);
    println!("  Max concurrent hooks: {}", config.limits.max_concurrent_hooks);
    println!("  Model:             {}", config.model.as_deref().unwrap_or("(none configured)"));
    println!();

    Ok(())
}

async fn cmd_sessions(action: SessionAction) -> Result<()> {
    init_tracing("warn");

    let project_dir = project_dir()?;
    let project_path = project_dir.to_string_lossy().to_string();
    let storage_root = agentcore_store::default_storage_root();
    let store = SessionStore::new(storage_root.clone());

    match action {
        SessionAction::List => {
            let dir = storage_root.join(agentcore_store::escape_project_path(&project_path));
            let mut ids = Vec::new();
            if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
                while let Some(entry) = entries.next_entry().await.context("failed to read session directory")? {
                    if let Some(name) = entry.path().file_stem().and_then(|s| s.to_str()) {
                        ids.push(name.to_string());
                    }
                }
            }

            if ids.is_empty() {
                println!("  No sessions found for this project.");
                return Ok(());
            }

            ids.sort();
            println!();
            println!("  {:<40}", "SESSION ID");
            println!("  {}", "-".repeat(40));
            for id in &ids {
                println!("  {id:<40}");
            }
            println!();
        }

        SessionAction::Show { id } => {
            let messages = store.load(&project_path, &id).await.context("failed to load session")?;

            if messages.is_empty() {
                println!("  Session '{id}' has no messages.");
                return Ok(());
            }

            println!();
            println!("  Session: {id} ({} messages)", messages.len());
            println!("  {}", "-".repeat(50));
            for message in &messages {
                println!("  [{:?}] {}", message.role(), message.content());
            }
            println!();
        }
    }

    Ok(())
}
