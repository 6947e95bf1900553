//! `pillbox chat` — Interactive or single-message chat mode.

use pillbox_agent::{ProgressEvent, TurnOrchestrator, system_prompt};
use pillbox_config::AppConfig;
use pillbox_core::message::Transcript;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, mpsc};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early, before any backend call
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export PILLBOX_API_KEY='sk-...'");
        eprintln!("    export OPENAI_API_KEY='sk-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        eprintln!("  Run `pillbox onboard` to create one.");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let backend = pillbox_providers::build_from_config(&config)?;
    let catalog = super::load_catalog(&config)?;
    let tools = Arc::new(pillbox_tools::default_registry(Arc::new(catalog))?);
    let tool_count = tools.names().len();
    let agent = Arc::new(TurnOrchestrator::from_config(&config, backend, tools));
    let transcript = Arc::new(Mutex::new(Transcript::new(system_prompt(&config))));
    tracing::debug!(model = %config.model, tools = tool_count, "Chat session ready");

    if let Some(msg) = message {
        // Single message mode
        render(agent.run_stream(transcript, msg)).await?;
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        pillbox — Pharmacy Assistant          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", config.model);
    println!("  Tools:     {tool_count} capabilities");
    println!("  Rounds:    {} per question", config.agent.max_rounds);
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit" | "/exit" | "/quit") {
            break;
        }

        render(agent.run_stream(transcript.clone(), line)).await?;
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

/// Print one run's progress as it arrives.
///
/// Text deltas stream on one `Agent:` line; tool activity gets its own lines.
async fn render(mut events: mpsc::Receiver<ProgressEvent>) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    let mut streaming = false;

    while let Some(event) = events.recv().await {
        match &event {
            ProgressEvent::Started => {
                println!("  {event}");
            }
            ProgressEvent::Chunk { content } => {
                if !streaming {
                    print!("  Agent: ");
                    streaming = true;
                }
                print!("{content}");
                stdout.flush()?;
            }
            ProgressEvent::ToolCall { .. } | ProgressEvent::ToolResult { .. } => {
                if streaming {
                    println!();
                    streaming = false;
                }
                println!("  {event}");
            }
            ProgressEvent::FinalAnswer { .. } => {
                if streaming {
                    println!();
                } else {
                    println!("  {event}");
                }
            }
            ProgressEvent::Error { .. } => {
                if streaming {
                    println!();
                }
                eprintln!("  [{event}]");
            }
        }
    }

    Ok(())
}
