//! pillbox CLI — the main entry point.
//!
//! Commands:
//! - `chat`     — Interactive chat or single-message mode
//! - `tools`    — List the pharmacy capabilities
//! - `onboard`  — Write the default config file
//! - `config`   — Validate, show, or locate the config

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "pillbox",
    about = "pillbox — pharmacy assistant in your terminal",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true, env = "PILLBOX_VERBOSE")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the pharmacy assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List the capabilities offered to the model
    Tools,

    /// Initialize configuration
    Onboard,

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate and summarize the loaded config (default)
    Validate,
    /// Print the effective config as TOML
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Validate) {
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}
