use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod agent;
mod commands;
mod config;
mod conversation;
mod events;
mod markup;
mod ui;

use crate::agent::AgentClient;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "snoochat")]
#[command(version)]
#[command(about = "Terminal chat client for a Reddit research agent", long_about = None)]
struct Cli {
    /// Agent backend base URL (overrides config and SNOOCHAT_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ping the agent backend and report whether it is reachable
    Check,
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    match cli.command {
        None => {
            // The TUI owns the terminal, so logs go to a file.
            init_logging(cli.debug, Some(config.log_path()))?;
            ui::run(config).await
        }
        Some(Commands::Check) => {
            init_logging(cli.debug, None)?;
            check_backend(&config).await
        }
        Some(Commands::Config) => {
            init_logging(cli.debug, None)?;
            print_config(&config);
            Ok(())
        }
    }
}

fn init_logging(debug: bool, log_file: Option<PathBuf>) -> Result<()> {
    let default_filter = if debug {
        "snoochat=debug"
    } else {
        "snoochat=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

async fn check_backend(config: &Config) -> Result<()> {
    let client = AgentClient::new(&config.endpoint, config.request_timeout())?;
    println!("🔎 Checking {} ...", client.base_url());

    match client.check().await {
        Ok(body) => {
            println!("✅ Agent backend is reachable");
            let body = body.trim();
            if !body.is_empty() {
                println!("   {}", body);
            }
            Ok(())
        }
        Err(error) => {
            println!("❌ Agent backend is not reachable");
            println!("   {:#}", error);
            std::process::exit(1);
        }
    }
}

fn print_config(config: &Config) {
    println!("📄 Config file: {}", config.config_path().display());
    println!();
    println!("endpoint             = {}", config.endpoint);
    println!("request_timeout_secs = {}", config.request_timeout_secs);
    println!("ui.show_steps        = {}", config.ui.show_steps);
    println!("ui.sanitize_replies  = {}", config.ui.sanitize_replies);
    println!("ui.tick_rate_ms      = {}", config.ui.tick_rate_ms);
}
