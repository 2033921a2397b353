// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

//! # memlink CLI
//!
//! The `memlink` binary exposes the memory layer's LLM access and
//! categorization from the command line.
//!
//! ## Commands
//!
//! - `memlink generate [PROMPT]` - Run a conversation through an LLM backend
//! - `memlink categorize TEXT` - Tag a memory
//! - `memlink health` - Check that configured backends can be launched
//! - `memlink config show|validate|generate` - Configuration management
//!
//! Generated text goes to stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memlink_core::domain::memory_config::{LoggingConfig, MemoryConfigManifest};
use std::path::PathBuf;

mod commands;

use commands::{CategorizeCommand, ConfigCommand, GenerateCommand};

/// memlink - LLM backends and memory categorization
#[derive(Parser)]
#[command(name = "memlink")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery, must exist).
    /// MEMLINK_CONFIG_PATH is only the first discovery candidate.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: config or warn]
    #[arg(long, global = true, env = "MEMLINK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json) [default: config or text]
    #[arg(long, global = true, env = "MEMLINK_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a response with an LLM backend
    #[command(name = "generate")]
    Generate(GenerateCommand),

    /// Assign topical categories to a memory
    #[command(name = "categorize")]
    Categorize(CategorizeCommand),

    /// Check every configured backend
    #[command(name = "health")]
    Health,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logging settings from the config file apply unless flags override
    // them; a broken config is reported by the command itself.
    let file_logging = MemoryConfigManifest::load_or_default(cli.config.clone())
        .ok()
        .and_then(|manifest| manifest.spec.observability)
        .and_then(|observability| observability.logging);
    init_logging(
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
        file_logging.as_ref(),
    )?;

    match cli.command {
        Commands::Generate(command) => commands::generate::handle_command(command, cli.config).await,
        Commands::Categorize(command) => {
            commands::categorize::handle_command(command, cli.config).await
        }
        Commands::Health => commands::health::handle_command(cli.config).await,
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
    }
}

/// Initialize tracing subscriber for logging.
///
/// Precedence: `RUST_LOG`, then flags/env, then the config file, then `warn`
/// in text format.
fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
    file_logging: Option<&LoggingConfig>,
) -> Result<()> {
    let level = level
        .or_else(|| file_logging.map(|l| l.level.as_str()))
        .unwrap_or("warn");
    let format = format
        .or_else(|| file_logging.map(|l| l.format.as_str()))
        .unwrap_or("text");

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().init(),
        "text" => builder.compact().init(),
        other => anyhow::bail!("Unknown log format '{}'. Expected text or json", other),
    }

    Ok(())
}
