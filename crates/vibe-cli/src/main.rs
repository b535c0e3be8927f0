//! Vibe CLI - generate, cache and run declared functions
//!
//! - `vibe run` materializes a declaration and calls it
//! - `vibe key` / `vibe prompt` show what a declaration resolves to
//! - `vibe cache` lists and evicts cached functions

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vibe_runtime::VibeConfig;

mod commands;
mod declaration;

use commands::{cache, inspect, run};

/// Vibe CLI application
#[derive(Parser)]
#[command(name = "vibe")]
#[command(about = "Vibe - functions declared by signature and docstring, generated on first use", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "VIBE_CONFIG")]
    config: Option<PathBuf>,

    /// Cache directory, overriding the configuration
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "VIBE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Materialize a declaration and call it; the result is printed as JSON
    Run {
        /// Declaration file (JSON)
        file: PathBuf,

        /// Arguments, each a JSON value (bare words are taken as strings)
        args: Vec<String>,
    },

    /// Show the cache key and cache path of a declaration
    Key {
        /// Declaration file (JSON)
        file: PathBuf,
    },

    /// Show the prompt a cache miss would send
    Prompt {
        /// Declaration file (JSON)
        file: PathBuf,
    },

    /// Inspect and manage cached functions
    Cache {
        #[command(subcommand)]
        command: cache::CacheCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let mut config =
        VibeConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    tracing::debug!(config = ?config, "Configuration loaded");

    match cli.command {
        Commands::Run { file, args } => run::execute(&config, &file, &args).await,
        Commands::Key { file } => inspect::key(&config, &file),
        Commands::Prompt { file } => inspect::prompt(&config, &file),
        Commands::Cache { command } => cache::execute(command, &config),
    }
}
