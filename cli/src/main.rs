// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # TaskHub Task Service
//!
//! The `taskhub` binary hosts the task service: the HTTP API, the project
//! event consumer and the task event relay.
//!
//! ## Commands
//!
//! - `taskhub serve [--port N] [--bind ADDR]` - Run the service
//! - `taskhub config show|validate|generate` - Configuration management

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use taskhub_cli::commands::{self, ConfigCommand, ServeArgs};
use taskhub_cli::logging::{init_logging, with_bootstrap_logging, LogFormat};

/// TaskHub task service
#[derive(Parser)]
#[command(name = "taskhub")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "TASKHUB_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the task service
    #[command(name = "serve")]
    Serve(ServeArgs),

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

    match cli.command {
        Commands::Serve(args) => {
            let bootstrap_level = cli.log_level.as_deref().unwrap_or("info");
            let config = with_bootstrap_logging(bootstrap_level, || {
                commands::serve::load_config(&args, cli.config)
            })?;
            let level = cli.log_level.as_deref().unwrap_or(&config.spec.logging.level);
            init_logging(level, LogFormat::parse(&config.spec.logging.format))?;
            info!(
                version = env!("CARGO_PKG_VERSION"),
                "Starting TaskHub task service"
            );
            commands::serve::run(config).await
        }
        Commands::Config { command } => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Compact)?;
            commands::config::handle_command(command, cli.config).await
        }
    }
}
