// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Zapflow - WhatsApp CRM conversational agent orchestrator.
//!
//! Binary entry point: CLI parsing, logging setup, and dispatch to the
//! serve loop.

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Zapflow - WhatsApp CRM conversational agent orchestrator.
#[derive(Parser, Debug)]
#[command(name = "zapflow", version, about, long_about = None)]
struct Cli {
    /// Explicit config file (defaults to the XDG hierarchy).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server.
    Serve,
    /// Print the effective merged configuration.
    Config,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match zapflow_config::load_effective(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("zapflow: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run(config, cli.config).await {
                eprintln!("zapflow serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("zapflow config: failed to render: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("zapflow: use --help for available commands");
        }
    }
}
