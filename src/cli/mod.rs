//! CLI interface for Swarmbot.
//!
//! `serve` runs the bot. The remaining commands are one-shot helpers for
//! operators: probe pressure, print the queue, manage configuration.

mod commands;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;
pub use utils::*;

#[derive(Parser)]
#[command(name = "swarmbot")]
#[command(about = "On-call swarm bot for PagerDuty and Jira queues")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file path
    #[arg(long, global = true, env = "SWARMBOT_CONFIG_PATH")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the monitor and the slash command endpoint
    Serve {
        /// Address for the slash command endpoint (overrides config)
        #[arg(long, short = 'l')]
        listen: Option<String>,
    },

    /// Run one pressure check and print the readings
    Check,

    /// Print the open incident list without posting it
    List,

    /// Initialize default configuration at default location
    Init {
        #[arg(long)]
        force: bool,
    },

    /// Manage configuration
    Config {
        #[arg(long)]
        show: bool,

        #[arg(long)]
        validate: bool,

        /// Treat validation warnings as errors
        #[arg(long, requires = "validate")]
        strict: bool,
    },

    /// Show version information
    Version,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        let config_path = self.config;
        match self.command {
            Commands::Serve { listen } => serve(config_path, listen).await,
            Commands::Check => check(config_path).await,
            Commands::List => list(config_path).await,
            Commands::Init { force } => init(config_path, force).await,
            Commands::Config {
                show,
                validate,
                strict,
            } => config(config_path, show, validate, strict).await,
            Commands::Version => version().await,
        }
    }
}
