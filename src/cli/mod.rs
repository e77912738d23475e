//! CLI module - Command-line interface for the season pass backend
//!
//! This module provides a structured CLI using clap for argument parsing.

use clap::{Parser, Subcommand};

/// Season pass purchase backend
/// Pricing, coupons, hosted payments and invoices for short drama series
#[derive(Parser)]
#[command(name = "seasonpass")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web API together with the order expiry sweep
    #[command(alias = "daemon", alias = "-d")]
    Serve,

    /// Expire stale pending orders once and exit
    #[command(alias = "expire")]
    Sweep,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Validate the config file and print a summary
    #[command(alias = "check")]
    CheckConfig,
}

impl Cli {
    /// No subcommand means serve.
    #[must_use]
    pub fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }
}
