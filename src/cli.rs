use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Referral cascade engine — validate and replay event journals, run demo
/// cascades, and serve the activation API.
#[derive(Parser)]
#[command(name = "bitgpt-core", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Output the JSON schema for event journals
    Schema,

    /// Validate an event journal JSON file without applying it
    Validate {
        /// Path to the journal JSON file
        file: PathBuf,
    },

    /// Replay an event journal through a fresh engine and print balances
    Replay {
        /// Path to the journal JSON file
        file: PathBuf,

        /// Apply the journal a second time and check every balance is
        /// unchanged (idempotency proof)
        #[arg(long)]
        twice: bool,
    },

    /// Run a scripted demo cascade and print the resulting ledger
    Demo,

    /// Serve the HTTP API
    Api {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,
    },
}
