//! Ledger Assembler CLI Application
//!
//! A command-line interface for inspecting configuration and exercising the
//! assembly engine against an in-memory ledger.

use clap::{Parser, Subcommand};
use ledger_assembler::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "assembler")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Signer resolution and transaction assembly for multisig ledger accounts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new account key pair
    Keygen,

    /// Load and validate an engine configuration file
    CheckConfig {
        /// Path to the JSON configuration
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Show how a value maps onto a transaction memo
    Memo {
        /// Text, a number, or 0x-prefixed hex bytes
        value: String,
    },

    /// Run a scripted flow against an in-memory ledger
    Sandbox,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen => {
            cli::cmd_keygen()?;
        }

        Commands::CheckConfig { config } => {
            cli::cmd_check_config(&config)?;
        }

        Commands::Memo { value } => {
            cli::cmd_memo(&value)?;
        }

        Commands::Sandbox => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_sandbox())?;
        }
    }

    Ok(())
}
