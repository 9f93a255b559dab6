//! Batch transfer tool for Cosmos-SDK chains
//!
//! # WARNING
//! - Broadcast transfers cannot be undone. Try `--dry-run` first.
//! - A transfer whose confirmation is lost may be sent twice.
//! - Seed files hold spendable keys. `sweep` refuses a seed file that group
//!   or others can read.
//!
//! Exits with 1 when a command fails and 2 when no node endpoint is healthy.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

// Use the library crate
use cosmos_batch_transfer::cli::commands;
use cosmos_batch_transfer::config::Config;
use cosmos_batch_transfer::Error;

/// Batch transfer tool - sweep many wallets or distribute from one
#[derive(Parser)]
#[command(name = "batch-transfer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move everything above the reserve from every seed wallet to one address
    Sweep {
        /// Destination address
        recipient: String,

        /// Seed phrase file (default: files.seeds)
        #[arg(long)]
        seeds: Option<String>,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,

        /// Plan only, don't broadcast
        #[arg(long)]
        dry_run: bool,
    },

    /// Send the same amount from one wallet to every recipient
    Distribute {
        /// Amount per recipient with unit, e.g. "0.5bbn" or "500000ubbn"
        #[arg(short, long)]
        amount: Option<String>,

        /// Recipient address file (default: files.recipients)
        #[arg(long)]
        recipients: Option<String>,

        /// Sender seed phrase (prompted for when absent)
        #[arg(long, env = "SENDER_SEED", hide_env_values = true)]
        sender_seed: Option<String>,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,

        /// Plan only, don't broadcast
        #[arg(long)]
        dry_run: bool,
    },

    /// Probe every configured endpoint
    Health {
        /// Address for the sample balance query (default: network.probe_address)
        #[arg(long)]
        address: Option<String>,
    },

    /// Show the balance of an address
    Balance {
        address: String,
    },

    /// View transfer history
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cosmos_batch_transfer=info")),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Sweep {
            recipient,
            seeds,
            force,
            dry_run,
        } => commands::sweep(&config, &recipient, seeds.as_deref(), force, dry_run).await,
        Commands::Distribute {
            amount,
            recipients,
            sender_seed,
            force,
            dry_run,
        } => {
            commands::distribute(
                &config,
                sender_seed,
                amount.as_deref(),
                recipients.as_deref(),
                force,
                dry_run,
            )
            .await
        }
        Commands::Health { address } => commands::health(&config, address.as_deref()).await,
        Commands::Balance { address } => commands::balance(&config, &address).await,
        Commands::History { limit } => commands::history(&config, limit),
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        let fatal = e.downcast_ref::<Error>().is_some_and(Error::is_fatal);
        std::process::exit(if fatal { 2 } else { 1 });
    }

    Ok(())
}
