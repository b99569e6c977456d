//! # relaychat
//!
//! Headless terminal client for a relaychat relay.
//!
//! ## Commands
//!
//! - `watch`: Poll the relay and print messages as they arrive
//! - `send`: Send a message and wait for the relay to accept it
//! - `contacts`: List contacts with unseen counts
//! - `status`: Show identity, contacts and connectivity
//!
//! ## Example
//!
//! ```bash
//! # Follow the conversation on a local relay
//! relaychat --server http://127.0.0.1:8080 watch
//!
//! # Send a message
//! relaychat send bob "Hello from the terminal"
//!
//! # Verbose retry logging
//! RUST_LOG=relaychat_client=debug relaychat status
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::rc::Rc;
use tokio::task::LocalSet;

use relaychat_client::{ChatSession, ClientConfig, ReqwestTransport};

mod commands;
mod config;

use commands::{contacts, send, status, watch};

/// Headless terminal client for relaychat.
#[derive(Parser, Debug)]
#[command(name = "relaychat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Relay base URL, overriding the configuration file
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the relay and print messages until Ctrl-C
    Watch,

    /// Send a message
    Send {
        /// Recipient identity
        contact: String,

        /// Message text
        text: String,
    },

    /// List contacts with unseen counts
    Contacts,

    /// Show identity, contacts and connectivity
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::load(cli.config.as_deref(), cli.server.as_deref())?;

    // Stores are Rc-based: one thread, tasks spawned on a LocalSet
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let local = LocalSet::new();

    local.block_on(&runtime, run(cli.command, config))
}

async fn run(command: Commands, config: ClientConfig) -> Result<()> {
    let transport =
        ReqwestTransport::from_config(&config).context("Failed to create HTTP transport")?;

    tracing::info!("Connecting to {}", config.server.url);
    let session = Rc::new(ChatSession::start(&config, transport).await);

    match command {
        Commands::Watch => watch::run(&session).await,
        Commands::Send { contact, text } => send::run(&session, &contact, &text).await,
        Commands::Contacts => contacts::run(&session).await,
        Commands::Status => status::run(&session).await,
    }
}
