use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::store::LocalStore;
use crate::transport::{DirectoryLayout, DirectoryTransport, Stage};

#[derive(Parser)]
#[command(name = "importer")]
#[command(about = "Importer - inspect and manage a directory-backed import root", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Import root directory (overrides config file and env vars)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the incoming, processing, completed and terminated directories
    Init,

    /// Show how many items sit in each stage
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the items in one stage
    List {
        /// Stage to list: incoming, processing, completed or terminated
        stage: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move an item from processing or terminated back to incoming
    Requeue {
        /// Stage the item is in: processing or terminated
        stage: String,

        /// Item name
        name: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before executing any command
    let config = Config::builder()
        .config_path(cli.config.clone())
        .root(cli.root.clone())
        .build()?;

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }

        Commands::Init => {
            let (root, transport) = open_transport(&config)?;
            transport.ensure_layout().await?;
            println!("✓ Initialized import root at {}", root.display());
        }

        Commands::Status { json } => {
            let (root, transport) = open_transport(&config)?;
            let counts = transport
                .counts()
                .await
                .with_context(|| format!("Failed to read import root {}", root.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                println!("Import root: {}", root.display());
                for stage in Stage::ALL {
                    println!("  {:<12}{}", stage.as_str(), counts.get(stage));
                }
            }
        }

        Commands::List { stage, json } => {
            let stage: Stage = stage.parse()?;
            let (_, transport) = open_transport(&config)?;
            let items = transport.list(stage).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
                return Ok(());
            }

            if items.is_empty() {
                println!("No items in {}", stage);
                return Ok(());
            }

            println!("Found {} item(s) in {}:\n", items.len(), stage);
            for item in items {
                println!(
                    "  {} | {} bytes | {} failed attempt(s)",
                    item.name, item.size, item.attempts
                );
            }
        }

        Commands::Requeue { stage, name, yes } => {
            if !yes {
                eprintln!("Error: Confirmation required. Use --yes flag to confirm requeue.");
                std::process::exit(1);
            }

            let stage: Stage = stage.parse()?;
            let (_, transport) = open_transport(&config)?;
            transport.requeue(stage, &name).await?;
            println!("✓ {} moved from {} to {}", name, stage, Stage::Incoming);
        }
    }

    Ok(())
}

fn open_transport(config: &Config) -> Result<(&Path, DirectoryTransport)> {
    let root = config.root()?;
    let transport = DirectoryTransport::new(Arc::new(LocalStore::new()), DirectoryLayout::new(root))
        .with_retry_policy(config.retry_policy());
    Ok((root, transport))
}
