use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use eos_account_sync::{
    AccountAvailability, AccountSync, HistoryMerge, SyncConfig, SyncEvent, TokenRequestSpec,
};

#[derive(Parser)]
#[command(author, version, about = "Sync EOS/WAX account state from a chain node", long_about = None)]
struct Cli {
    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Chain node URL (overrides the settings file)
    #[arg(long, env = "EOS_RPC_URL")]
    node: Option<String>,
    /// Print every emitted event after the result
    #[arg(long)]
    events: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and normalize an account, following its voter proxy
    Account { name: String },
    /// Fetch one page of actions
    Actions {
        name: String,
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        pos: i64,
        #[arg(long, default_value_t = -100, allow_hyphen_values = true)]
        offset: i64,
    },
    /// Query token balances
    Balances {
        name: String,
        /// contract:symbol pairs replacing the configured token list
        #[arg(long, value_delimiter = ',')]
        tokens: Vec<TokenRequestSpec>,
    },
    /// Read the WAX genesis balance row
    Genesis { name: String },
    /// List accounts controlled by a public key
    KeyAccounts { public_key: String },
    /// Check whether an account name is free
    Available { name: String },
}

fn load_config(cli: &Cli) -> Result<SyncConfig> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_path(path)?,
        None => SyncConfig::default(),
    };
    if let Some(node) = &cli.node {
        config.node = Some(node.clone());
    }
    Ok(config)
}

fn drain(rx: &mut UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let (sync, mut rx) = AccountSync::connect(&config).context("cannot reach chain node")?;

    let output: Value = match &cli.command {
        Commands::Account { name } => serde_json::to_value(sync.get_account(&config, name).await?)?,
        Commands::Actions { name, pos, offset } => {
            match sync.get_actions(&config, name, *pos, *offset).await? {
                HistoryMerge::NoChange => json!({ "no_change": true }),
                HistoryMerge::Updated(list) => json!({ "no_change": false, "list": list }),
            }
        }
        Commands::Balances { name, tokens } => {
            let requested = (!tokens.is_empty()).then_some(tokens.as_slice());
            sync.get_currency_balance(&config, name, requested).await?;
            serde_json::to_value(sync.store().all_balances(name))?
        }
        Commands::Genesis { name } => {
            serde_json::to_value(sync.get_genesis_balance(&config, name).await?)?
        }
        Commands::KeyAccounts { public_key } => {
            serde_json::to_value(sync.get_account_by_key(&config, public_key).await?)?
        }
        Commands::Available { name } => {
            let availability = sync.check_account_availability(&config, name).await?;
            json!({
                "account_name": name,
                "available": availability == AccountAvailability::Available,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    if cli.events {
        println!("{}", serde_json::to_string_pretty(&drain(&mut rx))?);
    }

    Ok(())
}
