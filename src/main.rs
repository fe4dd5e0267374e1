//! metadata-cli
//!
//! Command-line front end for the metadata client: create a record, update
//! its listed price, list every record or show one.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::{commitment_config::CommitmentConfig, native_token::lamports_to_sol, pubkey::Pubkey};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metadata_client::config::{expand_home, Config, LoggingConfig};
use metadata_client::metrics::Metrics;
use metadata_client::types::{MetadataRecord, NewRecord};
use metadata_client::wallet::WalletManager;
use metadata_client::{RecordFlows, RpcLedger};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "metadata-cli", author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Cluster name (mainnet-beta, testnet, devnet, localnet) or RPC URL
    #[arg(short = 'e', long)]
    env: Option<String>,

    /// Path to the signing keypair
    #[arg(short, long)]
    keypair: Option<String>,

    /// Metadata program id
    #[arg(long, env = "METADATA_PROGRAM_ID")]
    program_id: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a metadata record under the next free id
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        uri: String,

        /// Listed price in SOL
        #[arg(short, long)]
        price: f64,

        /// Mint of the NFT whose holder controls the record
        #[arg(short, long)]
        owner_nft_address: String,
    },

    /// Change the listed price of a record
    UpdatePrice {
        #[arg(short, long)]
        id: u64,

        /// New price in SOL
        #[arg(short, long)]
        price: f64,
    },

    /// List every record of the program
    ShowAll,

    /// Show one record by id
    Show {
        #[arg(short, long)]
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(endpoint) = &args.env {
        config.rpc.endpoint = endpoint.clone();
    }
    if let Some(path) = &args.keypair {
        config.wallet.keypair_path = path.clone();
    }
    if let Some(program_id) = &args.program_id {
        config.program.metadata_program_id = Some(program_id.clone());
    }
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;

    init_logging(&config.logging)?;

    let program_id = config.program_id()?;
    let rpc_url = config.rpc_url();
    info!(endpoint = %rpc_url, program = %program_id, "Connecting");

    let metrics = Arc::new(Metrics::new().context("Failed to create metrics")?);
    let network = Arc::new(RpcLedger::new(
        rpc_url,
        Duration::from_secs(config.rpc.timeout_secs),
        CommitmentConfig::confirmed(),
    ));
    let flows = RecordFlows::new(
        network,
        program_id,
        config.retry.clone(),
        config.confirmation.clone(),
        config.flows.clone(),
        Arc::clone(&metrics),
    );

    match args.command {
        Command::Create {
            name,
            uri,
            price,
            owner_nft_address,
        } => {
            let wallet = load_wallet(&config)?;
            let owner_nft_address = Pubkey::from_str(owner_nft_address.trim())
                .with_context(|| format!("Invalid owner NFT address '{}'", owner_nft_address))?;
            let created = flows
                .create_record(
                    wallet.keypair(),
                    NewRecord {
                        name,
                        uri,
                        price,
                        owner_nft_address: Some(owner_nft_address),
                    },
                )
                .await?;
            info!(
                id = created.id,
                address = %created.address,
                signature = %created.submission.transaction_id,
                confirmed = created.submission.confirmed,
                "Record created"
            );
            println!("{}", created.address);
        }
        Command::UpdatePrice { id, price } => {
            let wallet = load_wallet(&config)?;
            let updated = flows.update_price(wallet.keypair(), id, price).await?;
            info!(
                id = updated.id,
                address = %updated.address,
                holder = %updated.holder.record.owner,
                signature = %updated.submission.transaction_id,
                confirmed = updated.submission.confirmed,
                "Price updated"
            );
            println!("{}", updated.submission.transaction_id);
        }
        Command::ShowAll => {
            for (address, record) in flows.list_records().await? {
                print_record(&address, &record);
            }
        }
        Command::Show { id } => {
            let (address, record) = flows.fetch_record(id).await?;
            print_record(&address, &record);
        }
    }

    if let Ok(rendered) = metrics.render() {
        tracing::debug!(metrics = %rendered, "Session metrics");
    }
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging.level))
        .context("Invalid log filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
            .context("Failed to initialize logging")?;
    }
    Ok(())
}

/// Load configuration with `.env` support and environment overrides
fn load_config(path: &str) -> Result<Config> {
    let exists = std::path::Path::new(path).exists();
    let config = Config::from_file_with_env(path)
        .with_context(|| format!("Failed to load config from {}", path))?;
    if !exists {
        // logging is not up yet
        eprintln!("Config file '{}' not found, using defaults", path);
    }
    Ok(config)
}

fn load_wallet(config: &Config) -> Result<WalletManager> {
    let path = expand_home(&config.wallet.keypair_path);
    let wallet = WalletManager::from_file(&path).context("Failed to load wallet")?;
    info!(wallet = %wallet.pubkey(), "Wallet loaded");
    Ok(wallet)
}

fn print_record(address: &Pubkey, record: &MetadataRecord) {
    println!(
        "#{} {} name={:?} uri={:?} listed={} SOL last={} SOL owner_nft={}",
        record.id,
        address,
        record.name,
        record.uri,
        lamports_to_sol(record.listed_price),
        lamports_to_sol(record.last_price),
        record.owner_nft_address
    );
}
