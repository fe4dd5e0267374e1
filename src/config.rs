//! Configuration module for the metadata client
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::address::parse_program_address;
use crate::flows::FlowConfig;
use crate::tx_builder::{ConfirmationConfig, RetryConfig};

/// Environment variable holding the metadata program id
pub const PROGRAM_ID_ENV: &str = "METADATA_PROGRAM_ID";
/// Environment variable overriding `rpc.endpoint`
pub const RPC_URL_ENV: &str = "RPC_URL";
/// Environment variable overriding `wallet.keypair_path`
pub const KEYPAIR_PATH_ENV: &str = "KEYPAIR_PATH";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub program: ProgramConfig,

    /// Broadcast retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Finalization polling
    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    #[serde(default)]
    pub flows: FlowConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcConfig {
    /// Cluster name (`mainnet-beta`, `testnet`, `devnet`, `localnet`) or URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgramConfig {
    /// Base58 address of the metadata program
    #[serde(default)]
    pub metadata_program_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_endpoint() -> String { "devnet".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Resolve a cluster name to its public RPC URL; anything else is taken as a URL
pub fn cluster_url(endpoint: &str) -> String {
    match endpoint.trim() {
        "mainnet-beta" | "mainnet" => "https://api.mainnet-beta.solana.com".to_string(),
        "testnet" => "https://api.testnet.solana.com".to_string(),
        "devnet" => "https://api.devnet.solana.com".to_string(),
        "localnet" | "localhost" => "http://127.0.0.1:8899".to_string(),
        other => other.to_string(),
    }
}

/// Expand a leading `~/` against `$HOME`
pub fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load `.env`, then the TOML file (defaults if it does not exist), then
    /// apply environment overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from the environment, read through `lookup`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(program_id) = non_empty(PROGRAM_ID_ENV) {
            self.program.metadata_program_id = Some(program_id);
        }
        if let Some(endpoint) = non_empty(RPC_URL_ENV) {
            self.rpc.endpoint = endpoint;
        }
        if let Some(path) = non_empty(KEYPAIR_PATH_ENV) {
            self.wallet.keypair_path = path;
        }
    }

    /// Resolved RPC URL
    pub fn rpc_url(&self) -> String {
        cluster_url(&self.rpc.endpoint)
    }

    /// Parsed metadata program id
    pub fn program_id(&self) -> anyhow::Result<Pubkey> {
        let raw = self.program.metadata_program_id.as_deref().with_context(|| {
            format!(
                "metadata program id not configured (set program.metadata_program_id or {})",
                PROGRAM_ID_ENV
            )
        })?;
        Ok(parse_program_address(raw)?)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.endpoint.trim().is_empty() {
            anyhow::bail!("rpc.endpoint must not be empty");
        }
        if self.rpc.timeout_secs == 0 {
            anyhow::bail!("rpc.timeout_secs must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            anyhow::bail!(
                "retry.jitter_factor must be within 0.0..=1.0, got {}",
                self.retry.jitter_factor
            );
        }
        if self.retry.base_backoff_ms > self.retry.max_backoff_ms {
            anyhow::bail!("retry.base_backoff_ms exceeds retry.max_backoff_ms");
        }
        if self.confirmation.poll_interval_ms == 0 {
            anyhow::bail!("confirmation.poll_interval_ms must be at least 1");
        }
        if let Some(raw) = &self.program.metadata_program_id {
            parse_program_address(raw)?;
        }
        Ok(())
    }
}
