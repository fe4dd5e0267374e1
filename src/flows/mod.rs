//! Record Flows
//!
//! Orchestrate derivation, scanning, encoding and submission into the
//! operations the CLI exposes:
//! - **create**: assign the next id and create its metadata record
//! - **update**: change a record's listed price on behalf of the NFT holder
//! - listing every record and fetching one by id
//!
//! Each invocation runs as one sequential chain of network calls and keeps
//! no state across invocations, so flows may run concurrently on a shared
//! [`RecordFlows`].

pub mod create;
pub mod errors;
pub mod update;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey, signature::Signature};
use tracing::debug;

use crate::address::derive_metadata_address;
use crate::codec::metadata::decode_metadata;
use crate::metrics::Metrics;
use crate::rpc_manager::LedgerNetwork;
use crate::scanner::{LookupError, StateScanner};
use crate::structured_logging::FlowLogger;
use crate::tx_builder::{ConfirmationConfig, RetryConfig, TransactionEngine};
use crate::types::MetadataRecord;

pub use errors::FlowError;

/// Flow-level tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowConfig {
    /// How often the create flow re-reads the record count after losing the
    /// race for an id
    #[serde(default = "default_create_conflict_retries")]
    pub create_conflict_retries: u32,
}

fn default_create_conflict_retries() -> u32 { 2 }

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            create_conflict_retries: default_create_conflict_retries(),
        }
    }
}

/// SPL token program id in this crate's `Pubkey` type
pub fn spl_token_program_id() -> Pubkey {
    Pubkey::new_from_array(spl_token::ID.to_bytes())
}

/// Convert a SOL amount into lamports
///
/// Rejects NaN, infinities, negative values and amounts that do not fit
/// in a `u64`.
pub fn price_to_lamports(price_sol: f64) -> Result<u64, FlowError> {
    if !price_sol.is_finite() {
        return Err(FlowError::validation(format!("price {} is not a number", price_sol)));
    }
    if price_sol < 0.0 {
        return Err(FlowError::validation(format!("price {} is negative", price_sol)));
    }
    let lamports = (price_sol * LAMPORTS_PER_SOL as f64).round();
    if lamports >= u64::MAX as f64 {
        return Err(FlowError::validation(format!("price {} SOL is too large", price_sol)));
    }
    Ok(lamports as u64)
}

/// Entry point for all record operations against one metadata program
#[derive(Debug, Clone)]
pub struct RecordFlows {
    network: Arc<dyn LedgerNetwork>,
    scanner: StateScanner,
    engine: TransactionEngine,
    program_id: Pubkey,
    token_program_id: Pubkey,
    config: FlowConfig,
}

impl RecordFlows {
    pub fn new(
        network: Arc<dyn LedgerNetwork>,
        program_id: Pubkey,
        retry: RetryConfig,
        confirmation: ConfirmationConfig,
        config: FlowConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            scanner: StateScanner::new(Arc::clone(&network), Arc::clone(&metrics)),
            engine: TransactionEngine::new(Arc::clone(&network), retry, confirmation, metrics),
            network,
            program_id,
            token_program_id: spl_token_program_id(),
            config,
        }
    }

    /// Resolve holders against a different token program
    pub fn with_token_program(mut self, token_program_id: Pubkey) -> Self {
        self.token_program_id = token_program_id;
        self
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Every decodable record of the program, sorted by id
    pub async fn list_records(&self) -> Result<Vec<(Pubkey, MetadataRecord)>, FlowError> {
        let scan = self.scanner.scan(&self.program_id, &[]).await?;
        let total = scan.len();
        let mut records: Vec<(Pubkey, MetadataRecord)> = scan.decoded().collect();
        records.sort_by_key(|(_, record)| record.id);

        debug!(program = %self.program_id, total, decoded = records.len(), "Listed records");
        Ok(records)
    }

    /// The record stored for `id`
    pub async fn fetch_record(&self, id: u64) -> Result<(Pubkey, MetadataRecord), FlowError> {
        let (address, _) = derive_metadata_address(&self.program_id, id)?;
        let data = self
            .network
            .get_account_data(&address)
            .await?
            .ok_or(LookupError::RecordNotFound { address })?;
        let record = decode_metadata(&data).map_err(|source| FlowError::Decode { address, source })?;
        Ok((address, record))
    }

    /// Fetch the landed transaction for the log; failures are swallowed
    async fn log_transaction_record(&self, log: &FlowLogger, signature: &Signature) {
        match self.network.get_transaction_summary(signature).await {
            Ok(summary) => log.log_transaction_summary(signature, &summary),
            Err(err) => {
                debug!(
                    context_id = %log.context_id(),
                    signature = %signature,
                    error = %err,
                    "Transaction record unavailable"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_conversion() {
        assert_eq!(price_to_lamports(1.5).unwrap(), 1_500_000_000);
        assert_eq!(price_to_lamports(0.0).unwrap(), 0);
        assert_eq!(price_to_lamports(0.000000001).unwrap(), 1);
        assert_eq!(price_to_lamports(2.0).unwrap(), 2_000_000_000);
    }

    #[test]
    fn test_price_rejects_non_numbers() {
        assert!(matches!(price_to_lamports(f64::NAN), Err(FlowError::Validation(_))));
        assert!(matches!(price_to_lamports(f64::INFINITY), Err(FlowError::Validation(_))));
        assert!(matches!(price_to_lamports(-0.5), Err(FlowError::Validation(_))));
        assert!(matches!(price_to_lamports(1e12), Err(FlowError::Validation(_))));
    }

    #[test]
    fn test_token_program_id() {
        assert_eq!(
            spl_token_program_id().to_string(),
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
        );
    }

    #[test]
    fn test_flow_config_defaults() {
        assert_eq!(FlowConfig::default().create_conflict_retries, 2);
        let parsed: FlowConfig = toml::from_str("").unwrap();
        assert_eq!(parsed, FlowConfig::default());
    }
}
