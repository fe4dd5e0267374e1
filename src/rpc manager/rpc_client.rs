//! [`LedgerNetwork`] over a Solana JSON-RPC endpoint

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcTransactionConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::UiTransactionEncoding;
use tracing::{debug, instrument};

use super::{AccountFilter, LedgerNetwork, NetworkError, RawAccount, SignatureState, TransactionSummary};

/// Shared nonblocking RPC client; safe for concurrent independent calls
pub struct RpcLedger {
    client: Arc<RpcClient>,
    endpoint: String,
    commitment: CommitmentConfig,
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("endpoint", &self.endpoint)
            .field("commitment", &self.commitment)
            .finish_non_exhaustive()
    }
}

impl RpcLedger {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, commitment: CommitmentConfig) -> Self {
        let endpoint = endpoint.into();
        let client = RpcClient::new_with_timeout_and_commitment(endpoint.clone(), timeout, commitment);
        Self {
            client: Arc::new(client),
            endpoint,
            commitment,
        }
    }

    /// Wrap an existing client
    pub fn from_client(client: Arc<RpcClient>) -> Self {
        Self {
            endpoint: client.url(),
            commitment: client.commitment(),
            client,
        }
    }

    fn map_err(&self, err: solana_client::client_error::ClientError) -> NetworkError {
        NetworkError::from_client_error(err, &self.endpoint)
    }
}

fn to_rpc_filter(filter: &AccountFilter) -> RpcFilterType {
    match filter {
        AccountFilter::Memcmp { offset, bytes } => {
            RpcFilterType::Memcmp(Memcmp::new_raw_bytes(*offset, bytes.clone()))
        }
        AccountFilter::DataSize(size) => RpcFilterType::DataSize(*size),
    }
}

#[async_trait]
impl LedgerNetwork for RpcLedger {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip(self, filters), fields(endpoint = %self.endpoint, filters = filters.len()))]
    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<RawAccount>, NetworkError> {
        let config = RpcProgramAccountsConfig {
            filters: if filters.is_empty() {
                None
            } else {
                Some(filters.iter().map(to_rpc_filter).collect())
            },
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                data_slice: None,
                min_context_slot: None,
            },
            with_context: None,
            sort_results: None,
        };

        let accounts = self
            .client
            .get_program_accounts_with_config(program, config)
            .await
            .map_err(|e| self.map_err(e))?;
        debug!(program = %program, count = accounts.len(), "Fetched program accounts");

        Ok(accounts
            .into_iter()
            .map(|(address, account)| (address, account.data))
            .collect())
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, NetworkError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, NetworkError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, NetworkError> {
        self.client
            .send_transaction(tx)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn get_signature_state(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureState, NetworkError> {
        let status = self
            .client
            .get_signature_status_with_commitment(signature, commitment)
            .await
            .map_err(|e| self.map_err(e))?;

        Ok(match status {
            None => SignatureState::Pending,
            Some(Ok(())) => SignatureState::Succeeded,
            Some(Err(err)) => SignatureState::Failed(err.to_string()),
        })
    }

    async fn get_transaction_summary(
        &self,
        signature: &Signature,
    ) -> Result<TransactionSummary, NetworkError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        let tx = self
            .client
            .get_transaction_with_config(signature, config)
            .await
            .map_err(|e| self.map_err(e))?;

        Ok(TransactionSummary {
            slot: tx.slot,
            block_time: tx.block_time,
            fee: tx.transaction.meta.as_ref().map(|meta| meta.fee),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_conversion() {
        match to_rpc_filter(&AccountFilter::DataSize(165)) {
            RpcFilterType::DataSize(size) => assert_eq!(size, 165),
            other => panic!("unexpected filter {:?}", other),
        }

        let mint = Pubkey::new_unique();
        match to_rpc_filter(&AccountFilter::memcmp(0, mint.to_bytes().to_vec())) {
            RpcFilterType::Memcmp(memcmp) => {
                assert_eq!(memcmp.offset(), 0);
                assert_eq!(memcmp.bytes().map(|b| b.to_vec()), Some(mint.to_bytes().to_vec()));
            }
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_debug_hides_client() {
        let ledger = RpcLedger::new(
            "http://127.0.0.1:8899",
            Duration::from_secs(5),
            CommitmentConfig::confirmed(),
        );
        assert_eq!(ledger.endpoint(), "http://127.0.0.1:8899");
        assert!(format!("{:?}", ledger).contains("127.0.0.1:8899"));
    }
}
