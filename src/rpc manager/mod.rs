//! RPC Manager Module
//!
//! The ledger network seam: every read and write the pipeline performs goes
//! through [`LedgerNetwork`], implemented for a live cluster by [`RpcLedger`]
//! and in tests by the in-memory fake in `test_utils`.

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};

// Submodules
pub mod rpc_client;
pub mod rpc_errors;

// Re-exports for convenience
pub use rpc_client::RpcLedger;
pub use rpc_errors::NetworkError;

/// An account as returned by a program scan: address and raw data
pub type RawAccount = (Pubkey, Vec<u8>);

/// Structural predicate evaluated by the network during a program scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    /// Bytes at `offset` equal `bytes`
    Memcmp { offset: usize, bytes: Vec<u8> },
    /// Account data is exactly this many bytes
    DataSize(u64),
}

impl AccountFilter {
    pub fn memcmp(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Memcmp {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Local evaluation, same semantics as the RPC node
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Self::Memcmp { offset, bytes } => data
                .get(*offset..offset.saturating_add(bytes.len()))
                .map(|window| window == bytes.as_slice())
                .unwrap_or(false),
            Self::DataSize(size) => data.len() as u64 == *size,
        }
    }
}

/// Execution status of a submitted transaction at a given commitment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// Not (yet) visible at the requested commitment
    Pending,
    Succeeded,
    /// Landed but the program returned an error
    Failed(String),
}

/// What the best-effort post-submission fetch reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSummary {
    pub slot: u64,
    pub block_time: Option<i64>,
    pub fee: Option<u64>,
}

/// Read and write operations against the ledger network
///
/// Implementations are shared across concurrent flows and must not require
/// per-call locking.
#[async_trait]
pub trait LedgerNetwork: Send + Sync + std::fmt::Debug {
    /// Endpoint label used in logs and errors
    fn endpoint(&self) -> &str;

    /// All accounts owned by `program` that satisfy every filter
    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<RawAccount>, NetworkError>;

    /// Data of a single account, `None` if it does not exist
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, NetworkError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, NetworkError>;

    /// Broadcast a signed transaction
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, NetworkError>;

    async fn get_signature_state(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureState, NetworkError>;

    /// Landed transaction details at `confirmed` commitment
    async fn get_transaction_summary(
        &self,
        signature: &Signature,
    ) -> Result<TransactionSummary, NetworkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memcmp_filter() {
        let data = [1u8, 2, 3, 4, 5];
        assert!(AccountFilter::memcmp(0, vec![1, 2]).matches(&data));
        assert!(AccountFilter::memcmp(3, vec![4, 5]).matches(&data));
        assert!(!AccountFilter::memcmp(3, vec![4, 5, 6]).matches(&data));
        assert!(!AccountFilter::memcmp(1, vec![1]).matches(&data));
        assert!(!AccountFilter::memcmp(usize::MAX, vec![1]).matches(&data));
    }

    #[test]
    fn test_data_size_filter() {
        assert!(AccountFilter::DataSize(3).matches(&[0, 0, 0]));
        assert!(!AccountFilter::DataSize(3).matches(&[0, 0]));
    }
}
