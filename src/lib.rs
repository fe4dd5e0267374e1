//! Metadata Client Library
//!
//! Creates, updates and reads the metadata records of an NFT metadata
//! program on Solana:
//! - **address**: program-derived record addresses
//! - **codec**: the program's binary record and instruction formats
//! - **scanner**: program account scans and NFT holder resolution
//! - **tx_builder**: signing, bounded rebroadcast and confirmation polling
//! - **flows**: the create, update, list and fetch operations

pub mod address;
pub mod codec;
pub mod config;
pub mod flows;
pub mod metrics;
pub mod observability;
pub mod scanner;
pub mod structured_logging;
pub mod tx_builder;
pub mod types;
pub mod wallet;

// Component modules with non-standard paths (directories with spaces)
#[path = "rpc manager/mod.rs"]
pub mod rpc_manager;

pub mod test_utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use flows::{FlowConfig, FlowError, RecordFlows};
pub use rpc_manager::{LedgerNetwork, RpcLedger};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use types::{CreatedRecord, MetadataRecord, NewRecord, SubmissionResult, UpdatedRecord};
