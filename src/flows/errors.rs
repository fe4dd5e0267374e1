//! Error types for the record flows
//!
//! Every failure below the flow boundary surfaces here as a typed value;
//! the flows never panic on bad input or remote state.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::address::DeriveError;
use crate::codec::{DecodeError, EncodeError};
use crate::rpc_manager::NetworkError;
use crate::scanner::{LookupError, ScanError};
use crate::tx_builder::EngineError;

#[derive(Error, Debug, Clone)]
pub enum FlowError {
    /// Missing or malformed input, reported before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Derivation(#[from] DeriveError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Requested id is past the number of existing records
    #[error("Record id {id} out of range, {count} records exist")]
    IdOutOfRange { id: u64, count: u64 },

    /// The address for the next id is already taken by another creator
    #[error("Record id {id} already in use at {address}")]
    IdConflict { id: u64, address: Pubkey },

    #[error(transparent)]
    Submission(#[from] EngineError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Record at {address} does not decode: {source}")]
    Decode {
        address: Pubkey,
        #[source]
        source: DecodeError,
    },
}

impl FlowError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Whether running the same flow again later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(err) => err.is_retryable(),
            Self::Scan(err) => err.is_retryable(),
            Self::Lookup(LookupError::Scan(err)) => err.is_retryable(),
            Self::Submission(err) => err.is_retryable(),
            Self::IdConflict { .. } => true,

            Self::Validation(_) => false,
            Self::Derivation(_) => false,
            Self::Lookup(_) => false,
            Self::IdOutOfRange { .. } => false,
            Self::Encode(_) => false,
            Self::Decode { .. } => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Derivation(_) => "derivation",
            Self::Network(err) => err.category(),
            Self::Scan(_) => "scan",
            Self::Lookup(LookupError::Scan(_)) => "scan",
            Self::Lookup(_) => "lookup",
            Self::IdOutOfRange { .. } => "id_range",
            Self::IdConflict { .. } => "id_conflict",
            Self::Submission(err) => err.category(),
            Self::Encode(_) => "encode",
            Self::Decode { .. } => "decode",
        }
    }
}
