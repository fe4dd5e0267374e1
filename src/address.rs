//! Program-derived addresses of metadata records
//!
//! Anyone who knows the program id and a record id arrives at the same
//! address, so no registry is needed to locate a record.

use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Seed prefix the metadata program uses for record accounts
pub const METADATA_SEED: &[u8] = b"nftdata";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeriveError {
    #[error("Invalid program address '{input}': {reason}")]
    InvalidProgramAddress { input: String, reason: String },

    #[error("Record ids start at 1, got {0}")]
    InvalidId(u64),

    #[error("No viable bump seed for id {0}")]
    NoViableBump(u64),
}

impl DeriveError {
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidProgramAddress { .. } => "program_address",
            Self::InvalidId(_) => "id",
            Self::NoViableBump(_) => "bump",
        }
    }
}

/// Parse a base58 program address
pub fn parse_program_address(input: &str) -> Result<Pubkey, DeriveError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DeriveError::InvalidProgramAddress {
            input: input.to_string(),
            reason: "empty".to_string(),
        });
    }
    Pubkey::from_str(trimmed).map_err(|e| DeriveError::InvalidProgramAddress {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Address and bump seed of record `id` under `program_id`
pub fn derive_metadata_address(program_id: &Pubkey, id: u64) -> Result<(Pubkey, u8), DeriveError> {
    if id == 0 {
        return Err(DeriveError::InvalidId(id));
    }
    Pubkey::try_find_program_address(&[METADATA_SEED, &id.to_le_bytes()], program_id)
        .ok_or(DeriveError::NoViableBump(id))
}

/// [`derive_metadata_address`] for a program address still in text form
pub fn derive_from_str(program_address: &str, id: u64) -> Result<(Pubkey, u8), DeriveError> {
    let program_id = parse_program_address(program_address)?;
    derive_metadata_address(&program_id, id)
}
