//! Common types used throughout the client

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// Longest record name the metadata program accepts (bytes)
pub const MAX_NAME_LEN: usize = 32;

/// Longest record URI the metadata program accepts (bytes)
pub const MAX_URI_LEN: usize = 200;

/// Application-level metadata record as stored by the metadata program
///
/// Prices are integer lamports. `owner_nft_address` is the mint of the NFT
/// whose current holder is allowed to change the listed price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Logical id, assigned as `existing records + 1` at creation
    pub id: u64,

    /// Display name (at most [`MAX_NAME_LEN`] bytes)
    pub name: String,

    /// Off-chain content URI (at most [`MAX_URI_LEN`] bytes)
    pub uri: String,

    /// Price of the last completed purchase
    pub last_price: u64,

    /// Current asking price
    pub listed_price: u64,

    /// Mint of the ownership NFT
    pub owner_nft_address: Pubkey,
}

/// SPL token account, decoded down to the fields this client reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHoldingRecord {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

impl TokenHoldingRecord {
    /// A holding of exactly one unit proves sole ownership of an NFT mint
    pub fn is_sole_unit(&self) -> bool {
        self.amount == 1
    }
}

/// Input of the create flow, as handed over by the CLI layer
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub name: String,
    pub uri: String,
    /// Listed price in SOL
    pub price: f64,
    pub owner_nft_address: Option<Pubkey>,
}

/// Outcome of a transaction submission
///
/// `confirmed == false` means the network accepted the transaction but it did
/// not reach finalized commitment before the polling deadline. It may still land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionResult {
    pub transaction_id: Signature,
    pub confirmed: bool,
    /// Broadcast attempts used, including the successful one
    pub attempts: u32,
}

/// Current holder of a record's ownership NFT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenHolder {
    /// Address of the token account holding the single unit
    pub token_account: Pubkey,
    pub record: TokenHoldingRecord,
    /// How many accounts matched `amount == 1`; >1 means the first one was picked
    pub matches: usize,
}

/// Result of a successful create flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRecord {
    pub id: u64,
    pub address: Pubkey,
    pub submission: SubmissionResult,
}

/// Result of a successful price update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedRecord {
    pub id: u64,
    pub address: Pubkey,
    pub holder: TokenHolder,
    pub submission: SubmissionResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sole_unit() {
        let mut holding = TokenHoldingRecord {
            mint: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            amount: 1,
        };
        assert!(holding.is_sole_unit());

        holding.amount = 0;
        assert!(!holding.is_sole_unit());

        holding.amount = 2;
        assert!(!holding.is_sole_unit());
    }
}
