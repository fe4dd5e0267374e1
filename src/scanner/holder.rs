//! Record lookup and NFT holder resolution

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tracing::{debug, warn};

use super::{ScanError, StateScanner};
use crate::codec::{metadata::decode_metadata, DecodeError, TOKEN_ACCOUNT_LEN, TOKEN_HOLDING_SCHEMA};
use crate::rpc_manager::{AccountFilter, RawAccount};
use crate::types::{MetadataRecord, TokenHolder, TokenHoldingRecord};

#[derive(Error, Debug, Clone)]
pub enum LookupError {
    #[error("No record at {address}")]
    RecordNotFound { address: Pubkey },

    /// No token account of the mint holds exactly one unit
    #[error("No sole-unit holder for mint {mint}")]
    NoSoleHolder { mint: Pubkey },

    #[error("Record at {address} does not decode: {source}")]
    Decode {
        address: Pubkey,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl LookupError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Scan(err) => err.is_retryable(),
            _ => false,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::RecordNotFound { .. } | Self::NoSoleHolder { .. } => "not_found",
            Self::Decode { .. } => "decode",
            Self::Scan(_) => "scan",
        }
    }
}

/// Locate the entry at `target` and decode it as a metadata record
///
/// Other entries are never decoded, so an unrelated malformed account does
/// not fail the lookup.
pub fn find_target_record(
    entries: impl IntoIterator<Item = RawAccount>,
    target: &Pubkey,
) -> Result<MetadataRecord, LookupError> {
    let (address, data) = entries
        .into_iter()
        .find(|(address, _)| address == target)
        .ok_or(LookupError::RecordNotFound { address: *target })?;

    decode_metadata(&data).map_err(|source| LookupError::Decode { address, source })
}

/// Server-side filters selecting token accounts of `mint`
pub fn holder_filters(mint: &Pubkey) -> Vec<AccountFilter> {
    let offset = TOKEN_HOLDING_SCHEMA.field_offset("mint").unwrap_or(0);
    vec![
        AccountFilter::memcmp(offset, mint.to_bytes().to_vec()),
        AccountFilter::DataSize(TOKEN_ACCOUNT_LEN as u64),
    ]
}

/// Pick the first holding with `amount == 1`, in the order given
pub fn select_sole_unit_holder(
    holdings: impl IntoIterator<Item = (Pubkey, TokenHoldingRecord)>,
) -> Option<TokenHolder> {
    let mut selected: Option<TokenHolder> = None;
    let mut matches = 0usize;

    for (token_account, record) in holdings {
        if !record.is_sole_unit() {
            continue;
        }
        matches += 1;
        if selected.is_none() {
            selected = Some(TokenHolder {
                token_account,
                record,
                matches: 0,
            });
        }
    }

    selected.map(|holder| TokenHolder { matches, ..holder })
}

impl StateScanner {
    /// Resolve the account currently holding the single unit of `mint`
    pub async fn resolve_holder(
        &self,
        token_program: &Pubkey,
        mint: &Pubkey,
    ) -> Result<TokenHolder, LookupError> {
        let scan = self.scan(token_program, &holder_filters(mint)).await?;
        let candidates = scan.len();

        let holder = select_sole_unit_holder(scan.decoded::<TokenHoldingRecord>())
            .ok_or(LookupError::NoSoleHolder { mint: *mint })?;

        if holder.matches > 1 {
            warn!(
                mint = %mint,
                matches = holder.matches,
                selected = %holder.token_account,
                "Several accounts hold one unit of the mint, using the first"
            );
        }
        debug!(mint = %mint, candidates, token_account = %holder.token_account, "Holder resolved");
        Ok(holder)
    }
}
