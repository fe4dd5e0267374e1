//! SPL token account layout

use solana_sdk::pubkey::Pubkey;

use super::errors::DecodeError;
use super::schema::{read_address, read_u64_le, TOKEN_HOLDING_SCHEMA};
use crate::types::TokenHoldingRecord;

/// Size of an SPL token account
pub const TOKEN_ACCOUNT_LEN: usize = 165;

/// Offset of the account state byte inside the reserved tail
const STATE_OFFSET: usize = 108;

/// `AccountState::Initialized`
const STATE_INITIALIZED: u8 = 1;

pub fn decode_token_holding(data: &[u8]) -> Result<TokenHoldingRecord, DecodeError> {
    TOKEN_HOLDING_SCHEMA.validate(data)?;

    let field = |name: &'static str| {
        TOKEN_HOLDING_SCHEMA
            .field_offset(name)
            .ok_or_else(|| DecodeError::malformed(TOKEN_HOLDING_SCHEMA.record, format!("no field {}", name)))
    };
    let truncated = || DecodeError::malformed(TOKEN_HOLDING_SCHEMA.record, "field out of bounds");

    let mint = read_address(data, field("mint")?).ok_or_else(truncated)?;
    let owner = read_address(data, field("owner")?).ok_or_else(truncated)?;
    let amount = read_u64_le(data, field("amount")?).ok_or_else(truncated)?;

    Ok(TokenHoldingRecord {
        mint: Pubkey::new_from_array(mint),
        owner: Pubkey::new_from_array(owner),
        amount,
    })
}

/// Lay a holding out as an initialized token account with no delegate,
/// not native and no close authority.
pub fn encode_token_holding(record: &TokenHoldingRecord) -> Vec<u8> {
    let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
    data[0..32].copy_from_slice(record.mint.as_ref());
    data[32..64].copy_from_slice(record.owner.as_ref());
    data[64..72].copy_from_slice(&record.amount.to_le_bytes());
    data[STATE_OFFSET] = STATE_INITIALIZED;
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use spl_token::solana_program::program_pack::Pack;

    #[test]
    fn test_len_matches_spl_token() {
        assert_eq!(TOKEN_ACCOUNT_LEN, spl_token::state::Account::LEN);
    }

    #[test]
    fn test_decode_reads_le_amount() {
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
        data[0..32].copy_from_slice(mint.as_ref());
        data[32..64].copy_from_slice(owner.as_ref());
        data[64..72].copy_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0]);

        let holding = decode_token_holding(&data).unwrap();
        assert_eq!(holding.mint, mint);
        assert_eq!(holding.owner, owner);
        assert_eq!(holding.amount, 1);
    }

    #[test]
    fn test_encode_is_readable_by_spl_token() {
        let record = TokenHoldingRecord {
            mint: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            amount: 1,
        };
        let data = encode_token_holding(&record);
        let account = spl_token::state::Account::unpack(&data).unwrap();
        assert_eq!(account.amount, 1);
        assert_eq!(account.mint.to_bytes(), record.mint.to_bytes());
        assert_eq!(account.owner.to_bytes(), record.owner.to_bytes());
    }

    #[test]
    fn test_decode_wrong_length() {
        assert!(matches!(
            decode_token_holding(&[0u8; 72]),
            Err(DecodeError::LengthMismatch { expected: 165, actual: 72, .. })
        ));
        assert!(matches!(decode_token_holding(&[]), Err(DecodeError::Empty(_))));
    }
}
