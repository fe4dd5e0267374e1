//! Instruction construction for the metadata program
//!
//! The ordered account list is part of the program's wire contract:
//! - CreateMetadata: `[metadata (w), payer (s, w), system program]`
//! - UpdateMetadata: `[metadata (w), payer (s), holder token account]`

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use crate::codec::{InstructionKind, InstructionPayload};
use crate::tx_builder::errors::EngineError;

/// Build a CreateMetadata instruction
pub fn create_metadata_instruction(
    program_id: &Pubkey,
    metadata: &Pubkey,
    payer: &Pubkey,
    payload: InstructionPayload,
) -> Result<Instruction, EngineError> {
    expect_kind(&payload, InstructionKind::CreateMetadata)?;
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*metadata, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: payload.into_bytes(),
    })
}

/// Build an UpdateMetadata instruction
///
/// The program checks that `payer` owns `holder_token_account` before it
/// accepts the new price.
pub fn update_metadata_instruction(
    program_id: &Pubkey,
    metadata: &Pubkey,
    payer: &Pubkey,
    holder_token_account: &Pubkey,
    payload: InstructionPayload,
) -> Result<Instruction, EngineError> {
    expect_kind(&payload, InstructionKind::UpdateMetadata)?;
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*metadata, false),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new_readonly(*holder_token_account, false),
        ],
        data: payload.into_bytes(),
    })
}

fn expect_kind(payload: &InstructionPayload, expected: InstructionKind) -> Result<(), EngineError> {
    if payload.kind() != expected {
        return Err(EngineError::instruction_failed(
            expected.as_str(),
            format!("payload is {}", payload.kind().as_str()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MetadataInstruction;

    fn update_payload() -> InstructionPayload {
        MetadataInstruction::UpdateMetadata { id: 1, price: 5 }
            .encode()
            .unwrap()
    }

    #[test]
    fn test_update_account_order() {
        let program = Pubkey::new_unique();
        let metadata = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let holder = Pubkey::new_unique();

        let ix = update_metadata_instruction(&program, &metadata, &payer, &holder, update_payload())
            .unwrap();

        assert_eq!(ix.program_id, program);
        assert_eq!(ix.accounts.len(), 3);
        assert_eq!(ix.accounts[0], AccountMeta::new(metadata, false));
        assert_eq!(ix.accounts[1], AccountMeta::new_readonly(payer, true));
        assert_eq!(ix.accounts[2], AccountMeta::new_readonly(holder, false));
        assert_eq!(ix.data[0], 1);
    }

    #[test]
    fn test_payload_kind_must_match() {
        let program = Pubkey::new_unique();
        let key = Pubkey::new_unique();
        let err = create_metadata_instruction(&program, &key, &key, update_payload()).unwrap_err();
        assert!(matches!(err, EngineError::InstructionBuild { .. }));
    }
}
