//! Create flow: next id, derived address, CreateMetadata submission
//!
//! The next id is `existing records + 1`, a read-then-write with a race
//! window against other creators. Before submitting, the flow checks that the
//! derived address is still unused; if another client took it (found before
//! the submission or after a rejected one) the count is re-read and a new id
//! derived, up to `create_conflict_retries` times. An occupant identical to
//! the record just submitted is this call's own write, not a conflict.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};

use super::{price_to_lamports, FlowError, RecordFlows};
use crate::address::derive_metadata_address;
use crate::codec::metadata::decode_metadata;
use crate::codec::MetadataInstruction;
use crate::structured_logging::FlowLogger;
use crate::tx_builder::create_metadata_instruction;
use crate::types::{
    CreatedRecord, MetadataRecord, NewRecord, SubmissionResult, MAX_NAME_LEN, MAX_URI_LEN,
};

/// Input that passed validation
#[derive(Debug, Clone, PartialEq)]
struct ValidRecord {
    name: String,
    uri: String,
    listed_price: u64,
    owner_nft_address: Pubkey,
}

fn validate(input: NewRecord) -> Result<ValidRecord, FlowError> {
    if input.name.trim().is_empty() {
        return Err(FlowError::validation("name is required"));
    }
    if input.name.len() > MAX_NAME_LEN {
        return Err(FlowError::validation(format!(
            "name is {} bytes, limit is {}",
            input.name.len(),
            MAX_NAME_LEN
        )));
    }
    if input.uri.trim().is_empty() {
        return Err(FlowError::validation("uri is required"));
    }
    if input.uri.len() > MAX_URI_LEN {
        return Err(FlowError::validation(format!(
            "uri is {} bytes, limit is {}",
            input.uri.len(),
            MAX_URI_LEN
        )));
    }
    let owner_nft_address = input
        .owner_nft_address
        .ok_or_else(|| FlowError::validation("owner NFT address is required"))?;
    let listed_price = price_to_lamports(input.price)?;

    Ok(ValidRecord {
        name: input.name,
        uri: input.uri,
        listed_price,
        owner_nft_address,
    })
}

impl RecordFlows {
    /// Create a metadata record for `input` under the next free id
    ///
    /// Validation failures are logged and returned before any network call.
    pub async fn create_record(&self, signer: &Keypair, input: NewRecord) -> Result<CreatedRecord, FlowError> {
        let log = FlowLogger::new("create");
        let result = self.create_inner(&log, signer, input).await;
        if let Err(err) = &result {
            log.error(&format!("{} ({})", err, err.category()));
        }
        result
    }

    async fn create_inner(
        &self,
        log: &FlowLogger,
        signer: &Keypair,
        input: NewRecord,
    ) -> Result<CreatedRecord, FlowError> {
        let valid = validate(input)?;
        let mut conflicts = 0u32;

        loop {
            let count = self.scanner.count(&self.program_id).await?;
            log.log_record_count(&self.program_id, count);

            let count = count as u64;
            let id = count
                .checked_add(1)
                .ok_or(FlowError::IdOutOfRange { id: count, count })?;
            let (address, _) = derive_metadata_address(&self.program_id, id)?;
            log.log_target(id, &address);

            if self.network.get_account_data(&address).await?.is_some() {
                self.on_conflict(log, &mut conflicts, id, address)?;
                continue;
            }

            let record = MetadataRecord {
                id,
                name: valid.name.clone(),
                uri: valid.uri.clone(),
                last_price: 0,
                listed_price: valid.listed_price,
                owner_nft_address: valid.owner_nft_address,
            };
            let payload = MetadataInstruction::CreateMetadata {
                record: record.clone(),
                id,
            }
            .encode()?;
            let instruction =
                create_metadata_instruction(&self.program_id, &address, &signer.pubkey(), payload)?;
            let tx = self.engine.build_signed(signer, &[instruction], &[]).await?;

            let submission = match self.engine.submit_signed(&tx).await {
                Ok(submission) => submission,
                Err(err) if err.is_rejection() => {
                    let Some(occupant) = self.network.get_account_data(&address).await? else {
                        return Err(err.into());
                    };
                    if decode_metadata(&occupant).ok().as_ref() != Some(&record) {
                        self.on_conflict(log, &mut conflicts, id, address)?;
                        continue;
                    }
                    log.warn(&format!(
                        "submission rejected ({}) but {} holds the submitted record",
                        err, address
                    ));
                    let transaction_id = tx.signatures.first().copied().unwrap_or_default();
                    SubmissionResult {
                        transaction_id,
                        confirmed: self.engine.await_finalized(&transaction_id).await?,
                        attempts: err.attempts().unwrap_or(1),
                    }
                }
                Err(err) => return Err(err.into()),
            };

            log.log_submitted(&submission);
            self.log_transaction_record(log, &submission.transaction_id).await;
            return Ok(CreatedRecord {
                id,
                address,
                submission,
            });
        }
    }

    /// Count a lost race; fails once the retry budget is spent
    fn on_conflict(
        &self,
        log: &FlowLogger,
        conflicts: &mut u32,
        id: u64,
        address: Pubkey,
    ) -> Result<(), FlowError> {
        if *conflicts >= self.config.create_conflict_retries {
            return Err(FlowError::IdConflict { id, address });
        }
        *conflicts += 1;
        log.warn(&format!(
            "id {} already in use at {}, re-reading record count ({}/{})",
            id, address, conflicts, self.config.create_conflict_retries
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewRecord {
        NewRecord {
            name: "Sword".to_string(),
            uri: "ipfs://abc".to_string(),
            price: 1.5,
            owner_nft_address: Some(Pubkey::new_unique()),
        }
    }

    #[test]
    fn test_validate_accepts_complete_input() {
        let valid = validate(input()).unwrap();
        assert_eq!(valid.name, "Sword");
        assert_eq!(valid.listed_price, 1_500_000_000);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut missing_name = input();
        missing_name.name = "  ".to_string();
        assert!(matches!(validate(missing_name), Err(FlowError::Validation(_))));

        let mut missing_uri = input();
        missing_uri.uri.clear();
        assert!(matches!(validate(missing_uri), Err(FlowError::Validation(_))));

        let mut missing_owner = input();
        missing_owner.owner_nft_address = None;
        assert!(matches!(validate(missing_owner), Err(FlowError::Validation(_))));

        let mut bad_price = input();
        bad_price.price = f64::NAN;
        assert!(matches!(validate(bad_price), Err(FlowError::Validation(_))));
    }

    #[test]
    fn test_validate_enforces_bounds() {
        let mut long_name = input();
        long_name.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(validate(long_name), Err(FlowError::Validation(_))));

        let mut long_uri = input();
        long_uri.uri = "u".repeat(MAX_URI_LEN + 1);
        assert!(matches!(validate(long_uri), Err(FlowError::Validation(_))));

        let mut at_limit = input();
        at_limit.name = "x".repeat(MAX_NAME_LEN);
        assert!(validate(at_limit).is_ok());
    }
}
