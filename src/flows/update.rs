//! Update flow: locate the NFT holder, then submit UpdateMetadata

use solana_sdk::signature::{Keypair, Signer};

use super::{price_to_lamports, FlowError, RecordFlows};
use crate::address::derive_metadata_address;
use crate::codec::MetadataInstruction;
use crate::scanner::find_target_record;
use crate::structured_logging::FlowLogger;
use crate::tx_builder::update_metadata_instruction;
use crate::types::UpdatedRecord;

impl RecordFlows {
    /// Set the listed price of record `id` to `price_sol`
    ///
    /// The instruction references the token account holding the single unit
    /// of the record's ownership NFT; the program rejects the change unless
    /// `signer` owns that account. An id past the current record count fails
    /// before anything is written.
    pub async fn update_price(
        &self,
        signer: &Keypair,
        id: u64,
        price_sol: f64,
    ) -> Result<UpdatedRecord, FlowError> {
        let log = FlowLogger::new("update");
        let result = self.update_inner(&log, signer, id, price_sol).await;
        if let Err(err) = &result {
            log.error(&format!("{} ({})", err, err.category()));
        }
        result
    }

    async fn update_inner(
        &self,
        log: &FlowLogger,
        signer: &Keypair,
        id: u64,
        price_sol: f64,
    ) -> Result<UpdatedRecord, FlowError> {
        let price = price_to_lamports(price_sol)?;

        let (address, _) = derive_metadata_address(&self.program_id, id)?;
        log.log_target(id, &address);

        let records = self.scanner.scan(&self.program_id, &[]).await?;
        let count = records.len() as u64;
        log.log_record_count(&self.program_id, records.len());
        if id > count {
            return Err(FlowError::IdOutOfRange { id, count });
        }

        let record = find_target_record(records, &address)?;
        let holder = self
            .scanner
            .resolve_holder(&self.token_program_id, &record.owner_nft_address)
            .await?;
        log.log_holder(&holder);
        if holder.record.owner != signer.pubkey() {
            log.warn(&format!(
                "signer {} does not own token account {} (owner {}), the program will reject the update",
                signer.pubkey(),
                holder.token_account,
                holder.record.owner
            ));
        }

        let payload = MetadataInstruction::UpdateMetadata { id, price }.encode()?;
        let instruction = update_metadata_instruction(
            &self.program_id,
            &address,
            &signer.pubkey(),
            &holder.token_account,
            payload,
        )?;

        let submission = self.engine.submit(signer, &[instruction], &[]).await?;
        log.log_submitted(&submission);
        self.log_transaction_record(log, &submission.transaction_id).await;

        Ok(UpdatedRecord {
            id,
            address,
            holder,
            submission,
        })
    }
}
