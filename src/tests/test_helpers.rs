//! Shared fixtures for engine and flow scenario tests

use std::sync::Arc;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    message::Message,
    transaction::Transaction,
};

use crate::address::derive_metadata_address;
use crate::codec::metadata::encode_metadata;
use crate::codec::token::encode_token_holding;
use crate::codec::MetadataInstruction;
use crate::flows::{FlowConfig, RecordFlows};
use crate::metrics::Metrics;
use crate::rpc_manager::LedgerNetwork;
use crate::test_utils::FakeLedger;
use crate::tx_builder::{ConfirmationConfig, RetryConfig, TransactionEngine};
use crate::types::{MetadataRecord, TokenHoldingRecord};

/// Three attempts, no jitter, short waits
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        base_backoff_ms: 10,
        max_backoff_ms: 100,
        jitter_factor: 0.0,
    }
}

pub fn fast_confirmation() -> ConfirmationConfig {
    ConfirmationConfig {
        timeout_ms: 2_000,
        poll_interval_ms: 100,
    }
}

pub fn metrics() -> Arc<Metrics> {
    Arc::new(Metrics::new().unwrap())
}

pub fn engine(ledger: &Arc<FakeLedger>, metrics: Arc<Metrics>) -> TransactionEngine {
    TransactionEngine::new(
        Arc::clone(ledger) as Arc<dyn LedgerNetwork>,
        fast_retry(),
        fast_confirmation(),
        metrics,
    )
}

/// A metadata program and token program backed by one applying ledger
pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub flows: RecordFlows,
    pub metrics: Arc<Metrics>,
    pub program: Pubkey,
    pub token_program: Pubkey,
    pub signer: Keypair,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_flow_config(FlowConfig::default())
    }

    pub fn with_flow_config(config: FlowConfig) -> Self {
        let program = Pubkey::new_unique();
        let token_program = Pubkey::new_unique();
        let ledger = Arc::new(FakeLedger::applying(program));
        let metrics = metrics();
        let flows = RecordFlows::new(
            Arc::clone(&ledger) as Arc<dyn LedgerNetwork>,
            program,
            fast_retry(),
            fast_confirmation(),
            config,
            Arc::clone(&metrics),
        )
        .with_token_program(token_program);

        Self {
            ledger,
            flows,
            metrics,
            program,
            token_program,
            signer: Keypair::new(),
        }
    }

    pub fn address_of(&self, id: u64) -> Pubkey {
        derive_metadata_address(&self.program, id).unwrap().0
    }

    /// Store `record` at the derived address of its id
    pub async fn seed_record(&self, record: &MetadataRecord) -> Pubkey {
        let address = self.address_of(record.id);
        self.ledger
            .insert_account(self.program, address, encode_metadata(record).unwrap())
            .await;
        address
    }

    /// Store a token account of `mint` and return its address
    pub async fn seed_holding(&self, mint: Pubkey, owner: Pubkey, amount: u64) -> Pubkey {
        let token_account = Pubkey::new_unique();
        let holding = TokenHoldingRecord { mint, owner, amount };
        self.ledger
            .insert_account(self.token_program, token_account, encode_token_holding(&holding))
            .await;
        token_account
    }

    pub fn signer_pubkey(&self) -> Pubkey {
        self.signer.pubkey()
    }
}

pub fn sample_record(id: u64, mint: Pubkey) -> MetadataRecord {
    MetadataRecord {
        id,
        name: format!("Item {}", id),
        uri: format!("ipfs://item-{}", id),
        last_price: 0,
        listed_price: 1_000_000_000,
        owner_nft_address: mint,
    }
}

/// An instruction as it appears inside a sent transaction
#[derive(Debug)]
pub struct SentInstruction {
    pub program: Pubkey,
    pub accounts: Vec<Pubkey>,
    pub signer_flags: Vec<bool>,
    pub writable_flags: Vec<bool>,
    pub instruction: MetadataInstruction,
}

/// Decode every metadata instruction in `tx`
pub fn sent_instructions(tx: &Transaction) -> Vec<SentInstruction> {
    let message = &tx.message;
    let keys = &message.account_keys;
    message
        .instructions
        .iter()
        .map(|ix| {
            let indexes: Vec<usize> = ix.accounts.iter().map(|i| *i as usize).collect();
            SentInstruction {
                program: keys[ix.program_id_index as usize],
                accounts: indexes.iter().map(|i| keys[*i]).collect(),
                signer_flags: indexes.iter().map(|i| is_signer(message, *i)).collect(),
                writable_flags: indexes.iter().map(|i| is_writable(message, *i)).collect(),
                instruction: MetadataInstruction::decode(&ix.data).unwrap(),
            }
        })
        .collect()
}

fn is_signer(message: &Message, index: usize) -> bool {
    index < message.header.num_required_signatures as usize
}

/// Writability from the message header; the fee payer is always writable
fn is_writable(message: &Message, index: usize) -> bool {
    let header = &message.header;
    let signed = header.num_required_signatures as usize;
    if index < signed {
        index < signed - header.num_readonly_signed_accounts as usize
    } else {
        index < message.account_keys.len() - header.num_readonly_unsigned_accounts as usize
    }
}
