//! Test Utilities Module
//!
//! An in-memory [`LedgerNetwork`] for deterministic tests of the scanner,
//! the transaction engine and the record flows.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use std::collections::VecDeque;

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use tokio::sync::Mutex;

use crate::codec::metadata::{decode_metadata, encode_metadata};
use crate::codec::MetadataInstruction;
use crate::rpc_manager::{
    AccountFilter, LedgerNetwork, NetworkError, RawAccount, SignatureState, TransactionSummary,
};

const FAKE_ENDPOINT: &str = "fake://ledger";

/// How the fake answers status polls for sent transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmMode {
    /// Finalized on the first poll
    Immediate,
    /// Never leaves `Pending`
    Never,
    /// Landed with a program error
    Fail(String),
    /// `Pending` for this many polls, then finalized
    AfterPolls(u32),
}

#[derive(Debug)]
struct FakeState {
    /// (owning program, address, data) in insertion order
    accounts: Vec<(Pubkey, Pubkey, Vec<u8>)>,
    sent: Vec<Transaction>,
    send_calls: u32,
    scan_requests: Vec<(Pubkey, Vec<AccountFilter>)>,
    send_failures: VecDeque<NetworkError>,
    scan_failures: VecDeque<NetworkError>,
    confirm_mode: ConfirmMode,
    status_polls: u32,
    summary_fails: bool,
    inject_after_scan: Option<(Pubkey, Pubkey, Vec<u8>)>,
    apply_program: Option<Pubkey>,
    lost_acks: u32,
}

/// Deterministic in-memory ledger
///
/// Filters are evaluated locally with the same semantics as an RPC node.
/// Every accepted transaction is recorded; failures and confirmation
/// behaviour are scripted per test.
#[derive(Debug)]
pub struct FakeLedger {
    state: Mutex<FakeState>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::with_apply(None)
    }

    /// Accepted metadata instructions for `program` are applied to the
    /// stored accounts, so later scans observe them
    pub fn applying(program: Pubkey) -> Self {
        Self::with_apply(Some(program))
    }

    fn with_apply(apply_program: Option<Pubkey>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                accounts: Vec::new(),
                sent: Vec::new(),
                send_calls: 0,
                scan_requests: Vec::new(),
                send_failures: VecDeque::new(),
                scan_failures: VecDeque::new(),
                confirm_mode: ConfirmMode::Immediate,
                status_polls: 0,
                summary_fails: false,
                inject_after_scan: None,
                apply_program,
                lost_acks: 0,
            }),
        }
    }

    pub async fn insert_account(&self, program: Pubkey, address: Pubkey, data: Vec<u8>) {
        let mut state = self.state.lock().await;
        upsert(&mut state.accounts, program, address, data);
    }

    /// Fail the next sends with these errors, in order
    pub async fn fail_next_sends(&self, errors: Vec<NetworkError>) {
        self.state.lock().await.send_failures.extend(errors);
    }

    /// Fail the next scans with these errors, in order
    pub async fn fail_next_scans(&self, errors: Vec<NetworkError>) {
        self.state.lock().await.scan_failures.extend(errors);
    }

    /// Land the next `count` sends but answer each with a timeout, as if
    /// the acknowledgement was lost. Takes precedence over scripted failures.
    pub async fn lose_next_acks(&self, count: u32) {
        self.state.lock().await.lost_acks += count;
    }

    pub async fn set_confirm_mode(&self, mode: ConfirmMode) {
        self.state.lock().await.confirm_mode = mode;
    }

    pub async fn set_summary_fails(&self, fails: bool) {
        self.state.lock().await.summary_fails = fails;
    }

    /// Store an account right after the next scan returns, as if another
    /// client wrote it in between
    pub async fn inject_after_next_scan(&self, program: Pubkey, address: Pubkey, data: Vec<u8>) {
        self.state.lock().await.inject_after_scan = Some((program, address, data));
    }

    pub async fn sent_transactions(&self) -> Vec<Transaction> {
        self.state.lock().await.sent.clone()
    }

    /// Broadcast calls including failed ones
    pub async fn send_calls(&self) -> u32 {
        self.state.lock().await.send_calls
    }

    pub async fn scan_requests(&self) -> Vec<(Pubkey, Vec<AccountFilter>)> {
        self.state.lock().await.scan_requests.clone()
    }

    pub async fn status_polls(&self) -> u32 {
        self.state.lock().await.status_polls
    }
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert(accounts: &mut Vec<(Pubkey, Pubkey, Vec<u8>)>, program: Pubkey, address: Pubkey, data: Vec<u8>) {
    match accounts.iter_mut().find(|(_, a, _)| *a == address) {
        Some(entry) => *entry = (program, address, data),
        None => accounts.push((program, address, data)),
    }
}

/// Apply metadata instructions of `program` in `tx` to the stored accounts
///
/// All or nothing: an instruction that cannot be applied leaves the accounts
/// untouched and the reason is returned, as the program would fail the
/// whole transaction.
fn apply_transaction(state: &mut FakeState, program: &Pubkey, tx: &Transaction) -> Result<(), String> {
    let keys = &tx.message.account_keys;
    let mut accounts = state.accounts.clone();
    for (index, ix) in tx.message.instructions.iter().enumerate() {
        if keys.get(ix.program_id_index as usize) != Some(program) {
            continue;
        }
        let target = ix
            .accounts
            .first()
            .and_then(|i| keys.get(*i as usize))
            .copied()
            .ok_or_else(|| format!("instruction {} has no target account", index))?;
        let instruction = MetadataInstruction::decode(&ix.data)
            .map_err(|e| format!("instruction {} does not decode: {}", index, e))?;
        let record = match instruction {
            MetadataInstruction::CreateMetadata { record, .. } => record,
            MetadataInstruction::UpdateMetadata { price, .. } => {
                let mut record = accounts
                    .iter()
                    .find(|(_, a, _)| *a == target)
                    .and_then(|(_, _, data)| decode_metadata(data).ok())
                    .ok_or_else(|| format!("instruction {} updates missing record {}", index, target))?;
                record.listed_price = price;
                record
            }
        };
        let data = encode_metadata(&record)
            .map_err(|e| format!("instruction {} does not encode: {}", index, e))?;
        upsert(&mut accounts, *program, target, data);
    }
    state.accounts = accounts;
    Ok(())
}

#[async_trait]
impl LedgerNetwork for FakeLedger {
    fn endpoint(&self) -> &str {
        FAKE_ENDPOINT
    }

    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<RawAccount>, NetworkError> {
        let mut state = self.state.lock().await;
        state.scan_requests.push((*program, filters.to_vec()));
        if let Some(err) = state.scan_failures.pop_front() {
            return Err(err);
        }

        let result = state
            .accounts
            .iter()
            .filter(|(owner, _, data)| owner == program && filters.iter().all(|f| f.matches(data)))
            .map(|(_, address, data)| (*address, data.clone()))
            .collect();

        if let Some((owner, address, data)) = state.inject_after_scan.take() {
            upsert(&mut state.accounts, owner, address, data);
        }
        Ok(result)
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, NetworkError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .iter()
            .find(|(_, a, _)| a == address)
            .map(|(_, _, data)| data.clone()))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, NetworkError> {
        Ok(Hash::default())
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, NetworkError> {
        let mut state = self.state.lock().await;
        state.send_calls += 1;
        let lose_ack = state.lost_acks > 0;
        if lose_ack {
            state.lost_acks -= 1;
        } else if let Some(err) = state.send_failures.pop_front() {
            return Err(err);
        }
        let signature = tx.signatures.first().copied().ok_or_else(|| NetworkError::Rejected {
            endpoint: FAKE_ENDPOINT.to_string(),
            message: "transaction is not signed".to_string(),
        })?;
        if state.sent.iter().any(|sent| sent.signatures.first() == Some(&signature)) {
            return Err(NetworkError::AlreadyProcessed {
                endpoint: FAKE_ENDPOINT.to_string(),
            });
        }

        if let Some(program) = state.apply_program {
            apply_transaction(&mut state, &program, tx).map_err(|message| NetworkError::Rejected {
                endpoint: FAKE_ENDPOINT.to_string(),
                message,
            })?;
        }
        state.sent.push(tx.clone());

        if lose_ack {
            return Err(NetworkError::Timeout {
                endpoint: FAKE_ENDPOINT.to_string(),
            });
        }
        Ok(signature)
    }

    async fn get_signature_state(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> Result<SignatureState, NetworkError> {
        let mut state = self.state.lock().await;
        state.status_polls += 1;
        if !state.sent.iter().any(|tx| tx.signatures.first() == Some(signature)) {
            return Ok(SignatureState::Pending);
        }
        Ok(match &state.confirm_mode {
            ConfirmMode::Immediate => SignatureState::Succeeded,
            ConfirmMode::Never => SignatureState::Pending,
            ConfirmMode::Fail(reason) => SignatureState::Failed(reason.clone()),
            ConfirmMode::AfterPolls(n) if state.status_polls > *n => SignatureState::Succeeded,
            ConfirmMode::AfterPolls(_) => SignatureState::Pending,
        })
    }

    async fn get_transaction_summary(
        &self,
        signature: &Signature,
    ) -> Result<TransactionSummary, NetworkError> {
        let state = self.state.lock().await;
        if state.summary_fails {
            return Err(NetworkError::Timeout {
                endpoint: FAKE_ENDPOINT.to_string(),
            });
        }
        let position = state
            .sent
            .iter()
            .position(|tx| tx.signatures.first() == Some(signature))
            .ok_or_else(|| NetworkError::RpcResponse {
                endpoint: FAKE_ENDPOINT.to_string(),
                message: "transaction not found".to_string(),
                code: None,
            })?;
        Ok(TransactionSummary {
            slot: position as u64 + 1,
            block_time: None,
            fee: Some(5_000),
        })
    }
}
