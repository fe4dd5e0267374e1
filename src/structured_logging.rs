//! Structured logging for record flows

use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::observability::CorrelationId;
use crate::rpc_manager::TransactionSummary;
use crate::types::{SubmissionResult, TokenHolder};

/// Stamps every event of one flow invocation with its correlation id
#[derive(Debug, Clone)]
pub struct FlowLogger {
    flow: &'static str,
    context_id: CorrelationId,
}

impl FlowLogger {
    pub fn new(flow: &'static str) -> Self {
        Self {
            flow,
            context_id: CorrelationId::new(),
        }
    }

    pub fn context_id(&self) -> &CorrelationId {
        &self.context_id
    }

    pub fn log_record_count(&self, program: &Pubkey, count: usize) {
        tracing::info!(
            context_id = %self.context_id,
            flow = self.flow,
            program = %program,
            count,
            "Fetched record count"
        );
    }

    pub fn log_target(&self, id: u64, address: &Pubkey) {
        tracing::info!(
            context_id = %self.context_id,
            flow = self.flow,
            id,
            address = %address,
            "Derived record address"
        );
    }

    pub fn log_holder(&self, holder: &TokenHolder) {
        tracing::info!(
            context_id = %self.context_id,
            flow = self.flow,
            token_account = %holder.token_account,
            owner = %holder.record.owner,
            mint = %holder.record.mint,
            matches = holder.matches,
            "Resolved token holder"
        );
    }

    pub fn log_submitted(&self, submission: &SubmissionResult) {
        if submission.confirmed {
            tracing::info!(
                context_id = %self.context_id,
                flow = self.flow,
                signature = %submission.transaction_id,
                attempts = submission.attempts,
                "Transaction finalized"
            );
        } else {
            tracing::warn!(
                context_id = %self.context_id,
                flow = self.flow,
                signature = %submission.transaction_id,
                attempts = submission.attempts,
                "Transaction accepted but not finalized before deadline"
            );
        }
    }

    pub fn log_transaction_summary(&self, signature: &Signature, summary: &TransactionSummary) {
        tracing::info!(
            context_id = %self.context_id,
            flow = self.flow,
            signature = %signature,
            slot = summary.slot,
            block_time = ?summary.block_time,
            fee = ?summary.fee,
            "Transaction record"
        );
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            flow = self.flow,
            message = %message,
            "Warning"
        );
    }

    pub fn error(&self, message: &str) {
        tracing::error!(
            context_id = %self.context_id,
            flow = self.flow,
            message = %message,
            "Error"
        );
    }
}
