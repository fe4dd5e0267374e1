//! Sign, broadcast and confirm transactions

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use super::errors::EngineError;
use super::retry::{retry_with_backoff, RetryConfig, RetryFailure};
use crate::metrics::Metrics;
use crate::rpc_manager::{LedgerNetwork, NetworkError, SignatureState};
use crate::types::SubmissionResult;

/// Confirmation polling limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmationConfig {
    /// Give up waiting for finalization after this long
    #[serde(default = "default_confirm_timeout_ms")]
    pub timeout_ms: u64,
    /// Delay between status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_confirm_timeout_ms() -> u64 { 60_000 }
fn default_poll_interval_ms() -> u64 { 500 }

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_confirm_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Builds one transaction per call, broadcasts it with bounded retry and
/// polls for finalized commitment.
#[derive(Debug, Clone)]
pub struct TransactionEngine {
    network: Arc<dyn LedgerNetwork>,
    retry: RetryConfig,
    confirmation: ConfirmationConfig,
    metrics: Arc<Metrics>,
}

impl TransactionEngine {
    pub fn new(
        network: Arc<dyn LedgerNetwork>,
        retry: RetryConfig,
        confirmation: ConfirmationConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            network,
            retry,
            confirmation,
            metrics,
        }
    }

    /// Submit `instructions` in the given order as one transaction
    ///
    /// `signer` pays and signs; `co_signers` add any further required
    /// signatures. The signed transaction is built once and rebroadcast
    /// unchanged, so a retry can never produce a second distinct submission.
    #[instrument(skip_all, fields(payer = %signer.pubkey(), instructions = instructions.len()))]
    pub async fn submit(
        &self,
        signer: &Keypair,
        instructions: &[Instruction],
        co_signers: &[&Keypair],
    ) -> Result<SubmissionResult, EngineError> {
        let tx = self.build_signed(signer, instructions, co_signers).await?;
        self.submit_signed(&tx).await
    }

    /// Build and sign one transaction against a fresh blockhash
    ///
    /// Its first signature identifies the submission from here on.
    pub async fn build_signed(
        &self,
        signer: &Keypair,
        instructions: &[Instruction],
        co_signers: &[&Keypair],
    ) -> Result<Transaction, EngineError> {
        if instructions.is_empty() {
            return Err(EngineError::EmptyInstructions);
        }
        let network = self.network.as_ref();

        let (blockhash, _) = retry_with_backoff(
            "get_latest_blockhash",
            &self.retry,
            |_| {},
            || network.get_latest_blockhash(),
        )
        .await
        .map_err(|failure| into_engine_error("get_latest_blockhash", failure))?;

        let mut signers: Vec<&dyn Signer> = vec![signer];
        for co_signer in co_signers {
            if co_signer.pubkey() != signer.pubkey() {
                signers.push(*co_signer);
            }
        }

        let mut tx = Transaction::new_with_payer(instructions, Some(&signer.pubkey()));
        tx.try_sign(&signers, blockhash)
            .map_err(|e| EngineError::Signing(e.to_string()))?;
        Ok(tx)
    }

    /// Broadcast an already signed transaction and wait for finalization
    #[instrument(skip_all, fields(signature = ?tx.signatures.first()))]
    pub async fn submit_signed(&self, tx: &Transaction) -> Result<SubmissionResult, EngineError> {
        self.metrics.submissions_total.inc();
        let started = Instant::now();

        let result = self.broadcast_and_confirm(tx).await;

        self.metrics
            .submit_latency
            .observe(started.elapsed().as_secs_f64());
        match &result {
            Ok(submission) if !submission.confirmed => self.metrics.confirmations_timed_out.inc(),
            Err(err) if err.is_rejection() => self.metrics.submissions_rejected.inc(),
            Err(EngineError::RetriesExhausted { .. }) => self.metrics.submissions_exhausted.inc(),
            _ => {}
        }
        result
    }

    async fn broadcast_and_confirm(&self, tx: &Transaction) -> Result<SubmissionResult, EngineError> {
        let own_signature = tx
            .signatures
            .first()
            .copied()
            .ok_or_else(|| EngineError::Signing("transaction carries no signature".to_string()))?;

        let network = self.network.as_ref();
        let metrics = self.metrics.as_ref();
        let sent = retry_with_backoff(
            "send_transaction",
            &self.retry,
            |attempt| {
                metrics.submission_attempts.inc();
                if attempt > 1 {
                    metrics.submission_retries.inc();
                }
            },
            || network.send_transaction(tx),
        )
        .await;

        let (signature, attempts) = match sent {
            Ok(accepted) => accepted,
            // an unanswered earlier broadcast of these same bytes landed
            Err(RetryFailure::Fatal {
                attempts,
                error: NetworkError::AlreadyProcessed { .. },
            }) if attempts > 1 => {
                info!(
                    signature = %own_signature,
                    attempts,
                    "Rebroadcast already processed, earlier attempt landed"
                );
                (own_signature, attempts)
            }
            Err(failure) => return Err(into_engine_error("send_transaction", failure)),
        };

        info!(signature = %signature, attempts, "Transaction accepted by network");

        let confirmed = self.await_finalized(&signature).await?;
        Ok(SubmissionResult {
            transaction_id: signature,
            confirmed,
            attempts,
        })
    }

    /// Poll until finalized, failed on-chain, or the deadline passes
    ///
    /// A timeout is not an error: the transaction may still land.
    pub async fn await_finalized(&self, signature: &Signature) -> Result<bool, EngineError> {
        let deadline = Instant::now() + Duration::from_millis(self.confirmation.timeout_ms);
        let interval = Duration::from_millis(self.confirmation.poll_interval_ms.max(1));

        loop {
            match self
                .network
                .get_signature_state(signature, CommitmentConfig::finalized())
                .await
            {
                Ok(SignatureState::Succeeded) => return Ok(true),
                Ok(SignatureState::Failed(reason)) => {
                    warn!(signature = %signature, reason = %reason, "Transaction failed on-chain");
                    return Err(EngineError::ExecutionFailed {
                        signature: *signature,
                        reason,
                    });
                }
                Ok(SignatureState::Pending) => {}
                Err(err) => {
                    debug!(signature = %signature, error = %err, "Status poll failed, continuing");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    signature = %signature,
                    timeout_ms = self.confirmation.timeout_ms,
                    "Confirmation deadline passed"
                );
                return Ok(false);
            }
            sleep(interval.min(deadline - now)).await;
        }
    }
}

fn into_engine_error(operation: &'static str, failure: RetryFailure) -> EngineError {
    match failure {
        RetryFailure::Fatal { attempts, error } => EngineError::SubmissionRejected {
            attempts,
            source: error,
        },
        RetryFailure::Exhausted { attempts, last } => EngineError::RetriesExhausted {
            operation,
            attempts,
            last,
        },
    }
}
