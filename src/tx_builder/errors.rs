//! Error types for the transaction engine
//!
//! Transient network failures are absorbed by the bounded retry loop; what
//! reaches the caller is either a semantic rejection (never retried), an
//! exhausted retry budget, or a local build/sign problem.

use solana_sdk::signature::Signature;
use thiserror::Error;

use crate::codec::EncodeError;
use crate::rpc_manager::NetworkError;

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// Nothing to submit
    #[error("Transaction has no instructions")]
    EmptyInstructions,

    /// Failed to build an instruction for a specific program
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild { program: String, reason: String },

    /// Payload could not be encoded
    #[error("Payload encoding failed: {0}")]
    Encode(#[from] EncodeError),

    /// Missing or mismatched signer
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Semantic rejection from the network (malformed instruction,
    /// insufficient funds, preflight failure)
    #[error("Submission rejected on attempt {attempts}: {source}")]
    SubmissionRejected {
        attempts: u32,
        #[source]
        source: NetworkError,
    },

    /// The transaction landed and the program returned an error
    #[error("Transaction {signature} failed on-chain: {reason}")]
    ExecutionFailed { signature: Signature, reason: String },

    /// Transient failures up to the attempt ceiling
    #[error("Retries exhausted after {attempts} attempts ({operation}): {last}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        last: NetworkError,
    },
}

impl EngineError {
    /// Whether the whole submission may be attempted again later
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RetriesExhausted { .. } => true,

            Self::EmptyInstructions => false,
            Self::InstructionBuild { .. } => false,
            Self::Encode(_) => false,
            Self::Signing(_) => false,
            Self::SubmissionRejected { .. } => false,
            Self::ExecutionFailed { .. } => false,
        }
    }

    /// The remote side refused the transaction
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::SubmissionRejected { .. } | Self::ExecutionFailed { .. })
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::EmptyInstructions => "validation",
            Self::InstructionBuild { .. } => "instruction",
            Self::Encode(_) => "encode",
            Self::Signing(_) => "signing",
            Self::SubmissionRejected { .. } => "rejected",
            Self::ExecutionFailed { .. } => "execution",
            Self::RetriesExhausted { .. } => "exhausted",
        }
    }

    /// Broadcast attempts made before the submission gave up
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::SubmissionRejected { attempts, .. } | Self::RetriesExhausted { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }

    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> NetworkError {
        NetworkError::Timeout {
            endpoint: "test".to_string(),
        }
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::instruction_failed("metadata", "no accounts");
        assert_eq!(
            err.to_string(),
            "Instruction build error (program=metadata): no accounts"
        );

        let err = EngineError::RetriesExhausted {
            operation: "send_transaction",
            attempts: 3,
            last: timeout(),
        };
        assert_eq!(
            err.to_string(),
            "Retries exhausted after 3 attempts (send_transaction): Timeout (endpoint: test)"
        );
    }

    #[test]
    fn test_error_retryability() {
        assert!(EngineError::RetriesExhausted {
            operation: "send_transaction",
            attempts: 3,
            last: timeout(),
        }
        .is_retryable());

        let rejected = EngineError::SubmissionRejected {
            attempts: 2,
            source: NetworkError::Rejected {
                endpoint: "test".to_string(),
                message: "invalid account data".to_string(),
            },
        };
        assert!(!rejected.is_retryable());
        assert_eq!(rejected.attempts(), Some(2));
        assert!(rejected.is_rejection());
        assert!(!EngineError::Signing("missing".to_string()).is_retryable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(EngineError::EmptyInstructions.category(), "validation");
        assert_eq!(EngineError::Signing("x".to_string()).category(), "signing");
        assert_eq!(
            EngineError::ExecutionFailed {
                signature: Signature::default(),
                reason: "custom program error".to_string()
            }
            .category(),
            "execution"
        );
    }
}
