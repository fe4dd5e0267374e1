use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use thiserror::Error;

/// JSON-RPC code for a failed preflight simulation
const PREFLIGHT_FAILURE_CODE: i64 = -32002;

/// JSON-RPC code for a node that is behind the cluster
const NODE_UNHEALTHY_CODE: i64 = -32005;

/// Ledger network error, classified as transient or as a semantic rejection
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    #[error("Timeout (endpoint: {endpoint})")]
    Timeout { endpoint: String },

    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimitExceeded { endpoint: String },

    #[error("Node unhealthy: {message} (endpoint: {endpoint})")]
    NodeUnhealthy { endpoint: String, message: String },

    #[error("Blockhash not found (endpoint: {endpoint})")]
    BlockhashNotFound { endpoint: String },

    #[error("Insufficient funds (endpoint: {endpoint})")]
    InsufficientFunds { endpoint: String },

    /// The node has already processed a transaction with this signature
    #[error("Transaction already processed (endpoint: {endpoint})")]
    AlreadyProcessed { endpoint: String },

    /// The network understood the request and refused it
    #[error("Transaction rejected: {message} (endpoint: {endpoint})")]
    Rejected { endpoint: String, message: String },

    /// RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },
}

impl NetworkError {
    /// Whether repeating the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::Transport { .. } => true,
            NetworkError::Timeout { .. } => true,
            NetworkError::RateLimitExceeded { .. } => true,
            NetworkError::NodeUnhealthy { .. } => true,
            NetworkError::BlockhashNotFound { .. } => true,

            NetworkError::InsufficientFunds { .. } => false,
            NetworkError::AlreadyProcessed { .. } => false,
            NetworkError::Rejected { .. } => false,

            // Retry on server errors (5xx)
            NetworkError::RpcResponse { code, .. } => {
                matches!(code, Some(c) if (500..600).contains(c))
            }
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            NetworkError::Transport { .. } => "transport",
            NetworkError::Timeout { .. } => "timeout",
            NetworkError::RateLimitExceeded { .. } => "rate_limit",
            NetworkError::NodeUnhealthy { .. } => "node_unhealthy",
            NetworkError::BlockhashNotFound { .. } => "blockhash",
            NetworkError::InsufficientFunds { .. } => "insufficient_funds",
            NetworkError::AlreadyProcessed { .. } => "already_processed",
            NetworkError::Rejected { .. } => "rejected",
            NetworkError::RpcResponse { .. } => "rpc",
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            NetworkError::Transport { endpoint, .. }
            | NetworkError::Timeout { endpoint }
            | NetworkError::RateLimitExceeded { endpoint }
            | NetworkError::NodeUnhealthy { endpoint, .. }
            | NetworkError::BlockhashNotFound { endpoint }
            | NetworkError::InsufficientFunds { endpoint }
            | NetworkError::AlreadyProcessed { endpoint }
            | NetworkError::Rejected { endpoint, .. }
            | NetworkError::RpcResponse { endpoint, .. } => endpoint,
        }
    }

    /// Create from ClientError with context
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        let endpoint = endpoint.to_string();
        match err.kind() {
            ClientErrorKind::TransactionError(tx_err) => {
                return Self::classify_message(&tx_err.to_string(), endpoint, None, true);
            }
            ClientErrorKind::SigningError(sign_err) => {
                return NetworkError::Rejected {
                    endpoint,
                    message: sign_err.to_string(),
                };
            }
            ClientErrorKind::RpcError(RpcError::RpcResponseError {
                code,
                message,
                data,
            }) => {
                return match data {
                    RpcResponseErrorData::SendTransactionPreflightFailure(_) => {
                        Self::classify_message(message, endpoint, Some(*code), true)
                    }
                    RpcResponseErrorData::NodeUnhealthy { .. } => NetworkError::NodeUnhealthy {
                        endpoint,
                        message: message.clone(),
                    },
                    _ => Self::classify_message(
                        message,
                        endpoint,
                        Some(*code),
                        *code == PREFLIGHT_FAILURE_CODE,
                    ),
                };
            }
            _ => {}
        }
        Self::classify_message(&err.to_string(), endpoint, None, false)
    }

    /// Classify based on error message
    ///
    /// `rejected` marks errors the node produced after evaluating the
    /// transaction; anything unrecognized among those is a rejection.
    fn classify_message(message: &str, endpoint: String, code: Option<i64>, rejected: bool) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("already been processed") || lower.contains("alreadyprocessed") {
            NetworkError::AlreadyProcessed { endpoint }
        } else if lower.contains("blockhash not found") {
            NetworkError::BlockhashNotFound { endpoint }
        } else if lower.contains("insufficient funds") || lower.contains("insufficient lamports") {
            NetworkError::InsufficientFunds { endpoint }
        } else if rejected {
            NetworkError::Rejected {
                endpoint,
                message: message.to_string(),
            }
        } else if code == Some(NODE_UNHEALTHY_CODE) || lower.contains("node is unhealthy") {
            NetworkError::NodeUnhealthy {
                endpoint,
                message: message.to_string(),
            }
        } else if lower.contains("rate limit")
            || lower.contains("too many requests")
            || lower.contains("429")
        {
            NetworkError::RateLimitExceeded { endpoint }
        } else if lower.contains("timeout") || lower.contains("timed out") {
            NetworkError::Timeout { endpoint }
        } else if lower.contains("connection")
            || lower.contains("error sending request")
            || lower.contains("broken pipe")
            || lower.contains("dns")
        {
            NetworkError::Transport {
                endpoint,
                message: message.to_string(),
            }
        } else {
            // Extract error code if available
            let code = code.or_else(|| {
                lower
                    .split("code:")
                    .nth(1)
                    .and_then(|s| s.split_whitespace().next())
                    .and_then(|s| s.trim_end_matches(',').parse::<i64>().ok())
            });
            NetworkError::RpcResponse {
                endpoint,
                message: message.to_string(),
                code,
            }
        }
    }
}
