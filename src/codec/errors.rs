//! Error types for the binary record codec

use thiserror::Error;

/// Raw bytes did not match the expected layout
///
/// Always a schema mismatch between this client and the remote program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Length mismatch for {record}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Buffer too short for {record}.{field}: need {needed} more bytes, {remaining} remain")]
    TooShort {
        record: &'static str,
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Length prefix of {record}.{field} claims {claimed} bytes but only {remaining} remain")]
    PrefixOverrun {
        record: &'static str,
        field: &'static str,
        claimed: usize,
        remaining: usize,
    },

    #[error("{record}.{field} is {len} bytes, bound is {max}")]
    FieldBound {
        record: &'static str,
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{record}.{field} is not valid UTF-8")]
    InvalidUtf8 {
        record: &'static str,
        field: &'static str,
    },

    #[error("{trailing} unexpected trailing bytes after {record}")]
    TrailingBytes { record: &'static str, trailing: usize },

    #[error("Unknown instruction tag {0}")]
    UnknownTag(u8),

    #[error("Empty buffer for {0}")]
    Empty(&'static str),

    #[error("Malformed {record}: {reason}")]
    Malformed { record: &'static str, reason: String },
}

/// A value could not be put on the wire
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{field} is {len} bytes, bound is {max}")]
    FieldBound {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Serialization failed: {0}")]
    Serialize(String),
}

impl DecodeError {
    /// Layout mismatches never fix themselves
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::LengthMismatch { .. } | Self::TooShort { .. } | Self::PrefixOverrun { .. } => "truncated",
            Self::FieldBound { .. } | Self::InvalidUtf8 { .. } => "field",
            Self::TrailingBytes { .. } => "trailing",
            Self::UnknownTag(_) | Self::Empty(_) | Self::Malformed { .. } => "malformed",
        }
    }

    pub(crate) fn malformed(record: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            record,
            reason: err.to_string(),
        }
    }
}

impl EncodeError {
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::FieldBound { .. } => "validation",
            Self::Serialize(_) => "serialization",
        }
    }
}
