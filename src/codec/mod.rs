//! Binary record codec
//!
//! The wire format is owned by the remote programs, so every flow encodes and
//! decodes through this module and nowhere else:
//! - **schema**: field tables describing order, width and type per record kind
//! - **metadata**: borsh layout of [`MetadataRecord`](crate::types::MetadataRecord)
//! - **token**: fixed 165-byte SPL token account layout
//! - **instruction**: tagged instruction payloads for the metadata program

pub mod errors;
pub mod instruction;
pub mod metadata;
pub mod schema;
pub mod token;

pub use errors::{DecodeError, EncodeError};
pub use instruction::{InstructionKind, InstructionPayload, MetadataInstruction};
pub use schema::{FieldKind, FieldSpec, RecordSchema, METADATA_SCHEMA, TOKEN_HOLDING_SCHEMA};
pub use token::TOKEN_ACCOUNT_LEN;

/// A record type that can be decoded from raw account data
pub trait AccountRecord: Sized {
    /// Record name used in errors and logs
    const RECORD: &'static str;

    fn decode(data: &[u8]) -> Result<Self, DecodeError>;
}

impl AccountRecord for crate::types::MetadataRecord {
    const RECORD: &'static str = "metadata";

    fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        metadata::decode_metadata(data)
    }
}

impl AccountRecord for crate::types::TokenHoldingRecord {
    const RECORD: &'static str = "token_holding";

    fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        token::decode_token_holding(data)
    }
}
