//! Instruction payloads of the metadata program
//!
//! A payload is one tag byte followed by the borsh body:
//! - `0` CreateMetadata `{ data: MetadataRecord, id: u64 }`
//! - `1` UpdateMetadata `{ id: u64, price: u64 }`

use borsh::{BorshDeserialize, BorshSerialize};

use super::errors::{DecodeError, EncodeError};
use super::metadata::MetadataData;
use super::schema::METADATA_SCHEMA;
use crate::types::MetadataRecord;

/// Wire enum; borsh writes the variant index as the tag byte
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
enum MetadataInstructionData {
    CreateMetadata { data: MetadataData, id: u64 },
    UpdateMetadata { id: u64, price: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    CreateMetadata,
    UpdateMetadata,
}

impl InstructionKind {
    pub const fn tag(&self) -> u8 {
        match self {
            Self::CreateMetadata => 0,
            Self::UpdateMetadata => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::CreateMetadata),
            1 => Some(Self::UpdateMetadata),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateMetadata => "create_metadata",
            Self::UpdateMetadata => "update_metadata",
        }
    }
}

/// Typed instruction for the metadata program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataInstruction {
    CreateMetadata { record: MetadataRecord, id: u64 },
    UpdateMetadata { id: u64, price: u64 },
}

impl MetadataInstruction {
    pub fn kind(&self) -> InstructionKind {
        match self {
            Self::CreateMetadata { .. } => InstructionKind::CreateMetadata,
            Self::UpdateMetadata { .. } => InstructionKind::UpdateMetadata,
        }
    }

    pub fn encode(&self) -> Result<InstructionPayload, EncodeError> {
        let wire = match self {
            Self::CreateMetadata { record, id } => MetadataInstructionData::CreateMetadata {
                data: MetadataData::from_record(record)?,
                id: *id,
            },
            Self::UpdateMetadata { id, price } => MetadataInstructionData::UpdateMetadata {
                id: *id,
                price: *price,
            },
        };
        let bytes = borsh::to_vec(&wire).map_err(|e| EncodeError::Serialize(e.to_string()))?;
        Ok(InstructionPayload {
            kind: self.kind(),
            bytes,
        })
    }

    /// Strict decode: the whole buffer must be consumed
    ///
    /// A CreateMetadata body is walked through the metadata field table
    /// first, so out-of-bound names and uris fail like they do in account data.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let tag = *bytes.first().ok_or(DecodeError::Empty("instruction"))?;
        let kind = InstructionKind::from_tag(tag).ok_or(DecodeError::UnknownTag(tag))?;
        if kind == InstructionKind::CreateMetadata {
            METADATA_SCHEMA.validate(&bytes[1..])?;
        }

        let wire = borsh::from_slice::<MetadataInstructionData>(bytes)
            .map_err(|e| DecodeError::malformed("instruction", e))?;
        Ok(match wire {
            MetadataInstructionData::CreateMetadata { data, id } => Self::CreateMetadata {
                record: data.into_record(),
                id,
            },
            MetadataInstructionData::UpdateMetadata { id, price } => {
                Self::UpdateMetadata { id, price }
            }
        })
    }
}

/// Encoded instruction data, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionPayload {
    kind: InstructionKind,
    bytes: Vec<u8>,
}

impl InstructionPayload {
    pub fn kind(&self) -> InstructionKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    #[test]
    fn test_update_layout() {
        let payload = MetadataInstruction::UpdateMetadata {
            id: 1,
            price: 2_000_000_000,
        }
        .encode()
        .unwrap();

        assert_eq!(payload.kind(), InstructionKind::UpdateMetadata);
        let bytes = payload.as_bytes();
        assert_eq!(bytes.len(), 17);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..9], &1u64.to_le_bytes());
        assert_eq!(&bytes[9..17], &2_000_000_000u64.to_le_bytes());
    }

    #[test]
    fn test_create_carries_record_then_id() {
        let record = MetadataRecord {
            id: 3,
            name: "Sword".to_string(),
            uri: "ipfs://abc".to_string(),
            last_price: 0,
            listed_price: 10,
            owner_nft_address: Pubkey::new_unique(),
        };
        let ix = MetadataInstruction::CreateMetadata { record, id: 3 };
        let bytes = ix.encode().unwrap().into_bytes();

        assert_eq!(bytes[0], 0);
        assert_eq!(&bytes[bytes.len() - 8..], &3u64.to_le_bytes());
        assert_eq!(MetadataInstruction::decode(&bytes).unwrap(), ix);
    }

    #[test]
    fn test_decode_rejects_unknown_tag_and_trailing() {
        assert_eq!(
            MetadataInstruction::decode(&[9, 0, 0]),
            Err(DecodeError::UnknownTag(9))
        );
        assert_eq!(
            MetadataInstruction::decode(&[]),
            Err(DecodeError::Empty("instruction"))
        );

        let mut bytes = MetadataInstruction::UpdateMetadata { id: 1, price: 1 }
            .encode()
            .unwrap()
            .into_bytes();
        bytes.push(0);
        assert!(matches!(
            MetadataInstruction::decode(&bytes),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_enforces_field_bounds() {
        // hand-built so the encoder's own bound check is bypassed
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&3u64.to_le_bytes());
        bytes.extend_from_slice(&33u32.to_le_bytes());
        bytes.extend_from_slice(&[b'x'; 33]);
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(b"uri");
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&10u64.to_le_bytes());
        bytes.extend_from_slice(&[7u8; 32]);
        bytes.extend_from_slice(&3u64.to_le_bytes());

        assert_eq!(
            MetadataInstruction::decode(&bytes),
            Err(DecodeError::FieldBound {
                record: "metadata",
                field: "name",
                len: 33,
                max: 32,
            })
        );

        // same layout with a 32-byte name decodes
        let mut at_bound = vec![0u8];
        at_bound.extend_from_slice(&3u64.to_le_bytes());
        at_bound.extend_from_slice(&32u32.to_le_bytes());
        at_bound.extend_from_slice(&[b'x'; 32]);
        at_bound.extend_from_slice(&bytes[1 + 8 + 4 + 33..]);
        assert!(MetadataInstruction::decode(&at_bound).is_ok());
    }

    #[test]
    fn test_tags_round_trip() {
        for kind in [InstructionKind::CreateMetadata, InstructionKind::UpdateMetadata] {
            assert_eq!(InstructionKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(InstructionKind::from_tag(2), None);
    }
}
