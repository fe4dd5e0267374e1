//! Borsh layout of the metadata record

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use super::errors::{DecodeError, EncodeError};
use super::schema::METADATA_SCHEMA;
use crate::types::{MetadataRecord, MAX_NAME_LEN, MAX_URI_LEN};

/// Metadata record exactly as the program lays it out
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub(crate) struct MetadataData {
    pub id: u64,
    pub name: String,
    pub uri: String,
    pub last_price: u64,
    pub listed_price: u64,
    pub owner_nft_address: [u8; 32],
}

impl MetadataData {
    pub(crate) fn from_record(record: &MetadataRecord) -> Result<Self, EncodeError> {
        check_bound("name", &record.name, MAX_NAME_LEN)?;
        check_bound("uri", &record.uri, MAX_URI_LEN)?;
        Ok(Self {
            id: record.id,
            name: record.name.clone(),
            uri: record.uri.clone(),
            last_price: record.last_price,
            listed_price: record.listed_price,
            owner_nft_address: record.owner_nft_address.to_bytes(),
        })
    }

    pub(crate) fn into_record(self) -> MetadataRecord {
        MetadataRecord {
            id: self.id,
            name: self.name,
            uri: self.uri,
            last_price: self.last_price,
            listed_price: self.listed_price,
            owner_nft_address: Pubkey::new_from_array(self.owner_nft_address),
        }
    }
}

fn check_bound(field: &'static str, value: &str, max: usize) -> Result<(), EncodeError> {
    if value.len() > max {
        return Err(EncodeError::FieldBound {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

/// Serialize a record the way the program stores it
pub fn encode_metadata(record: &MetadataRecord) -> Result<Vec<u8>, EncodeError> {
    let data = MetadataData::from_record(record)?;
    borsh::to_vec(&data).map_err(|e| EncodeError::Serialize(e.to_string()))
}

/// Decode metadata account data
///
/// Accounts may be allocated larger than the record; anything after it must
/// be zero padding.
pub fn decode_metadata(data: &[u8]) -> Result<MetadataRecord, DecodeError> {
    let used = METADATA_SCHEMA.validate(data)?;

    let trailing = data[used..].iter().filter(|&&b| b != 0).count();
    if trailing > 0 {
        return Err(DecodeError::TrailingBytes {
            record: METADATA_SCHEMA.record,
            trailing: data.len() - used,
        });
    }

    borsh::from_slice::<MetadataData>(&data[..used])
        .map(MetadataData::into_record)
        .map_err(|e| DecodeError::malformed(METADATA_SCHEMA.record, e))
}
