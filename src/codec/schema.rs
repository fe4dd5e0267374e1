//! Field tables for the record kinds exchanged with the network
//!
//! A [`RecordSchema`] lists every field in wire order with its width and type.
//! Decoders walk the schema over the raw bytes before reading any value, so a
//! layout mismatch is reported with the offending field instead of surfacing
//! as a half-populated record.

use super::errors::DecodeError;
use crate::types::{MAX_NAME_LEN, MAX_URI_LEN};

/// Wire type of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned 64-bit little-endian integer
    U64Le,
    /// 32 raw address bytes
    Address,
    /// `u32` LE length prefix followed by at most `max_len` UTF-8 bytes
    BoundedString { max_len: usize },
    /// Bytes this client does not interpret
    Reserved { width: usize },
}

impl FieldKind {
    /// Width on the wire, `None` for variable-length fields
    pub const fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::U64Le => Some(8),
            Self::Address => Some(32),
            Self::BoundedString { .. } => None,
            Self::Reserved { width } => Some(*width),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Ordered field table of one record kind
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    pub record: &'static str,
    pub fields: &'static [FieldSpec],
    /// Exact byte length when the layout is fixed
    pub total_len: Option<usize>,
}

/// On-chain metadata record (borsh)
pub const METADATA_SCHEMA: RecordSchema = RecordSchema {
    record: "metadata",
    fields: &[
        FieldSpec { name: "id", kind: FieldKind::U64Le },
        FieldSpec { name: "name", kind: FieldKind::BoundedString { max_len: MAX_NAME_LEN } },
        FieldSpec { name: "uri", kind: FieldKind::BoundedString { max_len: MAX_URI_LEN } },
        FieldSpec { name: "last_price", kind: FieldKind::U64Le },
        FieldSpec { name: "listed_price", kind: FieldKind::U64Le },
        FieldSpec { name: "owner_nft_address", kind: FieldKind::Address },
    ],
    total_len: None,
};

/// SPL token account
pub const TOKEN_HOLDING_SCHEMA: RecordSchema = RecordSchema {
    record: "token_holding",
    fields: &[
        FieldSpec { name: "mint", kind: FieldKind::Address },
        FieldSpec { name: "owner", kind: FieldKind::Address },
        FieldSpec { name: "amount", kind: FieldKind::U64Le },
        // delegate option, state, is_native, delegated_amount, close_authority
        FieldSpec { name: "tail", kind: FieldKind::Reserved { width: 93 } },
    ],
    total_len: Some(165),
};

impl RecordSchema {
    /// Offset of `name`, as long as only fixed-width fields precede it
    pub fn field_offset(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for field in self.fields {
            if field.name == name {
                return Some(offset);
            }
            offset += field.kind.fixed_width()?;
        }
        None
    }

    /// Smallest buffer that could hold this record
    pub fn min_len(&self) -> usize {
        self.fields
            .iter()
            .map(|f| match f.kind {
                FieldKind::BoundedString { .. } => 4,
                kind => kind.fixed_width().unwrap_or(0),
            })
            .sum()
    }

    /// Walk the field table over `data` and return the number of bytes the
    /// record occupies. Trailing bytes are left for the caller to judge.
    pub fn validate(&self, data: &[u8]) -> Result<usize, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::Empty(self.record));
        }
        if let Some(expected) = self.total_len {
            if data.len() != expected {
                return Err(DecodeError::LengthMismatch {
                    record: self.record,
                    expected,
                    actual: data.len(),
                });
            }
        }

        let mut cursor = 0usize;
        for field in self.fields {
            let remaining = data.len() - cursor;
            match field.kind {
                FieldKind::BoundedString { max_len } => {
                    if remaining < 4 {
                        return Err(self.too_short(field, 4, remaining));
                    }
                    let mut prefix = [0u8; 4];
                    prefix.copy_from_slice(&data[cursor..cursor + 4]);
                    let len = u32::from_le_bytes(prefix) as usize;
                    cursor += 4;

                    let remaining = data.len() - cursor;
                    if len > remaining {
                        return Err(DecodeError::PrefixOverrun {
                            record: self.record,
                            field: field.name,
                            claimed: len,
                            remaining,
                        });
                    }
                    if len > max_len {
                        return Err(DecodeError::FieldBound {
                            record: self.record,
                            field: field.name,
                            len,
                            max: max_len,
                        });
                    }
                    if std::str::from_utf8(&data[cursor..cursor + len]).is_err() {
                        return Err(DecodeError::InvalidUtf8 {
                            record: self.record,
                            field: field.name,
                        });
                    }
                    cursor += len;
                }
                kind => {
                    let width = kind.fixed_width().unwrap_or(0);
                    if remaining < width {
                        return Err(self.too_short(field, width, remaining));
                    }
                    cursor += width;
                }
            }
        }
        Ok(cursor)
    }

    fn too_short(&self, field: &FieldSpec, needed: usize, remaining: usize) -> DecodeError {
        DecodeError::TooShort {
            record: self.record,
            field: field.name,
            needed,
            remaining,
        }
    }
}

/// Read a little-endian `u64` at `offset`; the caller has validated the layout
pub(crate) fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    let bytes: [u8; 8] = data.get(offset..offset + 8)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

/// Read 32 address bytes at `offset`
pub(crate) fn read_address(data: &[u8], offset: usize) -> Option<[u8; 32]> {
    data.get(offset..offset + 32)?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_offsets() {
        assert_eq!(TOKEN_HOLDING_SCHEMA.field_offset("mint"), Some(0));
        assert_eq!(TOKEN_HOLDING_SCHEMA.field_offset("owner"), Some(32));
        assert_eq!(TOKEN_HOLDING_SCHEMA.field_offset("amount"), Some(64));
        assert_eq!(TOKEN_HOLDING_SCHEMA.field_offset("missing"), None);
        assert_eq!(TOKEN_HOLDING_SCHEMA.min_len(), 165);
    }

    #[test]
    fn test_offset_stops_at_variable_field() {
        assert_eq!(METADATA_SCHEMA.field_offset("id"), Some(0));
        assert_eq!(METADATA_SCHEMA.field_offset("name"), Some(8));
        // uri sits behind a variable-length name
        assert_eq!(METADATA_SCHEMA.field_offset("uri"), None);
    }

    #[test]
    fn test_metadata_min_len() {
        // id + 2 prefixes + 2 prices + address
        assert_eq!(METADATA_SCHEMA.min_len(), 8 + 4 + 4 + 8 + 8 + 32);
    }

    #[test]
    fn test_fixed_length_mismatch() {
        let err = TOKEN_HOLDING_SCHEMA.validate(&[0u8; 164]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::LengthMismatch {
                record: "token_holding",
                expected: 165,
                actual: 164
            }
        );
    }

    #[test]
    fn test_prefix_overrun() {
        let mut data = vec![0u8; 8];
        data.extend_from_slice(&1000u32.to_le_bytes());
        data.extend_from_slice(b"short");

        let err = METADATA_SCHEMA.validate(&data).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::PrefixOverrun { field: "name", claimed: 1000, remaining: 5, .. }
        ));
    }

    #[test]
    fn test_string_bound() {
        let name = "x".repeat(MAX_NAME_LEN + 1);
        let mut data = vec![0u8; 8];
        data.extend_from_slice(&(name.len() as u32).to_le_bytes());
        data.extend_from_slice(name.as_bytes());
        data.extend_from_slice(&[0u8; 64]);

        let err = METADATA_SCHEMA.validate(&data).unwrap_err();
        assert!(matches!(err, DecodeError::FieldBound { field: "name", .. }));
    }

    #[test]
    fn test_read_helpers() {
        let mut data = vec![0u8; 40];
        data[8..16].copy_from_slice(&42u64.to_le_bytes());
        assert_eq!(read_u64_le(&data, 8), Some(42));
        assert_eq!(read_u64_le(&data, 36), None);
        assert_eq!(read_address(&data, 8).map(|a| a[0]), Some(42));
        assert_eq!(read_address(&data, 9), None);
    }
}
