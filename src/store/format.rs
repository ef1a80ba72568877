//! Binary encoding of a baseline file.
//!
//! A 32-byte big-endian header (magic, version, flags, record count, reserved word,
//! checksum) followed by length-prefixed records sorted by name. The checksum is
//! FNV-1a over the header bytes preceding it and the entire body, so random or
//! truncated content is rejected instead of being read as an empty store.

use std::collections::BTreeMap;

use super::constants::*;
use crate::errors::StorageError;
use crate::record::BaselineRecord;

/// File header for a baseline file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 8],
    pub version: u32,
    pub flags: u32,
    pub record_count: u32,
    pub checksum: u64,
}

impl FileHeader {
    pub fn new(record_count: u32) -> Self {
        Self {
            magic: MAGIC_BYTES,
            version: FILE_FORMAT_VERSION,
            flags: DEFAULT_FEATURE_FLAGS,
            record_count,
            checksum: 0,
        }
    }

    /// Validate magic and version before trusting anything else in the file
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.magic != MAGIC_BYTES {
            return Err(StorageError::InvalidMagic {
                expected: u64::from_be_bytes(MAGIC_BYTES),
                found: u64::from_be_bytes(self.magic),
            });
        }
        if self.version != FILE_FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                version: self.version,
                supported: FILE_FORMAT_VERSION,
            });
        }
        Ok(())
    }

    fn encode_into(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.magic);
        buffer.extend_from_slice(&self.version.to_be_bytes());
        buffer.extend_from_slice(&self.flags.to_be_bytes());
        buffer.extend_from_slice(&self.record_count.to_be_bytes());
        buffer.extend_from_slice(&0u32.to_be_bytes());
        buffer.extend_from_slice(&self.checksum.to_be_bytes());
    }

    fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        if bytes.len() < HEADER_SIZE {
            return Err(StorageError::FileTooSmall {
                size: bytes.len() as u64,
                min_size: HEADER_SIZE as u64,
            });
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[header_offset::MAGIC..header_offset::VERSION]);
        Ok(Self {
            magic,
            version: be_u32(&bytes[header_offset::VERSION..header_offset::FLAGS]),
            flags: be_u32(&bytes[header_offset::FLAGS..header_offset::RECORD_COUNT]),
            record_count: be_u32(&bytes[header_offset::RECORD_COUNT..header_offset::RESERVED]),
            checksum: be_u64(&bytes[header_offset::CHECKSUM..HEADER_SIZE]),
        })
    }
}

/// Serialize records into the on-disk representation
pub fn encode_records(records: &BTreeMap<String, BaselineRecord>) -> Result<Vec<u8>, StorageError> {
    let record_count = u32::try_from(records.len())
        .map_err(|_| StorageError::invalid_record("<store>", "too many records"))?;
    let body_len: usize = records
        .values()
        .map(|r| record::FIXED_SIZE + r.name.len())
        .sum();
    let mut buffer = Vec::with_capacity(HEADER_SIZE + body_len);
    FileHeader::new(record_count).encode_into(&mut buffer);

    for rec in records.values() {
        validate_record(rec)?;
        buffer.extend_from_slice(&(rec.name.len() as u16).to_be_bytes());
        buffer.extend_from_slice(rec.name.as_bytes());
        buffer.extend_from_slice(&rec.value.to_bits().to_be_bytes());
        buffer.extend_from_slice(&rec.created_at.to_be_bytes());
    }

    let checksum = compute_checksum(&buffer);
    buffer[header_offset::CHECKSUM..HEADER_SIZE].copy_from_slice(&checksum.to_be_bytes());
    Ok(buffer)
}

/// Parse the on-disk representation. Even a store with no records carries a full
/// header, so an empty buffer is a truncated file.
pub fn decode_records(bytes: &[u8]) -> Result<BTreeMap<String, BaselineRecord>, StorageError> {
    let mut records = BTreeMap::new();
    let header = FileHeader::decode(bytes)?;
    header.validate()?;
    let expected = compute_checksum(bytes);
    if header.checksum != expected {
        return Err(StorageError::InvalidChecksum {
            expected,
            found: header.checksum,
        });
    }

    let mut cursor = Cursor::new(&bytes[HEADER_SIZE..]);
    for index in 0..header.record_count {
        let name_len = cursor
            .take(record::NAME_LEN_SIZE)
            .map(be_u16)
            .ok_or_else(|| StorageError::corrupt(index, "truncated name length"))?;
        let name_bytes = cursor
            .take(name_len as usize)
            .ok_or_else(|| StorageError::corrupt(index, "truncated name"))?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|e| StorageError::corrupt(index, format!("name is not UTF-8: {e}")))?
            .to_string();
        let value = cursor
            .take(record::VALUE_SIZE)
            .map(|b| f64::from_bits(be_u64(b)))
            .ok_or_else(|| StorageError::corrupt(index, "truncated value"))?;
        let created_at = cursor
            .take(record::CREATED_AT_SIZE)
            .map(be_u64)
            .ok_or_else(|| StorageError::corrupt(index, "truncated timestamp"))?;

        let rec = BaselineRecord {
            name,
            value,
            created_at,
        };
        validate_record(&rec).map_err(|e| StorageError::corrupt(index, e.to_string()))?;
        if records.contains_key(&rec.name) {
            return Err(StorageError::corrupt(
                index,
                format!("duplicate name '{}'", rec.name),
            ));
        }
        records.insert(rec.name.clone(), rec);
    }

    if cursor.remaining() > 0 {
        return Err(StorageError::TrailingBytes {
            count: cursor.remaining(),
        });
    }
    Ok(records)
}

/// A record is storable when its name fits the length prefix and its value is a real timing
pub fn validate_record(rec: &BaselineRecord) -> Result<(), StorageError> {
    if rec.name.is_empty() {
        return Err(StorageError::invalid_record(&rec.name, "name is empty"));
    }
    if rec.name.len() > record::MAX_NAME_LENGTH {
        return Err(StorageError::invalid_record(
            truncated_name(&rec.name),
            format!(
                "name is {} bytes (maximum {})",
                rec.name.len(),
                record::MAX_NAME_LENGTH
            ),
        ));
    }
    if !rec.value.is_finite() || rec.value <= 0.0 {
        return Err(StorageError::invalid_record(
            &rec.name,
            format!("value {} is not a positive finite timing", rec.value),
        ));
    }
    Ok(())
}

/// FNV-1a over everything except the checksum field itself
pub fn compute_checksum(bytes: &[u8]) -> u64 {
    let mut hash = checksum::FNV_OFFSET_BASIS;
    let head = &bytes[..header_offset::CHECKSUM.min(bytes.len())];
    let body = bytes.get(HEADER_SIZE..).unwrap_or(&[]);
    for byte in head.iter().chain(body) {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(checksum::FNV_PRIME);
    }
    hash
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

fn be_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn be_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}

fn truncated_name(name: &str) -> String {
    name.chars().take(64).collect::<String>() + "..."
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BTreeMap<String, BaselineRecord> {
        let mut records = BTreeMap::new();
        for (name, value) in [("parse_small", 1.25e-6), ("insert_large", 0.042)] {
            records.insert(
                name.to_string(),
                BaselineRecord {
                    name: name.to_string(),
                    value,
                    created_at: 1_700_000_000,
                },
            );
        }
        records
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let records = sample();
        let encoded = encode_records(&records).unwrap();
        assert_eq!(decode_records(&encoded).unwrap(), records);
    }

    #[test]
    fn test_empty_buffer_is_truncated() {
        assert!(matches!(
            decode_records(&[]),
            Err(StorageError::FileTooSmall { size: 0, .. })
        ));
        let header_only = encode_records(&BTreeMap::new()).unwrap();
        assert_eq!(header_only.len(), HEADER_SIZE);
        assert!(decode_records(&header_only).unwrap().is_empty());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = encode_records(&sample()).unwrap();
        let b = encode_records(&sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_magic_validation() {
        let mut encoded = encode_records(&sample()).unwrap();
        encoded[0] = 0xFF;
        assert!(matches!(
            decode_records(&encoded),
            Err(StorageError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_version_validation() {
        let mut encoded = encode_records(&sample()).unwrap();
        encoded[header_offset::VERSION..header_offset::FLAGS]
            .copy_from_slice(&99u32.to_be_bytes());
        assert!(matches!(
            decode_records(&encoded),
            Err(StorageError::UnsupportedVersion { version: 99, .. })
        ));
    }

    #[test]
    fn test_checksum_detects_flipped_body_byte() {
        let mut encoded = encode_records(&sample()).unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0x01;
        assert!(matches!(
            decode_records(&encoded),
            Err(StorageError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let encoded = encode_records(&sample()).unwrap();
        assert!(decode_records(&encoded[..HEADER_SIZE - 1]).is_err());
        assert!(decode_records(&encoded[..encoded.len() - 3]).is_err());
    }

    #[test]
    fn test_non_positive_value_is_rejected() {
        let rec = BaselineRecord {
            name: "zero".into(),
            value: 0.0,
            created_at: 0,
        };
        assert!(validate_record(&rec).is_err());
        let rec = BaselineRecord {
            value: f64::NAN,
            ..rec
        };
        assert!(validate_record(&rec).is_err());
    }
}
