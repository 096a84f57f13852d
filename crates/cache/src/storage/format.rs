//! Binary layout of the index file
//!
//! A fixed-size header (magic, version, payload length, CRC32C of the
//! payload) followed by the bincode-encoded payload. Anything that fails
//! validation is reported as corruption so the caller can start cold.

use crate::errors::{CacheError, RecoveryHint, Result, SerializationOp};
use crc32c::crc32c;
use serde::{Deserialize, Serialize};

/// Magic number for index files: "ACIX"
pub const INDEX_MAGIC: u32 = 0x4143_4958;

/// Current index format version
pub const INDEX_VERSION: u16 = 1;

/// Encoded header size: u32 + u16 + u16 + u64 + u32 with bincode's fixed-int encoding
pub const HEADER_LEN: usize = 20;

/// Header written in front of every index payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct IndexHeader {
    magic: u32,
    version: u16,
    /// Reserved for future flags
    flags: u16,
    payload_len: u64,
    payload_crc: u32,
}

impl IndexHeader {
    pub fn for_payload(payload: &[u8]) -> Self {
        Self {
            magic: INDEX_MAGIC,
            version: INDEX_VERSION,
            flags: 0,
            payload_len: payload.len() as u64,
            payload_crc: crc32c(payload),
        }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    fn validate(&self, payload: &[u8]) -> Result<()> {
        if self.magic != INDEX_MAGIC {
            return Err(corruption(format!(
                "Invalid magic number: expected {:08x}, got {:08x}",
                INDEX_MAGIC, self.magic
            )));
        }

        if self.version > INDEX_VERSION {
            return Err(CacheError::Corruption {
                key: super::INDEX_FILE_NAME.to_string(),
                reason: format!("Unsupported index version: {}", self.version),
                recovery_hint: RecoveryHint::Manual {
                    instructions: "Upgrade to a build that understands this index".to_string(),
                },
            });
        }

        if self.payload_len != payload.len() as u64 {
            return Err(corruption(format!(
                "Payload length mismatch: header says {}, file has {}",
                self.payload_len,
                payload.len()
            )));
        }

        let actual_crc = crc32c(payload);
        if self.payload_crc != actual_crc {
            return Err(corruption(format!(
                "Payload CRC mismatch: expected {:08x}, got {:08x}",
                self.payload_crc, actual_crc
            )));
        }

        Ok(())
    }
}

/// Frame a serializable payload with a header
pub fn encode<T: Serialize>(payload: &T) -> Result<Vec<u8>> {
    let body = bincode::serialize(payload).map_err(|e| CacheError::Serialization {
        key: super::INDEX_FILE_NAME.to_string(),
        operation: SerializationOp::Encode,
        source: e,
        recovery_hint: RecoveryHint::RebuildIndex,
    })?;

    let header = bincode::serialize(&IndexHeader::for_payload(&body))?;
    debug_assert_eq!(header.len(), HEADER_LEN);

    let mut output = Vec::with_capacity(header.len() + body.len());
    output.extend_from_slice(&header);
    output.extend_from_slice(&body);
    Ok(output)
}

/// Validate a framed file and decode its payload
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_LEN {
        return Err(corruption(format!(
            "Index too short: {} bytes, header needs {HEADER_LEN}",
            bytes.len()
        )));
    }

    let (header_bytes, payload) = bytes.split_at(HEADER_LEN);
    let header: IndexHeader = bincode::deserialize(header_bytes)?;
    header.validate(payload)?;

    bincode::deserialize(payload).map_err(|e| CacheError::Serialization {
        key: super::INDEX_FILE_NAME.to_string(),
        operation: SerializationOp::Decode,
        source: e,
        recovery_hint: RecoveryHint::RebuildIndex,
    })
}

fn corruption(reason: String) -> CacheError {
    CacheError::Corruption {
        key: super::INDEX_FILE_NAME.to_string(),
        reason,
        recovery_hint: RecoveryHint::RebuildIndex,
    }
}
