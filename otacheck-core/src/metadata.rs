//! Fixed-layout firmware metadata record shared with the image producer.
//!
//! Wire layout (little-endian, no padding, 53 bytes):
//!
//! | offset | field        | type      |
//! |--------|--------------|-----------|
//! | 0      | magic        | u32       |
//! | 4      | version      | u32       |
//! | 8      | state        | u8        |
//! | 9      | image_size   | u32       |
//! | 13     | crc32        | u32       |
//! | 17     | sha256       | [u8; 32]  |
//! | 49     | metadata_crc | u32       |
//!
//! The natural Rust layout would insert padding after `state`, so the
//! record is never transmuted; fields are extracted and serialized at
//! explicit offsets. `metadata_crc` covers bytes 0..49.

use thiserror::Error;

use crate::crc32::crc32;

/// Sentinel identifying an initialized metadata record.
pub const OTA_MAGIC: u32 = 0xDEADC0DE;

/// Serialized size of the record in flash.
pub const META_LEN: usize = 53;

const CRC_OFFSET: usize = META_LEN - 4;

/// Decode failures, distinguished so callers can report which gate tripped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("record too short: expected {META_LEN} bytes, got {0}")]
    Truncated(usize),
    #[error("bad magic 0x{0:08X} (expected 0x{OTA_MAGIC:08X})")]
    BadMagic(u32),
    #[error("metadata CRC mismatch: calculated 0x{calculated:08X}, stored 0x{stored:08X}")]
    CrcMismatch { calculated: u32, stored: u32 },
}

/// Per-slot firmware descriptor written by the image producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareMetadata {
    pub magic: u32,
    pub version: u32,
    /// Opaque lifecycle tag, passed through to the report.
    pub state: u8,
    pub image_size: u32,
    pub crc32: u32,
    pub sha256: [u8; 32],
    pub metadata_crc: u32,
}

impl FirmwareMetadata {
    /// Parse a raw flash span. Verifies the magic and the record's own CRC.
    pub fn decode(raw: &[u8]) -> Result<FirmwareMetadata, MetadataError> {
        let meta = FirmwareMetadata::decode_unchecked(raw)?;

        if meta.magic != OTA_MAGIC {
            return Err(MetadataError::BadMagic(meta.magic));
        }
        let calculated = crc32(&raw[..CRC_OFFSET]);
        if calculated != meta.metadata_crc {
            return Err(MetadataError::CrcMismatch {
                calculated,
                stored: meta.metadata_crc,
            });
        }
        Ok(meta)
    }

    /// Parse without the magic/CRC gates. Used by the rollback guard, which
    /// needs the active slot's version even when the record is suspect.
    pub fn decode_unchecked(raw: &[u8]) -> Result<FirmwareMetadata, MetadataError> {
        if raw.len() < META_LEN {
            return Err(MetadataError::Truncated(raw.len()));
        }
        let mut sha256 = [0u8; 32];
        sha256.copy_from_slice(&raw[17..49]);

        Ok(FirmwareMetadata {
            magic: read_u32(raw, 0),
            version: read_u32(raw, 4),
            state: raw[8],
            image_size: read_u32(raw, 9),
            crc32: read_u32(raw, 13),
            sha256,
            metadata_crc: read_u32(raw, CRC_OFFSET),
        })
    }

    /// Serialize to the wire layout.
    pub fn encode(&self) -> [u8; META_LEN] {
        let mut raw = [0u8; META_LEN];
        raw[0..4].copy_from_slice(&self.magic.to_le_bytes());
        raw[4..8].copy_from_slice(&self.version.to_le_bytes());
        raw[8] = self.state;
        raw[9..13].copy_from_slice(&self.image_size.to_le_bytes());
        raw[13..17].copy_from_slice(&self.crc32.to_le_bytes());
        raw[17..49].copy_from_slice(&self.sha256);
        raw[CRC_OFFSET..].copy_from_slice(&self.metadata_crc.to_le_bytes());
        raw
    }

    /// CRC-32 over the serialized record excluding the trailing CRC field.
    pub fn self_crc(&self) -> u32 {
        crc32(&self.encode()[..CRC_OFFSET])
    }

    /// Producer side: store the record's own CRC. After sealing,
    /// `decode(encode())` succeeds.
    pub fn seal(&mut self) {
        self.metadata_crc = self.self_crc();
    }

    /// Build a sealed record describing `image`, computing both digests.
    pub fn for_image(image: &[u8], version: u32, state: u8) -> FirmwareMetadata {
        let mut meta = FirmwareMetadata {
            magic: OTA_MAGIC,
            version,
            state,
            image_size: image.len() as u32,
            crc32: crc32(image),
            sha256: crate::sha256::sha256(image),
            metadata_crc: 0,
        };
        meta.seal();
        meta
    }
}

fn read_u32(raw: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([raw[offset], raw[offset + 1], raw[offset + 2], raw[offset + 3]])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FirmwareMetadata {
        FirmwareMetadata::for_image(b"firmware bytes", 3, 0x02)
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let meta = sample();
        let raw = meta.encode();
        assert_eq!(raw.len(), META_LEN);
        let parsed = FirmwareMetadata::decode(&raw).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_field_offsets() {
        let meta = sample();
        let raw = meta.encode();
        assert_eq!(read_u32(&raw, 0), OTA_MAGIC);
        assert_eq!(read_u32(&raw, 4), 3);
        assert_eq!(raw[8], 0x02);
        assert_eq!(read_u32(&raw, 9), 14);
    }

    #[test]
    fn test_bad_magic() {
        let mut meta = sample();
        meta.magic = 0xCAFEBABE;
        meta.seal();
        assert_eq!(
            FirmwareMetadata::decode(&meta.encode()),
            Err(MetadataError::BadMagic(0xCAFEBABE))
        );
    }

    #[test]
    fn test_self_crc_mismatch() {
        let meta = sample();
        let mut raw = meta.encode();
        raw[4] ^= 0x01; // corrupt the version field
        assert!(matches!(
            FirmwareMetadata::decode(&raw),
            Err(MetadataError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated() {
        let raw = sample().encode();
        assert_eq!(
            FirmwareMetadata::decode(&raw[..20]),
            Err(MetadataError::Truncated(20))
        );
    }

    #[test]
    fn test_decode_unchecked_skips_gates() {
        let mut meta = sample();
        meta.magic = 0xFFFFFFFF; // erased flash
        let parsed = FirmwareMetadata::decode_unchecked(&meta.encode()).unwrap();
        assert_eq!(parsed.magic, 0xFFFFFFFF);
        assert_eq!(parsed.version, 3);
    }

    #[test]
    fn test_seal_makes_record_valid() {
        let mut meta = sample();
        meta.version = 99;
        // stale CRC until resealed
        assert!(FirmwareMetadata::decode(&meta.encode()).is_err());
        meta.seal();
        assert!(FirmwareMetadata::decode(&meta.encode()).is_ok());
    }
}
