//! Log record definitions
//!
//! Defines the structure of individual log records and their framing.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrollError};

use super::FRAME_HEADER_SIZE;

/// A single record in the data log
///
/// Records are immutable once written: an update is a new `put` record and a
/// delete is a new tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The key bytes
    pub key: Vec<u8>,

    /// The value bytes (empty for tombstones)
    pub value: Vec<u8>,

    /// Absolute expiry as unix millis, if the key has a TTL
    pub expiry: Option<u64>,

    /// Whether this record marks the key as deleted
    pub tombstone: bool,
}

impl Record {
    /// Create a record holding a live value
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, expiry: Option<u64>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expiry,
            tombstone: false,
        }
    }

    /// Create a tombstone for the given key
    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            expiry: None,
            tombstone: true,
        }
    }

    /// True if the record carries an expiry at or before `now_millis`
    pub fn is_expired_at(&self, now_millis: u64) -> bool {
        matches!(self.expiry, Some(expiry) if now_millis >= expiry)
    }

    /// Encode the record into a complete frame
    ///
    /// Format: [crc32: u32][payload_len: u32][payload: bincode(Record)]
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let payload_len = u32::try_from(payload.len()).map_err(|_| {
            ScrollError::Serialization(format!(
                "record payload of {} bytes exceeds the frame limit",
                payload.len()
            ))
        })?;

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
        buf.put_u32_le(crc32fast::hash(&payload));
        buf.put_u32_le(payload_len);
        buf.put_slice(&payload);

        Ok(buf.to_vec())
    }

    /// Decode a record from a complete frame
    ///
    /// Any framing problem (short buffer, length mismatch, bad checksum,
    /// undecodable payload) is reported as `CorruptLog`.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() < FRAME_HEADER_SIZE {
            return Err(ScrollError::CorruptLog(format!(
                "frame too short: {} bytes",
                frame.len()
            )));
        }

        let mut header = &frame[..FRAME_HEADER_SIZE];
        let checksum = header.get_u32_le();
        let payload_len = header.get_u32_le() as usize;

        let payload = &frame[FRAME_HEADER_SIZE..];
        if payload.len() != payload_len {
            return Err(ScrollError::CorruptLog(format!(
                "payload length mismatch: header says {}, frame holds {}",
                payload_len,
                payload.len()
            )));
        }

        let actual = crc32fast::hash(payload);
        if actual != checksum {
            return Err(ScrollError::CorruptLog(format!(
                "checksum mismatch: expected {:#x}, got {:#x}",
                checksum, actual
            )));
        }

        bincode::deserialize(payload)
            .map_err(|e| ScrollError::CorruptLog(format!("undecodable payload: {}", e)))
    }

    /// Parse a frame header, returning (checksum, payload_len)
    pub fn parse_header(header: &[u8; FRAME_HEADER_SIZE]) -> (u32, u32) {
        let mut buf = &header[..];
        let checksum = buf.get_u32_le();
        let payload_len = buf.get_u32_le();
        (checksum, payload_len)
    }
}
