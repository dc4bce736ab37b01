//! # Snapshot Wire Codec
//!
//! Payload layout of the `unordered_txs` snapshot extension.
//!
//! ```text
//! payload 0:    [FORMAT: u32 BE]
//! payload 1..n: [COUNT: u32 BE][RECORD]*COUNT
//!               RECORD = [HASH: 32][EXPIRES_AT: u64 BE]
//! ```
//!
//! Big-endian so the stream is byte-identical across architectures.
//! Records carry no ordering guarantee.

use crate::domain::{Timestamp, TxEntry, UnorderedTxError};

/// Size of the leading format payload.
pub const HEADER_LEN: usize = 4;

/// Size of one encoded record.
pub const SNAPSHOT_RECORD_LEN: usize = 32 + 8;

const COUNT_LEN: usize = 4;

/// Encodes the leading format payload.
pub fn encode_header(format: u32) -> Vec<u8> {
    format.to_be_bytes().to_vec()
}

/// Decodes the leading format payload.
pub fn decode_header(bytes: &[u8]) -> Result<u32, UnorderedTxError> {
    let raw: [u8; HEADER_LEN] = bytes.try_into().map_err(|_| {
        UnorderedTxError::Decode(format!(
            "format header must be {} bytes, got {}",
            HEADER_LEN,
            bytes.len()
        ))
    })?;
    Ok(u32::from_be_bytes(raw))
}

/// Encodes one chunk of records.
pub fn encode_chunk(entries: &[TxEntry]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(COUNT_LEN + entries.len() * SNAPSHOT_RECORD_LEN);
    buf.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for entry in entries {
        buf.extend_from_slice(&entry.hash);
        buf.extend_from_slice(&entry.expires_at.to_be_bytes());
    }
    buf
}

/// Decodes one chunk of records.
///
/// # Errors
///
/// `Decode` if the chunk is shorter than its count prefix or its length does
/// not match the declared record count exactly.
pub fn decode_chunk(bytes: &[u8]) -> Result<Vec<TxEntry>, UnorderedTxError> {
    if bytes.len() < COUNT_LEN {
        return Err(UnorderedTxError::Decode(format!(
            "chunk too short for record count: {} bytes",
            bytes.len()
        )));
    }

    let (count_bytes, body) = bytes.split_at(COUNT_LEN);
    let mut raw_count = [0u8; COUNT_LEN];
    raw_count.copy_from_slice(count_bytes);
    let count = u32::from_be_bytes(raw_count) as usize;

    let expected = count.checked_mul(SNAPSHOT_RECORD_LEN).ok_or_else(|| {
        UnorderedTxError::Decode(format!("record count {} overflows", count))
    })?;
    if body.len() != expected {
        return Err(UnorderedTxError::Decode(format!(
            "chunk declares {} records ({} bytes) but carries {} bytes",
            count,
            expected,
            body.len()
        )));
    }

    Ok(body
        .chunks_exact(SNAPSHOT_RECORD_LEN)
        .map(|record| {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&record[..32]);
            let mut expiry = [0u8; 8];
            expiry.copy_from_slice(&record[32..]);
            TxEntry::new(hash, Timestamp::from_be_bytes(expiry))
        })
        .collect())
}
