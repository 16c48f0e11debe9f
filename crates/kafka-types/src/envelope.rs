//! Confluent wire envelope.
//!
//! Keys and values produced with a schema registry serializer are framed as:
//!
//! ```text
//! +-------+----------------------+-----------------+
//! | 0x00  | schema id (u32, BE)  | encoded payload |
//! +-------+----------------------+-----------------+
//!   1 byte        4 bytes            remaining
//! ```

use crate::error::{EnvelopeError, Result};

/// Marker byte every framed key or value starts with.
pub const MAGIC_BYTE: u8 = 0x00;

/// Length of the marker byte plus the schema id.
pub const HEADER_LEN: usize = 5;

/// A parsed wire envelope borrowing its payload from the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub schema_id: u32,
    pub payload: &'a [u8],
}

/// Split raw bytes into schema id and payload.
pub fn parse_envelope(data: &[u8]) -> Result<Envelope<'_>> {
    if data.len() < HEADER_LEN {
        return Err(EnvelopeError::TooShort {
            expected: HEADER_LEN,
            actual: data.len(),
        });
    }

    if data[0] != MAGIC_BYTE {
        return Err(EnvelopeError::InvalidMagicByte {
            expected: MAGIC_BYTE,
            actual: data[0],
        });
    }

    let schema_id = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);

    Ok(Envelope {
        schema_id,
        payload: &data[HEADER_LEN..],
    })
}

/// Frame an already-encoded payload for the given schema id.
pub fn encode_envelope(schema_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(MAGIC_BYTE);
    out.extend_from_slice(&schema_id.to_be_bytes());
    out.extend_from_slice(payload);
    out
}
