//! Shared types for kadumper.
//!
//! This crate provides the data types that flow between the consumer crate
//! and the schema registry crate:
//!
//! - [`record`] - owned copy of one consumed Kafka record
//! - [`envelope`] - Confluent wire envelope (marker byte + schema id + payload)
//! - [`error`] - Error types for envelope parsing
//!
//! # Examples
//!
//! ```
//! use kafka_types::{encode_envelope, parse_envelope};
//!
//! let framed = encode_envelope(7, &[0x54]);
//! let envelope = parse_envelope(&framed).unwrap();
//! assert_eq!(envelope.schema_id, 7);
//! ```

pub mod envelope;
pub mod error;
pub mod record;

// Re-export main types for convenient access
pub use envelope::{encode_envelope, parse_envelope, Envelope, HEADER_LEN, MAGIC_BYTE};
pub use error::{EnvelopeError, Result};
pub use record::Record;
