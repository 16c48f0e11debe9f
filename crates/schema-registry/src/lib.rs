//! Schema registry support for kadumper.
//!
//! This crate provides:
//! - A schema registry client ([`SchemaRegistry`] trait, [`HttpSchemaRegistry`] over HTTP)
//! - Avro codecs compiled from registry schemas ([`AvroCodec`])
//! - A time-bounded codec cache keyed by schema id ([`CodecCache`])
//! - The wire-format transcoder turning framed Avro bytes into JSON text ([`AvroTranscoder`])
//!
//! # Data flow
//!
//! ```text
//! framed bytes -> parse_envelope -> schema id -> CodecCache (miss: registry) -> AvroCodec
//!              -> payload decode -> JSON text
//! ```

pub mod cache;
pub mod client;
pub mod codec;
pub mod error;
pub mod transcoder;

pub use cache::{CacheSettings, CodecCache, DEFAULT_MAX_AGE, DEFAULT_SWEEP_INTERVAL};
pub use client::{HttpSchemaRegistry, RegistryTls, SchemaRegistry};
pub use codec::AvroCodec;
pub use error::{CacheError, CodecError, RegistryError, Result, TranscodeError};
pub use transcoder::AvroTranscoder;
