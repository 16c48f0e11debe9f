//! Error types for the schema registry crate.

use kafka_types::EnvelopeError;
use thiserror::Error;

/// Errors returned by a [`crate::SchemaRegistry`].
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("registry returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unsupported schema type: {0}")]
    UnsupportedSchemaType(String),

    #[error("invalid registry URL: {0}")]
    InvalidUrl(String),

    #[error("invalid TLS material: {0}")]
    Tls(String),

    #[error("schema not found: {0}")]
    NotFound(u32),
}

/// Errors raised by the Avro codec.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("avro decode: {0}")]
    Decode(#[source] apache_avro::Error),

    #[error("avro encode: {0}")]
    Encode(#[source] apache_avro::Error),

    #[error("{0} trailing bytes after avro datum")]
    TrailingBytes(usize),

    /// The reader hit end of input inside a value it silently mapped to null
    #[error("decoded value does not match the schema (truncated payload?)")]
    SchemaMismatch,

    #[error("non-finite float {0} has no JSON representation")]
    NonFiniteFloat(f64),

    #[error("decimal conversion: {0}")]
    Decimal(#[source] apache_avro::Error),

    #[error("JSON encode: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while resolving a codec through the [`crate::CodecCache`].
///
/// Neither variant is cached: the next lookup of the same id retries.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("registry lookup for schema ID {schema_id}: {source}")]
    RegistryLookup {
        schema_id: u32,
        #[source]
        source: RegistryError,
    },

    #[error("compile avro schema ID {schema_id}: {source}")]
    SchemaCompile {
        schema_id: u32,
        #[source]
        source: apache_avro::Error,
    },
}

/// Errors raised by the [`crate::AvroTranscoder`].
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("schema ID header decode: {0}")]
    InvalidEnvelope(#[from] EnvelopeError),

    #[error("avro codec for schema ID: {0}")]
    CodecResolution(#[from] CacheError),

    #[error("avro payload for schema ID {schema_id}: {source}")]
    PayloadDecode {
        schema_id: u32,
        #[source]
        source: CodecError,
    },

    #[error("avro text for schema ID {schema_id}: {source}")]
    TextEncode {
        schema_id: u32,
        #[source]
        source: CodecError,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
