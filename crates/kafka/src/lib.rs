//! Kafka consumer library designed for `kadumper`'s use case of dumping Kafka
//! records as delimited text lines.
//!
//! Features:
//!
//! - Batched polling with an optional per-poll deadline
//! - Pluggable record sources ([`RecordSource`]) and dumpers ([`RecordDumper`])
//! - Optional Avro decoding of keys and values through a schema registry
//! - Fail-fast fetch loop with cooperative cancellation

/// Kafka consumer delivering records in batches
///
/// Wraps an rdkafka stream consumer behind the [`RecordSource`] trait.
pub mod consumer;

/// Record dumpers rendering records as text lines
pub mod dumper;
pub mod error;

/// Poll/dump loop and its stop conditions
pub mod fetch;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for easy access
pub use consumer::{
    ConsumerConfig, FetchFailure, Fetches, KafkaConsumer, OffsetReset, RecordSource, TlsConfig,
};
pub use dumper::{build_dumper, DumpFields, DumperKind, RecordDumper, WriterRecordDumper};
pub use error::{ConsumerError, DumpError, Result};
pub use fetch::{dump_records, DumpOptions, DumpSummary, StopReason};
