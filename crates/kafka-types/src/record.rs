//! Kafka record type.
//!
//! A plain, owned copy of one consumed record. The consumer crate converts
//! broker messages into this type so the formatter and the fetch loop never
//! deal with client-specific borrowed messages.

/// A record consumed from a Kafka topic.
///
/// Key and value are kept as raw bytes; they may be Confluent-framed Avro
/// (see [`crate::envelope`]) or arbitrary data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Kafka topic name
    pub topic: String,
    /// Kafka partition number
    pub partition: i32,
    /// Kafka offset within the partition
    pub offset: i64,
    /// Record timestamp in milliseconds since epoch (if available)
    pub timestamp: Option<i64>,
    /// Record key (if any)
    pub key: Option<Vec<u8>>,
    /// Record value (if any)
    pub value: Option<Vec<u8>>,
}

impl Record {
    /// Create a record with no key, value or timestamp.
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Timestamp in milliseconds, `-1` when the broker did not provide one.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.unwrap_or(-1)
    }
}
