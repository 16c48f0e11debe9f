use crate::error::{ConsumerError, Result};
use async_trait::async_trait;
use kafka_types::Record;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer as RdkafkaConsumer, StreamConsumer as RdkafkaStreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Message as RdkafkaMessage};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How long to keep draining already-fetched messages into the current batch.
const BATCH_LINGER: Duration = Duration::from_millis(10);

/// Where to start consuming when no committed offsets exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetReset {
    /// Start from the beginning of each partition
    Earliest,
    /// Start from the end of each partition, i.e. only new records
    #[default]
    Latest,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for OffsetReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS client authentication files, PEM encoded
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
    pub ca_cert: Option<PathBuf>,
}

/// Configuration for Kafka consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Topics to consume from
    pub topics: Vec<String>,
    /// Consumer group ID
    ///
    /// When absent, a random group id is generated for this process only and
    /// offsets are never committed, so every run starts from `auto_offset_reset`.
    pub group_id: Option<String>,
    /// Start-offset policy for partitions without committed offsets
    pub auto_offset_reset: OffsetReset,
    /// Session timeout in milliseconds
    pub session_timeout_ms: String,
    /// Maximum number of records returned by one poll
    pub batch_size: usize,
    /// TLS client authentication, if the cluster requires it
    pub tls: Option<TlsConfig>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topics: Vec::new(),
            group_id: None,
            auto_offset_reset: OffsetReset::Latest,
            session_timeout_ms: "6000".to_string(),
            batch_size: 500,
            tls: None,
        }
    }
}

impl ConsumerConfig {
    /// Build the librdkafka configuration for this consumer.
    pub fn client_config(&self) -> Result<ClientConfig> {
        if self.brokers.trim().is_empty() {
            return Err(ConsumerError::InvalidConfig(
                "at least one seed broker is required".to_string(),
            ));
        }
        if self.topics.is_empty() {
            return Err(ConsumerError::InvalidConfig(
                "at least one topic is required".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConsumerError::InvalidConfig(
                "batch size must be greater than zero".to_string(),
            ));
        }

        let (group_id, auto_commit) = match &self.group_id {
            Some(group_id) => (group_id.clone(), true),
            None => (format!("kadumper-{}", uuid::Uuid::new_v4()), false),
        };

        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", auto_commit.to_string())
            .set("auto.offset.reset", self.auto_offset_reset.as_str())
            .set("session.timeout.ms", &self.session_timeout_ms)
            .set("enable.partition.eof", "false");

        if let Some(tls) = &self.tls {
            config
                .set("security.protocol", "ssl")
                .set("ssl.certificate.location", tls.client_cert.display().to_string())
                .set("ssl.key.location", tls.client_key.display().to_string());
            if let Some(ca) = &tls.ca_cert {
                config.set("ssl.ca.location", ca.display().to_string());
            }
        }

        Ok(config)
    }
}

/// One error reported by a poll
#[derive(Debug, Clone)]
pub enum FetchFailure {
    /// No record arrived within the per-poll deadline
    DeadlineExceeded,
    /// Error reported by the Kafka client
    Kafka(KafkaError),
}

impl FetchFailure {
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadlineExceeded => f.write_str("fetch deadline exceeded"),
            Self::Kafka(e) => write!(f, "{e}"),
        }
    }
}

/// Result of one poll: the records delivered, the errors reported, and
/// whether the client has been closed.
#[derive(Debug, Default)]
pub struct Fetches {
    pub records: Vec<Record>,
    pub errors: Vec<FetchFailure>,
    closed: bool,
}

impl Fetches {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn from_error(error: FetchFailure) -> Self {
        Self {
            errors: vec![error],
            ..Default::default()
        }
    }

    pub fn client_closed() -> Self {
        Self {
            closed: true,
            ..Default::default()
        }
    }

    pub fn is_client_closed(&self) -> bool {
        self.closed
    }
}

/// A source of record batches, e.g. a Kafka consumer.
#[async_trait]
pub trait RecordSource: Send {
    /// Wait for the next batch of records.
    ///
    /// With a deadline, a poll that sees no record in time reports
    /// [`FetchFailure::DeadlineExceeded`]. Without one it waits until data
    /// arrives or the client fails.
    async fn poll(&mut self, deadline: Option<Duration>) -> Fetches;

    fn is_closed(&self) -> bool;

    fn close(&mut self);
}

/// Kafka consumer delivering records in batches
pub struct KafkaConsumer {
    consumer: Arc<RdkafkaStreamConsumer>,
    config: ConsumerConfig,
    closed: bool,
}

impl KafkaConsumer {
    /// Create a consumer and subscribe to the configured topics
    pub fn new(config: ConsumerConfig) -> Result<Self> {
        let consumer: RdkafkaStreamConsumer = config
            .client_config()?
            .create()
            .map_err(|e| ConsumerError::InvalidConfig(format!("Failed to create consumer: {e}")))?;

        let topics: Vec<&str> = config.topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics)?;

        Ok(Self {
            consumer: Arc::new(consumer),
            config,
            closed: false,
        })
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Fetch cluster metadata to check that the brokers are reachable.
    ///
    /// Returns the number of brokers in the cluster.
    pub async fn ping(&self, timeout: Duration) -> Result<usize> {
        let consumer = Arc::clone(&self.consumer);
        let brokers = tokio::task::spawn_blocking(move || {
            consumer
                .fetch_metadata(None, timeout)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|e| ConsumerError::Ping(e.to_string()))??;

        if brokers == 0 {
            return Err(ConsumerError::Ping("no brokers in cluster metadata".to_string()));
        }
        Ok(brokers)
    }
}

#[async_trait]
impl RecordSource for KafkaConsumer {
    async fn poll(&mut self, deadline: Option<Duration>) -> Fetches {
        if self.closed {
            return Fetches::client_closed();
        }

        let first = match deadline {
            Some(deadline) => match tokio::time::timeout(deadline, self.consumer.recv()).await {
                Ok(received) => received.map(|msg| record_from_message(&msg)),
                Err(_) => return Fetches::from_error(FetchFailure::DeadlineExceeded),
            },
            None => self
                .consumer
                .recv()
                .await
                .map(|msg| record_from_message(&msg)),
        };

        let mut fetches = match first {
            Ok(record) => Fetches::from_records(vec![record]),
            Err(e) => return Fetches::from_error(FetchFailure::Kafka(e)),
        };

        // Drain whatever else is already buffered, without waiting for more
        while fetches.records.len() < self.config.batch_size {
            match tokio::time::timeout(BATCH_LINGER, self.consumer.recv()).await {
                Ok(Ok(msg)) => fetches.records.push(record_from_message(&msg)),
                Ok(Err(e)) => {
                    fetches.errors.push(FetchFailure::Kafka(e));
                    break;
                }
                Err(_) => break,
            }
        }

        debug!("Polled {} records", fetches.records.len());
        fetches
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) {
        if !self.closed {
            self.consumer.unsubscribe();
            self.closed = true;
        }
    }
}

fn record_from_message(msg: &RdkafkaBorrowedMessage) -> Record {
    Record {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        timestamp: msg.timestamp().to_millis(),
        key: msg.key().map(|k| k.to_vec()),
        value: msg.payload().map(|v| v.to_vec()),
    }
}
