use kadumper_schema_registry::TranscodeError;
use thiserror::Error;

/// Errors raised while creating or operating the Kafka consumer.
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cluster ping failed: {0}")]
    Ping(String),
}

/// Fatal conditions that stop the fetch loop.
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("kafka client closed")]
    ClientClosed,

    #[error("kafka client poll fetches: {0}")]
    Fetch(String),

    #[error("dump record: write {field} data: {source}")]
    RecordFormat {
        field: &'static str,
        #[source]
        source: TranscodeError,
    },

    #[error("dump record: write: {0}")]
    Write(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConsumerError>;
