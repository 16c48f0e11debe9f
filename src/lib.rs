//! kadumper
//!
//! Dumps records from Kafka topics to standard output as tab-separated lines.
//! With a schema registry configured, Confluent-framed Avro keys and values
//! are decoded to JSON text before being written.
//!
//! # CLI Usage
//!
//! ```bash
//! # Tail a topic
//! kadumper --seed-brokers localhost:9092 --topics events
//!
//! # Dump the first 100 records with location and key, decoding Avro
//! kadumper --seed-brokers localhost:9092 --topics events \
//!   --from-beginning --max-records 100 \
//!   --dump-partition --dump-offset --dump-key \
//!   --schema-registry-url http://localhost:8081
//!
//! # Stop once the topic has been idle for 30 seconds
//! KADUMPER_SEED_BROKERS=localhost:9092 KADUMPER_TOPICS=events \
//!   kadumper --from-beginning --fetch-timeout 30s
//! ```

pub mod app;
pub mod config;
pub mod logging;

pub use app::run;
pub use config::Args;
