//! Command-line and environment configuration.
//!
//! Every flag can also be set through a `KADUMPER_*` environment variable.

pub mod duration;

use crate::logging::LogFormat;
use anyhow::Context;
use clap::Parser;
use kadumper_kafka::{ConsumerConfig, DumpFields, DumpOptions, DumperKind, OffsetReset, TlsConfig};
use kadumper_schema_registry::{CacheSettings, RegistryTls};
use std::path::PathBuf;
use std::time::Duration;

pub use duration::parse_duration;

/// Dump Kafka records to standard output, one line per record
#[derive(Parser, Debug, Clone)]
#[command(name = "kadumper", version, about)]
pub struct Args {
    /// Kafka seed brokers (comma-separated list)
    #[arg(
        long,
        env = "KADUMPER_SEED_BROKERS",
        value_delimiter = ',',
        required = true
    )]
    pub seed_brokers: Vec<String>,

    /// Topics to consume (comma-separated list)
    #[arg(long, env = "KADUMPER_TOPICS", value_delimiter = ',', required = true)]
    pub topics: Vec<String>,

    /// Consumer group; without one, offsets are never committed
    #[arg(long, env = "KADUMPER_CONSUMER_GROUP")]
    pub consumer_group: Option<String>,

    /// Schema registry URL; enables decoding of Avro keys and values
    #[arg(long, env = "KADUMPER_SCHEMA_REGISTRY_URL")]
    pub schema_registry_url: Option<String>,

    /// TLS client certificate (PEM)
    #[arg(long, env = "KADUMPER_TLS_CLIENT_CERT")]
    pub tls_client_cert: Option<PathBuf>,

    /// TLS client private key (PEM)
    #[arg(long, env = "KADUMPER_TLS_CLIENT_KEY")]
    pub tls_client_key: Option<PathBuf>,

    /// Additional trusted CA certificate (PEM)
    #[arg(long, env = "KADUMPER_TLS_CA_CERT")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Start from the earliest offset when no committed offset exists
    #[arg(long, env = "KADUMPER_FROM_BEGINNING")]
    pub from_beginning: bool,

    /// Stop after dumping this many records (0 for unlimited)
    #[arg(long, env = "KADUMPER_MAX_RECORDS", default_value_t = 0)]
    pub max_records: u64,

    /// Stop when a single poll returns nothing for this long (e.g. 30s, 5m; 0 waits forever)
    #[arg(long, env = "KADUMPER_FETCH_TIMEOUT", default_value = "0", value_parser = parse_duration)]
    pub fetch_timeout: Duration,

    /// Prefix each line with the record timestamp in milliseconds
    #[arg(long, env = "KADUMPER_DUMP_TIMESTAMP")]
    pub dump_timestamp: bool,

    /// Prefix each line with the partition
    #[arg(long, env = "KADUMPER_DUMP_PARTITION")]
    pub dump_partition: bool,

    /// Prefix each line with the offset
    #[arg(long, env = "KADUMPER_DUMP_OFFSET")]
    pub dump_offset: bool,

    /// Write the record key before the value
    #[arg(long, env = "KADUMPER_DUMP_KEY")]
    pub dump_key: bool,

    /// Where dumped records go
    #[arg(long, env = "KADUMPER_DUMPER", value_enum, default_value_t = DumperKind::Stdout)]
    pub dumper: DumperKind,

    /// Maximum number of records fetched per poll
    #[arg(long, env = "KADUMPER_BATCH_SIZE", default_value_t = 500)]
    pub batch_size: usize,

    /// How long a fetched schema stays cached
    #[arg(long, env = "KADUMPER_SCHEMA_CACHE_MAX_AGE", default_value = "1h", value_parser = parse_duration)]
    pub schema_cache_max_age: Duration,

    /// Log output format
    #[arg(long, env = "KADUMPER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Default log filter, used when RUST_LOG is not set
    #[arg(long, env = "KADUMPER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Check constraints clap cannot express on its own.
    pub fn validate(&self) -> anyhow::Result<()> {
        match (&self.tls_client_cert, &self.tls_client_key) {
            (Some(_), None) => {
                anyhow::bail!("--tls-client-cert requires --tls-client-key")
            }
            (None, Some(_)) => {
                anyhow::bail!("--tls-client-key requires --tls-client-cert")
            }
            _ => {}
        }

        if self.tls_ca_cert.is_some() && self.tls_client_cert.is_none() {
            anyhow::bail!("--tls-ca-cert requires --tls-client-cert and --tls-client-key");
        }

        if self.schema_cache_max_age.is_zero() {
            anyhow::bail!("--schema-cache-max-age must be greater than zero");
        }

        if self.batch_size == 0 {
            anyhow::bail!("--batch-size must be greater than zero");
        }

        Ok(())
    }

    pub fn tls_config(&self) -> Option<TlsConfig> {
        match (&self.tls_client_cert, &self.tls_client_key) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                client_cert: cert.clone(),
                client_key: key.clone(),
                ca_cert: self.tls_ca_cert.clone(),
            }),
            _ => None,
        }
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        let auto_offset_reset = if self.from_beginning {
            OffsetReset::Earliest
        } else {
            OffsetReset::Latest
        };

        ConsumerConfig {
            brokers: self.seed_brokers.join(","),
            topics: self.topics.clone(),
            group_id: self.consumer_group.clone(),
            auto_offset_reset,
            batch_size: self.batch_size,
            tls: self.tls_config(),
            ..Default::default()
        }
    }

    /// Load the PEM files used to authenticate against the schema registry.
    ///
    /// The registry shares the Kafka client identity.
    pub fn registry_tls(&self) -> anyhow::Result<Option<RegistryTls>> {
        let Some(tls) = self.tls_config() else {
            return Ok(None);
        };

        let mut identity_pem = std::fs::read(&tls.client_cert).with_context(|| {
            format!("Failed to read TLS client certificate {:?}", tls.client_cert)
        })?;
        let key = std::fs::read(&tls.client_key)
            .with_context(|| format!("Failed to read TLS client key {:?}", tls.client_key))?;
        if !identity_pem.ends_with(b"\n") {
            identity_pem.push(b'\n');
        }
        identity_pem.extend_from_slice(&key);

        let ca_pem = match &tls.ca_cert {
            Some(path) => Some(
                std::fs::read(path)
                    .with_context(|| format!("Failed to read TLS CA certificate {path:?}"))?,
            ),
            None => None,
        };

        Ok(Some(RegistryTls {
            identity_pem: Some(identity_pem),
            ca_pem,
        }))
    }

    pub fn dump_fields(&self) -> DumpFields {
        DumpFields {
            timestamp: self.dump_timestamp,
            partition: self.dump_partition,
            offset: self.dump_offset,
            key: self.dump_key,
        }
    }

    pub fn dump_options(&self) -> DumpOptions {
        DumpOptions {
            max_records: self.max_records,
            fetch_timeout: (!self.fetch_timeout.is_zero()).then_some(self.fetch_timeout),
        }
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings::with_max_age(self.schema_cache_max_age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "kadumper",
            "--seed-brokers",
            "broker-1:9092,broker-2:9092",
            "--topics",
            "orders",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        args.validate().unwrap();

        assert_eq!(args.seed_brokers, vec!["broker-1:9092", "broker-2:9092"]);
        assert_eq!(args.topics, vec!["orders"]);
        assert_eq!(args.max_records, 0);
        assert_eq!(args.dumper, DumperKind::Stdout);
        assert_eq!(args.batch_size, 500);
        assert_eq!(args.log_format, LogFormat::Text);
        assert_eq!(args.dump_fields(), DumpFields::default());
        assert_eq!(args.dump_options(), DumpOptions::default());
        assert_eq!(args.cache_settings(), CacheSettings::default());
    }

    #[test]
    fn test_consumer_config() {
        let args = parse(&["--consumer-group", "audit", "--from-beginning", "--batch-size", "50"]);
        let config = args.consumer_config();

        assert_eq!(config.brokers, "broker-1:9092,broker-2:9092");
        assert_eq!(config.group_id.as_deref(), Some("audit"));
        assert_eq!(config.auto_offset_reset, OffsetReset::Earliest);
        assert_eq!(config.batch_size, 50);
        assert!(config.tls.is_none());

        let config = parse(&[]).consumer_config();
        assert_eq!(config.auto_offset_reset, OffsetReset::Latest);
        assert!(config.group_id.is_none());
    }

    #[test]
    fn test_dump_flags() {
        let args = parse(&[
            "--dump-timestamp",
            "--dump-offset",
            "--dump-key",
            "--max-records",
            "10",
            "--fetch-timeout",
            "30s",
        ]);

        assert_eq!(
            args.dump_fields(),
            DumpFields {
                timestamp: true,
                partition: false,
                offset: true,
                key: true,
            }
        );
        assert_eq!(
            args.dump_options(),
            DumpOptions {
                max_records: 10,
                fetch_timeout: Some(Duration::from_secs(30)),
            }
        );
    }

    #[test]
    fn test_missing_required() {
        assert!(Args::try_parse_from(["kadumper", "--topics", "orders"]).is_err());
        assert!(Args::try_parse_from(["kadumper", "--seed-brokers", "b:9092"]).is_err());
    }

    #[test]
    fn test_invalid_fetch_timeout() {
        assert!(Args::try_parse_from([
            "kadumper",
            "--seed-brokers",
            "b:9092",
            "--topics",
            "t",
            "--fetch-timeout",
            "soon",
        ])
        .is_err());
    }

    #[test]
    fn test_unpaired_tls_files() {
        let err = parse(&["--tls-client-cert", "client.pem"]).validate().unwrap_err();
        assert!(err.to_string().contains("--tls-client-key"));

        let err = parse(&["--tls-client-key", "client.key"]).validate().unwrap_err();
        assert!(err.to_string().contains("--tls-client-cert"));
    }

    #[test]
    fn test_zero_cache_max_age_rejected() {
        let err = parse(&["--schema-cache-max-age", "0"]).validate().unwrap_err();
        assert!(err.to_string().contains("--schema-cache-max-age"));
    }

    #[test]
    fn test_cache_settings() {
        let args = parse(&["--schema-cache-max-age", "10m"]);
        let settings = args.cache_settings();
        assert_eq!(settings.max_age, Duration::from_secs(600));
        assert_eq!(settings.sweep_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_registry_tls_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("client.pem");
        let key = dir.path().join("client.key");
        let ca = dir.path().join("ca.pem");
        std::fs::File::create(&cert)
            .unwrap()
            .write_all(b"CERT")
            .unwrap();
        std::fs::write(&key, b"KEY\n").unwrap();
        std::fs::write(&ca, b"CA\n").unwrap();

        let args = parse(&[
            "--tls-client-cert",
            cert.to_str().unwrap(),
            "--tls-client-key",
            key.to_str().unwrap(),
            "--tls-ca-cert",
            ca.to_str().unwrap(),
        ]);
        args.validate().unwrap();

        let tls = args.registry_tls().unwrap().unwrap();
        assert_eq!(tls.identity_pem.as_deref(), Some(&b"CERT\nKEY\n"[..]));
        assert_eq!(tls.ca_pem.as_deref(), Some(&b"CA\n"[..]));

        let kafka_tls = args.consumer_config().tls.unwrap();
        assert_eq!(kafka_tls.client_cert, cert);
        assert_eq!(kafka_tls.ca_cert, Some(ca));
    }

    #[test]
    fn test_registry_tls_missing_file() {
        let args = parse(&[
            "--tls-client-cert",
            "/nonexistent/client.pem",
            "--tls-client-key",
            "/nonexistent/client.key",
        ]);
        let err = args.registry_tls().unwrap_err();
        assert!(format!("{err:#}").contains("client certificate"));
    }

    #[test]
    fn test_no_tls() {
        assert!(parse(&[]).registry_tls().unwrap().is_none());
    }
}
