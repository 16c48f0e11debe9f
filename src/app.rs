//! Startup sequence and shutdown handling for the dumper.

use crate::config::Args;
use anyhow::Context;
use kadumper_kafka::{
    build_dumper, dump_records, DumpSummary, KafkaConsumer, RecordSource, StopReason,
};
use kadumper_schema_registry::{AvroTranscoder, CodecCache, HttpSchemaRegistry, SchemaRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long the startup metadata fetch may take.
const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect to Kafka (and the schema registry, if configured) and dump records
/// until a stop condition or `cancel` fires.
pub async fn run(args: Args, cancel: CancellationToken) -> anyhow::Result<DumpSummary> {
    args.validate()?;

    let consumer_config = args.consumer_config();
    if let Some(tls) = &consumer_config.tls {
        info!(
            client_cert = %tls.client_cert.display(),
            client_key = %tls.client_key.display(),
            "TLS configuration initialized"
        );
    }
    let registry_tls = args.registry_tls()?;

    let mut consumer =
        KafkaConsumer::new(consumer_config).context("Failed to create Kafka consumer")?;
    let config = consumer.config();
    info!(
        brokers = %config.brokers,
        topics = ?config.topics,
        consumer_group = config.group_id.as_deref().unwrap_or("<none>"),
        offset_reset = %config.auto_offset_reset,
        batch_size = config.batch_size,
        "Kafka consumer created"
    );

    let registry = match &args.schema_registry_url {
        Some(url) => {
            let registry = HttpSchemaRegistry::new(url, registry_tls.as_ref())
                .context("Failed to create schema registry client")?;
            info!(url = %registry.base_url(), "Schema registry client created");
            Some(Arc::new(registry))
        }
        None => None,
    };

    let transcoder = registry.as_ref().map(|registry| {
        let registry: Arc<dyn SchemaRegistry> = registry.clone();
        AvroTranscoder::new(CodecCache::new(registry, args.cache_settings()))
    });

    spawn_shutdown_handler(cancel.clone());

    let brokers = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(cancelled_at_startup(&mut consumer)),
        result = consumer.ping(PING_TIMEOUT) => result.context("Failed to reach Kafka cluster")?,
    };
    info!(brokers, "Kafka cluster reachable");

    if let Some(registry) = &registry {
        let types = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(cancelled_at_startup(&mut consumer)),
            result = registry.supported_types() => {
                result.context("Failed to query schema registry")?
            }
        };
        info!(supported_types = ?types, "Schema registry reachable");
    }

    let fields = args.dump_fields();
    let options = args.dump_options();
    info!(
        dumper = ?args.dumper,
        ?fields,
        max_records = options.max_records,
        fetch_timeout = ?options.fetch_timeout,
        decode_avro = transcoder.is_some(),
        "Dumping records"
    );

    let mut dumper = build_dumper(args.dumper, fields, transcoder);
    let result = dump_records(&mut consumer, &mut dumper, options, &cancel).await;
    consumer.close();

    let summary = result?;
    info!(reason = %summary.reason, records = summary.records, "Finished");
    Ok(summary)
}

fn cancelled_at_startup(consumer: &mut KafkaConsumer) -> DumpSummary {
    consumer.close();
    info!("Cancelled before dumping started");
    DumpSummary {
        reason: StopReason::Cancelled,
        records: 0,
    }
}

/// Cancel `cancel` on SIGINT or SIGTERM.
pub fn spawn_shutdown_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => {
                info!("Received {signal}, shutting down");
                cancel.cancel();
            }
            Err(e) => warn!("Failed to install signal handler: {e}"),
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "Ctrl+C")
}
