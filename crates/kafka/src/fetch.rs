//! The fetch loop: poll a batch, dump every record in it, poll again.
//!
//! The loop stops when
//! - the record limit is reached ([`StopReason::RecordLimitReached`]),
//! - a poll reports a deadline-exceeded error ([`StopReason::DeadlineExceeded`]),
//! - the cancellation token fires ([`StopReason::Cancelled`]),
//!
//! or fails on a closed client, broker errors, or the first record that
//! cannot be dumped.

use crate::consumer::{FetchFailure, RecordSource};
use crate::dumper::RecordDumper;
use crate::error::DumpError;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Why the fetch loop stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    RecordLimitReached,
    /// No record arrived within the per-poll fetch timeout
    DeadlineExceeded,
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordLimitReached => f.write_str("record limit reached"),
            Self::DeadlineExceeded => f.write_str("fetch deadline exceeded"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Bounds for one run of the fetch loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Stop after this many records (`0` for unlimited)
    pub max_records: u64,
    /// Deadline applied to every single poll (`None` to wait indefinitely)
    pub fetch_timeout: Option<Duration>,
}

impl DumpOptions {
    fn limit_reached(&self, records: u64) -> bool {
        self.max_records != 0 && records >= self.max_records
    }
}

/// Outcome of a run that stopped cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    pub reason: StopReason,
    /// Records dumped during the run
    pub records: u64,
}

/// Consume records from `source` and hand them to `dumper` until a stop condition.
pub async fn dump_records<S, D>(
    source: &mut S,
    dumper: &mut D,
    options: DumpOptions,
    cancel: &CancellationToken,
) -> Result<DumpSummary, DumpError>
where
    S: RecordSource + ?Sized,
    D: RecordDumper + ?Sized,
{
    let mut records: u64 = 0;
    let stop = |reason: StopReason, records: u64| -> Result<DumpSummary, DumpError> {
        info!(%reason, records, "Stopped dumping records");
        Ok(DumpSummary { reason, records })
    };

    loop {
        if options.limit_reached(records) {
            return stop(StopReason::RecordLimitReached, records);
        }

        let fetches = tokio::select! {
            biased;
            _ = cancel.cancelled() => return stop(StopReason::Cancelled, records),
            fetches = source.poll(options.fetch_timeout) => fetches,
        };

        if fetches.is_client_closed() {
            return Err(DumpError::ClientClosed);
        }

        if !fetches.errors.is_empty() {
            // A deadline anywhere in the batch means "no more data": the
            // other errors of that poll are dropped.
            if fetches.errors.iter().any(FetchFailure::is_deadline_exceeded) {
                return stop(StopReason::DeadlineExceeded, records);
            }

            let joined = fetches
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DumpError::Fetch(joined));
        }

        debug!(batch = fetches.records.len(), total = records, "Dumping batch");

        for record in &fetches.records {
            if options.limit_reached(records) {
                break;
            }
            dumper.dump_record(record).await?;
            records += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::Fetches;
    use crate::dumper::{DumpFields, WriterRecordDumper};
    use crate::testing::{int_envelope, transcoder_with_int_schema, ScriptedSource};
    use kafka_types::Record;
    use rdkafka::error::KafkaError;
    use rdkafka::types::RDKafkaErrorCode;

    fn value_records(offsets: std::ops::Range<i64>) -> Vec<Record> {
        offsets
            .map(|offset| Record::new("events", 0, offset).with_value(format!("v{offset}")))
            .collect()
    }

    fn raw_dumper() -> WriterRecordDumper<Vec<u8>> {
        WriterRecordDumper::new(Vec::<u8>::new(), DumpFields::default(), None)
    }

    fn lines(dumper: WriterRecordDumper<Vec<u8>>) -> Vec<String> {
        String::from_utf8(dumper.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_record_limit() {
        let mut source = ScriptedSource::new(vec![
            Fetches::from_records(value_records(0..2)),
            Fetches::from_records(value_records(2..4)),
            Fetches::from_records(value_records(4..6)),
        ]);
        let mut dumper = raw_dumper();
        let options = DumpOptions {
            max_records: 3,
            fetch_timeout: None,
        };

        let summary = dump_records(&mut source, &mut dumper, options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.reason, StopReason::RecordLimitReached);
        assert_eq!(summary.records, 3);
        assert_eq!(source.polls(), 2);
        assert_eq!(lines(dumper), vec!["v0", "v1", "v2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_at_batch_boundary_does_not_poll_again() {
        let mut source = ScriptedSource::new(vec![Fetches::from_records(value_records(0..2))]);
        let mut dumper = raw_dumper();
        let options = DumpOptions {
            max_records: 2,
            fetch_timeout: None,
        };

        let summary = dump_records(&mut source, &mut dumper, options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.reason, StopReason::RecordLimitReached);
        assert_eq!(source.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_ends_unlimited_run() {
        let mut source = ScriptedSource::new(vec![
            Fetches::from_records(value_records(0..2)),
            Fetches::from_records(value_records(2..3)),
        ]);
        let mut dumper = raw_dumper();
        let options = DumpOptions {
            max_records: 0,
            fetch_timeout: Some(Duration::from_secs(5)),
        };

        let summary = dump_records(&mut source, &mut dumper, options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.reason, StopReason::DeadlineExceeded);
        assert_eq!(summary.records, 3);
        assert_eq!(source.deadlines(), &[Some(Duration::from_secs(5)); 3]);
        assert_eq!(lines(dumper), vec!["v0", "v1", "v2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_mixed_with_other_errors_is_clean() {
        let mut fetches = Fetches::from_error(FetchFailure::Kafka(KafkaError::MessageConsumption(
            RDKafkaErrorCode::BrokerTransportFailure,
        )));
        fetches.errors.push(FetchFailure::DeadlineExceeded);
        let mut source = ScriptedSource::new(vec![fetches]);
        let mut dumper = raw_dumper();

        let summary = dump_records(
            &mut source,
            &mut dumper,
            DumpOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.reason, StopReason::DeadlineExceeded);
        assert_eq!(summary.records, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broker_errors_are_joined() {
        let mut fetches = Fetches::from_error(FetchFailure::Kafka(KafkaError::MessageConsumption(
            RDKafkaErrorCode::BrokerTransportFailure,
        )));
        fetches
            .errors
            .push(FetchFailure::Kafka(KafkaError::MessageConsumption(
                RDKafkaErrorCode::UnknownTopicOrPartition,
            )));
        let mut source = ScriptedSource::new(vec![fetches]);
        let mut dumper = raw_dumper();

        let err = dump_records(
            &mut source,
            &mut dumper,
            DumpOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        match err {
            DumpError::Fetch(message) => assert_eq!(message.split("; ").count(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_client_is_fatal() {
        let mut source = ScriptedSource::new(vec![Fetches::from_records(value_records(0..1))]);
        source.close();
        let mut dumper = raw_dumper();

        let err = dump_records(
            &mut source,
            &mut dumper,
            DumpOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DumpError::ClientClosed));
        assert!(lines(dumper).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_blocking_poll() {
        // one batch, then the source blocks forever (no fetch timeout)
        let mut source = ScriptedSource::new(vec![Fetches::from_records(value_records(0..1))]);
        let mut dumper = raw_dumper();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        let summary = dump_records(&mut source, &mut dumper, DumpOptions::default(), &cancel)
            .await
            .unwrap();

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.records, 1);
        assert_eq!(lines(dumper), vec!["v0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_does_not_poll() {
        let mut source = ScriptedSource::new(vec![Fetches::from_records(value_records(0..1))]);
        let mut dumper = raw_dumper();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = dump_records(&mut source, &mut dumper, DumpOptions::default(), &cancel)
            .await
            .unwrap();

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(source.polls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decoded_values() {
        let records = vec![Record::new("events", 0, 0).with_value(int_envelope(7, 42))];
        let mut source = ScriptedSource::new(vec![Fetches::from_records(records)]);
        let mut dumper = WriterRecordDumper::new(
            Vec::<u8>::new(),
            DumpFields::default(),
            Some(transcoder_with_int_schema(7)),
        );
        let options = DumpOptions {
            max_records: 1,
            fetch_timeout: None,
        };

        dump_records(&mut source, &mut dumper, options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(dumper.into_inner(), b"42\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_format_failure_aborts_mid_batch() {
        let mut corrupted = int_envelope(7, 2);
        corrupted[0] = 0xff;
        let records = vec![
            Record::new("events", 0, 0).with_value(int_envelope(7, 1)),
            Record::new("events", 0, 1).with_value(corrupted),
            Record::new("events", 0, 2).with_value(int_envelope(7, 3)),
        ];
        let mut source = ScriptedSource::new(vec![Fetches::from_records(records)]);
        let mut dumper = WriterRecordDumper::new(
            Vec::<u8>::new(),
            DumpFields::default(),
            Some(transcoder_with_int_schema(7)),
        );

        let err = dump_records(
            &mut source,
            &mut dumper,
            DumpOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DumpError::RecordFormat { field: "value", .. }));
        assert_eq!(dumper.into_inner(), b"1\n");
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::RecordLimitReached.to_string(), "record limit reached");
        assert_eq!(StopReason::DeadlineExceeded.to_string(), "fetch deadline exceeded");
        assert_eq!(StopReason::Cancelled.to_string(), "cancelled");
    }
}
