//! Test doubles shared by the unit tests of this crate.

use crate::consumer::{FetchFailure, Fetches, RecordSource};
use apache_avro::types::Value;
use async_trait::async_trait;
use kadumper_schema_registry::{
    AvroCodec, AvroTranscoder, CacheSettings, CodecCache, RegistryError, SchemaRegistry,
};
use kafka_types::encode_envelope;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

const INT_SCHEMA: &str = r#"{"type":"int"}"#;

/// Registry serving a fixed set of schemas.
pub(crate) struct StaticRegistry {
    schemas: HashMap<u32, String>,
}

#[async_trait]
impl SchemaRegistry for StaticRegistry {
    async fn schema_by_id(&self, id: u32) -> kadumper_schema_registry::Result<String> {
        self.schemas
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }
}

/// Transcoder whose registry knows `schema_id` as `{"type":"int"}`.
pub(crate) fn transcoder_with_int_schema(schema_id: u32) -> AvroTranscoder {
    let registry = StaticRegistry {
        schemas: HashMap::from([(schema_id, INT_SCHEMA.to_string())]),
    };
    AvroTranscoder::new(CodecCache::new(Arc::new(registry), CacheSettings::default()))
}

/// Framed Avro encoding of an int.
pub(crate) fn int_envelope(schema_id: u32, value: i32) -> Vec<u8> {
    let codec = AvroCodec::parse(INT_SCHEMA).unwrap();
    encode_envelope(schema_id, &codec.encode(Value::Int(value)).unwrap())
}

/// Source replaying scripted polls.
///
/// Once the script is exhausted it behaves like an idle topic: a poll with a
/// deadline reports the deadline after waiting for it, a poll without one
/// never returns.
pub(crate) struct ScriptedSource {
    script: VecDeque<Fetches>,
    deadlines: Vec<Option<Duration>>,
    closed: bool,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<Fetches>) -> Self {
        Self {
            script: script.into(),
            deadlines: Vec::new(),
            closed: false,
        }
    }

    pub(crate) fn polls(&self) -> usize {
        self.deadlines.len()
    }

    pub(crate) fn deadlines(&self) -> &[Option<Duration>] {
        &self.deadlines
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn poll(&mut self, deadline: Option<Duration>) -> Fetches {
        self.deadlines.push(deadline);
        if self.closed {
            return Fetches::client_closed();
        }
        if let Some(fetches) = self.script.pop_front() {
            return fetches;
        }
        match deadline {
            Some(deadline) => {
                tokio::time::sleep(deadline).await;
                Fetches::from_error(FetchFailure::DeadlineExceeded)
            }
            None => std::future::pending().await,
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
