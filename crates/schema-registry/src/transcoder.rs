//! Wire-format transcoder: framed Avro bytes in, JSON text out.

use crate::cache::CodecCache;
use crate::error::TranscodeError;
use kafka_types::parse_envelope;

/// Transcodes Confluent-framed Avro data into JSON text.
///
/// Codecs are resolved through the owned [`CodecCache`]. There are no
/// retries; the caller decides whether a failure is fatal.
#[derive(Debug)]
pub struct AvroTranscoder {
    cache: CodecCache,
}

impl AvroTranscoder {
    pub fn new(cache: CodecCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &CodecCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CodecCache {
        &mut self.cache
    }

    /// Decode framed Avro bytes and render them as JSON text.
    pub async fn to_text(&mut self, raw: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        let envelope = parse_envelope(raw)?;
        let schema_id = envelope.schema_id;

        let codec = self.cache.get_or_load(schema_id).await?;

        let value = codec
            .decode(envelope.payload)
            .map_err(|source| TranscodeError::PayloadDecode { schema_id, source })?;

        codec
            .to_json_text(&value)
            .map_err(|source| TranscodeError::TextEncode { schema_id, source })
    }
}
