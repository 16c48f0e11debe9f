//! Codec cache keyed by schema id.
//!
//! Codecs are loaded from the registry on first use and kept for at most
//! [`CacheSettings::max_age`]. Expired entries are treated as misses on
//! lookup and are purged by a sweep that runs every
//! [`CacheSettings::sweep_interval`], so memory stays bounded even when many
//! distinct schema ids flow through the topic.
//!
//! The cache is owned by a single consumer loop and takes `&mut self`. Sharing
//! it between several pollers requires putting it behind a mutex.

use crate::client::SchemaRegistry;
use crate::codec::AvroCodec;
use crate::error::CacheError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default maximum age of a cached codec.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Default interval between sweeps of expired codecs.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Age limits for cached codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub max_age: Duration,
    /// Always shorter than `max_age`
    pub sweep_interval: Duration,
}

impl CacheSettings {
    /// Settings for the given max age, sweeping twice per max age.
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            max_age,
            sweep_interval: max_age / 2,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

struct CacheEntry {
    codec: Arc<AvroCodec>,
    inserted_at: Instant,
}

/// Schema id to compiled codec cache, populated from a [`SchemaRegistry`].
pub struct CodecCache {
    registry: Arc<dyn SchemaRegistry>,
    settings: CacheSettings,
    entries: HashMap<u32, CacheEntry>,
    last_sweep: Instant,
}

impl CodecCache {
    pub fn new(registry: Arc<dyn SchemaRegistry>, settings: CacheSettings) -> Self {
        Self {
            registry,
            settings,
            entries: HashMap::new(),
            last_sweep: Instant::now(),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Number of entries currently held, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the codec for `schema_id`, loading it from the registry on a miss.
    ///
    /// Failures are not cached; the next call for the same id retries.
    pub async fn get_or_load(&mut self, schema_id: u32) -> Result<Arc<AvroCodec>, CacheError> {
        let now = Instant::now();
        if now.duration_since(self.last_sweep) >= self.settings.sweep_interval {
            self.purge_expired();
        }

        if let Some(entry) = self.entries.get(&schema_id) {
            if !self.is_expired(entry, now) {
                return Ok(Arc::clone(&entry.codec));
            }
        }

        debug!(schema_id, "codec cache miss, fetching schema from registry");

        let schema_text = self
            .registry
            .schema_by_id(schema_id)
            .await
            .map_err(|source| CacheError::RegistryLookup { schema_id, source })?;

        let codec = AvroCodec::parse(&schema_text)
            .map_err(|source| CacheError::SchemaCompile { schema_id, source })?;
        let codec = Arc::new(codec);

        self.entries.insert(
            schema_id,
            CacheEntry {
                codec: Arc::clone(&codec),
                inserted_at: Instant::now(),
            },
        );

        Ok(codec)
    }

    /// Remove every entry older than the max age. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let max_age = self.settings.max_age;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) <= max_age);
        self.last_sweep = now;

        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "swept expired codecs");
        }
        removed
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) > self.settings.max_age
    }
}

impl std::fmt::Debug for CodecCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecCache")
            .field("settings", &self.settings)
            .field("entries", &self.entries.len())
            .finish()
    }
}
