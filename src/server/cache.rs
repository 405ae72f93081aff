//! Side-effect cache: traversal side-effects kept after a request completes
//! so clients can fetch them with `gather` and `keys`.
//!
//! Bounded by entry count and expired by time since the last write. Entries
//! are written under the id of the request that produced them and read under
//! the `sideEffect` argument of later requests; `SideEffectId` is the only
//! key type, so both paths go through the same conversion.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::io::Value;
use super::message::RequestMessage;
use super::settings::Settings;
use super::tokens::{
    CONFIG_CACHE_EXPIRATION_TIME, CONFIG_CACHE_MAX_SIZE, DEFAULT_CACHE_EXPIRATION_TIME_MS,
    DEFAULT_CACHE_MAX_SIZE, TRAVERSAL_PROCESSOR_CLASS,
};
use super::traversal::SideEffects;

/// Cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SideEffectId(Uuid);

impl SideEffectId {
    /// Key for side-effects produced by `request`.
    pub fn of_request(request: &RequestMessage) -> Self {
        Self(request.request_id)
    }

    /// Key from a `sideEffect` argument: a UUID, or a string holding one.
    pub fn from_arg(value: &Value) -> Option<Self> {
        match value {
            Value::Uuid(id) => Some(Self(*id)),
            Value::String(s) => Uuid::parse_str(s).ok().map(Self),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SideEffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideEffectCacheConfig {
    /// Time-to-live measured from the last write.
    pub expiration: Duration,
    pub max_size: u64,
}

impl Default for SideEffectCacheConfig {
    fn default() -> Self {
        Self {
            expiration: Duration::from_millis(DEFAULT_CACHE_EXPIRATION_TIME_MS),
            max_size: DEFAULT_CACHE_MAX_SIZE,
        }
    }
}

impl SideEffectCacheConfig {
    /// Read from the traversal processor's settings entry; absent keys and
    /// an absent entry fall back to the defaults.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let Some(processor) = settings.processor(TRAVERSAL_PROCESSOR_CLASS) else {
            return Ok(config);
        };
        if let Some(ms) = processor.get_u64(CONFIG_CACHE_EXPIRATION_TIME)? {
            config.expiration = Duration::from_millis(ms);
        }
        if let Some(size) = processor.get_u64(CONFIG_CACHE_MAX_SIZE)? {
            config.max_size = size;
        }
        Ok(config)
    }
}

/// Concurrent, bounded, time-expiring map from request id to side-effects.
///
/// Cloning shares the underlying store.
#[derive(Clone)]
pub struct SideEffectCache {
    cache: Cache<SideEffectId, Arc<SideEffects>>,
}

impl SideEffectCache {
    pub fn new(config: SideEffectCacheConfig) -> Self {
        info!(
            expiration_ms = config.expiration.as_millis() as u64,
            max_size = config.max_size,
            "Initialized side-effect cache"
        );
        let cache = Cache::builder()
            .max_capacity(config.max_size)
            .time_to_live(config.expiration)
            .build();
        Self { cache }
    }

    pub fn get(&self, id: &SideEffectId) -> Option<Arc<SideEffects>> {
        self.cache.get(id)
    }

    /// Store side-effects, replacing any entry under the same id.
    pub fn put(&self, id: SideEffectId, side_effects: SideEffects) {
        debug!(side_effect = %id, keys = side_effects.len(), "Caching side-effects");
        self.cache.insert(id, Arc::new(side_effects));
    }

    pub fn invalidate(&self, id: &SideEffectId) {
        self.cache.invalidate(id);
    }

    /// Approximate until `sync` has run.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Apply pending evictions and expirations now.
    pub fn sync(&self) {
        self.cache.run_pending_tasks();
    }
}

impl fmt::Debug for SideEffectCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideEffectCache")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}
