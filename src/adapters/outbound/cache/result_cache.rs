use crate::shared::Clock;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_TTL_SECS: i64 = 3600;

/// JSON values cross process boundaries unchanged; shared values are
/// in-process objects handed out by reference count.
#[derive(Clone)]
enum CachedValue {
    Json(serde_json::Value),
    Shared(Arc<dyn Any + Send + Sync>),
}

#[derive(Clone)]
struct CacheEntry {
    value: CachedValue,
    stored_at: DateTime<Utc>,
}

/// Process-wide TTL cache for upstream API responses.
///
/// Expiry is lazy: a stale entry reads as absent but stays in the map until
/// it is overwritten or the cache is cleared. Writes are idempotent, so
/// concurrent fetchers of the same key may both store without coordination.
#[derive(Clone)]
pub struct ResultCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
            ttl,
        }
    }

    pub fn with_default_ttl(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, Duration::seconds(DEFAULT_TTL_SECS))
    }

    fn fresh(&self, key: &str) -> Option<CachedValue> {
        let entry = self.entries.get(key)?;
        if self.clock.now() - entry.stored_at > self.ttl {
            debug!(key = key, "Cache entry expired");
            return None;
        }
        Some(entry.value.clone())
    }

    fn insert(&self, key: String, value: CachedValue) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: self.clock.now(),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        match self.fresh(key)? {
            CachedValue::Json(value) => Some(value),
            CachedValue::Shared(_) => None,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.insert(key.into(), CachedValue::Json(value));
    }

    pub fn has(&self, key: &str) -> bool {
        self.fresh(key).is_some()
    }

    /// Reads an in-process value stored with [`ResultCache::set_shared`]
    /// without copying it. A different type under the key counts as a miss.
    pub fn get_shared<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        match self.fresh(key)? {
            CachedValue::Shared(value) => value.downcast::<T>().ok(),
            CachedValue::Json(_) => None,
        }
    }

    pub fn set_shared<T: Any + Send + Sync>(&self, key: impl Into<String>, value: Arc<T>) {
        self.insert(key.into(), CachedValue::Shared(value));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Typed read; an entry that no longer deserializes counts as a miss
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                debug!(key = key, error = %e, "Ignoring undecodable cache entry");
                None
            }
        }
    }

    pub fn set_as<T: Serialize>(&self, key: impl Into<String>, value: &T) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(json) => self.set(key, json),
            Err(e) => debug!(key = %key, error = %e, "Skipping unserializable cache entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ManualClock;
    use serde_json::json;

    fn cache_with_clock() -> (ResultCache, ManualClock) {
        let clock = ManualClock::default();
        let cache = ResultCache::with_default_ttl(Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn test_round_trip_within_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("x", json!({"a": 1}));
        clock.advance(Duration::seconds(3599));
        assert_eq!(cache.get("x"), Some(json!({"a": 1})));
        assert!(cache.has("x"));
    }

    #[test]
    fn test_expired_entry_reads_absent_but_is_retained() {
        let (cache, clock) = cache_with_clock();
        cache.set("x", json!("v"));
        clock.advance(Duration::seconds(3601));
        assert_eq!(cache.get("x"), None);
        assert!(!cache.has("x"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_refreshes_entry() {
        let (cache, clock) = cache_with_clock();
        cache.set("x", json!(1));
        clock.advance(Duration::seconds(4000));
        cache.set("x", json!(2));
        assert_eq!(cache.get("x"), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let (cache, _clock) = cache_with_clock();
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_typed_access() {
        let (cache, _clock) = cache_with_clock();
        cache.set_as("list", &vec!["a".to_string(), "b".to_string()]);
        let list: Vec<String> = cache.get_as("list").unwrap();
        assert_eq!(list, vec!["a", "b"]);
        assert!(cache.get_as::<u32>("list").is_none());
    }

    #[test]
    fn test_shared_values_are_not_copied() {
        let (cache, clock) = cache_with_clock();
        let value = Arc::new(vec![1u8; 1024]);
        cache.set_shared("blob", value.clone());

        let first = cache.get_shared::<Vec<u8>>("blob").unwrap();
        assert!(Arc::ptr_eq(&first, &value));
        assert!(cache.has("blob"));
        assert!(cache.get_shared::<String>("blob").is_none());
        assert_eq!(cache.get("blob"), None);

        clock.advance(Duration::seconds(3601));
        assert!(cache.get_shared::<Vec<u8>>("blob").is_none());
    }

    #[test]
    fn test_clones_share_entries() {
        let (cache, _clock) = cache_with_clock();
        let other = cache.clone();
        cache.set("shared", json!(true));
        assert_eq!(other.get("shared"), Some(json!(true)));
    }
}
