//! Write-once key/value store for proposals
//!
//! Approval controls carry a short [`StorageKey`] instead of the candidate
//! value itself. Keys come from a process-wide counter and are never reused.

use crate::error::StoreError;
use dashmap::DashMap;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Opaque key of a stored value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Wrap a raw key, e.g. one received back from an approval action
    #[inline]
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw key
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StorageKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Content-agnostic store of write-once values
#[async_trait::async_trait]
pub trait ValueStore<V>: Send + Sync + fmt::Debug
where
    V: Clone + Send + Sync + 'static,
{
    /// Store a value under a fresh key
    async fn save(&self, value: V) -> Result<StorageKey, StoreError>;

    /// Value saved under `key`, if any
    async fn load(&self, key: &StorageKey) -> Result<Option<V>, StoreError>;
}

/// Monotonic key generator shared by the in-memory stores
#[derive(Debug, Default)]
struct KeySequence(AtomicU64);

impl KeySequence {
    fn next(&self) -> StorageKey {
        let n = self.0.fetch_add(1, Ordering::Relaxed);
        StorageKey(format!("{n}_key"))
    }
}

/// Unbounded in-memory store. No eviction.
#[derive(Debug)]
pub struct InMemoryValueStore<V> {
    keys: KeySequence,
    values: DashMap<StorageKey, V>,
}

impl<V> InMemoryValueStore<V> {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: KeySequence::default(),
            values: DashMap::new(),
        }
    }

    /// Number of stored values
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<V> Default for InMemoryValueStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<V> ValueStore<V> for InMemoryValueStore<V>
where
    V: Clone + Send + Sync + fmt::Debug + 'static,
{
    async fn save(&self, value: V) -> Result<StorageKey, StoreError> {
        let key = self.keys.next();
        self.values.insert(key.clone(), value);
        tracing::trace!(key = %key, "saved value");
        Ok(key)
    }

    async fn load(&self, key: &StorageKey) -> Result<Option<V>, StoreError> {
        Ok(self.values.get(key).map(|entry| entry.value().clone()))
    }
}

/// In-memory store whose entries expire after a fixed time-to-live.
///
/// Bounded by `max_capacity`; once full, moka's TinyLFU policy decides which
/// entries to admit and which to evict, so any entry may go before its TTL.
/// Expired or evicted keys load as absent.
pub struct ExpiringValueStore<V> {
    keys: KeySequence,
    ttl: Duration,
    inner: Cache<StorageKey, V>,
}

impl<V> fmt::Debug for ExpiringValueStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringValueStore")
            .field("ttl", &self.ttl)
            .field("entry_count", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl<V> ExpiringValueStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create store with capacity and time-to-live
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            keys: KeySequence::default(),
            ttl,
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Configured time-to-live
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[async_trait::async_trait]
impl<V> ValueStore<V> for ExpiringValueStore<V>
where
    V: Clone + Send + Sync + fmt::Debug + 'static,
{
    async fn save(&self, value: V) -> Result<StorageKey, StoreError> {
        let key = self.keys.next();
        self.inner.insert(key.clone(), value).await;
        Ok(key)
    }

    async fn load(&self, key: &StorageKey) -> Result<Option<V>, StoreError> {
        Ok(self.inner.get(key).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn save_then_load() {
        let store = InMemoryValueStore::new();
        let key = store.save("candidate".to_string()).await.unwrap();
        assert_eq!(store.load(&key).await.unwrap().as_deref(), Some("candidate"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_key_is_absent() {
        let store: InMemoryValueStore<u32> = InMemoryValueStore::new();
        assert_eq!(store.load(&StorageKey::new("99_key")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_follow_counter() {
        let store = InMemoryValueStore::new();
        assert_eq!(store.save(1).await.unwrap().as_str(), "0_key");
        assert_eq!(store.save(2).await.unwrap().as_str(), "1_key");
    }

    #[tokio::test]
    async fn expiring_store_forgets_after_ttl() {
        let store = ExpiringValueStore::with_ttl(16, Duration::from_millis(50));
        let key = store.save(7u32).await.unwrap();
        assert_eq!(store.load(&key).await.unwrap(), Some(7));

        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(store.load(&key).await.unwrap(), None);
    }

    #[test]
    fn empty_key_detected() {
        assert!(StorageKey::new("").is_empty());
        assert!(StorageKey::new("  ").is_empty());
        assert!(!StorageKey::from("0_key").is_empty());
    }

    proptest! {
        #[test]
        fn prop_keys_unique_and_load_returns_saved(values in proptest::collection::vec(any::<i32>(), 1..64)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = InMemoryValueStore::new();
                let mut keys = Vec::new();
                for v in &values {
                    keys.push(store.save(*v).await.unwrap());
                }
                let distinct: HashSet<_> = keys.iter().collect();
                assert_eq!(distinct.len(), keys.len());
                for (key, v) in keys.iter().zip(&values) {
                    assert_eq!(store.load(key).await.unwrap(), Some(*v));
                }
            });
        }
    }
}
