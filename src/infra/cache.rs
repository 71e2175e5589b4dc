//! In-process TTL cache for content fetched from Notion.
//!
//! Entries expire after the revalidation window but are kept around (until
//! evicted by LRU pressure) so a failed refresh can fall back to them.

use std::{
    hash::Hash,
    num::NonZeroUsize,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use lru::LruCache;
use metrics::counter;
use tracing::warn;

use super::telemetry::{CACHE_HITS, CACHE_MISSES};

const SOURCE: &str = "infra::cache";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Fresh(V),
    Stale(V),
    Missing,
}

impl<V> Lookup<V> {
    /// The cached value regardless of age.
    pub fn any(self) -> Option<V> {
        match self {
            Lookup::Fresh(value) | Lookup::Stale(value) => Some(value),
            Lookup::Missing => None,
        }
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    entries: Mutex<LruCache<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            name,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn lookup(&self, key: &K) -> Lookup<V> {
        let mut entries = lock(&self.entries, "lookup");
        let result = match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                Lookup::Fresh(entry.value.clone())
            }
            Some(entry) => Lookup::Stale(entry.value.clone()),
            None => Lookup::Missing,
        };

        match &result {
            Lookup::Fresh(_) => counter!(CACHE_HITS, "cache" => self.name).increment(1),
            _ => counter!(CACHE_MISSES, "cache" => self.name).increment(1),
        }
        result
    }

    pub fn insert(&self, key: K, value: V) {
        lock(&self.entries, "insert").put(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }
}

fn lock<'a, T>(lock: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = SOURCE,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned cache lock"
            );
            poisoned.into_inner()
        }
    }
}
