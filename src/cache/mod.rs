//! In-memory TTL cache keyed by request fingerprint.
//!
//! Reads that opt in to caching consult this store before any exchange and
//! populate it on success. Entries expire after their time-to-live: an
//! expired entry is treated as absent (and evicted) on lookup, and a
//! periodic sweep evicts everything expired regardless of traffic, so
//! entries nobody reads again cannot accumulate forever.
//!
//! The cache is an explicit, injected object owned by the
//! [`Client`](crate::client::Client), not a module-level global — tests and
//! independent clients each get their own store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, interval};
use tracing::debug;

use crate::request::Fingerprint;

/// One cached value plus the bookkeeping needed to expire it.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    // An entry is valid iff now < stored_at + ttl.
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.stored_at + self.ttl
    }
}

/// Thread-safe in-memory map from [`Fingerprint`] to a value with expiry.
///
/// All operations take `&self`; interior mutability is a single `Mutex` held
/// only for the duration of each map operation, never across an await point.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use refetch::cache::TtlCache;
/// use refetch::request::{RequestDescriptor, Verb};
///
/// let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));
/// let key = RequestDescriptor::new(Verb::Read, "/topics").fingerprint();
///
/// cache.insert(key.clone(), "hello".to_string());
/// assert_eq!(cache.get(&key), Some("hello".to_string()));
/// ```
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<Fingerprint, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache whose [`insert`](Self::insert) applies
    /// `default_ttl`.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    // A poisoned lock only means another thread panicked mid-operation; the
    // map itself is still structurally sound, so keep serving.
    fn entries(&self) -> MutexGuard<'_, HashMap<Fingerprint, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the cached value for `key`, or `None` if absent or expired.
    ///
    /// An expired entry is evicted on the spot.
    pub fn get(&self, key: &Fingerprint) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key` with the cache-wide default TTL,
    /// overwriting any existing entry.
    pub fn insert(&self, key: Fingerprint, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Stores `value` under `key` with an explicit TTL, overwriting any
    /// existing entry.
    pub fn insert_with_ttl(&self, key: Fingerprint, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries().insert(key, entry);
    }

    /// Drops every entry. Used on logout.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Drops every entry whose endpoint starts with `prefix`.
    ///
    /// Used after a mutation of a resource family so subsequent reads are not
    /// served stale data.
    pub fn clear_by_prefix(&self, prefix: &str) {
        self.entries()
            .retain(|key, _| !key.endpoint().starts_with(prefix));
    }

    /// Evicts every expired entry; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of entries currently stored, expired or not.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Spawns the background sweep task for `cache`, running
/// [`TtlCache::sweep`] every `every` regardless of request traffic.
///
/// The task runs until the returned handle is aborted; the owning
/// [`Client`](crate::client::Client) aborts it on drop.
pub fn spawn_sweeper<V>(cache: Arc<TtlCache<V>>, every: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(every);
        // The first tick completes immediately; skip it so sweeps start one
        // full interval after spawn.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = cache.sweep();
            if evicted > 0 {
                debug!(evicted, remaining = cache.len(), "cache sweep");
            }
        }
    })
}
