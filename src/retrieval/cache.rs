//! Time-to-live cache.
//!
//! The cache is injected into the collaborator that owns it, never held by
//! the resolution engine. Concurrent writers for the same key race and the
//! last write wins; cached values are idempotent re-fetches of public data.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Cache contract with per-entry lifetime.
pub trait TtlCache<V>: Send + Sync {
    /// Returns a live entry.
    fn get(&self, key: &str) -> Option<V>;

    /// Stores an entry that expires after `ttl`.
    fn put(&self, key: String, value: V, ttl: Duration);
}

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// In-memory `TtlCache` backed by a `RwLock<HashMap>`.
///
/// A poisoned lock behaves as an empty cache.
pub struct InMemoryTtlCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    clock: Clock,
}

impl<V> fmt::Debug for InMemoryTtlCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTtlCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<V> Default for InMemoryTtlCache<V> {
    fn default() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }
}

impl<V> InMemoryTtlCache<V> {
    /// Creates an empty cache using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache with a custom clock.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, live or expired.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired entries.
    pub fn purge_expired(&self) {
        let now = (self.clock)();
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, e| e.expires_at > now);
        }
    }
}

impl<V> TtlCache<V> for InMemoryTtlCache<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        let now = (self.clock)();
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone())
    }

    fn put(&self, key: String, value: V, ttl: Duration) {
        let now = (self.clock)();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, e| e.expires_at > now);
            entries.insert(key, Entry { value, expires_at });
        }
    }
}
