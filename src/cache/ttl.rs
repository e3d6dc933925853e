//! Thread-safe TTL cache.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default time-to-live for cached reads.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached value and the instant it stops being served.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// A thread-safe string-keyed cache with a fixed TTL.
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Debug, Clone)]
pub struct TtlCache<T> {
    inner: Arc<DashMap<String, CacheEntry<T>>>,
    ttl: Duration,
}

impl<T> TtlCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a live value. Expired entries are a miss and are dropped.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        match self.inner.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        self.inner.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Store `value`, replacing any existing entry and restarting its TTL.
    pub fn set(&self, key: impl Into<String>, value: T) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.inner.insert(key.into(), entry);
    }

    pub fn delete(&self, key: &str) {
        self.inner.remove(key);
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.inner.len())
    }

    /// Purge expired entries every TTL until `shutdown` fires.
    pub fn spawn_sweeper(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cache.ttl);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = cache.len(), "Purged expired cache entries");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Cache sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}
