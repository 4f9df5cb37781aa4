//! Response cache keyed by request URI, with per-entry expiry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

struct CachedResponse {
    body: Bytes,
    expires_at: Instant,
}

/// Cache of encoded HAL bodies.
#[derive(Default)]
pub struct ResponseCache {
    entries: DashMap<String, CachedResponse>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live body for `key`. An expired entry is removed and missed.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.body.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    /// Keep `body` for `ttl`. A zero `ttl` stores nothing.
    pub fn put(&self, key: impl Into<String>, body: Bytes, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key.into(),
            CachedResponse {
                body,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Purge expired entries every `interval` until shutdown.
pub async fn cleanup_task(
    cache: Arc<ResponseCache>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cleanup_interval.tick() => {
                let removed = cache.remove_expired();
                if removed > 0 {
                    debug!(removed, "expired cache entries removed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let cache = ResponseCache::new();
        cache.put("/token/CA1", Bytes::from_static(b"{}"), Duration::from_secs(60));
        assert_eq!(cache.get("/token/CA1"), Some(Bytes::from_static(b"{}")));
        assert_eq!(cache.get("/token/CA2"), None);
    }

    #[test]
    fn test_zero_ttl_not_stored() {
        let cache = ResponseCache::new();
        cache.put("/", Bytes::from_static(b"{}"), Duration::ZERO);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_missed_and_purged() {
        let cache = ResponseCache::new();
        cache.put("/a", Bytes::from_static(b"a"), Duration::from_millis(1));
        cache.put("/b", Bytes::from_static(b"b"), Duration::from_secs(60));

        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.get("/a"), None);
        assert_eq!(cache.len(), 1);
        cache.put("/c", Bytes::from_static(b"c"), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.remove_expired(), 1);
        assert_eq!(cache.get("/b"), Some(Bytes::from_static(b"b")));
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_shutdown() {
        let cache = Arc::new(ResponseCache::new());
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(cleanup_task(cache, Duration::from_millis(5), rx));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
