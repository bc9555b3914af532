//! Per-source in-memory cache with a fixed time-to-live.
//!
//! Entries are never evicted; a refresh overwrites them. When a refresh
//! fails, callers fall back to whatever stale value is still stored.

use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

/// Thread-safe keyed cache with a fixed freshness window.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    inner: Arc<RwLock<HashMap<K, Entry<V>>>>,
    ttl: Duration,
    /// Used in log lines only
    label: &'static str,
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(label: &'static str, ttl: Duration) -> Self {
        TtlCache {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            label,
        }
    }

    /// Value for `key` if it was stored less than `ttl` ago.
    pub async fn get_fresh(&self, key: &K) -> Option<V> {
        let inner = self.inner.read().await;
        inner
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    /// Value for `key` regardless of age.
    pub async fn get_stale(&self, key: &K) -> Option<V> {
        self.inner.read().await.get(key).map(|e| e.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.write().await;
        inner.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Fresh cached value, or the result of `fetch`. A failed fetch
    /// returns the stale value when one exists.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(v) = self.get_fresh(&key).await {
            debug!("{} cache hit for {:?}", self.label, key);
            return Ok(v);
        }

        match fetch().await {
            Ok(v) => {
                self.insert(key, v.clone()).await;
                Ok(v)
            }
            Err(e) => match self.get_stale(&key).await {
                Some(stale) => {
                    warn!("{} refresh failed, serving stale data: {}", self.label, e);
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }
}
