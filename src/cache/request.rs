//! Time-windowed request cache with in-flight de-duplication.
//!
//! Each [`RequestCache`] maps a query key to the value its fetcher produced.
//! Within the TTL window repeated lookups are served from memory; concurrent
//! lookups for a key that is still being fetched wait on the one running fetch
//! and observe its outcome. Failed fetches are shared with every waiter and are
//! never stored.
//!
//! Keys are scoped by a generation counter that [`RequestCache::invalidate_all`]
//! bumps, so a fetch still running across an invalidation can never satisfy a
//! later lookup.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use metrics::counter;
use moka::future::Cache;
use tracing::debug;

use super::config::CacheConfig;

pub struct RequestCache<V> {
    name: &'static str,
    entries: Option<Cache<String, V>>,
    generation: AtomicU64,
}

impl<V> RequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, config: &CacheConfig) -> Self {
        let entries = config.enabled.then(|| {
            Cache::builder()
                .name(name)
                .max_capacity(config.capacity())
                .time_to_live(config.ttl)
                .build()
        });

        Self {
            name,
            entries,
            generation: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    fn scoped_key(generation: u64, key: &str) -> String {
        format!("{generation}:{key}")
    }

    /// Return the cached value for `key`, running `fetcher` only when no fresh
    /// value exists and no fetch for the same key is already in flight.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: impl Into<String>,
        fetcher: F,
    ) -> Result<V, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        let Some(entries) = self.entries.as_ref() else {
            return fetcher().await.map_err(Arc::new);
        };

        let key = key.into();
        let generation = self.generation.load(Ordering::Acquire);
        let scoped = Self::scoped_key(generation, &key);
        let fetched = AtomicBool::new(false);
        let result = entries
            .try_get_with(scoped.clone(), async {
                fetched.store(true, Ordering::Relaxed);
                fetcher().await
            })
            .await;

        if fetched.load(Ordering::Relaxed) {
            counter!("florette_request_cache_miss_total", "cache" => self.name).increment(1);
            if result.is_err() {
                debug!(
                    target = "florette::cache",
                    cache = self.name,
                    key = %key,
                    "fetch failed; nothing cached"
                );
            }
        } else {
            counter!("florette_request_cache_hit_total", "cache" => self.name).increment(1);
        }

        // invalidated while fetching; the stored value is already unreachable
        if self.generation.load(Ordering::Acquire) != generation {
            entries.invalidate(&scoped).await;
        }

        result
    }

    /// Drop the entry for `key`, forcing the next lookup to fetch.
    pub async fn invalidate(&self, key: &str) {
        if let Some(entries) = self.entries.as_ref() {
            let generation = self.generation.load(Ordering::Acquire);
            entries
                .invalidate(&Self::scoped_key(generation, key))
                .await;
        }
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(entries) = self.entries.as_ref() {
            entries.invalidate_all();
        }
    }

    /// Approximate number of stored entries, after flushing pending maintenance.
    pub async fn entry_count(&self) -> u64 {
        match self.entries.as_ref() {
            Some(entries) => {
                entries.run_pending_tasks().await;
                entries.entry_count()
            }
            None => 0,
        }
    }
}
