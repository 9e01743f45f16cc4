//! Fingerprint-keyed result cache with TTL expiry, an LRU size bound and
//! single-flight coalescing of concurrent misses.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use serde::Serialize;
use study_core::{AiResult, Fingerprint};
use tracing::debug;

use crate::error::AiError;

type SharedCall = Shared<BoxFuture<'static, Result<AiResult, AiError>>>;

struct CacheEntry {
    result: AiResult,
    expires_at: Instant,
}

struct Inner {
    entries: Mutex<LruCache<Fingerprint, CacheEntry>>,
    in_flight: Mutex<HashMap<Fingerprint, SharedCall>>,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

/// Counters since construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Callers that joined an in-flight computation instead of starting one.
    pub coalesced: u64,
    pub entries: usize,
    pub hit_rate: f64,
}

/// Cheap to clone; clones share the same storage.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Poisoning is ignored: every write replaces a whole entry.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    fn lookup(&self, fingerprint: &Fingerprint) -> Option<AiResult> {
        let mut entries = lock(&self.entries);
        match entries.get(fingerprint) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.result.clone()),
            Some(_) => {
                entries.pop(fingerprint);
                None
            }
            None => None,
        }
    }

    fn store(&self, fingerprint: Fingerprint, result: AiResult, ttl: Duration) {
        let entry = CacheEntry {
            result,
            expires_at: Instant::now() + ttl,
        };
        lock(&self.entries).put(fingerprint, entry);
    }
}

/// Clears the in-flight slot when the computation ends, including by panic,
/// so the next caller starts a fresh call.
struct InFlightGuard {
    inner: Arc<Inner>,
    fingerprint: Fingerprint,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.inner.in_flight).remove(&self.fingerprint);
    }
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(LruCache::new(capacity)),
                in_flight: Mutex::new(HashMap::new()),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
            }),
        }
    }

    /// Unexpired result for `fingerprint`.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<AiResult> {
        let found = self.inner.lookup(fingerprint);
        let counter = if found.is_some() {
            &self.inner.hits
        } else {
            &self.inner.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn put(&self, fingerprint: Fingerprint, result: AiResult, ttl: Duration) {
        self.inner.store(fingerprint, result, ttl);
    }

    /// Return the cached result or run `compute` exactly once for all
    /// concurrent callers of the same fingerprint.
    ///
    /// The computation runs as its own task, so it completes (and fills the
    /// cache) even if every waiting caller is dropped. Errors are shared
    /// with all waiters but never cached.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        ttl: Duration,
        compute: F,
    ) -> Result<AiResult, AiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AiResult, AiError>> + Send + 'static,
    {
        if let Some(result) = self.inner.lookup(fingerprint) {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            debug!(fingerprint = fingerprint.short(), "result cache hit");
            return Ok(result);
        }

        let call = {
            let mut in_flight = lock(&self.inner.in_flight);
            if let Some(call) = in_flight.get(fingerprint) {
                self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint = fingerprint.short(), "joining in-flight request");
                call.clone()
            } else if let Some(result) = self.inner.lookup(fingerprint) {
                // Filled between the first lookup and taking the in-flight lock.
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(result);
            } else {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint = fingerprint.short(), "result cache miss");
                let call = self.spawn_call(fingerprint.clone(), ttl, compute());
                in_flight.insert(fingerprint.clone(), call.clone());
                call
            }
        };

        call.await
    }

    fn spawn_call<Fut>(&self, fingerprint: Fingerprint, ttl: Duration, work: Fut) -> SharedCall
    where
        Fut: Future<Output = Result<AiResult, AiError>> + Send + 'static,
    {
        let guard = InFlightGuard {
            inner: Arc::clone(&self.inner),
            fingerprint,
        };
        let handle = tokio::spawn(async move {
            let result = work.await;
            if let Ok(value) = &result {
                guard.inner.store(guard.fingerprint.clone(), value.clone(), ttl);
            }
            drop(guard);
            result
        });
        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(AiError::Provider(format!("AI task failed: {e}"))))
        }
        .boxed()
        .shared()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.inner.hits.load(Ordering::Relaxed);
        let misses = self.inner.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
            entries: lock(&self.inner.entries).len(),
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
