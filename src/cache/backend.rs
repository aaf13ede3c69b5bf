use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::server::Response;

/// Default number of pages kept by [`MemoryCache`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// Cache backend failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backend lock was poisoned by a panicking writer.
    Poisoned,
    /// The backend rejected or could not reach its store.
    Backend(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Poisoned => write!(f, "Cache lock poisoned"),
            CacheError::Backend(msg) => write!(f, "Cache backend error: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

/// A rendered page stored for replay.
///
/// Cookies and CORS headers are never stored; both belong to the request
/// being answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    /// Unix timestamp (seconds) of the store
    pub stored_at: i64,
    /// Response status
    pub status: u16,
    /// Response headers without `Set-Cookie` and `Access-Control-*`
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
}

impl CachedPage {
    /// Snapshot a response, dropping its cookies and CORS headers.
    #[must_use]
    pub fn capture(res: &Response, stored_at: i64) -> Self {
        Self {
            stored_at,
            status: res.status(),
            headers: res
                .headers()
                .iter()
                .filter(|(k, _)| is_replayable(k))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: res.body().to_vec(),
        }
    }

    /// Rebuild the stored response on top of `base`.
    ///
    /// Headers already on `base` (CORS, security) are kept unless the page
    /// carries the same name.
    #[must_use]
    pub fn replay(&self, base: Response) -> Response {
        let mut res = base.with_status(self.status).with_body(self.body.clone());
        for (name, _) in &self.headers {
            res.headers_mut().remove(name);
        }
        for (name, value) in &self.headers {
            res.headers_mut().append(name, value.clone());
        }
        res
    }
}

fn is_replayable(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower != "set-cookie" && !lower.starts_with("access-control-")
}

/// Storage for cached pages.
///
/// Implementations synchronise internally; the router calls them from any
/// thread through `&self`.
pub trait CacheBackend: Send + Sync {
    /// Fetch a live entry.
    ///
    /// # Errors
    ///
    /// Backend failures; the router treats them as a miss.
    fn get(&self, key: &str) -> Result<Option<CachedPage>, CacheError>;

    /// Store an entry for `ttl`.
    ///
    /// # Errors
    ///
    /// Backend failures; the router logs and skips the store.
    fn set(&self, key: &str, page: CachedPage, ttl: Duration) -> Result<(), CacheError>;

    /// Drop an entry. Returns `true` if one was present.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn clear(&self, key: &str) -> Result<bool, CacheError>;
}

/// In-process LRU page cache with per-entry expiry.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, (Instant, CachedPage)>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemoryCache {
    /// Cache holding at most `capacity` pages (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// `(hits, misses)` since creation.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<CachedPage>, CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        let live = match entries.get(key) {
            Some((expires, page)) if *expires > Instant::now() => Some(page.clone()),
            Some(_) => {
                entries.pop(key);
                debug!(key, "Cached page expired");
                None
            }
            None => None,
        };
        if live.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(live)
    }

    fn set(&self, key: &str, page: CachedPage, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.put(key.to_string(), (Instant::now() + ttl, page));
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.pop(key).is_some())
    }
}
