//! # Cache Module
//!
//! Page caching for GET/HEAD routes registered with a TTL, and the HTTP
//! caching headers sent with every response.
//!
//! Pages are keyed by [`page_key`] (a digest of the verb and full URI).
//! The router consults the [`CacheBackend`] before running middleware:
//!
//! - a fresh page plus an `If-Modified-Since` inside the TTL window answers
//!   `304 Not Modified`
//! - a fresh page otherwise is replayed with expiry headers for its remaining
//!   lifetime
//! - a miss runs the handler, sends `max-age=<ttl>` and stores the page
//!   without its cookies
//!
//! Backend failures are logged and treated as a miss.

mod backend;
mod policy;
#[cfg(test)]
mod tests;

pub use backend::{CacheBackend, CacheError, CachedPage, MemoryCache, DEFAULT_CAPACITY};
pub use policy::{expire, hash, http_date, page_key, parse_http_date, EXPIRED_DATE};
