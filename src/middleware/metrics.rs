use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::{Middleware, Next};
use crate::error::DispatchError;
use crate::pattern::Params;
use crate::server::{Request, Response};

/// Request counters collected around the rest of the chain.
///
/// All counters are atomics updated with `Ordering::Relaxed`; per-status
/// counts live in a `DashMap` so concurrent workers never contend on one lock.
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    error_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    status_counts: DashMap<u16, usize>,
}

impl MetricsMiddleware {
    /// Zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests seen.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests that ended in a [`DispatchError`].
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Mean latency, zero before the first request.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Responses seen with `status`.
    pub fn status_count(&self, status: u16) -> usize {
        self.status_counts.get(&status).map(|c| *c).unwrap_or(0)
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(
        &self,
        req: &Request,
        res: Response,
        params: &Params,
        next: Next<'_>,
    ) -> Result<Response, DispatchError> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let result = next.run(req, res, params);
        self.total_latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        match &result {
            Ok(res) => *self.status_counts.entry(res.status()).or_insert(0) += 1,
            Err(_) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }
}
