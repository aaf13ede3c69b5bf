use std::time::Instant;

use tracing::{info, info_span, warn};

use super::{Middleware, Next};
use crate::error::DispatchError;
use crate::pattern::Params;
use crate::server::{Request, Response};

/// Opens a `request` span around the rest of the chain and logs the outcome
/// with its latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle(
        &self,
        req: &Request,
        res: Response,
        params: &Params,
        next: Next<'_>,
    ) -> Result<Response, DispatchError> {
        let span = info_span!(
            "request",
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            channel = ?req.channel(),
        );
        span.in_scope(|| {
            let start = Instant::now();
            let result = next.run(req, res, params);
            let latency_us = start.elapsed().as_micros() as u64;
            match &result {
                Ok(res) => info!(status = res.status(), latency_us, "Request completed"),
                Err(err) => warn!(error = %err, latency_us, "Request failed"),
            }
            result
        })
    }
}
