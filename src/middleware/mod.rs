//! # Middleware Module
//!
//! Onion-style interceptors around route handlers.
//!
//! A [`MiddlewareChain`] is an immutable list; [`MiddlewareChain::with`] and
//! [`MiddlewareChain::merge`] return new chains. At dispatch the router runs
//! the global chain, then group interceptors, then route-specific ones, and
//! finally the handler. Each interceptor receives a [`Next`] and decides
//! whether to continue.
//!
//! ## Bundled Interceptors
//!
//! - [`TracingMiddleware`]: request span plus completion log with latency
//! - [`MetricsMiddleware`]: request, error and per-status counters

mod core;
mod metrics;
mod tracing;

pub use self::core::{from_fn, FinalHandler, Middleware, MiddlewareChain, Next};
pub use metrics::MetricsMiddleware;
pub use self::tracing::TracingMiddleware;
