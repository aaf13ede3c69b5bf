//! # Dispatcher Module
//!
//! The handler contract: what the router calls once a route has matched and
//! the middleware chain reaches its core.
//!
//! ## Handler Kinds
//!
//! - **Closures** `(req, res, params) -> impl Into<HandlerOutput>`. A returned
//!   [`crate::server::Response`] replaces the current one; a string becomes
//!   its body.
//! - **Targets** `(target, method)`, where the target is an instance or an
//!   identifier resolved through the [`HandlerRegistry`] given to the router.
//!   Targets get `before_route` / `after_route` hooks around the method.
//! - **Redirects**, registered through `Router::redirect`.
//!
//! ```rust
//! use routeweave::dispatcher::Handler;
//!
//! let hello = Handler::func(|_req, _res, params| {
//!     format!("hello {}", params.get("name").unwrap_or("world"))
//! });
//! # let _ = hello;
//! ```
//!
//! Unresolvable identifiers and unknown methods are rejected when the route
//! is registered. A handler that yields [`HandlerOutput::Nothing`] fails the
//! request with [`crate::error::DispatchError::InvalidResponse`].

mod core;

pub use self::core::{
    Handler, HandlerFn, HandlerOutput, HandlerRegistry, Invocation, Rerouter, RouteTarget,
    StaticRegistry, TargetRef,
};
