//! # routeweave
//!
//! **routeweave** is a pattern-matching request router. Routes are declared
//! with compact expressions such as `GET|POST @item: /items/@id [ajax]` and
//! dispatched by method, path and request channel (synchronous, AJAX or CLI).
//!
//! ## Overview
//!
//! - Patterns with named tokens and a trailing wildcard, ordered by
//!   specificity so literal routes win over parameterized ones
//! - Named aliases for URL building and reroute targets
//! - Route groups with a shared prefix and middleware
//! - Onion middleware (global, group, route) around every handler
//! - Redirects and internal reroutes, including CLI re-dispatch
//! - HTTP caching headers, `304 Not Modified` and an optional page cache
//! - CORS headers and preflight handling
//! - Bandwidth throttled body emission that stops on client abort
//!
//! ## Architecture
//!
//! - **[`pattern`]** - Pattern compilation, matching and URL building
//! - **[`router`]** - Route table, aliases, groups and the dispatch loop
//! - **[`dispatcher`]** - Handler kinds and target resolution
//! - **[`middleware`]** - The onion chain plus tracing and metrics middleware
//! - **[`server`]** - Request, response and throttled emission
//! - **[`cache`]** - Expiry headers, page keys and cache backends
//! - **[`cors`]** - CORS policy and its builder
//! - **[`config`]** - Router configuration from YAML and the environment
//! - **[`logging`]** - `tracing` subscriber setup for binaries
//! - **[`cli`]** - The `routeweave` command line
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use routeweave::{Handler, Params, Request, Router, RouterConfig};
//!
//! let mut router = Router::new(RouterConfig::default()).unwrap();
//! router
//!     .route(
//!         "GET hello: /hello/@name",
//!         Handler::func(|_req, _res, params| format!("Hello, {}", params.get("name").unwrap_or(""))),
//!     )
//!     .unwrap();
//!
//! let res = router.dispatch(&Request::new(Method::GET, "/hello/world")).unwrap();
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.body_str(), "Hello, world");
//! let url = router.alias("hello", &Params::new().with("name", "bob"), None, None).unwrap();
//! assert_eq!(url, "/hello/bob");
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod cors;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod pattern;
pub mod router;
pub mod server;

pub use config::RouterConfig;
pub use cors::{CorsPolicy, CorsPolicyBuilder};
pub use dispatcher::{Handler, HandlerOutput, HandlerRegistry, RouteTarget, StaticRegistry};
pub use error::{DispatchError, RouteError};
pub use middleware::{from_fn, Middleware, MiddlewareChain, Next};
pub use pattern::{CompiledPattern, Params};
pub use router::{Channel, RouteOptions, Router};
pub use server::{Request, Response};
