//! # Router Module
//!
//! Registration and dispatch of routes.
//!
//! ## Registration
//!
//! Routes are registered with an expression `"VERBS [alias:] pattern [channel]"`:
//!
//! - `GET /items/@id` binds one verb to a pattern
//! - `GET|POST item: /items/@id` also declares the alias `item`
//! - `GET @item` reuses the pattern of an existing alias
//! - `GET /feed [ajax]` restricts the route to asynchronous requests
//!   (`[sync]` and `[cli]` work the same way)
//!
//! Patterns are compiled once and kept in specificity order, so literal
//! segments win over tokens and tokens over trailing wildcards regardless of
//! registration order.
//!
//! ## Dispatch
//!
//! For each request the router:
//!
//! 1. walks the pattern slots in order and matches the decoded path
//! 2. picks the verb map of the request's channel, falling back to the
//!    untagged routes
//! 3. redirects `GET /path/` to `/path` when configured
//! 4. checks the page cache and sets caching headers
//! 5. runs global, group and route interceptors around the handler
//!
//! Paths that match with other verbs answer `405` with an `Allow` header
//! (`OPTIONS` answers `200`); paths that match nothing answer `404`.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use routeweave::config::RouterConfig;
//! use routeweave::dispatcher::Handler;
//! use routeweave::pattern::Params;
//! use routeweave::router::Router;
//! use routeweave::server::Request;
//!
//! let mut router = Router::new(RouterConfig::default()).unwrap();
//! router
//!     .route("GET item: /items/@id", Handler::func(|_, _, p| format!("item {}", p.get("id").unwrap_or(""))))
//!     .unwrap();
//!
//! let res = router.dispatch(&Request::new(Method::GET, "/items/42")).unwrap();
//! assert_eq!(res.body(), b"item 42");
//!
//! let url = router.alias("item", &Params::new().with("id", "7"), None, None).unwrap();
//! assert_eq!(url, "/items/7");
//! ```

mod alias;
mod core;
mod group;
mod render;
mod table;

pub use self::alias::{parse_args, AliasEntry, AliasRegistry, AliasTarget};
pub use self::core::{RerouteHook, Router, MAX_REROUTE_HOPS};
pub use self::group::{join_path, GroupHandle, IntoPrefix};
pub use self::render::{error_page, error_text};
pub use self::table::{
    find_verb, Channel, Expression, RouteEntry, RouteOptions, RouteSet, RouteSlot, RouteTable, VerbMap, VERBS,
};
