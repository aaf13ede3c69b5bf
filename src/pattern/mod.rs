//! # Pattern Module
//!
//! Route patterns are strings made of literal text, named tokens and
//! wildcards:
//!
//! - `@name` (or `{@name}`) captures any run of characters except `/` and `?`
//! - `*` captures the remainder of the path up to the query string
//!
//! ## Compilation
//!
//! [`CompiledPattern::compile`] parses a pattern into [`Segment`]s once, at
//! registration time, and lowers them to an anchored regex. A single trailing
//! slash is always tolerated, and the router's `caseless` setting decides
//! whether literals are compared case-insensitively.
//!
//! ## Specificity
//!
//! When several patterns match the same path, the router tries them in
//! descending [`specificity_key`] order: literal segments win over tokens,
//! tokens win over trailing wildcards, and equal keys keep registration order.
//!
//! ## Example
//!
//! ```rust
//! use routeweave::pattern::{build, CompiledPattern, Params};
//!
//! let pattern = CompiledPattern::compile("/items/@id", false).unwrap();
//! let params = pattern.matches("/items/42").unwrap();
//! assert_eq!(params.get("id"), Some("42"));
//!
//! let url = build("/items/@id", &Params::new().with("id", "42"));
//! assert_eq!(url, "/items/42");
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use self::core::{
    build, specificity_key, CompiledPattern, ParamVec, Params, Segment, MAX_INLINE_PARAMS,
};
