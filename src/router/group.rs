use std::sync::Arc;

use super::core::Router;
use super::table::{RouteOptions, RouteSet};
use crate::dispatcher::Handler;
use crate::error::RouteError;
use crate::middleware::{Middleware, MiddlewareChain};

/// A group prefix given as `"admin/v1"` or `["admin", "v1"]`.
pub trait IntoPrefix {
    fn into_prefix(self) -> String;
}

impl IntoPrefix for &str {
    fn into_prefix(self) -> String {
        self.trim().trim_matches('/').to_string()
    }
}

impl IntoPrefix for String {
    fn into_prefix(self) -> String {
        self.as_str().into_prefix()
    }
}

impl IntoPrefix for &[&str] {
    fn into_prefix(self) -> String {
        self.iter()
            .map(|s| s.trim().trim_matches('/'))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl<const N: usize> IntoPrefix for [&str; N] {
    fn into_prefix(self) -> String {
        self.as_slice().into_prefix()
    }
}

impl IntoPrefix for Vec<&str> {
    fn into_prefix(self) -> String {
        self.as_slice().into_prefix()
    }
}

/// Join a group prefix and a pattern.
///
/// An empty prefix returns the pattern unchanged. Otherwise the result is
/// `/prefix/pattern` with repeated slashes collapsed and the trailing slash
/// dropped (`/` when nothing remains).
#[must_use]
pub fn join_path(prefix: &str, pattern: &str) -> String {
    if prefix.is_empty() {
        return pattern.to_string();
    }
    let joined = format!("/{}/{}", prefix.trim_matches('/'), pattern.trim_start_matches('/'));
    let mut out = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Registration scope of an active group.
#[derive(Debug, Default, Clone)]
pub(crate) struct GroupScope {
    pub(crate) prefix: String,
    pub(crate) middleware: MiddlewareChain,
    pub(crate) sealed: bool,
}

/// An active route group.
///
/// Routes registered through the handle get the group prefix and the group's
/// interceptors. Interceptors must be added before the first route; the
/// group is sealed afterwards.
///
/// ```rust
/// use routeweave::config::RouterConfig;
/// use routeweave::dispatcher::Handler;
/// use routeweave::router::Router;
///
/// let mut router = Router::new(RouterConfig::default()).unwrap();
/// let mut admin = router.group(["admin", "v1"]);
/// admin.route("GET /users", Handler::func(|_, _, _| "users")).unwrap();
/// admin.end();
/// assert_eq!(router.routes().next().map(|e| e.pattern.clone()), Some("/admin/v1/users".into()));
/// ```
pub struct GroupHandle<'a> {
    router: &'a mut Router,
    scope: GroupScope,
}

impl<'a> GroupHandle<'a> {
    pub(crate) fn new(router: &'a mut Router, prefix: String) -> Self {
        Self {
            router,
            scope: GroupScope {
                prefix,
                ..GroupScope::default()
            },
        }
    }

    /// Normalised prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.scope.prefix
    }

    /// `true` once a route was registered under the group.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.scope.sealed
    }

    /// Add a group interceptor.
    ///
    /// # Errors
    ///
    /// [`RouteError::GroupSealed`] after the first route of the group.
    pub fn add(&mut self, mw: Arc<dyn Middleware>) -> Result<&mut Self, RouteError> {
        if self.scope.sealed {
            return Err(RouteError::GroupSealed {
                prefix: self.scope.prefix.clone(),
            });
        }
        self.scope.middleware = self.scope.middleware.with(mw);
        Ok(self)
    }

    /// Register a route under the group.
    ///
    /// # Errors
    ///
    /// See [`Router::route`].
    pub fn route(&mut self, expr: &str, handler: Handler) -> Result<RouteSet<'_>, RouteError> {
        self.route_with(expr, handler, RouteOptions::default())
    }

    /// Register a route with caching/throttling options under the group.
    ///
    /// # Errors
    ///
    /// See [`Router::route`].
    pub fn route_with(
        &mut self,
        expr: &str,
        handler: Handler,
        options: RouteOptions,
    ) -> Result<RouteSet<'_>, RouteError> {
        self.router.register(expr, handler, options, Some(&mut self.scope))
    }

    /// Register a redirect under the group.
    ///
    /// # Errors
    ///
    /// See [`Router::route`].
    pub fn redirect(&mut self, expr: &str, target: &str, permanent: bool) -> Result<RouteSet<'_>, RouteError> {
        self.route(expr, Handler::redirect(target, permanent))
    }

    /// Close the group.
    pub fn end(self) {}
}
